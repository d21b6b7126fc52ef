pub mod cron;
pub mod error;
pub mod message;
pub mod session;
pub mod skill;
pub mod tool;

pub use cron::CronJob;
pub use error::{Result, TypesError};
pub use message::{Message, Role};
pub use session::Session;
pub use skill::SkillMetadata;
pub use tool::{format_call, repr, ToolCall, ToolDefinition, ToolResult};
