pub mod error;
pub mod run;

pub use error::format_llm_error;
pub use run::AgentLoop;
