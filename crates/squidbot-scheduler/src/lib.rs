pub mod dispatcher;
pub mod engine;
pub mod error;
mod schedule;

pub use dispatcher::JobDispatcher;
pub use engine::SchedulerEngine;
pub use error::{Result, SchedulerError};
