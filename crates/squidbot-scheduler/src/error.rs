use thiserror::Error;

#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("cron job store error: {0}")]
    Memory(#[from] squidbot_memory::MemoryError),
    #[error("invalid schedule expression '{expr}': {reason}")]
    InvalidSchedule { expr: String, reason: String },
    #[error("job not found: {id}")]
    JobNotFound { id: String },
}

pub type Result<T> = std::result::Result<T, SchedulerError>;
