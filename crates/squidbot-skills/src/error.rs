use thiserror::Error;

#[derive(Debug, Error)]
pub enum SkillsError {
    #[error("io error at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("skill not found: {name}")]
    NotFound { name: String },
}

pub type Result<T> = std::result::Result<T, SkillsError>;
