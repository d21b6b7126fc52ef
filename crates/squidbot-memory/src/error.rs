use thiserror::Error;

#[derive(Debug, Error)]
pub enum MemoryError {
    #[error("io error at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl MemoryError {
    pub fn code(&self) -> &'static str {
        match self {
            MemoryError::Io { .. } => "io_error",
            MemoryError::Serialization(_) => "serialization_error",
        }
    }

    pub fn io(path: impl Into<String>, source: std::io::Error) -> Self {
        MemoryError::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, MemoryError>;
