use thiserror::Error;

/// Shared error type for the small set of concerns that live in this crate
/// (mainly JSON (de)serialization helpers used by more than one downstream
/// crate). Each downstream crate still declares its own richer error enum;
/// this one exists so `squidbot-types` helpers can return `Result` without
/// forcing callers through `serde_json::Error` directly.
#[derive(Debug, Error)]
pub enum TypesError {
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl TypesError {
    pub fn code(&self) -> &'static str {
        match self {
            TypesError::Serialization(_) => "serialization_error",
        }
    }
}

pub type Result<T> = std::result::Result<T, TypesError>;
