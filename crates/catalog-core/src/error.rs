use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Duplicate for marketplace code {0}")]
    DuplicateKey(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Index not prepared")]
    IndexNotPrepared,

    #[error("Parent category {0} not found")]
    ParentNotFound(String),

    #[error("Backend failure: {0}")]
    Backend(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl Error {
    /// Wraps an opaque storage/engine failure.
    pub fn backend<E: std::fmt::Display>(err: E) -> Self {
        Self::Backend(err.to_string())
    }

    /// Row level failures a loader may log and skip without aborting the run.
    pub fn is_row_error(&self) -> bool {
        matches!(self, Self::Validation(_) | Self::DuplicateKey(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
