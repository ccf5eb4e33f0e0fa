use burrow_core::{CoreError, StoreError};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ShortenerError>;

/// Errors from the deletion pipeline's producer side.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PipelineError {
    #[error("deletion pipeline is closed")]
    Closed,
    #[error("deletion request has no short codes")]
    EmptyRequest,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ShortenerError {
    #[error("invalid url: {0}")]
    InvalidUrl(String),
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
}

impl From<CoreError> for ShortenerError {
    fn from(value: CoreError) -> Self {
        match value {
            CoreError::InvalidShortCode(message) => Self::InvalidRequest(message),
        }
    }
}
