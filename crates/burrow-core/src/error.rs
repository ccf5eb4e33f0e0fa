use thiserror::Error;

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors returned by every [`Store`](crate::Store) backend.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("original URL cannot be empty")]
    EmptyOriginalUrl,
    /// The original URL is already shortened. `short_url` points at the
    /// existing record and should be handed back to the client.
    #[error("data conflict: original URL already shortened as {short_url}")]
    Conflict { short_url: String },
    /// The generated short code is already taken by another record.
    #[error("short code already exists: {0}")]
    DuplicateShortCode(String),
    #[error("short code not found: {0}")]
    NotFound(String),
    #[error("short code has been deleted: {0}")]
    Gone(String),
    #[error("storage i/o failed: {0}")]
    Io(String),
    #[error("stored record could not be serialized: {0}")]
    Serialization(String),
    #[error("storage backend unavailable: {0}")]
    Unavailable(String),
    #[error("storage operation timed out: {0}")]
    Timeout(String),
    #[error("storage query failed: {0}")]
    Query(String),
    #[error("stored data is invalid: {0}")]
    InvalidData(String),
    #[error("storage bootstrap failed: {0}")]
    Bootstrap(String),
}

impl StoreError {
    /// Returns `true` for errors caused by the caller's input or by the
    /// state of a record, as opposed to a failing backend.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            StoreError::EmptyOriginalUrl
                | StoreError::Conflict { .. }
                | StoreError::NotFound(_)
                | StoreError::Gone(_)
        )
    }
}

impl From<std::io::Error> for StoreError {
    fn from(err: std::io::Error) -> Self {
        StoreError::Io(err.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    #[error("invalid short code: {0}")]
    InvalidShortCode(String),
}
