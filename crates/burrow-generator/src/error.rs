use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GeneratorError {
    #[error("code length must not be negative, got {0}")]
    InvalidLength(i64),
    #[error("short codes must be {min}-{max} characters, got {length}")]
    LengthOutOfRange { length: i64, min: usize, max: usize },
}
