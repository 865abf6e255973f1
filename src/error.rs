use thiserror::Error;

/// The application's error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// A persisted-store error (unreadable or unwritable key).
    #[error("Storage error: {0}")]
    Storage(String),

    /// A serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// A validation error.
    #[error("Validation error: {0}")]
    Validation(String),

    /// An encryption error.
    #[error("Encryption error: {0}")]
    Encryption(String),
}

/// A `Result` type that uses `AppError` as the error type.
pub type Result<T> = std::result::Result<T, AppError>;
