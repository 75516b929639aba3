use thiserror::Error;

/// Storage-specific error types for the pairing verifier.
///
/// These errors represent failures reading or writing the durable session
/// state: the session id, the pairing table and the pending barcode.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Database connection or query execution failed
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Migration execution failed
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A stored value could not be encoded or decoded
    #[error("Serialization error for key {key}: {message}")]
    Serialization { key: String, message: String },

    /// A stored value decoded but failed domain validation
    #[error("Validation error: {0}")]
    Validation(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl StorageError {
    /// Create a serialization error for `key`.
    pub fn serialization(key: impl Into<String>, message: impl ToString) -> Self {
        Self::Serialization {
            key: key.into(),
            message: message.to_string(),
        }
    }
}

/// Specialized result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

impl From<StorageError> for tagpair_core::Error {
    fn from(error: StorageError) -> Self {
        tagpair_core::Error::Storage(error.to_string())
    }
}
