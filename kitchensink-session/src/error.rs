use kitchensink_core::ClientError;

/// Errors raised by a storage backend.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Storage backend error: {0}")]
    Backend(String),
}

impl From<StorageError> for ClientError {
    fn from(err: StorageError) -> Self {
        ClientError::Session(err.to_string())
    }
}
