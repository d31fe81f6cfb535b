//! Storage error types.

use s3::error::S3Error;
use thiserror::Error;

/// Errors raised by storage providers.
///
/// Backend SDK errors never leave this module in their raw form; every
/// provider maps them onto these variants.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Object (or bucket) does not exist in the backend.
    #[error("object not found: {0}")]
    NotFound(String),

    /// Provider name in configuration has no implementation.
    #[error("unsupported storage provider: {0}")]
    UnsupportedProvider(String),

    /// Provider configuration is invalid or credentials were rejected.
    #[error("storage configuration error: {0}")]
    Configuration(String),

    /// Backend call failed.
    #[error("storage operation failed: {0}")]
    Operation(String),

    /// Reading or writing the byte stream failed.
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Transfer exceeded its deadline.
    #[error("storage operation timed out after {0} seconds")]
    Timeout(u64),
}

impl StorageError {
    pub fn operation(msg: impl Into<String>) -> Self {
        Self::Operation(msg.into())
    }

    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

impl From<S3Error> for StorageError {
    fn from(err: S3Error) -> Self {
        match err {
            S3Error::HttpFailWithBody(404, body) => Self::NotFound(body),
            S3Error::HttpFailWithBody(status @ (401 | 403), body) => {
                Self::Configuration(format!("backend rejected credentials ({status}): {body}"))
            }
            other => Self::Operation(other.to_string()),
        }
    }
}
