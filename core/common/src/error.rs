//! Common error types for MediaDrive.

use thiserror::Error;

/// Top-level error type for MediaDrive operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Credential exchange failed.
    #[error("Authentication error: {0}")]
    Authentication(String),

    /// Remote create/upload call failed.
    #[error("Upload error: {0}")]
    Upload(String),

    /// Remote object does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Remote get call failed for a reason other than not-found.
    #[error("Fetch error: {0}")]
    Fetch(String),

    /// Remote delete call failed.
    #[error("Delete error: {0}")]
    Delete(String),

    /// Permission grant on an uploaded object failed.
    #[error("Permission error: {0}")]
    Permission(String),

    /// Local I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization or deserialization failed.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Invalid input provided.
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl Error {
    /// Whether this error means the remote object is absent.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

/// Result type alias using the common Error.
pub type Result<T> = std::result::Result<T, Error>;
