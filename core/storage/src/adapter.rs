//! Storage adapter trait definition.

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use mediadrive_common::Result;

use crate::remote::{RemoteContent, UploadRequest};
use crate::serve::ServeHandler;

/// Options for [`StorageAdapter::read`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadOptions {
    /// Path of the stored file, as returned by [`StorageAdapter::save`].
    pub path: String,
}

impl ReadOptions {
    /// Read the file at `path`.
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }
}

impl From<&str> for ReadOptions {
    fn from(path: &str) -> Self {
        Self::new(path)
    }
}

/// Media storage contract consumed by the host platform.
///
/// Every operation that touches the remote store authenticates first and
/// aborts without side effects when authentication fails.
#[async_trait]
pub trait StorageAdapter: Send + Sync {
    /// Get the adapter name (e.g., "gdrive", "memory").
    fn name(&self) -> &str;

    /// Store a file and return the public path it is served under.
    ///
    /// # Postconditions
    /// - Returned path has the form `/content/images/<id>.<ext>`
    ///
    /// # Errors
    /// - `Error::Authentication` if no credential could be obtained
    /// - `Error::Io` if the local source cannot be read
    /// - `Error::Upload` if the remote rejects the file
    /// - `Error::Permission` if the public-read grant fails
    async fn save(&self, file: UploadRequest, target_dir: Option<&str>) -> Result<String>;

    /// Check whether a stored file exists.
    ///
    /// Never fails: any error, including authentication failure, is
    /// reported as `false`.
    async fn exists(&self, file_name: &str, target_dir: Option<&str>) -> bool;

    /// Request handler that streams stored files and falls through to the
    /// next handler when a file cannot be served.
    fn serve(self: Arc<Self>) -> ServeHandler
    where
        Self: Sized + 'static,
    {
        ServeHandler::new(self)
    }

    /// Delete a stored file.
    ///
    /// # Errors
    /// - `Error::Authentication` if no credential could be obtained
    /// - `Error::Delete` if the remote refuses, including when the file is absent
    async fn delete(&self, file_name: &str) -> Result<()>;

    /// Read a stored file fully into memory.
    ///
    /// # Errors
    /// - `Error::Authentication` if no credential could be obtained
    /// - `Error::NotFound` if the file is absent
    /// - `Error::Fetch` on any other remote failure
    async fn read(&self, options: &ReadOptions) -> Result<Bytes>;

    /// Open a stored file as a stream.
    ///
    /// Same errors as [`StorageAdapter::read`].
    async fn stream(&self, path: &str) -> Result<RemoteContent>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_options_from_path() {
        let options = ReadOptions::from("/content/images/abc123.png");
        assert_eq!(options.path, "/content/images/abc123.png");

        let json = serde_json::to_value(&options).unwrap();
        assert_eq!(json, serde_json::json!({ "path": "/content/images/abc123.png" }));
    }
}
