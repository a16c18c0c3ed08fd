//! Collaborator traits for remote media storage.
//!
//! A storage adapter is assembled from two collaborators: a
//! [`CredentialProvider`] that turns configured key material into a
//! short-lived [`AuthToken`], and a [`RemoteFileApi`] that performs the
//! individual hosting API calls with that token.

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use futures::{stream, Stream, StreamExt};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::pin::Pin;
use tokio_util::io::ReaderStream;

use mediadrive_common::{Error, RemoteFileId, Result};

/// Byte stream type for upload/download operations.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes>> + Send>>;

/// Short-lived bearer credential for the remote API.
///
/// Obtained at the start of every adapter operation and dropped when the
/// operation finishes.
#[derive(Debug, Clone)]
pub struct AuthToken {
    access_token: oauth2::AccessToken,
}

impl AuthToken {
    /// Create a token from its secret.
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            access_token: oauth2::AccessToken::new(secret.into()),
        }
    }

    /// The raw token value.
    pub fn secret(&self) -> &str {
        self.access_token.secret()
    }

    /// Value for the `Authorization` header.
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.secret())
    }
}

/// Source of the bytes for an upload.
pub enum UploadSource {
    /// A local file, typically the host's temp copy of the upload.
    Path(PathBuf),
    /// Content already held in memory.
    Bytes(Bytes),
    /// Content produced incrementally.
    Stream(ByteStream),
}

impl UploadSource {
    /// Open the source as a byte stream.
    ///
    /// # Errors
    /// - `Error::Io` if a local file cannot be opened
    pub async fn into_stream(self) -> Result<ByteStream> {
        match self {
            UploadSource::Path(path) => {
                let file = tokio::fs::File::open(&path).await?;
                let stream = ReaderStream::new(file).map(|chunk| chunk.map_err(Error::from));
                Ok(Box::pin(stream))
            }
            UploadSource::Bytes(data) => Ok(Box::pin(stream::once(async move { Ok(data) }))),
            UploadSource::Stream(stream) => Ok(stream),
        }
    }
}

impl fmt::Debug for UploadSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UploadSource::Path(path) => f.debug_tuple("Path").field(path).finish(),
            UploadSource::Bytes(data) => write!(f, "Bytes([{} bytes])", data.len()),
            UploadSource::Stream(_) => f.write_str("Stream(..)"),
        }
    }
}

/// A file handed to the adapter for storage.
#[derive(Debug)]
pub struct UploadRequest {
    /// Original file name, including extension.
    pub name: String,
    /// MIME type of the content.
    pub mime_type: String,
    /// Where the bytes come from.
    pub source: UploadSource,
}

impl UploadRequest {
    /// Upload a local file.
    pub fn from_path(
        name: impl Into<String>,
        mime_type: impl Into<String>,
        path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            source: UploadSource::Path(path.into()),
        }
    }

    /// Upload in-memory content.
    pub fn from_bytes(
        name: impl Into<String>,
        mime_type: impl Into<String>,
        data: impl Into<Bytes>,
    ) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            source: UploadSource::Bytes(data.into()),
        }
    }

    /// Extension of the file name, without the dot.
    pub fn extension(&self) -> Option<&str> {
        file_extension(&self.name)
    }
}

/// Extension of a file name the way the hosting API reports it.
pub(crate) fn file_extension(name: &str) -> Option<&str> {
    name.rsplit_once('.')
        .map(|(_, ext)| ext)
        .filter(|ext| !ext.is_empty())
}

/// Metadata sent with a new remote object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewFile {
    /// Object name.
    pub name: String,
    /// MIME type.
    pub mime_type: String,
    /// Parent folder IDs.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub parents: Vec<String>,
}

/// Handle to a stored remote object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteFileHandle {
    /// Remote identifier.
    pub id: RemoteFileId,
    /// Object name, when reported.
    pub name: Option<String>,
    /// MIME type, when reported.
    pub mime_type: Option<String>,
    /// Extension derived by the remote from the name.
    pub file_extension: Option<String>,
    /// Content length in bytes.
    pub size: Option<u64>,
}

/// Remote content opened for reading.
pub struct RemoteContent {
    /// Content type reported by the remote.
    pub content_type: Option<String>,
    /// Content length reported by the remote.
    pub content_length: Option<u64>,
    /// The content itself.
    pub stream: ByteStream,
}

impl RemoteContent {
    /// Drain the stream into a single buffer.
    pub async fn into_bytes(self) -> Result<Bytes> {
        let capacity = self.content_length.unwrap_or(0).min(16 * 1024 * 1024) as usize;
        let mut buffer = BytesMut::with_capacity(capacity);
        let mut stream = self.stream;

        while let Some(chunk) = stream.next().await {
            buffer.extend_from_slice(&chunk?);
        }

        Ok(buffer.freeze())
    }
}

impl fmt::Debug for RemoteContent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteContent")
            .field("content_type", &self.content_type)
            .field("content_length", &self.content_length)
            .finish_non_exhaustive()
    }
}

/// Access grant attached to an uploaded object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PermissionGrant {
    /// Grantee type (`anyone`, `user`, `domain`, ...).
    #[serde(rename = "type")]
    pub grantee: String,
    /// Role granted (`reader`, `writer`, ...).
    pub role: String,
}

impl PermissionGrant {
    /// Public read access.
    pub fn anyone_reader() -> Self {
        Self {
            grantee: "anyone".to_string(),
            role: "reader".to_string(),
        }
    }
}

/// Exchanges configured key material for an [`AuthToken`].
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    /// Obtain a fresh token.
    ///
    /// # Errors
    /// - `Error::Authentication` if the key is unusable or the exchange fails
    async fn authorize(&self) -> Result<AuthToken>;
}

/// Third-party file hosting API.
///
/// Each method is a single remote call authenticated with the given token.
#[async_trait]
pub trait RemoteFileApi: Send + Sync {
    /// Get the API name (e.g., "gdrive", "memory").
    fn name(&self) -> &str;

    /// Create an object from metadata and content.
    ///
    /// # Errors
    /// - `Error::Upload` if the remote rejects the object
    async fn create_file(
        &self,
        token: &AuthToken,
        file: &NewFile,
        content: ByteStream,
    ) -> Result<RemoteFileHandle>;

    /// Fetch object metadata.
    ///
    /// # Errors
    /// - `Error::NotFound` if the object does not exist
    /// - `Error::Fetch` on any other failure
    async fn get_metadata(&self, token: &AuthToken, id: &RemoteFileId)
        -> Result<RemoteFileHandle>;

    /// Open object content as a stream.
    ///
    /// # Errors
    /// - `Error::NotFound` if the object does not exist
    /// - `Error::Fetch` on any other failure
    async fn get_content(&self, token: &AuthToken, id: &RemoteFileId) -> Result<RemoteContent>;

    /// Delete an object.
    ///
    /// # Errors
    /// - `Error::Delete`, including when the object does not exist
    async fn delete_file(&self, token: &AuthToken, id: &RemoteFileId) -> Result<()>;

    /// Attach an access grant to an object.
    ///
    /// # Errors
    /// - `Error::Permission` if the grant is rejected
    async fn create_permission(
        &self,
        token: &AuthToken,
        id: &RemoteFileId,
        grant: &PermissionGrant,
    ) -> Result<()>;
}
