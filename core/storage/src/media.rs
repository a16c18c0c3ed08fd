//! Storage adapter over a remote file hosting API.

use async_trait::async_trait;
use bytes::Bytes;
use std::sync::Arc;

use mediadrive_common::{content_path, RemoteFileId, Result};

use crate::adapter::{ReadOptions, StorageAdapter};
use crate::remote::{
    AuthToken, CredentialProvider, NewFile, PermissionGrant, RemoteContent, RemoteFileApi,
    UploadRequest,
};

/// Media storage backed by a remote file hosting API.
///
/// Holds no per-request state. Every operation obtains a fresh token from
/// the credential provider and then issues its remote call(s).
pub struct RemoteMediaStorage {
    credentials: Arc<dyn CredentialProvider>,
    api: Arc<dyn RemoteFileApi>,
    folder_id: Option<String>,
    public_read: bool,
}

impl RemoteMediaStorage {
    /// Create an adapter from its collaborators.
    ///
    /// Uploads go to the API's default location and are made publicly
    /// readable until configured otherwise.
    pub fn new(credentials: Arc<dyn CredentialProvider>, api: Arc<dyn RemoteFileApi>) -> Self {
        Self {
            credentials,
            api,
            folder_id: None,
            public_read: true,
        }
    }

    /// Place uploads in the given folder.
    pub fn with_folder(mut self, folder_id: Option<String>) -> Self {
        self.folder_id = folder_id;
        self
    }

    /// Choose whether uploads get a public read grant.
    pub fn with_public_read(mut self, public_read: bool) -> Self {
        self.public_read = public_read;
        self
    }

    /// Folder receiving uploads, if any.
    pub fn folder_id(&self) -> Option<&str> {
        self.folder_id.as_deref()
    }

    async fn authorize(&self, operation: &str) -> Result<AuthToken> {
        self.credentials.authorize().await.map_err(|e| {
            tracing::error!(operation, error = %e, "Authentication failed");
            e
        })
    }

    fn resolve_id(path: &str, operation: &str) -> Result<RemoteFileId> {
        RemoteFileId::from_path(path).map_err(|e| {
            tracing::warn!(operation, path, error = %e, "Unusable file path");
            e
        })
    }
}

#[async_trait]
impl StorageAdapter for RemoteMediaStorage {
    fn name(&self) -> &str {
        self.api.name()
    }

    async fn save(&self, file: UploadRequest, target_dir: Option<&str>) -> Result<String> {
        let token = self.authorize("save").await?;

        if let Some(dir) = target_dir {
            tracing::debug!(target_dir = dir, "Remote store is flat, ignoring target directory");
        }

        let fallback_extension = file.extension().map(str::to_string);
        let new_file = NewFile {
            name: file.name,
            mime_type: file.mime_type,
            parents: self.folder_id.iter().cloned().collect(),
        };

        let content = file.source.into_stream().await.map_err(|e| {
            tracing::error!(name = %new_file.name, error = %e, "Failed to open upload source");
            e
        })?;

        let handle = self
            .api
            .create_file(&token, &new_file, content)
            .await
            .map_err(|e| {
                tracing::error!(name = %new_file.name, error = %e, "Upload failed");
                e
            })?;

        if self.public_read {
            if let Err(e) = self
                .api
                .create_permission(&token, &handle.id, &PermissionGrant::anyone_reader())
                .await
            {
                tracing::error!(
                    file_id = %handle.id,
                    error = %e,
                    "Failed to share uploaded file, it remains in the remote store"
                );
                return Err(e);
            }
        }

        let extension = handle.file_extension.clone().or(fallback_extension);
        let path = content_path(&handle.id, extension.as_deref());

        tracing::info!(file_id = %handle.id, name = %new_file.name, %path, "Saved file");
        Ok(path)
    }

    async fn exists(&self, file_name: &str, _target_dir: Option<&str>) -> bool {
        let Ok(id) = Self::resolve_id(file_name, "exists") else {
            return false;
        };
        let Ok(token) = self.authorize("exists").await else {
            return false;
        };

        match self.api.get_metadata(&token, &id).await {
            Ok(_) => true,
            Err(e) if e.is_not_found() => {
                tracing::debug!(file_id = %id, "File not found");
                false
            }
            Err(e) => {
                tracing::warn!(file_id = %id, error = %e, "Existence check failed");
                false
            }
        }
    }

    async fn delete(&self, file_name: &str) -> Result<()> {
        let id = Self::resolve_id(file_name, "delete")?;
        let token = self.authorize("delete").await?;

        match self.api.delete_file(&token, &id).await {
            Ok(()) => {
                tracing::info!(file_id = %id, "Deleted file");
                Ok(())
            }
            Err(e) => {
                tracing::error!(file_id = %id, error = %e, "Delete failed");
                Err(e)
            }
        }
    }

    async fn read(&self, options: &ReadOptions) -> Result<Bytes> {
        let content = self.stream(&options.path).await.map_err(|e| {
            tracing::error!(path = %options.path, error = %e, "Read failed");
            e
        })?;

        content.into_bytes().await
    }

    async fn stream(&self, path: &str) -> Result<RemoteContent> {
        let id = Self::resolve_id(path, "read")?;
        let token = self.authorize("read").await?;

        tracing::debug!(file_id = %id, "Fetching file content");
        self.api.get_content(&token, &id).await
    }
}
