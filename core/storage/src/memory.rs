//! In-memory collaborators for testing.

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{PoisonError, RwLock};
use uuid::Uuid;

use mediadrive_common::{Error, RemoteFileId, Result};

use crate::remote::{
    file_extension, AuthToken, ByteStream, CredentialProvider, NewFile, PermissionGrant,
    RemoteContent, RemoteFileApi, RemoteFileHandle,
};

/// Stored object.
#[derive(Debug, Clone)]
struct StoredFile {
    handle: RemoteFileHandle,
    parents: Vec<String>,
    data: Bytes,
}

/// In-memory file hosting API.
///
/// Assigns random identifiers and reports extensions the way Drive does.
/// All data is lost on drop.
#[derive(Debug, Default)]
pub struct MemoryFileApi {
    files: RwLock<HashMap<RemoteFileId, StoredFile>>,
    permissions: RwLock<Vec<(RemoteFileId, PermissionGrant)>>,
    reject_permissions: bool,
    fail_fetches: bool,
}

impl MemoryFileApi {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every permission grant fail, as on a domain with sharing disabled.
    pub fn rejecting_permissions() -> Self {
        Self {
            reject_permissions: true,
            ..Self::default()
        }
    }

    /// Make every metadata and content fetch fail, as during an outage.
    pub fn failing_fetches() -> Self {
        Self {
            fail_fetches: true,
            ..Self::default()
        }
    }

    /// Store a file directly, bypassing authentication.
    pub fn insert(
        &self,
        name: &str,
        mime_type: &str,
        data: impl Into<Bytes>,
    ) -> Result<RemoteFileId> {
        let file = NewFile {
            name: name.to_string(),
            mime_type: mime_type.to_string(),
            parents: Vec::new(),
        };
        Ok(self.store(&file, data.into())?.id)
    }

    /// Number of stored files.
    pub fn file_count(&self) -> usize {
        self.files.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Whether a file is stored under `id`.
    pub fn contains(&self, id: &RemoteFileId) -> bool {
        self.files
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(id)
    }

    /// Parent folders a file was created under.
    pub fn parents(&self, id: &RemoteFileId) -> Option<Vec<String>> {
        self.files
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .map(|file| file.parents.clone())
    }

    /// Grants recorded so far.
    pub fn permissions(&self) -> Vec<(RemoteFileId, PermissionGrant)> {
        self.permissions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn store(&self, file: &NewFile, data: Bytes) -> Result<RemoteFileHandle> {
        // Simple UUIDs contain no dots, so they survive the path encoding
        let id = RemoteFileId::new(Uuid::new_v4().simple().to_string())?;

        let handle = RemoteFileHandle {
            id: id.clone(),
            name: Some(file.name.clone()),
            mime_type: Some(file.mime_type.clone()),
            file_extension: file_extension(&file.name).map(str::to_string),
            size: Some(data.len() as u64),
        };

        self.files
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(
                id,
                StoredFile {
                    handle: handle.clone(),
                    parents: file.parents.clone(),
                    data,
                },
            );

        Ok(handle)
    }

    fn get(&self, id: &RemoteFileId) -> Result<StoredFile> {
        if self.fail_fetches {
            return Err(Error::Fetch(format!("{}: backend unavailable", id)));
        }
        self.files
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()
            .ok_or_else(|| Error::NotFound(id.to_string()))
    }
}

#[async_trait]
impl RemoteFileApi for MemoryFileApi {
    fn name(&self) -> &str {
        "memory"
    }

    async fn create_file(
        &self,
        _token: &AuthToken,
        file: &NewFile,
        content: ByteStream,
    ) -> Result<RemoteFileHandle> {
        let data = RemoteContent {
            content_type: None,
            content_length: None,
            stream: content,
        }
        .into_bytes()
        .await?;

        self.store(file, data)
    }

    async fn get_metadata(
        &self,
        _token: &AuthToken,
        id: &RemoteFileId,
    ) -> Result<RemoteFileHandle> {
        Ok(self.get(id)?.handle)
    }

    async fn get_content(&self, _token: &AuthToken, id: &RemoteFileId) -> Result<RemoteContent> {
        let file = self.get(id)?;
        let data = file.data;

        Ok(RemoteContent {
            content_type: file.handle.mime_type,
            content_length: Some(data.len() as u64),
            stream: Box::pin(stream::once(async move { Ok(data) })),
        })
    }

    async fn delete_file(&self, _token: &AuthToken, id: &RemoteFileId) -> Result<()> {
        self.files
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| Error::Delete(format!("{}: file not found", id)))
    }

    async fn create_permission(
        &self,
        _token: &AuthToken,
        id: &RemoteFileId,
        grant: &PermissionGrant,
    ) -> Result<()> {
        if self.reject_permissions {
            return Err(Error::Permission(format!("{}: sharing is disabled", id)));
        }
        if !self.contains(id) {
            return Err(Error::Permission(format!("{}: file not found", id)));
        }

        self.permissions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id.clone(), grant.clone()));
        Ok(())
    }
}

/// Credential provider that always succeeds with a fixed token.
#[derive(Debug)]
pub struct StaticCredentials {
    token: String,
    authorizations: AtomicUsize,
}

impl StaticCredentials {
    /// Hand out `token` on every call.
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            authorizations: AtomicUsize::new(0),
        }
    }

    /// Number of tokens handed out.
    pub fn authorizations(&self) -> usize {
        self.authorizations.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CredentialProvider for StaticCredentials {
    async fn authorize(&self) -> Result<AuthToken> {
        self.authorizations.fetch_add(1, Ordering::SeqCst);
        Ok(AuthToken::new(self.token.clone()))
    }
}

/// Credential provider that always fails.
#[derive(Debug, Default)]
pub struct FailingCredentials;

#[async_trait]
impl CredentialProvider for FailingCredentials {
    async fn authorize(&self) -> Result<AuthToken> {
        Err(Error::Authentication("invalid_grant: account disabled".to_string()))
    }
}
