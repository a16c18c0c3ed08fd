//! Remote media storage for MediaDrive.
//!
//! This module provides the storage adapter contract a blogging platform
//! uses for uploaded media, an implementation over a remote file hosting
//! API, and the Google Drive collaborators behind it.
//!
//! # Design Principles
//! - Injected collaborators: credentials and remote API are traits
//! - Stateless operations: every call authenticates before touching the remote
//! - Streaming support: content is streamed on upload and when serving
//! - Unified error semantics: one error taxonomy across backends

pub mod adapter;
pub mod config;
pub mod gdrive;
pub mod media;
pub mod memory;
pub mod remote;
pub mod serve;

pub use adapter::{ReadOptions, StorageAdapter};
pub use config::{AuthMethod, ServiceAccountKey, StorageConfig};
pub use gdrive::{create_gdrive_storage, gdrive_storage};
pub use media::RemoteMediaStorage;
pub use memory::{FailingCredentials, MemoryFileApi, StaticCredentials};
pub use remote::{
    AuthToken, ByteStream, CredentialProvider, NewFile, PermissionGrant, RemoteContent,
    RemoteFileApi, RemoteFileHandle, UploadRequest, UploadSource,
};
pub use serve::{serve_content, ServeHandler};
