//! Google Drive storage backend for MediaDrive.
//!
//! This module provides a storage backend using Google Drive with:
//! - Service-account authentication (exchanged JWT or self-signed JWT)
//! - Streamed multipart uploads and streamed downloads
//! - Optional public-read sharing of uploaded files

pub mod auth;
pub mod client;
pub mod storage;

pub use auth::{ServiceAccountAuth, ServiceAccountClaims};
pub use client::{DriveClient, DriveFile};
pub use storage::{create_gdrive_storage, gdrive_storage};
