//! Common utilities and types shared across MediaDrive modules.
//!
//! This module provides the error taxonomy used by every storage operation
//! and the identifier types that tie remote objects to public URL paths.

pub mod error;
pub mod types;

pub use error::{Error, Result};
pub use types::{content_path, RemoteFileId, CONTENT_IMAGES_PREFIX};
