//! Common types used throughout MediaDrive.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Public path prefix under which uploaded media is served.
pub const CONTENT_IMAGES_PREFIX: &str = "/content/images/";

/// Opaque identifier assigned by the hosting API to an uploaded object.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RemoteFileId(String);

impl RemoteFileId {
    /// Create a new RemoteFileId from a string.
    ///
    /// # Errors
    /// - Returns error if id is empty
    pub fn new(id: impl Into<String>) -> crate::Result<Self> {
        let id = id.into();
        if id.is_empty() {
            return Err(crate::Error::InvalidInput(
                "RemoteFileId cannot be empty".to_string(),
            ));
        }
        Ok(Self(id))
    }

    /// Recover the remote identifier from a path produced by [`content_path`].
    ///
    /// The public content prefix is removed when present, otherwise a single
    /// leading separator is. Everything from the first `.` on is the
    /// extension and is discarded.
    ///
    /// # Errors
    /// - Returns error if nothing is left once the prefix and extension are gone
    pub fn from_path(path: &str) -> crate::Result<Self> {
        let name = path
            .strip_prefix(CONTENT_IMAGES_PREFIX)
            .or_else(|| path.strip_prefix('/'))
            .unwrap_or(path);

        let id = name.split('.').next().unwrap_or_default();
        if id.is_empty() {
            return Err(crate::Error::InvalidInput(format!(
                "No file identifier in path: {:?}",
                path
            )));
        }

        Ok(Self(id.to_string()))
    }

    /// Get the inner string value.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RemoteFileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Build the public path for a remote object.
///
/// `/content/images/<id>.<ext>`, or `/content/images/<id>` when no
/// extension is known.
pub fn content_path(id: &RemoteFileId, extension: Option<&str>) -> String {
    match extension.filter(|ext| !ext.is_empty()) {
        Some(ext) => format!("{}{}.{}", CONTENT_IMAGES_PREFIX, id, ext),
        None => format!("{}{}", CONTENT_IMAGES_PREFIX, id),
    }
}
