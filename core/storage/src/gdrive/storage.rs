//! Google Drive storage adapter assembly.

use std::sync::Arc;

use mediadrive_common::Result;

use crate::adapter::StorageAdapter;
use crate::config::StorageConfig;
use crate::media::RemoteMediaStorage;

use super::auth::ServiceAccountAuth;
use super::client::DriveClient;

/// Build a Google Drive backed adapter from configuration.
///
/// # Errors
/// - Invalid configuration
/// - HTTP client construction failure
pub fn gdrive_storage(config: &StorageConfig) -> Result<RemoteMediaStorage> {
    let credentials = ServiceAccountAuth::from_config(config)?;
    let client = DriveClient::new()?;

    tracing::debug!(
        client_email = %config.key.client_email,
        method = ?config.auth_type,
        folder_id = ?config.folder_id,
        "Configured Google Drive storage"
    );

    Ok(
        RemoteMediaStorage::new(Arc::new(credentials), Arc::new(client))
            .with_folder(config.folder_id.clone())
            .with_public_read(config.public_read),
    )
}

/// Create a Google Drive adapter from the host's JSON configuration block.
pub fn create_gdrive_storage(config: serde_json::Value) -> Result<Arc<dyn StorageAdapter>> {
    let config = StorageConfig::from_value(config)?;
    Ok(Arc::new(gdrive_storage(&config)?))
}
