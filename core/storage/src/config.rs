//! Adapter configuration supplied by the host.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use zeroize::{Zeroize, ZeroizeOnDrop};

use mediadrive_common::{Error, Result};

/// OAuth2 token endpoint used when the key does not name one.
pub const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// Full Drive access, needed to read back files the service account created.
pub const DEFAULT_SCOPE: &str = "https://www.googleapis.com/auth/drive";

/// How the service-account key is turned into a bearer token.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AuthMethod {
    /// Sign an assertion and exchange it at the token endpoint.
    #[default]
    Jwt,
    /// Use a self-signed JWT directly as the bearer token.
    ServiceAccount,
}

/// Service-account key material.
///
/// Accepts the JSON key file downloaded from the cloud console as-is;
/// fields not listed here are ignored.
#[derive(Clone, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
pub struct ServiceAccountKey {
    /// Service account identity.
    pub client_email: String,
    /// PEM-encoded RSA private key.
    pub private_key: String,
    /// Key ID, sent as the JWT `kid` header when present.
    #[serde(default)]
    pub private_key_id: Option<String>,
    /// Token endpoint override.
    #[serde(default)]
    pub token_uri: Option<String>,
}

impl ServiceAccountKey {
    /// Private key PEM with escaped newlines restored.
    ///
    /// Keys passed through environment variables often arrive with literal
    /// `\n` sequences in place of line breaks.
    pub fn private_key_pem(&self) -> String {
        self.private_key.replace("\\n", "\n")
    }

    /// Token endpoint for this key.
    pub fn token_uri(&self) -> &str {
        self.token_uri.as_deref().unwrap_or(DEFAULT_TOKEN_URI)
    }
}

impl fmt::Debug for ServiceAccountKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceAccountKey")
            .field("client_email", &self.client_email)
            .field("private_key", &"[REDACTED]")
            .field("private_key_id", &self.private_key_id)
            .field("token_uri", &self.token_uri)
            .finish()
    }
}

fn default_public_read() -> bool {
    true
}

fn default_scope() -> String {
    DEFAULT_SCOPE.to_string()
}

/// Storage adapter configuration.
///
/// Mirrors the host's storage block:
/// `{ "key": {...}, "authType": "jwt", "folderId": "..." }`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageConfig {
    /// Service-account key.
    pub key: ServiceAccountKey,
    /// Authentication method.
    #[serde(default)]
    pub auth_type: AuthMethod,
    /// Folder that receives uploads.
    #[serde(default)]
    pub folder_id: Option<String>,
    /// Grant public read access to every upload.
    #[serde(default = "default_public_read")]
    pub public_read: bool,
    /// OAuth2 scope requested for tokens.
    #[serde(default = "default_scope")]
    pub scope: String,
}

impl StorageConfig {
    /// Create a configuration with defaults for everything but the key.
    pub fn new(key: ServiceAccountKey) -> Self {
        Self {
            key,
            auth_type: AuthMethod::default(),
            folder_id: None,
            public_read: default_public_read(),
            scope: default_scope(),
        }
    }

    /// Parse a configuration from a JSON value.
    ///
    /// # Errors
    /// - `Error::InvalidInput` if required fields are missing or malformed
    pub fn from_value(value: serde_json::Value) -> Result<Self> {
        let config: Self = serde_json::from_value(value)
            .map_err(|e| Error::InvalidInput(format!("Invalid storage config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration from a JSON file.
    ///
    /// # Errors
    /// - `Error::Io` if the file cannot be read
    /// - `Error::InvalidInput` if its contents are not a valid configuration
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let value: serde_json::Value = serde_json::from_str(&raw)?;
        Self::from_value(value)
    }

    fn validate(&self) -> Result<()> {
        if self.key.client_email.is_empty() {
            return Err(Error::InvalidInput(
                "key.client_email must not be empty".to_string(),
            ));
        }
        if self.key.private_key.is_empty() {
            return Err(Error::InvalidInput(
                "key.private_key must not be empty".to_string(),
            ));
        }
        if matches!(self.folder_id.as_deref(), Some("")) {
            return Err(Error::InvalidInput(
                "folderId must not be empty when set".to_string(),
            ));
        }
        Ok(())
    }
}
