//! Service-account authentication for Google Drive.

use async_trait::async_trait;
use chrono::Utc;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use oauth2::basic::{BasicErrorResponse, BasicTokenResponse};
use oauth2::TokenResponse;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use mediadrive_common::{Error, Result};

use crate::config::{AuthMethod, ServiceAccountKey, StorageConfig};
use crate::remote::{AuthToken, CredentialProvider};

/// Grant type for exchanging a signed assertion at the token endpoint.
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

/// Lifetime of signed assertions and self-signed tokens (Google's maximum).
const ASSERTION_LIFETIME_SECS: i64 = 3600;

/// Claims of a signed service-account JWT.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceAccountClaims {
    /// Issuer: the service account email.
    pub iss: String,
    /// Subject, set for self-signed tokens.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,
    /// Space-separated OAuth2 scopes.
    pub scope: String,
    /// Audience, set for assertions exchanged at the token endpoint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aud: Option<String>,
    /// Issued at (seconds since epoch).
    pub iat: i64,
    /// Expiry (seconds since epoch).
    pub exp: i64,
}

/// Credential provider backed by a service-account key.
///
/// Every call to [`CredentialProvider::authorize`] produces a new token; no
/// token is cached between calls.
pub struct ServiceAccountAuth {
    http: Client,
    key: ServiceAccountKey,
    method: AuthMethod,
    scope: String,
}

impl ServiceAccountAuth {
    /// Create a provider for the given key and method.
    pub fn new(
        key: ServiceAccountKey,
        method: AuthMethod,
        scope: impl Into<String>,
    ) -> Result<Self> {
        let http = Client::builder()
            .user_agent(concat!("MediaDrive/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::InvalidInput(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http,
            key,
            method,
            scope: scope.into(),
        })
    }

    /// Create a provider from adapter configuration.
    pub fn from_config(config: &StorageConfig) -> Result<Self> {
        Self::new(config.key.clone(), config.auth_type, config.scope.clone())
    }

    /// Build the claims for the configured method.
    fn claims(&self) -> ServiceAccountClaims {
        let iat = Utc::now().timestamp();
        let exp = iat + ASSERTION_LIFETIME_SECS;

        match self.method {
            AuthMethod::Jwt => ServiceAccountClaims {
                iss: self.key.client_email.clone(),
                sub: None,
                scope: self.scope.clone(),
                aud: Some(self.key.token_uri().to_string()),
                iat,
                exp,
            },
            AuthMethod::ServiceAccount => ServiceAccountClaims {
                iss: self.key.client_email.clone(),
                sub: Some(self.key.client_email.clone()),
                scope: self.scope.clone(),
                aud: None,
                iat,
                exp,
            },
        }
    }

    /// Sign claims with the service-account private key (RS256).
    fn sign(&self, claims: &ServiceAccountClaims) -> Result<String> {
        let pem = self.key.private_key_pem();
        let encoding_key = EncodingKey::from_rsa_pem(pem.as_bytes())
            .map_err(|e| Error::Authentication(format!("Invalid private key: {}", e)))?;

        let mut header = Header::new(Algorithm::RS256);
        header.kid = self.key.private_key_id.clone();

        jsonwebtoken::encode(&header, claims, &encoding_key)
            .map_err(|e| Error::Authentication(format!("Failed to sign JWT: {}", e)))
    }

    /// Exchange a signed assertion for an access token.
    async fn exchange_assertion(&self, assertion: &str) -> Result<AuthToken> {
        let response = self
            .http
            .post(self.key.token_uri())
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion)])
            .send()
            .await
            .map_err(|e| Error::Authentication(format!("Token exchange failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let reason = match serde_json::from_str::<BasicErrorResponse>(&body) {
                Ok(err) => err.to_string(),
                Err(_) => body,
            };
            return Err(Error::Authentication(format!(
                "Token endpoint returned {}: {}",
                status, reason
            )));
        }

        let token: BasicTokenResponse = response
            .json()
            .await
            .map_err(|e| Error::Authentication(format!("Invalid token response: {}", e)))?;

        Ok(AuthToken::new(token.access_token().secret().clone()))
    }
}

#[async_trait]
impl CredentialProvider for ServiceAccountAuth {
    async fn authorize(&self) -> Result<AuthToken> {
        let claims = self.claims();
        let signed = self.sign(&claims)?;

        let token = match self.method {
            AuthMethod::Jwt => self.exchange_assertion(&signed).await?,
            AuthMethod::ServiceAccount => AuthToken::new(signed),
        };

        tracing::debug!(
            client_email = %self.key.client_email,
            method = ?self.method,
            "Obtained access token"
        );

        Ok(token)
    }
}
