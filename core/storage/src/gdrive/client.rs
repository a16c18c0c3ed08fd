//! Google Drive API client.

use async_trait::async_trait;
use bytes::Bytes;
use futures::{stream, StreamExt};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use reqwest::{header, Body, Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use url::Url;
use uuid::Uuid;

use mediadrive_common::{Error, RemoteFileId, Result};

use crate::remote::{
    AuthToken, ByteStream, NewFile, PermissionGrant, RemoteContent, RemoteFileApi,
    RemoteFileHandle,
};

/// Google Drive API base URL.
const DRIVE_API_BASE: &str = "https://www.googleapis.com/drive/v3";
/// Google Drive upload API base URL.
const DRIVE_UPLOAD_BASE: &str = "https://www.googleapis.com/upload/drive/v3";

/// Fields requested for every file resource.
const FILE_FIELDS: &str = "id,name,mimeType,size,fileExtension";

/// Characters left unescaped in a file ID path segment.
const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'_');

/// Google Drive file resource, restricted to [`FILE_FIELDS`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveFile {
    /// File ID.
    pub id: String,
    /// File name.
    #[serde(default)]
    pub name: Option<String>,
    /// MIME type.
    #[serde(default)]
    pub mime_type: Option<String>,
    /// File size in bytes, encoded as a string by the API.
    #[serde(default)]
    pub size: Option<String>,
    /// Final component of the name after the last dot.
    #[serde(default)]
    pub file_extension: Option<String>,
}

impl DriveFile {
    /// Get size as u64.
    pub fn size_bytes(&self) -> Option<u64> {
        self.size.as_ref().and_then(|s| s.parse().ok())
    }

    /// Convert to a storage handle.
    pub fn into_handle(self) -> Result<RemoteFileHandle> {
        let size = self.size_bytes();
        Ok(RemoteFileHandle {
            id: RemoteFileId::new(self.id)?,
            name: self.name,
            mime_type: self.mime_type,
            file_extension: self.file_extension,
            size,
        })
    }
}

/// Remote call being made, for error classification.
#[derive(Debug, Clone, Copy)]
enum Call {
    Upload,
    Fetch,
    Delete,
    Permission,
}

impl Call {
    fn error(self, message: String) -> Error {
        match self {
            Call::Upload => Error::Upload(message),
            Call::Fetch => Error::Fetch(message),
            Call::Delete => Error::Delete(message),
            Call::Permission => Error::Permission(message),
        }
    }
}

/// Google Drive API client.
///
/// Owns one HTTP client for its whole lifetime; every call carries the
/// token it is given.
pub struct DriveClient {
    http: Client,
    api_base: String,
    upload_base: String,
}

impl DriveClient {
    /// Create a client for the public Google endpoints.
    pub fn new() -> Result<Self> {
        Self::with_base_urls(DRIVE_API_BASE, DRIVE_UPLOAD_BASE)
    }

    /// Create a client for custom endpoints.
    ///
    /// # Errors
    /// - `Error::InvalidInput` if either base is not an absolute URL
    pub fn with_base_urls(api_base: &str, upload_base: &str) -> Result<Self> {
        for base in [api_base, upload_base] {
            Url::parse(base)
                .map_err(|e| Error::InvalidInput(format!("Invalid API URL {:?}: {}", base, e)))?;
        }

        let http = Client::builder()
            .user_agent(concat!("MediaDrive/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::InvalidInput(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http,
            api_base: api_base.trim_end_matches('/').to_string(),
            upload_base: upload_base.trim_end_matches('/').to_string(),
        })
    }

    fn file_url(&self, id: &RemoteFileId) -> String {
        format!(
            "{}/files/{}",
            self.api_base,
            utf8_percent_encode(id.as_str(), PATH_SEGMENT)
        )
    }

    /// Build a streamed `multipart/related` body: JSON metadata, then content.
    fn multipart_body(file: &NewFile, content: ByteStream) -> Result<(String, Body)> {
        let boundary = format!("mediadrive-{}", Uuid::new_v4().simple());
        let metadata = serde_json::to_string(file)?;

        let head = format!(
            concat!(
                "--{b}\r\nContent-Type: application/json; charset=UTF-8\r\n\r\n{m}\r\n",
                "--{b}\r\nContent-Type: {t}\r\n\r\n",
            ),
            b = boundary,
            m = metadata,
            t = file.mime_type,
        );
        let tail = format!("\r\n--{}--\r\n", boundary);

        let parts = stream::once(async move { Ok::<_, Error>(Bytes::from(head)) })
            .chain(content)
            .chain(stream::once(async move { Ok(Bytes::from(tail)) }));

        Ok((
            format!("multipart/related; boundary={}", boundary),
            Body::wrap_stream(parts),
        ))
    }

    /// Map non-success statuses onto the error taxonomy.
    async fn check(response: Response, call: Call, id: Option<&RemoteFileId>) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let target = id.map(|id| id.to_string()).unwrap_or_else(|| "new file".to_string());
        let body = response.text().await.unwrap_or_default();

        match (status, call) {
            (StatusCode::NOT_FOUND, Call::Fetch) => Err(Error::NotFound(target)),
            _ => Err(call.error(format!("{}: {} - {}", target, status, body))),
        }
    }

    async fn parse_file(response: Response, call: Call) -> Result<RemoteFileHandle> {
        let file: DriveFile = response
            .json()
            .await
            .map_err(|e| call.error(format!("Failed to parse response: {}", e)))?;
        file.into_handle()
    }
}

#[async_trait]
impl RemoteFileApi for DriveClient {
    fn name(&self) -> &str {
        "gdrive"
    }

    async fn create_file(
        &self,
        token: &AuthToken,
        file: &NewFile,
        content: ByteStream,
    ) -> Result<RemoteFileHandle> {
        let url = format!("{}/files", self.upload_base);
        let (content_type, body) = Self::multipart_body(file, content)?;

        let response = self
            .http
            .post(&url)
            .header(header::AUTHORIZATION, token.bearer())
            .header(header::CONTENT_TYPE, content_type)
            .query(&[
                ("uploadType", "multipart"),
                ("supportsAllDrives", "true"),
                ("fields", FILE_FIELDS),
            ])
            .body(body)
            .send()
            .await
            .map_err(|e| Error::Upload(format!("Failed to upload {}: {}", file.name, e)))?;

        let response = Self::check(response, Call::Upload, None).await?;
        Self::parse_file(response, Call::Upload).await
    }

    async fn get_metadata(
        &self,
        token: &AuthToken,
        id: &RemoteFileId,
    ) -> Result<RemoteFileHandle> {
        let response = self
            .http
            .get(self.file_url(id))
            .header(header::AUTHORIZATION, token.bearer())
            .query(&[("supportsAllDrives", "true"), ("fields", FILE_FIELDS)])
            .send()
            .await
            .map_err(|e| Error::Fetch(format!("Failed to get {}: {}", id, e)))?;

        let response = Self::check(response, Call::Fetch, Some(id)).await?;
        Self::parse_file(response, Call::Fetch).await
    }

    async fn get_content(&self, token: &AuthToken, id: &RemoteFileId) -> Result<RemoteContent> {
        let response = self
            .http
            .get(self.file_url(id))
            .header(header::AUTHORIZATION, token.bearer())
            .query(&[("alt", "media"), ("supportsAllDrives", "true")])
            .send()
            .await
            .map_err(|e| Error::Fetch(format!("Failed to download {}: {}", id, e)))?;

        let response = Self::check(response, Call::Fetch, Some(id)).await?;

        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(String::from);
        let content_length = response.content_length();

        let stream = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(|e| Error::Fetch(format!("Stream read error: {}", e))));

        Ok(RemoteContent {
            content_type,
            content_length,
            stream: Box::pin(stream),
        })
    }

    async fn delete_file(&self, token: &AuthToken, id: &RemoteFileId) -> Result<()> {
        let response = self
            .http
            .delete(self.file_url(id))
            .header(header::AUTHORIZATION, token.bearer())
            .query(&[("supportsAllDrives", "true")])
            .send()
            .await
            .map_err(|e| Error::Delete(format!("Failed to delete {}: {}", id, e)))?;

        Self::check(response, Call::Delete, Some(id)).await?;
        Ok(())
    }

    async fn create_permission(
        &self,
        token: &AuthToken,
        id: &RemoteFileId,
        grant: &PermissionGrant,
    ) -> Result<()> {
        let url = format!("{}/permissions", self.file_url(id));

        let response = self
            .http
            .post(&url)
            .header(header::AUTHORIZATION, token.bearer())
            .query(&[("supportsAllDrives", "true"), ("fields", "id")])
            .json(grant)
            .send()
            .await
            .map_err(|e| Error::Permission(format!("Failed to share {}: {}", id, e)))?;

        Self::check(response, Call::Permission, Some(id)).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Bytes as BodyBytes,
        extract::{Path, Query, State},
        http::{HeaderMap, StatusCode},
        response::IntoResponse,
        routing::{get, post},
        Json, Router,
    };
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};
    use tokio::net::TcpListener;

    /// Minimal stand-in for the Drive endpoints.
    #[derive(Clone, Default)]
    struct FakeDrive {
        files: Arc<Mutex<HashMap<String, (String, Vec<u8>)>>>,
        permissions: Arc<Mutex<Vec<(String, serde_json::Value)>>>,
    }

    async fn upload(
        State(drive): State<FakeDrive>,
        Query(query): Query<HashMap<String, String>>,
        headers: HeaderMap,
        body: BodyBytes,
    ) -> impl IntoResponse {
        assert_eq!(query.get("uploadType").map(String::as_str), Some("multipart"));
        assert_eq!(headers[header::AUTHORIZATION], "Bearer test-token");

        let content_type = headers[header::CONTENT_TYPE].to_str().unwrap().to_string();
        let boundary = content_type.split("boundary=").nth(1).unwrap().to_string();

        let text = String::from_utf8_lossy(&body).to_string();
        let parts: Vec<&str> = text.split(&format!("--{}", boundary)).collect();
        // "", metadata part, media part, "--\r\n"
        assert_eq!(parts.len(), 4);

        let metadata_json = parts[1].split("\r\n\r\n").nth(1).unwrap().trim_end();
        let metadata: serde_json::Value = serde_json::from_str(metadata_json).unwrap();
        let content = parts[2]
            .split_once("\r\n\r\n")
            .unwrap()
            .1
            .strip_suffix("\r\n")
            .unwrap()
            .as_bytes()
            .to_vec();

        assert_eq!(metadata["parents"], serde_json::json!(["F1"]));
        let name = metadata["name"].as_str().unwrap().to_string();
        let extension = name.rsplit_once('.').map(|(_, e)| e.to_string());
        drive
            .files
            .lock()
            .unwrap()
            .insert("abc123".to_string(), (name.clone(), content.clone()));

        Json(serde_json::json!({
            "id": "abc123",
            "name": name,
            "mimeType": metadata["mimeType"],
            "size": content.len().to_string(),
            "fileExtension": extension,
        }))
    }

    async fn get_file(
        State(drive): State<FakeDrive>,
        Path(id): Path<String>,
        Query(query): Query<HashMap<String, String>>,
    ) -> axum::response::Response {
        let files = drive.files.lock().unwrap();
        let Some((name, data)) = files.get(&id) else {
            return (StatusCode::NOT_FOUND, "File not found").into_response();
        };

        if query.get("alt").map(String::as_str) == Some("media") {
            ([(header::CONTENT_TYPE, "image/png")], data.clone()).into_response()
        } else {
            Json(serde_json::json!({
                "id": id,
                "name": name,
                "size": data.len().to_string(),
            }))
            .into_response()
        }
    }

    async fn delete_file(State(drive): State<FakeDrive>, Path(id): Path<String>) -> StatusCode {
        match drive.files.lock().unwrap().remove(&id) {
            Some(_) => StatusCode::NO_CONTENT,
            None => StatusCode::NOT_FOUND,
        }
    }

    async fn create_permission(
        State(drive): State<FakeDrive>,
        Path(id): Path<String>,
        Json(grant): Json<serde_json::Value>,
    ) -> axum::response::Response {
        if id == "locked" {
            return (StatusCode::FORBIDDEN, "sharing disabled").into_response();
        }
        drive.permissions.lock().unwrap().push((id, grant));
        Json(serde_json::json!({ "id": "anyoneWithLink" })).into_response()
    }

    async fn spawn_fake_drive() -> (DriveClient, FakeDrive) {
        let drive = FakeDrive::default();
        let app = Router::new()
            .route("/upload/drive/v3/files", post(upload))
            .route("/drive/v3/files/{id}", get(get_file).delete(delete_file))
            .route("/drive/v3/files/{id}/permissions", post(create_permission))
            .with_state(drive.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let client = DriveClient::with_base_urls(
            &format!("http://{}/drive/v3", addr),
            &format!("http://{}/upload/drive/v3/", addr),
        )
        .unwrap();

        (client, drive)
    }

    fn token() -> AuthToken {
        AuthToken::new("test-token")
    }

    fn id(raw: &str) -> RemoteFileId {
        RemoteFileId::new(raw).unwrap()
    }

    #[test]
    fn test_drive_file_into_handle() {
        let file: DriveFile = serde_json::from_value(serde_json::json!({
            "id": "abc123",
            "name": "cat.png",
            "mimeType": "image/png",
            "size": "12345",
            "fileExtension": "png"
        }))
        .unwrap();

        assert_eq!(file.size_bytes(), Some(12345));

        let handle = file.into_handle().unwrap();
        assert_eq!(handle.id.as_str(), "abc123");
        assert_eq!(handle.file_extension.as_deref(), Some("png"));
        assert_eq!(handle.size, Some(12345));
    }

    #[test]
    fn test_drive_file_empty_id_rejected() {
        let file: DriveFile = serde_json::from_value(serde_json::json!({ "id": "" })).unwrap();
        assert!(file.into_handle().is_err());
    }

    #[test]
    fn test_invalid_base_url() {
        assert!(DriveClient::with_base_urls("not a url", DRIVE_UPLOAD_BASE).is_err());
    }

    #[test]
    fn test_file_url_escapes_id() {
        let client = DriveClient::new().unwrap();
        assert_eq!(
            client.file_url(&id("a/b c")),
            "https://www.googleapis.com/drive/v3/files/a%2Fb%20c"
        );
        assert_eq!(
            client.file_url(&id("1AbC-d_E")),
            "https://www.googleapis.com/drive/v3/files/1AbC-d_E"
        );
    }

    #[tokio::test]
    async fn test_create_file_multipart() {
        let (client, drive) = spawn_fake_drive().await;

        let file = NewFile {
            name: "cat.png".to_string(),
            mime_type: "image/png".to_string(),
            parents: vec!["F1".to_string()],
        };
        let content: ByteStream = Box::pin(stream::iter(vec![
            Ok(Bytes::from_static(b"PNG")),
            Ok(Bytes::from_static(b"DATA")),
        ]));

        let handle = client.create_file(&token(), &file, content).await.unwrap();

        assert_eq!(handle.id.as_str(), "abc123");
        assert_eq!(handle.file_extension.as_deref(), Some("png"));
        assert_eq!(handle.size, Some(7));

        let files = drive.files.lock().unwrap();
        assert_eq!(files["abc123"], ("cat.png".to_string(), b"PNGDATA".to_vec()));
    }

    #[tokio::test]
    async fn test_get_metadata_and_content() {
        let (client, drive) = spawn_fake_drive().await;
        drive
            .files
            .lock()
            .unwrap()
            .insert("abc123".to_string(), ("cat.png".to_string(), b"meow".to_vec()));

        let handle = client.get_metadata(&token(), &id("abc123")).await.unwrap();
        assert_eq!(handle.name.as_deref(), Some("cat.png"));
        assert_eq!(handle.size, Some(4));

        let content = client.get_content(&token(), &id("abc123")).await.unwrap();
        assert_eq!(content.content_type.as_deref(), Some("image/png"));
        assert_eq!(content.into_bytes().await.unwrap(), Bytes::from_static(b"meow"));
    }

    #[tokio::test]
    async fn test_get_missing_is_not_found() {
        let (client, _drive) = spawn_fake_drive().await;

        let result = client.get_metadata(&token(), &id("missing")).await;
        assert!(matches!(result, Err(Error::NotFound(_))));

        let result = client.get_content(&token(), &id("missing")).await;
        assert!(matches!(result, Err(Error::NotFound(_))));
    }

    #[tokio::test]
    async fn test_delete() {
        let (client, drive) = spawn_fake_drive().await;
        drive
            .files
            .lock()
            .unwrap()
            .insert("abc123".to_string(), ("cat.png".to_string(), vec![]));

        client.delete_file(&token(), &id("abc123")).await.unwrap();
        assert!(drive.files.lock().unwrap().is_empty());

        let result = client.delete_file(&token(), &id("abc123")).await;
        assert!(matches!(result, Err(Error::Delete(_))));
    }

    #[tokio::test]
    async fn test_create_permission() {
        let (client, drive) = spawn_fake_drive().await;

        client
            .create_permission(&token(), &id("abc123"), &PermissionGrant::anyone_reader())
            .await
            .unwrap();

        let permissions = drive.permissions.lock().unwrap();
        assert_eq!(permissions.len(), 1);
        assert_eq!(permissions[0].0, "abc123");
        assert_eq!(permissions[0].1, serde_json::json!({"type": "anyone", "role": "reader"}));
    }

    #[tokio::test]
    async fn test_create_permission_rejected() {
        let (client, _drive) = spawn_fake_drive().await;

        let result = client
            .create_permission(&token(), &id("locked"), &PermissionGrant::anyone_reader())
            .await;
        assert!(matches!(result, Err(Error::Permission(_))));
    }

    #[tokio::test]
    async fn test_rejected_token_maps_to_call_error() {
        let app = Router::new()
            .fallback(|| async { (StatusCode::UNAUTHORIZED, "invalid credentials") });
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        let client = DriveClient::with_base_urls(
            &format!("http://{}/drive/v3", addr),
            &format!("http://{}/upload/drive/v3", addr),
        )
        .unwrap();

        let file = NewFile {
            name: "cat.png".to_string(),
            mime_type: "image/png".to_string(),
            parents: Vec::new(),
        };
        let content: ByteStream = Box::pin(stream::once(async { Ok(Bytes::from_static(b"meow")) }));
        let result = client.create_file(&token(), &file, content).await;
        assert!(matches!(result, Err(Error::Upload(_))));

        let result = client.get_metadata(&token(), &id("abc123")).await;
        assert!(matches!(result, Err(Error::Fetch(_))));

        let result = client.get_content(&token(), &id("abc123")).await;
        assert!(matches!(result, Err(Error::Fetch(_))));

        let result = client.delete_file(&token(), &id("abc123")).await;
        assert!(matches!(result, Err(Error::Delete(_))));

        let result = client
            .create_permission(&token(), &id("abc123"), &PermissionGrant::anyone_reader())
            .await;
        assert!(matches!(result, Err(Error::Permission(_))));
    }
}
