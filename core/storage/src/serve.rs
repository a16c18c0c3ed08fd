//! HTTP serving of stored media.
//!
//! [`ServeHandler`] plugs into an axum middleware chain: requests it can
//! satisfy are answered with the remote content, everything else is passed
//! to the next handler unchanged.

use axum::{
    body::Body,
    extract::{Request, State},
    http::{header, Method, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    Router,
};
use std::sync::Arc;

use crate::adapter::StorageAdapter;
use crate::remote::RemoteContent;

/// Request handler streaming stored files.
#[derive(Clone)]
pub struct ServeHandler {
    adapter: Arc<dyn StorageAdapter>,
}

impl ServeHandler {
    /// Serve files from `adapter`.
    pub fn new(adapter: Arc<dyn StorageAdapter>) -> Self {
        Self { adapter }
    }

    /// Answer `request` from the store, or hand it to `next`.
    ///
    /// Only `GET` and `HEAD` are answered. The file identifier is taken from
    /// the request path, relative to wherever the handler is mounted.
    pub async fn handle(&self, request: Request, next: Next) -> Response {
        let method = request.method().clone();
        if method != Method::GET && method != Method::HEAD {
            return next.run(request).await;
        }

        let path = request.uri().path().to_string();
        match self.adapter.stream(&path).await {
            Ok(content) => content_response(content, method == Method::HEAD),
            Err(e) => {
                if e.is_not_found() {
                    tracing::debug!(%path, "File not found, passing to next handler");
                } else {
                    tracing::warn!(
                        %path,
                        error = %e,
                        "Failed to serve file, passing to next handler"
                    );
                }
                next.run(request).await
            }
        }
    }

    /// Standalone router: stored files, or 404.
    ///
    /// Mount with `Router::nest_service("/content/images", handler.router())`.
    pub fn router(self) -> Router {
        Router::new()
            .fallback(not_found)
            .layer(middleware::from_fn_with_state(self, serve_content))
    }
}

/// Middleware entry point for [`ServeHandler`].
///
/// ```ignore
/// let app = Router::new()
///     .route("/{file}", get(fallback_page))
///     .layer(axum::middleware::from_fn_with_state(handler, serve_content));
/// ```
pub async fn serve_content(
    State(handler): State<ServeHandler>,
    request: Request,
    next: Next,
) -> Response {
    handler.handle(request, next).await
}

async fn not_found() -> StatusCode {
    StatusCode::NOT_FOUND
}

fn content_response(content: RemoteContent, head_only: bool) -> Response {
    let mut builder = Response::builder().status(StatusCode::OK);

    if let Some(content_type) = content.content_type.as_deref() {
        builder = builder.header(header::CONTENT_TYPE, content_type);
    }
    if let Some(length) = content.content_length {
        builder = builder.header(header::CONTENT_LENGTH, length);
    }

    let body = if head_only {
        Body::empty()
    } else {
        Body::from_stream(content.stream)
    };

    builder.body(body).unwrap_or_else(|e| {
        tracing::error!(error = %e, "Invalid response headers from remote");
        StatusCode::BAD_GATEWAY.into_response()
    })
}
