//! Request pipeline assembly.
//!
//! The assembler installs the cross-cutting layers (permissive CORS, request
//! body bound, request context + response logging), exposes the uploads
//! directory read-only, and nests each supplied route group at its prefix.
//! It never binds a port; the caller owns the listener.

pub mod middleware;

use std::{io::ErrorKind, sync::Arc};

use axum::{
    Router,
    body::Body,
    extract::{DefaultBodyLimit, Path, State},
    http::{
        HeaderValue, StatusCode,
        header::{CACHE_CONTROL, CONTENT_LENGTH, CONTENT_TYPE},
    },
    middleware as axum_middleware,
    response::{IntoResponse, Response},
    routing::get,
};
use bytes::Bytes;
use mongodb::Database;
use tower_http::cors::{Any, CorsLayer};
use tracing::error;

use crate::infra::uploads::{UploadStorage, UploadStorageError};

use self::middleware::{log_responses, set_request_context};

/// Path prefix the uploads directory is served under. Route mounts must not
/// overlap it.
pub const UPLOADS_PREFIX: &str = "/uploads";

/// Shared state handed to every mounted route group.
#[derive(Clone)]
pub struct AppState {
    pub store: Database,
    pub uploads: Arc<UploadStorage>,
}

/// A route group and the path prefix it is mounted at. The set of mounts is
/// fixed at assembly time.
pub struct RouteMount {
    pub prefix: &'static str,
    pub router: Router<AppState>,
}

impl RouteMount {
    pub fn new(prefix: &'static str, router: Router<AppState>) -> Self {
        Self { prefix, router }
    }
}

/// Assemble the ready-to-serve application from the supplied route mounts.
///
/// Layer order, outermost first: CORS, body bound, request context, response
/// logging; all of them run ahead of static serving and every mounted handler.
pub fn build_router(state: AppState, mounts: Vec<RouteMount>, body_limit: usize) -> Router {
    let mut router = Router::new().route(
        &format!("{UPLOADS_PREFIX}/{{*path}}"),
        get(serve_upload),
    );

    for mount in mounts {
        router = router.nest(mount.prefix, mount.router);
    }

    router
        .with_state(state)
        .layer(axum_middleware::from_fn(log_responses))
        .layer(axum_middleware::from_fn(set_request_context))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
}

async fn serve_upload(State(state): State<AppState>, Path(path): Path<String>) -> Response {
    match state.uploads.read(&path).await {
        Ok(bytes) => build_upload_response(&path, bytes),
        Err(UploadStorageError::InvalidPath) => upload_not_found(),
        Err(UploadStorageError::Io(err)) if err.kind() == ErrorKind::NotFound => {
            upload_not_found()
        }
        Err(err) => {
            error!(
                target = "stilo::http::serve_upload",
                path = %path,
                error = %err,
                "failed to read stored upload"
            );
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to read uploaded file",
            )
                .into_response()
        }
    }
}

fn upload_not_found() -> Response {
    (StatusCode::NOT_FOUND, "Upload not found").into_response()
}

fn build_upload_response(path: &str, bytes: Bytes) -> Response {
    let mut response = Response::new(Body::from(bytes.clone()));
    *response.status_mut() = StatusCode::OK;

    let headers = response.headers_mut();
    let mime = mime_guess::from_path(path).first_or_octet_stream();
    if let Ok(value) = HeaderValue::from_str(mime.as_ref()) {
        headers.insert(CONTENT_TYPE, value);
    }
    if let Ok(value) = HeaderValue::from_str(&bytes.len().to_string()) {
        headers.insert(CONTENT_LENGTH, value);
    }
    headers.insert(
        CACHE_CONTROL,
        HeaderValue::from_static("public, max-age=31536000, immutable"),
    );

    response
}
