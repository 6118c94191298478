use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
    routing::get,
};
use http_body_util::BodyExt;
use mongodb::{Client, options::ClientOptions};
use tempfile::TempDir;
use tower::ServiceExt;

use stilo::infra::http::{AppState, RouteMount, build_router};
use stilo::infra::uploads::UploadStorage;
use stilo::routes;

// The driver handle is lazy; no store needs to be running for pipeline tests.
async fn test_state(uploads_root: &TempDir) -> AppState {
    let options = ClientOptions::parse("mongodb://127.0.0.1:27017/pipeline-tests")
        .await
        .expect("parse options");
    let client = Client::with_options(options).expect("lazy client");

    AppState {
        store: client.database("pipeline-tests"),
        uploads: Arc::new(
            UploadStorage::new(uploads_root.path().to_path_buf()).expect("storage root"),
        ),
    }
}

fn get_request(path: &str) -> Request<Body> {
    Request::builder()
        .uri(path)
        .header(header::ORIGIN, "https://editor.example.net")
        .body(Body::empty())
        .expect("request")
}

async fn body_string(response: axum::response::Response) -> String {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("collect body")
        .to_bytes();
    String::from_utf8(bytes.to_vec()).expect("utf8 body")
}

#[tokio::test]
async fn uploads_are_served_without_any_route_mounts() {
    let dir = TempDir::new().expect("tempdir");
    std::fs::write(dir.path().join("cover.txt"), b"static payload").expect("fixture");

    let app = build_router(test_state(&dir).await, Vec::new(), 100 * 1024);

    let response = app
        .oneshot(get_request("/uploads/cover.txt"))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .map(|value| value.to_str().expect("header value")),
        Some("*")
    );
    assert_eq!(
        response
            .headers()
            .get(header::CONTENT_TYPE)
            .map(|value| value.to_str().expect("header value")),
        Some("text/plain")
    );
    assert_eq!(body_string(response).await, "static payload");
}

#[tokio::test]
async fn unknown_upload_returns_not_found() {
    let dir = TempDir::new().expect("tempdir");
    let app = build_router(test_state(&dir).await, Vec::new(), 100 * 1024);

    let response = app
        .oneshot(get_request("/uploads/absent.png"))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn traversal_upload_paths_return_not_found() {
    let dir = TempDir::new().expect("tempdir");
    let app = build_router(test_state(&dir).await, Vec::new(), 100 * 1024);

    let response = app
        .oneshot(get_request("/uploads/%2E%2E%2Fstilo.toml"))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn mounts_route_strictly_by_prefix() {
    let dir = TempDir::new().expect("tempdir");

    let auth: Router<AppState> = Router::new().route("/whoami", get(|| async { "auth group" }));
    let blogs: Router<AppState> = Router::new().route("/whoami", get(|| async { "blogs group" }));
    let mounts = vec![
        RouteMount::new("/api/auth", auth),
        RouteMount::new("/api/blogs", blogs),
    ];

    let app = build_router(test_state(&dir).await, mounts, 100 * 1024);

    let response = app
        .clone()
        .oneshot(get_request("/api/auth/whoami"))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_string(response).await, "auth group");

    let response = app
        .clone()
        .oneshot(get_request("/api/blogs/whoami"))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_string(response).await, "blogs group");

    // A path under one prefix never reaches the other group's handlers.
    let response = app
        .oneshot(get_request("/api/auth/blogs-only"))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn auth_group_health_responds_without_a_live_store() {
    let dir = TempDir::new().expect("tempdir");
    let mounts = vec![RouteMount::new(
        routes::auth::MOUNT_PREFIX,
        routes::auth::router(),
    )];

    let app = build_router(test_state(&dir).await, mounts, 100 * 1024);

    let response = app
        .oneshot(get_request("/api/auth/healthz"))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response
            .headers()
            .get(header::CONTENT_TYPE)
            .map(|value| value.to_str().expect("header value")),
        Some("application/json")
    );
    assert_eq!(body_string(response).await, r#"{"status":"ok"}"#);
}
