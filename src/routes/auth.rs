//! Authentication route group.

use axum::{Json, Router, routing::get};
use serde_json::{Value, json};

use crate::infra::http::AppState;

pub const MOUNT_PREFIX: &str = "/api/auth";

pub fn router() -> Router<AppState> {
    Router::new().route("/healthz", get(healthz))
}

async fn healthz() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
