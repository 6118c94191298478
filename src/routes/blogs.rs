//! Blog content route group.

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use mongodb::bson::doc;
use serde_json::json;
use tracing::warn;

use crate::infra::http::AppState;

pub const MOUNT_PREFIX: &str = "/api/blogs";

pub fn router() -> Router<AppState> {
    Router::new().route("/healthz", get(healthz))
}

/// Liveness of the group's store dependency.
async fn healthz(State(state): State<AppState>) -> Response {
    match state.store.run_command(doc! { "ping": 1 }).await {
        Ok(_) => Json(json!({
            "status": "ok",
            "database": state.store.name(),
        }))
        .into_response(),
        Err(err) => {
            warn!(
                target = "stilo::routes::blogs",
                error = %err,
                "store ping failed"
            );
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "status": "unavailable" })),
            )
                .into_response()
        }
    }
}
