//! Liveness and readiness probes.

use crate::server::state::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde_json::{json, Value};

/// `GET /health` — process liveness.
pub async fn health() -> Json<Value> {
    Json(json!({ "status": "healthy" }))
}

/// `GET /ready` — dependency readiness.
///
/// With a database attached this pings it; the in-memory store is always
/// ready.
pub async fn ready(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    if let Some(pool) = &state.db {
        if let Err(err) = sqlx::query("SELECT 1").execute(pool).await {
            tracing::warn!(error = %err, "readiness check failed");
            return (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "status": "unavailable", "database": "unreachable" })),
            );
        }
    }
    (StatusCode::OK, Json(json!({ "status": "ready" })))
}
