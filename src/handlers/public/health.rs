// handlers/public/health.rs - GET /health handler
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde_json::json;

use crate::database::StoreHealth;
use crate::state::AppState;

/// GET /health - Service and document store status
///
/// 200 when the store answers; 503 with `status: degraded` when it is not
/// configured or unreachable.
pub async fn get(State(state): State<AppState>) -> impl IntoResponse {
    let now = chrono::Utc::now();
    let version = env!("CARGO_PKG_VERSION");

    match state.store.health().await {
        StoreHealth::Ok { backend } => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "data": {
                    "status": "ok",
                    "version": version,
                    "timestamp": now,
                    "store": backend
                }
            })),
        ),
        StoreHealth::Degraded => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({
                "success": false,
                "data": {
                    "status": "degraded",
                    "version": version,
                    "timestamp": now,
                    "store": "not configured"
                }
            })),
        ),
        StoreHealth::Unreachable { backend, reason } => {
            tracing::error!("Health check failed for {} store: {}", backend, reason);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "success": false,
                    "data": {
                        "status": "degraded",
                        "version": version,
                        "timestamp": now,
                        "store": backend
                    }
                })),
            )
        }
    }
}
