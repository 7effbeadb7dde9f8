// handlers/protected/history/record.rs - GET|DELETE /history/:id handlers
use axum::{
    extract::{Path, State},
    Extension,
};
use serde_json::{json, Value};

use crate::database::models::HistoryEntry;
use crate::database::Stored;
use crate::error::ApiError;
use crate::handlers::protected::utils::require_deleted;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::state::AppState;

/// GET /history/:id - Get a single history entry
pub async fn get(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> ApiResult<Stored<HistoryEntry>> {
    state
        .history
        .get(&auth_user.user_id, &id)
        .await?
        .map(ApiResponse::success)
        .ok_or_else(|| ApiError::not_found(format!("history entry {} not found", id)))
}

/// DELETE /history/:id - Delete a single history entry
pub async fn delete(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> ApiResult<Value> {
    require_deleted(state.history.delete(&auth_user.user_id, &id).await?)?;
    Ok(ApiResponse::success(json!({ "id": id, "deleted": true })))
}
