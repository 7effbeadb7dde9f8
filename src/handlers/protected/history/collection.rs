// handlers/protected/history/collection.rs - GET|DELETE /history, GET /history/recent
use axum::{
    extract::{rejection::QueryRejection, Query, State},
    Extension,
};
use serde_json::{json, Value};

use crate::database::models::HistoryEntry;
use crate::database::Stored;
use crate::handlers::protected::utils::{PageQuery, HISTORY_PAGE, RECENT_PAGE};
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::state::AppState;

/// GET /history - Page through the caller's history, newest first
pub async fn get(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    query: Result<Query<PageQuery>, QueryRejection>,
) -> ApiResult<Vec<Stored<HistoryEntry>>> {
    let Query(page) = query?;
    let entries = state
        .history
        .list(&auth_user.user_id, page.limit(HISTORY_PAGE), page.offset())
        .await?;
    Ok(ApiResponse::success(entries))
}

/// GET /history/recent - Most recent entries by timestamp
pub async fn recent(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    query: Result<Query<PageQuery>, QueryRejection>,
) -> ApiResult<Vec<Stored<HistoryEntry>>> {
    let Query(page) = query?;
    let entries = state
        .history
        .recent(&auth_user.user_id, page.limit(RECENT_PAGE))
        .await?;
    Ok(ApiResponse::success(entries))
}

/// DELETE /history - Remove every history entry of the caller
pub async fn delete(State(state): State<AppState>, Extension(auth_user): Extension<AuthUser>) -> ApiResult<Value> {
    let deleted = state.history.clear(&auth_user.user_id).await?;
    Ok(ApiResponse::success(json!({ "deleted": deleted })))
}
