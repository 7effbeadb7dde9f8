// handlers/protected/prompts/record.rs - GET|PUT|DELETE /prompts/:id handlers
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Extension, Json,
};
use serde_json::{json, Value};

use crate::database::models::{Prompt, PromptPatch};
use crate::database::Stored;
use crate::error::ApiError;
use crate::handlers::protected::utils::require_deleted;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::state::AppState;

/// GET /prompts/:id - Get a single prompt
pub async fn get(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> ApiResult<Stored<Prompt>> {
    match state.prompts.get(&auth_user.user_id, &id).await? {
        Some(prompt) => Ok(ApiResponse::success(prompt)),
        None => Err(ApiError::not_found(format!("prompt {} not found", id))),
    }
}

/// PUT /prompts/:id - Merge the given fields onto a prompt
pub async fn put(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(id): Path<String>,
    payload: Result<Json<PromptPatch>, JsonRejection>,
) -> ApiResult<Stored<Prompt>> {
    let Json(patch) = payload?;
    let updated = state.prompts.update(&auth_user.user_id, &id, patch).await?;
    Ok(ApiResponse::success(updated))
}

/// DELETE /prompts/:id - Delete a prompt
pub async fn delete(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> ApiResult<Value> {
    require_deleted(state.prompts.delete(&auth_user.user_id, &id).await?)?;
    Ok(ApiResponse::success(json!({ "id": id, "deleted": true })))
}
