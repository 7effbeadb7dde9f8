// handlers/protected/variables/record.rs - GET|PUT|DELETE /variables/:id handlers
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Extension, Json,
};
use serde_json::{json, Value};

use crate::database::models::Variable;
use crate::database::Stored;
use crate::error::ApiError;
use crate::handlers::protected::utils::require_deleted;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::state::AppState;

/// GET /variables/:id - Get a single variable
pub async fn get(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> ApiResult<Stored<Variable>> {
    state
        .variables
        .get(&auth_user.user_id, &id)
        .await?
        .map(ApiResponse::success)
        .ok_or_else(|| ApiError::not_found(format!("variable {} not found", id)))
}

/// PUT /variables/:id - Replace a variable
pub async fn put(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(id): Path<String>,
    payload: Result<Json<Variable>, JsonRejection>,
) -> ApiResult<Stored<Variable>> {
    let Json(variable) = payload?;
    let updated = state.variables.update(&auth_user.user_id, &id, variable).await?;
    Ok(ApiResponse::success(updated))
}

/// DELETE /variables/:id - Delete a variable
pub async fn delete(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> ApiResult<Value> {
    require_deleted(state.variables.delete(&auth_user.user_id, &id).await?)?;
    Ok(ApiResponse::success(json!({ "id": id, "deleted": true })))
}
