// handlers/protected/variables/collection.rs - GET|POST /variables handlers
use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query, State,
    },
    Extension, Json,
};

use crate::database::models::Variable;
use crate::database::Stored;
use crate::handlers::protected::utils::{PageQuery, VARIABLE_PAGE};
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::state::AppState;

/// GET /variables - List the caller's variables
pub async fn get(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    query: Result<Query<PageQuery>, QueryRejection>,
) -> ApiResult<Vec<Stored<Variable>>> {
    let Query(page) = query?;
    let variables = state
        .variables
        .list(&auth_user.user_id, page.limit(VARIABLE_PAGE), page.offset())
        .await?;
    Ok(ApiResponse::success(variables))
}

/// POST /variables - Create a variable
pub async fn post(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    payload: Result<Json<Variable>, JsonRejection>,
) -> ApiResult<Stored<Variable>> {
    let Json(variable) = payload?;
    let created = state.variables.create(&auth_user.user_id, variable).await?;
    Ok(ApiResponse::created(created))
}
