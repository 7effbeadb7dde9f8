// handlers/protected/prompts/collection.rs - GET|POST /prompts handlers
use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query, State,
    },
    Extension, Json,
};

use crate::database::models::{NewPrompt, Prompt};
use crate::database::Stored;
use crate::handlers::protected::utils::{PageQuery, PROMPT_PAGE};
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::state::AppState;

/// GET /prompts - List the caller's prompts, newest first
pub async fn get(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    query: Result<Query<PageQuery>, QueryRejection>,
) -> ApiResult<Vec<Stored<Prompt>>> {
    let Query(page) = query?;
    let prompts = state
        .prompts
        .list(&auth_user.user_id, page.limit(PROMPT_PAGE), page.offset())
        .await?;
    Ok(ApiResponse::success(prompts))
}

/// POST /prompts - Create a prompt; variables are extracted from `prompt_text`
pub async fn post(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    payload: Result<Json<NewPrompt>, JsonRejection>,
) -> ApiResult<Stored<Prompt>> {
    let Json(input) = payload?;
    let created = state.prompts.create(&auth_user.user_id, input).await?;
    Ok(ApiResponse::created(created))
}
