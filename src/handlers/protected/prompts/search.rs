// handlers/protected/prompts/search.rs - GET /prompts/search/:query handler
use axum::{
    extract::{rejection::QueryRejection, Path, Query, State},
    Extension,
};

use crate::database::models::Prompt;
use crate::database::Stored;
use crate::handlers::protected::utils::{PageQuery, SEARCH_PAGE};
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::state::AppState;

/// GET /prompts/search/:query - Case-insensitive match on name and description
pub async fn get(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(term): Path<String>,
    query: Result<Query<PageQuery>, QueryRejection>,
) -> ApiResult<Vec<Stored<Prompt>>> {
    let Query(page) = query?;
    let found = state
        .prompts
        .search(&auth_user.user_id, &term, page.limit(SEARCH_PAGE))
        .await?;
    Ok(ApiResponse::success(found))
}
