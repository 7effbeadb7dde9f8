// handlers/protected/history/search.rs - GET /history/search/:query handler
use axum::{
    extract::{rejection::QueryRejection, Path, Query, State},
    Extension,
};

use crate::database::models::HistoryEntry;
use crate::database::Stored;
use crate::handlers::protected::utils::{PageQuery, SEARCH_PAGE};
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::state::AppState;

/// GET /history/search/:query - Case-insensitive match on original and enhanced text
pub async fn get(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(term): Path<String>,
    query: Result<Query<PageQuery>, QueryRejection>,
) -> ApiResult<Vec<Stored<HistoryEntry>>> {
    let Query(page) = query?;
    let found = state
        .history
        .search(&auth_user.user_id, &term, page.limit(SEARCH_PAGE))
        .await?;
    Ok(ApiResponse::success(found))
}
