// handlers/protected/enhance.rs - POST /enhance handler
use axum::{
    extract::{rejection::JsonRejection, State},
    http::header,
    Extension, Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::ApiError;
use crate::middleware::{ApiResponse, AuthUser};
use crate::state::AppState;

const CACHE_CONTROL: &str = "private, max-age=3600";

#[derive(Debug, Deserialize)]
pub struct EnhanceRequest {
    pub text: String,
}

/// POST /enhance - Rewrite a prompt and record it in the caller's history
pub async fn post(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    payload: Result<Json<EnhanceRequest>, JsonRejection>,
) -> Result<([(header::HeaderName, &'static str); 1], ApiResponse<Value>), ApiError> {
    let Json(request) = payload?;
    let enhanced = state.enhance.enhance(&auth_user.user_id, &request.text).await;

    Ok((
        [(header::CACHE_CONTROL, CACHE_CONTROL)],
        ApiResponse::success(json!({ "enhancedText": enhanced })),
    ))
}
