// handlers/protected/auth/whoami.rs - GET /auth/whoami handler
use axum::Extension;
use serde_json::{json, Value};

use crate::middleware::{ApiResponse, ApiResult, AuthUser};

/// GET /auth/whoami - Identity resolved from the bearer token
pub async fn get(Extension(auth_user): Extension<AuthUser>) -> ApiResult<Value> {
    Ok(ApiResponse::success(json!({
        "user_id": auth_user.user_id,
        "email": auth_user.email,
        "source": auth_user.source,
    })))
}
