// handlers/public/root.rs - GET / handler
use axum::{extract::State, http::HeaderMap};
use serde_json::{json, Value};

use crate::middleware::{extract_bearer_token, ApiResponse, ApiResult};
use crate::state::AppState;

/// GET / - API information
///
/// A bearer token is optional here; when one is sent and accepted the
/// response reports `authenticated: true`.
pub async fn get(State(state): State<AppState>, headers: HeaderMap) -> ApiResult<Value> {
    let authenticated = match extract_bearer_token(&headers) {
        Ok(token) => state.verifier.authenticate(Some(token)).await.is_ok(),
        Err(_) => false,
    };

    Ok(ApiResponse::success(json!({
        "name": "Prompt Enhancer API",
        "version": env!("CARGO_PKG_VERSION"),
        "description": "Prompt enhancement with per-user prompts, variables and history",
        "authenticated": authenticated,
        "endpoints": {
            "home": "/ (public)",
            "health": "/health (public)",
            "enhance": "/enhance (protected)",
            "auth": "/auth/whoami (protected)",
            "prompts": "/prompts[/:id], /prompts/search/:query (protected)",
            "history": "/history[/:id], /history/recent, /history/search/:query (protected)",
            "variables": "/variables[/:id] (protected)",
        }
    })))
}
