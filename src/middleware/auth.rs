use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::auth::{AuthError, ClaimSource, IdentityClaim};
use crate::error::ApiError;
use crate::state::AppState;

/// Authenticated user context resolved from the bearer token
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuthUser {
    pub user_id: String,
    pub email: String,
    pub source: ClaimSource,
}

impl From<IdentityClaim> for AuthUser {
    fn from(claim: IdentityClaim) -> Self {
        Self {
            user_id: claim.subject_id,
            email: claim.email,
            source: claim.source,
        }
    }
}

/// Bearer authentication middleware: verifies the token and injects
/// [`AuthUser`] into the request extensions
pub async fn bearer_auth_middleware(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Response {
    let token = match extract_bearer_token(&headers) {
        Ok(token) => token,
        Err(e) => return ApiError::from(e).into_response(),
    };

    match state.verifier.authenticate(Some(token)).await {
        Ok(claim) => {
            request.extensions_mut().insert(AuthUser::from(claim));
            next.run(request).await
        }
        Err(e) => {
            tracing::warn!("Rejected request to {}: {}", request.uri().path(), e);
            ApiError::from(e).into_response()
        }
    }
}

/// Extract the bearer token from the Authorization header
pub fn extract_bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let auth_header = headers
        .get(axum::http::header::AUTHORIZATION)
        .ok_or(AuthError::MissingCredentials)?;

    let auth_str = auth_header
        .to_str()
        .map_err(|_| AuthError::InvalidCredentials("Invalid Authorization header format".to_string()))?;

    let token = auth_str
        .strip_prefix("Bearer ")
        .or_else(|| auth_str.strip_prefix("bearer "))
        .ok_or_else(|| {
            AuthError::InvalidCredentials("Authorization header must use Bearer token format".to_string())
        })?
        .trim();

    if token.is_empty() {
        return Err(AuthError::InvalidCredentials("Empty bearer token".to_string()));
    }
    Ok(token)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(value: &str) -> HeaderMap {
        let mut h = HeaderMap::new();
        h.insert(axum::http::header::AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        h
    }

    #[test]
    fn parses_bearer_header() {
        assert_eq!(extract_bearer_token(&headers("Bearer abc.def")).unwrap(), "abc.def");
        assert!(matches!(
            extract_bearer_token(&HeaderMap::new()),
            Err(AuthError::MissingCredentials)
        ));
        assert!(matches!(
            extract_bearer_token(&headers("Basic xyz")),
            Err(AuthError::InvalidCredentials(_))
        ));
        assert!(matches!(
            extract_bearer_token(&headers("Bearer   ")),
            Err(AuthError::InvalidCredentials(_))
        ));
    }
}
