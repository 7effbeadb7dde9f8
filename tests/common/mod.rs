#![allow(dead_code)]

use anyhow::{Context, Result};
use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::Utc;
use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::{json, Value};
use tower::ServiceExt;

use prompt_enhancer_api::auth::TokenVerifier;
use prompt_enhancer_api::config::AppConfig;
use prompt_enhancer_api::database::StoreHandle;
use prompt_enhancer_api::{app, AppState};

pub const SECRET: &str = "integration-test-secret";

pub fn config() -> AppConfig {
    let mut config = AppConfig::development();
    config.auth.jwt_secret = Some(SECRET.to_string());
    config.auth.accept_unverified_claims = false;
    config.auth.allow_anonymous_fallback = false;
    config.database.in_memory = true;
    config
}

/// Router running in-process; requests are driven with `oneshot`.
pub struct TestApp {
    pub state: AppState,
}

impl TestApp {
    pub fn new() -> Result<Self> {
        Self::with(config(), StoreHandle::memory())
    }

    pub fn degraded() -> Result<Self> {
        Self::with(config(), StoreHandle::degraded())
    }

    pub fn with(config: AppConfig, store: StoreHandle) -> Result<Self> {
        let verifier = TokenVerifier::from_config(&config).context("failed to build verifier")?;
        Ok(Self {
            state: AppState::new(config, store, verifier),
        })
    }

    pub async fn request(
        &self,
        method: Method,
        path: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> Result<(StatusCode, Value)> {
        let mut builder = Request::builder().method(method).uri(path);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let req = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(serde_json::to_vec(&body)?))?,
            None => builder.body(Body::empty())?,
        };

        let router: Router = app(self.state.clone());
        let resp = router.oneshot(req).await?;
        let status = resp.status();
        let bytes = to_bytes(resp.into_body(), usize::MAX).await?;
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)?
        };
        Ok((status, value))
    }

    pub async fn get(&self, path: &str, token: &str) -> Result<(StatusCode, Value)> {
        self.request(Method::GET, path, Some(token), None).await
    }

    pub async fn post(&self, path: &str, token: &str, body: Value) -> Result<(StatusCode, Value)> {
        self.request(Method::POST, path, Some(token), Some(body)).await
    }

    pub async fn put(&self, path: &str, token: &str, body: Value) -> Result<(StatusCode, Value)> {
        self.request(Method::PUT, path, Some(token), Some(body)).await
    }

    pub async fn delete(&self, path: &str, token: &str) -> Result<(StatusCode, Value)> {
        self.request(Method::DELETE, path, Some(token), None).await
    }
}

/// HS256 token signed with [`SECRET`].
pub fn token(sub: &str) -> String {
    signed_with(sub, SECRET)
}

pub fn signed_with(sub: &str, secret: &str) -> String {
    let claims = json!({
        "sub": sub,
        "email": format!("{}@example.com", sub),
        "exp": Utc::now().timestamp() + 3600,
    });
    encode(&Header::default(), &claims, &EncodingKey::from_secret(secret.as_bytes()))
        .expect("failed to sign test token")
}

/// Three-segment token with a valid payload and a garbage signature.
pub fn unsigned_token(payload: Value) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let body = URL_SAFE_NO_PAD.encode(payload.to_string());
    format!("{}.{}.bm90LWEtc2lnbmF0dXJl", header, body)
}
