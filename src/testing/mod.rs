//! Fixtures shared by unit tests.

use chrono::Utc;
use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::json;

use crate::auth::TokenVerifier;
use crate::config::AppConfig;
use crate::database::StoreHandle;
use crate::state::AppState;

pub const TEST_SECRET: &str = "unit-test-secret";

/// Development preset with an HS256 secret and unverified payloads refused.
pub fn test_config() -> AppConfig {
    let mut config = AppConfig::development();
    config.auth.jwt_secret = Some(TEST_SECRET.to_string());
    config.auth.accept_unverified_claims = false;
    config.database.in_memory = true;
    config
}

pub fn state_with(config: AppConfig, store: StoreHandle) -> AppState {
    let verifier = TokenVerifier::from_config(&config).expect("verifier");
    AppState::new(config, store, verifier)
}

pub fn memory_state() -> AppState {
    state_with(test_config(), StoreHandle::memory())
}

/// HS256 token for `sub`, valid for an hour.
pub fn sign_token(sub: &str) -> String {
    let claims = json!({
        "sub": sub,
        "email": format!("{}@example.com", sub),
        "exp": Utc::now().timestamp() + 3600,
    });
    encode(&Header::default(), &claims, &EncodingKey::from_secret(TEST_SECRET.as_bytes())).expect("sign")
}
