use std::time::{Duration, Instant};

use async_trait::async_trait;
use jsonwebtoken::jwk::JwkSet;
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use serde::Deserialize;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, info};

const JWKS_CACHE_TTL: Duration = Duration::from_secs(3600);
const JWKS_FETCH_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Invalid token: {0}")]
    InvalidToken(String),

    #[error("Signing key not found: {0}")]
    UnknownKey(String),

    #[error("Identity provider unavailable: {0}")]
    Unavailable(String),
}

impl From<jsonwebtoken::errors::Error> for ProviderError {
    fn from(e: jsonwebtoken::errors::Error) -> Self {
        ProviderError::InvalidToken(e.to_string())
    }
}

/// Claims an identity provider hands back after checking the signature.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProviderClaims {
    #[serde(default)]
    pub uid: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub sub: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub exp: Option<i64>,
}

impl ProviderClaims {
    /// First non-empty of `uid`, `user_id`, `sub`.
    pub fn subject(&self) -> Option<&str> {
        [&self.uid, &self.user_id, &self.sub]
            .into_iter()
            .flatten()
            .map(String::as_str)
            .find(|s| !s.is_empty())
    }

    /// Time left before `exp` as of `now` (unix seconds). `None` when the
    /// token carries no expiry.
    pub fn remaining_lifetime(&self, now: i64) -> Option<Duration> {
        self.exp.map(|exp| Duration::from_secs(exp.saturating_sub(now).max(0) as u64))
    }
}

/// Signature-checking token verification.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    fn name(&self) -> &'static str;

    async fn verify(&self, token: &str) -> Result<ProviderClaims, ProviderError>;
}

/// HS256 tokens signed with a shared secret.
pub struct SecretIdentityProvider {
    key: DecodingKey,
    validation: Validation,
}

impl SecretIdentityProvider {
    pub fn new(secret: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_aud = false;
        Self {
            key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }
}

#[async_trait]
impl IdentityProvider for SecretIdentityProvider {
    fn name(&self) -> &'static str {
        "hs256"
    }

    async fn verify(&self, token: &str) -> Result<ProviderClaims, ProviderError> {
        let data = decode::<ProviderClaims>(token, &self.key, &self.validation)?;
        Ok(data.claims)
    }
}

/// RS256 ID tokens checked against a remote JWKS document, with audience
/// `project_id` and issuer `https://securetoken.google.com/{project_id}`.
pub struct JwksIdentityProvider {
    client: reqwest::Client,
    jwks_url: String,
    validation: Validation,
    keys: RwLock<Option<(Instant, JwkSet)>>,
}

impl JwksIdentityProvider {
    pub fn new(project_id: &str, jwks_url: impl Into<String>) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .timeout(JWKS_FETCH_TIMEOUT)
            .build()
            .map_err(|e| ProviderError::Unavailable(e.to_string()))?;

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_audience(&[project_id]);
        validation.set_issuer(&[format!("https://securetoken.google.com/{}", project_id)]);

        Ok(Self {
            client,
            jwks_url: jwks_url.into(),
            validation,
            keys: RwLock::new(None),
        })
    }

    async fn fetch_keys(&self) -> Result<JwkSet, ProviderError> {
        let response = self
            .client
            .get(&self.jwks_url)
            .send()
            .await
            .map_err(|e| ProviderError::Unavailable(e.to_string()))?;
        if !response.status().is_success() {
            return Err(ProviderError::Unavailable(format!(
                "JWKS endpoint returned {}",
                response.status()
            )));
        }
        let keys = response
            .json::<JwkSet>()
            .await
            .map_err(|e| ProviderError::Unavailable(e.to_string()))?;
        info!("Fetched {} signing keys from {}", keys.keys.len(), self.jwks_url);
        Ok(keys)
    }

    async fn decoding_key(&self, kid: &str) -> Result<DecodingKey, ProviderError> {
        {
            let cached = self.keys.read().await;
            if let Some((fetched_at, keys)) = cached.as_ref() {
                if fetched_at.elapsed() < JWKS_CACHE_TTL {
                    if let Some(jwk) = keys.find(kid) {
                        return DecodingKey::from_jwk(jwk).map_err(ProviderError::from);
                    }
                }
            }
        }

        // Stale, missing, or rotated: refetch once.
        debug!("Refreshing JWKS for kid {}", kid);
        let keys = self.fetch_keys().await?;
        let key = keys
            .find(kid)
            .map(DecodingKey::from_jwk)
            .transpose()?
            .ok_or_else(|| ProviderError::UnknownKey(kid.to_string()));
        *self.keys.write().await = Some((Instant::now(), keys));
        key
    }
}

#[async_trait]
impl IdentityProvider for JwksIdentityProvider {
    fn name(&self) -> &'static str {
        "jwks"
    }

    async fn verify(&self, token: &str) -> Result<ProviderClaims, ProviderError> {
        let header = decode_header(token)?;
        if header.alg != Algorithm::RS256 {
            return Err(ProviderError::InvalidToken(format!("unexpected algorithm {:?}", header.alg)));
        }
        let kid = header
            .kid
            .ok_or_else(|| ProviderError::InvalidToken("token missing kid header".to_string()))?;
        let key = self.decoding_key(&kid).await?;
        let data = decode::<ProviderClaims>(token, &key, &self.validation)?;
        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};
    use serde_json::json;

    fn mint(secret: &str, claims: serde_json::Value) -> String {
        encode(&Header::default(), &claims, &EncodingKey::from_secret(secret.as_bytes())).unwrap()
    }

    fn exp() -> i64 {
        chrono::Utc::now().timestamp() + 600
    }

    #[tokio::test]
    async fn hs256_accepts_correct_secret_only() {
        let provider = SecretIdentityProvider::new("s3cret");
        let token = mint("s3cret", json!({"sub": "u1", "email": "u1@x.io", "exp": exp()}));
        let claims = provider.verify(&token).await.unwrap();
        assert_eq!(claims.subject(), Some("u1"));
        assert_eq!(claims.email.as_deref(), Some("u1@x.io"));

        let forged = mint("other", json!({"sub": "u1", "exp": exp()}));
        assert!(matches!(provider.verify(&forged).await, Err(ProviderError::InvalidToken(_))));
    }

    #[tokio::test]
    async fn expired_tokens_are_rejected() {
        let provider = SecretIdentityProvider::new("s3cret");
        let token = mint("s3cret", json!({"sub": "u1", "exp": chrono::Utc::now().timestamp() - 3600}));
        assert!(provider.verify(&token).await.is_err());
    }

    #[test]
    fn subject_prefers_uid() {
        let claims = ProviderClaims {
            uid: Some("a".into()),
            sub: Some("b".into()),
            ..Default::default()
        };
        assert_eq!(claims.subject(), Some("a"));
        assert_eq!(ProviderClaims::default().subject(), None);
    }

    #[tokio::test]
    async fn jwks_provider_rejects_hs256_tokens_without_fetching() {
        let provider = JwksIdentityProvider::new("proj", "http://127.0.0.1:9/unused").unwrap();
        let token = mint("s3cret", json!({"sub": "u1", "exp": exp()}));
        assert!(matches!(provider.verify(&token).await, Err(ProviderError::InvalidToken(_))));
    }
}
