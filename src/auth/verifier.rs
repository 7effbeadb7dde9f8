use std::sync::Arc;
use std::time::Duration;

use sha2::{Digest, Sha256};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::provider::{IdentityProvider, JwksIdentityProvider, ProviderError, SecretIdentityProvider};
use super::{decode_unverified, token_prefix, AuthError, ClaimSource, IdentityClaim, PLACEHOLDER_EMAIL};
use crate::cache::TtlCache;
use crate::config::AppConfig;

/// Which non-verified identities [`TokenVerifier::authenticate`] lets through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthPolicy {
    pub allow_anonymous: bool,
    pub accept_unverified: bool,
}

impl AuthPolicy {
    pub fn strict() -> Self {
        Self {
            allow_anonymous: false,
            accept_unverified: false,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            allow_anonymous: config.anonymous_fallback_enabled(),
            accept_unverified: config.auth.accept_unverified_claims,
        }
    }
}

/// Resolves bearer tokens to identities and caches the result.
///
/// The cache is keyed by a SHA-256 digest of the token, bounded in size and
/// swept periodically. Verified entries never outlive the token's `exp`.
/// Unverified payloads are cached only when the policy accepts them, and the
/// anonymous fallback identity is never cached.
pub struct TokenVerifier {
    providers: Vec<Arc<dyn IdentityProvider>>,
    cache: Arc<TtlCache<IdentityClaim>>,
    policy: AuthPolicy,
}

impl TokenVerifier {
    pub fn new(
        providers: Vec<Arc<dyn IdentityProvider>>,
        cache_ttl: Duration,
        cache_max_entries: usize,
        policy: AuthPolicy,
    ) -> Self {
        Self {
            providers,
            cache: Arc::new(TtlCache::new("token", cache_ttl, cache_max_entries)),
            policy,
        }
    }

    /// HS256 provider when a secret is configured, JWKS provider when a
    /// project id is configured; both may be present.
    pub fn from_config(config: &AppConfig) -> Result<Self, ProviderError> {
        let mut providers: Vec<Arc<dyn IdentityProvider>> = Vec::new();
        if let Some(secret) = &config.auth.jwt_secret {
            providers.push(Arc::new(SecretIdentityProvider::new(secret)));
        }
        if let Some(project_id) = &config.auth.project_id {
            providers.push(Arc::new(JwksIdentityProvider::new(project_id, config.auth.jwks_url.clone())?));
        }

        if providers.is_empty() {
            warn!("No identity provider configured; tokens can only be decoded without verification");
        } else {
            let names: Vec<_> = providers.iter().map(|p| p.name()).collect();
            info!("Identity providers: {}", names.join(", "));
        }

        Ok(Self::new(
            providers,
            Duration::from_secs(config.auth.token_cache_ttl_secs),
            config.auth.token_cache_max_entries,
            AuthPolicy::from_config(config),
        ))
    }

    /// Resolves `token` to an identity. Never fails: when nothing else works
    /// the anonymous identity is returned, flagged as such.
    pub async fn verify(&self, token: &str) -> IdentityClaim {
        let key = cache_key(token);
        if let Some(claim) = self.cache.get(&key) {
            return claim;
        }

        for provider in &self.providers {
            match provider.verify(token).await {
                Ok(claims) => match claims.subject() {
                    Some(subject) => {
                        let email = claims.email.clone().unwrap_or_else(|| PLACEHOLDER_EMAIL.to_string());
                        let claim = IdentityClaim::verified(subject, email);
                        debug!("Token verified by {} for user {}", provider.name(), claim.subject_id);
                        match claims.remaining_lifetime(chrono::Utc::now().timestamp()) {
                            Some(left) if left.is_zero() => {}
                            Some(left) => self.cache.insert_with_ttl(key, claim.clone(), left),
                            None => self.cache.insert(key, claim.clone()),
                        }
                        return claim;
                    }
                    None => {
                        warn!("Token verified by {} but carries no subject", provider.name());
                        break;
                    }
                },
                Err(e) => {
                    debug!("Provider {} rejected token {}...: {}", provider.name(), token_prefix(token), e);
                }
            }
        }

        if let Some(claim) = decode_unverified(token) {
            warn!("Using unverified token payload for user {}", claim.subject_id);
            // a rejected fallback must not mask a later successful verification
            if self.policy.accept_unverified {
                self.cache.insert(key, claim.clone());
            }
            return claim;
        }

        warn!("All token verification methods failed for {}...; using anonymous identity", token_prefix(token));
        IdentityClaim::anonymous()
    }

    /// Verifies an optional bearer token and applies the policy: the
    /// anonymous identity and unverified payloads are rejected unless the
    /// policy allows them.
    pub async fn authenticate(&self, token: Option<&str>) -> Result<IdentityClaim, AuthError> {
        let token = token.ok_or(AuthError::MissingCredentials)?;
        let claim = self.verify(token).await;
        match claim.source {
            ClaimSource::Verified => Ok(claim),
            ClaimSource::Unverified if self.policy.accept_unverified => Ok(claim),
            ClaimSource::Unverified => Err(AuthError::InvalidCredentials(
                "token signature could not be verified".to_string(),
            )),
            ClaimSource::Anonymous if self.policy.allow_anonymous => Ok(claim),
            ClaimSource::Anonymous => Err(AuthError::AnonymousRejected),
        }
    }

    pub fn cached_entries(&self) -> usize {
        self.cache.len()
    }

    pub fn spawn_sweeper(&self, interval: Duration) -> JoinHandle<()> {
        self.cache.spawn_sweeper(interval)
    }
}

fn cache_key(token: &str) -> String {
    let digest = Sha256::digest(token.as_bytes());
    digest.iter().map(|b| format!("{:02x}", b)).collect()
}
