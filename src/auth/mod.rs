//! Bearer token verification.
//!
//! [`TokenVerifier`] resolves a raw token to an [`IdentityClaim`] by trying,
//! in order: its TTL cache, each configured [`IdentityProvider`], an
//! unverified decode of the token payload, and finally the anonymous
//! development identity. Whether the last two are acceptable is decided by
//! [`TokenVerifier::authenticate`], not by `verify`.

pub mod decode;
pub mod provider;
pub mod verifier;

pub use decode::decode_unverified;
pub use provider::{IdentityProvider, JwksIdentityProvider, ProviderClaims, ProviderError, SecretIdentityProvider};
pub use verifier::{AuthPolicy, TokenVerifier};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Subject id of the identity handed out when every verification method
/// fails. Never a real user.
pub const ANONYMOUS_SUBJECT: &str = "anonymous-dev-user";
pub const ANONYMOUS_EMAIL: &str = "anonymous@localhost";

/// Email used when an unverified payload carries none.
pub const PLACEHOLDER_EMAIL: &str = "dev@example.com";

/// How a claim was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClaimSource {
    /// Signature checked by an identity provider.
    Verified,
    /// Read from the token payload without a signature check.
    Unverified,
    /// The anonymous development identity.
    Anonymous,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityClaim {
    pub subject_id: String,
    pub email: String,
    pub source: ClaimSource,
}

impl IdentityClaim {
    pub fn verified(subject_id: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            subject_id: subject_id.into(),
            email: email.into(),
            source: ClaimSource::Verified,
        }
    }

    pub fn unverified(subject_id: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            subject_id: subject_id.into(),
            email: email.into(),
            source: ClaimSource::Unverified,
        }
    }

    pub fn anonymous() -> Self {
        Self {
            subject_id: ANONYMOUS_SUBJECT.to_string(),
            email: ANONYMOUS_EMAIL.to_string(),
            source: ClaimSource::Anonymous,
        }
    }

    pub fn is_anonymous(&self) -> bool {
        self.source == ClaimSource::Anonymous
    }
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Missing Authorization header")]
    MissingCredentials,

    #[error("Invalid credentials: {0}")]
    InvalidCredentials(String),

    #[error("Anonymous identity is not accepted")]
    AnonymousRejected,
}

/// First few characters of a token, for log lines.
pub(crate) fn token_prefix(token: &str) -> String {
    token.chars().take(10).collect()
}
