use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub cache: CacheConfig,
    pub security: SecurityConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Postgres connection string. When absent the store runs degraded
    /// (or in memory if `in_memory` is set).
    pub url: Option<String>,
    pub in_memory: bool,
    pub max_connections: u32,
    pub connection_timeout: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Shared secret for HS256 tokens.
    pub jwt_secret: Option<String>,
    /// Identity provider project; enables RS256 verification against JWKS.
    pub project_id: Option<String>,
    pub jwks_url: String,
    pub token_cache_ttl_secs: u64,
    pub token_cache_max_entries: usize,
    /// Hand out the anonymous development identity when every verification
    /// method fails. Ignored outside development.
    pub allow_anonymous_fallback: bool,
    /// Accept identities read from a token payload whose signature could not
    /// be checked.
    pub accept_unverified_claims: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    pub ttl_secs: u64,
    pub max_entries: usize,
    pub sweep_interval_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    pub cors_origins: Vec<String>,
}

pub const DEFAULT_JWKS_URL: &str =
    "https://www.googleapis.com/service_accounts/v1/jwk/securetoken@system.gserviceaccount.com";

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        // Set defaults based on environment, then override with specific env vars
        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        // Server overrides
        if let Ok(v) = env::var("HOST") {
            self.server.host = v;
        }
        if let Some(port) = env::var("API_PORT")
            .ok()
            .or_else(|| env::var("PORT").ok())
            .and_then(|s| s.parse::<u16>().ok())
        {
            self.server.port = port;
        }

        // Database overrides
        if let Ok(v) = env::var("DATABASE_URL") {
            if !v.trim().is_empty() {
                self.database.url = Some(v);
            }
        }
        if let Ok(v) = env::var("STORE_IN_MEMORY") {
            self.database.in_memory = v.parse().unwrap_or(self.database.in_memory);
        }
        if let Ok(v) = env::var("DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = v.parse().unwrap_or(self.database.max_connections);
        }
        if let Ok(v) = env::var("DATABASE_CONNECTION_TIMEOUT") {
            self.database.connection_timeout = v.parse().unwrap_or(self.database.connection_timeout);
        }

        // Auth overrides
        if let Ok(v) = env::var("AUTH_JWT_SECRET") {
            if !v.is_empty() {
                self.auth.jwt_secret = Some(v);
            }
        }
        if let Ok(v) = env::var("AUTH_PROJECT_ID") {
            if !v.is_empty() {
                self.auth.project_id = Some(v);
            }
        }
        if let Ok(v) = env::var("AUTH_JWKS_URL") {
            self.auth.jwks_url = v;
        }
        if let Ok(v) = env::var("AUTH_TOKEN_CACHE_TTL_SECS") {
            self.auth.token_cache_ttl_secs = v.parse().unwrap_or(self.auth.token_cache_ttl_secs);
        }
        if let Ok(v) = env::var("AUTH_TOKEN_CACHE_MAX_ENTRIES") {
            self.auth.token_cache_max_entries = v.parse().unwrap_or(self.auth.token_cache_max_entries);
        }
        if let Ok(v) = env::var("AUTH_ALLOW_ANONYMOUS_FALLBACK") {
            self.auth.allow_anonymous_fallback = v.parse().unwrap_or(self.auth.allow_anonymous_fallback);
        }
        if let Ok(v) = env::var("AUTH_ACCEPT_UNVERIFIED_CLAIMS") {
            self.auth.accept_unverified_claims = v.parse().unwrap_or(self.auth.accept_unverified_claims);
        }

        // Cache overrides
        if let Ok(v) = env::var("CACHE_TTL_SECS") {
            self.cache.ttl_secs = v.parse().unwrap_or(self.cache.ttl_secs);
        }
        if let Ok(v) = env::var("CACHE_MAX_ENTRIES") {
            self.cache.max_entries = v.parse().unwrap_or(self.cache.max_entries);
        }

        // Security overrides
        if let Ok(v) = env::var("SECURITY_CORS_ORIGINS") {
            self.security.cors_origins = v.split(',').map(|s| s.trim().to_string()).filter(|s| !s.is_empty()).collect();
        }

        self
    }

    /// The anonymous fallback identity is a development convenience only.
    pub fn anonymous_fallback_enabled(&self) -> bool {
        self.environment == Environment::Development && self.auth.allow_anonymous_fallback
    }

    pub fn is_development(&self) -> bool {
        self.environment == Environment::Development
    }

    pub fn development() -> Self {
        Self {
            environment: Environment::Development,
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8000,
            },
            database: DatabaseConfig {
                url: None,
                in_memory: false,
                max_connections: 10,
                connection_timeout: 30,
            },
            auth: AuthConfig {
                jwt_secret: None,
                project_id: None,
                jwks_url: DEFAULT_JWKS_URL.to_string(),
                token_cache_ttl_secs: 300,
                token_cache_max_entries: 10_000,
                allow_anonymous_fallback: false,
                accept_unverified_claims: true,
            },
            cache: CacheConfig {
                ttl_secs: 3600,
                max_entries: 10_000,
                sweep_interval_secs: 60,
            },
            security: SecurityConfig {
                cors_origins: vec!["*".to_string()],
            },
        }
    }

    fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8000,
            },
            database: DatabaseConfig {
                url: None,
                in_memory: false,
                max_connections: 20,
                connection_timeout: 10,
            },
            auth: AuthConfig {
                jwt_secret: None,
                project_id: None,
                jwks_url: DEFAULT_JWKS_URL.to_string(),
                token_cache_ttl_secs: 300,
                token_cache_max_entries: 50_000,
                allow_anonymous_fallback: false,
                accept_unverified_claims: false,
            },
            cache: CacheConfig {
                ttl_secs: 60,
                max_entries: 50_000,
                sweep_interval_secs: 30,
            },
            security: SecurityConfig {
                cors_origins: vec!["https://staging.example.com".to_string()],
            },
        }
    }

    fn production() -> Self {
        Self {
            environment: Environment::Production,
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8000,
            },
            database: DatabaseConfig {
                url: None,
                in_memory: false,
                max_connections: 50,
                connection_timeout: 5,
            },
            auth: AuthConfig {
                jwt_secret: None,
                project_id: None,
                jwks_url: DEFAULT_JWKS_URL.to_string(),
                token_cache_ttl_secs: 300,
                token_cache_max_entries: 100_000,
                allow_anonymous_fallback: false,
                accept_unverified_claims: false,
            },
            cache: CacheConfig {
                ttl_secs: 60,
                max_entries: 100_000,
                sweep_interval_secs: 30,
            },
            security: SecurityConfig {
                cors_origins: vec!["https://app.example.com".to_string()],
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_development_config() {
        let config = AppConfig::development();
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.cache.ttl_secs, 3600);
        assert!(config.database.url.is_none());
        assert!(!config.anonymous_fallback_enabled());
    }

    #[test]
    fn test_fallback_never_enabled_in_production() {
        let mut config = AppConfig::production();
        config.auth.allow_anonymous_fallback = true;
        assert!(!config.anonymous_fallback_enabled());

        let mut config = AppConfig::development();
        config.auth.allow_anonymous_fallback = true;
        assert!(config.anonymous_fallback_enabled());
    }
}
