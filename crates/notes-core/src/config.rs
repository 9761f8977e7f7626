//! Notes configuration management
//!
//! Handles configuration from environment variables and TOML files, with
//! defaults that work for local development.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Well-known signing secret used when none is configured.
///
/// Anyone can forge tokens with it; set `JWT_SECRET` (or `require_secret`)
/// outside of local development.
pub const DEVELOPMENT_JWT_SECRET: &str = "default_secret";

/// Upper bound for token lifetimes (ten years)
pub const MAX_TOKEN_TTL_SECS: u64 = 10 * 365 * 24 * 60 * 60;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Server configuration
    pub server: ServerConfig,

    /// Database connection
    pub database: DatabaseConfig,

    /// Token signing and password hashing
    pub auth: AuthConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().with_env_override()
    }

    /// Load from a TOML file
    pub fn from_file(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let content = std::fs::read_to_string(&path).map_err(|e| ConfigError::FileReadError {
            path: path.clone(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path,
            message: e.to_string(),
        })
    }

    /// Apply environment variables on top of this configuration (env wins)
    pub fn with_env_override(self) -> Result<Self, ConfigError> {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary key lookup
    ///
    /// `with_env_override` passes the process environment; tests pass a map.
    pub fn with_overrides<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Server
        if let Some(host) = lookup("API_HOST") {
            self.server.host = host;
        }
        if let Some(port) = lookup("API_PORT") {
            self.server.port = parse_value("API_PORT", port)?;
        }
        if let Some(origins) = lookup("CORS_ORIGINS") {
            self.server.cors_origins = origins
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }

        // Database
        if let Some(url) = lookup("DATABASE_URL") {
            self.database.url = Some(url).filter(|u| !u.trim().is_empty());
        }
        if let Some(max) = lookup("DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = parse_value("DATABASE_MAX_CONNECTIONS", max)?;
        }

        // Auth
        if let Some(secret) = lookup("JWT_SECRET") {
            self.auth.jwt_secret = Some(secret);
        }
        if let Some(require) = lookup("JWT_REQUIRE_SECRET") {
            self.auth.require_secret = parse_value("JWT_REQUIRE_SECRET", require)?;
        }
        if let Some(ttl) = lookup("JWT_ACCESS_TTL_SECS") {
            self.auth.access_token_ttl_secs = parse_ttl("JWT_ACCESS_TTL_SECS", ttl)?;
        }
        if let Some(ttl) = lookup("JWT_REFRESH_TTL_SECS") {
            self.auth.refresh_token_ttl_secs = parse_ttl("JWT_REFRESH_TTL_SECS", ttl)?;
        }
        if let Some(issuer) = lookup("JWT_ISSUER") {
            self.auth.issuer = issuer;
        }

        // Logging
        if let Some(level) = lookup("LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(json) = lookup("LOG_JSON") {
            self.logging.json_format = parse_value("LOG_JSON", json)?;
        }

        Ok(self)
    }
}

fn parse_value<T: std::str::FromStr>(key: &str, value: String) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        value,
    })
}

fn parse_ttl(key: &str, value: String) -> Result<u64, ConfigError> {
    let ttl: u64 = parse_value(key, value)?;
    check_ttl(key, ttl)?;
    Ok(ttl)
}

fn check_ttl(key: &str, ttl: u64) -> Result<(), ConfigError> {
    if ttl == 0 || ttl > MAX_TOKEN_TTL_SECS {
        return Err(ConfigError::InvalidValue {
            key: key.to_string(),
            value: ttl.to_string(),
        });
    }
    Ok(())
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,

    /// Request timeout in seconds
    pub request_timeout_secs: u64,

    /// Allowed origins for CORS (empty allows no cross-origin requests)
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            request_timeout_secs: 30,
            cors_origins: vec![],
        }
    }
}

/// Database connection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL; the in-memory store is used when unset
    pub url: Option<String>,

    /// PostgreSQL connection pool size
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            max_connections: 10,
        }
    }
}

/// Token and credential configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// HMAC signing secret for access and refresh tokens
    #[serde(skip_serializing)]
    pub jwt_secret: Option<String>,

    /// Refuse to start without an explicit secret
    pub require_secret: bool,

    /// Access token lifetime in seconds (default: 2 hours)
    pub access_token_ttl_secs: u64,

    /// Refresh token lifetime in seconds (default: 24 hours)
    pub refresh_token_ttl_secs: u64,

    /// Token issuer identifier
    pub issuer: String,

    /// Password hashing cost
    pub password: PasswordConfig,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: None,
            require_secret: false,
            access_token_ttl_secs: 2 * 60 * 60,
            refresh_token_ttl_secs: 24 * 60 * 60,
            issuer: "notes-api".to_string(),
            password: PasswordConfig::default(),
        }
    }
}

/// Where the signing secret came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecretSource {
    Configured,
    DevelopmentDefault,
}

impl AuthConfig {
    /// Check token lifetimes, which may also come from a TOML file
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_ttl("access_token_ttl_secs", self.access_token_ttl_secs)?;
        check_ttl("refresh_token_ttl_secs", self.refresh_token_ttl_secs)
    }

    /// Resolve the signing secret
    ///
    /// A missing or empty secret falls back to [`DEVELOPMENT_JWT_SECRET`]
    /// unless `require_secret` is set.
    pub fn signing_secret(&self) -> Result<(&str, SecretSource), ConfigError> {
        match self.jwt_secret.as_deref() {
            Some(secret) if !secret.is_empty() => Ok((secret, SecretSource::Configured)),
            _ if self.require_secret => Err(ConfigError::MissingRequired("JWT_SECRET".to_string())),
            _ => Ok((DEVELOPMENT_JWT_SECRET, SecretSource::DevelopmentDefault)),
        }
    }
}

/// Argon2id cost parameters
///
/// Defaults follow the OWASP profile: 64 MB memory, 3 iterations, 4 lanes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PasswordConfig {
    /// Memory cost in KB
    pub memory_cost: u32,
    /// Time cost (iterations)
    pub time_cost: u32,
    /// Parallelism (lanes)
    pub parallelism: u32,
    /// Output length in bytes
    pub output_len: Option<usize>,
}

impl Default for PasswordConfig {
    fn default() -> Self {
        Self {
            memory_cost: 65536,
            time_cost: 3,
            parallelism: 4,
            output_len: Some(32),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log filter directive (trace, debug, info, warn, error, or an EnvFilter string)
    pub level: String,

    /// JSON format for logs
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "notes_api=debug,notes_core=debug,tower_http=info".to_string(),
            json_format: false,
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    FileReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.auth.access_token_ttl_secs, 7200);
        assert_eq!(config.auth.refresh_token_ttl_secs, 86400);
        assert!(config.database.url.is_none());
        assert!(!config.auth.require_secret);
    }

    #[test]
    fn test_overrides() {
        let config = AppConfig::default()
            .with_overrides(lookup(&[
                ("API_PORT", "9090"),
                ("DATABASE_URL", "postgres://notes@localhost/notes"),
                ("JWT_SECRET", "s3cret"),
                ("JWT_ACCESS_TTL_SECS", "60"),
                ("CORS_ORIGINS", "http://a.test, ,http://b.test"),
                ("LOG_JSON", "true"),
            ]))
            .unwrap();

        assert_eq!(config.server.port, 9090);
        assert_eq!(
            config.database.url.as_deref(),
            Some("postgres://notes@localhost/notes")
        );
        assert_eq!(config.auth.jwt_secret.as_deref(), Some("s3cret"));
        assert_eq!(config.auth.access_token_ttl_secs, 60);
        assert_eq!(config.server.cors_origins, vec!["http://a.test", "http://b.test"]);
        assert!(config.logging.json_format);
    }

    #[test]
    fn test_invalid_override() {
        let result = AppConfig::default().with_overrides(lookup(&[("API_PORT", "eighty")]));
        assert!(matches!(
            result,
            Err(ConfigError::InvalidValue { ref key, .. }) if key == "API_PORT"
        ));
    }

    #[test]
    fn test_out_of_range_ttl_rejected() {
        let huge = u64::MAX.to_string();
        for (key, value) in [
            ("JWT_ACCESS_TTL_SECS", huge.as_str()),
            ("JWT_REFRESH_TTL_SECS", "0"),
        ] {
            let result = AppConfig::default().with_overrides(lookup(&[(key, value)]));
            assert!(matches!(
                result,
                Err(ConfigError::InvalidValue { key: ref k, .. }) if k == key
            ));
        }

        let auth = AuthConfig {
            access_token_ttl_secs: MAX_TOKEN_TTL_SECS + 1,
            ..Default::default()
        };
        assert!(auth.validate().is_err());
        assert!(AuthConfig::default().validate().is_ok());
    }

    #[test]
    fn test_empty_database_url_means_memory() {
        let config = AppConfig::default()
            .with_overrides(lookup(&[("DATABASE_URL", "  ")]))
            .unwrap();
        assert!(config.database.url.is_none());
    }

    #[test]
    fn test_signing_secret_fallback() {
        let auth = AuthConfig::default();
        let (secret, source) = auth.signing_secret().unwrap();
        assert_eq!(secret, DEVELOPMENT_JWT_SECRET);
        assert_eq!(source, SecretSource::DevelopmentDefault);

        let empty = AuthConfig {
            jwt_secret: Some(String::new()),
            ..Default::default()
        };
        assert_eq!(
            empty.signing_secret().unwrap().1,
            SecretSource::DevelopmentDefault
        );

        let configured = AuthConfig {
            jwt_secret: Some("real-secret".to_string()),
            ..Default::default()
        };
        assert_eq!(
            configured.signing_secret().unwrap(),
            ("real-secret", SecretSource::Configured)
        );
    }

    #[test]
    fn test_required_secret_fails_without_value() {
        let auth = AuthConfig {
            require_secret: true,
            ..Default::default()
        };
        assert!(matches!(
            auth.signing_secret(),
            Err(ConfigError::MissingRequired(ref key)) if key == "JWT_SECRET"
        ));
    }

    #[test]
    fn test_partial_toml() {
        let config: AppConfig = toml::from_str(
            r#"
            [server]
            port = 3000

            [auth]
            jwt_secret = "from-file"
            require_secret = true

            [auth.password]
            memory_cost = 1024
            "#,
        )
        .unwrap();

        assert_eq!(config.server.port, 3000);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.auth.jwt_secret.as_deref(), Some("from-file"));
        assert!(config.auth.require_secret);
        assert_eq!(config.auth.password.memory_cost, 1024);
        assert_eq!(config.auth.password.time_cost, 3);
        assert_eq!(config.auth.refresh_token_ttl_secs, 86400);
    }
}
