//! JWT token generation and validation
//!
//! Access and refresh tokens are both HS256 JWTs signed with the same secret.
//! The `typ` claim tells them apart so neither can stand in for the other.

use jsonwebtoken::{
    decode, encode, errors::ErrorKind, get_current_timestamp, Algorithm, DecodingKey,
    EncodingKey, Header, Validation,
};
use notes_core::{AuthConfig, ConfigError, SecretSource};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Which of the two token flavours a JWT is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

/// Verified token claims
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Claims {
    /// Owning user's ID
    pub user_id: i64,
    /// User's email at issue time
    pub email: String,
    /// Expiration timestamp (Unix epoch)
    pub exp: u64,
    /// Issued at timestamp (Unix epoch)
    pub iat: u64,
    /// Token issuer
    pub iss: String,
    /// Unique token ID, keeps two tokens issued in the same second distinct
    pub jti: String,
    /// Token flavour
    pub typ: TokenKind,
}

/// Claims as they arrive on the wire, before the payload checks
#[derive(Debug, Deserialize)]
struct RawClaims {
    #[serde(default)]
    user_id: Option<i64>,
    #[serde(default)]
    email: String,
    exp: u64,
    #[serde(default)]
    iat: u64,
    #[serde(default)]
    iss: String,
    #[serde(default)]
    jti: String,
    #[serde(default)]
    typ: Option<TokenKind>,
}

/// Token issuing and verification errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    #[error("Malformed token")]
    Malformed,

    #[error("Unexpected signing method")]
    UnsupportedAlgorithm,

    #[error("Invalid token signature")]
    InvalidSignature,

    #[error("Token has expired")]
    Expired,

    #[error("Invalid token payload")]
    InvalidPayload,

    #[error("Expected {expected:?} token")]
    WrongKind { expected: TokenKind },

    #[error("Failed to sign token: {0}")]
    Signing(String),
}

impl From<jsonwebtoken::errors::Error> for TokenError {
    fn from(e: jsonwebtoken::errors::Error) -> Self {
        match e.kind() {
            ErrorKind::InvalidAlgorithm | ErrorKind::InvalidAlgorithmName => {
                TokenError::UnsupportedAlgorithm
            }
            ErrorKind::InvalidSignature => TokenError::InvalidSignature,
            ErrorKind::ExpiredSignature => TokenError::Expired,
            ErrorKind::MissingRequiredClaim(_) | ErrorKind::InvalidIssuer => {
                TokenError::InvalidPayload
            }
            _ => TokenError::Malformed,
        }
    }
}

/// Issues and verifies tokens with an injected secret
#[derive(Clone)]
pub struct JwtManager {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    issuer: String,
    access_ttl_secs: u64,
    refresh_ttl_secs: u64,
    secret_source: SecretSource,
}

impl JwtManager {
    /// Create a manager from an explicit secret
    pub fn new(
        secret: &[u8],
        issuer: impl Into<String>,
        access_ttl_secs: u64,
        refresh_ttl_secs: u64,
    ) -> Self {
        let issuer = issuer.into();

        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&issuer]);
        validation.leeway = 0;

        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
            issuer,
            access_ttl_secs,
            refresh_ttl_secs,
            secret_source: SecretSource::Configured,
        }
    }

    /// Create a manager from the auth configuration
    ///
    /// Fails when a token lifetime is out of range, or when `require_secret`
    /// is set and no secret is configured.
    pub fn from_config(config: &AuthConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let (secret, source) = config.signing_secret()?;
        let mut manager = Self::new(
            secret.as_bytes(),
            config.issuer.clone(),
            config.access_token_ttl_secs,
            config.refresh_token_ttl_secs,
        );
        manager.secret_source = source;
        Ok(manager)
    }

    /// Where the signing secret came from
    pub fn secret_source(&self) -> SecretSource {
        self.secret_source
    }

    /// Issue a short-lived access token
    pub fn issue_access(&self, user_id: i64, email: &str) -> Result<String, TokenError> {
        self.issue(user_id, email, TokenKind::Access, self.access_ttl_secs)
    }

    /// Issue a long-lived refresh token
    pub fn issue_refresh(&self, user_id: i64, email: &str) -> Result<String, TokenError> {
        self.issue(user_id, email, TokenKind::Refresh, self.refresh_ttl_secs)
    }

    fn issue(
        &self,
        user_id: i64,
        email: &str,
        typ: TokenKind,
        ttl_secs: u64,
    ) -> Result<String, TokenError> {
        let now = get_current_timestamp();
        let exp = now
            .checked_add(ttl_secs)
            .ok_or_else(|| TokenError::Signing(format!("token lifetime {ttl_secs}s overflows")))?;

        let claims = Claims {
            user_id,
            email: email.to_string(),
            exp,
            iat: now,
            iss: self.issuer.clone(),
            jti: Uuid::new_v4().to_string(),
            typ,
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| TokenError::Signing(e.to_string()))
    }

    /// Verify a token of either kind and extract its claims
    ///
    /// Checks run in order: structure, algorithm (HS256 only), signature,
    /// expiry, then the payload (`user_id`, issuer and `typ` must be present).
    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        let raw = decode::<RawClaims>(token, &self.decoding_key, &self.validation)?.claims;

        let (Some(user_id), Some(typ)) = (raw.user_id, raw.typ) else {
            return Err(TokenError::InvalidPayload);
        };

        Ok(Claims {
            user_id,
            email: raw.email,
            exp: raw.exp,
            iat: raw.iat,
            iss: raw.iss,
            jti: raw.jti,
            typ,
        })
    }

    /// Verify a token and require it to be of the given kind
    pub fn verify_kind(&self, token: &str, expected: TokenKind) -> Result<Claims, TokenError> {
        let claims = self.verify(token)?;
        if claims.typ != expected {
            return Err(TokenError::WrongKind { expected });
        }
        Ok(claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const SECRET: &[u8] = b"test-secret";

    fn manager() -> JwtManager {
        JwtManager::new(SECRET, "notes-api", 7200, 86400)
    }

    fn sign(claims: serde_json::Value, alg: Algorithm, secret: &[u8]) -> String {
        encode(&Header::new(alg), &claims, &EncodingKey::from_secret(secret)).unwrap()
    }

    #[test]
    fn test_issue_and_verify_access_token() {
        let jwt = manager();
        let token = jwt.issue_access(7, "a@b.com").expect("Failed to issue token");

        let claims = jwt
            .verify_kind(&token, TokenKind::Access)
            .expect("Failed to verify token");

        assert_eq!(claims.user_id, 7);
        assert_eq!(claims.email, "a@b.com");
        assert_eq!(claims.iss, "notes-api");
        assert_eq!(claims.typ, TokenKind::Access);
        assert_eq!(claims.exp - claims.iat, 7200);
    }

    #[test]
    fn test_refresh_token_lifetime() {
        let jwt = manager();
        let token = jwt.issue_refresh(7, "a@b.com").unwrap();
        let claims = jwt.verify_kind(&token, TokenKind::Refresh).unwrap();

        assert_eq!(claims.typ, TokenKind::Refresh);
        assert_eq!(claims.exp - claims.iat, 86400);
    }

    #[test]
    fn test_tokens_are_unique() {
        let jwt = manager();
        let a = jwt.issue_access(1, "a@b.com").unwrap();
        let b = jwt.issue_access(1, "a@b.com").unwrap();
        let r = jwt.issue_refresh(1, "a@b.com").unwrap();

        assert_ne!(a, b);
        assert_ne!(a, r);
    }

    #[test]
    fn test_kind_mismatch() {
        let jwt = manager();
        let refresh = jwt.issue_refresh(1, "a@b.com").unwrap();
        let access = jwt.issue_access(1, "a@b.com").unwrap();

        assert_eq!(
            jwt.verify_kind(&refresh, TokenKind::Access),
            Err(TokenError::WrongKind {
                expected: TokenKind::Access
            })
        );
        assert!(matches!(
            jwt.verify_kind(&access, TokenKind::Refresh),
            Err(TokenError::WrongKind { .. })
        ));
    }

    #[test]
    fn test_malformed_token() {
        let jwt = manager();
        assert_eq!(jwt.verify("not-a-jwt"), Err(TokenError::Malformed));
        assert_eq!(jwt.verify("invalid.token.here"), Err(TokenError::Malformed));
        assert_eq!(jwt.verify(""), Err(TokenError::Malformed));
    }

    #[test]
    fn test_wrong_secret() {
        let token = JwtManager::new(b"secret1", "notes-api", 60, 60)
            .issue_access(1, "a@b.com")
            .unwrap();

        let result = JwtManager::new(b"secret2", "notes-api", 60, 60).verify(&token);
        assert_eq!(result, Err(TokenError::InvalidSignature));
    }

    #[test]
    fn test_unexpected_algorithm() {
        let now = get_current_timestamp();
        let token = sign(
            json!({
                "user_id": 1,
                "email": "a@b.com",
                "exp": now + 60,
                "iat": now,
                "iss": "notes-api",
                "typ": "access",
            }),
            Algorithm::HS512,
            SECRET,
        );

        assert_eq!(manager().verify(&token), Err(TokenError::UnsupportedAlgorithm));
    }

    #[test]
    fn test_expired_token() {
        let now = get_current_timestamp();
        let token = sign(
            json!({
                "user_id": 1,
                "email": "a@b.com",
                "exp": now - 3600,
                "iat": now - 7200,
                "iss": "notes-api",
                "typ": "refresh",
            }),
            Algorithm::HS256,
            SECRET,
        );

        assert_eq!(manager().verify(&token), Err(TokenError::Expired));
    }

    #[test]
    fn test_missing_or_null_user_id() {
        let now = get_current_timestamp();
        let mut claims = json!({
            "email": "a@b.com",
            "exp": now + 60,
            "iat": now,
            "iss": "notes-api",
            "typ": "access",
        });

        let missing = sign(claims.clone(), Algorithm::HS256, SECRET);
        assert_eq!(manager().verify(&missing), Err(TokenError::InvalidPayload));

        claims["user_id"] = serde_json::Value::Null;
        let null = sign(claims, Algorithm::HS256, SECRET);
        assert_eq!(manager().verify(&null), Err(TokenError::InvalidPayload));
    }

    #[test]
    fn test_missing_kind_and_foreign_issuer() {
        let now = get_current_timestamp();
        let untyped = sign(
            json!({"user_id": 1, "exp": now + 60, "iss": "notes-api"}),
            Algorithm::HS256,
            SECRET,
        );
        assert_eq!(manager().verify(&untyped), Err(TokenError::InvalidPayload));

        let foreign = sign(
            json!({"user_id": 1, "exp": now + 60, "iss": "elsewhere", "typ": "access"}),
            Algorithm::HS256,
            SECRET,
        );
        assert_eq!(manager().verify(&foreign), Err(TokenError::InvalidPayload));
    }

    #[test]
    fn test_from_config() {
        let config = AuthConfig::default();
        let jwt = JwtManager::from_config(&config).unwrap();
        assert_eq!(jwt.secret_source(), SecretSource::DevelopmentDefault);

        let config = AuthConfig {
            jwt_secret: Some("configured".to_string()),
            ..AuthConfig::default()
        };
        let jwt = JwtManager::from_config(&config).unwrap();
        assert_eq!(jwt.secret_source(), SecretSource::Configured);

        let token = jwt.issue_access(3, "c@d.com").unwrap();
        assert_eq!(
            JwtManager::new(b"configured", "notes-api", 60, 60)
                .verify(&token)
                .map(|c| c.user_id),
            Ok(3)
        );

        let config = AuthConfig {
            require_secret: true,
            ..AuthConfig::default()
        };
        assert!(matches!(
            JwtManager::from_config(&config),
            Err(ConfigError::MissingRequired(_))
        ));
    }

    #[test]
    fn test_overflowing_lifetime_is_an_error() {
        let jwt = JwtManager::new(b"s", "notes-api", u64::MAX, 60);
        assert!(matches!(
            jwt.issue_access(1, "a@b.com"),
            Err(TokenError::Signing(_))
        ));
        assert!(jwt.issue_refresh(1, "a@b.com").is_ok());
    }

    #[test]
    fn test_from_config_rejects_out_of_range_lifetime() {
        let config = AuthConfig {
            access_token_ttl_secs: u64::MAX,
            ..AuthConfig::default()
        };
        assert!(matches!(
            JwtManager::from_config(&config),
            Err(ConfigError::InvalidValue { .. })
        ));
    }
}
