//! Authentication service layer
//!
//! Registration, login, token refresh and logout on top of a
//! [`UserRepository`]. A user holds at most one live refresh token: every
//! login overwrites it and logout clears it.

use std::sync::Arc;

use notes_core::{StoreError, User, UserRepository};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};
use utoipa::ToSchema;

use super::jwt::{JwtManager, TokenError, TokenKind};
use super::password::{PasswordError, PasswordHasher};
use super::validation::{normalize_email, validate_credentials, CredentialError};
use crate::audit::{audit_log, AuditEvent, ClientInfo};

/// Registration and login request body
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Credentials {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// Token refresh request
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RefreshRequest {
    #[serde(default)]
    pub refresh_token: String,
}

/// Tokens issued by a successful login
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Authentication errors
#[derive(Debug, Error)]
pub enum AuthError {
    #[error(transparent)]
    InvalidInput(#[from] CredentialError),

    #[error("User already exists")]
    DuplicateUser,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Invalid refresh token: {0}")]
    InvalidToken(TokenError),

    #[error("Refresh token has been revoked")]
    TokenRevoked,

    #[error("User not found")]
    UserNotFound,

    #[error("Password hashing failed: {0}")]
    Hashing(String),

    #[error("Token signing failed: {0}")]
    Signing(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<PasswordError> for AuthError {
    fn from(e: PasswordError) -> Self {
        AuthError::Hashing(e.to_string())
    }
}

impl AuthError {
    fn from_signing(e: TokenError) -> Self {
        AuthError::Signing(e.to_string())
    }
}

/// Authentication service
#[derive(Clone)]
pub struct AuthService {
    users: Arc<dyn UserRepository>,
    jwt: Arc<JwtManager>,
    hasher: PasswordHasher,
    /// Hash checked against when the email is unknown, built on first use
    decoy_hash: Arc<OnceCell<String>>,
}

impl AuthService {
    /// Create a new authentication service
    pub fn new(users: Arc<dyn UserRepository>, jwt: Arc<JwtManager>, hasher: PasswordHasher) -> Self {
        Self {
            users,
            jwt,
            hasher,
            decoy_hash: Arc::new(OnceCell::new()),
        }
    }

    /// Register a new user
    ///
    /// The email is normalized before validation and storage. The new user
    /// has no refresh token until the first login.
    pub async fn register(
        &self,
        email: &str,
        password: &str,
        client: &ClientInfo,
    ) -> Result<User, AuthError> {
        let email = normalize_email(email);

        let result = self.create_user(&email, password).await;
        match &result {
            Ok(user) => {
                info!(user_id = user.id, email = %user.email, "User registered");
                audit_log(&AuditEvent::RegistrationSuccess {
                    user_id: user.id,
                    email: user.email.clone(),
                    client: client.clone(),
                });
            }
            Err(e) => {
                debug!(email = %email, error = %e, "Registration rejected");
                audit_log(&AuditEvent::RegistrationFailure {
                    email: email.clone(),
                    reason: e.to_string(),
                    client: client.clone(),
                });
            }
        }

        result
    }

    async fn create_user(&self, email: &str, password: &str) -> Result<User, AuthError> {
        validate_credentials(email, password)?;

        if self.users.find_by_email(email).await?.is_some() {
            return Err(AuthError::DuplicateUser);
        }

        let password_hash = self.hash_password(password).await?;

        // A concurrent registration can still win the insert
        match self.users.create_user(email, &password_hash).await {
            Ok(user) => Ok(user),
            Err(StoreError::EmailAlreadyExists) => Err(AuthError::DuplicateUser),
            Err(e) => Err(e.into()),
        }
    }

    /// Log in with email and password
    ///
    /// An unknown email and a wrong password both yield
    /// `AuthError::InvalidCredentials`. On success the new refresh token
    /// replaces whatever was stored before.
    pub async fn login(
        &self,
        email: &str,
        password: &str,
        client: &ClientInfo,
    ) -> Result<TokenPair, AuthError> {
        let email = normalize_email(email);

        let Some(user) = self.users.find_by_email(&email).await? else {
            // Same Argon2 cost as a wrong password
            self.verify_decoy(password).await;
            self.login_failed(&email, "unknown email", client);
            return Err(AuthError::InvalidCredentials);
        };

        if !self.verify_password(password, &user.password_hash).await? {
            self.login_failed(&email, "wrong password", client);
            return Err(AuthError::InvalidCredentials);
        }

        let access_token = self
            .jwt
            .issue_access(user.id, &user.email)
            .map_err(AuthError::from_signing)?;
        let refresh_token = self
            .jwt
            .issue_refresh(user.id, &user.email)
            .map_err(AuthError::from_signing)?;

        self.users
            .set_refresh_token(user.id, Some(&refresh_token))
            .await?;

        info!(user_id = user.id, "Login successful");
        audit_log(&AuditEvent::LoginSuccess {
            user_id: user.id,
            email: user.email,
            client: client.clone(),
        });

        Ok(TokenPair {
            access_token,
            refresh_token,
        })
    }

    fn login_failed(&self, email: &str, reason: &str, client: &ClientInfo) {
        warn!(email = %email, reason, "Login failed");
        audit_log(&AuditEvent::LoginFailure {
            email: email.to_string(),
            reason: reason.to_string(),
            client: client.clone(),
        });
    }

    /// Exchange a refresh token for a new access token
    ///
    /// The presented token must verify as a refresh token and be the one
    /// currently stored for its user. The refresh token itself is not
    /// rotated.
    pub async fn refresh(&self, presented: &str, client: &ClientInfo) -> Result<String, AuthError> {
        let claims = match self.jwt.verify_kind(presented, TokenKind::Refresh) {
            Ok(claims) => claims,
            Err(e) => {
                self.refresh_rejected(None, &e.to_string(), client);
                return Err(AuthError::InvalidToken(e));
            }
        };

        let Some(user) = self.users.find_by_id(claims.user_id).await? else {
            self.refresh_rejected(Some(claims.user_id), "user not found", client);
            return Err(AuthError::UserNotFound);
        };

        if !user.holds_refresh_token(presented) {
            self.refresh_rejected(Some(user.id), "token revoked or superseded", client);
            return Err(AuthError::TokenRevoked);
        }

        let access_token = self
            .jwt
            .issue_access(user.id, &user.email)
            .map_err(AuthError::from_signing)?;

        debug!(user_id = user.id, "Access token refreshed");
        audit_log(&AuditEvent::TokenRefresh {
            user_id: user.id,
            email: user.email,
            client: client.clone(),
        });

        Ok(access_token)
    }

    fn refresh_rejected(&self, user_id: Option<i64>, reason: &str, client: &ClientInfo) {
        warn!(user_id = ?user_id, reason, "Token refresh rejected");
        audit_log(&AuditEvent::RefreshRejected {
            user_id,
            reason: reason.to_string(),
            client: client.clone(),
        });
    }

    /// Revoke the user's refresh token
    ///
    /// Idempotent: succeeds when nothing is stored or the user no longer
    /// exists. Outstanding access tokens stay valid until they expire.
    pub async fn logout(&self, user_id: i64, client: &ClientInfo) -> Result<(), AuthError> {
        let updated = self.users.set_refresh_token(user_id, None).await?;

        info!(user_id, updated, "User logged out");
        audit_log(&AuditEvent::Logout {
            user_id,
            client: client.clone(),
        });

        Ok(())
    }

    async fn verify_decoy(&self, password: &str) {
        let hash = match self
            .decoy_hash
            .get_or_try_init(|| self.hash_password("decoy-password"))
            .await
        {
            Ok(hash) => hash,
            Err(e) => {
                warn!(error = %e, "Failed to build decoy password hash");
                return;
            }
        };

        if let Err(e) = self.verify_password(password, hash).await {
            warn!(error = %e, "Decoy password verification failed");
        }
    }

    async fn hash_password(&self, password: &str) -> Result<String, AuthError> {
        let hasher = self.hasher.clone();
        let password = password.to_string();

        tokio::task::spawn_blocking(move || hasher.hash(&password))
            .await
            .map_err(|e| AuthError::Hashing(e.to_string()))?
            .map_err(AuthError::from)
    }

    async fn verify_password(&self, password: &str, hash: &str) -> Result<bool, AuthError> {
        let hasher = self.hasher.clone();
        let password = password.to_string();
        let hash = hash.to_string();

        tokio::task::spawn_blocking(move || hasher.verify(&password, &hash))
            .await
            .map_err(|e| AuthError::Hashing(e.to_string()))?
            .map_err(AuthError::from)
    }
}
