//! Authentication
//!
//! - Credential validation
//! - Password hashing with Argon2id
//! - Access and refresh token issuing and verification
//! - Registration, login, refresh and logout service
//! - Bearer token middleware and the authenticated user extractor

pub mod jwt;
pub mod middleware;
pub mod password;
pub mod service;
pub mod validation;

pub use jwt::{Claims, JwtManager, TokenError, TokenKind};
pub use middleware::{auth_middleware, AuthenticatedUser};
pub use password::{PasswordError, PasswordHasher};
pub use service::{AuthError, AuthService, Credentials, RefreshRequest, TokenPair};
pub use validation::{normalize_email, validate_credentials, CredentialError};
