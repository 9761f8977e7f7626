//! Notes Core - Domain models, configuration and storage
//!
//! This crate defines the shared pieces of the notes service:
//! - User and note records
//! - Storage contracts (`UserRepository`, `NoteRepository`)
//! - PostgreSQL and in-memory store implementations
//! - Configuration management

pub mod config;
pub mod memory;
pub mod store;

pub use config::{
    AppConfig, AuthConfig, ConfigError, DatabaseConfig, LoggingConfig, PasswordConfig, SecretSource,
    ServerConfig,
};
pub use memory::MemoryStore;
pub use store::{NoteRepository, PgStore, StoreError, UserRepository};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

// ============================================================================
// Users
// ============================================================================

/// A registered account
///
/// The password hash and the stored refresh token never leave the server, so
/// neither is serialized.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct User {
    pub id: i64,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    /// The single live refresh token, if the user is logged in
    #[serde(skip_serializing)]
    pub refresh_token: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Check a presented refresh token against the stored one
    ///
    /// Only an exact match counts; a logged-out user matches nothing.
    pub fn holds_refresh_token(&self, presented: &str) -> bool {
        self.refresh_token.as_deref() == Some(presented)
    }
}

// ============================================================================
// Notes
// ============================================================================

/// A note owned by a single user
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
pub struct Note {
    pub id: i64,
    pub user_id: i64,
    pub title: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Payload for creating or replacing a note
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
pub struct NoteInput {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
}

impl NoteInput {
    /// A note needs at least a title or some content
    pub fn is_blank(&self) -> bool {
        self.title.trim().is_empty() && self.content.trim().is_empty()
    }
}
