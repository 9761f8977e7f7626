//! Storage contracts and the PostgreSQL store
//!
//! The auth and notes services only see the `UserRepository` and
//! `NoteRepository` traits; `PgStore` implements both on top of SQLx.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::FromRow;
use thiserror::Error;

use crate::{Note, NoteInput, User};

/// Storage errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database connection failed: {0}")]
    Connection(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Email already exists")]
    EmailAlreadyExists,
}

/// User persistence capability required by the auth service
///
/// A user holds at most one refresh token. `set_refresh_token` replaces it
/// in a single atomic row update, so concurrent logins resolve to the last
/// writer without a read-modify-write window.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Find a user by (normalized) email
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    /// Find a user by ID
    async fn find_by_id(&self, id: i64) -> Result<Option<User>, StoreError>;

    /// Insert a new user without a refresh token
    ///
    /// Returns `StoreError::EmailAlreadyExists` if the email is taken.
    async fn create_user(&self, email: &str, password_hash: &str) -> Result<User, StoreError>;

    /// Replace (or clear, with `None`) the stored refresh token
    ///
    /// Returns whether a user row was updated.
    async fn set_refresh_token(&self, id: i64, token: Option<&str>) -> Result<bool, StoreError>;
}

/// Note persistence
#[async_trait]
pub trait NoteRepository: Send + Sync {
    /// All notes owned by a user, oldest first
    async fn list_by_user(&self, user_id: i64) -> Result<Vec<Note>, StoreError>;

    /// Get note by ID
    async fn find_by_id(&self, id: i64) -> Result<Option<Note>, StoreError>;

    /// Insert a note owned by `user_id`
    async fn create(&self, user_id: i64, input: &NoteInput) -> Result<Note, StoreError>;

    /// Replace title and content; `None` if the note does not exist
    async fn update(&self, id: i64, input: &NoteInput) -> Result<Option<Note>, StoreError>;

    /// Delete a note; returns whether it existed
    async fn delete(&self, id: i64) -> Result<bool, StoreError>;
}

/// PostgreSQL store
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Create a new store connection
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;

        Ok(Self { pool })
    }

    /// Create from an existing pool
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Get the connection pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Create the tables if they do not exist yet
    pub async fn migrate(&self) -> Result<(), StoreError> {
        const SCHEMA: [&str; 3] = [
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id BIGSERIAL PRIMARY KEY,
                email TEXT NOT NULL UNIQUE,
                password_hash TEXT NOT NULL,
                refresh_token TEXT,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS notes (
                id BIGSERIAL PRIMARY KEY,
                user_id BIGINT NOT NULL REFERENCES users(id),
                title TEXT NOT NULL DEFAULT '',
                content TEXT NOT NULL DEFAULT '',
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
            "#,
            "CREATE INDEX IF NOT EXISTS notes_user_id_idx ON notes (user_id)",
        ];

        for statement in SCHEMA {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(|e| StoreError::Database(format!("Migration failed: {e}")))?;
        }

        tracing::info!("Database schema is up to date");
        Ok(())
    }

    /// Cheap connectivity probe for readiness checks
    pub async fn ping(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.pool).await.is_ok()
    }
}

/// User row from database
#[derive(Debug, FromRow)]
struct UserRow {
    id: i64,
    email: String,
    password_hash: String,
    refresh_token: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            id: row.id,
            email: row.email,
            password_hash: row.password_hash,
            refresh_token: row.refresh_token,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Note row from database
#[derive(Debug, FromRow)]
struct NoteRow {
    id: i64,
    user_id: i64,
    title: String,
    content: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<NoteRow> for Note {
    fn from(row: NoteRow) -> Self {
        Note {
            id: row.id,
            user_id: row.user_id,
            title: row.title,
            content: row.content,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// SQLSTATE 23505 (unique_violation)
fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().is_some_and(|code| code.as_ref() == "23505"),
        _ => false,
    }
}

const USER_COLUMNS: &str = "id, email, password_hash, refresh_token, created_at, updated_at";
const NOTE_COLUMNS: &str = "id, user_id, title, content, created_at, updated_at";

#[async_trait]
impl UserRepository for PgStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let row: Option<UserRow> =
            sqlx::query_as(&format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1"))
                .bind(email)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| StoreError::Database(format!("Failed to fetch user: {e}")))?;

        Ok(row.map(User::from))
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<User>, StoreError> {
        let row: Option<UserRow> =
            sqlx::query_as(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| StoreError::Database(format!("Failed to fetch user: {e}")))?;

        Ok(row.map(User::from))
    }

    async fn create_user(&self, email: &str, password_hash: &str) -> Result<User, StoreError> {
        let row: UserRow = sqlx::query_as(&format!(
            "INSERT INTO users (email, password_hash) VALUES ($1, $2) RETURNING {USER_COLUMNS}"
        ))
        .bind(email)
        .bind(password_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                StoreError::EmailAlreadyExists
            } else {
                StoreError::Database(format!("Failed to create user: {e}"))
            }
        })?;

        Ok(row.into())
    }

    async fn set_refresh_token(&self, id: i64, token: Option<&str>) -> Result<bool, StoreError> {
        let result =
            sqlx::query("UPDATE users SET refresh_token = $2, updated_at = NOW() WHERE id = $1")
                .bind(id)
                .bind(token)
                .execute(&self.pool)
                .await
                .map_err(|e| StoreError::Database(format!("Failed to store refresh token: {e}")))?;

        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl NoteRepository for PgStore {
    async fn list_by_user(&self, user_id: i64) -> Result<Vec<Note>, StoreError> {
        let rows: Vec<NoteRow> = sqlx::query_as(&format!(
            "SELECT {NOTE_COLUMNS} FROM notes WHERE user_id = $1 ORDER BY id"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StoreError::Database(format!("Failed to list notes: {e}")))?;

        Ok(rows.into_iter().map(Note::from).collect())
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Note>, StoreError> {
        let row: Option<NoteRow> =
            sqlx::query_as(&format!("SELECT {NOTE_COLUMNS} FROM notes WHERE id = $1"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| StoreError::Database(format!("Failed to get note: {e}")))?;

        Ok(row.map(Note::from))
    }

    async fn create(&self, user_id: i64, input: &NoteInput) -> Result<Note, StoreError> {
        let row: NoteRow = sqlx::query_as(&format!(
            "INSERT INTO notes (user_id, title, content) VALUES ($1, $2, $3) RETURNING {NOTE_COLUMNS}"
        ))
        .bind(user_id)
        .bind(&input.title)
        .bind(&input.content)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| StoreError::Database(format!("Failed to create note: {e}")))?;

        Ok(row.into())
    }

    async fn update(&self, id: i64, input: &NoteInput) -> Result<Option<Note>, StoreError> {
        let row: Option<NoteRow> = sqlx::query_as(&format!(
            r#"
            UPDATE notes SET
                title = $2,
                content = $3,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {NOTE_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(&input.title)
        .bind(&input.content)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StoreError::Database(format!("Failed to update note: {e}")))?;

        Ok(row.map(Note::from))
    }

    async fn delete(&self, id: i64) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM notes WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Database(format!("Failed to delete note: {e}")))?;

        Ok(result.rows_affected() > 0)
    }
}
