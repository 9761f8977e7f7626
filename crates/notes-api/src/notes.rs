//! Per-user notes
//!
//! Every operation is scoped to the authenticated caller. A note owned by
//! someone else is reported as forbidden, a missing one as not found.

use std::sync::Arc;

use notes_core::{Note, NoteInput, NoteRepository, StoreError};
use thiserror::Error;
use tracing::debug;

use crate::auth::AuthenticatedUser;

/// Note operation errors
#[derive(Debug, Error)]
pub enum NoteError {
    #[error("{0}")]
    InvalidInput(&'static str),

    #[error("Note not found")]
    NotFound,

    #[error("Note belongs to another user")]
    Forbidden,

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Note service
#[derive(Clone)]
pub struct NoteService {
    notes: Arc<dyn NoteRepository>,
}

impl NoteService {
    pub fn new(notes: Arc<dyn NoteRepository>) -> Self {
        Self { notes }
    }

    /// The caller's notes, ordered by id
    pub async fn list(&self, user: &AuthenticatedUser) -> Result<Vec<Note>, NoteError> {
        let mut notes = self.notes.list_by_user(user.user_id).await?;
        notes.sort_by_key(|n| n.id);
        Ok(notes)
    }

    pub async fn get(&self, user: &AuthenticatedUser, id: i64) -> Result<Note, NoteError> {
        self.owned(user, id).await
    }

    pub async fn create(
        &self,
        user: &AuthenticatedUser,
        input: &NoteInput,
    ) -> Result<Note, NoteError> {
        validate(input)?;

        let note = self.notes.create(user.user_id, input).await?;
        debug!(user_id = user.user_id, note_id = note.id, "Note created");

        Ok(note)
    }

    pub async fn update(
        &self,
        user: &AuthenticatedUser,
        id: i64,
        input: &NoteInput,
    ) -> Result<Note, NoteError> {
        validate(input)?;
        self.owned(user, id).await?;

        // Deleted between the ownership check and the update
        let note = self.notes.update(id, input).await?.ok_or(NoteError::NotFound)?;
        debug!(user_id = user.user_id, note_id = id, "Note updated");

        Ok(note)
    }

    pub async fn delete(&self, user: &AuthenticatedUser, id: i64) -> Result<(), NoteError> {
        self.owned(user, id).await?;

        if !self.notes.delete(id).await? {
            return Err(NoteError::NotFound);
        }
        debug!(user_id = user.user_id, note_id = id, "Note deleted");

        Ok(())
    }

    async fn owned(&self, user: &AuthenticatedUser, id: i64) -> Result<Note, NoteError> {
        let note = self
            .notes
            .find_by_id(id)
            .await?
            .ok_or(NoteError::NotFound)?;

        if note.user_id != user.user_id {
            return Err(NoteError::Forbidden);
        }

        Ok(note)
    }
}

fn validate(input: &NoteInput) -> Result<(), NoteError> {
    if input.is_blank() {
        return Err(NoteError::InvalidInput("title or content is required"));
    }
    Ok(())
}
