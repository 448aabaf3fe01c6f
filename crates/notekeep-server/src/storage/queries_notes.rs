//! Note queries. Every read and write is scoped to the owning user.

use notekeep_core::db::{DatabaseError, unix_timestamp};

use super::db::Database;
use super::models::Note;

impl Database {
    /// Create a note owned by `user_id`.
    pub async fn create_note(
        &self,
        id: &str,
        user_id: &str,
        title: &str,
        content: &str,
    ) -> Result<Note, DatabaseError> {
        let now = unix_timestamp();

        sqlx::query(
            "INSERT INTO notes (id, user_id, title, content, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(id)
        .bind(user_id)
        .bind(title)
        .bind(content)
        .bind(now)
        .bind(now)
        .execute(self.pool())
        .await?;

        self.get_note_for_owner(id, user_id)
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("Note {id}")))
    }

    /// Get a note by ID, only if it belongs to `user_id`.
    pub async fn get_note_for_owner(
        &self,
        id: &str,
        user_id: &str,
    ) -> Result<Option<Note>, DatabaseError> {
        let note = sqlx::query_as::<_, Note>("SELECT * FROM notes WHERE id = ? AND user_id = ?")
            .bind(id)
            .bind(user_id)
            .fetch_optional(self.pool())
            .await?;

        Ok(note)
    }

    /// List a user's notes in insertion order.
    pub async fn list_notes(
        &self,
        user_id: &str,
        skip: i64,
        take: i64,
    ) -> Result<Vec<Note>, DatabaseError> {
        let notes = sqlx::query_as::<_, Note>(
            "SELECT * FROM notes WHERE user_id = ? ORDER BY created_at ASC, rowid ASC LIMIT ? OFFSET ?",
        )
        .bind(user_id)
        .bind(take)
        .bind(skip)
        .fetch_all(self.pool())
        .await?;

        Ok(notes)
    }

    /// Overwrite title and content. Returns `false` if no note with this ID
    /// belongs to `user_id`.
    pub async fn update_note_for_owner(
        &self,
        id: &str,
        user_id: &str,
        title: &str,
        content: &str,
    ) -> Result<bool, DatabaseError> {
        let now = unix_timestamp();

        let result = sqlx::query(
            "UPDATE notes SET title = ?, content = ?, updated_at = ? WHERE id = ? AND user_id = ?",
        )
        .bind(title)
        .bind(content)
        .bind(now)
        .bind(id)
        .bind(user_id)
        .execute(self.pool())
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Delete a note. Returns `false` if no note with this ID belongs to
    /// `user_id`.
    pub async fn delete_note_for_owner(&self, id: &str, user_id: &str) -> Result<bool, DatabaseError> {
        let result = sqlx::query("DELETE FROM notes WHERE id = ? AND user_id = ?")
            .bind(id)
            .bind(user_id)
            .execute(self.pool())
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
