//! User and token queries.

use notekeep_core::db::{DatabaseError, unix_timestamp};

use super::db::Database;
use super::models::{ROLE_USER, Token, User};
use crate::auth::TokenKind;

impl Database {
    // =========================================================================
    // User queries
    // =========================================================================

    /// Create a new user with the default role.
    ///
    /// A duplicate email surfaces as [`DatabaseError::Conflict`].
    pub async fn create_user(
        &self,
        id: &str,
        email: &str,
        password_hash: &str,
        name: &str,
    ) -> Result<User, DatabaseError> {
        let now = unix_timestamp();

        sqlx::query(
            "INSERT INTO users (id, email, password_hash, name, role, mail_verified, created_at, updated_at) VALUES (?, ?, ?, ?, ?, 0, ?, ?)",
        )
        .bind(id)
        .bind(email)
        .bind(password_hash)
        .bind(name)
        .bind(ROLE_USER)
        .bind(now)
        .bind(now)
        .execute(self.pool())
        .await?;

        self.get_user(id).await
    }

    /// Get a user by ID.
    pub async fn get_user(&self, id: &str) -> Result<User, DatabaseError> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool())
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("User {id}")))
    }

    /// Get a user by email.
    pub async fn get_user_by_email(&self, email: &str) -> Result<User, DatabaseError> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = ?")
            .bind(email)
            .fetch_optional(self.pool())
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("User with email {email}")))
    }

    // =========================================================================
    // Token queries
    // =========================================================================

    /// Store a token record.
    pub async fn create_token(
        &self,
        id: &str,
        user_id: &str,
        token_hash: &str,
        kind: TokenKind,
        expires_at: i64,
    ) -> Result<Token, DatabaseError> {
        let now = unix_timestamp();

        sqlx::query(
            "INSERT INTO tokens (id, user_id, token_hash, token_type, expires_at, blacklisted, created_at) VALUES (?, ?, ?, ?, ?, 0, ?)",
        )
        .bind(id)
        .bind(user_id)
        .bind(token_hash)
        .bind(kind.as_str())
        .bind(expires_at)
        .bind(now)
        .execute(self.pool())
        .await?;

        self.get_token(id).await
    }

    /// Get a token by ID.
    pub async fn get_token(&self, id: &str) -> Result<Token, DatabaseError> {
        sqlx::query_as::<_, Token>("SELECT * FROM tokens WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool())
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("Token {id}")))
    }

    /// Find the non-blacklisted record for exactly this token.
    ///
    /// Expiry is not filtered here; the caller owns the grace window.
    pub async fn find_active_token(
        &self,
        token_hash: &str,
        kind: TokenKind,
        user_id: &str,
    ) -> Result<Option<Token>, DatabaseError> {
        let token = sqlx::query_as::<_, Token>(
            "SELECT * FROM tokens WHERE token_hash = ? AND token_type = ? AND user_id = ? AND blacklisted = 0",
        )
        .bind(token_hash)
        .bind(kind.as_str())
        .bind(user_id)
        .fetch_optional(self.pool())
        .await?;

        Ok(token)
    }

    /// Delete a token by ID.
    ///
    /// Returns `true` only for the caller whose statement removed the row, so
    /// two concurrent deletes of the same token cannot both succeed.
    pub async fn delete_token(&self, id: &str) -> Result<bool, DatabaseError> {
        let result = sqlx::query("DELETE FROM tokens WHERE id = ?")
            .bind(id)
            .execute(self.pool())
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Blacklist every token a user holds.
    pub async fn blacklist_user_tokens(&self, user_id: &str) -> Result<u64, DatabaseError> {
        let result =
            sqlx::query("UPDATE tokens SET blacklisted = 1 WHERE user_id = ? AND blacklisted = 0")
                .bind(user_id)
                .execute(self.pool())
                .await?;

        Ok(result.rows_affected())
    }
}
