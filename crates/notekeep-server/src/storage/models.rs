//! Data models for notekeep storage.

use serde::{Deserialize, Serialize};

use crate::auth::TokenKind;

pub const ROLE_USER: &str = "user";

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub name: String,
    pub role: String,
    pub mail_verified: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

/// A persisted token record. Only the SHA-256 of the signed string is kept.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Token {
    pub id: String,
    pub user_id: String,
    pub token_hash: String,
    #[sqlx(try_from = "String")]
    pub token_type: TokenKind,
    pub expires_at: i64,
    pub blacklisted: bool,
    pub created_at: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Note {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub content: String,
    pub created_at: i64,
    pub updated_at: i64,
}
