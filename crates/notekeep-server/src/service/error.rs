//! Error taxonomy shared by all services.

use notekeep_core::db::DatabaseError;

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// Malformed or missing input.
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Duplicate(String),

    /// Unknown email or wrong password. The message never says which.
    #[error("email and password don't match")]
    Credential,

    #[error("not valid token")]
    InvalidToken,

    #[error("token is expired")]
    TokenExpired,

    /// The token verified but has no active record: rotated, deleted or
    /// blacklisted.
    #[error("cannot find token")]
    TokenNotFound,

    #[error("cannot create token: {0}")]
    TokenCreation(String),

    /// Missing resource, or one owned by someone else.
    #[error("cannot find {0}")]
    NotFound(&'static str),

    #[error("storage error: {0}")]
    Persistence(#[from] DatabaseError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ServiceError {
    /// Map a single-record lookup failure, turning a missing row into
    /// [`ServiceError::NotFound`].
    pub fn from_lookup(err: DatabaseError, what: &'static str) -> Self {
        if err.is_not_found() {
            Self::NotFound(what)
        } else {
            Self::Persistence(err)
        }
    }

    /// Whether this error came out of token verification.
    pub const fn is_token_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidToken | Self::TokenExpired | Self::TokenNotFound
        )
    }
}
