//! Token issuance, verification and rotation.
//!
//! Every signed token has a matching row in the `tokens` table. A token is
//! usable only while its row exists and is not blacklisted; rotation deletes
//! the refresh token's row, so each refresh token mints at most one new
//! pair.

use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use notekeep_core::db::unix_timestamp;

use crate::auth::{JwtManager, TokenKind};
use crate::storage::{Database, Token, User};

use super::error::ServiceError;

/// How long past its `exp` claim a token is still accepted, in seconds.
pub const EXPIRY_GRACE_SECS: i64 = 10;

/// A signed token together with its stored record.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub record: Token,
}

impl IssuedToken {
    pub const fn expires_at(&self) -> i64 {
        self.record.expires_at
    }
}

#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access: IssuedToken,
    pub refresh: IssuedToken,
}

/// True once `now` is more than [`EXPIRY_GRACE_SECS`] past `exp`.
pub(crate) const fn past_grace(exp: i64, now: i64) -> bool {
    now.saturating_sub(exp) > EXPIRY_GRACE_SECS
}

#[derive(Clone)]
pub struct TokenService {
    db: Database,
    jwt: Arc<JwtManager>,
}

impl TokenService {
    pub const fn new(db: Database, jwt: Arc<JwtManager>) -> Self {
        Self { db, jwt }
    }

    /// Sign a token of `kind` for `user` and persist its record.
    #[instrument(skip(self, user), fields(user_id = %user.id))]
    pub async fn create_token(
        &self,
        user: &User,
        kind: TokenKind,
        expires_at: i64,
    ) -> Result<IssuedToken, ServiceError> {
        let token = self
            .jwt
            .sign(&user.id, &user.email, kind, unix_timestamp(), expires_at)
            .map_err(|e| ServiceError::TokenCreation(format!("cannot sign {kind} token: {e}")))?;

        let token_id = uuid::Uuid::new_v4().to_string();
        let record = self
            .db
            .create_token(
                &token_id,
                &user.id,
                &JwtManager::hash_token(&token),
                kind,
                expires_at,
            )
            .await
            .map_err(|e| ServiceError::TokenCreation(format!("cannot save {kind} token: {e}")))?;

        Ok(IssuedToken { token, record })
    }

    /// Issue a fresh access/refresh pair.
    ///
    /// The two records are written separately. If the refresh write fails the
    /// access record stays behind; it expires on its own.
    #[instrument(skip(self, user), fields(user_id = %user.id))]
    pub async fn issue_pair(&self, user: &User) -> Result<TokenPair, ServiceError> {
        let now = unix_timestamp();
        let access_exp = self.expiry(now, TokenKind::Access)?;
        let refresh_exp = self.expiry(now, TokenKind::Refresh)?;

        let access = self
            .create_token(user, TokenKind::Access, access_exp)
            .await?;
        let refresh = match self
            .create_token(user, TokenKind::Refresh, refresh_exp)
            .await
        {
            Ok(refresh) => refresh,
            Err(e) => {
                warn!(token_id = %access.record.id, error = %e, "Refresh token failed, access token record left behind");
                return Err(e);
            }
        };

        debug!("Token pair issued");
        Ok(TokenPair { access, refresh })
    }

    fn expiry(&self, now: i64, kind: TokenKind) -> Result<i64, ServiceError> {
        let ttl = self.jwt.ttl_secs(kind);
        now.checked_add(ttl).ok_or_else(|| {
            ServiceError::TokenCreation(format!("{kind} token lifetime of {ttl}s is out of range"))
        })
    }

    /// Check a presented token and return its active record.
    ///
    /// Fails with `InvalidToken` on a bad signature or wrong type,
    /// `TokenExpired` once the token is more than [`EXPIRY_GRACE_SECS`] past
    /// its expiry, and `TokenNotFound` when no active record matches this
    /// exact token.
    pub async fn verify(&self, token: &str, expected: TokenKind) -> Result<Token, ServiceError> {
        let claims = self
            .jwt
            .decode(token)
            .map_err(|_| ServiceError::InvalidToken)?;

        if claims.kind != expected {
            return Err(ServiceError::InvalidToken);
        }

        if past_grace(claims.exp, unix_timestamp()) {
            return Err(ServiceError::TokenExpired);
        }

        self.db
            .find_active_token(&JwtManager::hash_token(token), expected, &claims.sub)
            .await?
            .ok_or(ServiceError::TokenNotFound)
    }

    /// Exchange a refresh token for a new pair.
    ///
    /// The old record is removed with a conditional delete before anything is
    /// issued. Of two concurrent rotations of the same token only the one
    /// whose delete removed the row proceeds; the other gets `TokenNotFound`.
    #[instrument(skip_all)]
    pub async fn rotate(&self, refresh_token: &str) -> Result<(TokenPair, User), ServiceError> {
        let record = self.verify(refresh_token, TokenKind::Refresh).await?;

        if !self.db.delete_token(&record.id).await? {
            warn!(token_id = %record.id, user_id = %record.user_id, "Refresh token already consumed");
            return Err(ServiceError::TokenNotFound);
        }

        let user = self
            .db
            .get_user(&record.user_id)
            .await
            .map_err(|e| ServiceError::from_lookup(e, "user"))?;

        let pair = self.issue_pair(&user).await?;

        info!(user_id = %user.id, "Refresh token rotated");
        Ok((pair, user))
    }

    /// Blacklist every token a user holds.
    pub async fn revoke_all(&self, user_id: &str) -> Result<u64, ServiceError> {
        let revoked = self.db.blacklist_user_tokens(user_id).await?;
        info!(user_id = %user_id, revoked, "User tokens blacklisted");
        Ok(revoked)
    }
}
