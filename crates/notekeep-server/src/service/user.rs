//! User registration and credential checks.

use tracing::{info, instrument, warn};

use notekeep_core::db::DatabaseError;

use crate::auth::password::{hash_password_blocking, verify_password_blocking};
use crate::storage::{Database, User};

use super::error::ServiceError;

#[derive(Clone)]
pub struct UserService {
    db: Database,
}

impl UserService {
    pub const fn new(db: Database) -> Self {
        Self { db }
    }

    /// Create an account. Fails with `Duplicate` if the email is taken.
    #[instrument(skip(self, password))]
    pub async fn register(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<User, ServiceError> {
        match self.db.get_user_by_email(email).await {
            Ok(_) => return Err(ServiceError::Duplicate("email is already in use".into())),
            Err(e) if e.is_not_found() => {}
            Err(e) => return Err(e.into()),
        }

        let hash = hash_password_blocking(password.to_string())
            .await
            .map_err(|e| ServiceError::Internal(e.to_string()))?;

        let user_id = uuid::Uuid::new_v4().to_string();
        let user = self
            .db
            .create_user(&user_id, email, &hash, name)
            .await
            .map_err(|e| match e {
                // Lost a race with a concurrent registration.
                DatabaseError::Conflict(_) => {
                    ServiceError::Duplicate("email is already in use".into())
                }
                other => ServiceError::Persistence(other),
            })?;

        info!(user_id = %user.id, "User registered");
        Ok(user)
    }

    /// Look a user up by email and check the password.
    ///
    /// An unknown email and a wrong password both fail with `Credential`.
    #[instrument(skip(self, password))]
    pub async fn authenticate(&self, email: &str, password: &str) -> Result<User, ServiceError> {
        let user = self
            .db
            .get_user_by_email(email)
            .await
            .map_err(|e| match ServiceError::from_lookup(e, "user") {
                ServiceError::NotFound(_) => ServiceError::Credential,
                other => other,
            })?;

        let matches = verify_password_blocking(password.to_string(), user.password_hash.clone())
            .await
            .map_err(|e| ServiceError::Internal(e.to_string()))?;
        if !matches {
            warn!(user_id = %user.id, "Failed login attempt");
            return Err(ServiceError::Credential);
        }

        info!(user_id = %user.id, "User logged in");
        Ok(user)
    }
}
