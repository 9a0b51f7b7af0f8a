//! User account service: registration and credential verification.
//!
//! Token issuance lives at the HTTP boundary; this service only proves
//! who the caller is and hands back the account row.

use async_trait::async_trait;
use chrono::Utc;
use deadpool_postgres::Pool;
use model::{Role, User};
use repository::{RepositoryError, UsersRepository};
use tracing::instrument;
use uuid::Uuid;

use crate::ServiceError;

/// Registration payload after boundary decoding.
#[derive(Debug, Clone)]
pub struct RegisterInput {
    pub name: String,
    pub username: String,
    pub email: String,
    pub password: String,
    pub role: Role,
}

/// Trait describing user account operations.
#[async_trait]
pub trait UserService: Send + Sync {
    async fn register(&self, input: RegisterInput) -> Result<User, ServiceError>;

    /// Verifies the credentials and returns the account on success.
    async fn login(&self, username: &str, password: &str) -> Result<User, ServiceError>;

    async fn find_by_id(&self, id: Uuid) -> Result<User, ServiceError>;
}

/// Async implementation of [`UserService`] using the repository pattern.
pub struct UserServiceImpl<U> {
    db_pool: Pool,
    users_repo: U,
}

impl<U: UsersRepository> UserServiceImpl<U> {
    pub fn new(db_pool: Pool, users_repo: U) -> Self {
        Self {
            db_pool,
            users_repo,
        }
    }
}

#[async_trait]
impl<U: UsersRepository> UserService for UserServiceImpl<U> {
    #[instrument(skip(self, input))]
    async fn register(&self, input: RegisterInput) -> Result<User, ServiceError> {
        if input.username.is_empty() || input.email.is_empty() || input.password.is_empty() {
            return Err(ServiceError::Validation(
                "Username, email and password are required".into(),
            ));
        }

        let password_hash = bcrypt::hash(&input.password, bcrypt::DEFAULT_COST)
            .map_err(|e| ServiceError::Unexpected(format!("Password hashing failed: {e}")))?;

        let mut client = self.db_pool.get().await?;
        let tx = client
            .transaction()
            .await
            .map_err(|e| ServiceError::Unexpected(format!("Begin transaction failed: {e}")))?;

        if self
            .users_repo
            .find_by_email_or_username(&tx, &input.email, &input.username)
            .await?
            .is_some()
        {
            return Err(ServiceError::Conflict("User already exists".into()));
        }

        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            name: input.name,
            username: input.username,
            email: input.email,
            password_hash,
            role: input.role,
            created_at: now,
            updated_at: now,
        };
        if let Err(err) = self.users_repo.insert(&tx, &user).await {
            return Err(match err {
                RepositoryError::Duplicate => ServiceError::Conflict("User already exists".into()),
                other => ServiceError::Db(other),
            });
        }

        tx.commit()
            .await
            .map_err(|e| ServiceError::Unexpected(format!("Commit failed: {e}")))?;
        Ok(user)
    }

    #[instrument(skip(self, password))]
    async fn login(&self, username: &str, password: &str) -> Result<User, ServiceError> {
        let mut client = self.db_pool.get().await?;
        let tx = client
            .transaction()
            .await
            .map_err(|e| ServiceError::Unexpected(format!("Begin transaction failed: {e}")))?;

        let user = self
            .users_repo
            .find_by_username(&tx, username)
            .await?
            .ok_or_else(|| ServiceError::NotFound("User not found".into()))?;

        tx.commit()
            .await
            .map_err(|e| ServiceError::Unexpected(format!("Commit failed: {e}")))?;

        let valid = bcrypt::verify(password, &user.password_hash)
            .map_err(|e| ServiceError::Unexpected(format!("Password verification failed: {e}")))?;
        if !valid {
            return Err(ServiceError::Unauthorized("Invalid password".into()));
        }
        Ok(user)
    }

    #[instrument(skip(self))]
    async fn find_by_id(&self, id: Uuid) -> Result<User, ServiceError> {
        let mut client = self.db_pool.get().await?;
        let tx = client
            .transaction()
            .await
            .map_err(|e| ServiceError::Unexpected(format!("Begin transaction failed: {e}")))?;

        let user = self
            .users_repo
            .find_by_id(&tx, id)
            .await?
            .ok_or_else(|| ServiceError::NotFound("User not found".into()))?;

        tx.commit()
            .await
            .map_err(|e| ServiceError::Unexpected(format!("Commit failed: {e}")))?;
        Ok(user)
    }
}
