use async_trait::async_trait;
use model::{SellerInfo, User};
use tokio_postgres::{Row, Transaction};
use uuid::Uuid;

use crate::RepositoryError;

/// # UsersRepository
///
/// Repository interface for user accounts. `email` and `username` carry
/// store-level unique constraints; violations surface as
/// [`RepositoryError::Duplicate`].
#[async_trait]
pub trait UsersRepository: Send + Sync {
    async fn insert(&self, tx: &Transaction<'_>, user: &User) -> Result<(), RepositoryError>;

    async fn find_by_id(
        &self,
        tx: &Transaction<'_>,
        id: Uuid,
    ) -> Result<Option<User>, RepositoryError>;

    async fn find_by_username(
        &self,
        tx: &Transaction<'_>,
        username: &str,
    ) -> Result<Option<User>, RepositoryError>;

    /// Pre-registration duplicate check, matching either identifier.
    async fn find_by_email_or_username(
        &self,
        tx: &Transaction<'_>,
        email: &str,
        username: &str,
    ) -> Result<Option<User>, RepositoryError>;

    /// Public `{id, name}` projections for a set of sellers.
    async fn seller_infos(
        &self,
        tx: &Transaction<'_>,
        ids: &[Uuid],
    ) -> Result<Vec<SellerInfo>, RepositoryError>;
}

/// PostgreSQL implementation of the [`UsersRepository`] trait.
pub struct PgUsersRepository;

fn row_to_user(row: &Row) -> User {
    User {
        id: row.get("id"),
        name: row.get("name"),
        username: row.get("username"),
        email: row.get("email"),
        password_hash: row.get("password_hash"),
        role: row.get("role"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

const USER_COLUMNS: &str = "id, name, username, email, password_hash, role, created_at, updated_at";

#[async_trait]
impl UsersRepository for PgUsersRepository {
    async fn insert(&self, tx: &Transaction<'_>, user: &User) -> Result<(), RepositoryError> {
        let query = r#"
            INSERT INTO users (id, name, username, email, password_hash, role, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        "#;
        tx.execute(
            query,
            &[
                &user.id,
                &user.name,
                &user.username,
                &user.email,
                &user.password_hash,
                &user.role,
                &user.created_at,
                &user.updated_at,
            ],
        )
        .await
        .map_err(crate::map_write_err)?;
        Ok(())
    }

    async fn find_by_id(
        &self,
        tx: &Transaction<'_>,
        id: Uuid,
    ) -> Result<Option<User>, RepositoryError> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let row = tx.query_opt(&query, &[&id]).await?;
        Ok(row.as_ref().map(row_to_user))
    }

    async fn find_by_username(
        &self,
        tx: &Transaction<'_>,
        username: &str,
    ) -> Result<Option<User>, RepositoryError> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE username = $1");
        let row = tx.query_opt(&query, &[&username]).await?;
        Ok(row.as_ref().map(row_to_user))
    }

    async fn find_by_email_or_username(
        &self,
        tx: &Transaction<'_>,
        email: &str,
        username: &str,
    ) -> Result<Option<User>, RepositoryError> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1 OR username = $2 LIMIT 1");
        let row = tx.query_opt(&query, &[&email, &username]).await?;
        Ok(row.as_ref().map(row_to_user))
    }

    async fn seller_infos(
        &self,
        tx: &Transaction<'_>,
        ids: &[Uuid],
    ) -> Result<Vec<SellerInfo>, RepositoryError> {
        let rows = tx
            .query("SELECT id, name FROM users WHERE id = ANY($1)", &[&ids])
            .await?;
        Ok(rows
            .iter()
            .map(|row| SellerInfo {
                id: row.get("id"),
                name: row.get("name"),
            })
            .collect())
    }
}
