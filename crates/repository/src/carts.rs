use async_trait::async_trait;
use chrono::{DateTime, Utc};
use model::CartLine;
use tokio_postgres::{Row, Transaction};
use uuid::Uuid;

use crate::RepositoryError;

/// # CartsRepository
///
/// Repository interface for cart lines. Triple lookups treat a missing
/// variant id as a key value of its own (`IS NOT DISTINCT FROM`), matching
/// the at-most-one-line-per-triple invariant.
#[async_trait]
pub trait CartsRepository: Send + Sync {
    async fn insert(&self, tx: &Transaction<'_>, line: &CartLine) -> Result<(), RepositoryError>;

    async fn update_quantity(
        &self,
        tx: &Transaction<'_>,
        id: Uuid,
        quantity: i32,
        updated_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError>;

    async fn delete(&self, tx: &Transaction<'_>, id: Uuid) -> Result<(), RepositoryError>;

    async fn find_by_id(
        &self,
        tx: &Transaction<'_>,
        id: Uuid,
    ) -> Result<Option<CartLine>, RepositoryError>;

    async fn find_by_triple(
        &self,
        tx: &Transaction<'_>,
        user_id: Uuid,
        product_id: Uuid,
        variant_id: Option<Uuid>,
    ) -> Result<Option<CartLine>, RepositoryError>;

    async fn list_for_user(
        &self,
        tx: &Transaction<'_>,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<CartLine>, RepositoryError>;

    async fn count_for_user(
        &self,
        tx: &Transaction<'_>,
        user_id: Uuid,
    ) -> Result<i64, RepositoryError>;
}

/// PostgreSQL implementation of the [`CartsRepository`] trait.
pub struct PgCartsRepository;

fn row_to_line(row: &Row) -> CartLine {
    CartLine {
        id: row.get("id"),
        user_id: row.get("user_id"),
        product_id: row.get("product_id"),
        variant_id: row.get("variant_id"),
        quantity: row.get("quantity"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

const LINE_COLUMNS: &str = "id, user_id, product_id, variant_id, quantity, created_at, updated_at";

#[async_trait]
impl CartsRepository for PgCartsRepository {
    async fn insert(&self, tx: &Transaction<'_>, line: &CartLine) -> Result<(), RepositoryError> {
        let query = r#"
            INSERT INTO carts (id, user_id, product_id, variant_id, quantity, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
        "#;
        tx.execute(
            query,
            &[
                &line.id,
                &line.user_id,
                &line.product_id,
                &line.variant_id,
                &line.quantity,
                &line.created_at,
                &line.updated_at,
            ],
        )
        .await
        .map_err(crate::map_write_err)?;
        Ok(())
    }

    async fn update_quantity(
        &self,
        tx: &Transaction<'_>,
        id: Uuid,
        quantity: i32,
        updated_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        let query = "UPDATE carts SET quantity = $2, updated_at = $3 WHERE id = $1";
        let updated = tx.execute(query, &[&id, &quantity, &updated_at]).await?;
        if updated == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn delete(&self, tx: &Transaction<'_>, id: Uuid) -> Result<(), RepositoryError> {
        let deleted = tx.execute("DELETE FROM carts WHERE id = $1", &[&id]).await?;
        if deleted == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn find_by_id(
        &self,
        tx: &Transaction<'_>,
        id: Uuid,
    ) -> Result<Option<CartLine>, RepositoryError> {
        let query = format!("SELECT {LINE_COLUMNS} FROM carts WHERE id = $1");
        let row = tx.query_opt(&query, &[&id]).await?;
        Ok(row.as_ref().map(row_to_line))
    }

    async fn find_by_triple(
        &self,
        tx: &Transaction<'_>,
        user_id: Uuid,
        product_id: Uuid,
        variant_id: Option<Uuid>,
    ) -> Result<Option<CartLine>, RepositoryError> {
        let query = format!(
            "SELECT {LINE_COLUMNS} FROM carts
             WHERE user_id = $1 AND product_id = $2 AND variant_id IS NOT DISTINCT FROM $3"
        );
        let row = tx
            .query_opt(&query, &[&user_id, &product_id, &variant_id])
            .await?;
        Ok(row.as_ref().map(row_to_line))
    }

    async fn list_for_user(
        &self,
        tx: &Transaction<'_>,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<CartLine>, RepositoryError> {
        let query = format!(
            "SELECT {LINE_COLUMNS} FROM carts WHERE user_id = $1
             ORDER BY created_at DESC LIMIT $2 OFFSET $3"
        );
        let rows = tx.query(&query, &[&user_id, &limit, &offset]).await?;
        Ok(rows.iter().map(row_to_line).collect())
    }

    async fn count_for_user(
        &self,
        tx: &Transaction<'_>,
        user_id: Uuid,
    ) -> Result<i64, RepositoryError> {
        let row = tx
            .query_one(
                "SELECT COUNT(*) AS total FROM carts WHERE user_id = $1",
                &[&user_id],
            )
            .await?;
        Ok(row.get("total"))
    }
}
