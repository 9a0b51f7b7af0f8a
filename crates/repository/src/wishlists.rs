use async_trait::async_trait;
use model::WishlistLine;
use tokio_postgres::{Row, Transaction};
use uuid::Uuid;

use crate::RepositoryError;

/// # WishlistsRepository
///
/// Repository interface for wishlist lines. Unlike carts there is no
/// quantity; the `(user, product, variant)` triple is the whole identity
/// of a line.
#[async_trait]
pub trait WishlistsRepository: Send + Sync {
    async fn insert(
        &self,
        tx: &Transaction<'_>,
        line: &WishlistLine,
    ) -> Result<(), RepositoryError>;

    async fn delete(&self, tx: &Transaction<'_>, id: Uuid) -> Result<(), RepositoryError>;

    async fn find_by_id(
        &self,
        tx: &Transaction<'_>,
        id: Uuid,
    ) -> Result<Option<WishlistLine>, RepositoryError>;

    async fn find_by_triple(
        &self,
        tx: &Transaction<'_>,
        user_id: Uuid,
        product_id: Uuid,
        variant_id: Option<Uuid>,
    ) -> Result<Option<WishlistLine>, RepositoryError>;

    async fn list_for_user(
        &self,
        tx: &Transaction<'_>,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<WishlistLine>, RepositoryError>;

    async fn count_for_user(
        &self,
        tx: &Transaction<'_>,
        user_id: Uuid,
    ) -> Result<i64, RepositoryError>;
}

/// PostgreSQL implementation of the [`WishlistsRepository`] trait.
pub struct PgWishlistsRepository;

fn row_to_line(row: &Row) -> WishlistLine {
    WishlistLine {
        id: row.get("id"),
        user_id: row.get("user_id"),
        product_id: row.get("product_id"),
        variant_id: row.get("variant_id"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

const LINE_COLUMNS: &str = "id, user_id, product_id, variant_id, created_at, updated_at";

#[async_trait]
impl WishlistsRepository for PgWishlistsRepository {
    async fn insert(
        &self,
        tx: &Transaction<'_>,
        line: &WishlistLine,
    ) -> Result<(), RepositoryError> {
        let query = r#"
            INSERT INTO wishlists (id, user_id, product_id, variant_id, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6)
        "#;
        tx.execute(
            query,
            &[
                &line.id,
                &line.user_id,
                &line.product_id,
                &line.variant_id,
                &line.created_at,
                &line.updated_at,
            ],
        )
        .await
        .map_err(crate::map_write_err)?;
        Ok(())
    }

    async fn delete(&self, tx: &Transaction<'_>, id: Uuid) -> Result<(), RepositoryError> {
        let deleted = tx
            .execute("DELETE FROM wishlists WHERE id = $1", &[&id])
            .await?;
        if deleted == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn find_by_id(
        &self,
        tx: &Transaction<'_>,
        id: Uuid,
    ) -> Result<Option<WishlistLine>, RepositoryError> {
        let query = format!("SELECT {LINE_COLUMNS} FROM wishlists WHERE id = $1");
        let row = tx.query_opt(&query, &[&id]).await?;
        Ok(row.as_ref().map(row_to_line))
    }

    async fn find_by_triple(
        &self,
        tx: &Transaction<'_>,
        user_id: Uuid,
        product_id: Uuid,
        variant_id: Option<Uuid>,
    ) -> Result<Option<WishlistLine>, RepositoryError> {
        let query = format!(
            "SELECT {LINE_COLUMNS} FROM wishlists
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
    ) -> Result<Vec<WishlistLine>, RepositoryError> {
        let query = format!(
            "SELECT {LINE_COLUMNS} FROM wishlists WHERE user_id = $1
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
                "SELECT COUNT(*) AS total FROM wishlists WHERE user_id = $1",
                &[&user_id],
            )
            .await?;
        Ok(row.get("total"))
    }
}
