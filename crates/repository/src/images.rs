use async_trait::async_trait;
use chrono::{DateTime, Utc};
use model::{ProductImage, ProductImageMeta};
use tokio_postgres::{Row, Transaction};
use uuid::Uuid;

use crate::RepositoryError;

/// # ImagesRepository
///
/// Repository interface for product images. Metadata queries never touch
/// the binary column; only the render path loads image bytes. All
/// multi-row reads use the canonical `is_primary DESC, created_at ASC`
/// ordering so "primary, or first available" is the head of every list.
#[async_trait]
pub trait ImagesRepository: Send + Sync {
    async fn insert_many(
        &self,
        tx: &Transaction<'_>,
        images: &[ProductImage],
    ) -> Result<(), RepositoryError>;

    /// Deletes the given image ids scoped to one product; foreign ids are
    /// silently ignored. Returns the number of rows removed.
    async fn delete_for_product(
        &self,
        tx: &Transaction<'_>,
        ids: &[Uuid],
        product_id: Uuid,
    ) -> Result<u64, RepositoryError>;

    async fn meta_for_product(
        &self,
        tx: &Transaction<'_>,
        product_id: Uuid,
    ) -> Result<Vec<ProductImageMeta>, RepositoryError>;

    /// Batched metadata load for a page of products.
    async fn meta_for_products(
        &self,
        tx: &Transaction<'_>,
        product_ids: &[Uuid],
    ) -> Result<Vec<ProductImageMeta>, RepositoryError>;

    async fn find_with_data(
        &self,
        tx: &Transaction<'_>,
        id: Uuid,
    ) -> Result<Option<ProductImage>, RepositoryError>;

    /// The product's primary image (or the first available) with payload.
    async fn primary_with_data(
        &self,
        tx: &Transaction<'_>,
        product_id: Uuid,
    ) -> Result<Option<ProductImage>, RepositoryError>;

    async fn has_primary(
        &self,
        tx: &Transaction<'_>,
        product_id: Uuid,
    ) -> Result<bool, RepositoryError>;

    /// Oldest image of the product, used to self-heal the primary flag.
    async fn oldest_meta(
        &self,
        tx: &Transaction<'_>,
        product_id: Uuid,
    ) -> Result<Option<ProductImageMeta>, RepositoryError>;

    async fn set_primary(
        &self,
        tx: &Transaction<'_>,
        id: Uuid,
        updated_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError>;
}

/// PostgreSQL implementation of the [`ImagesRepository`] trait.
pub struct PgImagesRepository;

fn row_to_meta(row: &Row) -> ProductImageMeta {
    ProductImageMeta {
        id: row.get("id"),
        is_primary: row.get("is_primary"),
        product_id: row.get("product_id"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

fn row_to_image(row: &Row) -> ProductImage {
    ProductImage {
        id: row.get("id"),
        data: row.get("data"),
        is_primary: row.get("is_primary"),
        product_id: row.get("product_id"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

const META_COLUMNS: &str = "id, is_primary, product_id, created_at, updated_at";
const DATA_COLUMNS: &str = "id, data, is_primary, product_id, created_at, updated_at";

#[async_trait]
impl ImagesRepository for PgImagesRepository {
    async fn insert_many(
        &self,
        tx: &Transaction<'_>,
        images: &[ProductImage],
    ) -> Result<(), RepositoryError> {
        let query = r#"
            INSERT INTO product_images (id, data, is_primary, product_id, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6)
        "#;
        for img in images {
            tx.execute(
                query,
                &[
                    &img.id,
                    &img.data,
                    &img.is_primary,
                    &img.product_id,
                    &img.created_at,
                    &img.updated_at,
                ],
            )
            .await?;
        }
        Ok(())
    }

    async fn delete_for_product(
        &self,
        tx: &Transaction<'_>,
        ids: &[Uuid],
        product_id: Uuid,
    ) -> Result<u64, RepositoryError> {
        let query = "DELETE FROM product_images WHERE id = ANY($1) AND product_id = $2";
        Ok(tx.execute(query, &[&ids, &product_id]).await?)
    }

    async fn meta_for_product(
        &self,
        tx: &Transaction<'_>,
        product_id: Uuid,
    ) -> Result<Vec<ProductImageMeta>, RepositoryError> {
        let query = format!(
            "SELECT {META_COLUMNS} FROM product_images WHERE product_id = $1
             ORDER BY is_primary DESC, created_at ASC"
        );
        let rows = tx.query(&query, &[&product_id]).await?;
        Ok(rows.iter().map(row_to_meta).collect())
    }

    async fn meta_for_products(
        &self,
        tx: &Transaction<'_>,
        product_ids: &[Uuid],
    ) -> Result<Vec<ProductImageMeta>, RepositoryError> {
        let query = format!(
            "SELECT {META_COLUMNS} FROM product_images WHERE product_id = ANY($1)
             ORDER BY is_primary DESC, created_at ASC"
        );
        let rows = tx.query(&query, &[&product_ids]).await?;
        Ok(rows.iter().map(row_to_meta).collect())
    }

    async fn find_with_data(
        &self,
        tx: &Transaction<'_>,
        id: Uuid,
    ) -> Result<Option<ProductImage>, RepositoryError> {
        let query = format!("SELECT {DATA_COLUMNS} FROM product_images WHERE id = $1");
        let row = tx.query_opt(&query, &[&id]).await?;
        Ok(row.as_ref().map(row_to_image))
    }

    async fn primary_with_data(
        &self,
        tx: &Transaction<'_>,
        product_id: Uuid,
    ) -> Result<Option<ProductImage>, RepositoryError> {
        let query = format!(
            "SELECT {DATA_COLUMNS} FROM product_images WHERE product_id = $1
             ORDER BY is_primary DESC, created_at ASC LIMIT 1"
        );
        let row = tx.query_opt(&query, &[&product_id]).await?;
        Ok(row.as_ref().map(row_to_image))
    }

    async fn has_primary(
        &self,
        tx: &Transaction<'_>,
        product_id: Uuid,
    ) -> Result<bool, RepositoryError> {
        let query =
            "SELECT EXISTS(SELECT 1 FROM product_images WHERE product_id = $1 AND is_primary) AS found";
        let row = tx.query_one(query, &[&product_id]).await?;
        Ok(row.get("found"))
    }

    async fn oldest_meta(
        &self,
        tx: &Transaction<'_>,
        product_id: Uuid,
    ) -> Result<Option<ProductImageMeta>, RepositoryError> {
        let query = format!(
            "SELECT {META_COLUMNS} FROM product_images WHERE product_id = $1
             ORDER BY created_at ASC LIMIT 1"
        );
        let row = tx.query_opt(&query, &[&product_id]).await?;
        Ok(row.as_ref().map(row_to_meta))
    }

    async fn set_primary(
        &self,
        tx: &Transaction<'_>,
        id: Uuid,
        updated_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        let query = "UPDATE product_images SET is_primary = TRUE, updated_at = $2 WHERE id = $1";
        let updated = tx.execute(query, &[&id, &updated_at]).await?;
        if updated == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
