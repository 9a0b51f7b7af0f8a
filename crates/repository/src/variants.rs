use async_trait::async_trait;
use model::ProductVariant;
use tokio_postgres::{Row, Transaction};
use uuid::Uuid;

use crate::RepositoryError;

/// # VariantsRepository
///
/// Repository interface for stock-bearing product variants. `(product_id,
/// variant)` carries a store-level unique constraint as a backstop for the
/// application-level duplicate validation; violations surface as
/// [`RepositoryError::Duplicate`].
#[async_trait]
pub trait VariantsRepository: Send + Sync {
    async fn insert(
        &self,
        tx: &Transaction<'_>,
        variant: &ProductVariant,
    ) -> Result<(), RepositoryError>;

    async fn insert_many(
        &self,
        tx: &Transaction<'_>,
        variants: &[ProductVariant],
    ) -> Result<(), RepositoryError>;

    /// Rewrites name, stock and `updated_at` of an existing variant row.
    async fn update(
        &self,
        tx: &Transaction<'_>,
        variant: &ProductVariant,
    ) -> Result<(), RepositoryError>;

    /// Deletes the given variant ids scoped to one product; foreign ids
    /// are silently ignored. Returns the number of rows removed.
    async fn delete_for_product(
        &self,
        tx: &Transaction<'_>,
        ids: &[Uuid],
        product_id: Uuid,
    ) -> Result<u64, RepositoryError>;

    async fn delete_all_for_product(
        &self,
        tx: &Transaction<'_>,
        product_id: Uuid,
    ) -> Result<u64, RepositoryError>;

    async fn for_product(
        &self,
        tx: &Transaction<'_>,
        product_id: Uuid,
    ) -> Result<Vec<ProductVariant>, RepositoryError>;

    /// Batched load for a page of products.
    async fn for_products(
        &self,
        tx: &Transaction<'_>,
        product_ids: &[Uuid],
    ) -> Result<Vec<ProductVariant>, RepositoryError>;

    async fn find_by_id(
        &self,
        tx: &Transaction<'_>,
        id: Uuid,
    ) -> Result<Option<ProductVariant>, RepositoryError>;

    /// Batched lookup for assembling line-item projections.
    async fn find_by_ids(
        &self,
        tx: &Transaction<'_>,
        ids: &[Uuid],
    ) -> Result<Vec<ProductVariant>, RepositoryError>;

    /// Same as [`find_by_id`](Self::find_by_id) but takes a row-level lock,
    /// serializing concurrent stock-affecting writes on this variant.
    async fn find_by_id_for_update(
        &self,
        tx: &Transaction<'_>,
        id: Uuid,
    ) -> Result<Option<ProductVariant>, RepositoryError>;
}

/// PostgreSQL implementation of the [`VariantsRepository`] trait.
pub struct PgVariantsRepository;

fn row_to_variant(row: &Row) -> ProductVariant {
    ProductVariant {
        id: row.get("id"),
        variant: row.get("variant"),
        stock: row.get("stock"),
        product_id: row.get("product_id"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

const VARIANT_COLUMNS: &str = "id, variant, stock, product_id, created_at, updated_at";

const INSERT_VARIANT: &str = r#"
    INSERT INTO product_variants (id, variant, stock, product_id, created_at, updated_at)
    VALUES ($1, $2, $3, $4, $5, $6)
"#;

#[async_trait]
impl VariantsRepository for PgVariantsRepository {
    async fn insert(
        &self,
        tx: &Transaction<'_>,
        variant: &ProductVariant,
    ) -> Result<(), RepositoryError> {
        tx.execute(
            INSERT_VARIANT,
            &[
                &variant.id,
                &variant.variant,
                &variant.stock,
                &variant.product_id,
                &variant.created_at,
                &variant.updated_at,
            ],
        )
        .await
        .map_err(crate::map_write_err)?;
        Ok(())
    }

    async fn insert_many(
        &self,
        tx: &Transaction<'_>,
        variants: &[ProductVariant],
    ) -> Result<(), RepositoryError> {
        for v in variants {
            self.insert(tx, v).await?;
        }
        Ok(())
    }

    async fn update(
        &self,
        tx: &Transaction<'_>,
        variant: &ProductVariant,
    ) -> Result<(), RepositoryError> {
        let query = r#"
            UPDATE product_variants
            SET variant = $2, stock = $3, updated_at = $4
            WHERE id = $1
        "#;
        let updated = tx
            .execute(
                query,
                &[
                    &variant.id,
                    &variant.variant,
                    &variant.stock,
                    &variant.updated_at,
                ],
            )
            .await
            .map_err(crate::map_write_err)?;
        if updated == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn delete_for_product(
        &self,
        tx: &Transaction<'_>,
        ids: &[Uuid],
        product_id: Uuid,
    ) -> Result<u64, RepositoryError> {
        let query = "DELETE FROM product_variants WHERE id = ANY($1) AND product_id = $2";
        Ok(tx.execute(query, &[&ids, &product_id]).await?)
    }

    async fn delete_all_for_product(
        &self,
        tx: &Transaction<'_>,
        product_id: Uuid,
    ) -> Result<u64, RepositoryError> {
        let query = "DELETE FROM product_variants WHERE product_id = $1";
        Ok(tx.execute(query, &[&product_id]).await?)
    }

    async fn for_product(
        &self,
        tx: &Transaction<'_>,
        product_id: Uuid,
    ) -> Result<Vec<ProductVariant>, RepositoryError> {
        let query = format!(
            "SELECT {VARIANT_COLUMNS} FROM product_variants WHERE product_id = $1
             ORDER BY created_at ASC"
        );
        let rows = tx.query(&query, &[&product_id]).await?;
        Ok(rows.iter().map(row_to_variant).collect())
    }

    async fn for_products(
        &self,
        tx: &Transaction<'_>,
        product_ids: &[Uuid],
    ) -> Result<Vec<ProductVariant>, RepositoryError> {
        let query = format!(
            "SELECT {VARIANT_COLUMNS} FROM product_variants WHERE product_id = ANY($1)
             ORDER BY created_at ASC"
        );
        let rows = tx.query(&query, &[&product_ids]).await?;
        Ok(rows.iter().map(row_to_variant).collect())
    }

    async fn find_by_id(
        &self,
        tx: &Transaction<'_>,
        id: Uuid,
    ) -> Result<Option<ProductVariant>, RepositoryError> {
        let query = format!("SELECT {VARIANT_COLUMNS} FROM product_variants WHERE id = $1");
        let row = tx.query_opt(&query, &[&id]).await?;
        Ok(row.as_ref().map(row_to_variant))
    }

    async fn find_by_ids(
        &self,
        tx: &Transaction<'_>,
        ids: &[Uuid],
    ) -> Result<Vec<ProductVariant>, RepositoryError> {
        let query = format!("SELECT {VARIANT_COLUMNS} FROM product_variants WHERE id = ANY($1)");
        let rows = tx.query(&query, &[&ids]).await?;
        Ok(rows.iter().map(row_to_variant).collect())
    }

    async fn find_by_id_for_update(
        &self,
        tx: &Transaction<'_>,
        id: Uuid,
    ) -> Result<Option<ProductVariant>, RepositoryError> {
        let query =
            format!("SELECT {VARIANT_COLUMNS} FROM product_variants WHERE id = $1 FOR UPDATE");
        let row = tx.query_opt(&query, &[&id]).await?;
        Ok(row.as_ref().map(row_to_variant))
    }
}
