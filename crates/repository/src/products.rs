use async_trait::async_trait;
use model::Product;
use rust_decimal::Decimal;
use tokio_postgres::types::ToSql;
use tokio_postgres::{Row, Transaction};
use uuid::Uuid;

use crate::RepositoryError;

/// Optional filters applied to a product listing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductFilter {
    /// Case-insensitive substring match on the product name.
    pub name: Option<String>,
    /// Exact category match.
    pub category_id: Option<Uuid>,
    /// Inclusive lower price bound.
    pub min_price: Option<Decimal>,
    /// Inclusive upper price bound.
    pub max_price: Option<Decimal>,
}

/// Sort order for product listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProductSort {
    /// Creation time descending.
    #[default]
    Newest,
    PriceAsc,
    PriceDesc,
}

impl ProductSort {
    fn order_by(self) -> &'static str {
        match self {
            ProductSort::Newest => "created_at DESC",
            ProductSort::PriceAsc => "price ASC",
            ProductSort::PriceDesc => "price DESC",
        }
    }
}

/// # ProductsRepository
///
/// Repository interface for the product table. Listing and counting take
/// the same filter so both always observe the same predicate within one
/// transaction snapshot.
#[async_trait]
pub trait ProductsRepository: Send + Sync {
    async fn insert(&self, tx: &Transaction<'_>, product: &Product) -> Result<(), RepositoryError>;

    /// Rewrites the mutable columns of an existing product row.
    async fn update(&self, tx: &Transaction<'_>, product: &Product) -> Result<(), RepositoryError>;

    async fn delete(&self, tx: &Transaction<'_>, id: Uuid) -> Result<(), RepositoryError>;

    async fn find_by_id(
        &self,
        tx: &Transaction<'_>,
        id: Uuid,
    ) -> Result<Option<Product>, RepositoryError>;

    /// Exact-name lookup used by the create-time uniqueness check.
    async fn find_by_name(
        &self,
        tx: &Transaction<'_>,
        name: &str,
    ) -> Result<Option<Product>, RepositoryError>;

    /// Batched lookup for assembling line-item projections.
    async fn find_by_ids(
        &self,
        tx: &Transaction<'_>,
        ids: &[Uuid],
    ) -> Result<Vec<Product>, RepositoryError>;

    async fn list(
        &self,
        tx: &Transaction<'_>,
        filter: &ProductFilter,
        sort: ProductSort,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Product>, RepositoryError>;

    async fn count(
        &self,
        tx: &Transaction<'_>,
        filter: &ProductFilter,
    ) -> Result<i64, RepositoryError>;
}

/// PostgreSQL implementation of the [`ProductsRepository`] trait.
pub struct PgProductsRepository;

fn row_to_product(row: &Row) -> Product {
    Product {
        id: row.get("id"),
        name: row.get("name"),
        description: row.get("description"),
        description_html: row.get("description_html"),
        price: row.get("price"),
        seller_id: row.get("seller_id"),
        category_id: row.get("category_id"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

const PRODUCT_COLUMNS: &str =
    "id, name, description, description_html, price, seller_id, category_id, created_at, updated_at";

/// Builds the WHERE clause and parameter list shared by `list` and `count`.
///
/// Returned parameter references borrow from `filter` and `name_pattern`,
/// which must outlive the query call.
fn filter_clause<'a>(
    filter: &'a ProductFilter,
    name_pattern: &'a Option<String>,
) -> (String, Vec<&'a (dyn ToSql + Sync)>) {
    let mut clause = String::from("TRUE");
    let mut params: Vec<&(dyn ToSql + Sync)> = Vec::new();

    if let Some(pattern) = name_pattern {
        params.push(pattern);
        clause.push_str(&format!(" AND name ILIKE ${}", params.len()));
    }
    if let Some(category_id) = &filter.category_id {
        params.push(category_id);
        clause.push_str(&format!(" AND category_id = ${}", params.len()));
    }
    if let Some(min_price) = &filter.min_price {
        params.push(min_price);
        clause.push_str(&format!(" AND price >= ${}", params.len()));
    }
    if let Some(max_price) = &filter.max_price {
        params.push(max_price);
        clause.push_str(&format!(" AND price <= ${}", params.len()));
    }

    (clause, params)
}

#[async_trait]
impl ProductsRepository for PgProductsRepository {
    async fn insert(&self, tx: &Transaction<'_>, product: &Product) -> Result<(), RepositoryError> {
        let query = r#"
            INSERT INTO products (id, name, description, description_html, price,
                                  seller_id, category_id, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        "#;
        tx.execute(
            query,
            &[
                &product.id,
                &product.name,
                &product.description,
                &product.description_html,
                &product.price,
                &product.seller_id,
                &product.category_id,
                &product.created_at,
                &product.updated_at,
            ],
        )
        .await
        .map_err(crate::map_write_err)?;
        Ok(())
    }

    async fn update(&self, tx: &Transaction<'_>, product: &Product) -> Result<(), RepositoryError> {
        let query = r#"
            UPDATE products
            SET name = $2, description = $3, description_html = $4, price = $5,
                category_id = $6, updated_at = $7
            WHERE id = $1
        "#;
        let updated = tx
            .execute(
                query,
                &[
                    &product.id,
                    &product.name,
                    &product.description,
                    &product.description_html,
                    &product.price,
                    &product.category_id,
                    &product.updated_at,
                ],
            )
            .await
            .map_err(crate::map_write_err)?;
        if updated == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn delete(&self, tx: &Transaction<'_>, id: Uuid) -> Result<(), RepositoryError> {
        let deleted = tx
            .execute("DELETE FROM products WHERE id = $1", &[&id])
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
    ) -> Result<Option<Product>, RepositoryError> {
        let query = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1");
        let row = tx.query_opt(&query, &[&id]).await?;
        Ok(row.as_ref().map(row_to_product))
    }

    async fn find_by_name(
        &self,
        tx: &Transaction<'_>,
        name: &str,
    ) -> Result<Option<Product>, RepositoryError> {
        let query = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE name = $1");
        let row = tx.query_opt(&query, &[&name]).await?;
        Ok(row.as_ref().map(row_to_product))
    }

    async fn find_by_ids(
        &self,
        tx: &Transaction<'_>,
        ids: &[Uuid],
    ) -> Result<Vec<Product>, RepositoryError> {
        let query = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ANY($1)");
        let rows = tx.query(&query, &[&ids]).await?;
        Ok(rows.iter().map(row_to_product).collect())
    }

    async fn list(
        &self,
        tx: &Transaction<'_>,
        filter: &ProductFilter,
        sort: ProductSort,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Product>, RepositoryError> {
        let name_pattern = filter.name.as_ref().map(|n| format!("%{n}%"));
        let (clause, mut params) = filter_clause(filter, &name_pattern);
        params.push(&limit);
        let limit_idx = params.len();
        params.push(&offset);
        let offset_idx = params.len();

        let query = format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE {clause} ORDER BY {} LIMIT ${limit_idx} OFFSET ${offset_idx}",
            sort.order_by(),
        );
        let rows = tx.query(&query, &params).await?;
        Ok(rows.iter().map(row_to_product).collect())
    }

    async fn count(
        &self,
        tx: &Transaction<'_>,
        filter: &ProductFilter,
    ) -> Result<i64, RepositoryError> {
        let name_pattern = filter.name.as_ref().map(|n| format!("%{n}%"));
        let (clause, params) = filter_clause(filter, &name_pattern);
        let query = format!("SELECT COUNT(*) AS total FROM products WHERE {clause}");
        let row = tx.query_one(&query, &params).await?;
        Ok(row.get("total"))
    }
}
