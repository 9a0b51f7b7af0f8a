use async_trait::async_trait;
use model::Category;
use tokio_postgres::types::ToSql;
use tokio_postgres::{Row, Transaction};
use uuid::Uuid;

use crate::RepositoryError;

/// # CategoriesRepository
///
/// Repository interface for categories. `name` carries a store-level
/// unique constraint; violations surface as [`RepositoryError::Duplicate`]
/// so the check-then-insert race is closed at the store.
#[async_trait]
pub trait CategoriesRepository: Send + Sync {
    async fn insert(&self, tx: &Transaction<'_>, category: &Category)
    -> Result<(), RepositoryError>;

    async fn update(&self, tx: &Transaction<'_>, category: &Category)
    -> Result<(), RepositoryError>;

    async fn delete(&self, tx: &Transaction<'_>, id: Uuid) -> Result<(), RepositoryError>;

    async fn find_by_id(
        &self,
        tx: &Transaction<'_>,
        id: Uuid,
    ) -> Result<Option<Category>, RepositoryError>;

    async fn find_by_name(
        &self,
        tx: &Transaction<'_>,
        name: &str,
    ) -> Result<Option<Category>, RepositoryError>;

    /// Batched lookup for assembling product projections.
    async fn find_by_ids(
        &self,
        tx: &Transaction<'_>,
        ids: &[Uuid],
    ) -> Result<Vec<Category>, RepositoryError>;

    async fn list(
        &self,
        tx: &Transaction<'_>,
        name: Option<&str>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Category>, RepositoryError>;

    async fn count(
        &self,
        tx: &Transaction<'_>,
        name: Option<&str>,
    ) -> Result<i64, RepositoryError>;
}

/// PostgreSQL implementation of the [`CategoriesRepository`] trait.
pub struct PgCategoriesRepository;

fn row_to_category(row: &Row) -> Category {
    Category {
        id: row.get("id"),
        name: row.get("name"),
    }
}

#[async_trait]
impl CategoriesRepository for PgCategoriesRepository {
    async fn insert(
        &self,
        tx: &Transaction<'_>,
        category: &Category,
    ) -> Result<(), RepositoryError> {
        tx.execute(
            "INSERT INTO categories (id, name) VALUES ($1, $2)",
            &[&category.id, &category.name],
        )
        .await
        .map_err(crate::map_write_err)?;
        Ok(())
    }

    async fn update(
        &self,
        tx: &Transaction<'_>,
        category: &Category,
    ) -> Result<(), RepositoryError> {
        let updated = tx
            .execute(
                "UPDATE categories SET name = $2 WHERE id = $1",
                &[&category.id, &category.name],
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
            .execute("DELETE FROM categories WHERE id = $1", &[&id])
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
    ) -> Result<Option<Category>, RepositoryError> {
        let row = tx
            .query_opt("SELECT id, name FROM categories WHERE id = $1", &[&id])
            .await?;
        Ok(row.as_ref().map(row_to_category))
    }

    async fn find_by_name(
        &self,
        tx: &Transaction<'_>,
        name: &str,
    ) -> Result<Option<Category>, RepositoryError> {
        let row = tx
            .query_opt("SELECT id, name FROM categories WHERE name = $1", &[&name])
            .await?;
        Ok(row.as_ref().map(row_to_category))
    }

    async fn find_by_ids(
        &self,
        tx: &Transaction<'_>,
        ids: &[Uuid],
    ) -> Result<Vec<Category>, RepositoryError> {
        let rows = tx
            .query("SELECT id, name FROM categories WHERE id = ANY($1)", &[&ids])
            .await?;
        Ok(rows.iter().map(row_to_category).collect())
    }

    async fn list(
        &self,
        tx: &Transaction<'_>,
        name: Option<&str>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Category>, RepositoryError> {
        let pattern = name.map(|n| format!("%{n}%"));
        let mut clause = String::from("TRUE");
        let mut params: Vec<&(dyn ToSql + Sync)> = Vec::new();
        if let Some(p) = &pattern {
            params.push(p);
            clause.push_str(&format!(" AND name ILIKE ${}", params.len()));
        }
        params.push(&limit);
        let limit_idx = params.len();
        params.push(&offset);
        let offset_idx = params.len();

        let query = format!(
            "SELECT id, name FROM categories WHERE {clause} ORDER BY name ASC LIMIT ${limit_idx} OFFSET ${offset_idx}"
        );
        let rows = tx.query(&query, &params).await?;
        Ok(rows.iter().map(row_to_category).collect())
    }

    async fn count(
        &self,
        tx: &Transaction<'_>,
        name: Option<&str>,
    ) -> Result<i64, RepositoryError> {
        let pattern = name.map(|n| format!("%{n}%"));
        let mut clause = String::from("TRUE");
        let mut params: Vec<&(dyn ToSql + Sync)> = Vec::new();
        if let Some(p) = &pattern {
            params.push(p);
            clause.push_str(&format!(" AND name ILIKE ${}", params.len()));
        }
        let query = format!("SELECT COUNT(*) AS total FROM categories WHERE {clause}");
        let row = tx.query_one(&query, &params).await?;
        Ok(row.get("total"))
    }
}
