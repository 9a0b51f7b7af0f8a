//! Category service.
//!
//! Category names are unique at the store level; the check-then-insert
//! race is closed by translating the constraint violation into a Conflict.

use async_trait::async_trait;
use deadpool_postgres::Pool;
use model::Category;
use repository::{CategoriesRepository, RepositoryError};
use serde::Serialize;
use tracing::instrument;
use uuid::Uuid;

use crate::{Paging, ServiceError};

/// One page of categories.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryPage {
    pub categories: Vec<Category>,
    pub total: i64,
    pub page: i64,
    pub total_pages: i64,
}

/// Trait describing category operations.
#[async_trait]
pub trait CategoryService: Send + Sync {
    async fn list(
        &self,
        name: Option<String>,
        page: Option<i64>,
        limit: Option<i64>,
    ) -> Result<CategoryPage, ServiceError>;

    async fn create(&self, name: String) -> Result<Category, ServiceError>;

    async fn edit(&self, id: Uuid, name: String) -> Result<Category, ServiceError>;

    async fn delete(&self, id: Uuid) -> Result<(), ServiceError>;
}

/// Async implementation of [`CategoryService`] using the repository pattern.
pub struct CategoryServiceImpl<C> {
    db_pool: Pool,
    categories_repo: C,
}

impl<C: CategoriesRepository> CategoryServiceImpl<C> {
    pub fn new(db_pool: Pool, categories_repo: C) -> Self {
        Self {
            db_pool,
            categories_repo,
        }
    }
}

fn dup_to_conflict(err: RepositoryError) -> ServiceError {
    match err {
        RepositoryError::Duplicate => ServiceError::Conflict("Category already exists".into()),
        other => ServiceError::Db(other),
    }
}

#[async_trait]
impl<C: CategoriesRepository> CategoryService for CategoryServiceImpl<C> {
    #[instrument(skip(self))]
    async fn list(
        &self,
        name: Option<String>,
        page: Option<i64>,
        limit: Option<i64>,
    ) -> Result<CategoryPage, ServiceError> {
        let paging = Paging::new(page, limit);
        let name = name.filter(|n| !n.is_empty());

        let mut client = self.db_pool.get().await?;
        let tx = client
            .transaction()
            .await
            .map_err(|e| ServiceError::Unexpected(format!("Begin transaction failed: {e}")))?;

        let total = self.categories_repo.count(&tx, name.as_deref()).await?;
        let categories = self
            .categories_repo
            .list(&tx, name.as_deref(), paging.limit, paging.offset())
            .await?;

        tx.commit()
            .await
            .map_err(|e| ServiceError::Unexpected(format!("Commit failed: {e}")))?;

        Ok(CategoryPage {
            categories,
            total,
            page: paging.page,
            total_pages: paging.total_pages(total),
        })
    }

    #[instrument(skip(self))]
    async fn create(&self, name: String) -> Result<Category, ServiceError> {
        if name.is_empty() {
            return Err(ServiceError::Validation("Category name is required".into()));
        }

        let mut client = self.db_pool.get().await?;
        let tx = client
            .transaction()
            .await
            .map_err(|e| ServiceError::Unexpected(format!("Begin transaction failed: {e}")))?;

        if self
            .categories_repo
            .find_by_name(&tx, &name)
            .await?
            .is_some()
        {
            return Err(ServiceError::Conflict("Category already exists".into()));
        }

        let category = Category {
            id: Uuid::new_v4(),
            name,
        };
        self.categories_repo
            .insert(&tx, &category)
            .await
            .map_err(dup_to_conflict)?;

        tx.commit()
            .await
            .map_err(|e| ServiceError::Unexpected(format!("Commit failed: {e}")))?;
        Ok(category)
    }

    #[instrument(skip(self))]
    async fn edit(&self, id: Uuid, name: String) -> Result<Category, ServiceError> {
        if name.is_empty() {
            return Err(ServiceError::Validation("Category name is required".into()));
        }

        let mut client = self.db_pool.get().await?;
        let tx = client
            .transaction()
            .await
            .map_err(|e| ServiceError::Unexpected(format!("Begin transaction failed: {e}")))?;

        self.categories_repo
            .find_by_id(&tx, id)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Category not found".into()))?;

        let category = Category { id, name };
        self.categories_repo
            .update(&tx, &category)
            .await
            .map_err(dup_to_conflict)?;

        tx.commit()
            .await
            .map_err(|e| ServiceError::Unexpected(format!("Commit failed: {e}")))?;
        Ok(category)
    }

    #[instrument(skip(self))]
    async fn delete(&self, id: Uuid) -> Result<(), ServiceError> {
        let mut client = self.db_pool.get().await?;
        let tx = client
            .transaction()
            .await
            .map_err(|e| ServiceError::Unexpected(format!("Begin transaction failed: {e}")))?;

        self.categories_repo
            .find_by_id(&tx, id)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Category not found".into()))?;
        self.categories_repo.delete(&tx, id).await?;

        tx.commit()
            .await
            .map_err(|e| ServiceError::Unexpected(format!("Commit failed: {e}")))?;
        Ok(())
    }
}
