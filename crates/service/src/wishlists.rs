//! Wishlist line service.
//!
//! Unlike carts, a duplicate `(user, product, variant)` create is rejected
//! outright. `toggle` is the idempotent add-if-absent/remove-if-present
//! primitive the storefront UI relies on.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use deadpool_postgres::Pool;
use model::{ProductVariant, WishlistLine};
use repository::{
    CategoriesRepository, ImagesRepository, ProductsRepository, UsersRepository,
    VariantsRepository, WishlistsRepository,
};
use serde::Serialize;
use tokio_postgres::Transaction;
use tracing::instrument;
use uuid::Uuid;

use crate::relations::load_list_items;
use crate::sanitize::ProductListItem;
use crate::{Caller, Paging, ServiceError};

/// A wishlist line with its list-projected product and variant attached.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WishlistLineView {
    pub id: Uuid,
    pub product_id: Uuid,
    pub variant_id: Option<Uuid>,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(rename = "Product")]
    pub product: Option<ProductListItem>,
    #[serde(rename = "Variant")]
    pub variant: Option<ProductVariant>,
}

/// One page of a user's wishlist.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WishlistPage {
    pub wishlists: Vec<WishlistLineView>,
    pub total: i64,
    pub page: i64,
    pub total_pages: i64,
}

/// Result of a toggle: what happened and the line it happened to.
#[derive(Debug, Clone, Serialize)]
pub struct WishlistToggle {
    pub action: &'static str,
    pub wishlist: WishlistLineView,
}

/// Trait describing wishlist line operations.
#[async_trait]
pub trait WishlistService: Send + Sync {
    async fn list(
        &self,
        caller: &Caller,
        page: Option<i64>,
        limit: Option<i64>,
    ) -> Result<WishlistPage, ServiceError>;

    /// Creates a line; a duplicate triple is a Conflict, never a merge.
    async fn create(
        &self,
        caller: &Caller,
        product_id: Uuid,
        variant_id: Option<Uuid>,
    ) -> Result<WishlistLineView, ServiceError>;

    /// Deletes the line if the triple exists, creates it otherwise.
    async fn toggle(
        &self,
        caller: &Caller,
        product_id: Uuid,
        variant_id: Option<Uuid>,
    ) -> Result<WishlistToggle, ServiceError>;

    /// Ownership-checked delete; returns the deleted line's snapshot.
    async fn delete(
        &self,
        caller: &Caller,
        line_id: Uuid,
    ) -> Result<WishlistLineView, ServiceError>;
}

/// Async implementation of [`WishlistService`] using the repository pattern.
pub struct WishlistServiceImpl<L, P, I, V, C, U> {
    db_pool: Pool,
    wishlists_repo: L,
    products_repo: P,
    images_repo: I,
    variants_repo: V,
    categories_repo: C,
    users_repo: U,
    base_url: String,
}

impl<L, P, I, V, C, U> WishlistServiceImpl<L, P, I, V, C, U>
where
    L: WishlistsRepository,
    P: ProductsRepository,
    I: ImagesRepository,
    V: VariantsRepository,
    C: CategoriesRepository,
    U: UsersRepository,
{
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        db_pool: Pool,
        wishlists_repo: L,
        products_repo: P,
        images_repo: I,
        variants_repo: V,
        categories_repo: C,
        users_repo: U,
        base_url: String,
    ) -> Self {
        Self {
            db_pool,
            wishlists_repo,
            products_repo,
            images_repo,
            variants_repo,
            categories_repo,
            users_repo,
            base_url,
        }
    }

    async fn views_for(
        &self,
        tx: &Transaction<'_>,
        lines: Vec<WishlistLine>,
    ) -> Result<Vec<WishlistLineView>, ServiceError> {
        let product_ids: Vec<Uuid> = lines.iter().map(|l| l.product_id).collect();
        let variant_ids: Vec<Uuid> = lines.iter().filter_map(|l| l.variant_id).collect();

        let mut products = load_list_items(
            tx,
            &product_ids,
            &self.products_repo,
            &self.images_repo,
            &self.variants_repo,
            &self.categories_repo,
            &self.users_repo,
            &self.base_url,
        )
        .await?;
        let variants: std::collections::HashMap<Uuid, ProductVariant> = self
            .variants_repo
            .find_by_ids(tx, &variant_ids)
            .await?
            .into_iter()
            .map(|v| (v.id, v))
            .collect();

        Ok(lines
            .into_iter()
            .map(|line| WishlistLineView {
                id: line.id,
                product_id: line.product_id,
                variant_id: line.variant_id,
                user_id: line.user_id,
                created_at: line.created_at,
                updated_at: line.updated_at,
                product: products.remove(&line.product_id),
                variant: line.variant_id.and_then(|id| variants.get(&id).cloned()),
            })
            .collect())
    }

    async fn view_for(
        &self,
        tx: &Transaction<'_>,
        line: WishlistLine,
    ) -> Result<WishlistLineView, ServiceError> {
        let mut views = self.views_for(tx, vec![line]).await?;
        views
            .pop()
            .ok_or_else(|| ServiceError::Unexpected("Wishlist line view missing".into()))
    }

    /// Shared by `create` and the create half of `toggle`: validates the
    /// product/variant pair and inserts the line.
    async fn validate_and_insert(
        &self,
        tx: &Transaction<'_>,
        caller: &Caller,
        product_id: Uuid,
        variant_id: Option<Uuid>,
    ) -> Result<WishlistLine, ServiceError> {
        self.products_repo
            .find_by_id(tx, product_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Product not found".into()))?;

        if let Some(variant_id) = variant_id {
            self.variants_repo
                .find_by_id(tx, variant_id)
                .await?
                .filter(|v| v.product_id == product_id)
                .ok_or_else(|| ServiceError::NotFound("Variant not found for product".into()))?;
        }

        let now = Utc::now();
        let line = WishlistLine {
            id: Uuid::new_v4(),
            user_id: caller.id,
            product_id,
            variant_id,
            created_at: now,
            updated_at: now,
        };
        if let Err(err) = self.wishlists_repo.insert(tx, &line).await {
            return Err(match err {
                repository::RepositoryError::Duplicate => {
                    ServiceError::Conflict("Wishlist already exists".into())
                }
                other => ServiceError::Db(other),
            });
        }
        Ok(line)
    }
}

#[async_trait]
impl<L, P, I, V, C, U> WishlistService for WishlistServiceImpl<L, P, I, V, C, U>
where
    L: WishlistsRepository,
    P: ProductsRepository,
    I: ImagesRepository,
    V: VariantsRepository,
    C: CategoriesRepository,
    U: UsersRepository,
{
    #[instrument(skip(self))]
    async fn list(
        &self,
        caller: &Caller,
        page: Option<i64>,
        limit: Option<i64>,
    ) -> Result<WishlistPage, ServiceError> {
        let paging = Paging::new(page, limit);

        let mut client = self.db_pool.get().await?;
        let tx = client
            .transaction()
            .await
            .map_err(|e| ServiceError::Unexpected(format!("Begin transaction failed: {e}")))?;

        let total = self.wishlists_repo.count_for_user(&tx, caller.id).await?;
        let lines = self
            .wishlists_repo
            .list_for_user(&tx, caller.id, paging.limit, paging.offset())
            .await?;
        let wishlists = self.views_for(&tx, lines).await?;

        tx.commit()
            .await
            .map_err(|e| ServiceError::Unexpected(format!("Commit failed: {e}")))?;

        Ok(WishlistPage {
            wishlists,
            total,
            page: paging.page,
            total_pages: paging.total_pages(total),
        })
    }

    #[instrument(skip(self))]
    async fn create(
        &self,
        caller: &Caller,
        product_id: Uuid,
        variant_id: Option<Uuid>,
    ) -> Result<WishlistLineView, ServiceError> {
        let mut client = self.db_pool.get().await?;
        let tx = client
            .transaction()
            .await
            .map_err(|e| ServiceError::Unexpected(format!("Begin transaction failed: {e}")))?;

        if self
            .wishlists_repo
            .find_by_triple(&tx, caller.id, product_id, variant_id)
            .await?
            .is_some()
        {
            return Err(ServiceError::Conflict("Wishlist already exists".into()));
        }

        let line = self
            .validate_and_insert(&tx, caller, product_id, variant_id)
            .await?;
        let view = self.view_for(&tx, line).await?;

        tx.commit()
            .await
            .map_err(|e| ServiceError::Unexpected(format!("Commit failed: {e}")))?;
        Ok(view)
    }

    #[instrument(skip(self))]
    async fn toggle(
        &self,
        caller: &Caller,
        product_id: Uuid,
        variant_id: Option<Uuid>,
    ) -> Result<WishlistToggle, ServiceError> {
        let mut client = self.db_pool.get().await?;
        let tx = client
            .transaction()
            .await
            .map_err(|e| ServiceError::Unexpected(format!("Begin transaction failed: {e}")))?;

        let toggle = match self
            .wishlists_repo
            .find_by_triple(&tx, caller.id, product_id, variant_id)
            .await?
        {
            Some(existing) => {
                let view = self.view_for(&tx, existing.clone()).await?;
                self.wishlists_repo.delete(&tx, existing.id).await?;
                WishlistToggle {
                    action: "deleted",
                    wishlist: view,
                }
            }
            None => {
                let line = self
                    .validate_and_insert(&tx, caller, product_id, variant_id)
                    .await?;
                WishlistToggle {
                    action: "created",
                    wishlist: self.view_for(&tx, line).await?,
                }
            }
        };

        tx.commit()
            .await
            .map_err(|e| ServiceError::Unexpected(format!("Commit failed: {e}")))?;
        Ok(toggle)
    }

    #[instrument(skip(self))]
    async fn delete(
        &self,
        caller: &Caller,
        line_id: Uuid,
    ) -> Result<WishlistLineView, ServiceError> {
        let mut client = self.db_pool.get().await?;
        let tx = client
            .transaction()
            .await
            .map_err(|e| ServiceError::Unexpected(format!("Begin transaction failed: {e}")))?;

        let existing = self
            .wishlists_repo
            .find_by_id(&tx, line_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Wishlist not found".into()))?;
        if existing.user_id != caller.id {
            return Err(ServiceError::Forbidden("Unauthorized".into()));
        }

        let view = self.view_for(&tx, existing.clone()).await?;
        self.wishlists_repo.delete(&tx, existing.id).await?;

        tx.commit()
            .await
            .map_err(|e| ServiceError::Unexpected(format!("Commit failed: {e}")))?;
        Ok(view)
    }
}
