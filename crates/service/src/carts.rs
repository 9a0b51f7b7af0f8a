//! Cart line service.
//!
//! Cart creates merge into an existing `(user, product, variant)` line
//! instead of inserting a duplicate. Every stock comparison reads the
//! variant row with a row-level lock inside the same transaction as the
//! write, so concurrent quantity writes serialize instead of jointly
//! oversubscribing stock.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use deadpool_postgres::Pool;
use model::{CartLine, ProductVariant};
use repository::{
    CartsRepository, CategoriesRepository, ImagesRepository, ProductsRepository, UsersRepository,
    VariantsRepository,
};
use serde::Serialize;
use tokio_postgres::Transaction;
use tracing::instrument;
use uuid::Uuid;

use crate::relations::load_list_items;
use crate::sanitize::ProductListItem;
use crate::{Caller, Paging, ServiceError};

/// Cart create payload after boundary decoding.
#[derive(Debug, Clone, Copy, Default)]
pub struct CartCreateInput {
    pub variant_id: Option<Uuid>,
    /// Raw quantity as submitted; normalized by the service.
    pub quantity: Option<f64>,
}

/// Cart update payload: `delta` is additive, `quantity` absolute.
#[derive(Debug, Clone, Copy, Default)]
pub struct CartUpdateInput {
    pub quantity: Option<f64>,
    pub delta: Option<f64>,
}

/// A cart line with its list-projected product and variant attached.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLineView {
    pub id: Uuid,
    pub quantity: i32,
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

/// One page of a user's cart.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartPage {
    pub carts: Vec<CartLineView>,
    pub total: i64,
    pub page: i64,
    pub total_pages: i64,
}

/// Trait describing cart line operations.
#[async_trait]
pub trait CartService: Send + Sync {
    async fn list(
        &self,
        caller: &Caller,
        page: Option<i64>,
        limit: Option<i64>,
    ) -> Result<CartPage, ServiceError>;

    /// Creates a line, or merges quantities into the existing line for the
    /// same `(user, product, variant)` triple.
    async fn create(
        &self,
        caller: &Caller,
        product_id: Uuid,
        input: CartCreateInput,
    ) -> Result<CartLineView, ServiceError>;

    async fn update(
        &self,
        caller: &Caller,
        line_id: Uuid,
        input: CartUpdateInput,
    ) -> Result<CartLineView, ServiceError>;

    /// Ownership-checked delete; returns the deleted line's snapshot.
    async fn delete(&self, caller: &Caller, line_id: Uuid) -> Result<CartLineView, ServiceError>;
}

/// Normalizes a requested cart-create quantity.
///
/// Absent and zero both fall back to 1 (matching the web client's
/// contract); negatives clamp to 0 and are rejected later when a variant
/// is involved. Fractional values are invalid.
pub fn normalize_requested_quantity(quantity: Option<f64>) -> Result<i32, ServiceError> {
    let Some(q) = quantity else { return Ok(1) };
    if q.fract() != 0.0 || !q.is_finite() {
        return Err(ServiceError::Validation(
            "Quantity must be a non-negative integer".into(),
        ));
    }
    if q == 0.0 {
        return Ok(1);
    }
    Ok(q.max(0.0) as i32)
}

/// Resolves the new absolute quantity for a cart update, clamped to ≥ 0.
pub fn resolve_new_quantity(
    current: i32,
    quantity: Option<f64>,
    delta: Option<f64>,
) -> Result<i32, ServiceError> {
    let invalid = || ServiceError::Validation("Quantity must be a non-negative integer".into());
    let new_qty = if let Some(d) = delta {
        if d.fract() != 0.0 || !d.is_finite() {
            return Err(invalid());
        }
        (i64::from(current) + d as i64).max(0)
    } else if let Some(q) = quantity {
        if q.fract() != 0.0 || !q.is_finite() {
            return Err(invalid());
        }
        (q as i64).max(0)
    } else {
        i64::from(current)
    };
    i32::try_from(new_qty).map_err(|_| invalid())
}

/// Async implementation of [`CartService`] using the repository pattern.
pub struct CartServiceImpl<L, P, I, V, C, U> {
    db_pool: Pool,
    carts_repo: L,
    products_repo: P,
    images_repo: I,
    variants_repo: V,
    categories_repo: C,
    users_repo: U,
    base_url: String,
}

impl<L, P, I, V, C, U> CartServiceImpl<L, P, I, V, C, U>
where
    L: CartsRepository,
    P: ProductsRepository,
    I: ImagesRepository,
    V: VariantsRepository,
    C: CategoriesRepository,
    U: UsersRepository,
{
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        db_pool: Pool,
        carts_repo: L,
        products_repo: P,
        images_repo: I,
        variants_repo: V,
        categories_repo: C,
        users_repo: U,
        base_url: String,
    ) -> Self {
        Self {
            db_pool,
            carts_repo,
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
        lines: Vec<CartLine>,
    ) -> Result<Vec<CartLineView>, ServiceError> {
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
            .map(|line| CartLineView {
                id: line.id,
                quantity: line.quantity,
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
        line: CartLine,
    ) -> Result<CartLineView, ServiceError> {
        let mut views = self.views_for(tx, vec![line]).await?;
        views
            .pop()
            .ok_or_else(|| ServiceError::Unexpected("Cart line view missing".into()))
    }
}

#[async_trait]
impl<L, P, I, V, C, U> CartService for CartServiceImpl<L, P, I, V, C, U>
where
    L: CartsRepository,
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
    ) -> Result<CartPage, ServiceError> {
        let paging = Paging::new(page, limit);

        let mut client = self.db_pool.get().await?;
        let tx = client
            .transaction()
            .await
            .map_err(|e| ServiceError::Unexpected(format!("Begin transaction failed: {e}")))?;

        let total = self.carts_repo.count_for_user(&tx, caller.id).await?;
        let lines = self
            .carts_repo
            .list_for_user(&tx, caller.id, paging.limit, paging.offset())
            .await?;
        let carts = self.views_for(&tx, lines).await?;

        tx.commit()
            .await
            .map_err(|e| ServiceError::Unexpected(format!("Commit failed: {e}")))?;

        Ok(CartPage {
            carts,
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
        input: CartCreateInput,
    ) -> Result<CartLineView, ServiceError> {
        let mut client = self.db_pool.get().await?;
        let tx = client
            .transaction()
            .await
            .map_err(|e| ServiceError::Unexpected(format!("Begin transaction failed: {e}")))?;

        self.products_repo
            .find_by_id(&tx, product_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Product not found".into()))?;

        // Lock the variant row so the stock comparison and the quantity
        // write happen under the same row-level lock.
        let locked_variant = match input.variant_id {
            Some(variant_id) => Some(
                self.variants_repo
                    .find_by_id_for_update(&tx, variant_id)
                    .await?
                    .filter(|v| v.product_id == product_id)
                    .ok_or_else(|| {
                        ServiceError::NotFound("Variant not found for product".into())
                    })?,
            ),
            None => None,
        };

        let requested = normalize_requested_quantity(input.quantity)?;
        if let Some(variant) = &locked_variant {
            if requested <= 0 {
                return Err(ServiceError::Validation("Quantity must be at least 1".into()));
            }
            if requested > variant.stock {
                return Err(ServiceError::Conflict(
                    "Requested quantity exceeds available stock".into(),
                ));
            }
        }

        let now = Utc::now();
        let line = match self
            .carts_repo
            .find_by_triple(&tx, caller.id, product_id, input.variant_id)
            .await?
        {
            Some(existing) => {
                let merged = existing.quantity + requested;
                if let Some(variant) = &locked_variant {
                    if merged > variant.stock {
                        return Err(ServiceError::Conflict(
                            "Requested quantity exceeds available stock".into(),
                        ));
                    }
                }
                self.carts_repo
                    .update_quantity(&tx, existing.id, merged, now)
                    .await?;
                CartLine {
                    quantity: merged,
                    updated_at: now,
                    ..existing
                }
            }
            None => {
                let line = CartLine {
                    id: Uuid::new_v4(),
                    user_id: caller.id,
                    product_id,
                    variant_id: input.variant_id,
                    quantity: requested,
                    created_at: now,
                    updated_at: now,
                };
                // The partial unique index catches a concurrent create for
                // the same triple that slipped past the lookup above.
                self.carts_repo.insert(&tx, &line).await.map_err(|e| match e {
                    repository::RepositoryError::Duplicate => {
                        ServiceError::Conflict("Cart item already exists".into())
                    }
                    other => ServiceError::Db(other),
                })?;
                line
            }
        };

        let view = self.view_for(&tx, line).await?;
        tx.commit()
            .await
            .map_err(|e| ServiceError::Unexpected(format!("Commit failed: {e}")))?;
        Ok(view)
    }

    #[instrument(skip(self))]
    async fn update(
        &self,
        caller: &Caller,
        line_id: Uuid,
        input: CartUpdateInput,
    ) -> Result<CartLineView, ServiceError> {
        let mut client = self.db_pool.get().await?;
        let tx = client
            .transaction()
            .await
            .map_err(|e| ServiceError::Unexpected(format!("Begin transaction failed: {e}")))?;

        let existing = self
            .carts_repo
            .find_by_id(&tx, line_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Cart item not found".into()))?;
        if existing.user_id != caller.id {
            return Err(ServiceError::Forbidden("Unauthorized".into()));
        }

        let new_quantity = resolve_new_quantity(existing.quantity, input.quantity, input.delta)?;

        // A deleted variant no longer constrains the line.
        if let Some(variant_id) = existing.variant_id {
            if let Some(variant) = self
                .variants_repo
                .find_by_id_for_update(&tx, variant_id)
                .await?
            {
                if new_quantity > variant.stock {
                    return Err(ServiceError::Conflict(
                        "Requested quantity exceeds available stock".into(),
                    ));
                }
            }
        }

        let now = Utc::now();
        self.carts_repo
            .update_quantity(&tx, existing.id, new_quantity, now)
            .await?;

        let view = self
            .view_for(
                &tx,
                CartLine {
                    quantity: new_quantity,
                    updated_at: now,
                    ..existing
                },
            )
            .await?;
        tx.commit()
            .await
            .map_err(|e| ServiceError::Unexpected(format!("Commit failed: {e}")))?;
        Ok(view)
    }

    #[instrument(skip(self))]
    async fn delete(&self, caller: &Caller, line_id: Uuid) -> Result<CartLineView, ServiceError> {
        let mut client = self.db_pool.get().await?;
        let tx = client
            .transaction()
            .await
            .map_err(|e| ServiceError::Unexpected(format!("Begin transaction failed: {e}")))?;

        let existing = self
            .carts_repo
            .find_by_id(&tx, line_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Cart item not found".into()))?;
        if existing.user_id != caller.id {
            return Err(ServiceError::Forbidden("Unauthorized".into()));
        }

        let view = self.view_for(&tx, existing.clone()).await?;
        self.carts_repo.delete(&tx, existing.id).await?;

        tx.commit()
            .await
            .map_err(|e| ServiceError::Unexpected(format!("Commit failed: {e}")))?;
        Ok(view)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_quantity_defaults_to_one() {
        assert_eq!(normalize_requested_quantity(None).unwrap(), 1);
        assert_eq!(normalize_requested_quantity(Some(0.0)).unwrap(), 1);
    }

    #[test]
    fn test_normalize_quantity_clamps_negative_to_zero() {
        assert_eq!(normalize_requested_quantity(Some(-4.0)).unwrap(), 0);
    }

    #[test]
    fn test_normalize_quantity_passes_positive_integers() {
        assert_eq!(normalize_requested_quantity(Some(3.0)).unwrap(), 3);
    }

    #[test]
    fn test_normalize_quantity_rejects_fractions() {
        let err = normalize_requested_quantity(Some(2.5)).unwrap_err();
        assert!(matches!(err, ServiceError::Validation(m)
            if m == "Quantity must be a non-negative integer"));
    }

    #[test]
    fn test_resolve_quantity_absolute() {
        assert_eq!(resolve_new_quantity(5, Some(2.0), None).unwrap(), 2);
        assert_eq!(resolve_new_quantity(5, Some(-2.0), None).unwrap(), 0);
    }

    #[test]
    fn test_resolve_quantity_delta_wins_over_absolute() {
        assert_eq!(resolve_new_quantity(5, Some(2.0), Some(-1.0)).unwrap(), 4);
        assert_eq!(resolve_new_quantity(1, None, Some(-3.0)).unwrap(), 0);
    }

    #[test]
    fn test_resolve_quantity_unchanged_without_input() {
        assert_eq!(resolve_new_quantity(7, None, None).unwrap(), 7);
    }

    #[test]
    fn test_resolve_quantity_rejects_fractions() {
        assert!(resolve_new_quantity(1, Some(1.5), None).is_err());
        assert!(resolve_new_quantity(1, None, Some(0.5)).is_err());
    }
}
