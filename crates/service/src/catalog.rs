//! Catalog query and mutation services.
//!
//! Product create/update/delete reconcile images and variants as one
//! atomic unit: either every sub-step commits or none do. Listing and
//! detail retrieval run inside the same transaction as their count so a
//! page and its total always come from one snapshot.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use deadpool_postgres::Pool;
use model::{Product, ProductImage, ProductVariant};
use repository::{
    CategoriesRepository, ImagesRepository, ProductFilter, ProductSort, ProductsRepository,
    RepositoryError, UsersRepository, VariantsRepository,
};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use tokio_postgres::Transaction;
use tracing::instrument;
use uuid::Uuid;

use crate::images::{IMAGE_CONTENT_TYPE, normalize_image};
use crate::input::{self, ProductForm, VariantInput};
use crate::markdown::render_markdown;
use crate::relations::load_product_relations;
use crate::sanitize::{ProductDetail, ProductListItem, sanitize_detail, sanitize_list};
use crate::{Caller, Paging, ServiceError};

/// Query parameters for the product listing.
#[derive(Debug, Clone, Default)]
pub struct ProductListQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub name: Option<String>,
    pub category_id: Option<Uuid>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    pub sort: Option<String>,
}

/// One page of list-projected products.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductPage {
    pub products: Vec<ProductListItem>,
    pub total: i64,
    pub page: i64,
    pub total_pages: i64,
}

/// Raw image payload plus the caching timestamp for the HTTP boundary.
#[derive(Debug, Clone)]
pub struct RenderedImage {
    pub bytes: Vec<u8>,
    pub updated_at: DateTime<Utc>,
    pub content_type: &'static str,
}

/// Trait describing catalog operations.
///
/// Implementations are expected to guarantee atomicity: partial
/// application of a mutation must never be observable.
#[async_trait]
pub trait CatalogService: Send + Sync {
    /// Creates a product with its images and variants as one atomic unit.
    async fn create_product(
        &self,
        caller: &Caller,
        form: ProductForm,
    ) -> Result<ProductDetail, ServiceError>;

    /// Applies a partial update: image removal, image addition, the three
    /// variant channels, then scalar fields, then primary self-healing.
    async fn update_product(
        &self,
        caller: &Caller,
        product_id: Uuid,
        form: ProductForm,
    ) -> Result<ProductDetail, ServiceError>;

    /// Deletes the product (images/variants cascade at the store) and
    /// returns the sanitized pre-delete snapshot.
    async fn delete_product(
        &self,
        caller: &Caller,
        product_id: Uuid,
    ) -> Result<ProductDetail, ServiceError>;

    async fn list_products(&self, query: ProductListQuery) -> Result<ProductPage, ServiceError>;

    async fn get_product(&self, id: Uuid) -> Result<ProductDetail, ServiceError>;

    /// Resolves an image id, falling back to treating the input as a
    /// product id and serving its primary (or first) image.
    async fn render_image(&self, id: Uuid) -> Result<RenderedImage, ServiceError>;
}

/// Async implementation of [`CatalogService`] using the repository pattern.
pub struct CatalogServiceImpl<P, I, V, C, U> {
    db_pool: Pool,
    products_repo: P,
    images_repo: I,
    variants_repo: V,
    categories_repo: C,
    users_repo: U,
    base_url: String,
}

impl<P, I, V, C, U> CatalogServiceImpl<P, I, V, C, U>
where
    P: ProductsRepository,
    I: ImagesRepository,
    V: VariantsRepository,
    C: CategoriesRepository,
    U: UsersRepository,
{
    pub fn new(
        db_pool: Pool,
        products_repo: P,
        images_repo: I,
        variants_repo: V,
        categories_repo: C,
        users_repo: U,
        base_url: String,
    ) -> Self {
        Self {
            db_pool,
            products_repo,
            images_repo,
            variants_repo,
            categories_repo,
            users_repo,
            base_url,
        }
    }

    /// Resolves an optional `categoryId` form value against the store.
    /// An empty string counts as absent; anything unresolvable is NotFound.
    async fn resolve_category(
        &self,
        tx: &Transaction<'_>,
        raw: Option<&str>,
    ) -> Result<Option<Uuid>, ServiceError> {
        let Some(raw) = raw.filter(|s| !s.is_empty()) else {
            return Ok(None);
        };
        let id: Uuid = raw
            .parse()
            .map_err(|_| ServiceError::NotFound("Category not found".into()))?;
        self.categories_repo
            .find_by_id(tx, id)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Category not found".into()))?;
        Ok(Some(id))
    }

    async fn detail_for(
        &self,
        tx: &Transaction<'_>,
        product: Product,
    ) -> Result<ProductDetail, ServiceError> {
        let relations = load_product_relations(
            tx,
            vec![product],
            &self.images_repo,
            &self.variants_repo,
            &self.categories_repo,
            &self.users_repo,
        )
        .await?;
        let rel = relations
            .into_iter()
            .next()
            .ok_or_else(|| ServiceError::Unexpected("Product relations missing".into()))?;
        Ok(sanitize_detail(&rel, &self.base_url))
    }

    /// Channel b: per-id variant updates and inserts, validated against
    /// the payload itself and the product's current variants.
    async fn apply_variant_updates(
        &self,
        tx: &Transaction<'_>,
        product_id: Uuid,
        updates: &[input::VariantUpdateInput],
    ) -> Result<(), ServiceError> {
        let existing = self.variants_repo.for_product(tx, product_id).await?;
        let existing_by_name: HashMap<String, Uuid> =
            existing.iter().map(|v| (v.variant.clone(), v.id)).collect();

        let mut seen: HashSet<String> = HashSet::new();
        for entry in updates {
            if let Some(name_raw) = &entry.variant {
                let name = name_raw.trim();
                if !seen.insert(name.to_string()) {
                    return Err(ServiceError::Conflict(format!(
                        "Duplicate variant name in payload: {name}"
                    )));
                }
                if let Some(existing_id) = existing_by_name.get(name) {
                    if entry.id != Some(*existing_id) {
                        return Err(ServiceError::Conflict(format!(
                            "Variant name already exists for this product: {name}"
                        )));
                    }
                }
            }

            let now = Utc::now();
            match entry.id {
                Some(id) => {
                    let mut updated = self
                        .variants_repo
                        .find_by_id(tx, id)
                        .await?
                        .filter(|v| v.product_id == product_id)
                        .ok_or_else(|| {
                            ServiceError::NotFound("Variant not found for product".into())
                        })?;
                    if let Some(name) = &entry.variant {
                        updated.variant = name.clone();
                    }
                    if let Some(stock) = entry.stock {
                        updated.stock = stock.max(0);
                    }
                    updated.updated_at = now;
                    self.variants_repo
                        .update(tx, &updated)
                        .await
                        .map_err(dup_variant_to_conflict)?;
                }
                None => {
                    let variant = ProductVariant {
                        id: Uuid::new_v4(),
                        variant: entry.variant.clone().unwrap_or_default(),
                        stock: entry.stock.unwrap_or(0).max(0),
                        product_id,
                        created_at: now,
                        updated_at: now,
                    };
                    self.variants_repo
                        .insert(tx, &variant)
                        .await
                        .map_err(dup_variant_to_conflict)?;
                }
            }
        }
        Ok(())
    }

    /// Promotes the oldest image when no primary remains after a mutation.
    async fn heal_primary_image(
        &self,
        tx: &Transaction<'_>,
        product_id: Uuid,
    ) -> Result<(), ServiceError> {
        if self.images_repo.has_primary(tx, product_id).await? {
            return Ok(());
        }
        if let Some(oldest) = self.images_repo.oldest_meta(tx, product_id).await? {
            self.images_repo
                .set_primary(tx, oldest.id, Utc::now())
                .await?;
        }
        Ok(())
    }
}

/// The `(product_id, variant)` constraint backstops payload validation;
/// a violation that slips past it is still a Conflict, not a server error.
fn dup_variant_to_conflict(err: RepositoryError) -> ServiceError {
    match err {
        RepositoryError::Duplicate => {
            ServiceError::Conflict("Variant name already exists for this product".into())
        }
        other => ServiceError::Db(other),
    }
}

fn parse_sort(sort: Option<&str>) -> ProductSort {
    match sort {
        Some("price_asc") => ProductSort::PriceAsc,
        Some("price_desc") => ProductSort::PriceDesc,
        _ => ProductSort::Newest,
    }
}

/// Builds the stored variant rows for a validated full-replace payload.
fn variant_rows(product_id: Uuid, inputs: &[VariantInput]) -> Vec<ProductVariant> {
    inputs
        .iter()
        .map(|v| {
            let now = Utc::now();
            ProductVariant {
                id: Uuid::new_v4(),
                variant: v.variant.clone(),
                stock: v.stock.max(0),
                product_id,
                created_at: now,
                updated_at: now,
            }
        })
        .collect()
}

#[async_trait]
impl<P, I, V, C, U> CatalogService for CatalogServiceImpl<P, I, V, C, U>
where
    P: ProductsRepository,
    I: ImagesRepository,
    V: VariantsRepository,
    C: CategoriesRepository,
    U: UsersRepository,
{
    #[instrument(skip(self, form))]
    async fn create_product(
        &self,
        caller: &Caller,
        form: ProductForm,
    ) -> Result<ProductDetail, ServiceError> {
        let name = form
            .name
            .clone()
            .filter(|n| !n.is_empty())
            .ok_or_else(|| ServiceError::Validation("Product name is required".into()))?;
        let price = input::parse_price(
            form.price
                .as_deref()
                .ok_or_else(|| ServiceError::Validation("Invalid price".into()))?,
        )?;

        let mut client = self.db_pool.get().await?;
        let tx = client
            .transaction()
            .await
            .map_err(|e| ServiceError::Unexpected(format!("Begin transaction failed: {e}")))?;

        if self.products_repo.find_by_name(&tx, &name).await?.is_some() {
            return Err(ServiceError::Conflict("Product already exists".into()));
        }

        let category_id = self
            .resolve_category(&tx, form.category_id.as_deref())
            .await?;

        if form.images.is_empty() {
            return Err(ServiceError::Validation("Product image is required".into()));
        }

        let variants_input = match form.variant.as_deref().filter(|s| !s.is_empty()) {
            Some(raw) => input::parse_variants(raw)?,
            None => None,
        };
        if let Some(inputs) = &variants_input {
            input::validate_unique_names(inputs)?;
        }

        let now = Utc::now();
        let product = Product {
            id: Uuid::new_v4(),
            name,
            description: form.description.clone(),
            description_html: form.description.as_deref().map(render_markdown),
            price,
            seller_id: caller.id,
            category_id,
            created_at: now,
            updated_at: now,
        };
        self.products_repo.insert(&tx, &product).await?;

        let mut image_rows = Vec::with_capacity(form.images.len());
        for (idx, upload) in form.images.iter().enumerate() {
            let data = normalize_image(&upload.bytes)?;
            let ts = Utc::now();
            image_rows.push(ProductImage {
                id: Uuid::new_v4(),
                data,
                is_primary: idx == 0,
                product_id: product.id,
                created_at: ts,
                updated_at: ts,
            });
        }
        self.images_repo.insert_many(&tx, &image_rows).await?;

        if let Some(inputs) = &variants_input {
            let rows = variant_rows(product.id, inputs);
            self.variants_repo
                .insert_many(&tx, &rows)
                .await
                .map_err(dup_variant_to_conflict)?;
        }

        let detail = self.detail_for(&tx, product).await?;
        tx.commit()
            .await
            .map_err(|e| ServiceError::Unexpected(format!("Commit failed: {e}")))?;
        Ok(detail)
    }

    #[instrument(skip(self, form))]
    async fn update_product(
        &self,
        caller: &Caller,
        product_id: Uuid,
        form: ProductForm,
    ) -> Result<ProductDetail, ServiceError> {
        let mut client = self.db_pool.get().await?;
        let tx = client
            .transaction()
            .await
            .map_err(|e| ServiceError::Unexpected(format!("Begin transaction failed: {e}")))?;

        let existing = self
            .products_repo
            .find_by_id(&tx, product_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Product not found".into()))?;
        if existing.seller_id != caller.id {
            return Err(ServiceError::Forbidden(
                "Product belongs to another seller".into(),
            ));
        }

        let category_id = self
            .resolve_category(&tx, form.category_id.as_deref())
            .await?;

        // Parse every channel before mutating anything; a malformed payload
        // must abort with nothing applied.
        let variants_input = match form.variant.as_deref().filter(|s| !s.is_empty()) {
            Some(raw) => input::parse_variants(raw)?,
            None => None,
        };
        if let Some(inputs) = &variants_input {
            input::validate_unique_names(inputs)?;
        }
        let variant_updates = match form.variant_updates.as_deref().filter(|s| !s.is_empty()) {
            Some(raw) => input::parse_variant_updates(raw)?,
            None => Vec::new(),
        };
        let remove_variant_ids = match form.remove_variant_ids.as_deref().filter(|s| !s.is_empty())
        {
            Some(raw) => {
                input::parse_id_list(raw, "Invalid removeVariantIds format; expected JSON array of ids")?
            }
            None => Vec::new(),
        };
        let remove_image_ids = match form.remove_image_ids.as_deref().filter(|s| !s.is_empty()) {
            Some(raw) => {
                input::parse_id_list(raw, "Invalid removeImageIds format; expected JSON array of ids")?
            }
            None => Vec::new(),
        };

        // Phase 1: image removal, scoped to this product.
        if !remove_image_ids.is_empty() {
            self.images_repo
                .delete_for_product(&tx, &remove_image_ids, product_id)
                .await?;
        }

        // Channel a wipes first; its replacement rows land after the other
        // channels, so per-id updates observe an empty-then-repopulated set.
        if variants_input.is_some() {
            self.variants_repo
                .delete_all_for_product(&tx, product_id)
                .await?;
        }

        if !variant_updates.is_empty() {
            self.apply_variant_updates(&tx, product_id, &variant_updates)
                .await?;
        }

        if !remove_variant_ids.is_empty() {
            self.variants_repo
                .delete_for_product(&tx, &remove_variant_ids, product_id)
                .await?;
        }

        // Scalar fields; description regenerates its rendered HTML.
        let name = form.name.clone().filter(|n| !n.is_empty());
        let price = match form.price.as_deref() {
            Some(raw) => Some(input::parse_price(raw)?),
            None => None,
        };
        let (description, description_html) = match &form.description {
            Some(text) => (Some(text.clone()), Some(render_markdown(text))),
            None => (existing.description.clone(), existing.description_html.clone()),
        };
        let updated = Product {
            name: name.unwrap_or(existing.name.clone()),
            description,
            description_html,
            price: price.unwrap_or(existing.price),
            category_id: category_id.or(existing.category_id),
            updated_at: Utc::now(),
            ..existing
        };
        self.products_repo.update(&tx, &updated).await?;

        // Phase 2: image addition, always non-primary.
        if !form.images.is_empty() {
            let mut image_rows = Vec::with_capacity(form.images.len());
            for upload in &form.images {
                let data = normalize_image(&upload.bytes)?;
                let ts = Utc::now();
                image_rows.push(ProductImage {
                    id: Uuid::new_v4(),
                    data,
                    is_primary: false,
                    product_id,
                    created_at: ts,
                    updated_at: ts,
                });
            }
            self.images_repo.insert_many(&tx, &image_rows).await?;
        }

        // Channel a repopulation.
        if let Some(inputs) = &variants_input {
            let rows = variant_rows(product_id, inputs);
            self.variants_repo
                .insert_many(&tx, &rows)
                .await
                .map_err(dup_variant_to_conflict)?;
        }

        self.heal_primary_image(&tx, product_id).await?;

        let detail = self.detail_for(&tx, updated).await?;
        tx.commit()
            .await
            .map_err(|e| ServiceError::Unexpected(format!("Commit failed: {e}")))?;
        Ok(detail)
    }

    #[instrument(skip(self))]
    async fn delete_product(
        &self,
        caller: &Caller,
        product_id: Uuid,
    ) -> Result<ProductDetail, ServiceError> {
        let mut client = self.db_pool.get().await?;
        let tx = client
            .transaction()
            .await
            .map_err(|e| ServiceError::Unexpected(format!("Begin transaction failed: {e}")))?;

        let product = self
            .products_repo
            .find_by_id(&tx, product_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Product not found".into()))?;
        if product.seller_id != caller.id {
            return Err(ServiceError::Forbidden(
                "Product belongs to another seller".into(),
            ));
        }

        let snapshot = self.detail_for(&tx, product).await?;
        self.products_repo.delete(&tx, product_id).await?;

        tx.commit()
            .await
            .map_err(|e| ServiceError::Unexpected(format!("Commit failed: {e}")))?;
        Ok(snapshot)
    }

    #[instrument(skip(self))]
    async fn list_products(&self, query: ProductListQuery) -> Result<ProductPage, ServiceError> {
        let paging = Paging::new(query.page, query.limit);
        let sort = parse_sort(query.sort.as_deref());
        let filter = ProductFilter {
            name: query.name.clone().filter(|n| !n.is_empty()),
            category_id: query.category_id,
            min_price: query.min_price,
            max_price: query.max_price,
        };

        let mut client = self.db_pool.get().await?;
        let tx = client
            .transaction()
            .await
            .map_err(|e| ServiceError::Unexpected(format!("Begin transaction failed: {e}")))?;

        let total = self.products_repo.count(&tx, &filter).await?;
        let products = self
            .products_repo
            .list(&tx, &filter, sort, paging.limit, paging.offset())
            .await?;
        let relations = load_product_relations(
            &tx,
            products,
            &self.images_repo,
            &self.variants_repo,
            &self.categories_repo,
            &self.users_repo,
        )
        .await?;
        tx.commit()
            .await
            .map_err(|e| ServiceError::Unexpected(format!("Commit failed: {e}")))?;

        Ok(ProductPage {
            products: relations
                .iter()
                .map(|rel| sanitize_list(rel, &self.base_url))
                .collect(),
            total,
            page: paging.page,
            total_pages: paging.total_pages(total),
        })
    }

    #[instrument(skip(self))]
    async fn get_product(&self, id: Uuid) -> Result<ProductDetail, ServiceError> {
        let mut client = self.db_pool.get().await?;
        let tx = client
            .transaction()
            .await
            .map_err(|e| ServiceError::Unexpected(format!("Begin transaction failed: {e}")))?;

        let product = self
            .products_repo
            .find_by_id(&tx, id)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Product not found".into()))?;
        let detail = self.detail_for(&tx, product).await?;

        tx.commit()
            .await
            .map_err(|e| ServiceError::Unexpected(format!("Commit failed: {e}")))?;
        Ok(detail)
    }

    #[instrument(skip(self))]
    async fn render_image(&self, id: Uuid) -> Result<RenderedImage, ServiceError> {
        let mut client = self.db_pool.get().await?;
        let tx = client
            .transaction()
            .await
            .map_err(|e| ServiceError::Unexpected(format!("Begin transaction failed: {e}")))?;

        // Image id first; on miss, treat the input as a product id.
        let image = match self.images_repo.find_with_data(&tx, id).await? {
            Some(image) => image,
            None => self
                .images_repo
                .primary_with_data(&tx, id)
                .await?
                .ok_or_else(|| ServiceError::NotFound("Image not found".into()))?,
        };

        tx.commit()
            .await
            .map_err(|e| ServiceError::Unexpected(format!("Commit failed: {e}")))?;

        Ok(RenderedImage {
            bytes: image.data,
            updated_at: image.updated_at,
            content_type: IMAGE_CONTENT_TYPE,
        })
    }
}
