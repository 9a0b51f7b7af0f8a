//! Batched relation loading for product projections.
//!
//! A page of products needs images, variants, categories and seller
//! projections; loading them per product would issue O(page) queries.
//! Everything here loads per relation instead and regroups in memory.

use std::collections::HashMap;

use model::Product;
use repository::{
    CategoriesRepository, ImagesRepository, ProductsRepository, UsersRepository,
    VariantsRepository,
};
use tokio_postgres::Transaction;
use uuid::Uuid;

use crate::ServiceError;
use crate::sanitize::{ProductListItem, ProductRelations, sanitize_list};

/// Loads the relations of every given product inside one transaction
/// snapshot, preserving the input order.
pub(crate) async fn load_product_relations<I, V, C, U>(
    tx: &Transaction<'_>,
    products: Vec<Product>,
    images_repo: &I,
    variants_repo: &V,
    categories_repo: &C,
    users_repo: &U,
) -> Result<Vec<ProductRelations>, ServiceError>
where
    I: ImagesRepository,
    V: VariantsRepository,
    C: CategoriesRepository,
    U: UsersRepository,
{
    if products.is_empty() {
        return Ok(Vec::new());
    }

    let product_ids: Vec<Uuid> = products.iter().map(|p| p.id).collect();
    let category_ids: Vec<Uuid> = products.iter().filter_map(|p| p.category_id).collect();
    let seller_ids: Vec<Uuid> = products.iter().map(|p| p.seller_id).collect();

    let mut images_by_product: HashMap<Uuid, Vec<_>> = HashMap::new();
    for meta in images_repo.meta_for_products(tx, &product_ids).await? {
        images_by_product.entry(meta.product_id).or_default().push(meta);
    }

    let mut variants_by_product: HashMap<Uuid, Vec<_>> = HashMap::new();
    for variant in variants_repo.for_products(tx, &product_ids).await? {
        variants_by_product
            .entry(variant.product_id)
            .or_default()
            .push(variant);
    }

    let categories: HashMap<Uuid, _> = categories_repo
        .find_by_ids(tx, &category_ids)
        .await?
        .into_iter()
        .map(|c| (c.id, c))
        .collect();

    let sellers: HashMap<Uuid, _> = users_repo
        .seller_infos(tx, &seller_ids)
        .await?
        .into_iter()
        .map(|s| (s.id, s))
        .collect();

    Ok(products
        .into_iter()
        .map(|product| {
            let images = images_by_product.remove(&product.id).unwrap_or_default();
            let variants = variants_by_product.remove(&product.id).unwrap_or_default();
            let category = product.category_id.and_then(|id| categories.get(&id).cloned());
            let seller = sellers.get(&product.seller_id).cloned();
            ProductRelations {
                product,
                images,
                variants,
                category,
                seller,
            }
        })
        .collect())
}

/// List projections for a set of product ids, keyed by id. Products that
/// no longer exist are simply absent from the map.
#[allow(clippy::too_many_arguments)]
pub(crate) async fn load_list_items<P, I, V, C, U>(
    tx: &Transaction<'_>,
    product_ids: &[Uuid],
    products_repo: &P,
    images_repo: &I,
    variants_repo: &V,
    categories_repo: &C,
    users_repo: &U,
    base_url: &str,
) -> Result<HashMap<Uuid, ProductListItem>, ServiceError>
where
    P: ProductsRepository,
    I: ImagesRepository,
    V: VariantsRepository,
    C: CategoriesRepository,
    U: UsersRepository,
{
    let products = products_repo.find_by_ids(tx, product_ids).await?;
    let relations = load_product_relations(
        tx,
        products,
        images_repo,
        variants_repo,
        categories_repo,
        users_repo,
    )
    .await?;
    Ok(relations
        .iter()
        .map(|rel| (rel.product.id, sanitize_list(rel, base_url)))
        .collect())
}
