//! Public-safe product projections.
//!
//! Two shapes exist: `detail` (all images, all variants, both description
//! fields) and `list` (one image, no descriptions, no variant list). Both
//! strip binary payloads, inject the derived stock aggregate, and replace
//! each image with metadata plus a deterministic `imageUrl`.

use chrono::{DateTime, Utc};
use model::{
    Category, Product, ProductImageMeta, ProductVariant, SellerInfo, StockStatus, stock_summary,
};
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

/// A product together with the relations its projections need.
#[derive(Debug, Clone)]
pub struct ProductRelations {
    pub product: Product,
    pub images: Vec<ProductImageMeta>,
    pub variants: Vec<ProductVariant>,
    pub category: Option<Category>,
    pub seller: Option<SellerInfo>,
}

/// Image metadata with the derived URL in place of the payload.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ImageView {
    pub id: Uuid,
    pub is_primary: bool,
    pub product_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub image_url: String,
}

/// Detail projection: everything the product page needs.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductDetail {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub description_html: Option<String>,
    pub price: Decimal,
    pub seller_id: Uuid,
    pub seller: Option<SellerInfo>,
    pub category_id: Option<Uuid>,
    #[serde(rename = "Category")]
    pub category: Option<Category>,
    #[serde(rename = "Images")]
    pub images: Vec<ImageView>,
    #[serde(rename = "Variants")]
    pub variants: Vec<ProductVariant>,
    pub stock_total: i64,
    pub stock_status: StockStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// List projection: one image, no description fields, no variant list.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductListItem {
    pub id: Uuid,
    pub name: String,
    pub price: Decimal,
    pub seller_id: Uuid,
    pub seller: Option<SellerInfo>,
    pub category_id: Option<Uuid>,
    #[serde(rename = "Category")]
    pub category: Option<Category>,
    #[serde(rename = "Images")]
    pub images: Vec<ImageView>,
    pub stock_total: i64,
    pub stock_status: StockStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn image_url(base_url: &str, image_id: Uuid) -> String {
    format!("{}/products/image/{image_id}", base_url.trim_end_matches('/'))
}

fn to_view(meta: &ProductImageMeta, base_url: &str) -> ImageView {
    ImageView {
        id: meta.id,
        is_primary: meta.is_primary,
        product_id: meta.product_id,
        created_at: meta.created_at,
        updated_at: meta.updated_at,
        image_url: image_url(base_url, meta.id),
    }
}

/// The primary image, or the first available if none is flagged.
fn lead_image<'a>(images: &'a [ProductImageMeta]) -> Option<&'a ProductImageMeta> {
    images
        .iter()
        .min_by_key(|img| (!img.is_primary, img.created_at))
}

/// Full projection for the product page and mutation responses.
pub fn sanitize_detail(rel: &ProductRelations, base_url: &str) -> ProductDetail {
    let (stock_total, stock_status) = stock_summary(rel.variants.iter().map(|v| v.stock));
    ProductDetail {
        id: rel.product.id,
        name: rel.product.name.clone(),
        description: rel.product.description.clone(),
        description_html: rel.product.description_html.clone(),
        price: rel.product.price,
        seller_id: rel.product.seller_id,
        seller: rel.seller.clone(),
        category_id: rel.product.category_id,
        category: rel.category.clone(),
        images: rel.images.iter().map(|m| to_view(m, base_url)).collect(),
        variants: rel.variants.clone(),
        stock_total,
        stock_status,
        created_at: rel.product.created_at,
        updated_at: rel.product.updated_at,
    }
}

/// Single-image projection for listings and line items.
pub fn sanitize_list(rel: &ProductRelations, base_url: &str) -> ProductListItem {
    let (stock_total, stock_status) = stock_summary(rel.variants.iter().map(|v| v.stock));
    ProductListItem {
        id: rel.product.id,
        name: rel.product.name.clone(),
        price: rel.product.price,
        seller_id: rel.product.seller_id,
        seller: rel.seller.clone(),
        category_id: rel.product.category_id,
        category: rel.category.clone(),
        images: lead_image(&rel.images)
            .map(|m| vec![to_view(m, base_url)])
            .unwrap_or_default(),
        stock_total,
        stock_status,
        created_at: rel.product.created_at,
        updated_at: rel.product.updated_at,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn meta(id: u128, is_primary: bool, minute: u32) -> ProductImageMeta {
        let ts = Utc.with_ymd_and_hms(2024, 5, 1, 12, minute, 0).unwrap();
        ProductImageMeta {
            id: Uuid::from_u128(id),
            is_primary,
            product_id: Uuid::from_u128(77),
            created_at: ts,
            updated_at: ts,
        }
    }

    fn variant(name: &str, stock: i32) -> ProductVariant {
        let ts = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        ProductVariant {
            id: Uuid::new_v4(),
            variant: name.into(),
            stock,
            product_id: Uuid::from_u128(77),
            created_at: ts,
            updated_at: ts,
        }
    }

    fn relations(images: Vec<ProductImageMeta>, variants: Vec<ProductVariant>) -> ProductRelations {
        let ts = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        ProductRelations {
            product: Product {
                id: Uuid::from_u128(77),
                name: "Runner".into(),
                description: Some("desc".into()),
                description_html: Some("<p>desc</p>".into()),
                price: Decimal::from(100000),
                seller_id: Uuid::from_u128(5),
                category_id: None,
                created_at: ts,
                updated_at: ts,
            },
            images,
            variants,
            category: None,
            seller: Some(SellerInfo {
                id: Uuid::from_u128(5),
                name: "Seller".into(),
            }),
        }
    }

    #[test]
    fn test_detail_projection_injects_stock_and_urls() {
        let rel = relations(
            vec![meta(1, true, 0), meta(2, false, 1)],
            vec![variant("42", 2), variant("43", 1)],
        );
        let detail = sanitize_detail(&rel, "http://localhost:8000/api/");
        assert_eq!(detail.stock_total, 3);
        assert_eq!(detail.stock_status, StockStatus::LowStock);
        assert_eq!(detail.images.len(), 2);
        assert_eq!(
            detail.images[0].image_url,
            format!("http://localhost:8000/api/products/image/{}", Uuid::from_u128(1))
        );
        assert_eq!(detail.variants.len(), 2);
    }

    #[test]
    fn test_list_projection_picks_primary_image() {
        let rel = relations(vec![meta(1, false, 0), meta(2, true, 1)], vec![]);
        let item = sanitize_list(&rel, "http://localhost:8000/api");
        assert_eq!(item.images.len(), 1);
        assert_eq!(item.images[0].id, Uuid::from_u128(2));
        assert_eq!(item.stock_status, StockStatus::OutOfStock);
    }

    #[test]
    fn test_list_projection_falls_back_to_oldest_image() {
        let rel = relations(vec![meta(3, false, 5), meta(1, false, 2)], vec![]);
        let item = sanitize_list(&rel, "http://localhost:8000/api");
        assert_eq!(item.images[0].id, Uuid::from_u128(1));
    }

    #[test]
    fn test_list_projection_without_images() {
        let rel = relations(vec![], vec![variant("42", 9)]);
        let item = sanitize_list(&rel, "base");
        assert!(item.images.is_empty());
        assert_eq!(item.stock_status, StockStatus::InStock);
    }

    #[test]
    fn test_detail_serializes_without_binary_fields() {
        let rel = relations(vec![meta(1, true, 0)], vec![]);
        let json = serde_json::to_value(sanitize_detail(&rel, "base")).unwrap();
        assert!(json.get("data").is_none());
        assert!(json["Images"][0].get("data").is_none());
        assert_eq!(json["stockStatus"], "OUT_OF_STOCK");
        assert!(json["Images"][0]["imageUrl"].as_str().is_some());
    }
}
