use chrono::{DateTime, Utc};
use postgres_types::{FromSql, ToSql};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Role — уровень доступа пользователя.
///
/// Buyers own cart/wishlist lines; sellers own products.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSql, FromSql)]
#[postgres(name = "user_role")]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[postgres(name = "buyer")]
    Buyer,
    #[postgres(name = "seller")]
    Seller,
}

/// User — аккаунт покупателя или продавца.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub username: String,
    pub email: String,
    /// Bcrypt hash; never serialized into responses.
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Public projection of a product's seller.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SellerInfo {
    pub id: Uuid,
    pub name: String,
}

/// Category — группа товаров.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: Uuid,
    pub name: String,
}

/// Product — основной агрегат каталога.
///
/// Owned by exactly one seller, optionally linked to a category. Images and
/// variants are held in separate tables and cascade with the product.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub description_html: Option<String>,
    pub price: Decimal,
    pub seller_id: Uuid,
    pub category_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// ProductImage — image row including its binary payload.
///
/// Only the image-render path loads this; everything else works with
/// [`ProductImageMeta`] so binary data never leaks into API payloads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductImage {
    pub id: Uuid,
    pub data: Vec<u8>,
    pub is_primary: bool,
    pub product_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Image metadata without the binary payload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ProductImageMeta {
    pub id: Uuid,
    pub is_primary: bool,
    pub product_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// ProductVariant — stock-bearing variation of a product.
///
/// Variant names are unique per product (case-sensitive, trimmed).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ProductVariant {
    pub id: Uuid,
    pub variant: String,
    pub stock: i32,
    pub product_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// CartLine — a user's cart entry for a product (and optional variant).
///
/// At most one line exists per `(user, product, variant)` triple; duplicate
/// creates merge quantities instead of inserting.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    pub id: Uuid,
    pub user_id: Uuid,
    pub product_id: Uuid,
    pub variant_id: Option<Uuid>,
    pub quantity: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// WishlistLine — a user's wishlist entry.
///
/// Duplicate `(user, product, variant)` triples are rejected, not merged.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct WishlistLine {
    pub id: Uuid,
    pub user_id: Uuid,
    pub product_id: Uuid,
    pub variant_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Order — present in the schema, never mutated by any exposed operation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: Uuid,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// OrderItem — present in the schema, never mutated by any exposed operation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub id: Uuid,
    pub order_id: Uuid,
    pub product_id: Uuid,
    pub variant_id: Option<Uuid>,
    pub quantity: i32,
    pub price: Decimal,
}

/// Derived three-valued stock classification. Computed on every read,
/// never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StockStatus {
    InStock,
    LowStock,
    OutOfStock,
}

/// Threshold below which a positive total counts as low stock.
const LOW_STOCK_THRESHOLD: i64 = 5;

impl StockStatus {
    /// Classifies a summed stock total.
    pub fn from_total(total: i64) -> Self {
        if total <= 0 {
            StockStatus::OutOfStock
        } else if total < LOW_STOCK_THRESHOLD {
            StockStatus::LowStock
        } else {
            StockStatus::InStock
        }
    }
}

/// Sums variant stock values and classifies the total.
///
/// Accepts any iterator of per-variant stock counts so both full
/// [`ProductVariant`] rows and stock-only projections can feed it.
pub fn stock_summary<I>(stocks: I) -> (i64, StockStatus)
where
    I: IntoIterator<Item = i32>,
{
    let total: i64 = stocks.into_iter().map(i64::from).sum();
    (total, StockStatus::from_total(total))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_stock_summary_empty_is_out_of_stock() {
        let (total, status) = stock_summary([]);
        assert_eq!(total, 0);
        assert_eq!(status, StockStatus::OutOfStock);
    }

    #[test]
    fn test_stock_summary_all_zero_is_out_of_stock() {
        let (total, status) = stock_summary([0, 0]);
        assert_eq!(total, 0);
        assert_eq!(status, StockStatus::OutOfStock);
    }

    #[test]
    fn test_stock_summary_below_threshold_is_low_stock() {
        let (total, status) = stock_summary([2, 1]);
        assert_eq!(total, 3);
        assert_eq!(status, StockStatus::LowStock);
    }

    #[test]
    fn test_stock_summary_at_threshold_is_in_stock() {
        let (total, status) = stock_summary([3, 2]);
        assert_eq!(total, 5);
        assert_eq!(status, StockStatus::InStock);
    }

    #[test]
    fn test_stock_summary_above_threshold_is_in_stock() {
        let (total, status) = stock_summary([3, 4]);
        assert_eq!(total, 7);
        assert_eq!(status, StockStatus::InStock);
    }

    #[test]
    fn test_stock_status_boundary_values() {
        assert_eq!(StockStatus::from_total(-1), StockStatus::OutOfStock);
        assert_eq!(StockStatus::from_total(0), StockStatus::OutOfStock);
        assert_eq!(StockStatus::from_total(1), StockStatus::LowStock);
        assert_eq!(StockStatus::from_total(4), StockStatus::LowStock);
        assert_eq!(StockStatus::from_total(5), StockStatus::InStock);
    }

    #[test]
    fn test_stock_status_serializes_screaming_snake() {
        assert_eq!(
            serde_json::to_string(&StockStatus::OutOfStock).unwrap(),
            "\"OUT_OF_STOCK\""
        );
        assert_eq!(
            serde_json::to_string(&StockStatus::LowStock).unwrap(),
            "\"LOW_STOCK\""
        );
        assert_eq!(
            serde_json::to_string(&StockStatus::InStock).unwrap(),
            "\"IN_STOCK\""
        );
    }

    #[test]
    fn test_serialize_cart_line_camel_case() {
        let line = CartLine {
            id: Uuid::nil(),
            user_id: Uuid::nil(),
            product_id: Uuid::nil(),
            variant_id: None,
            quantity: 2,
            created_at: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
            updated_at: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
        };
        let json = serde_json::to_value(&line).unwrap();
        assert_eq!(json["productId"], json["userId"]);
        assert!(json.get("variantId").is_some());
        assert_eq!(json["quantity"], 2);
    }

    #[test]
    fn test_user_password_hash_not_serialized() {
        let user = User {
            id: Uuid::nil(),
            name: "Test".into(),
            username: "test".into(),
            email: "test@example.com".into(),
            password_hash: "secret".into(),
            role: Role::Buyer,
            created_at: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
            updated_at: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
        };
        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("passwordHash").is_none());
        assert_eq!(json["role"], "buyer");
    }
}
