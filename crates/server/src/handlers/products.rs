//! Product API handlers.
//!
//! Create and update consume a multipart form: scalar fields plus the
//! JSON-encoded variant/image channels as text parts and up to five
//! `image` file parts. The image endpoint supports conditional GET so
//! browsers can cache product pictures aggressively.

use axum::Json;
use axum::body::Body;
use axum::extract::{Multipart, Path, Query, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;
use service::{ProductForm, ProductListQuery, RenderedImage, UploadedImage};
use uuid::Uuid;

use crate::auth::CurrentUser;
use crate::error::ApiError;
use crate::state::AppState;

/// Per-file upload ceiling (matches the upload boundary contract).
const MAX_IMAGE_BYTES: usize = 1024 * 1024;
/// Maximum number of image files per request.
const MAX_IMAGE_FILES: usize = 5;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListParams {
    page: Option<i64>,
    limit: Option<i64>,
    name: Option<String>,
    category_id: Option<Uuid>,
    min_price: Option<String>,
    max_price: Option<String>,
    sort: Option<String>,
}

fn parse_price_param(raw: Option<&str>) -> Result<Option<Decimal>, ApiError> {
    match raw.filter(|s| !s.is_empty()) {
        Some(s) => s
            .parse()
            .map(Some)
            .map_err(|_| ApiError::validation("Invalid price")),
        None => Ok(None),
    }
}

/// GET /api/products
pub async fn list(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let query = ProductListQuery {
        page: params.page,
        limit: params.limit,
        name: params.name,
        category_id: params.category_id,
        min_price: parse_price_param(params.min_price.as_deref())?,
        max_price: parse_price_param(params.max_price.as_deref())?,
        sort: params.sort,
    };
    let page = state.catalog.list_products(query).await?;
    Ok(Json(json!({
        "message": "Get products success",
        "products": page.products,
        "total": page.total,
        "page": page.page,
        "totalPages": page.total_pages,
    })))
}

/// GET /api/products/{id}
pub async fn get_by_id(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let product = state.catalog.get_product(id).await?;
    Ok(Json(json!({
        "message": "Get product success",
        "product": product,
    })))
}

/// POST /api/products
pub async fn create(
    State(state): State<AppState>,
    user: CurrentUser,
    multipart: Multipart,
) -> Result<(StatusCode, Json<serde_json::Value>), ApiError> {
    user.require_seller()?;
    let form = collect_product_form(multipart).await?;
    let product = state.catalog.create_product(&user.caller(), form).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "create product success", "product": product })),
    ))
}

/// PATCH /api/products/{id}
pub async fn update(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
    multipart: Multipart,
) -> Result<Json<serde_json::Value>, ApiError> {
    user.require_seller()?;
    let form = collect_product_form(multipart).await?;
    let product = state
        .catalog
        .update_product(&user.caller(), id, form)
        .await?;
    Ok(Json(json!({ "message": "update product success", "product": product })))
}

/// DELETE /api/products/{id}
pub async fn delete(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, ApiError> {
    user.require_seller()?;
    let product = state.catalog.delete_product(&user.caller(), id).await?;
    Ok(Json(json!({ "message": "delete product success", "product": product })))
}

/// GET /api/products/image/{id}
///
/// Accepts either an image id or a product id (primary-image fallback).
pub async fn render_image(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let image = state.catalog.render_image(id).await?;
    let etag = etag_for(&image);
    let last_modified = image
        .updated_at
        .format("%a, %d %b %Y %H:%M:%S GMT")
        .to_string();

    let not_modified = headers
        .get(header::IF_NONE_MATCH)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == etag);

    let builder = Response::builder()
        .header(header::ETAG, &etag)
        .header(header::LAST_MODIFIED, &last_modified)
        .header(
            header::CACHE_CONTROL,
            "public, max-age=3600, stale-while-revalidate=86400",
        );

    let result = if not_modified {
        builder
            .status(StatusCode::NOT_MODIFIED)
            .body(Body::empty())
    } else {
        builder
            .status(StatusCode::OK)
            .header(header::CONTENT_TYPE, image.content_type)
            .body(Body::from(image.bytes))
    };

    Ok(result.unwrap_or_else(|_| {
        (StatusCode::INTERNAL_SERVER_ERROR, "Failed to create response").into_response()
    }))
}

/// ETag contract: the image row's update time in epoch milliseconds.
fn etag_for(image: &RenderedImage) -> String {
    format!("\"{}\"", image.updated_at.timestamp_millis())
}

/// Collects the multipart form into a [`ProductForm`], enforcing the
/// upload boundary limits (image MIME type, size ceiling, file count).
async fn collect_product_form(mut multipart: Multipart) -> Result<ProductForm, ApiError> {
    let mut form = ProductForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::validation(format!("Invalid multipart request: {e}")))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "image" => {
                let mime = field.content_type().unwrap_or_default().to_string();
                if !mime.starts_with("image/") {
                    return Err(ApiError::validation("Only image files are allowed"));
                }
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::validation(format!("Multipart error: {e}")))?;
                if bytes.len() > MAX_IMAGE_BYTES {
                    return Err(ApiError::validation("File too large"));
                }
                if form.images.len() >= MAX_IMAGE_FILES {
                    return Err(ApiError::validation("Too many image files"));
                }
                form.images.push(UploadedImage {
                    bytes: bytes.to_vec(),
                    mime_type: mime,
                });
            }
            other => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| ApiError::validation(format!("Multipart error: {e}")))?;
                match other {
                    "name" => form.name = Some(value),
                    "description" => form.description = Some(value),
                    "price" => form.price = Some(value),
                    "categoryId" => form.category_id = Some(value),
                    "variant" => form.variant = Some(value),
                    "variantUpdates" => form.variant_updates = Some(value),
                    "removeVariantIds" => form.remove_variant_ids = Some(value),
                    "removeImageIds" => form.remove_image_ids = Some(value),
                    _ => {}
                }
            }
        }
    }

    Ok(form)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_etag_is_quoted_epoch_millis() {
        let updated_at = chrono::Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let image = RenderedImage {
            bytes: vec![1, 2, 3],
            updated_at,
            content_type: "image/png",
        };
        assert_eq!(etag_for(&image), format!("\"{}\"", updated_at.timestamp_millis()));
    }

    #[test]
    fn test_parse_price_param() {
        assert_eq!(parse_price_param(None).unwrap(), None);
        assert_eq!(parse_price_param(Some("")).unwrap(), None);
        assert_eq!(
            parse_price_param(Some("19.90")).unwrap(),
            Some("19.90".parse().unwrap())
        );
        assert!(parse_price_param(Some("abc")).is_err());
    }
}
