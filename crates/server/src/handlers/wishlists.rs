//! Wishlist API handlers. All routes are buyer-gated.

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::auth::CurrentUser;
use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct PageParams {
    page: Option<i64>,
    limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinePayload {
    product_id: Option<Uuid>,
    variant_id: Option<Uuid>,
}

/// GET /api/wishlists
pub async fn list(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(params): Query<PageParams>,
) -> Result<Json<serde_json::Value>, ApiError> {
    user.require_buyer()?;
    let page = state
        .wishlists
        .list(&user.caller(), params.page, params.limit)
        .await?;
    Ok(Json(json!({
        "message": "Get wishlists success",
        "wishlists": page.wishlists,
        "total": page.total,
        "page": page.page,
        "totalPages": page.total_pages,
    })))
}

/// POST /api/wishlists
pub async fn create(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(payload): Json<LinePayload>,
) -> Result<(StatusCode, Json<serde_json::Value>), ApiError> {
    user.require_buyer()?;
    let product_id = payload
        .product_id
        .ok_or_else(|| ApiError::validation("productId is required"))?;
    let wishlist = state
        .wishlists
        .create(&user.caller(), product_id, payload.variant_id)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "create wishlist success", "wishlist": wishlist })),
    ))
}

/// POST /api/wishlists/toggle
///
/// The idempotent add-if-absent/remove-if-present primitive.
pub async fn toggle(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(payload): Json<LinePayload>,
) -> Result<Json<serde_json::Value>, ApiError> {
    user.require_buyer()?;
    let product_id = payload
        .product_id
        .ok_or_else(|| ApiError::validation("productId is required"))?;
    let result = state
        .wishlists
        .toggle(&user.caller(), product_id, payload.variant_id)
        .await?;
    Ok(Json(json!({
        "message": "toggle wishlist success",
        "action": result.action,
        "wishlist": result.wishlist,
    })))
}

/// DELETE /api/wishlists/{id}
pub async fn delete(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, ApiError> {
    user.require_buyer()?;
    let wishlist = state.wishlists.delete(&user.caller(), id).await?;
    Ok(Json(json!({ "message": "delete wishlist success", "wishlist": wishlist })))
}
