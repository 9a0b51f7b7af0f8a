//! Cart API handlers. All routes are buyer-gated.

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use serde::Deserialize;
use serde_json::json;
use service::{CartCreateInput, CartUpdateInput};
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
pub struct CreatePayload {
    product_id: Option<Uuid>,
    variant_id: Option<Uuid>,
    quantity: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct UpdatePayload {
    quantity: Option<f64>,
    delta: Option<f64>,
}

/// GET /api/carts
pub async fn list(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(params): Query<PageParams>,
) -> Result<Json<serde_json::Value>, ApiError> {
    user.require_buyer()?;
    let page = state
        .carts
        .list(&user.caller(), params.page, params.limit)
        .await?;
    Ok(Json(json!({
        "message": "Get carts success",
        "carts": page.carts,
        "total": page.total,
        "page": page.page,
        "totalPages": page.total_pages,
    })))
}

/// POST /api/carts
pub async fn create(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(payload): Json<CreatePayload>,
) -> Result<(StatusCode, Json<serde_json::Value>), ApiError> {
    user.require_buyer()?;
    let product_id = payload
        .product_id
        .ok_or_else(|| ApiError::validation("productId is required"))?;
    let cart = state
        .carts
        .create(
            &user.caller(),
            product_id,
            CartCreateInput {
                variant_id: payload.variant_id,
                quantity: payload.quantity,
            },
        )
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "create cart success", "cart": cart })),
    ))
}

/// PATCH /api/carts/{id}
pub async fn update(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdatePayload>,
) -> Result<Json<serde_json::Value>, ApiError> {
    user.require_buyer()?;
    let cart = state
        .carts
        .update(
            &user.caller(),
            id,
            CartUpdateInput {
                quantity: payload.quantity,
                delta: payload.delta,
            },
        )
        .await?;
    Ok(Json(json!({ "message": "update cart success", "cart": cart })))
}

/// DELETE /api/carts/{id}
pub async fn delete(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, ApiError> {
    user.require_buyer()?;
    let cart = state.carts.delete(&user.caller(), id).await?;
    Ok(Json(json!({ "message": "delete cart success", "cart": cart })))
}
