//! Category API handlers. Mutations are seller-gated; listing is public.

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
pub struct ListParams {
    page: Option<i64>,
    limit: Option<i64>,
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct NamePayload {
    name: Option<String>,
}

/// GET /api/categories
pub async fn list(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let page = state
        .categories
        .list(params.name, params.page, params.limit)
        .await?;
    Ok(Json(json!({
        "message": "Get categories success",
        "categories": page.categories,
        "total": page.total,
        "page": page.page,
        "totalPages": page.total_pages,
    })))
}

/// POST /api/categories
pub async fn create(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(payload): Json<NamePayload>,
) -> Result<(StatusCode, Json<serde_json::Value>), ApiError> {
    user.require_seller()?;
    let name = payload
        .name
        .ok_or_else(|| ApiError::validation("Category name is required"))?;
    let category = state.categories.create(name).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "create category success", "category": category })),
    ))
}

/// PATCH /api/categories/{id}
pub async fn edit(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<NamePayload>,
) -> Result<Json<serde_json::Value>, ApiError> {
    user.require_seller()?;
    let name = payload
        .name
        .ok_or_else(|| ApiError::validation("Category name is required"))?;
    let category = state.categories.edit(id, name).await?;
    Ok(Json(json!({ "message": "update category success", "category": category })))
}

/// DELETE /api/categories/{id}
pub async fn delete(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, ApiError> {
    user.require_seller()?;
    state.categories.delete(id).await?;
    Ok(Json(json!({ "message": "Category deleted successfully" })))
}
