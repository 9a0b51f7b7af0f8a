//! User API handlers: registration and login.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use model::Role;
use serde::Deserialize;
use serde_json::json;
use service::RegisterInput;

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct RegisterPayload {
    name: Option<String>,
    username: String,
    email: String,
    password: String,
    role: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginPayload {
    username: String,
    password: String,
}

/// POST /api/users/register
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterPayload>,
) -> Result<(StatusCode, Json<serde_json::Value>), ApiError> {
    let role = match payload.role.as_str() {
        "buyer" => Role::Buyer,
        "seller" => Role::Seller,
        _ => return Err(ApiError::validation("Invalid role")),
    };
    let user = state
        .users
        .register(RegisterInput {
            name: payload.name.unwrap_or_default(),
            username: payload.username,
            email: payload.email,
            password: payload.password,
            role,
        })
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "create user success", "user": user })),
    ))
}

/// POST /api/users/login
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginPayload>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let user = state
        .users
        .login(&payload.username, &payload.password)
        .await?;
    let tokens = state.auth.issue_pair(&user)?;
    Ok(Json(json!({
        "message": "Login success",
        "access_token": tokens.access_token,
        "refresh_token": tokens.refresh_token,
    })))
}
