//! HTTP mapping of service errors.
//!
//! Every error kind maps to exactly one status code; anything outside the
//! taxonomy becomes a 500 whose body never leaks the underlying cause.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use service::ServiceError;

/// Response-side wrapper around [`ServiceError`].
#[derive(Debug)]
pub struct ApiError(pub ServiceError);

impl ApiError {
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self(ServiceError::Unauthorized(message.into()))
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self(ServiceError::Forbidden(message.into()))
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self(ServiceError::Validation(message.into()))
    }
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        Self(err)
    }
}

/// Status code for a service error kind.
pub fn status_for(err: &ServiceError) -> StatusCode {
    match err {
        ServiceError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
        ServiceError::Forbidden(_) => StatusCode::FORBIDDEN,
        ServiceError::Validation(_) => StatusCode::BAD_REQUEST,
        ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
        ServiceError::Conflict(_) => StatusCode::CONFLICT,
        ServiceError::Db(_) | ServiceError::Pool(_) | ServiceError::Unexpected(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = status_for(&self.0);
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            // Log the real cause, never disclose it.
            tracing::error!(error = %self.0, "Internal server error");
            "Internal server error".to_string()
        } else {
            self.0.to_string()
        };
        (status, Json(json!({ "message": message }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            status_for(&ServiceError::Unauthorized("x".into())),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            status_for(&ServiceError::Forbidden("x".into())),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            status_for(&ServiceError::Validation("x".into())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_for(&ServiceError::NotFound("x".into())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_for(&ServiceError::Conflict("x".into())),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_for(&ServiceError::Unexpected("x".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_internal_error_body_does_not_leak() {
        let response =
            ApiError(ServiceError::Unexpected("secret dsn".into())).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
