//! JWT authentication for the HTTP boundary.
//!
//! Issues HS256 access/refresh token pairs on login and validates bearer
//! tokens on protected routes. Handlers receive a [`CurrentUser`] through
//! its extractor; the services never see raw credentials.

use axum::extract::FromRequestParts;
use axum::http::{header, request::Parts};
use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use model::{Role, User};
use serde::{Deserialize, Serialize};
use service::Caller;
use std::time::Duration;
use uuid::Uuid;

use crate::error::ApiError;
use crate::state::AppState;

const ACCESS_TOKEN: &str = "access_token";
const REFRESH_TOKEN: &str = "refresh_token";

/// JWT claims stored in both token kinds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User id (subject).
    pub sub: Uuid,
    pub role: Role,
    /// "access_token" or "refresh_token".
    pub token_type: String,
    /// Expiration timestamp.
    pub exp: i64,
    /// Issued-at timestamp.
    pub iat: i64,
}

/// Access/refresh pair returned by login.
#[derive(Debug, Clone, Serialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Token signing and validation keys plus lifetimes.
pub struct AuthKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl AuthKeys {
    pub fn new(secret: &str, access_ttl: Duration, refresh_ttl: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            access_ttl,
            refresh_ttl,
        }
    }

    fn issue(&self, user: &User, token_type: &str, ttl: Duration) -> Result<String, ApiError> {
        let now = Utc::now();
        let ttl = chrono::Duration::from_std(ttl)
            .unwrap_or_else(|_| chrono::Duration::hours(24));
        let claims = Claims {
            sub: user.id,
            role: user.role,
            token_type: token_type.to_string(),
            exp: (now + ttl).timestamp(),
            iat: now.timestamp(),
        };
        encode(&Header::default(), &claims, &self.encoding).map_err(|e| {
            ApiError(service::ServiceError::Unexpected(format!(
                "Token generation failed: {e}"
            )))
        })
    }

    /// Issues the access/refresh pair for a freshly authenticated user.
    pub fn issue_pair(&self, user: &User) -> Result<TokenPair, ApiError> {
        Ok(TokenPair {
            access_token: self.issue(user, ACCESS_TOKEN, self.access_ttl)?,
            refresh_token: self.issue(user, REFRESH_TOKEN, self.refresh_ttl)?,
        })
    }

    /// Validates a bearer token and requires it to be an access token.
    pub fn verify_access(&self, token: &str) -> Result<Claims, ApiError> {
        let validation = Validation::new(Algorithm::HS256);
        let data = decode::<Claims>(token, &self.decoding, &validation)
            .map_err(|_| ApiError::unauthorized("Invalid token"))?;
        if data.claims.token_type != ACCESS_TOKEN {
            return Err(ApiError::unauthorized("Invalid token type"));
        }
        Ok(data.claims)
    }
}

/// Verified caller identity, extracted from the Authorization header.
#[derive(Debug, Clone, Copy)]
pub struct CurrentUser {
    pub id: Uuid,
    pub role: Role,
}

impl CurrentUser {
    pub fn caller(&self) -> Caller {
        Caller {
            id: self.id,
            role: self.role,
        }
    }

    pub fn require_seller(&self) -> Result<(), ApiError> {
        if self.role != Role::Seller {
            return Err(ApiError::forbidden(
                "Unauthorized, only seller can access this API",
            ));
        }
        Ok(())
    }

    pub fn require_buyer(&self) -> Result<(), ApiError> {
        if self.role != Role::Buyer {
            return Err(ApiError::forbidden(
                "Unauthorized, only buyer can access this API",
            ));
        }
        Ok(())
    }
}

impl From<Claims> for CurrentUser {
    fn from(claims: Claims) -> Self {
        Self {
            id: claims.sub,
            role: claims.role,
        }
    }
}

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| ApiError::unauthorized("Access denied. No token provided."))?;
        let token = header
            .strip_prefix("Bearer ")
            .ok_or_else(|| ApiError::unauthorized("Access denied. No token provided."))?;

        let claims = state.auth.verify_access(token)?;
        Ok(CurrentUser::from(claims))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn user(role: Role) -> User {
        User {
            id: Uuid::new_v4(),
            name: "Test".into(),
            username: "test".into(),
            email: "test@example.com".into(),
            password_hash: "hash".into(),
            role,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn keys() -> AuthKeys {
        AuthKeys::new(
            "test-secret",
            Duration::from_secs(3600),
            Duration::from_secs(7200),
        )
    }

    #[test]
    fn test_issue_and_verify_round_trip() {
        let keys = keys();
        let user = user(Role::Seller);
        let pair = keys.issue_pair(&user).unwrap();

        let claims = keys.verify_access(&pair.access_token).unwrap();
        assert_eq!(claims.sub, user.id);
        assert_eq!(claims.role, Role::Seller);
    }

    #[test]
    fn test_refresh_token_is_not_an_access_token() {
        let keys = keys();
        let pair = keys.issue_pair(&user(Role::Buyer)).unwrap();
        assert!(keys.verify_access(&pair.refresh_token).is_err());
    }

    #[test]
    fn test_foreign_secret_is_rejected() {
        let pair = keys().issue_pair(&user(Role::Buyer)).unwrap();
        let other = AuthKeys::new(
            "other-secret",
            Duration::from_secs(3600),
            Duration::from_secs(7200),
        );
        assert!(other.verify_access(&pair.access_token).is_err());
    }

    #[test]
    fn test_role_gates() {
        let seller = CurrentUser {
            id: Uuid::new_v4(),
            role: Role::Seller,
        };
        assert!(seller.require_seller().is_ok());
        assert!(seller.require_buyer().is_err());

        let buyer = CurrentUser {
            id: Uuid::new_v4(),
            role: Role::Buyer,
        };
        assert!(buyer.require_buyer().is_ok());
        assert!(buyer.require_seller().is_err());
    }
}
