//! Business logic layer for the storefront catalog.
//!
//! This crate hosts the catalog, cart, wishlist, category and user
//! services. Services coordinate multi-table persistence and retrieval,
//! providing transactional guarantees, business validation, and repository
//! abstraction.
//!
//! # Features
//! - Atomic product mutation (images and variants reconciled in a single
//!   transaction).
//! - Validation of duck-typed request payloads before any business logic.
//! - Dependency injection for testability and loose coupling.
//! - Async-first API suitable for scalable web applications.
//! - Well-typed error handling via [`ServiceError`].

use deadpool_postgres::PoolError;
use model::Role;
use repository::RepositoryError;
use thiserror::Error;
use uuid::Uuid;

pub mod carts;
pub mod catalog;
pub mod categories;
pub mod images;
pub mod input;
pub mod markdown;
pub mod sanitize;
pub mod users;
pub mod wishlists;

mod relations;

pub use carts::{CartCreateInput, CartLineView, CartPage, CartService, CartServiceImpl, CartUpdateInput};
pub use catalog::{
    CatalogService, CatalogServiceImpl, ProductListQuery, ProductPage, RenderedImage,
};
pub use categories::{CategoryPage, CategoryService, CategoryServiceImpl};
pub use input::{ProductForm, UploadedImage};
pub use sanitize::{ImageView, ProductDetail, ProductListItem};
pub use users::{RegisterInput, UserService, UserServiceImpl};
pub use wishlists::{
    WishlistLineView, WishlistPage, WishlistService, WishlistServiceImpl, WishlistToggle,
};

/// Verified caller identity attached by the authentication boundary.
///
/// Services never re-verify credentials; they receive this as ground truth.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caller {
    pub id: Uuid,
    pub role: Role,
}

/// The main error type for all service operations.
///
/// Exactly one variant per error kind in the API contract; the HTTP
/// boundary maps kinds to status codes without inspecting messages.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// No or invalid caller identity.
    #[error("{0}")]
    Unauthorized(String),
    /// Valid identity, but not entitled to this resource.
    #[error("{0}")]
    Forbidden(String),
    /// Malformed or missing input.
    #[error("{0}")]
    Validation(String),
    /// A referenced entity does not exist.
    #[error("{0}")]
    NotFound(String),
    /// Duplicate key or stock-exceeded write.
    #[error("{0}")]
    Conflict(String),
    /// A repository (database) operation failed.
    #[error("Database error: {0}")]
    Db(#[from] RepositoryError),
    /// Failed to obtain a database connection from the pool.
    #[error("Pool error: {0}")]
    Pool(#[from] PoolError),
    /// Some unexpected or unhandled error.
    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

/// Normalized pagination window: `page` ≥ 1, `limit` clamped to [1, 100].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Paging {
    pub page: i64,
    pub limit: i64,
}

impl Paging {
    pub const DEFAULT_LIMIT: i64 = 10;
    pub const MAX_LIMIT: i64 = 100;

    pub fn new(page: Option<i64>, limit: Option<i64>) -> Self {
        let page = page.unwrap_or(1).max(1);
        let limit = limit.unwrap_or(Self::DEFAULT_LIMIT).clamp(1, Self::MAX_LIMIT);
        Self { page, limit }
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1) * self.limit
    }

    /// `ceil(total / limit)`, never below 1 even for an empty result.
    pub fn total_pages(&self, total: i64) -> i64 {
        ((total + self.limit - 1) / self.limit).max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::Paging;

    #[test]
    fn test_paging_defaults() {
        let paging = Paging::new(None, None);
        assert_eq!(paging.page, 1);
        assert_eq!(paging.limit, 10);
        assert_eq!(paging.offset(), 0);
    }

    #[test]
    fn test_paging_clamps_limit_and_page() {
        assert_eq!(Paging::new(Some(0), Some(0)), Paging { page: 1, limit: 1 });
        assert_eq!(
            Paging::new(Some(-3), Some(1000)),
            Paging { page: 1, limit: 100 }
        );
        assert_eq!(
            Paging::new(Some(3), Some(25)),
            Paging { page: 3, limit: 25 }
        );
    }

    #[test]
    fn test_paging_offset() {
        assert_eq!(Paging::new(Some(4), Some(10)).offset(), 30);
    }

    #[test]
    fn test_total_pages_rounds_up_with_floor_of_one() {
        let paging = Paging::new(Some(1), Some(10));
        assert_eq!(paging.total_pages(0), 1);
        assert_eq!(paging.total_pages(1), 1);
        assert_eq!(paging.total_pages(10), 1);
        assert_eq!(paging.total_pages(11), 2);
        assert_eq!(paging.total_pages(95), 10);
    }
}
