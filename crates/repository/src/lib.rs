//! # Data Repository Layer
//!
//! This module provides repository traits and PostgreSQL implementations
//! for all entities: categories, products, images, variants, cart and
//! wishlist lines, users. Every operation takes an explicit transaction
//! so the service layer controls atomicity end to end.

use thiserror::Error;
use tokio_postgres::error::SqlState;

mod carts;
mod categories;
mod images;
mod products;
mod users;
mod variants;
mod wishlists;

pub use carts::{CartsRepository, PgCartsRepository};
pub use categories::{CategoriesRepository, PgCategoriesRepository};
pub use images::{ImagesRepository, PgImagesRepository};
pub use products::{PgProductsRepository, ProductFilter, ProductSort, ProductsRepository};
pub use users::{PgUsersRepository, UsersRepository};
pub use variants::{PgVariantsRepository, VariantsRepository};
pub use wishlists::{PgWishlistsRepository, WishlistsRepository};

/// # RepositoryError
///
/// Error types that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database-related errors, wrapping the underlying PostgreSQL error
    #[error("Database error: {0}")]
    Db(#[from] tokio_postgres::Error),
    /// No result found.
    #[error("Not found")]
    NotFound,
    /// A store-level uniqueness constraint was violated.
    #[error("Duplicate key")]
    Duplicate,
}

/// Translates a unique-constraint violation into [`RepositoryError::Duplicate`]
/// so services can surface it as a Conflict instead of a generic DB failure.
fn map_write_err(err: tokio_postgres::Error) -> RepositoryError {
    if err.code() == Some(&SqlState::UNIQUE_VIOLATION) {
        RepositoryError::Duplicate
    } else {
        RepositoryError::Db(err)
    }
}
