//! Shared application state for request handlers.

use std::sync::Arc;

use service::{CartService, CatalogService, CategoryService, UserService, WishlistService};

use crate::auth::AuthKeys;

/// Application state shared between request handlers.
#[derive(Clone)]
pub struct AppState {
    pub catalog: Arc<dyn CatalogService>,
    pub carts: Arc<dyn CartService>,
    pub wishlists: Arc<dyn WishlistService>,
    pub categories: Arc<dyn CategoryService>,
    pub users: Arc<dyn UserService>,
    pub auth: Arc<AuthKeys>,
}
