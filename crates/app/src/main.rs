//! Storefront Backend Application
//!
//! This is the main entry point for the storefront backend service. The
//! application provides REST API endpoints for catalog browsing, product
//! authoring with image/variant handling, cart and wishlist management,
//! and JWT-based authentication.
//!
//! # Architecture
//!
//! The application follows a modular architecture with:
//! - Repository layer for data access
//! - Service layer for business logic (transactional consistency)
//! - API layer for HTTP endpoints
//! - Metrics for monitoring

use std::sync::Arc;

use anyhow::{Context, Result};
use app_config::AppConfig;
use repository::{
    PgCartsRepository, PgCategoriesRepository, PgImagesRepository, PgProductsRepository,
    PgUsersRepository, PgVariantsRepository, PgWishlistsRepository,
};
use server::{AppState, AuthKeys, Server};
use service::{
    CartService, CartServiceImpl, CatalogService, CatalogServiceImpl, CategoryService,
    CategoryServiceImpl, UserService, UserServiceImpl, WishlistService, WishlistServiceImpl,
};
use tracing::{error, info};

/// Initialize the tracing subscriber for logging
fn init_logger() -> Result<()> {
    tracing_subscriber::fmt::init();
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    if let Err(err) = init_logger() {
        eprintln!("Failed to initialize logger: {}", err);
        return Err(anyhow::anyhow!("Failed to initialize logger"));
    }

    info!("Storefront backend starting...");

    // Load configuration
    let config = AppConfig::load().context("Failed to load configuration")?;

    // Initialize database
    let db_pool = match db::init_db_pool(&config).await {
        Ok(pool) => {
            info!("Database initialized successfully");
            pool
        }
        Err(e) => {
            error!("Failed to initialize database: {}", e);
            error!("Database connection is required for application to function properly");
            return Err(anyhow::anyhow!("Failed to initialize database"));
        }
    };

    let base_url = config.api_base_url.clone();

    // Wire up services; repositories are stateless and transaction-scoped,
    // so each service only owns the pool and its repository set.
    let catalog: Arc<dyn CatalogService> = Arc::new(CatalogServiceImpl::new(
        db_pool.clone(),
        PgProductsRepository,
        PgImagesRepository,
        PgVariantsRepository,
        PgCategoriesRepository,
        PgUsersRepository,
        base_url.clone(),
    ));
    let carts: Arc<dyn CartService> = Arc::new(CartServiceImpl::new(
        db_pool.clone(),
        PgCartsRepository,
        PgProductsRepository,
        PgImagesRepository,
        PgVariantsRepository,
        PgCategoriesRepository,
        PgUsersRepository,
        base_url.clone(),
    ));
    let wishlists: Arc<dyn WishlistService> = Arc::new(WishlistServiceImpl::new(
        db_pool.clone(),
        PgWishlistsRepository,
        PgProductsRepository,
        PgImagesRepository,
        PgVariantsRepository,
        PgCategoriesRepository,
        PgUsersRepository,
        base_url,
    ));
    let categories: Arc<dyn CategoryService> = Arc::new(CategoryServiceImpl::new(
        db_pool.clone(),
        PgCategoriesRepository,
    ));
    let users: Arc<dyn UserService> =
        Arc::new(UserServiceImpl::new(db_pool.clone(), PgUsersRepository));

    let auth = Arc::new(AuthKeys::new(
        &config.jwt_secret,
        config.access_token_ttl,
        config.refresh_token_ttl,
    ));

    let state = AppState {
        catalog,
        carts,
        wishlists,
        categories,
        users,
        auth,
    };

    let http_server = Server::new(config.http_port, state);
    http_server.start().await?;

    info!("Application stopped");
    Ok(())
}
