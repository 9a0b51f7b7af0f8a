//! Server crate provides HTTP server functionality.
//!
//! This module implements the HTTP server for the storefront API: product
//! catalog, categories, cart and wishlist lines, user auth, plus health
//! and Prometheus metrics endpoints.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::{
    Router,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
};
use prometheus::{CounterVec, HistogramOpts, HistogramVec, Opts, Registry};
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info};

pub mod auth;
pub mod error;
pub mod handlers;
pub mod state;

pub use auth::{AuthKeys, CurrentUser};
pub use error::ApiError;
pub use state::AppState;

/// Server represents the HTTP server for the storefront API.
pub struct Server {
    state: AppState,
    port: u16,
    metrics: Arc<Metrics>,
}

/// Metrics collects and exposes HTTP server metrics.
struct Metrics {
    registry: Registry,
    http_requests_total: CounterVec,
    http_request_duration_seconds: HistogramVec,
    errors_total: CounterVec,
}

impl Metrics {
    fn new() -> Self {
        let registry = Registry::new();

        let http_requests_total = CounterVec::new(
            Opts::new("http_requests_total", "Total number of HTTP requests"),
            &["method", "endpoint", "status"],
        )
        .expect("Failed to create http_requests_total metric");

        let http_request_duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                "http_request_duration_seconds",
                "HTTP request duration in seconds",
            ),
            &["method", "endpoint"],
        )
        .expect("Failed to create http_request_duration_seconds metric");

        let errors_total = CounterVec::new(
            Opts::new("errors_total", "Total number of errors"),
            &["source", "endpoint"],
        )
        .expect("Failed to create errors_total metric");

        registry
            .register(Box::new(http_requests_total.clone()))
            .expect("Failed to register http_requests_total metric");
        registry
            .register(Box::new(http_request_duration_seconds.clone()))
            .expect("Failed to register http_request_duration_seconds metric");
        registry
            .register(Box::new(errors_total.clone()))
            .expect("Failed to register errors_total metric");

        Self {
            registry,
            http_requests_total,
            http_request_duration_seconds,
            errors_total,
        }
    }

    fn record_request(&self, method: &str, endpoint: &str, status: u16, duration: Duration) {
        self.http_requests_total
            .with_label_values(&[method, endpoint, &status.to_string()])
            .inc();
        self.http_request_duration_seconds
            .with_label_values(&[method, endpoint])
            .observe(duration.as_secs_f64());
    }

    fn record_error(&self, source: &str, endpoint: &str) {
        self.errors_total
            .with_label_values(&[source, endpoint])
            .inc();
    }
}

impl Server {
    /// Creates a new Server instance.
    ///
    /// # Arguments
    ///
    /// * `port` - The port on which the server will listen
    /// * `state` - Shared application state (services and auth keys)
    pub fn new(port: u16, state: AppState) -> Self {
        info!("Initializing HTTP server on port {}", port);

        Self {
            state,
            port,
            metrics: Arc::new(Metrics::new()),
        }
    }

    /// Starts the server and blocks until it's shut down.
    pub async fn start(&self) -> Result<()> {
        let app = self.create_router();

        let listener = TcpListener::bind(format!("0.0.0.0:{}", self.port))
            .await
            .context("Failed to bind to port")?;

        info!("HTTP server listening on port {}", self.port);

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .context("Server error")?;

        info!("HTTP server shut down gracefully");
        Ok(())
    }

    fn create_router(&self) -> Router {
        use handlers::{carts, categories, products, users, wishlists};

        let metrics = self.metrics.clone();

        Router::new()
            .route("/api", get(handle_root))
            .route(
                "/api/products",
                get(products::list).post(products::create),
            )
            .route("/api/products/image/{id}", get(products::render_image))
            .route(
                "/api/products/{id}",
                get(products::get_by_id)
                    .patch(products::update)
                    .delete(products::delete),
            )
            .route(
                "/api/categories",
                get(categories::list).post(categories::create),
            )
            .route(
                "/api/categories/{id}",
                axum::routing::patch(categories::edit).delete(categories::delete),
            )
            .route("/api/carts", get(carts::list).post(carts::create))
            .route(
                "/api/carts/{id}",
                axum::routing::patch(carts::update).delete(carts::delete),
            )
            .route(
                "/api/wishlists",
                get(wishlists::list).post(wishlists::create),
            )
            .route("/api/wishlists/toggle", post(wishlists::toggle))
            .route("/api/wishlists/{id}", delete(wishlists::delete))
            .route("/api/users/register", post(users::register))
            .route("/api/users/login", post(users::login))
            .route("/health", get(handle_health))
            .route(
                "/metrics",
                get({
                    let metrics = self.metrics.clone();
                    move || handle_metrics(metrics.clone())
                }),
            )
            .layer(axum::middleware::from_fn_with_state(
                metrics,
                metrics_middleware,
            ))
            .with_state(self.state.clone())
    }
}

/// Middleware for collecting metrics on HTTP requests
async fn metrics_middleware(
    axum::extract::State(metrics): axum::extract::State<Arc<Metrics>>,
    req: axum::extract::Request,
    next: axum::middleware::Next,
) -> Response {
    let method = req.method().to_string();
    let path = req.uri().path().to_string();

    let start = std::time::Instant::now();
    let response = next.run(req).await;
    let duration = start.elapsed();

    let status = response.status().as_u16();
    metrics.record_request(&method, &path, status, duration);
    if status >= 400 {
        metrics.record_error("http", &path);
    }

    response
}

async fn handle_root() -> &'static str {
    "Hello, welcome to the storefront API!"
}

async fn handle_health() -> &'static str {
    info!("Health check requested");
    "OK"
}

async fn handle_metrics(metrics: Arc<Metrics>) -> Response {
    use prometheus::Encoder;
    let encoder = prometheus::TextEncoder::new();

    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metrics.registry.gather(), &mut buffer) {
        error!("Failed to encode metrics: {}", e);
        return (StatusCode::INTERNAL_SERVER_ERROR, "Failed to encode metrics").into_response();
    }

    match String::from_utf8(buffer) {
        Ok(metrics_text) => (StatusCode::OK, metrics_text).into_response(),
        Err(e) => {
            error!("Failed to convert metrics to UTF-8: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Invalid metrics data").into_response()
        }
    }
}

/// Waits for a shutdown signal (Ctrl+C)
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
