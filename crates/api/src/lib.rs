//! HTTP API server for the sports-nutrition storefront.
//!
//! Provides JSON endpoints for the catalog, session carts, checkout, order
//! administration and store introspection, with structured logging
//! (tracing) and Prometheus metrics.

pub mod config;
pub mod context;
pub mod error;
pub mod routes;
pub mod state;

use std::sync::Arc;

use axum::Router;
use axum::middleware;
use axum::routing::{get, post, put};
use domain::{CatalogService, DomainError};
use metrics_exporter_prometheus::PrometheusHandle;
use record_store::{DailyFileSink, OperationLog, RecordStore, Records};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use config::Config;
use state::AppState;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: RecordStore + 'static>(
    state: Arc<AppState<S>>,
    metrics_handle: PrometheusHandle,
) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::system::metrics))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::system::health::<S>))
        .route(
            "/api/products",
            get(routes::products::list::<S>).post(routes::products::create::<S>),
        )
        .route(
            "/api/products/{id}",
            get(routes::products::get::<S>)
                .put(routes::products::update::<S>)
                .delete(routes::products::delete::<S>),
        )
        .route(
            "/api/categories",
            get(routes::categories::list::<S>).post(routes::categories::create::<S>),
        )
        .route(
            "/api/categories/{id}",
            put(routes::categories::update::<S>).delete(routes::categories::delete::<S>),
        )
        .route(
            "/api/cart",
            get(routes::cart::get::<S>).delete(routes::cart::clear::<S>),
        )
        .route("/api/cart/add", post(routes::cart::add::<S>))
        .route("/api/cart/update", post(routes::cart::update::<S>))
        .route("/api/cart/remove", post(routes::cart::remove::<S>))
        .route(
            "/api/orders",
            get(routes::orders::list::<S>).post(routes::orders::create::<S>),
        )
        .route(
            "/api/orders/{id}",
            get(routes::orders::get::<S>).delete(routes::orders::delete::<S>),
        )
        .route("/api/orders/{id}/status", put(routes::orders::update_status::<S>))
        .route("/api/stats", get(routes::database::stats::<S>))
        .route("/api/database/logs", get(routes::database::logs::<S>))
        .route("/api/database/export", get(routes::database::export::<S>))
        .with_state(state)
        .merge(metrics_router)
        .layer(middleware::from_fn(context::session_middleware))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any)
                .expose_headers([context::SESSION_HEADER]),
        )
        .layer(TraceLayer::new_for_http())
}

/// Wraps a backend in the record facade, with the operation log mirrored
/// to daily files under `config.log_dir`.
pub fn create_records<S: RecordStore>(store: S, config: &Config) -> Records<S> {
    Records::new(store)
        .with_log(OperationLog::new().with_file_sink(DailyFileSink::new(&config.log_dir)))
}

/// Records start-up, seeds the default catalog when enabled and builds
/// the shared state.
pub async fn create_state<S: RecordStore + 'static>(
    records: Records<S>,
    config: &Config,
) -> Result<Arc<AppState<S>>, DomainError> {
    let backend = config.backend.as_str();
    records.log_init(backend).await;

    if config.seed_catalog && CatalogService::new(records.clone()).seed_defaults().await? {
        tracing::info!(backend, "default catalog loaded");
    }

    Ok(Arc::new(AppState::new(records, backend)))
}
