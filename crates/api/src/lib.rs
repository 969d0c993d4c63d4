//! HTTP API server with observability for the shop payment engine.
//!
//! Provides REST endpoints for catalog browsing, invoice creation, and
//! payment confirmation, with structured logging (tracing) and Prometheus
//! metrics.

pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{delete, get, post};
use catalog::CatalogStore;
use fulfillment::NotificationSink;
use gateway::InvoiceGateway;
use ledger::Ledger;
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use routes::shop::AppState;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<G, L, C, N>(
    state: Arc<AppState<G, L, C, N>>,
    metrics_handle: PrometheusHandle,
) -> Router
where
    G: InvoiceGateway + 'static,
    L: Ledger + 'static,
    C: CatalogStore + 'static,
    N: NotificationSink + 'static,
{
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route("/purchases", post(routes::shop::begin_purchase::<G, L, C, N>))
        .route(
            "/payments/{invoice_id}/check",
            post(routes::shop::check_payment::<G, L, C, N>),
        )
        .route(
            "/payments/{invoice_id}",
            get(routes::shop::get_payment::<G, L, C, N>),
        )
        .route(
            "/users/{id}/purchases",
            get(routes::shop::list_user_purchases::<G, L, C, N>),
        )
        .route("/users/{id}/stats", get(routes::shop::user_stats::<G, L, C, N>))
        .route("/stats", get(routes::shop::shop_stats::<G, L, C, N>))
        .route("/categories", get(routes::shop::list_categories::<G, L, C, N>))
        .route("/categories", post(routes::shop::create_category::<G, L, C, N>))
        .route("/products", get(routes::shop::list_products::<G, L, C, N>))
        .route("/products", post(routes::shop::create_product::<G, L, C, N>))
        .route(
            "/products/{id}",
            delete(routes::shop::deactivate_product::<G, L, C, N>),
        )
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Application state over the in-memory stores.
pub type InMemoryAppState = AppState<
    gateway::InMemoryGateway,
    ledger::InMemoryLedger,
    catalog::InMemoryCatalog,
    fulfillment::RecordingSink,
>;

/// Creates application state over the in-memory stores, for local runs
/// and tests.
///
/// Also returns the gateway handle so callers (and tests) can drive
/// invoice statuses.
pub fn create_default_state() -> (Arc<InMemoryAppState>, gateway::InMemoryGateway) {
    use fulfillment::FulfillmentCoordinator;

    let gateway = gateway::InMemoryGateway::new();
    let ledger = ledger::InMemoryLedger::new();
    let catalog = catalog::InMemoryCatalog::new();
    let sink = fulfillment::RecordingSink::new();

    let coordinator = FulfillmentCoordinator::new(
        gateway.clone(),
        ledger.clone(),
        catalog.clone(),
        sink,
    );

    let state = Arc::new(AppState {
        coordinator,
        ledger,
        catalog,
    });

    (state, gateway)
}
