//! API server entry point.

use std::sync::Arc;

use tokio::signal;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use api::config::Config;
use api::routes::shop::AppState;

/// Waits for a shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("received SIGINT, starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("received SIGTERM, starting graceful shutdown");
        }
    }
}

#[tokio::main]
async fn main() {
    let config = Config::from_env();

    // 1. Initialize tracing
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.log_level.clone())),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // 2. Install Prometheus metrics recorder
    let prometheus_builder = metrics_exporter_prometheus::PrometheusBuilder::new();
    let metrics_handle = prometheus_builder
        .install_recorder()
        .expect("failed to install Prometheus recorder");

    // 3. Build the application: Postgres + the real processor when fully
    //    configured, in-memory stores otherwise.
    let app = match (
        &config.database_url,
        &config.gateway_base_url,
        &config.gateway_token,
    ) {
        (Some(database_url), Some(base_url), Some(token)) => {
            let pool = sqlx::postgres::PgPoolOptions::new()
                .max_connections(10)
                .connect(database_url)
                .await
                .expect("failed to connect to Postgres");

            let ledger = ledger::PostgresLedger::new(pool.clone());
            ledger
                .run_migrations()
                .await
                .expect("failed to run migrations");
            let catalog = catalog::PostgresCatalog::new(pool);
            let gateway = gateway::CryptoPayClient::new(base_url.clone(), token.clone())
                .expect("failed to build invoice processor client");
            let sink = fulfillment::LogSink::new(config.admin_ids.clone());

            let coordinator = fulfillment::FulfillmentCoordinator::new(
                gateway,
                ledger.clone(),
                catalog.clone(),
                sink,
            );
            let state = Arc::new(AppState {
                coordinator,
                ledger,
                catalog,
            });

            tracing::info!("running against Postgres and the invoice processor");
            api::create_app(state, metrics_handle)
        }
        _ => {
            tracing::warn!("incomplete configuration, running with in-memory stores");
            let (state, _gateway) = api::create_default_state();
            api::create_app(state, metrics_handle)
        }
    };

    // 4. Start server
    let addr = config.addr();
    tracing::info!(%addr, "starting API server");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("failed to bind address");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");

    tracing::info!("server shut down gracefully");
}
