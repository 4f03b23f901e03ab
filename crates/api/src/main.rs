//! API server entry point.

use api::config::{Config, StoreBackend};
use metrics_exporter_prometheus::PrometheusHandle;
use record_store::{InMemoryRecordStore, JsonFileRecordStore, PostgresRecordStore, RecordStore};
use tokio::signal;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

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

/// Builds the app over `store` and serves it until shutdown.
async fn serve<S: RecordStore + 'static>(store: S, config: Config, metrics_handle: PrometheusHandle) {
    let records = api::create_records(store, &config);
    let state = api::create_state(records, &config)
        .await
        .expect("failed to initialise the store");
    let app = api::create_app(state, metrics_handle);

    let addr = config.addr();
    tracing::info!(%addr, backend = %config.backend, "starting API server");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("failed to bind address");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");

    tracing::info!("server shut down gracefully");
}

#[tokio::main]
async fn main() {
    let config = Config::from_env().expect("invalid configuration");

    // 1. Initialize tracing
    tracing_subscriber::registry()
        .with(EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // 2. Install Prometheus metrics recorder
    let metrics_handle = metrics_exporter_prometheus::PrometheusBuilder::new()
        .install_recorder()
        .expect("failed to install Prometheus recorder");

    // 3. Open the configured backend and serve
    match config.backend {
        StoreBackend::Memory => serve(InMemoryRecordStore::new(), config, metrics_handle).await,
        StoreBackend::Json => {
            let store = JsonFileRecordStore::open(&config.data_dir)
                .await
                .expect("failed to open data directory");
            tracing::info!(dir = %config.data_dir.display(), "using JSON collection files");
            serve(store, config, metrics_handle).await
        }
        StoreBackend::Postgres => {
            let url = config.database_url.clone().unwrap_or_default();
            let store = PostgresRecordStore::connect(&url)
                .await
                .expect("failed to connect to PostgreSQL");
            store
                .run_migrations()
                .await
                .expect("failed to run migrations");
            serve(store, config, metrics_handle).await
        }
    }
}
