//! DNE Server - Main entry point

use anyhow::Result;
use dne_common::logging::{init_logging, LogConfig, LogOutput};
use dne_ingest::{config::SyncConfig, pipeline, store::PgSyncStore};
use sqlx::postgres::PgPoolOptions;
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tokio::signal;
use tower_http::compression::CompressionLayer;
use tracing::info;

use dne_server::{
    config::Config,
    executor::RunExecutor,
    middleware,
    routes::{self, AppState},
    state::RunTracker,
};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let mut log_config = LogConfig::from_env()?;
    if log_config.filter_directives.is_none() {
        log_config.filter_directives =
            Some("dne_server=debug,dne_ingest=debug,tower_http=debug,sqlx=info".to_string());
    }
    if log_config.log_file_prefix == LogConfig::default().log_file_prefix {
        log_config.log_file_prefix = "dne-server".to_string();
    }
    // The /logs endpoint tails the log file, so a file sink is not optional.
    if log_config.output == LogOutput::Console {
        log_config.output = LogOutput::Both;
    }
    init_logging(&log_config)?;

    info!("Starting DNE Server");

    let config = Config::load()?;
    info!(
        "Configuration loaded - server will bind to {}:{}",
        config.server.host, config.server.port
    );

    let sync_config = SyncConfig::from_env()?;

    let db_pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .min_connections(config.database.min_connections)
        .acquire_timeout(Duration::from_secs(config.database.connect_timeout_secs))
        .idle_timeout(Duration::from_secs(config.database.idle_timeout_secs))
        .connect(&sync_config.database_url())
        .await?;

    info!("Database connection pool established");

    sqlx::migrate!("../../migrations")
        .run(&db_pool)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to run migrations: {}", e))?;

    info!("Database migrations completed");

    let store = Arc::new(PgSyncStore::new(db_pool.clone(), &sync_config.table)?);
    let tracker = Arc::new(RunTracker::new());
    let executor = {
        let sync_config = sync_config.clone();
        RunExecutor::spawn(Arc::clone(&tracker), move || {
            let config = sync_config.clone();
            let store = Arc::clone(&store);
            async move { pipeline::run(&config, store.as_ref()).await }
        })
    };

    let state = AppState {
        db: db_pool,
        executor: Arc::new(executor),
        log_dir: log_config.log_dir.clone(),
        log_prefix: log_config.log_file_prefix.clone(),
    };

    let app = routes::router(state)
        .layer(CompressionLayer::new())
        .layer(middleware::tracing_layer())
        .layer(middleware::cors_layer(&config.cors));

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(config.server.shutdown_timeout_secs))
        .await?;

    info!("Server shut down gracefully");

    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal(timeout_secs: u64) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            },
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
            },
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, starting graceful shutdown");
        },
        _ = terminate => {
            info!("Received terminate signal, starting graceful shutdown");
        },
    }

    // Give ongoing requests time to complete
    info!("Waiting up to {} seconds for connections to close", timeout_secs);
    tokio::time::sleep(Duration::from_secs(timeout_secs.min(5))).await;
}
