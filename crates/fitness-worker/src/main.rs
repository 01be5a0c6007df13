//! Fitness worker entry point.

use std::error::Error;
use std::net::SocketAddr;
use std::sync::Arc;

use fitness_core::clock::SystemClock;
use fitness_worker::composition::{self, Pools};
use fitness_worker::config::WorkerConfig;
use fitness_worker::error::AppError;
use fitness_worker::routes;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

async fn connect(database_url: &str) -> Result<PgPool, AppError> {
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await?;
    sqlx::migrate!("../../migrations").run(&pool).await?;
    Ok(pool)
}

async fn shutdown_signal(cancel: CancellationToken) {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
    }
    tracing::info!("shutdown requested");
    cancel.cancel();
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // Initialize tracing subscriber.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    tracing::info!("Starting fitness outbox worker");

    let config = WorkerConfig::from_env()?;

    let pools = Pools {
        users: connect(&config.users_database_url).await?,
        workouts: connect(&config.workouts_database_url).await?,
    };

    let composition::Composition { worker, state } = composition::compose(
        &pools,
        Arc::new(SystemClock),
        &config.processor,
        config.inbox,
    )?;

    let cancel = CancellationToken::new();
    let worker_handle = tokio::spawn(worker.run(cancel.clone()));

    let app = routes::router(state);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .map_err(|e| AppError::Config(format!("invalid HOST:PORT combination: {e}")))?;
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(cancel.clone()))
        .await?;

    cancel.cancel();
    worker_handle.await?;
    tracing::info!("Fitness outbox worker stopped");

    Ok(())
}
