pub mod config;
pub mod error;
pub mod logging;
pub mod server;
pub mod shutdown;
pub mod statistics;
pub mod validation;

pub use config::{CliArgs, ProtocolConfig, ServerConfig};
pub use error::{ErrorCode, RequestError};
pub use logging::{LoggingConfig, init_logging};
pub use server::{Endpoint, ValidationReport, build_router};
pub use shutdown::{ShutdownConfig, ShutdownCoordinator};
pub use statistics::{StatisticsError, StatisticsTree};

use anyhow::{Context, Result};
use std::{future::IntoFuture, sync::Arc};
use tokio::net::TcpListener;

/// Binds the configured address and serves until SIGINT or SIGTERM.
pub async fn run_server(config: ServerConfig) -> Result<()> {
    let coordinator = ShutdownCoordinator::new(ShutdownConfig::default());
    coordinator.spawn_signal_listener();

    let listener = TcpListener::bind(config.listen_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.listen_addr))?;

    serve(listener, &config, coordinator).await
}

/// Serves on an already bound listener until `coordinator` is triggered.
///
/// In-flight requests get the coordinator's grace period to finish.
pub async fn serve(
    listener: TcpListener,
    config: &ServerConfig,
    coordinator: ShutdownCoordinator,
) -> Result<()> {
    let statistics = Arc::new(StatisticsTree::new());
    let router = build_router(config, statistics);

    let actual_addr = listener.local_addr()?;
    tracing::info!(
        bind = %actual_addr,
        protocols = config.protocols.len(),
        statistics = %config.statistics_path,
        "listening"
    );

    let graceful = coordinator.clone();
    let server_future = axum::serve(listener, router)
        .with_graceful_shutdown(async move { graceful.cancelled().await })
        .into_future();
    tokio::pin!(server_future);

    tokio::select! {
        result = &mut server_future => {
            result.context("server error")?;
            tracing::info!("server stopped");
        }
        _ = coordinator.grace_elapsed() => {
            tracing::warn!(
                grace_secs = coordinator.grace_period().as_secs(),
                "grace period elapsed, dropping in-flight requests"
            );
        }
    }

    Ok(())
}
