//! Graceful shutdown coordination.
//!
//! SIGINT or SIGTERM cancels a shared [`CancellationToken`]. The HTTP server
//! stops accepting connections as soon as the token is cancelled and is given
//! a grace period to finish in-flight requests before it is dropped.
//!
//! # Example
//!
//! ```rust,no_run
//! use fieldgate::shutdown::{ShutdownConfig, ShutdownCoordinator};
//!
//! # async fn example() {
//! let coordinator = ShutdownCoordinator::new(ShutdownConfig::default());
//! coordinator.spawn_signal_listener();
//!
//! let token = coordinator.token();
//! token.cancelled().await;
//! # }
//! ```

use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Configuration for graceful shutdown behavior
#[derive(Debug, Clone)]
pub struct ShutdownConfig {
    /// Time in-flight requests get after shutdown starts
    pub grace_period: Duration,
}

impl Default for ShutdownConfig {
    fn default() -> Self {
        Self {
            grace_period: Duration::from_secs(10),
        }
    }
}

impl ShutdownConfig {
    pub fn with_grace_period(mut self, grace_period: Duration) -> Self {
        self.grace_period = grace_period;
        self
    }
}

/// Shares one cancellation token between the signal listener and the server.
#[derive(Debug, Clone)]
pub struct ShutdownCoordinator {
    config: Arc<ShutdownConfig>,
    token: CancellationToken,
}

impl ShutdownCoordinator {
    pub fn new(config: ShutdownConfig) -> Self {
        Self {
            config: Arc::new(config),
            token: CancellationToken::new(),
        }
    }

    /// Get a shutdown token that can be used to coordinate async task cancellation
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    pub fn grace_period(&self) -> Duration {
        self.config.grace_period
    }

    /// Check if shutdown has been initiated
    pub fn is_shutdown_initiated(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Start shutdown without waiting for a signal.
    pub fn trigger(&self) {
        if !self.token.is_cancelled() {
            info!("shutdown requested");
        }
        self.token.cancel();
    }

    /// Resolves once shutdown has started.
    pub async fn cancelled(&self) {
        self.token.cancelled().await
    }

    /// Resolves once shutdown has started and the grace period has elapsed.
    pub async fn grace_elapsed(&self) {
        self.token.cancelled().await;
        tokio::time::sleep(self.config.grace_period).await;
    }

    /// Cancels the token on the first SIGINT or SIGTERM.
    pub fn spawn_signal_listener(&self) {
        let coordinator = self.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = wait_for_signal() => coordinator.trigger(),
                _ = coordinator.cancelled() => {}
            }
        });
    }
}

/// Wait for a shutdown signal (SIGTERM or SIGINT)
async fn wait_for_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("received SIGINT (Ctrl+C), initiating graceful shutdown");
        },
        _ = terminate => {
            info!("received SIGTERM, initiating graceful shutdown");
        },
    }
}
