//! Signal handling for interrupted acquisitions
//!
//! A running operation is raced against CTRL-C and SIGTERM. When a signal
//! wins, the operation's future is dropped on the spot, so temporary
//! archives and in-flight extractions are cleaned up by their guards before
//! the process exits.

use std::future::Future;

use tokio::signal;
use tracing::{info, warn};

use crate::errors::{AppError, Result};

/// Wait for CTRL-C or SIGTERM and return the signal's name
///
/// If a handler cannot be installed, that signal is never reported.
pub async fn shutdown_signal() -> &'static str {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => "SIGINT",
        _ = terminate => "SIGTERM",
    }
}

/// Run an operation until it finishes or `shutdown` resolves
///
/// # Errors
///
/// Returns the operation's own error, or `AppError::Interrupted` naming the
/// signal if `shutdown` resolved first
pub async fn run_until_shutdown<T, F, S>(operation: F, shutdown: S) -> Result<T>
where
    F: Future<Output = Result<T>>,
    S: Future<Output = &'static str>,
{
    tokio::select! {
        result = operation => result,
        signal = shutdown => {
            info!("Received {}, abandoning the current operation", signal);
            Err(AppError::Interrupted { signal })
        }
    }
}
