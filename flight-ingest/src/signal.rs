//! Shutdown signal handling.

use std::future::Future;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Cancel `token` on Ctrl-C.
pub async fn cancel_on_ctrl_c(token: CancellationToken) {
    cancel_on(tokio::signal::ctrl_c(), token).await;
}

/// Cancel `token` once `signal` fires. If the listener itself fails the
/// token is left alone and the caller keeps running until it is killed.
pub async fn cancel_on<F>(signal: F, token: CancellationToken)
where
    F: Future<Output = std::io::Result<()>>,
{
    match signal.await {
        Ok(()) => {
            info!("Shutdown signal received, stopping after the current cycle");
            token.cancel();
        }
        Err(e) => error!("Failed to listen for the shutdown signal: {}", e),
    }
}
