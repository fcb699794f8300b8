//! Signal handling for graceful shutdown

use futures::stream::StreamExt;
use signal_hook_tokio::Signals;
use tracing::{error, info};

/// Wait for the first shutdown signal (SIGTERM or SIGINT)
pub async fn shutdown_signal() {
    let mut signals = match Signals::new([signal_hook::consts::SIGTERM, signal_hook::consts::SIGINT])
    {
        Ok(signals) => signals,
        Err(e) => {
            // Without a handler we can only wait for the server future to end
            error!("Failed to install signal handler: {}", e);
            futures::future::pending::<()>().await;
            unreachable!();
        }
    };

    if let Some(signal) = signals.next().await {
        info!("Received signal: {}", signal);
    }
}
