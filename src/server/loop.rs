// Server loop module
// Accepts connections until shutdown, then waits for in-flight downloads

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tracing::{error, info, warn};

use super::connection::accept_connection;
use crate::config::AppState;

/// Interval between two checks of the active connection count while draining
const DRAIN_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Accept loop of the artifact server
///
/// Returns once `state.shutdown_signal` is notified and every active
/// connection has finished, or the write timeout elapsed.
#[allow(clippy::ignored_unit_patterns)]
pub async fn run_server_loop(
    listener: TcpListener,
    state: Arc<AppState>,
    active_connections: Arc<AtomicUsize>,
) -> Result<(), Box<dyn std::error::Error>> {
    let shutdown = Arc::clone(&state.shutdown_signal);
    loop {
        tokio::select! {
            accept_result = listener.accept() => {
                match accept_result {
                    Ok((stream, peer_addr)) => {
                        accept_connection(stream, peer_addr, &state, &active_connections);
                    }
                    Err(e) => error!("Failed to accept connection: {e}"),
                }
            }

            _ = shutdown.notified() => {
                info!("Shutdown requested, no longer accepting connections");
                break;
            }
        }
    }

    drop(listener);
    let grace = Duration::from_secs(state.config.performance.write_timeout);
    drain_connections(&active_connections, grace).await;
    Ok(())
}

/// Wait until no connection is active or `grace` elapsed
async fn drain_connections(active_connections: &AtomicUsize, grace: Duration) {
    let deadline = tokio::time::Instant::now() + grace;
    loop {
        let active = active_connections.load(Ordering::SeqCst);
        if active == 0 {
            info!("All connections closed");
            return;
        }
        if tokio::time::Instant::now() >= deadline {
            warn!("Shutting down with {active} connections still active");
            return;
        }
        tokio::time::sleep(DRAIN_POLL_INTERVAL).await;
    }
}
