#![forbid(unsafe_code)]

pub mod config;

use crate::config::Config;
use hearth_protocol::listener::bind_listener;
use hearth_protocol::Server;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Initializes the Minecraft protocol server and runs it until a stop
/// signal arrives.
///
/// This binds the server socket, wires the session manager and dispatcher,
/// and hands the listener the accept loop. SIGINT and SIGTERM trigger the
/// graceful stop path.
///
/// # Errors
///
/// Will return an appropriate error if the socket cannot be bound to the
/// configured address, or the server fails while accepting.
pub async fn start(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let addr = config.socket_addr()?;
    if config.online_mode {
        warn!("online mode is configured but authentication is not wired; running offline semantics");
    }

    info!(addr = %addr, "binding socket address");
    let listener = bind_listener(addr, config.tcp_keepalive)?;
    let server = Server::new(config.server_options());

    let stop = CancellationToken::new();
    tokio::spawn(wait_for_stop_signal(stop.clone()));

    server.listen(listener, stop).await?;

    info!("server stopped successfully");
    Ok(())
}

/// Resolves once SIGINT or SIGTERM arrives and cancels the accept loop.
async fn wait_for_stop_signal(stop: CancellationToken) {
    #[cfg(unix)]
    {
        let mut terminate = match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(signal) => signal,
            Err(err) => {
                warn!(cause = %err, "failed to install SIGTERM handler");
                let _ = tokio::signal::ctrl_c().await;
                stop.cancel();
                return;
            }
        };
        tokio::select! {
            _ = tokio::signal::ctrl_c() => info!("received SIGINT"),
            _ = terminate.recv() => info!("received SIGTERM"),
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
        info!("received interrupt");
    }
    stop.cancel();
}
