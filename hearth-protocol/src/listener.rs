use crate::dispatcher::Dispatcher;
use crate::manager::SessionManager;
use crate::options::ServerOptions;
use crate::session;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpSocket};
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};

/// The accept backlog handed to the listening socket.
const LISTEN_BACKLOG: u32 = 1024;

/// The protocol server: accepts connections, admits them through the
/// session manager and drives each session on its own task.
pub struct Server {
    options: Arc<ServerOptions>,
    manager: Arc<SessionManager>,
    dispatcher: Arc<Dispatcher>,
    tracker: TaskTracker,
}

impl Server {
    pub fn new(options: ServerOptions) -> Self {
        let options = Arc::new(options);
        let manager = SessionManager::new(Arc::clone(&options));
        let dispatcher = Dispatcher::new(Arc::clone(&options), Arc::clone(&manager));
        Self {
            options,
            manager,
            dispatcher,
            tracker: TaskTracker::new(),
        }
    }

    pub fn options(&self) -> &ServerOptions {
        &self.options
    }

    pub fn manager(&self) -> Arc<SessionManager> {
        Arc::clone(&self.manager)
    }

    /// Accepts connections until the stop token fires, then drains.
    ///
    /// Admission failures close the socket before a session id ever
    /// exists; transient accept errors back off instead of hot-looping.
    pub async fn listen(&self, listener: TcpListener, stop: CancellationToken) -> io::Result<()> {
        self.manager.start();
        info!(addr = %listener.local_addr()?, "accepting connections");

        loop {
            let accepted = tokio::select! {
                biased;
                () = stop.cancelled() => break,
                accepted = listener.accept() => accepted,
            };
            let (stream, peer_addr) = match accepted {
                Ok(pair) => pair,
                Err(err) => {
                    warn!(cause = %err, "accept failed");
                    tokio::time::sleep(self.options.accept_retry_delay).await;
                    continue;
                }
            };

            if let Err(err) = stream.set_nodelay(self.options.tcp_nodelay) {
                debug!(addr = %peer_addr, cause = %err, "failed to set TCP_NODELAY");
            }

            match self.manager.create_session(peer_addr) {
                Ok(session) => {
                    debug!(session = session.id(), addr = %peer_addr, "connection accepted");
                    self.tracker.spawn(session::drive(
                        session,
                        stream,
                        Arc::clone(&self.dispatcher),
                        Arc::clone(&self.manager),
                    ));
                }
                Err(err) => {
                    debug!(addr = %peer_addr, cause = %err, "connection rejected");
                    let mut stream = stream;
                    if let Err(err) = stream.shutdown().await {
                        debug!(addr = %peer_addr, cause = %err, "failed to close rejected connection");
                    }
                }
            }
        }

        info!("listener stopping");
        self.tracker.close();
        let drained = timeout(self.options.shutdown_timeout, async {
            self.manager.stop().await;
            self.tracker.wait().await;
        })
        .await;
        if drained.is_err() {
            warn!(
                budget_secs = self.options.shutdown_timeout.as_secs(),
                "graceful shutdown budget exceeded, abandoning remaining sessions"
            );
        }

        info!("protocol server stopped");
        Ok(())
    }
}

/// Opens the listening socket with `SO_REUSEADDR` and, per config, TCP
/// keep-alive probes. Accepted sockets inherit the keep-alive setting.
pub fn bind_listener(addr: SocketAddr, keepalive: bool) -> io::Result<TcpListener> {
    let socket = if addr.is_ipv4() {
        TcpSocket::new_v4()?
    } else {
        TcpSocket::new_v6()?
    };
    socket.set_reuseaddr(true)?;
    socket.set_keepalive(keepalive)?;
    socket.bind(addr)?;
    socket.listen(LISTEN_BACKLOG)
}
