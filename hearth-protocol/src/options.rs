use hearth_packets::{MAX_PACKET_SIZE, VarInt};
use std::time::Duration;

/// The behavioural knobs of the protocol server, shared between the
/// listener, the session manager and the packet handlers.
///
/// One immutable instance is built from the application configuration at
/// startup and handed around in an `Arc`.
#[derive(Debug, Clone)]
pub struct ServerOptions {
    /// The global admission cap.
    pub max_connections: usize,
    /// The per-peer admission cap.
    pub max_sessions_per_ip: usize,
    /// Whether the per-peer cap is enforced at all.
    pub ip_limiting_enabled: bool,
    /// Whether Nagle's algorithm is disabled on accepted sockets.
    pub tcp_nodelay: bool,
    /// Whether TCP keep-alive probes are enabled on the listener socket.
    pub tcp_keepalive: bool,
    /// The protocol-level idle threshold after which a quiet session is
    /// disconnected.
    pub session_idle_timeout: Duration,
    /// The manager-side hard cap; sessions stuck past it are reaped by the
    /// cleanup task regardless of state.
    pub session_hard_timeout: Duration,
    /// The cadence of the cleanup task.
    pub cleanup_interval: Duration,
    /// The cadence of the heartbeat task.
    pub heartbeat_interval: Duration,
    /// How often the server pings configuring and playing clients.
    pub keep_alive_interval: Duration,
    /// The back-off applied to the accept loop after a transient error.
    pub accept_retry_delay: Duration,
    /// The budget for draining sessions on graceful stop.
    pub shutdown_timeout: Duration,
    /// Frames longer than this are rejected as a protocol error.
    pub max_packet_size: VarInt,
    /// The outbound queue bound per session; further frames are dropped.
    pub max_queued_packets: usize,
    /// The compression threshold negotiated during login, disabled when
    /// absent.
    pub compression_threshold: Option<VarInt>,
    /// The advertised protocol version.
    pub protocol_version: VarInt,
    /// The status-list message of the day.
    pub motd: String,
    /// The advertised player capacity.
    pub max_players: usize,
    /// Whether Mojang authentication would be required; this server always
    /// applies offline semantics and rejects encryption attempts.
    pub online_mode: bool,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            max_connections: 1000,
            max_sessions_per_ip: 5,
            ip_limiting_enabled: true,
            tcp_nodelay: true,
            tcp_keepalive: true,
            session_idle_timeout: Duration::from_secs(30),
            session_hard_timeout: Duration::from_secs(300),
            cleanup_interval: Duration::from_secs(30),
            heartbeat_interval: Duration::from_secs(1),
            keep_alive_interval: Duration::from_secs(15),
            accept_retry_delay: Duration::from_secs(5),
            shutdown_timeout: Duration::from_secs(10),
            max_packet_size: MAX_PACKET_SIZE,
            max_queued_packets: 100,
            compression_threshold: None,
            protocol_version: 765,
            motd: "A Minecraft Server".to_owned(),
            max_players: 100,
            online_mode: false,
        }
    }
}
