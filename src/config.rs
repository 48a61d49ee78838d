//! The config module defines the application configuration. It is based on
//! [config], a layered configuration system for Rust applications.
//!
//! # Layers
//!
//! Upper layers overwrite lower layers:
//!
//! 1. Environment variables of the form `HEARTH_[field]`, e.g.
//!    `HEARTH_PORT=25566` or `HEARTH_MAX_CONNECTIONS=200`.
//! 2. An optional configuration file whose location is taken from the
//!    `CONFIG_FILE` environment variable, defaulting to `config/config`
//!    (any file type supported by [config]).
//! 3. The defaults defined on the struct.

use config::{ConfigError, Environment, File};
use hearth_packets::{MAX_PACKET_SIZE, VarInt};
use hearth_protocol::ServerOptions;
use serde::Deserialize;
use std::env;
use std::net::{AddrParseError, IpAddr, SocketAddr};
use std::time::Duration;

/// [`Config`] holds all configuration for the application. One immutable
/// instance is created on startup and then shared among the components.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// The interface the server binds to.
    pub bind_address: String,

    /// The port the server listens on.
    pub port: u16,

    /// The global admission cap.
    pub max_connections: usize,

    /// The per-peer admission cap.
    pub max_sessions_per_ip: usize,

    /// Whether the per-peer cap is enforced.
    pub ip_limiting_enabled: bool,

    /// The number of runtime worker threads; 0 selects the hardware
    /// parallelism, capped at 64.
    pub worker_threads: usize,

    /// The I/O event batch depth per runtime tick.
    pub io_queue_depth: usize,

    /// Whether Nagle's algorithm is disabled on accepted sockets.
    pub tcp_nodelay: bool,

    /// Whether TCP keep-alive probes are enabled.
    pub tcp_keepalive: bool,

    /// Seconds of protocol silence before a session is disconnected.
    pub session_idle_timeout: u64,

    /// Seconds before the cleanup task reaps a stuck session.
    pub session_hard_timeout: u64,

    /// Seconds of back-off after a failed accept.
    pub accept_timeout: u64,

    /// Seconds granted to drain sessions on graceful stop.
    pub shutdown_timeout: u64,

    /// The largest accepted packet frame in bytes.
    pub max_packet_size: VarInt,

    /// The compression threshold negotiated during login; disabled if
    /// empty.
    pub compression_threshold: Option<VarInt>,

    /// The advertised protocol version.
    pub protocol_version: VarInt,

    /// The status-list message of the day.
    pub motd: String,

    /// The advertised player capacity.
    pub max_players: usize,

    /// Whether Mojang authentication would apply; this server always runs
    /// offline semantics.
    pub online_mode: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_owned(),
            port: 25565,
            max_connections: 1000,
            max_sessions_per_ip: 5,
            ip_limiting_enabled: true,
            worker_threads: 0,
            io_queue_depth: 256,
            tcp_nodelay: true,
            tcp_keepalive: true,
            session_idle_timeout: 30,
            session_hard_timeout: 300,
            accept_timeout: 5,
            shutdown_timeout: 10,
            max_packet_size: MAX_PACKET_SIZE,
            compression_threshold: None,
            protocol_version: 765,
            motd: "A Minecraft Server".to_owned(),
            max_players: 100,
            online_mode: false,
        }
    }
}

impl Config {
    /// Reads the configuration layer by layer.
    ///
    /// # Errors
    ///
    /// Will return an appropriate error if a layer cannot be parsed or a
    /// field has an incompatible value.
    pub fn read() -> Result<Self, ConfigError> {
        let config_file = env::var("CONFIG_FILE").unwrap_or_else(|_| "config/config".to_owned());

        config::Config::builder()
            .add_source(File::with_name(&config_file).required(false))
            .add_source(Environment::with_prefix("HEARTH"))
            .build()?
            .try_deserialize()
    }

    /// The socket address the listener binds to.
    pub fn socket_addr(&self) -> Result<SocketAddr, AddrParseError> {
        let ip: IpAddr = self.bind_address.parse()?;
        Ok(SocketAddr::new(ip, self.port))
    }

    /// The behavioural options handed to the protocol server.
    pub fn server_options(&self) -> ServerOptions {
        ServerOptions {
            max_connections: self.max_connections,
            max_sessions_per_ip: self.max_sessions_per_ip,
            ip_limiting_enabled: self.ip_limiting_enabled,
            tcp_nodelay: self.tcp_nodelay,
            tcp_keepalive: self.tcp_keepalive,
            session_idle_timeout: Duration::from_secs(self.session_idle_timeout),
            session_hard_timeout: Duration::from_secs(self.session_hard_timeout),
            accept_retry_delay: Duration::from_secs(self.accept_timeout),
            shutdown_timeout: Duration::from_secs(self.shutdown_timeout),
            max_packet_size: self.max_packet_size,
            compression_threshold: self.compression_threshold,
            protocol_version: self.protocol_version,
            motd: self.motd.clone(),
            max_players: self.max_players,
            online_mode: self.online_mode,
            ..ServerOptions::default()
        }
    }

    /// The effective worker thread count: the configured value, or the
    /// hardware parallelism capped at 64.
    pub fn effective_worker_threads(&self) -> usize {
        if self.worker_threads > 0 {
            return self.worker_threads;
        }
        std::thread::available_parallelism()
            .map(|count| count.get())
            .unwrap_or(1)
            .min(64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_documented_table() {
        let config = Config::default();
        assert_eq!(config.bind_address, "0.0.0.0");
        assert_eq!(config.port, 25565);
        assert_eq!(config.max_connections, 1000);
        assert_eq!(config.max_sessions_per_ip, 5);
        assert!(config.ip_limiting_enabled);
        assert_eq!(config.worker_threads, 0);
        assert_eq!(config.io_queue_depth, 256);
        assert!(config.tcp_nodelay);
        assert!(config.tcp_keepalive);
        assert_eq!(config.session_idle_timeout, 30);
        assert_eq!(config.session_hard_timeout, 300);
        assert_eq!(config.shutdown_timeout, 10);
        assert_eq!(config.max_packet_size, 2_097_151);
        assert_eq!(config.protocol_version, 765);
        assert_eq!(config.motd, "A Minecraft Server");
        assert_eq!(config.max_players, 100);
        assert!(!config.online_mode);
    }

    #[test]
    fn socket_addr_combines_interface_and_port() {
        let config = Config {
            bind_address: "127.0.0.1".to_owned(),
            port: 4321,
            ..Config::default()
        };
        assert_eq!(
            config.socket_addr().unwrap().to_string(),
            "127.0.0.1:4321"
        );
    }

    #[test]
    fn worker_threads_auto_detect_is_capped() {
        let auto = Config::default().effective_worker_threads();
        assert!(auto >= 1 && auto <= 64);

        let fixed = Config {
            worker_threads: 7,
            ..Config::default()
        };
        assert_eq!(fixed.effective_worker_threads(), 7);
    }
}
