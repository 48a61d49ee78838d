use crate::error::SessionError;
use crate::metrics;
use crate::options::ServerOptions;
use crate::session::{DisconnectReason, Session, SessionState};
use hearth_packets::{EncodePacket, configuration, play};
use std::collections::{HashMap, HashSet};
use std::net::{IpAddr, SocketAddr};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// All session states, for gauge recomputation.
const ALL_STATES: [SessionState; 8] = [
    SessionState::Connecting,
    SessionState::Handshaking,
    SessionState::Status,
    SessionState::Login,
    SessionState::Configuration,
    SessionState::Play,
    SessionState::Disconnecting,
    SessionState::Disconnected,
];

/// A point-in-time copy of the manager counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ManagerStats {
    pub active_sessions: usize,
    pub total_sessions: u64,
    pub rejected_sessions: u64,
    pub timed_out_sessions: u64,
    pub cleanup_runs: u64,
    pub peak_sessions: u64,
}

#[derive(Debug, Default)]
struct StatCounters {
    total: AtomicU64,
    rejected: AtomicU64,
    timed_out: AtomicU64,
    cleanup_runs: AtomicU64,
    peak: AtomicU64,
}

/// The four session indexes. They only change together, under the write
/// half of a single lock.
#[derive(Debug, Default)]
struct Registry {
    by_id: HashMap<String, Arc<Session>>,
    by_addr: HashMap<SocketAddr, String>,
    by_player: HashMap<String, String>,
    by_ip: HashMap<IpAddr, HashSet<String>>,
}

/// Admits, indexes and reaps sessions.
///
/// Lookups and broadcast iteration take the shared half of the registry
/// lock; insert and remove take the exclusive half. Broadcast snapshots
/// the recipients first so no send happens under the lock. Two background
/// tasks accompany the registry: a cleanup task that removes dead sessions
/// and reaps stuck ones, and a heartbeat task that recomputes gauges,
/// enforces the idle timeout and keeps quiet clients pinged.
pub struct SessionManager {
    options: Arc<ServerOptions>,
    registry: RwLock<Registry>,
    stats: StatCounters,
    shutdown: CancellationToken,
    tasks: TaskTracker,
}

impl SessionManager {
    pub fn new(options: Arc<ServerOptions>) -> Arc<Self> {
        Arc::new(Self {
            options,
            registry: RwLock::new(Registry::default()),
            stats: StatCounters::default(),
            shutdown: CancellationToken::new(),
            tasks: TaskTracker::new(),
        })
    }

    /// Spawns the cleanup and heartbeat tasks.
    pub fn start(self: &Arc<Self>) {
        let manager = Arc::clone(self);
        self.tasks.spawn(async move {
            let mut ticker = tokio::time::interval(manager.options.cleanup_interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    biased;
                    () = manager.shutdown.cancelled() => break,
                    _ = ticker.tick() => manager.cleanup_pass(),
                }
            }
        });

        let manager = Arc::clone(self);
        self.tasks.spawn(async move {
            let mut ticker = tokio::time::interval(manager.options.heartbeat_interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    biased;
                    () = manager.shutdown.cancelled() => break,
                    _ = ticker.tick() => manager.heartbeat_pass(),
                }
            }
        });
    }

    /// Admits a new session under the global and per-peer caps.
    pub fn create_session(&self, peer_addr: SocketAddr) -> Result<Arc<Session>, SessionError> {
        let mut registry = self.registry.write().unwrap();

        if registry.by_id.len() >= self.options.max_connections {
            drop(registry);
            self.reject("server-full");
            return Err(SessionError::CapacityExceeded("session limit reached"));
        }
        if self.options.ip_limiting_enabled
            && registry
                .by_ip
                .get(&peer_addr.ip())
                .is_some_and(|ids| ids.len() >= self.options.max_sessions_per_ip)
        {
            drop(registry);
            self.reject("ip-limit");
            return Err(SessionError::CapacityExceeded(
                "per-ip session limit reached",
            ));
        }

        let id = Uuid::new_v4().to_string();
        let session = Session::new(id.clone(), peer_addr, self.options.max_queued_packets);
        registry.by_id.insert(id.clone(), Arc::clone(&session));
        registry.by_addr.insert(peer_addr, id.clone());
        registry.by_ip.entry(peer_addr.ip()).or_default().insert(id);
        let active = registry.by_id.len() as u64;
        drop(registry);

        self.stats.total.fetch_add(1, Ordering::Relaxed);
        self.stats.peak.fetch_max(active, Ordering::Relaxed);
        metrics::ACCEPTED_SESSIONS
            .get_or_create(&metrics::AcceptedSessionsLabels {})
            .inc();
        debug!(session = session.id(), addr = %peer_addr, "session admitted");
        Ok(session)
    }

    fn reject(&self, cause: &'static str) {
        self.stats.rejected.fetch_add(1, Ordering::Relaxed);
        metrics::REJECTED_SESSIONS
            .get_or_create(&metrics::RejectedSessionsLabels { cause })
            .inc();
    }

    /// Adds the session to the player-name index; called at play entry.
    pub(crate) fn index_player(&self, session: &Arc<Session>) {
        let Some(name) = session.player_name() else {
            warn!(session = session.id(), "play entry without a player name");
            return;
        };
        self.registry
            .write()
            .unwrap()
            .by_player
            .insert(name, session.id().to_owned());
    }

    /// Drops the session from every index.
    pub fn remove_session(&self, id: &str) -> bool {
        let mut registry = self.registry.write().unwrap();
        let Some(session) = registry.by_id.remove(id) else {
            return false;
        };
        registry.by_addr.remove(&session.peer_addr());
        if let Some(name) = session.player_name()
            && registry.by_player.get(&name).is_some_and(|owner| owner == id)
        {
            registry.by_player.remove(&name);
        }
        let ip = session.peer_addr().ip();
        if let Some(ids) = registry.by_ip.get_mut(&ip) {
            ids.remove(id);
            if ids.is_empty() {
                registry.by_ip.remove(&ip);
            }
        }
        true
    }

    pub fn get(&self, id: &str) -> Option<Arc<Session>> {
        self.registry.read().unwrap().by_id.get(id).cloned()
    }

    pub fn get_by_player(&self, name: &str) -> Option<Arc<Session>> {
        let registry = self.registry.read().unwrap();
        let id = registry.by_player.get(name)?;
        registry.by_id.get(id).cloned()
    }

    pub fn get_by_addr(&self, addr: SocketAddr) -> Option<Arc<Session>> {
        let registry = self.registry.read().unwrap();
        let id = registry.by_addr.get(&addr)?;
        registry.by_id.get(id).cloned()
    }

    pub fn sessions_by_ip(&self, ip: IpAddr) -> Vec<Arc<Session>> {
        let registry = self.registry.read().unwrap();
        registry
            .by_ip
            .get(&ip)
            .map(|ids| {
                ids.iter()
                    .filter_map(|id| registry.by_id.get(id).cloned())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// A snapshot of every registered session.
    pub fn sessions(&self) -> Vec<Arc<Session>> {
        self.registry
            .read()
            .unwrap()
            .by_id
            .values()
            .cloned()
            .collect()
    }

    pub fn session_count(&self) -> usize {
        self.registry.read().unwrap().by_id.len()
    }

    pub fn count_in_state(&self, state: SessionState) -> usize {
        self.registry
            .read()
            .unwrap()
            .by_id
            .values()
            .filter(|session| session.state() == state)
            .count()
    }

    /// Queues a packet on every session in the target state.
    ///
    /// Recipients are snapshotted first; no send runs under the registry
    /// lock. Ordering across recipients is unspecified, per recipient the
    /// queue stays FIFO.
    pub fn broadcast<P: EncodePacket>(&self, packet: &P, target: SessionState) -> usize {
        let recipients: Vec<Arc<Session>> = {
            let registry = self.registry.read().unwrap();
            registry
                .by_id
                .values()
                .filter(|session| session.state() == target)
                .cloned()
                .collect()
        };

        let mut delivered = 0;
        for session in recipients {
            if session.send_packet(packet).is_ok() {
                delivered += 1;
            }
        }
        delivered
    }

    pub fn stats(&self) -> ManagerStats {
        ManagerStats {
            active_sessions: self.session_count(),
            total_sessions: self.stats.total.load(Ordering::Relaxed),
            rejected_sessions: self.stats.rejected.load(Ordering::Relaxed),
            timed_out_sessions: self.stats.timed_out.load(Ordering::Relaxed),
            cleanup_runs: self.stats.cleanup_runs.load(Ordering::Relaxed),
            peak_sessions: self.stats.peak.load(Ordering::Relaxed),
        }
    }

    /// Records the end of a session exactly once and unindexes it.
    pub(crate) fn finish_session(&self, session: &Arc<Session>, reason: &DisconnectReason) {
        if !session.mark_disconnect_fired() {
            return;
        }

        session.set_state(SessionState::Disconnected);
        self.remove_session(session.id());

        if *reason == DisconnectReason::Timeout {
            self.stats.timed_out.fetch_add(1, Ordering::Relaxed);
        }
        metrics::CLOSED_SESSIONS
            .get_or_create(&metrics::ClosedSessionsLabels {
                reason: reason.as_label(),
            })
            .inc();

        let stats = session.stats();
        info!(
            session = session.id(),
            addr = %session.peer_addr(),
            player = session.player_name().as_deref().unwrap_or("-"),
            reason = %reason,
            uptime_secs = session.uptime().as_secs(),
            bytes_in = stats.bytes_in,
            bytes_out = stats.bytes_out,
            packets_in = stats.packets_in,
            packets_out = stats.packets_out,
            "session closed"
        );
    }

    /// Removes dead sessions and reaps ones stuck past the hard timeout.
    fn cleanup_pass(&self) {
        self.stats.cleanup_runs.fetch_add(1, Ordering::Relaxed);
        for session in self.sessions() {
            if session.state() == SessionState::Disconnected {
                self.remove_session(session.id());
            } else if session.idle_for() > self.options.session_hard_timeout {
                warn!(session = session.id(), "reaping session past hard timeout");
                session.disconnect(DisconnectReason::Timeout);
            }
        }
    }

    /// Recomputes gauges, enforces the idle timeout and pings quiet
    /// clients in the keep-alive states.
    fn heartbeat_pass(&self) {
        let sessions = self.sessions();

        for state in ALL_STATES {
            let count = sessions
                .iter()
                .filter(|session| session.state() == state)
                .count();
            metrics::SESSIONS_BY_STATE
                .get_or_create(&metrics::SessionStateLabels {
                    state: state.as_str(),
                })
                .set(count as i64);
        }

        for session in &sessions {
            if !session.is_active() {
                continue;
            }
            if session.idle_for() > self.options.session_idle_timeout {
                debug!(session = session.id(), "idle timeout exceeded");
                session.disconnect(DisconnectReason::Timeout);
                continue;
            }
            if session.since_keep_alive() >= self.options.keep_alive_interval {
                let id = rand::random::<i64>();
                let sent = match session.state() {
                    SessionState::Configuration => session
                        .send_packet(&configuration::clientbound::KeepAlivePacket { id }),
                    SessionState::Play => {
                        session.send_packet(&play::clientbound::KeepAlivePacket { id })
                    }
                    _ => continue,
                };
                if sent.is_ok() {
                    session.mark_keep_alive();
                }
            }
        }
    }

    /// Disconnects everything, stops the background tasks and clears the
    /// indexes.
    pub async fn stop(&self) {
        info!("stopping session manager");
        for session in self.sessions() {
            session.disconnect(DisconnectReason::ServerShutdown);
        }
        self.shutdown.cancel();
        self.tasks.close();
        self.tasks.wait().await;

        let mut registry = self.registry.write().unwrap();
        registry.by_id.clear();
        registry.by_addr.clear();
        registry.by_player.clear();
        registry.by_ip.clear();
    }
}
