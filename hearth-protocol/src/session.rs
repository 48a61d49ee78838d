use crate::dispatcher::Dispatcher;
use crate::error::SessionError;
use crate::manager::SessionManager;
use hearth_packets::handshake::LEGACY_PING_BYTE;
use hearth_packets::{EncodePacket, FrameBuffer, VarInt, configuration, frame, login, play};
use std::collections::VecDeque;
use std::fmt;
use std::net::SocketAddr;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicI32, AtomicU8, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::sync::Notify;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};
use uuid::Uuid;

/// The initial receive buffer size; it grows on demand up to the largest
/// legal frame.
const RECEIVE_BUFFER_SIZE: usize = 8192;

/// The lifecycle states of a client session, following the protocol state
/// machine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum SessionState {
    /// Accepted, not yet started.
    Connecting = 0,
    /// Waiting for the handshake packet.
    Handshaking = 1,
    /// Server list query.
    Status = 2,
    /// Login and authentication.
    Login = 3,
    /// Post-login negotiation.
    Configuration = 4,
    /// Active gameplay.
    Play = 5,
    /// Graceful disconnect in progress.
    Disconnecting = 6,
    /// Terminated.
    Disconnected = 7,
}

impl SessionState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => SessionState::Connecting,
            1 => SessionState::Handshaking,
            2 => SessionState::Status,
            3 => SessionState::Login,
            4 => SessionState::Configuration,
            5 => SessionState::Play,
            6 => SessionState::Disconnecting,
            _ => SessionState::Disconnected,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SessionState::Connecting => "connecting",
            SessionState::Handshaking => "handshaking",
            SessionState::Status => "status",
            SessionState::Login => "login",
            SessionState::Configuration => "configuration",
            SessionState::Play => "play",
            SessionState::Disconnecting => "disconnecting",
            SessionState::Disconnected => "disconnected",
        }
    }

    pub fn is_active(self) -> bool {
        !matches!(
            self,
            SessionState::Disconnecting | SessionState::Disconnected
        )
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether the state machine permits moving from `from` to `to`.
pub fn transition_allowed(from: SessionState, to: SessionState) -> bool {
    use SessionState::*;
    match (from, to) {
        (Connecting, Handshaking) => true,
        (Handshaking, Status) | (Handshaking, Login) => true,
        (Login, Configuration) => true,
        (Configuration, Play) => true,
        (Disconnecting, Disconnected) => true,
        (from, Disconnecting) => from.is_active(),
        _ => false,
    }
}

/// Why a session ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisconnectReason {
    /// The peer closed the connection, or the exchange completed.
    ClientClose,
    /// The server is shutting down.
    ServerShutdown,
    /// The idle threshold was exceeded.
    Timeout,
    /// The peer violated the wire contract.
    ProtocolError(String),
    /// An encryption or authentication attempt was rejected.
    AuthFailed(String),
    /// The admission caps were hit.
    ServerFull,
    /// The peer is banned.
    Banned,
    /// The transport failed.
    NetworkError(String),
    /// An invariant violation inside the server.
    InternalError(String),
}

impl DisconnectReason {
    pub fn as_label(&self) -> &'static str {
        match self {
            DisconnectReason::ClientClose => "client-close",
            DisconnectReason::ServerShutdown => "server-shutdown",
            DisconnectReason::Timeout => "timeout",
            DisconnectReason::ProtocolError(_) => "protocol-error",
            DisconnectReason::AuthFailed(_) => "auth-failed",
            DisconnectReason::ServerFull => "server-full",
            DisconnectReason::Banned => "banned",
            DisconnectReason::NetworkError(_) => "network-error",
            DisconnectReason::InternalError(_) => "internal-error",
        }
    }

    /// The plain text presented to the client in a farewell packet.
    fn client_text(&self) -> String {
        match self {
            DisconnectReason::ClientClose => "Disconnected".to_owned(),
            DisconnectReason::ServerShutdown => "Server is shutting down".to_owned(),
            DisconnectReason::Timeout => "Timed out".to_owned(),
            DisconnectReason::ProtocolError(msg) => format!("Protocol error: {msg}"),
            DisconnectReason::AuthFailed(msg) => format!("Authentication failed: {msg}"),
            DisconnectReason::ServerFull => "Server is full".to_owned(),
            DisconnectReason::Banned => "You are banned from this server".to_owned(),
            DisconnectReason::NetworkError(_) | DisconnectReason::InternalError(_) => {
                "Internal server error".to_owned()
            }
        }
    }
}

impl fmt::Display for DisconnectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DisconnectReason::ProtocolError(msg) => write!(f, "protocol error: {msg}"),
            DisconnectReason::AuthFailed(msg) => write!(f, "authentication failed: {msg}"),
            DisconnectReason::NetworkError(msg) => write!(f, "network error: {msg}"),
            DisconnectReason::InternalError(msg) => write!(f, "internal error: {msg}"),
            other => f.write_str(other.as_label()),
        }
    }
}

/// The mutable identity a session accumulates while it logs in.
#[derive(Debug, Default)]
struct PlayerProfile {
    name: Option<String>,
    uuid: Option<Uuid>,
    brand: Option<String>,
    settings: Option<configuration::ClientSettings>,
}

#[derive(Debug, Default)]
struct TransferCounters {
    bytes_in: AtomicU64,
    bytes_out: AtomicU64,
    packets_in: AtomicU64,
    packets_out: AtomicU64,
    dropped_frames: AtomicU64,
}

/// A point-in-time copy of a session's transfer counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionStats {
    pub bytes_in: u64,
    pub bytes_out: u64,
    pub packets_in: u64,
    pub packets_out: u64,
    pub dropped_frames: u64,
}

/// One client connection.
///
/// The session itself is I/O-free shared state: the protocol state machine,
/// the player identity, the outbound frame queue and the transfer counters.
/// The socket lives in the driver task spawned by the listener; handlers
/// and the manager reach the session only through this shared handle, which
/// is why every field is behind an atomic or a short-lived lock.
pub struct Session {
    id: String,
    peer_addr: SocketAddr,
    state: AtomicU8,
    protocol_version: AtomicI32,
    compression_threshold: AtomicI32,
    profile: Mutex<PlayerProfile>,
    connect_time: Instant,
    last_activity: Mutex<Instant>,
    last_keep_alive: Mutex<Instant>,
    counters: TransferCounters,
    outgoing: Mutex<VecDeque<Vec<u8>>>,
    outgoing_signal: Notify,
    sending: AtomicBool,
    max_queued: usize,
    shutdown: CancellationToken,
    disconnect_reason: Mutex<Option<DisconnectReason>>,
    disconnect_fired: AtomicBool,
}

impl Session {
    pub(crate) fn new(id: String, peer_addr: SocketAddr, max_queued: usize) -> Arc<Self> {
        let now = Instant::now();
        Arc::new(Self {
            id,
            peer_addr,
            state: AtomicU8::new(SessionState::Connecting as u8),
            protocol_version: AtomicI32::new(0),
            compression_threshold: AtomicI32::new(-1),
            profile: Mutex::new(PlayerProfile::default()),
            connect_time: now,
            last_activity: Mutex::new(now),
            last_keep_alive: Mutex::new(now),
            counters: TransferCounters::default(),
            outgoing: Mutex::new(VecDeque::new()),
            outgoing_signal: Notify::new(),
            sending: AtomicBool::new(false),
            max_queued,
            shutdown: CancellationToken::new(),
            disconnect_reason: Mutex::new(None),
            disconnect_fired: AtomicBool::new(false),
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.peer_addr
    }

    pub fn state(&self) -> SessionState {
        SessionState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Advances the state machine, refusing transitions outside the table.
    ///
    /// A refused transition is not an error: a handler may race a
    /// disconnect, and the disconnect must win.
    pub(crate) fn set_state(&self, next: SessionState) {
        let mut current = self.state.load(Ordering::Acquire);
        loop {
            let previous = SessionState::from_u8(current);
            if previous == next {
                return;
            }
            if !transition_allowed(previous, next) {
                trace!(
                    session = %self.id,
                    from = previous.as_str(),
                    to = next.as_str(),
                    "refusing state transition"
                );
                return;
            }
            match self.state.compare_exchange(
                current,
                next as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => {
                    trace!(
                        session = %self.id,
                        from = previous.as_str(),
                        to = next.as_str(),
                        "session state changed"
                    );
                    return;
                }
                Err(actual) => current = actual,
            }
        }
    }

    pub fn is_active(&self) -> bool {
        self.state().is_active()
    }

    pub fn protocol_version(&self) -> VarInt {
        self.protocol_version.load(Ordering::Relaxed)
    }

    pub(crate) fn set_protocol_version(&self, version: VarInt) {
        self.protocol_version.store(version, Ordering::Relaxed);
    }

    /// The negotiated compression threshold, if the login enabled one.
    pub fn compression_threshold(&self) -> Option<VarInt> {
        let threshold = self.compression_threshold.load(Ordering::Acquire);
        (threshold >= 0).then_some(threshold)
    }

    pub(crate) fn enable_compression(&self, threshold: VarInt) {
        self.compression_threshold.store(threshold, Ordering::Release);
    }

    pub fn player_name(&self) -> Option<String> {
        self.profile.lock().unwrap().name.clone()
    }

    pub fn player_uuid(&self) -> Option<Uuid> {
        self.profile.lock().unwrap().uuid
    }

    pub(crate) fn set_player(&self, name: String, uuid: Uuid) {
        let mut profile = self.profile.lock().unwrap();
        profile.name = Some(name);
        profile.uuid = Some(uuid);
    }

    pub fn client_brand(&self) -> Option<String> {
        self.profile.lock().unwrap().brand.clone()
    }

    pub(crate) fn set_client_brand(&self, brand: String) {
        self.profile.lock().unwrap().brand = Some(brand);
    }

    pub fn client_settings(&self) -> Option<configuration::ClientSettings> {
        self.profile.lock().unwrap().settings.clone()
    }

    pub(crate) fn set_client_settings(&self, settings: configuration::ClientSettings) {
        self.profile.lock().unwrap().settings = Some(settings);
    }

    pub fn uptime(&self) -> Duration {
        self.connect_time.elapsed()
    }

    /// Marks the session as active right now.
    pub fn touch(&self) {
        *self.last_activity.lock().unwrap() = Instant::now();
    }

    pub fn idle_for(&self) -> Duration {
        self.last_activity.lock().unwrap().elapsed()
    }

    pub(crate) fn since_keep_alive(&self) -> Duration {
        self.last_keep_alive.lock().unwrap().elapsed()
    }

    pub(crate) fn mark_keep_alive(&self) {
        *self.last_keep_alive.lock().unwrap() = Instant::now();
    }

    pub fn stats(&self) -> SessionStats {
        SessionStats {
            bytes_in: self.counters.bytes_in.load(Ordering::Relaxed),
            bytes_out: self.counters.bytes_out.load(Ordering::Relaxed),
            packets_in: self.counters.packets_in.load(Ordering::Relaxed),
            packets_out: self.counters.packets_out.load(Ordering::Relaxed),
            dropped_frames: self.counters.dropped_frames.load(Ordering::Relaxed),
        }
    }

    pub(crate) fn record_received_bytes(&self, count: usize) {
        self.counters
            .bytes_in
            .fetch_add(count as u64, Ordering::Relaxed);
    }

    pub(crate) fn record_received_packet(&self) {
        self.counters.packets_in.fetch_add(1, Ordering::Relaxed);
        crate::metrics::PACKETS
            .get_or_create(&crate::metrics::PacketLabels {
                direction: "serverbound",
            })
            .inc();
    }

    fn record_sent_frame(&self, bytes: usize) {
        self.counters
            .bytes_out
            .fetch_add(bytes as u64, Ordering::Relaxed);
        self.counters.packets_out.fetch_add(1, Ordering::Relaxed);
        crate::metrics::PACKETS
            .get_or_create(&crate::metrics::PacketLabels {
                direction: "clientbound",
            })
            .inc();
    }

    pub(crate) fn token(&self) -> &CancellationToken {
        &self.shutdown
    }

    /// Encodes a packet into a wire frame and queues it for sending.
    pub fn send_packet<P: EncodePacket>(&self, packet: &P) -> Result<(), SessionError> {
        let mut body = FrameBuffer::new();
        body.write_varint(P::ID);
        packet.encode(&mut body)?;
        let frame = frame::encode_frame(&body, self.compression_threshold())?;
        self.enqueue_frame(frame);
        Ok(())
    }

    /// Queues an already framed byte sequence.
    ///
    /// A full queue drops the new frame: callers are trusted server code,
    /// and a stale client beats a dead session.
    pub(crate) fn enqueue_frame(&self, frame: Vec<u8>) {
        {
            let mut outgoing = self.outgoing.lock().unwrap();
            if outgoing.len() >= self.max_queued {
                self.counters.dropped_frames.fetch_add(1, Ordering::Relaxed);
                crate::metrics::DROPPED_FRAMES
                    .get_or_create(&crate::metrics::DroppedFramesLabels {})
                    .inc();
                warn!(
                    session = %self.id,
                    queued = outgoing.len(),
                    "outbound queue full, dropping frame"
                );
                return;
            }
            outgoing.push_back(frame);
        }
        self.outgoing_signal.notify_one();
    }

    pub(crate) fn pop_outgoing(&self) -> Option<Vec<u8>> {
        self.outgoing.lock().unwrap().pop_front()
    }

    pub fn queued_frames(&self) -> usize {
        self.outgoing.lock().unwrap().len()
    }

    /// Initiates a disconnect; only the first reason wins.
    ///
    /// In the states that define a farewell packet one is queued before the
    /// session task is cancelled, so it still reaches the wire during the
    /// final egress drain.
    pub fn disconnect(&self, reason: DisconnectReason) {
        {
            let mut slot = self.disconnect_reason.lock().unwrap();
            if slot.is_some() {
                return;
            }
            *slot = Some(reason.clone());
        }

        debug!(session = %self.id, reason = %reason, "disconnecting session");
        let text = reason.client_text();
        let result = match self.state() {
            SessionState::Login => self.send_packet(&login::clientbound::DisconnectPacket {
                reason: serde_json::json!({ "text": text }).to_string(),
            }),
            SessionState::Configuration => {
                self.send_packet(&configuration::clientbound::DisconnectPacket { reason: text })
            }
            SessionState::Play => {
                self.send_packet(&play::clientbound::DisconnectPacket { reason: text })
            }
            _ => Ok(()),
        };
        if let Err(err) = result {
            debug!(session = %self.id, cause = %err, "failed to queue farewell packet");
        }

        self.set_state(SessionState::Disconnecting);
        self.shutdown.cancel();
    }

    /// The reason recorded by the first [`disconnect`](Self::disconnect)
    /// call, if any.
    pub fn disconnect_reason(&self) -> Option<DisconnectReason> {
        self.disconnect_reason.lock().unwrap().clone()
    }

    /// Flips the one-shot disconnect latch; true on the first call only.
    pub(crate) fn mark_disconnect_fired(&self) -> bool {
        !self.disconnect_fired.swap(true, Ordering::AcqRel)
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("peer_addr", &self.peer_addr)
            .field("state", &self.state())
            .finish()
    }
}

/// Runs one session to completion: splits the stream, pumps ingress and
/// egress, and reports the final disconnect to the manager exactly once.
pub(crate) async fn drive(
    session: Arc<Session>,
    stream: TcpStream,
    dispatcher: Arc<Dispatcher>,
    manager: Arc<SessionManager>,
) {
    session.set_state(SessionState::Handshaking);
    let (reader, writer) = stream.into_split();

    let egress = tokio::spawn(egress_loop(Arc::clone(&session), writer));
    ingress_loop(&session, reader, &dispatcher).await;

    // the exchange may have ended without an explicit reason (clean EOF)
    session.disconnect(DisconnectReason::ClientClose);
    let _ = egress.await;

    let reason = session
        .disconnect_reason()
        .unwrap_or(DisconnectReason::ClientClose);
    manager.finish_session(&session, &reason);
}

async fn ingress_loop(
    session: &Arc<Session>,
    mut reader: OwnedReadHalf,
    dispatcher: &Arc<Dispatcher>,
) {
    let mut buf = FrameBuffer::with_capacity(RECEIVE_BUFFER_SIZE);
    let mut scratch = Vec::new();
    let max_capacity = dispatcher.options().max_packet_size as usize + 16;

    while session.is_active() {
        if buf.writable_bytes() == 0 {
            buf.compact();
            if buf.writable_bytes() == 0 {
                if buf.capacity() >= max_capacity {
                    session.disconnect(DisconnectReason::InternalError(
                        "receive buffer overflow".to_owned(),
                    ));
                    break;
                }
                buf.reserve_writable(RECEIVE_BUFFER_SIZE);
            }
        }

        let received = tokio::select! {
            biased;
            () = session.token().cancelled() => break,
            received = reader.read(buf.writable_region()) => received,
        };

        match received {
            Ok(0) => {
                session.disconnect(DisconnectReason::ClientClose);
                break;
            }
            Ok(count) => {
                buf.advance_write_position(count)
                    .expect("read cannot exceed the writable region");
                session.record_received_bytes(count);
                session.touch();

                // a legacy server list ping is a bare 0xFE, not a frame
                if session.state() == SessionState::Handshaking
                    && matches!(buf.peek_u8(), Ok(LEGACY_PING_BYTE))
                {
                    session.enqueue_frame(dispatcher.legacy_ping_response());
                    session.disconnect(DisconnectReason::ClientClose);
                    break;
                }

                if let Err(reason) = dispatcher.process_buffer(session, &mut buf, &mut scratch) {
                    session.disconnect(reason);
                    break;
                }
            }
            Err(err) => {
                session.disconnect(DisconnectReason::NetworkError(err.to_string()));
                break;
            }
        }
    }
}

async fn egress_loop(session: Arc<Session>, mut writer: OwnedWriteHalf) {
    loop {
        while let Some(frame) = session.pop_outgoing() {
            session.sending.store(true, Ordering::Release);
            if let Err(err) = writer.write_all(&frame).await {
                session.sending.store(false, Ordering::Release);
                session.disconnect(DisconnectReason::NetworkError(err.to_string()));
                return;
            }
            session.record_sent_frame(frame.len());
        }
        session.sending.store(false, Ordering::Release);

        tokio::select! {
            biased;
            () = session.token().cancelled() => break,
            () = session.outgoing_signal.notified() => {}
        }
    }

    // flush farewell frames queued by the disconnect before closing
    while let Some(frame) = session.pop_outgoing() {
        if writer.write_all(&frame).await.is_err() {
            break;
        }
        session.record_sent_frame(frame.len());
    }
    let _ = writer.shutdown().await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use hearth_packets::Packet;
    use std::net::{IpAddr, Ipv4Addr};

    fn test_session(max_queued: usize) -> Arc<Session> {
        Session::new(
            "test-session".to_owned(),
            SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 40000),
            max_queued,
        )
    }

    #[test]
    fn only_specified_transitions_are_legal() {
        use SessionState::*;
        let all = [
            Connecting,
            Handshaking,
            Status,
            Login,
            Configuration,
            Play,
            Disconnecting,
            Disconnected,
        ];

        let legal = [
            (Connecting, Handshaking),
            (Handshaking, Status),
            (Handshaking, Login),
            (Login, Configuration),
            (Configuration, Play),
            (Connecting, Disconnecting),
            (Handshaking, Disconnecting),
            (Status, Disconnecting),
            (Login, Disconnecting),
            (Configuration, Disconnecting),
            (Play, Disconnecting),
            (Disconnecting, Disconnected),
        ];

        for from in all {
            for to in all {
                assert_eq!(
                    transition_allowed(from, to),
                    legal.contains(&(from, to)),
                    "{from} -> {to}"
                );
            }
        }
    }

    #[tokio::test]
    async fn full_queue_drops_new_frames() {
        let session = test_session(2);
        session.enqueue_frame(vec![1]);
        session.enqueue_frame(vec![2]);
        session.enqueue_frame(vec![3]);

        assert_eq!(session.queued_frames(), 2);
        assert_eq!(session.stats().dropped_frames, 1);
        assert_eq!(session.pop_outgoing(), Some(vec![1]));
        assert_eq!(session.pop_outgoing(), Some(vec![2]));
        assert_eq!(session.pop_outgoing(), None);
    }

    #[tokio::test]
    async fn first_disconnect_reason_wins() {
        let session = test_session(16);
        session.set_state(SessionState::Handshaking);

        session.disconnect(DisconnectReason::Timeout);
        session.disconnect(DisconnectReason::ServerShutdown);

        assert_eq!(session.disconnect_reason(), Some(DisconnectReason::Timeout));
        assert_eq!(session.state(), SessionState::Disconnecting);
        assert!(session.token().is_cancelled());

        // the one-shot latch fires exactly once
        assert!(session.mark_disconnect_fired());
        assert!(!session.mark_disconnect_fired());
    }

    #[tokio::test]
    async fn disconnect_in_play_queues_farewell_frame() {
        let session = test_session(16);
        session.set_state(SessionState::Handshaking);
        session.set_state(SessionState::Login);
        session.set_state(SessionState::Configuration);
        session.set_state(SessionState::Play);

        session.disconnect(DisconnectReason::Timeout);
        assert_eq!(session.queued_frames(), 1);

        let frame = session.pop_outgoing().unwrap();
        // frame: length prefix, packet id, then the text component
        let mut view = hearth_packets::PacketView::new(&frame);
        let length = view.read_varint().unwrap();
        assert_eq!(length as usize, view.remaining());
        assert_eq!(
            view.read_varint().unwrap(),
            hearth_packets::play::clientbound::DisconnectPacket::ID
        );
    }

    #[tokio::test]
    async fn handshaking_disconnect_sends_nothing() {
        let session = test_session(16);
        session.set_state(SessionState::Handshaking);
        session.disconnect(DisconnectReason::ProtocolError("bad frame".to_owned()));
        assert_eq!(session.queued_frames(), 0);
    }
}
