use crate::error::SessionError;
use crate::handlers;
use crate::manager::SessionManager;
use crate::options::ServerOptions;
use crate::session::{DisconnectReason, Session, SessionState};
use crate::version::version_name;
use hearth_packets::handshake::legacy_ping_response;
use hearth_packets::{FrameBuffer, PacketView, VarInt, frame};
use std::sync::Arc;
use tracing::debug;

/// What a handler wants to happen after it processed a packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandlerOutcome {
    /// Keep going in the current state.
    Continue,
    /// Move the session to the given state.
    Transition(SessionState),
    /// End the session with the given reason.
    Disconnect(DisconnectReason),
}

/// Routes `(session state, packet id)` to the matching handler.
///
/// Packet ids alias across protocol states (`0x00` is the status request in
/// one state and the login start in another), so the session state is part
/// of the routing key. Handlers are plain synchronous functions: they read
/// the view, queue outbound frames on the session and return an outcome,
/// without blocking and without retaining the view.
pub struct Dispatcher {
    options: Arc<ServerOptions>,
    manager: Arc<SessionManager>,
}

impl Dispatcher {
    pub fn new(options: Arc<ServerOptions>, manager: Arc<SessionManager>) -> Arc<Self> {
        Arc::new(Self { options, manager })
    }

    pub fn options(&self) -> &ServerOptions {
        &self.options
    }

    pub(crate) fn manager(&self) -> &SessionManager {
        &self.manager
    }

    /// The reply to a legacy 0xFE server list ping.
    pub(crate) fn legacy_ping_response(&self) -> Vec<u8> {
        legacy_ping_response(
            self.options.protocol_version,
            version_name(self.options.protocol_version),
            &self.options.motd,
            self.manager.count_in_state(SessionState::Play),
            self.options.max_players,
        )
    }

    /// Drains every complete packet frame from the receive buffer.
    ///
    /// Per frame: validate the declared length, build a view over the
    /// payload, read the packet id, route to the handler, and consume the
    /// frame by its declared length no matter how much the handler actually
    /// read. Processing stops at the first incomplete frame, or for good
    /// when a disconnect reason is returned.
    pub fn process_buffer(
        &self,
        session: &Arc<Session>,
        buf: &mut FrameBuffer,
        scratch: &mut Vec<u8>,
    ) -> Result<(), DisconnectReason> {
        while session.is_active() && buf.has_complete_packet() {
            let length = match buf.peek_packet_length() {
                Ok(Some(length)) => length,
                Ok(None) => break,
                Err(err) => return Err(DisconnectReason::ProtocolError(err.to_string())),
            };
            if length <= 0 || length > self.options.max_packet_size {
                return Err(DisconnectReason::ProtocolError(format!(
                    "illegal packet length {length} (limit {})",
                    self.options.max_packet_size
                )));
            }
            let length = length as usize;

            buf.skip_packet_length()
                .map_err(|err| DisconnectReason::InternalError(err.to_string()))?;

            let outcome = {
                let body = buf
                    .peek_bytes(length)
                    .map_err(|err| DisconnectReason::InternalError(err.to_string()))?;
                let payload = if session.compression_threshold().is_some() {
                    frame::decode_compressed_body(body, scratch)
                        .map_err(|err| DisconnectReason::ProtocolError(err.to_string()))?
                } else {
                    body
                };

                let mut view = PacketView::new(payload);
                let packet_id = view
                    .read_varint()
                    .map_err(|err| DisconnectReason::ProtocolError(err.to_string()))?;
                session.record_received_packet();
                self.dispatch(session, packet_id, &mut view)
            };

            // consume by the declared length, tolerating partial reads
            buf.advance_read_position(length)
                .map_err(|err| DisconnectReason::InternalError(err.to_string()))?;

            match outcome {
                Ok(HandlerOutcome::Continue) => {}
                Ok(HandlerOutcome::Transition(next)) => {
                    session.set_state(next);
                    if next == SessionState::Play {
                        self.manager.index_player(session);
                    }
                }
                Ok(HandlerOutcome::Disconnect(reason)) => return Err(reason),
                Err(err) => return Err(err.into()),
            }
        }
        Ok(())
    }

    /// Routes one packet to its handler.
    pub fn dispatch(
        &self,
        session: &Arc<Session>,
        packet_id: VarInt,
        view: &mut PacketView<'_>,
    ) -> Result<HandlerOutcome, SessionError> {
        let state = session.state();
        match state {
            SessionState::Handshaking => handlers::handshaking::handle(self, session, packet_id, view),
            SessionState::Status => handlers::status::handle(self, session, packet_id, view),
            SessionState::Login => handlers::login::handle(self, session, packet_id, view),
            SessionState::Configuration => {
                handlers::configuration::handle(self, session, packet_id, view)
            }
            SessionState::Play => handlers::play::handle(self, session, packet_id, view),
            state => Err(SessionError::Protocol(format!(
                "packet 0x{packet_id:02X} received in state {state}"
            ))),
        }
    }
}

/// The uniform rejection for an id that has no handler in a strict state.
pub(crate) fn unknown_packet(state: SessionState, packet_id: VarInt) -> SessionError {
    debug!(
        state = state.as_str(),
        packet_id = format_args!("0x{packet_id:02X}"),
        "unknown packet id"
    );
    SessionError::Protocol(format!("unknown packet 0x{packet_id:02X} in state {state}"))
}
