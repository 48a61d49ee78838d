use crate::dispatcher::{Dispatcher, HandlerOutcome, unknown_packet};
use crate::error::SessionError;
use crate::session::{Session, SessionState};
use hearth_packets::handshake::serverbound as hand_in;
use hearth_packets::{DecodePacket, NextState, Packet, PacketView, VarInt};
use std::sync::Arc;
use tracing::debug;

const MAX_ADDRESS_LENGTH: usize = 255;

pub(crate) fn handle(
    _dispatcher: &Dispatcher,
    session: &Arc<Session>,
    packet_id: VarInt,
    view: &mut PacketView<'_>,
) -> Result<HandlerOutcome, SessionError> {
    match packet_id {
        hand_in::HandshakePacket::ID => {
            let packet = hand_in::HandshakePacket::decode(view)?;
            if packet.server_address.len() > MAX_ADDRESS_LENGTH {
                return Err(SessionError::Protocol(format!(
                    "handshake address of {} bytes exceeds {MAX_ADDRESS_LENGTH}",
                    packet.server_address.len()
                )));
            }

            session.set_protocol_version(packet.protocol_version);
            debug!(
                session = session.id(),
                protocol_version = packet.protocol_version,
                server_address = packet.server_address,
                server_port = packet.server_port,
                next_state = ?packet.next_state,
                "received handshake"
            );

            Ok(HandlerOutcome::Transition(match packet.next_state {
                NextState::Status => SessionState::Status,
                NextState::Login => SessionState::Login,
            }))
        }
        id => Err(unknown_packet(SessionState::Handshaking, id)),
    }
}
