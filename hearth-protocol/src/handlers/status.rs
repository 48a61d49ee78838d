use crate::dispatcher::{Dispatcher, HandlerOutcome, unknown_packet};
use crate::error::SessionError;
use crate::session::{DisconnectReason, Session, SessionState};
use crate::status::build_status;
use hearth_packets::status::clientbound as status_out;
use hearth_packets::status::serverbound as status_in;
use hearth_packets::{DecodePacket, Packet, PacketView, VarInt};
use std::sync::Arc;
use tracing::debug;

pub(crate) fn handle(
    dispatcher: &Dispatcher,
    session: &Arc<Session>,
    packet_id: VarInt,
    view: &mut PacketView<'_>,
) -> Result<HandlerOutcome, SessionError> {
    match packet_id {
        status_in::StatusRequestPacket::ID => {
            let _ = status_in::StatusRequestPacket::decode(view)?;

            let online = dispatcher.manager().count_in_state(SessionState::Play);
            let status = build_status(dispatcher.options(), online);
            let body = serde_json::to_string(&status)
                .map_err(|err| SessionError::Internal(err.to_string()))?;

            debug!(session = session.id(), "answering status request");
            session.send_packet(&status_out::StatusResponsePacket { body })?;
            Ok(HandlerOutcome::Continue)
        }
        status_in::PingRequestPacket::ID => {
            let ping = status_in::PingRequestPacket::decode(view)?;

            debug!(
                session = session.id(),
                payload = ping.payload,
                "answering ping request"
            );
            session.send_packet(&status_out::PongResponsePacket {
                payload: ping.payload,
            })?;

            // the server list ping sequence ends after the pong
            Ok(HandlerOutcome::Disconnect(DisconnectReason::ClientClose))
        }
        id => Err(unknown_packet(SessionState::Status, id)),
    }
}
