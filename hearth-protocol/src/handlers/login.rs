use crate::dispatcher::{Dispatcher, HandlerOutcome, unknown_packet};
use crate::error::SessionError;
use crate::session::{DisconnectReason, Session, SessionState};
use hearth_packets::codec::offline_player_uuid;
use hearth_packets::login::clientbound as login_out;
use hearth_packets::login::serverbound as login_in;
use hearth_packets::{DecodePacket, Packet, PacketView, VarInt};
use regex::Regex;
use std::sync::{Arc, LazyLock};
use tracing::{debug, info};

/// Player names are 3 to 16 word characters; everything else is rejected
/// before it can reach the registry.
static USER_NAME_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("^[A-Za-z0-9_]{3,16}$").expect("invalid user name pattern"));

pub(crate) fn handle(
    dispatcher: &Dispatcher,
    session: &Arc<Session>,
    packet_id: VarInt,
    view: &mut PacketView<'_>,
) -> Result<HandlerOutcome, SessionError> {
    match packet_id {
        login_in::LoginStartPacket::ID => {
            let packet = login_in::LoginStartPacket::decode(view)?;
            if !USER_NAME_PATTERN.is_match(&packet.user_name) {
                return Err(SessionError::Protocol(format!(
                    "invalid user name {:?}",
                    packet.user_name
                )));
            }

            // offline mode: trust the claimed uuid, derive one when absent
            let user_id = packet
                .user_id
                .unwrap_or_else(|| offline_player_uuid(&packet.user_name));

            info!(
                session = session.id(),
                user_name = packet.user_name,
                user_id = %user_id,
                "handling login"
            );

            if let Some(threshold) = dispatcher.options().compression_threshold {
                debug!(session = session.id(), threshold, "enabling compression");
                session.send_packet(&login_out::SetCompressionPacket { threshold })?;
                session.enable_compression(threshold);
            }

            session.set_player(packet.user_name.clone(), user_id);
            session.send_packet(&login_out::LoginSuccessPacket {
                user_id,
                user_name: packet.user_name,
                properties: Vec::new(),
            })?;

            Ok(HandlerOutcome::Transition(SessionState::Configuration))
        }
        login_in::EncryptionResponsePacket::ID => {
            let _ = login_in::EncryptionResponsePacket::decode(view)?;
            Ok(HandlerOutcome::Disconnect(DisconnectReason::AuthFailed(
                "encryption is not available in offline mode".to_owned(),
            )))
        }
        login_in::LoginPluginResponsePacket::ID => {
            let _ = login_in::LoginPluginResponsePacket::decode(view)?;
            Ok(HandlerOutcome::Disconnect(DisconnectReason::ProtocolError(
                "plugins not supported".to_owned(),
            )))
        }
        id => Err(unknown_packet(SessionState::Login, id)),
    }
}
