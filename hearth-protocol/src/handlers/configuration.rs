use crate::dispatcher::{Dispatcher, HandlerOutcome, unknown_packet};
use crate::error::SessionError;
use crate::options::ServerOptions;
use crate::session::{Session, SessionState};
use hearth_packets::configuration::serverbound as conf_in;
use hearth_packets::play::clientbound as play_out;
use hearth_packets::{DecodePacket, Packet, PacketView, VarInt};
use std::sync::Arc;
use tracing::{debug, info};

const MAX_CHANNEL_LENGTH: usize = 256;
const BRAND_CHANNEL: &str = "minecraft:brand";

pub(crate) fn handle(
    dispatcher: &Dispatcher,
    session: &Arc<Session>,
    packet_id: VarInt,
    view: &mut PacketView<'_>,
) -> Result<HandlerOutcome, SessionError> {
    match packet_id {
        conf_in::ClientInformationPacket::ID => {
            let packet = conf_in::ClientInformationPacket::decode(view)?;
            let settings = packet.settings.clamped();
            debug!(
                session = session.id(),
                locale = settings.locale,
                view_distance = settings.view_distance,
                chat_mode = settings.chat_mode,
                "received client information"
            );
            session.set_client_settings(settings);
            Ok(HandlerOutcome::Continue)
        }
        conf_in::PluginMessagePacket::ID => {
            let packet = conf_in::PluginMessagePacket::decode(view)?;
            if packet.channel.is_empty() || packet.channel.len() > MAX_CHANNEL_LENGTH {
                return Err(SessionError::Protocol(format!(
                    "plugin channel of {} bytes exceeds {MAX_CHANNEL_LENGTH}",
                    packet.channel.len()
                )));
            }

            if packet.channel == BRAND_CHANNEL {
                // the brand payload is itself a length-prefixed string
                let mut brand_view = PacketView::new(&packet.data);
                match brand_view.read_str() {
                    Ok(brand) => {
                        info!(session = session.id(), brand, "received client brand");
                        session.set_client_brand(brand.to_owned());
                    }
                    Err(err) => {
                        debug!(session = session.id(), cause = %err, "unreadable brand payload");
                    }
                }
            } else {
                debug!(
                    session = session.id(),
                    channel = packet.channel,
                    bytes = packet.data.len(),
                    "ignoring plugin message"
                );
            }
            Ok(HandlerOutcome::Continue)
        }
        conf_in::FinishConfigurationPacket::ID => {
            let _ = conf_in::FinishConfigurationPacket::decode(view)?;
            info!(session = session.id(), "client finished configuration");

            session.send_packet(&play_login_packet(dispatcher.options(), session))?;
            Ok(HandlerOutcome::Transition(SessionState::Play))
        }
        conf_in::KeepAlivePacket::ID => {
            // clients that still acknowledge the login after the state
            // switch send an empty 0x03 here; accept it silently
            if view.remaining() == 0 {
                return Ok(HandlerOutcome::Continue);
            }
            let packet = conf_in::KeepAlivePacket::decode(view)?;
            debug!(session = session.id(), id = packet.id, "keep-alive answered");
            session.touch();
            Ok(HandlerOutcome::Continue)
        }
        conf_in::PongPacket::ID => {
            let _ = conf_in::PongPacket::decode(view)?;
            session.touch();
            Ok(HandlerOutcome::Continue)
        }
        conf_in::ResourcePackResponsePacket::ID => {
            let packet = conf_in::ResourcePackResponsePacket::decode(view)?;
            info!(
                session = session.id(),
                pack = %packet.uuid,
                result = ?packet.result,
                "resource pack response"
            );
            Ok(HandlerOutcome::Continue)
        }
        id => Err(unknown_packet(SessionState::Configuration, id)),
    }
}

/// The play-state login packet that answers a finished configuration.
///
/// The world fields are synthetic until a world provider is wired in; a
/// vanilla client accepts them and stays connected.
fn play_login_packet(options: &ServerOptions, session: &Arc<Session>) -> play_out::LoginPacket {
    let view_distance = session
        .client_settings()
        .map_or(10, |settings| i32::from(settings.view_distance));

    play_out::LoginPacket {
        entity_id: 1,
        hardcore: false,
        dimension_names: vec!["minecraft:overworld".to_owned()],
        max_players: options.max_players as i32,
        view_distance,
        simulation_distance: 10,
        reduced_debug_info: false,
        enable_respawn_screen: true,
        limited_crafting: false,
        dimension_type: "minecraft:overworld".to_owned(),
        dimension_name: "minecraft:overworld".to_owned(),
        hashed_seed: 0,
        game_mode: 1,
        previous_game_mode: -1,
        is_debug: false,
        is_flat: false,
        death_location: None,
        portal_cooldown: 0,
    }
}
