use crate::dispatcher::{Dispatcher, HandlerOutcome};
use crate::error::SessionError;
use crate::session::Session;
use hearth_packets::play::serverbound as play_in;
use hearth_packets::{DecodePacket, Packet, PacketView, VarInt};
use std::sync::Arc;
use tracing::{debug, warn};

/// Coordinates further than this from the origin are treated as hostile.
const MAX_COORDINATE: f64 = 30_000_000.0;
const MAX_CHAT_LENGTH: usize = 256;

/// Routes one play-state packet.
///
/// A garbled movement stream means an actively misbehaving client, so
/// movement validation failures are fatal. A single malformed action is
/// often a race (a block broken right as the chunk unloaded), so action
/// validation failures only drop the packet. Unknown ids are skipped to
/// tolerate partial protocol coverage.
pub(crate) fn handle(
    _dispatcher: &Dispatcher,
    session: &Arc<Session>,
    packet_id: VarInt,
    view: &mut PacketView<'_>,
) -> Result<HandlerOutcome, SessionError> {
    match packet_id {
        play_in::ConfirmTeleportationPacket::ID => {
            let packet = play_in::ConfirmTeleportationPacket::decode(view)?;
            debug!(
                session = session.id(),
                teleport_id = packet.teleport_id,
                "teleport confirmed"
            );
            session.touch();
            Ok(HandlerOutcome::Continue)
        }
        play_in::ChatMessagePacket::ID => {
            let packet = play_in::ChatMessagePacket::decode(view)?;
            session.touch();
            if packet.message.chars().count() > MAX_CHAT_LENGTH {
                warn!(
                    session = session.id(),
                    length = packet.message.chars().count(),
                    "dropping over-long chat message"
                );
                return Ok(HandlerOutcome::Continue);
            }
            debug!(
                session = session.id(),
                message = packet.message,
                "chat message"
            );
            Ok(HandlerOutcome::Continue)
        }
        play_in::ClientInformationPacket::ID => {
            let packet = play_in::ClientInformationPacket::decode(view)?;
            session.set_client_settings(packet.settings.clamped());
            Ok(HandlerOutcome::Continue)
        }
        play_in::KeepAlivePacket::ID => {
            let packet = play_in::KeepAlivePacket::decode(view)?;
            debug!(session = session.id(), id = packet.id, "keep-alive answered");
            session.touch();
            Ok(HandlerOutcome::Continue)
        }
        play_in::SetPlayerPositionPacket::ID => {
            let packet = play_in::SetPlayerPositionPacket::decode(view)?;
            validate_position(packet.x, packet.feet_y, packet.z)?;
            session.touch();
            Ok(HandlerOutcome::Continue)
        }
        play_in::SetPlayerPositionAndRotationPacket::ID => {
            let packet = play_in::SetPlayerPositionAndRotationPacket::decode(view)?;
            validate_position(packet.x, packet.feet_y, packet.z)?;
            let _pitch = validate_rotation(packet.yaw, packet.pitch)?;
            session.touch();
            Ok(HandlerOutcome::Continue)
        }
        play_in::SetPlayerRotationPacket::ID => {
            let packet = play_in::SetPlayerRotationPacket::decode(view)?;
            let _pitch = validate_rotation(packet.yaw, packet.pitch)?;
            session.touch();
            Ok(HandlerOutcome::Continue)
        }
        play_in::SetPlayerOnGroundPacket::ID => {
            let _ = play_in::SetPlayerOnGroundPacket::decode(view)?;
            session.touch();
            Ok(HandlerOutcome::Continue)
        }
        play_in::PlayerActionPacket::ID => {
            let packet = play_in::PlayerActionPacket::decode(view)?;
            session.touch();
            if !(0..=6).contains(&packet.status) || packet.face > 5 {
                debug!(
                    session = session.id(),
                    status = packet.status,
                    face = packet.face,
                    "dropping out-of-range player action"
                );
                return Ok(HandlerOutcome::Continue);
            }
            debug!(
                session = session.id(),
                status = packet.status,
                x = packet.position.x,
                y = packet.position.y,
                z = packet.position.z,
                "player action"
            );
            Ok(HandlerOutcome::Continue)
        }
        play_in::UseItemOnPacket::ID => {
            let packet = play_in::UseItemOnPacket::decode(view)?;
            session.touch();
            let cursor_valid = [packet.cursor_x, packet.cursor_y, packet.cursor_z]
                .iter()
                .all(|axis| (0.0..=1.0).contains(axis));
            if !(0..=1).contains(&packet.hand) || !(0..=5).contains(&packet.face) || !cursor_valid {
                debug!(session = session.id(), "dropping out-of-range use-item-on");
                return Ok(HandlerOutcome::Continue);
            }
            Ok(HandlerOutcome::Continue)
        }
        play_in::UseItemPacket::ID => {
            let packet = play_in::UseItemPacket::decode(view)?;
            session.touch();
            if !(0..=1).contains(&packet.hand) {
                debug!(session = session.id(), hand = packet.hand, "dropping use-item");
                return Ok(HandlerOutcome::Continue);
            }
            Ok(HandlerOutcome::Continue)
        }
        play_in::SwingArmPacket::ID => {
            let packet = play_in::SwingArmPacket::decode(view)?;
            session.touch();
            if !(0..=1).contains(&packet.hand) {
                debug!(session = session.id(), hand = packet.hand, "dropping swing-arm");
                return Ok(HandlerOutcome::Continue);
            }
            Ok(HandlerOutcome::Continue)
        }
        id => {
            // tolerate packets this server does not know yet
            view.read_remaining();
            debug!(
                session = session.id(),
                packet_id = format_args!("0x{id:02X}"),
                "skipping unhandled play packet"
            );
            session.touch();
            Ok(HandlerOutcome::Continue)
        }
    }
}

fn validate_position(x: f64, feet_y: f64, z: f64) -> Result<(), SessionError> {
    if !x.is_finite() || !feet_y.is_finite() || !z.is_finite() {
        return Err(SessionError::Protocol(
            "non-finite player coordinates".to_owned(),
        ));
    }
    if x.abs() > MAX_COORDINATE || z.abs() > MAX_COORDINATE || !(-2048.0..=2048.0).contains(&feet_y)
    {
        return Err(SessionError::Protocol(format!(
            "player coordinates out of bounds ({x:.1}, {feet_y:.1}, {z:.1})"
        )));
    }
    Ok(())
}

fn validate_rotation(yaw: f32, pitch: f32) -> Result<f32, SessionError> {
    if !yaw.is_finite() || !pitch.is_finite() {
        return Err(SessionError::Protocol(
            "non-finite player rotation".to_owned(),
        ));
    }
    Ok(pitch.clamp(-90.0, 90.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn position_bounds() {
        assert!(validate_position(0.0, 64.0, 0.0).is_ok());
        assert!(validate_position(29_999_999.0, -2048.0, -29_999_999.0).is_ok());
        assert!(validate_position(f64::NAN, 64.0, 0.0).is_err());
        assert!(validate_position(0.0, f64::INFINITY, 0.0).is_err());
        assert!(validate_position(30_000_001.0, 64.0, 0.0).is_err());
        assert!(validate_position(0.0, 64.0, -30_000_001.0).is_err());
        assert!(validate_position(0.0, 2049.0, 0.0).is_err());
    }

    #[test]
    fn rotation_clamps_pitch() {
        assert_eq!(validate_rotation(0.0, 120.0).unwrap(), 90.0);
        assert_eq!(validate_rotation(0.0, -120.0).unwrap(), -90.0);
        assert_eq!(validate_rotation(350.0, 45.0).unwrap(), 45.0);
        assert!(validate_rotation(f32::NAN, 0.0).is_err());
        assert!(validate_rotation(0.0, f32::NEG_INFINITY).is_err());
    }
}
