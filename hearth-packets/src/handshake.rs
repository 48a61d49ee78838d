use crate::{Error, NextState, Packet, VarInt};
#[cfg(test)]
use fake::Dummy;

/// The single byte that opens a legacy (pre-Netty) server list ping instead
/// of a regular frame. It can only ever appear as the very first byte of a
/// connection.
pub const LEGACY_PING_BYTE: u8 = 0xFE;

pub mod serverbound {
    use super::*;
    use crate::{DecodePacket, EncodePacket, FrameBuffer, PacketView};

    /// The [`HandshakePacket`].
    ///
    /// This packet switches the connection into the requested next state. It
    /// is the only regular packet defined for the handshaking state and is
    /// sent right after opening the TCP connection.
    ///
    /// [Minecraft Docs](https://minecraft.wiki/w/Java_Edition_protocol#Handshake)
    #[derive(Debug, Clone, Eq, PartialEq)]
    #[cfg_attr(test, derive(Dummy))]
    pub struct HandshakePacket {
        /// The protocol version the client speaks.
        pub protocol_version: VarInt,
        /// The server address the client used to connect.
        pub server_address: String,
        /// The server port the client used to connect.
        pub server_port: u16,
        /// The protocol state to initiate.
        pub next_state: NextState,
    }

    impl Packet for HandshakePacket {
        const ID: VarInt = 0x00;
    }

    impl EncodePacket for HandshakePacket {
        fn encode(&self, buffer: &mut FrameBuffer) -> Result<(), Error> {
            buffer.write_varint(self.protocol_version);
            buffer.write_string(&self.server_address)?;
            buffer.write_u16(self.server_port);
            buffer.write_varint(self.next_state.into());

            Ok(())
        }
    }

    impl DecodePacket for HandshakePacket {
        fn decode(view: &mut PacketView<'_>) -> Result<Self, Error> {
            let protocol_version = view.read_varint()?;
            let server_address = view.read_string()?;
            let server_port = view.read_u16()?;
            let next_state = view.read_varint()?.try_into()?;

            Ok(Self {
                protocol_version,
                server_address,
                server_port,
                next_state,
            })
        }
    }
}

/// Builds the reply to a legacy server list ping: a `0xFF` kick id, a
/// big-endian UTF-16 code unit count and the `§1`-prefixed field list,
/// each field separated by a NUL.
pub fn legacy_ping_response(
    protocol_version: VarInt,
    version_name: &str,
    motd: &str,
    online_players: usize,
    max_players: usize,
) -> Vec<u8> {
    let body = format!("§1\0{protocol_version}\0{version_name}\0{motd}\0{online_players}\0{max_players}");
    let units: Vec<u16> = body.encode_utf16().collect();

    let mut out = Vec::with_capacity(3 + units.len() * 2);
    out.push(0xFF);
    out.extend_from_slice(&(units.len() as u16).to_be_bytes());
    for unit in units {
        out.extend_from_slice(&unit.to_be_bytes());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::assert_packet;

    #[test]
    fn write_read_serverbound_handshake_packet() {
        assert_packet::<serverbound::HandshakePacket>(0x00);
    }

    #[test]
    fn legacy_ping_response_layout() {
        let response = legacy_ping_response(765, "1.20.4", "A Minecraft Server", 0, 100);
        assert_eq!(response[0], 0xFF);

        let unit_count = u16::from_be_bytes([response[1], response[2]]) as usize;
        assert_eq!(response.len(), 3 + unit_count * 2);

        // the payload opens with the § (U+00A7) colour marker and a '1'
        assert_eq!(u16::from_be_bytes([response[3], response[4]]), 0x00A7);
        assert_eq!(u16::from_be_bytes([response[5], response[6]]), u16::from(b'1'));
    }
}
