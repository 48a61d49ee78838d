use crate::{Error, Packet, VarInt};
#[cfg(test)]
use fake::Dummy;

pub mod clientbound {
    use super::*;
    use crate::{DecodePacket, EncodePacket, FrameBuffer, PacketView};

    /// The [`StatusResponsePacket`].
    ///
    /// Carries the self-reported server metadata as a single JSON string.
    /// It is only sent in response to a [`StatusRequestPacket`](super::serverbound::StatusRequestPacket)
    /// and keeps the connection open for the ping sequence afterwards.
    ///
    /// [Minecraft Docs](https://minecraft.wiki/w/Java_Edition_protocol#Status_Response)
    #[derive(Debug, Clone, Eq, PartialEq)]
    #[cfg_attr(test, derive(Dummy))]
    pub struct StatusResponsePacket {
        /// The JSON response body that contains all server metadata.
        pub body: String,
    }

    impl Packet for StatusResponsePacket {
        const ID: VarInt = 0x00;
    }

    impl EncodePacket for StatusResponsePacket {
        fn encode(&self, buffer: &mut FrameBuffer) -> Result<(), Error> {
            buffer.write_string(&self.body)?;

            Ok(())
        }
    }

    impl DecodePacket for StatusResponsePacket {
        fn decode(view: &mut PacketView<'_>) -> Result<Self, Error> {
            let body = view.read_string()?;

            Ok(Self { body })
        }
    }

    /// The [`PongResponsePacket`].
    ///
    /// Echoes the payload of the corresponding ping request and ends the
    /// server list ping sequence.
    ///
    /// [Minecraft Docs](https://minecraft.wiki/w/Java_Edition_protocol#Pong_Response_(status))
    #[derive(Debug, Clone, Eq, PartialEq)]
    #[cfg_attr(test, derive(Dummy))]
    pub struct PongResponsePacket {
        /// The arbitrary payload that was sent by the client.
        pub payload: i64,
    }

    impl Packet for PongResponsePacket {
        const ID: VarInt = 0x01;
    }

    impl EncodePacket for PongResponsePacket {
        fn encode(&self, buffer: &mut FrameBuffer) -> Result<(), Error> {
            buffer.write_i64(self.payload);

            Ok(())
        }
    }

    impl DecodePacket for PongResponsePacket {
        fn decode(view: &mut PacketView<'_>) -> Result<Self, Error> {
            let payload = view.read_i64()?;

            Ok(Self { payload })
        }
    }
}

pub mod serverbound {
    use super::*;
    use crate::{DecodePacket, EncodePacket, FrameBuffer, PacketView};

    /// The [`StatusRequestPacket`].
    ///
    /// The status can only be requested once, immediately after the
    /// handshake; the packet itself is empty.
    ///
    /// [Minecraft Docs](https://minecraft.wiki/w/Java_Edition_protocol#Status_Request)
    #[derive(Debug, Clone, Eq, PartialEq)]
    #[cfg_attr(test, derive(Dummy))]
    pub struct StatusRequestPacket;

    impl Packet for StatusRequestPacket {
        const ID: VarInt = 0x00;
    }

    impl EncodePacket for StatusRequestPacket {
        fn encode(&self, _buffer: &mut FrameBuffer) -> Result<(), Error> {
            Ok(())
        }
    }

    impl DecodePacket for StatusRequestPacket {
        fn decode(_view: &mut PacketView<'_>) -> Result<Self, Error> {
            Ok(Self)
        }
    }

    /// The [`PingRequestPacket`].
    ///
    /// [Minecraft Docs](https://minecraft.wiki/w/Java_Edition_protocol#Ping_Request_(status))
    #[derive(Debug, Clone, Eq, PartialEq)]
    #[cfg_attr(test, derive(Dummy))]
    pub struct PingRequestPacket {
        /// The arbitrary payload that will be echoed back by the server.
        pub payload: i64,
    }

    impl Packet for PingRequestPacket {
        const ID: VarInt = 0x01;
    }

    impl EncodePacket for PingRequestPacket {
        fn encode(&self, buffer: &mut FrameBuffer) -> Result<(), Error> {
            buffer.write_i64(self.payload);

            Ok(())
        }
    }

    impl DecodePacket for PingRequestPacket {
        fn decode(view: &mut PacketView<'_>) -> Result<Self, Error> {
            let payload = view.read_i64()?;

            Ok(Self { payload })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::assert_packet;

    #[test]
    fn write_read_clientbound_status_response_packet() {
        assert_packet::<clientbound::StatusResponsePacket>(0x00);
    }

    #[test]
    fn write_read_clientbound_pong_packet() {
        assert_packet::<clientbound::PongResponsePacket>(0x01);
    }

    #[test]
    fn write_read_serverbound_status_request_packet() {
        assert_packet::<serverbound::StatusRequestPacket>(0x00);
    }

    #[test]
    fn write_read_serverbound_ping_packet() {
        assert_packet::<serverbound::PingRequestPacket>(0x01);
    }
}
