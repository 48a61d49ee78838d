use crate::{Error, Packet, VarInt};
#[cfg(test)]
use fake::Dummy;
use uuid::Uuid;

/// A single entry of a player's profile property list (e.g. the skin
/// texture), forwarded verbatim inside the login success packet.
#[derive(Debug, Clone, Eq, PartialEq)]
#[cfg_attr(test, derive(Dummy))]
pub struct ProfileProperty {
    pub name: String,
    pub value: String,
    pub signature: Option<String>,
}

pub mod serverbound {
    use super::*;
    use crate::{DecodePacket, EncodePacket, FrameBuffer, PacketView};

    /// The [`LoginStartPacket`].
    ///
    /// Opens the login phase with the player name and, for modern clients,
    /// the UUID the client believes it has.
    ///
    /// [Minecraft Docs](https://minecraft.wiki/w/Java_Edition_protocol#Login_Start)
    #[derive(Debug, Clone, Eq, PartialEq)]
    #[cfg_attr(test, derive(Dummy))]
    pub struct LoginStartPacket {
        /// The claimed player name.
        pub user_name: String,
        /// The claimed player UUID, absent on older clients.
        pub user_id: Option<Uuid>,
    }

    impl Packet for LoginStartPacket {
        const ID: VarInt = 0x00;
    }

    impl EncodePacket for LoginStartPacket {
        fn encode(&self, buffer: &mut FrameBuffer) -> Result<(), Error> {
            buffer.write_string(&self.user_name)?;
            buffer.write_bool(self.user_id.is_some());
            if let Some(user_id) = &self.user_id {
                buffer.write_uuid(user_id);
            }

            Ok(())
        }
    }

    impl DecodePacket for LoginStartPacket {
        fn decode(view: &mut PacketView<'_>) -> Result<Self, Error> {
            let user_name = view.read_string()?;
            let user_id = if view.remaining() > 0 && view.read_bool()? {
                Some(view.read_uuid()?)
            } else {
                None
            };

            Ok(Self { user_name, user_id })
        }
    }

    /// The [`EncryptionResponsePacket`].
    ///
    /// Carries the shared secret and verify token, both encrypted with the
    /// server's RSA public key. An offline-mode server never requests
    /// encryption and rejects this packet outright.
    ///
    /// [Minecraft Docs](https://minecraft.wiki/w/Java_Edition_protocol#Encryption_Response)
    #[derive(Debug, Clone, Eq, PartialEq)]
    #[cfg_attr(test, derive(Dummy))]
    pub struct EncryptionResponsePacket {
        /// The shared secret, RSA-encrypted by the client.
        pub shared_secret: Vec<u8>,
        /// The verify token, RSA-encrypted by the client.
        pub verify_token: Vec<u8>,
    }

    impl Packet for EncryptionResponsePacket {
        const ID: VarInt = 0x01;
    }

    impl EncodePacket for EncryptionResponsePacket {
        fn encode(&self, buffer: &mut FrameBuffer) -> Result<(), Error> {
            buffer.write_byte_array(&self.shared_secret);
            buffer.write_byte_array(&self.verify_token);

            Ok(())
        }
    }

    impl DecodePacket for EncryptionResponsePacket {
        fn decode(view: &mut PacketView<'_>) -> Result<Self, Error> {
            let shared_secret = view.read_byte_array()?.to_vec();
            let verify_token = view.read_byte_array()?.to_vec();

            Ok(Self {
                shared_secret,
                verify_token,
            })
        }
    }

    /// The [`LoginPluginResponsePacket`].
    ///
    /// The answer to a login plugin request; this server never issues such
    /// requests, so receiving one is a protocol violation.
    ///
    /// [Minecraft Docs](https://minecraft.wiki/w/Java_Edition_protocol#Login_Plugin_Response)
    #[derive(Debug, Clone, Eq, PartialEq)]
    #[cfg_attr(test, derive(Dummy))]
    pub struct LoginPluginResponsePacket {
        /// The id of the request this answers.
        pub message_id: VarInt,
        /// The payload, absent when the client did not understand the
        /// request.
        pub data: Option<Vec<u8>>,
    }

    impl Packet for LoginPluginResponsePacket {
        const ID: VarInt = 0x02;
    }

    impl EncodePacket for LoginPluginResponsePacket {
        fn encode(&self, buffer: &mut FrameBuffer) -> Result<(), Error> {
            buffer.write_varint(self.message_id);
            buffer.write_bool(self.data.is_some());
            if let Some(data) = &self.data {
                buffer.write_bytes(data);
            }

            Ok(())
        }
    }

    impl DecodePacket for LoginPluginResponsePacket {
        fn decode(view: &mut PacketView<'_>) -> Result<Self, Error> {
            let message_id = view.read_varint()?;
            let data = if view.read_bool()? {
                Some(view.read_remaining().to_vec())
            } else {
                None
            };

            Ok(Self { message_id, data })
        }
    }
}

pub mod clientbound {
    use super::*;
    use crate::{DecodePacket, EncodePacket, FrameBuffer, PacketView};

    /// The [`DisconnectPacket`] for the login state.
    ///
    /// The reason is a JSON chat component; login predates the NBT text
    /// component encoding used by the later states.
    ///
    /// [Minecraft Docs](https://minecraft.wiki/w/Java_Edition_protocol#Disconnect_(login))
    #[derive(Debug, Clone, Eq, PartialEq)]
    #[cfg_attr(test, derive(Dummy))]
    pub struct DisconnectPacket {
        /// The JSON chat component shown to the player.
        pub reason: String,
    }

    impl Packet for DisconnectPacket {
        const ID: VarInt = 0x00;
    }

    impl EncodePacket for DisconnectPacket {
        fn encode(&self, buffer: &mut FrameBuffer) -> Result<(), Error> {
            buffer.write_string(&self.reason)?;

            Ok(())
        }
    }

    impl DecodePacket for DisconnectPacket {
        fn decode(view: &mut PacketView<'_>) -> Result<Self, Error> {
            let reason = view.read_string()?;

            Ok(Self { reason })
        }
    }

    /// The [`EncryptionRequestPacket`].
    ///
    /// Starts the online-mode encryption exchange. An offline-mode server
    /// never sends this packet; the type exists because the wire step is
    /// part of the documented login contract.
    ///
    /// [Minecraft Docs](https://minecraft.wiki/w/Java_Edition_protocol#Encryption_Request)
    #[derive(Debug, Clone, Eq, PartialEq)]
    #[cfg_attr(test, derive(Dummy))]
    pub struct EncryptionRequestPacket {
        /// The server id, empty on modern servers.
        pub server_id: String,
        /// The DER-encoded RSA public key.
        pub public_key: Vec<u8>,
        /// The random token the client must echo encrypted.
        pub verify_token: Vec<u8>,
    }

    impl Packet for EncryptionRequestPacket {
        const ID: VarInt = 0x01;
    }

    impl EncodePacket for EncryptionRequestPacket {
        fn encode(&self, buffer: &mut FrameBuffer) -> Result<(), Error> {
            buffer.write_string(&self.server_id)?;
            buffer.write_byte_array(&self.public_key);
            buffer.write_byte_array(&self.verify_token);

            Ok(())
        }
    }

    impl DecodePacket for EncryptionRequestPacket {
        fn decode(view: &mut PacketView<'_>) -> Result<Self, Error> {
            let server_id = view.read_string()?;
            let public_key = view.read_byte_array()?.to_vec();
            let verify_token = view.read_byte_array()?.to_vec();

            Ok(Self {
                server_id,
                public_key,
                verify_token,
            })
        }
    }

    /// The [`LoginSuccessPacket`].
    ///
    /// Confirms the login with the resolved player identity and moves the
    /// connection into the configuration state.
    ///
    /// [Minecraft Docs](https://minecraft.wiki/w/Java_Edition_protocol#Login_Success)
    #[derive(Debug, Clone, Eq, PartialEq)]
    #[cfg_attr(test, derive(Dummy))]
    pub struct LoginSuccessPacket {
        /// The resolved player UUID.
        pub user_id: Uuid,
        /// The resolved player name.
        pub user_name: String,
        /// The profile property list, empty in offline mode.
        pub properties: Vec<ProfileProperty>,
    }

    impl Packet for LoginSuccessPacket {
        const ID: VarInt = 0x02;
    }

    impl EncodePacket for LoginSuccessPacket {
        fn encode(&self, buffer: &mut FrameBuffer) -> Result<(), Error> {
            buffer.write_uuid(&self.user_id);
            buffer.write_string(&self.user_name)?;
            buffer.write_varint(self.properties.len() as VarInt);
            for property in &self.properties {
                buffer.write_string(&property.name)?;
                buffer.write_string(&property.value)?;
                buffer.write_bool(property.signature.is_some());
                if let Some(signature) = &property.signature {
                    buffer.write_string(signature)?;
                }
            }

            Ok(())
        }
    }

    impl DecodePacket for LoginSuccessPacket {
        fn decode(view: &mut PacketView<'_>) -> Result<Self, Error> {
            let user_id = view.read_uuid()?;
            let user_name = view.read_string()?;
            let count = view.read_varint()?;
            if count < 0 {
                return Err(Error::NegativeLength(count));
            }
            let mut properties = Vec::with_capacity(count as usize);
            for _ in 0..count {
                let name = view.read_string()?;
                let value = view.read_string()?;
                let signature = if view.read_bool()? {
                    Some(view.read_string()?)
                } else {
                    None
                };
                properties.push(ProfileProperty {
                    name,
                    value,
                    signature,
                });
            }

            Ok(Self {
                user_id,
                user_name,
                properties,
            })
        }
    }

    /// The [`SetCompressionPacket`].
    ///
    /// Enables the compression layer for every following frame in both
    /// directions; packets at or above the threshold are deflated.
    ///
    /// [Minecraft Docs](https://minecraft.wiki/w/Java_Edition_protocol#Set_Compression)
    #[derive(Debug, Clone, Eq, PartialEq)]
    #[cfg_attr(test, derive(Dummy))]
    pub struct SetCompressionPacket {
        /// The minimum uncompressed size that gets deflated.
        pub threshold: VarInt,
    }

    impl Packet for SetCompressionPacket {
        const ID: VarInt = 0x03;
    }

    impl EncodePacket for SetCompressionPacket {
        fn encode(&self, buffer: &mut FrameBuffer) -> Result<(), Error> {
            buffer.write_varint(self.threshold);

            Ok(())
        }
    }

    impl DecodePacket for SetCompressionPacket {
        fn decode(view: &mut PacketView<'_>) -> Result<Self, Error> {
            let threshold = view.read_varint()?;

            Ok(Self { threshold })
        }
    }
}
