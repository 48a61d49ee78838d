use crate::{Error, Packet, VarInt};
#[cfg(test)]
use fake::Dummy;
use uuid::Uuid;

/// The bit flags of the displayed-skin-parts byte.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(test, derive(Dummy))]
pub struct DisplayedSkinParts(pub u8);

impl DisplayedSkinParts {
    pub fn cape_enabled(&self) -> bool {
        self.0 & 0x01 != 0
    }

    pub fn jacket_enabled(&self) -> bool {
        self.0 & 0x02 != 0
    }

    pub fn left_sleeve_enabled(&self) -> bool {
        self.0 & 0x04 != 0
    }

    pub fn right_sleeve_enabled(&self) -> bool {
        self.0 & 0x08 != 0
    }

    pub fn left_pants_enabled(&self) -> bool {
        self.0 & 0x10 != 0
    }

    pub fn right_pants_enabled(&self) -> bool {
        self.0 & 0x20 != 0
    }

    pub fn hat_enabled(&self) -> bool {
        self.0 & 0x40 != 0
    }
}

/// The client-reported settings, shared between the configuration and play
/// variants of the client information packet.
#[derive(Debug, Clone, Eq, PartialEq)]
#[cfg_attr(test, derive(Dummy))]
pub struct ClientSettings {
    /// The client locale, e.g. `en_US`.
    pub locale: String,
    /// The render distance in chunks.
    pub view_distance: i8,
    /// The chat visibility: 0 enabled, 1 commands only, 2 hidden.
    pub chat_mode: VarInt,
    /// Whether chat colours are rendered.
    pub chat_colors: bool,
    /// The displayed-skin-parts bit mask.
    pub displayed_skin_parts: DisplayedSkinParts,
    /// The main hand: 0 left, 1 right.
    pub main_hand: VarInt,
    /// Whether the client wants its text filtered.
    pub text_filtering: bool,
    /// Whether the player may appear in server listings.
    pub allow_server_listings: bool,
}

impl ClientSettings {
    /// Returns a copy with every out-of-range field silently clamped, per
    /// the vanilla server's tolerance for creative client values.
    pub fn clamped(&self) -> Self {
        Self {
            locale: self.locale.clone(),
            view_distance: self.view_distance.clamp(2, 32),
            chat_mode: self.chat_mode.clamp(0, 2),
            chat_colors: self.chat_colors,
            displayed_skin_parts: self.displayed_skin_parts,
            main_hand: self.main_hand.clamp(0, 1),
            text_filtering: self.text_filtering,
            allow_server_listings: self.allow_server_listings,
        }
    }

    pub(crate) fn encode(&self, buffer: &mut crate::FrameBuffer) -> Result<(), Error> {
        buffer.write_string(&self.locale)?;
        buffer.write_i8(self.view_distance);
        buffer.write_varint(self.chat_mode);
        buffer.write_bool(self.chat_colors);
        buffer.write_u8(self.displayed_skin_parts.0);
        buffer.write_varint(self.main_hand);
        buffer.write_bool(self.text_filtering);
        buffer.write_bool(self.allow_server_listings);

        Ok(())
    }

    pub(crate) fn decode(view: &mut crate::PacketView<'_>) -> Result<Self, Error> {
        let locale = view.read_string()?;
        let view_distance = view.read_i8()?;
        let chat_mode = view.read_varint()?;
        let chat_colors = view.read_bool()?;
        let displayed_skin_parts = DisplayedSkinParts(view.read_u8()?);
        let main_hand = view.read_varint()?;
        let text_filtering = view.read_bool()?;
        let allow_server_listings = view.read_bool()?;

        Ok(Self {
            locale,
            view_distance,
            chat_mode,
            chat_colors,
            displayed_skin_parts,
            main_hand,
            text_filtering,
            allow_server_listings,
        })
    }
}

pub mod serverbound {
    use super::*;
    use crate::{DecodePacket, EncodePacket, FrameBuffer, PacketView};

    /// The [`ClientInformationPacket`] of the configuration state.
    ///
    /// [Minecraft Docs](https://minecraft.wiki/w/Java_Edition_protocol#Client_Information_(configuration))
    #[derive(Debug, Clone, Eq, PartialEq)]
    #[cfg_attr(test, derive(Dummy))]
    pub struct ClientInformationPacket {
        pub settings: ClientSettings,
    }

    impl Packet for ClientInformationPacket {
        const ID: VarInt = 0x00;
    }

    impl EncodePacket for ClientInformationPacket {
        fn encode(&self, buffer: &mut FrameBuffer) -> Result<(), Error> {
            self.settings.encode(buffer)
        }
    }

    impl DecodePacket for ClientInformationPacket {
        fn decode(view: &mut PacketView<'_>) -> Result<Self, Error> {
            Ok(Self {
                settings: ClientSettings::decode(view)?,
            })
        }
    }

    /// The [`PluginMessagePacket`] of the configuration state.
    ///
    /// Mods and plugins exchange free-form payloads over named channels;
    /// the only channel the server itself consumes is `minecraft:brand`.
    ///
    /// [Minecraft Docs](https://minecraft.wiki/w/Java_Edition_protocol#Serverbound_Plugin_Message_(configuration))
    #[derive(Debug, Clone, Eq, PartialEq)]
    #[cfg_attr(test, derive(Dummy))]
    pub struct PluginMessagePacket {
        /// The channel identifier, e.g. `minecraft:brand`.
        pub channel: String,
        /// The raw channel payload (everything up to the packet end).
        pub data: Vec<u8>,
    }

    impl Packet for PluginMessagePacket {
        const ID: VarInt = 0x01;
    }

    impl EncodePacket for PluginMessagePacket {
        fn encode(&self, buffer: &mut FrameBuffer) -> Result<(), Error> {
            buffer.write_string(&self.channel)?;
            buffer.write_bytes(&self.data);

            Ok(())
        }
    }

    impl DecodePacket for PluginMessagePacket {
        fn decode(view: &mut PacketView<'_>) -> Result<Self, Error> {
            let channel = view.read_string()?;
            let data = view.read_remaining().to_vec();

            Ok(Self { channel, data })
        }
    }

    /// The acknowledgement that the client finished the configuration
    /// phase; the server answers with the play-state login packet.
    ///
    /// [Minecraft Docs](https://minecraft.wiki/w/Java_Edition_protocol#Acknowledge_Finish_Configuration)
    #[derive(Debug, Clone, Eq, PartialEq)]
    #[cfg_attr(test, derive(Dummy))]
    pub struct FinishConfigurationPacket;

    impl Packet for FinishConfigurationPacket {
        const ID: VarInt = 0x02;
    }

    impl EncodePacket for FinishConfigurationPacket {
        fn encode(&self, _buffer: &mut FrameBuffer) -> Result<(), Error> {
            Ok(())
        }
    }

    impl DecodePacket for FinishConfigurationPacket {
        fn decode(_view: &mut PacketView<'_>) -> Result<Self, Error> {
            Ok(Self)
        }
    }

    /// The [`KeepAlivePacket`] answer of the configuration state.
    ///
    /// [Minecraft Docs](https://minecraft.wiki/w/Java_Edition_protocol#Serverbound_Keep_Alive_(configuration))
    #[derive(Debug, Clone, Eq, PartialEq)]
    #[cfg_attr(test, derive(Dummy))]
    pub struct KeepAlivePacket {
        /// The id of the keep-alive this answers.
        pub id: i64,
    }

    impl Packet for KeepAlivePacket {
        const ID: VarInt = 0x03;
    }

    impl EncodePacket for KeepAlivePacket {
        fn encode(&self, buffer: &mut FrameBuffer) -> Result<(), Error> {
            buffer.write_i64(self.id);

            Ok(())
        }
    }

    impl DecodePacket for KeepAlivePacket {
        fn decode(view: &mut PacketView<'_>) -> Result<Self, Error> {
            let id = view.read_i64()?;

            Ok(Self { id })
        }
    }

    /// The [`PongPacket`] of the configuration state.
    ///
    /// [Minecraft Docs](https://minecraft.wiki/w/Java_Edition_protocol#Pong_(configuration))
    #[derive(Debug, Clone, Eq, PartialEq)]
    #[cfg_attr(test, derive(Dummy))]
    pub struct PongPacket {
        /// The id of the ping this answers.
        pub id: i32,
    }

    impl Packet for PongPacket {
        const ID: VarInt = 0x04;
    }

    impl EncodePacket for PongPacket {
        fn encode(&self, buffer: &mut FrameBuffer) -> Result<(), Error> {
            buffer.write_i32(self.id);

            Ok(())
        }
    }

    impl DecodePacket for PongPacket {
        fn decode(view: &mut PacketView<'_>) -> Result<Self, Error> {
            let id = view.read_i32()?;

            Ok(Self { id })
        }
    }

    /// The [`ResourcePackResponsePacket`].
    ///
    /// [Minecraft Docs](https://minecraft.wiki/w/Java_Edition_protocol#Resource_Pack_Response_(configuration))
    #[derive(Debug, Clone, Eq, PartialEq)]
    #[cfg_attr(test, derive(Dummy))]
    pub struct ResourcePackResponsePacket {
        /// The id of the resource pack prompt this answers.
        pub uuid: Uuid,
        /// The result the client reports.
        pub result: crate::ResourcePackResult,
    }

    impl Packet for ResourcePackResponsePacket {
        const ID: VarInt = 0x05;
    }

    impl EncodePacket for ResourcePackResponsePacket {
        fn encode(&self, buffer: &mut FrameBuffer) -> Result<(), Error> {
            buffer.write_uuid(&self.uuid);
            buffer.write_varint(self.result.into());

            Ok(())
        }
    }

    impl DecodePacket for ResourcePackResponsePacket {
        fn decode(view: &mut PacketView<'_>) -> Result<Self, Error> {
            let uuid = view.read_uuid()?;
            let result = view.read_varint()?.try_into()?;

            Ok(Self { uuid, result })
        }
    }
}

pub mod clientbound {
    use super::*;
    use crate::{DecodePacket, EncodePacket, FrameBuffer, PacketView};

    /// The [`DisconnectPacket`] of the configuration state.
    ///
    /// The reason is a text component in the network-NBT encoding.
    ///
    /// [Minecraft Docs](https://minecraft.wiki/w/Java_Edition_protocol#Disconnect_(configuration))
    #[derive(Debug, Clone, Eq, PartialEq)]
    #[cfg_attr(test, derive(Dummy))]
    pub struct DisconnectPacket {
        /// The plain-text reason shown to the player.
        pub reason: String,
    }

    impl Packet for DisconnectPacket {
        const ID: VarInt = 0x01;
    }

    impl EncodePacket for DisconnectPacket {
        fn encode(&self, buffer: &mut FrameBuffer) -> Result<(), Error> {
            buffer.write_text_component(&self.reason);

            Ok(())
        }
    }

    impl DecodePacket for DisconnectPacket {
        fn decode(view: &mut PacketView<'_>) -> Result<Self, Error> {
            // expect a TAG_String (0x08) text component
            let tag = view.read_u8()?;
            if tag != 0x08 {
                return Err(Error::IllegalEnumValue {
                    kind: "TextComponentTag",
                    value: VarInt::from(tag),
                });
            }
            let length = view.read_u16()?;
            let bytes = view.read_bytes(length as usize)?;
            let reason = str::from_utf8(bytes)
                .map_err(|_| Error::InvalidEncoding)?
                .to_owned();

            Ok(Self { reason })
        }
    }

    /// The [`KeepAlivePacket`] of the configuration state.
    ///
    /// The client has to answer with the same id within 15 seconds.
    ///
    /// [Minecraft Docs](https://minecraft.wiki/w/Java_Edition_protocol#Clientbound_Keep_Alive_(configuration))
    #[derive(Debug, Clone, Eq, PartialEq)]
    #[cfg_attr(test, derive(Dummy))]
    pub struct KeepAlivePacket {
        /// The arbitrary id the client must echo.
        pub id: i64,
    }

    impl Packet for KeepAlivePacket {
        const ID: VarInt = 0x03;
    }

    impl EncodePacket for KeepAlivePacket {
        fn encode(&self, buffer: &mut FrameBuffer) -> Result<(), Error> {
            buffer.write_i64(self.id);

            Ok(())
        }
    }

    impl DecodePacket for KeepAlivePacket {
        fn decode(view: &mut PacketView<'_>) -> Result<Self, Error> {
            let id = view.read_i64()?;

            Ok(Self { id })
        }
    }
}
