use crate::codec::BlockPos;
use crate::configuration::ClientSettings;
use crate::{Error, Packet, VarInt};
#[cfg(test)]
use fake::Dummy;

/// The byte length of a chat message signature.
pub const CHAT_SIGNATURE_BYTES: usize = 256;

pub mod serverbound {
    use super::*;
    use crate::{DecodePacket, EncodePacket, FrameBuffer, PacketView};

    /// The [`ConfirmTeleportationPacket`].
    ///
    /// [Minecraft Docs](https://minecraft.wiki/w/Java_Edition_protocol#Confirm_Teleportation)
    #[derive(Debug, Clone, Eq, PartialEq)]
    #[cfg_attr(test, derive(Dummy))]
    pub struct ConfirmTeleportationPacket {
        /// The id of the teleport this confirms.
        pub teleport_id: VarInt,
    }

    impl Packet for ConfirmTeleportationPacket {
        const ID: VarInt = 0x00;
    }

    impl EncodePacket for ConfirmTeleportationPacket {
        fn encode(&self, buffer: &mut FrameBuffer) -> Result<(), Error> {
            buffer.write_varint(self.teleport_id);

            Ok(())
        }
    }

    impl DecodePacket for ConfirmTeleportationPacket {
        fn decode(view: &mut PacketView<'_>) -> Result<Self, Error> {
            let teleport_id = view.read_varint()?;

            Ok(Self { teleport_id })
        }
    }

    /// The [`ChatMessagePacket`].
    ///
    /// Only the message itself and its signing metadata are retained; the
    /// acknowledgement section at the packet tail is consumed and ignored
    /// because this server does not participate in chat signing.
    ///
    /// [Minecraft Docs](https://minecraft.wiki/w/Java_Edition_protocol#Chat_Message)
    #[derive(Debug, Clone, Eq, PartialEq)]
    pub struct ChatMessagePacket {
        pub message: String,
        pub timestamp: i64,
        pub salt: i64,
        pub signature: Option<Vec<u8>>,
    }

    impl Packet for ChatMessagePacket {
        const ID: VarInt = 0x05;
    }

    impl EncodePacket for ChatMessagePacket {
        fn encode(&self, buffer: &mut FrameBuffer) -> Result<(), Error> {
            buffer.write_string(&self.message)?;
            buffer.write_i64(self.timestamp);
            buffer.write_i64(self.salt);
            buffer.write_bool(self.signature.is_some());
            if let Some(signature) = &self.signature {
                buffer.write_bytes(signature);
            }
            // empty acknowledgement section
            buffer.write_varint(0);
            buffer.write_bytes(&[0; 3]);

            Ok(())
        }
    }

    impl DecodePacket for ChatMessagePacket {
        fn decode(view: &mut PacketView<'_>) -> Result<Self, Error> {
            let message = view.read_string()?;
            let timestamp = view.read_i64()?;
            let salt = view.read_i64()?;
            let signature = if view.read_bool()? {
                Some(view.read_bytes(CHAT_SIGNATURE_BYTES)?.to_vec())
            } else {
                None
            };
            // message count and acknowledged bit set
            view.read_remaining();

            Ok(Self {
                message,
                timestamp,
                salt,
                signature,
            })
        }
    }

    /// The [`ClientInformationPacket`] of the play state; identical in
    /// shape to its configuration counterpart.
    ///
    /// [Minecraft Docs](https://minecraft.wiki/w/Java_Edition_protocol#Client_Information_(play))
    #[derive(Debug, Clone, Eq, PartialEq)]
    #[cfg_attr(test, derive(Dummy))]
    pub struct ClientInformationPacket {
        pub settings: ClientSettings,
    }

    impl Packet for ClientInformationPacket {
        const ID: VarInt = 0x08;
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

    /// The [`KeepAlivePacket`] answer of the play state.
    ///
    /// [Minecraft Docs](https://minecraft.wiki/w/Java_Edition_protocol#Serverbound_Keep_Alive_(play))
    #[derive(Debug, Clone, Eq, PartialEq)]
    #[cfg_attr(test, derive(Dummy))]
    pub struct KeepAlivePacket {
        /// The id of the keep-alive this answers.
        pub id: i64,
    }

    impl Packet for KeepAlivePacket {
        const ID: VarInt = 0x12;
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

    /// The [`SetPlayerPositionPacket`].
    ///
    /// [Minecraft Docs](https://minecraft.wiki/w/Java_Edition_protocol#Set_Player_Position)
    #[derive(Debug, Clone, PartialEq)]
    #[cfg_attr(test, derive(Dummy))]
    pub struct SetPlayerPositionPacket {
        pub x: f64,
        pub feet_y: f64,
        pub z: f64,
        pub on_ground: bool,
    }

    impl Packet for SetPlayerPositionPacket {
        const ID: VarInt = 0x13;
    }

    impl EncodePacket for SetPlayerPositionPacket {
        fn encode(&self, buffer: &mut FrameBuffer) -> Result<(), Error> {
            buffer.write_f64(self.x);
            buffer.write_f64(self.feet_y);
            buffer.write_f64(self.z);
            buffer.write_bool(self.on_ground);

            Ok(())
        }
    }

    impl DecodePacket for SetPlayerPositionPacket {
        fn decode(view: &mut PacketView<'_>) -> Result<Self, Error> {
            let x = view.read_f64()?;
            let feet_y = view.read_f64()?;
            let z = view.read_f64()?;
            let on_ground = view.read_bool()?;

            Ok(Self {
                x,
                feet_y,
                z,
                on_ground,
            })
        }
    }

    /// The [`SetPlayerPositionAndRotationPacket`].
    ///
    /// [Minecraft Docs](https://minecraft.wiki/w/Java_Edition_protocol#Set_Player_Position_and_Rotation)
    #[derive(Debug, Clone, PartialEq)]
    #[cfg_attr(test, derive(Dummy))]
    pub struct SetPlayerPositionAndRotationPacket {
        pub x: f64,
        pub feet_y: f64,
        pub z: f64,
        pub yaw: f32,
        pub pitch: f32,
        pub on_ground: bool,
    }

    impl Packet for SetPlayerPositionAndRotationPacket {
        const ID: VarInt = 0x14;
    }

    impl EncodePacket for SetPlayerPositionAndRotationPacket {
        fn encode(&self, buffer: &mut FrameBuffer) -> Result<(), Error> {
            buffer.write_f64(self.x);
            buffer.write_f64(self.feet_y);
            buffer.write_f64(self.z);
            buffer.write_f32(self.yaw);
            buffer.write_f32(self.pitch);
            buffer.write_bool(self.on_ground);

            Ok(())
        }
    }

    impl DecodePacket for SetPlayerPositionAndRotationPacket {
        fn decode(view: &mut PacketView<'_>) -> Result<Self, Error> {
            let x = view.read_f64()?;
            let feet_y = view.read_f64()?;
            let z = view.read_f64()?;
            let yaw = view.read_f32()?;
            let pitch = view.read_f32()?;
            let on_ground = view.read_bool()?;

            Ok(Self {
                x,
                feet_y,
                z,
                yaw,
                pitch,
                on_ground,
            })
        }
    }

    /// The [`SetPlayerRotationPacket`].
    ///
    /// [Minecraft Docs](https://minecraft.wiki/w/Java_Edition_protocol#Set_Player_Rotation)
    #[derive(Debug, Clone, PartialEq)]
    #[cfg_attr(test, derive(Dummy))]
    pub struct SetPlayerRotationPacket {
        pub yaw: f32,
        pub pitch: f32,
        pub on_ground: bool,
    }

    impl Packet for SetPlayerRotationPacket {
        const ID: VarInt = 0x15;
    }

    impl EncodePacket for SetPlayerRotationPacket {
        fn encode(&self, buffer: &mut FrameBuffer) -> Result<(), Error> {
            buffer.write_f32(self.yaw);
            buffer.write_f32(self.pitch);
            buffer.write_bool(self.on_ground);

            Ok(())
        }
    }

    impl DecodePacket for SetPlayerRotationPacket {
        fn decode(view: &mut PacketView<'_>) -> Result<Self, Error> {
            let yaw = view.read_f32()?;
            let pitch = view.read_f32()?;
            let on_ground = view.read_bool()?;

            Ok(Self {
                yaw,
                pitch,
                on_ground,
            })
        }
    }

    /// The [`SetPlayerOnGroundPacket`].
    ///
    /// [Minecraft Docs](https://minecraft.wiki/w/Java_Edition_protocol#Set_Player_On_Ground)
    #[derive(Debug, Clone, Eq, PartialEq)]
    #[cfg_attr(test, derive(Dummy))]
    pub struct SetPlayerOnGroundPacket {
        pub on_ground: bool,
    }

    impl Packet for SetPlayerOnGroundPacket {
        const ID: VarInt = 0x16;
    }

    impl EncodePacket for SetPlayerOnGroundPacket {
        fn encode(&self, buffer: &mut FrameBuffer) -> Result<(), Error> {
            buffer.write_bool(self.on_ground);

            Ok(())
        }
    }

    impl DecodePacket for SetPlayerOnGroundPacket {
        fn decode(view: &mut PacketView<'_>) -> Result<Self, Error> {
            let on_ground = view.read_bool()?;

            Ok(Self { on_ground })
        }
    }

    /// The [`PlayerActionPacket`].
    ///
    /// Digging, item dropping and similar block-level actions.
    ///
    /// [Minecraft Docs](https://minecraft.wiki/w/Java_Edition_protocol#Player_Action)
    #[derive(Debug, Clone, Eq, PartialEq)]
    pub struct PlayerActionPacket {
        /// The action kind, 0 through 6.
        pub status: VarInt,
        /// The targeted block.
        pub position: BlockPos,
        /// The targeted block face, 0 through 5.
        pub face: u8,
        /// The client action sequence number.
        pub sequence: VarInt,
    }

    impl Packet for PlayerActionPacket {
        const ID: VarInt = 0x1D;
    }

    impl EncodePacket for PlayerActionPacket {
        fn encode(&self, buffer: &mut FrameBuffer) -> Result<(), Error> {
            buffer.write_varint(self.status);
            buffer.write_i64(self.position.pack());
            buffer.write_u8(self.face);
            buffer.write_varint(self.sequence);

            Ok(())
        }
    }

    impl DecodePacket for PlayerActionPacket {
        fn decode(view: &mut PacketView<'_>) -> Result<Self, Error> {
            let status = view.read_varint()?;
            let position = view.read_block_pos()?;
            let face = view.read_u8()?;
            let sequence = view.read_varint()?;

            Ok(Self {
                status,
                position,
                face,
                sequence,
            })
        }
    }

    /// The [`UseItemOnPacket`].
    ///
    /// [Minecraft Docs](https://minecraft.wiki/w/Java_Edition_protocol#Use_Item_On)
    #[derive(Debug, Clone, PartialEq)]
    pub struct UseItemOnPacket {
        /// The used hand, 0 main or 1 off.
        pub hand: VarInt,
        /// The targeted block.
        pub position: BlockPos,
        /// The targeted block face, 0 through 5.
        pub face: VarInt,
        /// The in-block cursor position, each axis within `[0, 1]`.
        pub cursor_x: f32,
        pub cursor_y: f32,
        pub cursor_z: f32,
        /// Whether the player head is inside the block.
        pub inside_block: bool,
        /// The client action sequence number.
        pub sequence: VarInt,
    }

    impl Packet for UseItemOnPacket {
        const ID: VarInt = 0x2E;
    }

    impl EncodePacket for UseItemOnPacket {
        fn encode(&self, buffer: &mut FrameBuffer) -> Result<(), Error> {
            buffer.write_varint(self.hand);
            buffer.write_i64(self.position.pack());
            buffer.write_varint(self.face);
            buffer.write_f32(self.cursor_x);
            buffer.write_f32(self.cursor_y);
            buffer.write_f32(self.cursor_z);
            buffer.write_bool(self.inside_block);
            buffer.write_varint(self.sequence);

            Ok(())
        }
    }

    impl DecodePacket for UseItemOnPacket {
        fn decode(view: &mut PacketView<'_>) -> Result<Self, Error> {
            let hand = view.read_varint()?;
            let position = view.read_block_pos()?;
            let face = view.read_varint()?;
            let cursor_x = view.read_f32()?;
            let cursor_y = view.read_f32()?;
            let cursor_z = view.read_f32()?;
            let inside_block = view.read_bool()?;
            let sequence = view.read_varint()?;

            Ok(Self {
                hand,
                position,
                face,
                cursor_x,
                cursor_y,
                cursor_z,
                inside_block,
                sequence,
            })
        }
    }

    /// The [`UseItemPacket`].
    ///
    /// [Minecraft Docs](https://minecraft.wiki/w/Java_Edition_protocol#Use_Item)
    #[derive(Debug, Clone, Eq, PartialEq)]
    #[cfg_attr(test, derive(Dummy))]
    pub struct UseItemPacket {
        /// The used hand, 0 main or 1 off.
        pub hand: VarInt,
        /// The client action sequence number.
        pub sequence: VarInt,
    }

    impl Packet for UseItemPacket {
        const ID: VarInt = 0x2F;
    }

    impl EncodePacket for UseItemPacket {
        fn encode(&self, buffer: &mut FrameBuffer) -> Result<(), Error> {
            buffer.write_varint(self.hand);
            buffer.write_varint(self.sequence);

            Ok(())
        }
    }

    impl DecodePacket for UseItemPacket {
        fn decode(view: &mut PacketView<'_>) -> Result<Self, Error> {
            let hand = view.read_varint()?;
            let sequence = view.read_varint()?;

            Ok(Self { hand, sequence })
        }
    }

    /// The [`SwingArmPacket`].
    ///
    /// [Minecraft Docs](https://minecraft.wiki/w/Java_Edition_protocol#Swing_Arm)
    #[derive(Debug, Clone, Eq, PartialEq)]
    #[cfg_attr(test, derive(Dummy))]
    pub struct SwingArmPacket {
        /// The used hand, 0 main or 1 off.
        pub hand: VarInt,
    }

    impl Packet for SwingArmPacket {
        const ID: VarInt = 0x30;
    }

    impl EncodePacket for SwingArmPacket {
        fn encode(&self, buffer: &mut FrameBuffer) -> Result<(), Error> {
            buffer.write_varint(self.hand);

            Ok(())
        }
    }

    impl DecodePacket for SwingArmPacket {
        fn decode(view: &mut PacketView<'_>) -> Result<Self, Error> {
            let hand = view.read_varint()?;

            Ok(Self { hand })
        }
    }
}

pub mod clientbound {
    use super::*;
    use crate::{DecodePacket, EncodePacket, FrameBuffer, PacketView};

    /// The [`LoginPacket`] that opens the play state.
    ///
    /// Sent once, immediately after the configuration phase finishes. The
    /// field sequence follows protocol 765.
    ///
    /// [Minecraft Docs](https://minecraft.wiki/w/Java_Edition_protocol#Login_(play))
    #[derive(Debug, Clone, PartialEq)]
    pub struct LoginPacket {
        pub entity_id: i32,
        pub hardcore: bool,
        pub dimension_names: Vec<String>,
        pub max_players: VarInt,
        pub view_distance: VarInt,
        pub simulation_distance: VarInt,
        pub reduced_debug_info: bool,
        pub enable_respawn_screen: bool,
        pub limited_crafting: bool,
        pub dimension_type: String,
        pub dimension_name: String,
        pub hashed_seed: i64,
        pub game_mode: u8,
        pub previous_game_mode: i8,
        pub is_debug: bool,
        pub is_flat: bool,
        pub death_location: Option<(String, BlockPos)>,
        pub portal_cooldown: VarInt,
    }

    impl Packet for LoginPacket {
        const ID: VarInt = 0x29;
    }

    impl EncodePacket for LoginPacket {
        fn encode(&self, buffer: &mut FrameBuffer) -> Result<(), Error> {
            buffer.write_i32(self.entity_id);
            buffer.write_bool(self.hardcore);
            buffer.write_varint(self.dimension_names.len() as VarInt);
            for name in &self.dimension_names {
                buffer.write_string(name)?;
            }
            buffer.write_varint(self.max_players);
            buffer.write_varint(self.view_distance);
            buffer.write_varint(self.simulation_distance);
            buffer.write_bool(self.reduced_debug_info);
            buffer.write_bool(self.enable_respawn_screen);
            buffer.write_bool(self.limited_crafting);
            buffer.write_string(&self.dimension_type)?;
            buffer.write_string(&self.dimension_name)?;
            buffer.write_i64(self.hashed_seed);
            buffer.write_u8(self.game_mode);
            buffer.write_i8(self.previous_game_mode);
            buffer.write_bool(self.is_debug);
            buffer.write_bool(self.is_flat);
            buffer.write_bool(self.death_location.is_some());
            if let Some((dimension, position)) = &self.death_location {
                buffer.write_string(dimension)?;
                buffer.write_i64(position.pack());
            }
            buffer.write_varint(self.portal_cooldown);

            Ok(())
        }
    }

    impl DecodePacket for LoginPacket {
        fn decode(view: &mut PacketView<'_>) -> Result<Self, Error> {
            let entity_id = view.read_i32()?;
            let hardcore = view.read_bool()?;
            let count = view.read_varint()?;
            if count < 0 {
                return Err(Error::NegativeLength(count));
            }
            let mut dimension_names = Vec::with_capacity(count as usize);
            for _ in 0..count {
                dimension_names.push(view.read_string()?);
            }
            let max_players = view.read_varint()?;
            let view_distance = view.read_varint()?;
            let simulation_distance = view.read_varint()?;
            let reduced_debug_info = view.read_bool()?;
            let enable_respawn_screen = view.read_bool()?;
            let limited_crafting = view.read_bool()?;
            let dimension_type = view.read_string()?;
            let dimension_name = view.read_string()?;
            let hashed_seed = view.read_i64()?;
            let game_mode = view.read_u8()?;
            let previous_game_mode = view.read_i8()?;
            let is_debug = view.read_bool()?;
            let is_flat = view.read_bool()?;
            let death_location = if view.read_bool()? {
                Some((view.read_string()?, view.read_block_pos()?))
            } else {
                None
            };
            let portal_cooldown = view.read_varint()?;

            Ok(Self {
                entity_id,
                hardcore,
                dimension_names,
                max_players,
                view_distance,
                simulation_distance,
                reduced_debug_info,
                enable_respawn_screen,
                limited_crafting,
                dimension_type,
                dimension_name,
                hashed_seed,
                game_mode,
                previous_game_mode,
                is_debug,
                is_flat,
                death_location,
                portal_cooldown,
            })
        }
    }

    /// The [`KeepAlivePacket`] of the play state.
    ///
    /// [Minecraft Docs](https://minecraft.wiki/w/Java_Edition_protocol#Clientbound_Keep_Alive_(play))
    #[derive(Debug, Clone, Eq, PartialEq)]
    #[cfg_attr(test, derive(Dummy))]
    pub struct KeepAlivePacket {
        /// The arbitrary id the client must echo.
        pub id: i64,
    }

    impl Packet for KeepAlivePacket {
        const ID: VarInt = 0x24;
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

    /// The [`DisconnectPacket`] of the play state.
    ///
    /// [Minecraft Docs](https://minecraft.wiki/w/Java_Edition_protocol#Disconnect_(play))
    #[derive(Debug, Clone, Eq, PartialEq)]
    #[cfg_attr(test, derive(Dummy))]
    pub struct DisconnectPacket {
        /// The plain-text reason shown to the player.
        pub reason: String,
    }

    impl Packet for DisconnectPacket {
        const ID: VarInt = 0x1B;
    }

    impl EncodePacket for DisconnectPacket {
        fn encode(&self, buffer: &mut FrameBuffer) -> Result<(), Error> {
            buffer.write_text_component(&self.reason);

            Ok(())
        }
    }

    impl DecodePacket for DisconnectPacket {
        fn decode(view: &mut PacketView<'_>) -> Result<Self, Error> {
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
}
