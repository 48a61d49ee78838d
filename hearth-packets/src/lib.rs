#![forbid(unsafe_code)]

#[cfg(test)]
use fake::Dummy;

pub mod buffer;
pub mod codec;
pub mod configuration;
pub mod frame;
pub mod handshake;
pub mod login;
pub mod play;
pub mod status;
pub mod view;

pub use buffer::FrameBuffer;
pub use view::PacketView;

/// An `i32` carried on the wire in the variable-length LEB128-style encoding.
pub type VarInt = i32;

/// An `i64` carried on the wire in the variable-length LEB128-style encoding.
pub type VarLong = i64;

/// The maximum number of bytes an encoded [`VarInt`] may occupy.
pub const VARINT_MAX_BYTES: usize = 5;

/// The maximum number of bytes an encoded [`VarLong`] may occupy.
pub const VARLONG_MAX_BYTES: usize = 10;

/// The maximum byte length of a length-prefixed protocol string.
pub const MAX_STRING_LENGTH: usize = 32767;

/// The maximum accepted packet body length (2^21 - 1).
pub const MAX_PACKET_SIZE: VarInt = 0x1F_FFFF;

/// The internal error type for all failures of the wire codec.
///
/// This covers cursor bounds violations on the frame buffer and packet view,
/// malformed variable-length integers, string limits and the optional
/// compression layer. Protocol-level failures (unexpected packets, invalid
/// field values) are layered on top of this by the session.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// A read of more bytes than the readable region holds.
    #[error("read of {requested} bytes exceeds available data ({available} readable)")]
    ReadUnderflow {
        /// The number of bytes the caller asked for.
        requested: usize,
        /// The number of bytes that were actually readable.
        available: usize,
    },

    /// A manual write-cursor advance past the end of the writable region.
    #[error("write advance of {requested} bytes exceeds writable space ({available} writable)")]
    WriteOverflow {
        /// The number of bytes the caller advanced by.
        requested: usize,
        /// The number of bytes that were actually writable.
        available: usize,
    },

    /// A variable-length integer with a continuation bit past its last
    /// permitted byte.
    #[error("{kind} exceeds the maximum of {max} bytes")]
    VarIntTooLong {
        /// The integer kind that was decoded.
        kind: &'static str,
        /// The maximum encoded length for that kind.
        max: usize,
    },

    /// A string whose byte length exceeds the protocol limit.
    #[error("string of {length} bytes exceeds the limit of {limit}")]
    StringTooLong {
        /// The observed byte length.
        length: usize,
        /// The limit that was enforced.
        limit: usize,
    },

    /// A string payload that is not valid UTF-8.
    #[error("string payload is not valid UTF-8")]
    InvalidEncoding,

    /// A negative length prefix where only non-negative lengths are defined.
    #[error("negative length prefix: {0}")]
    NegativeLength(i32),

    /// The received value index cannot be mapped to an existing enum.
    #[error("illegal enum value for {kind}: {value}")]
    IllegalEnumValue {
        /// The enum kind which was parsed.
        kind: &'static str,
        /// The value that was received.
        value: VarInt,
    },

    /// The compressed body of a packet could not be inflated.
    #[error("compressed packet body is invalid: {0}")]
    Compression(String),

    /// The inflated body does not match the declared uncompressed size.
    #[error("decompressed size {actual} does not match the declared {declared}")]
    DecompressedSizeMismatch {
        /// The size announced in the data-length prefix.
        declared: usize,
        /// The size that actually inflated.
        actual: usize,
    },
}

/// Packets are network packets that are part of the protocol definition and
/// identified by a protocol state and ID.
pub trait Packet {
    /// The defined ID of this network packet within its protocol state.
    const ID: VarInt;
}

/// `EncodePacket`s are packets whose body can be written to a [`FrameBuffer`].
///
/// The body excludes the packet ID and the frame length prefix; both are
/// added by the framing layer.
pub trait EncodePacket: Packet {
    /// Writes the body of this packet into the supplied buffer.
    fn encode(&self, buffer: &mut FrameBuffer) -> Result<(), Error>;
}

/// `DecodePacket`s are packets whose body can be read from a [`PacketView`].
pub trait DecodePacket: Packet + Sized {
    /// Creates a new instance of this packet with the data from the view.
    fn decode(view: &mut PacketView<'_>) -> Result<Self, Error>;
}

/// The protocol state requested by the client in the handshake.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(test, derive(Dummy))]
pub enum NextState {
    /// Query the server information without connecting.
    Status,
    /// Log into the server, establishing a connection.
    Login,
}

impl From<NextState> for VarInt {
    fn from(state: NextState) -> Self {
        match state {
            NextState::Status => 1,
            NextState::Login => 2,
        }
    }
}

impl TryFrom<VarInt> for NextState {
    type Error = Error;

    fn try_from(value: VarInt) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(NextState::Status),
            2 => Ok(NextState::Login),
            _ => Err(Error::IllegalEnumValue {
                kind: "NextState",
                value,
            }),
        }
    }
}

/// The result code of a resource pack prompt, as reported by the client.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(test, derive(Dummy))]
pub enum ResourcePackResult {
    Success,
    Declined,
    DownloadFailed,
    Accepted,
    Downloaded,
    InvalidUrl,
    ReloadFailed,
    Discarded,
}

impl From<ResourcePackResult> for VarInt {
    fn from(result: ResourcePackResult) -> Self {
        match result {
            ResourcePackResult::Success => 0,
            ResourcePackResult::Declined => 1,
            ResourcePackResult::DownloadFailed => 2,
            ResourcePackResult::Accepted => 3,
            ResourcePackResult::Downloaded => 4,
            ResourcePackResult::InvalidUrl => 5,
            ResourcePackResult::ReloadFailed => 6,
            ResourcePackResult::Discarded => 7,
        }
    }
}

impl TryFrom<VarInt> for ResourcePackResult {
    type Error = Error;

    fn try_from(value: VarInt) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(ResourcePackResult::Success),
            1 => Ok(ResourcePackResult::Declined),
            2 => Ok(ResourcePackResult::DownloadFailed),
            3 => Ok(ResourcePackResult::Accepted),
            4 => Ok(ResourcePackResult::Downloaded),
            5 => Ok(ResourcePackResult::InvalidUrl),
            6 => Ok(ResourcePackResult::ReloadFailed),
            7 => Ok(ResourcePackResult::Discarded),
            _ => Err(Error::IllegalEnumValue {
                kind: "ResourcePackResult",
                value,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::{DecodePacket, EncodePacket, FrameBuffer, PacketView, VarInt};
    use fake::{Dummy, Fake, Faker};
    use std::fmt::Debug;

    pub fn assert_packet<T>(packet_id: VarInt)
    where
        T: PartialEq + Dummy<Faker> + DecodePacket + EncodePacket + Debug,
    {
        // generate data
        let expected: T = Faker.fake();

        // write the packet body
        let mut buffer = FrameBuffer::new();
        expected
            .encode(&mut buffer)
            .expect("failed to write packet");

        // read the packet body back
        let mut view = PacketView::new(buffer.readable());
        let actual = T::decode(&mut view).expect("failed to read packet");

        assert_eq!(T::ID, packet_id, "mismatching packet id");
        assert_eq!(expected, actual);
        assert_eq!(view.remaining(), 0, "there are remaining bytes in the view");
    }
}
