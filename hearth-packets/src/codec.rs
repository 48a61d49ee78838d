use crate::buffer::FrameBuffer;
use crate::view::PacketView;
use crate::{Error, VarInt};
use md5::{Digest, Md5};
use uuid::Uuid;

/// The exact number of bytes [`FrameBuffer::write_varint`] emits for `value`.
pub fn varint_len(value: VarInt) -> usize {
    match value {
        0 => 1,
        n => (31 - (n as u32).leading_zeros() as usize) / 7 + 1,
    }
}

/// A block position packed into a single big-endian `i64`.
///
/// Bits `[63..38]` hold x (26-bit signed), `[37..12]` hold z (26-bit
/// signed) and `[11..0]` hold y (12-bit signed). Unpacking sign-extends
/// all three fields.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BlockPos {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl BlockPos {
    pub fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    pub fn pack(&self) -> i64 {
        ((i64::from(self.x) & 0x3FF_FFFF) << 38)
            | ((i64::from(self.z) & 0x3FF_FFFF) << 12)
            | (i64::from(self.y) & 0xFFF)
    }

    pub fn unpack(value: i64) -> Self {
        Self {
            x: (value >> 38) as i32,
            z: ((value << 26) >> 38) as i32,
            y: ((value << 52) >> 52) as i32,
        }
    }
}

/// A dynamically sized bit set, encoded as `VarInt long_count` followed by
/// that many `i64` words. Bit `k` resides in word `k / 64` at position
/// `k % 64`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BitSet {
    words: Vec<i64>,
}

impl BitSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn word_count(&self) -> usize {
        self.words.len()
    }

    pub fn get(&self, index: usize) -> bool {
        self.words
            .get(index / 64)
            .is_some_and(|word| word & (1 << (index % 64)) != 0)
    }

    pub fn set(&mut self, index: usize) {
        let word = index / 64;
        if word >= self.words.len() {
            self.words.resize(word + 1, 0);
        }
        self.words[word] |= 1 << (index % 64);
    }

    pub fn encode(&self, buffer: &mut FrameBuffer) {
        buffer.write_varint(self.words.len() as VarInt);
        for word in &self.words {
            buffer.write_i64(*word);
        }
    }

    pub fn decode(view: &mut PacketView<'_>) -> Result<Self, Error> {
        let count = view.read_varint()?;
        if count < 0 {
            return Err(Error::NegativeLength(count));
        }
        let mut words = Vec::with_capacity(count as usize);
        for _ in 0..count {
            words.push(view.read_i64()?);
        }
        Ok(Self { words })
    }
}

/// Derives the deterministic offline-mode UUID for a player name.
///
/// The digest is `md5("OfflinePlayer:" + name)` with the version bits set
/// to 3 and the variant bits set to `10`, matching what the vanilla server
/// produces when it skips authentication.
pub fn offline_player_uuid(name: &str) -> Uuid {
    let mut hasher = Md5::new();
    hasher.update(b"OfflinePlayer:");
    hasher.update(name.as_bytes());
    let mut bytes: [u8; 16] = hasher.finalize().into();
    bytes[6] = (bytes[6] & 0x0F) | 0x30;
    bytes[8] = (bytes[8] & 0x3F) | 0x80;
    Uuid::from_bytes(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn varint_len_matches_encoder() {
        for value in [0, 1, 127, 128, 16_384, i32::MAX, -1, i32::MIN] {
            let mut buffer = FrameBuffer::new();
            buffer.write_varint(value);
            assert_eq!(varint_len(value), buffer.readable_bytes(), "value {value}");
        }
    }

    #[test]
    fn block_pos_round_trip() {
        let cases = [
            BlockPos::new(0, 0, 0),
            BlockPos::new(1, 2, 3),
            BlockPos::new(-1, -1, -1),
            BlockPos::new((1 << 25) - 1, (1 << 11) - 1, (1 << 25) - 1),
            BlockPos::new(-(1 << 25), -(1 << 11), -(1 << 25)),
            BlockPos::new(18_357_644, 831, -20_882_616),
        ];
        for pos in cases {
            assert_eq!(BlockPos::unpack(pos.pack()), pos, "{pos:?}");
        }
    }

    #[test]
    fn block_pos_wire_layout() {
        // example layout from the protocol documentation
        let pos = BlockPos::new(18_357_644, 831, -20_882_616);
        let packed = pos.pack();
        assert_eq!((packed >> 38) as i32, 18_357_644);
        assert_eq!(((packed << 26) >> 38) as i32, -20_882_616);
        assert_eq!(((packed << 52) >> 52) as i32, 831);
    }

    #[test]
    fn bit_set_round_trip() {
        let mut bits = BitSet::new();
        bits.set(0);
        bits.set(63);
        bits.set(64);
        bits.set(130);
        assert_eq!(bits.word_count(), 3);
        assert!(bits.get(0));
        assert!(bits.get(63));
        assert!(bits.get(64));
        assert!(bits.get(130));
        assert!(!bits.get(1));
        assert!(!bits.get(129));

        let mut buffer = FrameBuffer::new();
        bits.encode(&mut buffer);
        let bytes = buffer.into_bytes();
        let mut view = PacketView::new(&bytes);
        assert_eq!(BitSet::decode(&mut view).unwrap(), bits);
    }

    #[test]
    fn offline_uuid_known_vectors() {
        assert_eq!(
            offline_player_uuid("Steve").to_string(),
            "8667ba71-b85a-4004-af54-457a9734eed7"
        );
        assert_eq!(
            offline_player_uuid("Alex").to_string(),
            "ec561538-f3fd-461d-aff5-086b22154bce"
        );
    }

    #[test]
    fn offline_uuid_version_and_variant_bits() {
        let uuid = offline_player_uuid("someone_else");
        assert_eq!(uuid.get_version_num(), 3);
        let bytes = uuid.as_bytes();
        assert_eq!(bytes[8] & 0xC0, 0x80);
    }
}
