use crate::codec::varint_len;
use crate::{
    Error, MAX_STRING_LENGTH, VARINT_MAX_BYTES, VARLONG_MAX_BYTES, VarInt, VarLong,
};
use uuid::Uuid;

const INITIAL_CAPACITY: usize = 4096;

/// A growable binary buffer with separate read and write cursors.
///
/// The buffer is the landing zone for raw socket bytes: the async receive
/// writes directly into [`writable_region`](Self::writable_region), the
/// session then parses complete packet frames out of the readable region
/// without copying them anywhere else. Bytes in `[read_pos, write_pos)` are
/// readable, bytes in `[write_pos, capacity)` are writable, and
/// [`compact`](Self::compact) reclaims the space in front of the read
/// cursor. Capacity grows geometrically on demand and never shrinks.
///
/// All reads are bounds-checked and fail with [`Error::ReadUnderflow`]
/// naming the requested and available byte counts.
#[derive(Debug, Clone, Default)]
pub struct FrameBuffer {
    data: Vec<u8>,
    read_pos: usize,
    write_pos: usize,
}

impl FrameBuffer {
    pub fn new() -> Self {
        Self::with_capacity(INITIAL_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            data: vec![0; capacity],
            read_pos: 0,
            write_pos: 0,
        }
    }

    /// Creates a buffer whose readable region equals the given bytes.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self {
            data: bytes.to_vec(),
            read_pos: 0,
            write_pos: bytes.len(),
        }
    }

    pub fn read_pos(&self) -> usize {
        self.read_pos
    }

    pub fn write_pos(&self) -> usize {
        self.write_pos
    }

    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    pub fn readable_bytes(&self) -> usize {
        self.write_pos - self.read_pos
    }

    pub fn writable_bytes(&self) -> usize {
        self.data.len() - self.write_pos
    }

    pub fn has_readable_data(&self) -> bool {
        self.read_pos < self.write_pos
    }

    /// The readable region `[read_pos, write_pos)`.
    pub fn readable(&self) -> &[u8] {
        &self.data[self.read_pos..self.write_pos]
    }

    /// Resets both cursors without touching capacity.
    pub fn clear(&mut self) {
        self.read_pos = 0;
        self.write_pos = 0;
    }

    /// Consumes the buffer, returning the readable region as an owned vector.
    pub fn into_bytes(mut self) -> Vec<u8> {
        self.data.truncate(self.write_pos);
        self.data.drain(..self.read_pos);
        self.data
    }

    /// Grows the buffer so that at least `additional` bytes are writable.
    pub fn reserve_writable(&mut self, additional: usize) {
        let required = self.write_pos + additional;
        if required <= self.data.len() {
            return;
        }
        let mut capacity = self.data.len().max(64);
        while capacity < required {
            capacity *= 2;
        }
        self.data.resize(capacity, 0);
    }

    /// The writable region `[write_pos, capacity)`, for direct socket reads.
    pub fn writable_region(&mut self) -> &mut [u8] {
        &mut self.data[self.write_pos..]
    }

    /// Advances the write cursor after bytes were placed into
    /// [`writable_region`](Self::writable_region) by the caller.
    pub fn advance_write_position(&mut self, count: usize) -> Result<(), Error> {
        if count > self.writable_bytes() {
            return Err(Error::WriteOverflow {
                requested: count,
                available: self.writable_bytes(),
            });
        }
        self.write_pos += count;
        Ok(())
    }

    /// Moves the readable region to offset zero, reclaiming consumed space.
    pub fn compact(&mut self) {
        if self.read_pos == 0 {
            return;
        }
        self.data.copy_within(self.read_pos..self.write_pos, 0);
        self.write_pos -= self.read_pos;
        self.read_pos = 0;
    }

    fn check_readable(&self, requested: usize) -> Result<(), Error> {
        if requested > self.readable_bytes() {
            return Err(Error::ReadUnderflow {
                requested,
                available: self.readable_bytes(),
            });
        }
        Ok(())
    }

    // writing

    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.reserve_writable(bytes.len());
        self.data[self.write_pos..self.write_pos + bytes.len()].copy_from_slice(bytes);
        self.write_pos += bytes.len();
    }

    pub fn write_u8(&mut self, value: u8) {
        self.write_bytes(&[value]);
    }

    pub fn write_i8(&mut self, value: i8) {
        self.write_bytes(&value.to_be_bytes());
    }

    pub fn write_bool(&mut self, value: bool) {
        self.write_u8(value as u8);
    }

    pub fn write_u16(&mut self, value: u16) {
        self.write_bytes(&value.to_be_bytes());
    }

    pub fn write_i16(&mut self, value: i16) {
        self.write_bytes(&value.to_be_bytes());
    }

    pub fn write_u32(&mut self, value: u32) {
        self.write_bytes(&value.to_be_bytes());
    }

    pub fn write_i32(&mut self, value: i32) {
        self.write_bytes(&value.to_be_bytes());
    }

    pub fn write_u64(&mut self, value: u64) {
        self.write_bytes(&value.to_be_bytes());
    }

    pub fn write_i64(&mut self, value: i64) {
        self.write_bytes(&value.to_be_bytes());
    }

    pub fn write_f32(&mut self, value: f32) {
        self.write_u32(value.to_bits());
    }

    pub fn write_f64(&mut self, value: f64) {
        self.write_u64(value.to_bits());
    }

    pub fn write_varint(&mut self, value: VarInt) {
        let mut value = value as u32;
        loop {
            let mut byte = (value & 0x7F) as u8;
            value >>= 7;
            if value != 0 {
                byte |= 0x80;
            }
            self.write_u8(byte);
            if value == 0 {
                break;
            }
        }
    }

    pub fn write_varlong(&mut self, value: VarLong) {
        let mut value = value as u64;
        loop {
            let mut byte = (value & 0x7F) as u8;
            value >>= 7;
            if value != 0 {
                byte |= 0x80;
            }
            self.write_u8(byte);
            if value == 0 {
                break;
            }
        }
    }

    /// Writes a string as a VarInt byte-length prefix followed by UTF-8 bytes.
    pub fn write_string(&mut self, value: &str) -> Result<(), Error> {
        if value.len() > MAX_STRING_LENGTH {
            return Err(Error::StringTooLong {
                length: value.len(),
                limit: MAX_STRING_LENGTH,
            });
        }
        self.write_varint(value.len() as VarInt);
        self.write_bytes(value.as_bytes());
        Ok(())
    }

    /// Writes a string text component as a network-NBT `TAG_String`.
    pub fn write_text_component(&mut self, value: &str) {
        self.write_u8(0x08);
        self.write_u16(value.len() as u16);
        self.write_bytes(value.as_bytes());
    }

    pub fn write_uuid(&mut self, value: &Uuid) {
        let (most, least) = value.as_u64_pair();
        self.write_u64(most);
        self.write_u64(least);
    }

    /// Writes a VarInt length prefix followed by the raw bytes.
    pub fn write_byte_array(&mut self, bytes: &[u8]) {
        self.write_varint(bytes.len() as VarInt);
        self.write_bytes(bytes);
    }

    // reading

    pub fn read_bytes(&mut self, count: usize) -> Result<&[u8], Error> {
        self.check_readable(count)?;
        let start = self.read_pos;
        self.read_pos += count;
        Ok(&self.data[start..start + count])
    }

    pub fn read_u8(&mut self) -> Result<u8, Error> {
        Ok(self.read_bytes(1)?[0])
    }

    pub fn read_i8(&mut self) -> Result<i8, Error> {
        Ok(self.read_u8()? as i8)
    }

    pub fn read_bool(&mut self) -> Result<bool, Error> {
        Ok(self.read_u8()? == 1)
    }

    pub fn read_u16(&mut self) -> Result<u16, Error> {
        let bytes = self.read_bytes(2)?;
        Ok(u16::from_be_bytes([bytes[0], bytes[1]]))
    }

    pub fn read_i16(&mut self) -> Result<i16, Error> {
        Ok(self.read_u16()? as i16)
    }

    pub fn read_u32(&mut self) -> Result<u32, Error> {
        let bytes = self.read_bytes(4)?;
        Ok(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    pub fn read_i32(&mut self) -> Result<i32, Error> {
        Ok(self.read_u32()? as i32)
    }

    pub fn read_u64(&mut self) -> Result<u64, Error> {
        let bytes = self.read_bytes(8)?;
        let mut raw = [0; 8];
        raw.copy_from_slice(bytes);
        Ok(u64::from_be_bytes(raw))
    }

    pub fn read_i64(&mut self) -> Result<i64, Error> {
        Ok(self.read_u64()? as i64)
    }

    pub fn read_f32(&mut self) -> Result<f32, Error> {
        Ok(f32::from_bits(self.read_u32()?))
    }

    pub fn read_f64(&mut self) -> Result<f64, Error> {
        Ok(f64::from_bits(self.read_u64()?))
    }

    pub fn read_varint(&mut self) -> Result<VarInt, Error> {
        let mut value: i32 = 0;
        for i in 0..VARINT_MAX_BYTES {
            let byte = self.read_u8()?;
            value |= ((byte & 0x7F) as i32) << (7 * i);
            if byte & 0x80 == 0 {
                return Ok(value);
            }
        }
        Err(Error::VarIntTooLong {
            kind: "VarInt",
            max: VARINT_MAX_BYTES,
        })
    }

    pub fn read_varlong(&mut self) -> Result<VarLong, Error> {
        let mut value: i64 = 0;
        for i in 0..VARLONG_MAX_BYTES {
            let byte = self.read_u8()?;
            value |= ((byte & 0x7F) as i64) << (7 * i);
            if byte & 0x80 == 0 {
                return Ok(value);
            }
        }
        Err(Error::VarIntTooLong {
            kind: "VarLong",
            max: VARLONG_MAX_BYTES,
        })
    }

    pub fn read_string(&mut self) -> Result<String, Error> {
        let length = self.read_varint()?;
        if length < 0 {
            return Err(Error::NegativeLength(length));
        }
        let length = length as usize;
        if length > MAX_STRING_LENGTH {
            return Err(Error::StringTooLong {
                length,
                limit: MAX_STRING_LENGTH,
            });
        }
        let bytes = self.read_bytes(length)?;
        String::from_utf8(bytes.to_vec()).map_err(|_| Error::InvalidEncoding)
    }

    pub fn read_uuid(&mut self) -> Result<Uuid, Error> {
        let most = self.read_u64()?;
        let least = self.read_u64()?;
        Ok(Uuid::from_u64_pair(most, least))
    }

    pub fn skip_bytes(&mut self, count: usize) -> Result<(), Error> {
        self.check_readable(count)?;
        self.read_pos += count;
        Ok(())
    }

    pub fn peek_u8(&self) -> Result<u8, Error> {
        self.check_readable(1)?;
        Ok(self.data[self.read_pos])
    }

    // packet boundary queries

    /// Whether the readable region holds a complete packet frame.
    ///
    /// A malformed length prefix counts as complete so that the processing
    /// loop runs and surfaces the decode error instead of waiting forever.
    pub fn has_complete_packet(&self) -> bool {
        match self.peek_packet_length() {
            Ok(Some(length)) if length >= 0 => {
                self.readable_bytes() >= varint_len(length) + length as usize
            }
            Ok(Some(_)) => true,
            Ok(None) => false,
            Err(_) => true,
        }
    }

    /// Decodes the length prefix without advancing the read cursor.
    ///
    /// Returns `None` when the VarInt is still incomplete at the buffer
    /// tail, and an error when a fifth byte carries a continuation bit.
    pub fn peek_packet_length(&self) -> Result<Option<VarInt>, Error> {
        let mut value: i32 = 0;
        for i in 0..VARINT_MAX_BYTES {
            if self.read_pos + i >= self.write_pos {
                return Ok(None);
            }
            let byte = self.data[self.read_pos + i];
            value |= ((byte & 0x7F) as i32) << (7 * i);
            if byte & 0x80 == 0 {
                return Ok(Some(value));
            }
        }
        Err(Error::VarIntTooLong {
            kind: "VarInt",
            max: VARINT_MAX_BYTES,
        })
    }

    /// Advances the read cursor past the length prefix.
    pub fn skip_packet_length(&mut self) -> Result<(), Error> {
        self.read_varint()?;
        Ok(())
    }

    /// Borrows `count` bytes at the read cursor without consuming them.
    pub fn peek_bytes(&self, count: usize) -> Result<&[u8], Error> {
        self.check_readable(count)?;
        Ok(&self.data[self.read_pos..self.read_pos + count])
    }

    /// Consumes `count` bytes without inspecting them.
    pub fn advance_read_position(&mut self, count: usize) -> Result<(), Error> {
        self.check_readable(count)?;
        self.read_pos += count;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_read_round_trip() {
        let mut buffer = FrameBuffer::new();
        buffer.write_u8(0x42);
        buffer.write_bool(true);
        buffer.write_i8(-5);
        buffer.write_u16(0xBEEF);
        buffer.write_i32(-123_456);
        buffer.write_u64(0xDEAD_BEEF_CAFE_BABE);
        buffer.write_f32(3.5);
        buffer.write_f64(-0.25);
        buffer.write_string("hello").unwrap();

        assert_eq!(buffer.read_u8().unwrap(), 0x42);
        assert!(buffer.read_bool().unwrap());
        assert_eq!(buffer.read_i8().unwrap(), -5);
        assert_eq!(buffer.read_u16().unwrap(), 0xBEEF);
        assert_eq!(buffer.read_i32().unwrap(), -123_456);
        assert_eq!(buffer.read_u64().unwrap(), 0xDEAD_BEEF_CAFE_BABE);
        assert_eq!(buffer.read_f32().unwrap(), 3.5);
        assert_eq!(buffer.read_f64().unwrap(), -0.25);
        assert_eq!(buffer.read_string().unwrap(), "hello");
        assert_eq!(buffer.read_pos(), buffer.write_pos());
        assert!(!buffer.has_readable_data());
    }

    #[test]
    fn varint_round_trip_boundaries() {
        for (value, encoded_len) in [
            (0, 1),
            (1, 1),
            (127, 1),
            (128, 2),
            (16_383, 2),
            (16_384, 3),
            (2_097_151, 3),
            (2_097_152, 4),
            (268_435_455, 4),
            (268_435_456, 5),
            (i32::MAX, 5),
            (-1, 5),
            (i32::MIN, 5),
        ] {
            let mut buffer = FrameBuffer::new();
            buffer.write_varint(value);
            assert_eq!(buffer.readable_bytes(), encoded_len, "value {value}");
            assert_eq!(buffer.read_varint().unwrap(), value);
        }
    }

    #[test]
    fn varint_random_round_trip() {
        let mut buffer = FrameBuffer::new();
        for _ in 0..10_000 {
            let value: i32 = rand::random();
            buffer.clear();
            buffer.write_varint(value);
            assert!(buffer.readable_bytes() <= VARINT_MAX_BYTES);
            assert_eq!(buffer.read_varint().unwrap(), value);
        }
    }

    #[test]
    fn varint_rejects_sixth_continuation_byte() {
        let mut buffer = FrameBuffer::from_bytes(&[0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF]);
        assert!(matches!(
            buffer.read_varint(),
            Err(Error::VarIntTooLong { kind: "VarInt", .. })
        ));
    }

    #[test]
    fn varlong_round_trip_boundaries() {
        for (value, encoded_len) in [
            (0i64, 1),
            (127, 1),
            (128, 2),
            (i64::from(i32::MAX), 5),
            (i64::MAX, 9),
            (-1, 10),
            (i64::MIN, 10),
        ] {
            let mut buffer = FrameBuffer::new();
            buffer.write_varlong(value);
            assert_eq!(buffer.readable_bytes(), encoded_len, "value {value}");
            assert_eq!(buffer.read_varlong().unwrap(), value);
        }
    }

    #[test]
    fn varlong_rejects_eleventh_continuation_byte() {
        let mut buffer = FrameBuffer::from_bytes(&[0xFF; 11]);
        assert!(matches!(
            buffer.read_varlong(),
            Err(Error::VarIntTooLong { kind: "VarLong", .. })
        ));
    }

    #[test]
    fn string_rejects_over_limit() {
        let long = "x".repeat(MAX_STRING_LENGTH + 1);
        let mut buffer = FrameBuffer::new();
        assert!(matches!(
            buffer.write_string(&long),
            Err(Error::StringTooLong { .. })
        ));

        let mut buffer = FrameBuffer::new();
        buffer.write_varint((MAX_STRING_LENGTH + 1) as VarInt);
        buffer.write_bytes(long.as_bytes());
        assert!(matches!(
            buffer.read_string(),
            Err(Error::StringTooLong { .. })
        ));
    }

    #[test]
    fn uuid_round_trip() {
        let uuid = Uuid::from_u64_pair(0x1234_5678_9ABC_DEF0, 0x0FED_CBA9_8765_4321);
        let mut buffer = FrameBuffer::new();
        buffer.write_uuid(&uuid);
        assert_eq!(buffer.readable_bytes(), 16);
        assert_eq!(buffer.read_uuid().unwrap(), uuid);
    }

    #[test]
    fn read_underflow_reports_counts() {
        let mut buffer = FrameBuffer::from_bytes(&[1, 2, 3]);
        let err = buffer.read_u64().unwrap_err();
        assert!(matches!(
            err,
            Error::ReadUnderflow {
                requested: 8,
                available: 3
            }
        ));
    }

    #[test]
    fn compact_preserves_readable_sequence() {
        let mut buffer = FrameBuffer::with_capacity(16);
        buffer.write_bytes(&[1, 2, 3, 4, 5, 6]);
        assert_eq!(buffer.read_bytes(2).unwrap(), &[1, 2]);

        buffer.compact();
        assert_eq!(buffer.read_pos(), 0);
        assert_eq!(buffer.readable(), &[3, 4, 5, 6]);
        assert_eq!(buffer.read_bytes(4).unwrap(), &[3, 4, 5, 6]);
        assert_eq!(buffer.read_pos(), buffer.write_pos());
    }

    #[test]
    fn capacity_grows_geometrically() {
        let mut buffer = FrameBuffer::with_capacity(8);
        buffer.write_bytes(&[0; 9]);
        assert!(buffer.capacity() >= 9);
        buffer.write_bytes(&[0; 1000]);
        assert!(buffer.capacity() >= 1009);
    }

    #[test]
    fn zero_copy_receive_path() {
        let mut buffer = FrameBuffer::with_capacity(16);
        let region = buffer.writable_region();
        region[..4].copy_from_slice(&[9, 8, 7, 6]);
        buffer.advance_write_position(4).unwrap();
        assert_eq!(buffer.readable(), &[9, 8, 7, 6]);

        let err = buffer.advance_write_position(100).unwrap_err();
        assert!(matches!(err, Error::WriteOverflow { .. }));
    }

    #[test]
    fn complete_packet_detection() {
        let mut buffer = FrameBuffer::new();
        assert!(!buffer.has_complete_packet());

        // length prefix only, no body yet
        buffer.write_varint(5);
        assert!(!buffer.has_complete_packet());
        assert_eq!(buffer.peek_packet_length().unwrap(), Some(5));

        buffer.write_bytes(&[0; 4]);
        assert!(!buffer.has_complete_packet());
        buffer.write_u8(0);
        assert!(buffer.has_complete_packet());

        buffer.skip_packet_length().unwrap();
        buffer.advance_read_position(5).unwrap();
        assert!(!buffer.has_complete_packet());
    }

    #[test]
    fn incomplete_length_prefix_is_not_an_error() {
        // a single continuation byte could still become a valid VarInt
        let buffer = FrameBuffer::from_bytes(&[0x80]);
        assert_eq!(buffer.peek_packet_length().unwrap(), None);
        assert!(!buffer.has_complete_packet());
    }

    #[test]
    fn malformed_length_prefix_counts_as_complete() {
        let buffer = FrameBuffer::from_bytes(&[0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF]);
        assert!(buffer.peek_packet_length().is_err());
        assert!(buffer.has_complete_packet());
    }
}
