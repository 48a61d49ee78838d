use crate::codec::BlockPos;
use crate::{
    Error, MAX_STRING_LENGTH, VARINT_MAX_BYTES, VARLONG_MAX_BYTES, VarInt, VarLong,
};
use uuid::Uuid;

/// A borrowed, read-only cursor over exactly one packet's payload.
///
/// The view references the packet-id VarInt plus body inside the session's
/// receive buffer; the frame length prefix is not part of the window. It
/// never grows, never compacts and never mutates the underlying bytes, and
/// it must not outlive the dispatch call it was created for, because the
/// receive buffer is free to compact once dispatch returns.
///
/// Bounds checks use overflow-safe arithmetic, so a hostile length can not
/// wrap the cursor past the window.
#[derive(Debug)]
pub struct PacketView<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> PacketView<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    /// The number of bytes left in the window.
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    fn check(&self, requested: usize) -> Result<(), Error> {
        let end = self.pos.checked_add(requested);
        if end.is_none_or(|end| end > self.data.len()) {
            return Err(Error::ReadUnderflow {
                requested,
                available: self.remaining(),
            });
        }
        Ok(())
    }

    pub fn read_bytes(&mut self, count: usize) -> Result<&'a [u8], Error> {
        self.check(count)?;
        let start = self.pos;
        self.pos += count;
        Ok(&self.data[start..start + count])
    }

    /// Consumes and returns everything left in the window.
    pub fn read_remaining(&mut self) -> &'a [u8] {
        let start = self.pos;
        self.pos = self.data.len();
        &self.data[start..]
    }

    /// Borrows a prefix of the remaining window as a nested view.
    pub fn sub_view(&mut self, length: usize) -> Result<PacketView<'a>, Error> {
        Ok(PacketView::new(self.read_bytes(length)?))
    }

    pub fn skip(&mut self, count: usize) -> Result<(), Error> {
        self.check(count)?;
        self.pos += count;
        Ok(())
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

    /// Reads a length-prefixed string, borrowing straight from the window.
    pub fn read_str(&mut self) -> Result<&'a str, Error> {
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
        str::from_utf8(bytes).map_err(|_| Error::InvalidEncoding)
    }

    pub fn read_string(&mut self) -> Result<String, Error> {
        Ok(self.read_str()?.to_owned())
    }

    pub fn read_uuid(&mut self) -> Result<Uuid, Error> {
        let most = self.read_u64()?;
        let least = self.read_u64()?;
        Ok(Uuid::from_u64_pair(most, least))
    }

    pub fn read_block_pos(&mut self) -> Result<BlockPos, Error> {
        Ok(BlockPos::unpack(self.read_i64()?))
    }

    /// Reads a VarInt length prefix followed by the raw bytes.
    pub fn read_byte_array(&mut self) -> Result<&'a [u8], Error> {
        let length = self.read_varint()?;
        if length < 0 {
            return Err(Error::NegativeLength(length));
        }
        self.read_bytes(length as usize)
    }
}
