use crate::buffer::FrameBuffer;
use crate::view::PacketView;
use crate::{Error, MAX_PACKET_SIZE, VarInt};
use flate2::Compression;
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use std::io::{Read, Write};

/// Wraps a packet body (`VarInt packet_id ‖ body`) into a complete wire
/// frame, ready to be queued on a socket.
///
/// Without a compression threshold the frame is `VarInt length ‖ raw`.
/// With a threshold the frame becomes `VarInt total ‖ VarInt data_len ‖
/// payload`, where `data_len` is the uncompressed size and a `data_len` of
/// zero marks a payload that stayed below the threshold and was included
/// as-is.
pub fn encode_frame(packet: &FrameBuffer, threshold: Option<VarInt>) -> Result<Vec<u8>, Error> {
    let raw = packet.readable();

    let Some(threshold) = threshold else {
        let mut out = FrameBuffer::with_capacity(raw.len() + 5);
        out.write_varint(raw.len() as VarInt);
        out.write_bytes(raw);
        return Ok(out.into_bytes());
    };

    let mut body = FrameBuffer::with_capacity(raw.len() + 6);
    if (raw.len() as VarInt) < threshold {
        body.write_varint(0);
        body.write_bytes(raw);
    } else {
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder
            .write_all(raw)
            .map_err(|err| Error::Compression(err.to_string()))?;
        let deflated = encoder
            .finish()
            .map_err(|err| Error::Compression(err.to_string()))?;
        body.write_varint(raw.len() as VarInt);
        body.write_bytes(&deflated);
    }

    let mut out = FrameBuffer::with_capacity(body.readable_bytes() + 5);
    out.write_varint(body.readable_bytes() as VarInt);
    out.write_bytes(body.readable());
    Ok(out.into_bytes())
}

/// Unwraps the compression layer of a received frame body.
///
/// `body` is the frame content after the outer length prefix. For a
/// `data_len` of zero the remainder is returned as-is (borrowed from the
/// receive buffer); otherwise the payload is inflated into `scratch` and
/// the declared uncompressed size is enforced.
pub fn decode_compressed_body<'a>(
    body: &'a [u8],
    scratch: &'a mut Vec<u8>,
) -> Result<&'a [u8], Error> {
    let mut view = PacketView::new(body);
    let data_len = view.read_varint()?;
    let deflated = view.read_remaining();

    if data_len == 0 {
        return Ok(deflated);
    }
    if data_len < 0 || data_len > MAX_PACKET_SIZE {
        return Err(Error::NegativeLength(data_len));
    }

    scratch.clear();
    let mut decoder = ZlibDecoder::new(deflated);
    decoder
        .read_to_end(scratch)
        .map_err(|err| Error::Compression(err.to_string()))?;
    if scratch.len() != data_len as usize {
        return Err(Error::DecompressedSizeMismatch {
            declared: data_len as usize,
            actual: scratch.len(),
        });
    }
    Ok(&scratch[..])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::varint_len;

    fn packet_bytes(id: VarInt, body: &[u8]) -> FrameBuffer {
        let mut packet = FrameBuffer::new();
        packet.write_varint(id);
        packet.write_bytes(body);
        packet
    }

    #[test]
    fn plain_frame_layout() {
        let packet = packet_bytes(0x01, &[0xAA, 0xBB]);
        let frame = encode_frame(&packet, None).unwrap();
        assert_eq!(frame, vec![3, 0x01, 0xAA, 0xBB]);
    }

    #[test]
    fn below_threshold_passes_through_with_zero_marker() {
        let packet = packet_bytes(0x02, &[1, 2, 3]);
        let frame = encode_frame(&packet, Some(256)).unwrap();

        // total ‖ data_len=0 ‖ raw
        let mut view = PacketView::new(&frame);
        let total = view.read_varint().unwrap();
        assert_eq!(total as usize, view.remaining());

        let body = view.read_remaining();
        let mut scratch = Vec::new();
        let raw = decode_compressed_body(body, &mut scratch).unwrap();
        assert_eq!(raw, &[0x02, 1, 2, 3]);
        assert!(scratch.is_empty(), "small payload must not be inflated");
    }

    #[test]
    fn above_threshold_round_trips_through_zlib() {
        let payload = vec![0x5A; 1024];
        let packet = packet_bytes(0x03, &payload);
        let frame = encode_frame(&packet, Some(64)).unwrap();

        let mut view = PacketView::new(&frame);
        let total = view.read_varint().unwrap();
        assert_eq!(total as usize, view.remaining());
        // deflate must actually shrink this highly repetitive payload
        assert!((total as usize) < payload.len());

        let body = view.read_remaining();
        let mut scratch = Vec::new();
        let raw = decode_compressed_body(body, &mut scratch).unwrap();
        assert_eq!(raw.len(), payload.len() + varint_len(0x03));
        assert_eq!(raw[0], 0x03);
        assert!(raw[1..].iter().all(|&byte| byte == 0x5A));
    }

    #[test]
    fn size_mismatch_is_rejected() {
        let packet = packet_bytes(0x04, &[7; 512]);
        let frame = encode_frame(&packet, Some(16)).unwrap();

        let mut view = PacketView::new(&frame);
        view.read_varint().unwrap();
        let body = view.read_remaining();

        // tamper with the declared uncompressed size
        let mut tampered = FrameBuffer::new();
        let mut original = PacketView::new(body);
        let declared = original.read_varint().unwrap();
        tampered.write_varint(declared + 1);
        tampered.write_bytes(original.read_remaining());
        let tampered = tampered.into_bytes();

        let mut scratch = Vec::new();
        assert!(matches!(
            decode_compressed_body(&tampered, &mut scratch),
            Err(Error::DecompressedSizeMismatch { .. })
        ));
    }
}
