//! Frame serialisation.

use bytes::{BufMut, BytesMut};

use super::{Frame, Role, mask::apply_mask};
use crate::byte_order::{write_network_u16, write_network_u64};

/// Longest possible header: 2 lead bytes, 8 length bytes, 4 key bytes.
pub const MAX_HEADER_LEN: usize = 14;

/// Bytes needed to encode a frame with a `payload_len` byte payload.
///
/// ```
/// use wiresocket::frame::encoded_len;
///
/// assert_eq!(encoded_len(125, false), 127);
/// assert_eq!(encoded_len(126, true), 2 + 2 + 4 + 126);
/// assert_eq!(encoded_len(65_536, false), 2 + 8 + 65_536);
/// ```
#[must_use]
pub const fn encoded_len(payload_len: usize, masked: bool) -> usize {
    let ext = if payload_len <= 125 {
        0
    } else if payload_len <= 0xFFFF {
        2
    } else {
        8
    };
    let key = if masked { 4 } else { 0 };
    2 + ext + key + payload_len
}

/// Append `frame` to `dst`, masking with the frame's own key if it has one.
pub fn write_frame(frame: &Frame, dst: &mut BytesMut) { encode(frame, frame.mask(), dst); }

/// Append `frame` to `dst` following the masking rule for `role`.
///
/// Clients mask every frame, using the frame's key if set and a fresh random
/// key otherwise. Servers never mask; any key on the frame is ignored.
pub fn write_frame_for(role: Role, frame: &Frame, dst: &mut BytesMut) {
    let mask = role
        .masks_outgoing()
        .then(|| frame.mask().unwrap_or_else(rand::random));
    encode(frame, mask, dst);
}

#[expect(
    clippy::cast_possible_truncation,
    reason = "match arms bound the length to the target width"
)]
fn encode(frame: &Frame, mask: Option<[u8; 4]>, dst: &mut BytesMut) {
    let payload = frame.payload();
    dst.reserve(encoded_len(payload.len(), mask.is_some()));

    dst.put_u8(u8::from(frame.fin()) << 7 | frame.opcode().as_u8());
    let mask_bit = if mask.is_some() { 0x80 } else { 0 };
    match payload.len() {
        len @ 0..=125 => dst.put_u8(mask_bit | len as u8),
        len @ 126..=0xFFFF => {
            dst.put_u8(mask_bit | 126);
            dst.put_slice(&write_network_u16(len as u16));
        }
        len => {
            dst.put_u8(mask_bit | 127);
            dst.put_slice(&write_network_u64(len as u64));
        }
    }

    match mask {
        Some(key) => {
            dst.put_slice(&key);
            let start = dst.len();
            dst.put_slice(payload);
            apply_mask(&mut dst[start..], key);
        }
        None => dst.put_slice(payload),
    }
}
