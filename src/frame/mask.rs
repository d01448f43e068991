//! Payload masking (RFC 6455 §5.3).
//!
//! Byte `i` of a payload is XORed with byte `i % 4` of the key, counting from
//! the first payload byte. The transform is its own inverse.

/// Mask or unmask `payload` in place.
///
/// When the slice sits inside a larger buffer, pass only the payload span so
/// key indexing starts at the first payload byte.
///
/// # Examples
///
/// ```
/// use wiresocket::frame::apply_mask;
///
/// let key = [0x37, 0xfa, 0x21, 0x3d];
/// let mut data = *b"Hello";
/// apply_mask(&mut data, key);
/// assert_eq!(data, [0x7f, 0x9f, 0x4d, 0x51, 0x58]);
/// apply_mask(&mut data, key);
/// assert_eq!(&data, b"Hello");
/// ```
pub fn apply_mask(payload: &mut [u8], key: [u8; 4]) {
    let mut chunks = payload.chunks_exact_mut(4);
    for chunk in &mut chunks {
        for (byte, k) in chunk.iter_mut().zip(key) {
            *byte ^= k;
        }
    }
    for (byte, k) in chunks.into_remainder().iter_mut().zip(key) {
        *byte ^= k;
    }
}
