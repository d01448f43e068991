//! Network byte-order helpers for WebSocket wire integers.
//!
//! RFC 6455 encodes extended payload lengths and close status codes in
//! network order. Keeping the conversions here scopes the Clippy expectation
//! to one place instead of sprinkling it over the frame and close modules.

/// Encode a 16-bit extended length or close status code.
///
/// # Examples
///
/// ```
/// use wiresocket::byte_order::write_network_u16;
///
/// // Close status 1000 (normal closure).
/// assert_eq!(write_network_u16(1000), [0x03, 0xE8]);
/// ```
#[must_use]
pub fn write_network_u16(value: u16) -> [u8; 2] {
    #[expect(
        clippy::big_endian_bytes,
        reason = "RFC 6455 mandates network byte order."
    )]
    value.to_be_bytes()
}

/// Decode a 16-bit extended length or close status code.
///
/// # Examples
///
/// ```
/// use wiresocket::byte_order::read_network_u16;
///
/// assert_eq!(read_network_u16([0x03, 0xF1]), 1009);
/// ```
#[must_use]
pub fn read_network_u16(bytes: [u8; 2]) -> u16 {
    #[expect(
        clippy::big_endian_bytes,
        reason = "RFC 6455 mandates network byte order."
    )]
    u16::from_be_bytes(bytes)
}

/// Encode a 64-bit extended payload length.
#[must_use]
pub fn write_network_u64(value: u64) -> [u8; 8] {
    #[expect(
        clippy::big_endian_bytes,
        reason = "RFC 6455 mandates network byte order."
    )]
    value.to_be_bytes()
}

/// Decode a 64-bit extended payload length.
///
/// The caller is responsible for rejecting values with the most significant
/// bit set.
#[must_use]
pub fn read_network_u64(bytes: [u8; 8]) -> u64 {
    #[expect(
        clippy::big_endian_bytes,
        reason = "RFC 6455 mandates network byte order."
    )]
    u64::from_be_bytes(bytes)
}
