//! Hand-built wire bytes, independent of the crate's own encoder.

/// Frame with the mask bit set, `first` being the FIN/RSV/opcode byte.
#[must_use]
pub fn masked_frame(first: u8, key: [u8; 4], payload: &[u8]) -> Vec<u8> {
    let mut out = header(first, true, payload.len());
    out.extend_from_slice(&key);
    out.extend(payload.iter().zip(key.iter().cycle()).map(|(b, k)| b ^ k));
    out
}

/// Frame without a mask, as a server sends it.
#[must_use]
pub fn unmasked_frame(first: u8, payload: &[u8]) -> Vec<u8> {
    let mut out = header(first, false, payload.len());
    out.extend_from_slice(payload);
    out
}

fn header(first: u8, masked: bool, len: usize) -> Vec<u8> {
    let mask_bit = if masked { 0x80 } else { 0 };
    let mut out = vec![first];
    match len {
        0..=125 => out.push(mask_bit | u8::try_from(len).expect("fits in seven bits")),
        126..=0xFFFF => {
            out.push(mask_bit | 126);
            out.extend_from_slice(&u16::try_from(len).expect("fits in u16").to_be_bytes());
        }
        _ => {
            out.push(mask_bit | 127);
            out.extend_from_slice(&(len as u64).to_be_bytes());
        }
    }
    out
}

/// Minimal valid upgrade request.
#[must_use]
pub fn upgrade_request(resource: &str, key: &str) -> Vec<u8> {
    format!(
        "GET {resource} HTTP/1.1\r\nHost: localhost\r\nUpgrade: websocket\r\nConnection: Upgrade\r\n\
         Sec-WebSocket-Key: {key}\r\nSec-WebSocket-Version: 13\r\n\r\n"
    )
    .into_bytes()
}

/// `101` response answering `key`.
#[must_use]
pub fn upgrade_response(key: &str) -> Vec<u8> {
    format!(
        "HTTP/1.1 101 Switching Protocols\r\nUpgrade: websocket\r\nConnection: Upgrade\r\n\
         Sec-WebSocket-Accept: {}\r\n\r\n",
        wiresocket::handshake::compute_accept_key(key)
    )
    .into_bytes()
}
