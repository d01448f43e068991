//! `Sec-WebSocket-Key` generation and `Sec-WebSocket-Accept` computation
//! (RFC 6455 §4.2.2).

use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use sha1::{Digest, Sha1};

/// Appended to the client key before hashing.
pub const WS_GUID: &str = "258EAFA5-E914-47DA-95CA-C5AB0DC85B11";

/// The only protocol version this crate speaks.
pub const WS_VERSION: &str = "13";

/// Number of random bytes behind a client key.
pub const KEY_LEN: usize = 16;

/// Compute the accept value a server returns for `client_key`.
///
/// ```
/// use wiresocket::handshake::compute_accept_key;
///
/// assert_eq!(
///     compute_accept_key("dGhlIHNhbXBsZSBub25jZQ=="),
///     "s3pPLMBiTxaQ9kYGzzhZRbK+xOo="
/// );
/// ```
#[must_use]
pub fn compute_accept_key(client_key: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(client_key.as_bytes());
    hasher.update(WS_GUID.as_bytes());
    BASE64.encode(hasher.finalize())
}

/// Fresh base64-encoded client key from 16 random bytes.
#[must_use]
pub fn generate_client_key() -> String { BASE64.encode(rand::random::<[u8; KEY_LEN]>()) }

/// Whether `key` is base64 that decodes to exactly 16 bytes.
#[must_use]
pub fn is_valid_client_key(key: &str) -> bool {
    BASE64
        .decode(key)
        .is_ok_and(|decoded| decoded.len() == KEY_LEN)
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::{compute_accept_key, generate_client_key, is_valid_client_key};

    #[test]
    fn rfc_test_vector() {
        assert_eq!(
            compute_accept_key("dGhlIHNhbXBsZSBub25jZQ=="),
            "s3pPLMBiTxaQ9kYGzzhZRbK+xOo="
        );
    }

    #[test]
    fn generated_keys_are_valid_and_distinct() {
        let a = generate_client_key();
        let b = generate_client_key();
        assert!(is_valid_client_key(&a));
        assert_eq!(a.len(), 24);
        assert_ne!(a, b);
    }

    #[rstest]
    #[case::rfc_sample("dGhlIHNhbXBsZSBub25jZQ==", true)]
    #[case::fifteen_bytes("AAAAAAAAAAAAAAAAAAAA", false)]
    #[case::not_base64("not a key!", false)]
    #[case::empty("", false)]
    fn client_key_validation(#[case] key: &str, #[case] valid: bool) {
        assert_eq!(is_valid_client_key(key), valid);
    }
}
