//! Close status codes carried in WebSocket close frames.
//!
//! A close payload starts with a two-byte status code in network order,
//! optionally followed by a UTF-8 reason. Codes 1005 and 1006 are reserved
//! for local reporting and never appear on the wire.

use std::fmt;

use crate::byte_order::{read_network_u16, write_network_u16};

/// Sixteen-bit close status code.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CloseCode(u16);

impl CloseCode {
    /// Normal closure.
    pub const NORMAL: Self = Self(1000);
    /// Endpoint is going away.
    pub const GOING_AWAY: Self = Self(1001);
    /// Protocol error.
    pub const PROTOCOL_ERROR: Self = Self(1002);
    /// Data type the endpoint cannot accept.
    pub const NOT_ACCEPTABLE: Self = Self(1003);
    /// No status code was present in the close frame.
    pub const NO_STATUS: Self = Self(1005);
    /// Transport closed without a close frame.
    pub const ABNORMAL: Self = Self(1006);
    /// Message data inconsistent with its type.
    pub const INVALID_DATA: Self = Self(1007);
    /// Policy violation.
    pub const POLICY_VIOLATION: Self = Self(1008);
    /// Message too big to process.
    pub const MESSAGE_TOO_BIG: Self = Self(1009);
    /// Client expected an extension the server did not negotiate.
    pub const EXTENSION_MISSING: Self = Self(1010);
    /// Server hit an unexpected condition.
    pub const UNEXPECTED_ERROR: Self = Self(1011);

    /// Wrap a raw status value.
    #[must_use]
    pub const fn new(code: u16) -> Self { Self(code) }

    /// Raw status value.
    #[must_use]
    pub const fn code(self) -> u16 { self.0 }

    /// Whether this code may be written into a close frame.
    #[must_use]
    pub const fn is_sendable(self) -> bool { !matches!(self.0, 1005 | 1006 | 1015) }

    /// Decode the status and reason from a close frame payload.
    ///
    /// Returns `None` when the payload is shorter than two bytes. The reason
    /// is handed back raw; it is not validated as UTF-8.
    ///
    /// # Examples
    ///
    /// ```
    /// use wiresocket::CloseCode;
    ///
    /// let (code, reason) = CloseCode::from_payload(b"\x03\xe8bye").expect("status present");
    /// assert_eq!(code, CloseCode::NORMAL);
    /// assert_eq!(reason, b"bye");
    /// assert!(CloseCode::from_payload(b"\x03").is_none());
    /// ```
    #[must_use]
    pub fn from_payload(payload: &[u8]) -> Option<(Self, &[u8])> {
        let (status, reason) = payload.split_first_chunk::<2>()?;
        Some((Self(read_network_u16(*status)), reason))
    }

    /// Encode the status for a close frame payload.
    #[must_use]
    pub fn to_payload(self) -> [u8; 2] { write_network_u16(self.0) }
}

impl From<u16> for CloseCode {
    fn from(code: u16) -> Self { Self(code) }
}

impl From<CloseCode> for u16 {
    fn from(code: CloseCode) -> Self { code.0 }
}

impl fmt::Display for CloseCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::CloseCode;

    #[rstest]
    #[case(CloseCode::NORMAL, true)]
    #[case(CloseCode::MESSAGE_TOO_BIG, true)]
    #[case(CloseCode::NO_STATUS, false)]
    #[case(CloseCode::ABNORMAL, false)]
    #[case(CloseCode::new(1015), false)]
    fn sendable_codes(#[case] code: CloseCode, #[case] sendable: bool) {
        assert_eq!(code.is_sendable(), sendable);
    }

    #[test]
    fn payload_round_trips_status() {
        let payload = CloseCode::PROTOCOL_ERROR.to_payload();
        let (code, reason) = CloseCode::from_payload(&payload).expect("status");
        assert_eq!(code, CloseCode::PROTOCOL_ERROR);
        assert!(reason.is_empty());
    }

    #[test]
    fn empty_payload_has_no_status() {
        assert!(CloseCode::from_payload(&[]).is_none());
    }
}
