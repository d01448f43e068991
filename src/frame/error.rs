//! Errors raised while parsing frame headers.
//!
//! Every variant is fatal for the channel. [`FrameError::close_code`] picks
//! the status sent in the resulting close frame.

use thiserror::Error;

use crate::close::CloseCode;

/// Header-level protocol violations.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum FrameError {
    /// One of the three RSV bits was set without a negotiated extension.
    #[error("RSV bits must be clear")]
    ReservedBits,

    /// Opcode is reserved or undefined.
    #[error("unknown opcode {0:#x}")]
    UnknownOpcode(u8),

    /// Peer masked a frame it must send in the clear.
    #[error("received masked frame from server")]
    UnexpectedMask,

    /// Peer sent a frame in the clear that it must mask.
    #[error("received unmasked frame from client")]
    MissingMask,

    /// The 64-bit extended length had its most significant bit set.
    #[error("most significant bit of 64-bit frame length is set")]
    NegativeLength,

    /// Declared payload exceeds the configured cap.
    #[error("payload too large: {size} > {max}")]
    PayloadTooLarge {
        /// Declared payload length.
        size: u64,
        /// Configured maximum.
        max: usize,
    },

    /// Close, ping, or pong frame without the FIN bit.
    #[error("control frame is fragmented")]
    FragmentedControlFrame,

    /// Control frame payload longer than 125 bytes.
    #[error("control frame payload of {0} bytes exceeds 125")]
    ControlFrameTooLarge(usize),
}

impl FrameError {
    /// Close status sent when this error terminates a channel.
    ///
    /// ```
    /// use wiresocket::{CloseCode, frame::FrameError};
    ///
    /// let err = FrameError::PayloadTooLarge { size: 2048, max: 1024 };
    /// assert_eq!(err.close_code(), CloseCode::MESSAGE_TOO_BIG);
    /// assert_eq!(FrameError::ReservedBits.close_code(), CloseCode::PROTOCOL_ERROR);
    /// ```
    #[must_use]
    pub const fn close_code(&self) -> CloseCode {
        match self {
            Self::PayloadTooLarge { .. } => CloseCode::MESSAGE_TOO_BIG,
            _ => CloseCode::PROTOCOL_ERROR,
        }
    }
}
