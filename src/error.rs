//! Canonical error type for channel operations.
//!
//! Layer-specific errors ([`FrameError`], [`MessageError`],
//! [`HandshakeError`]) convert into [`WebSocketError`], which also covers
//! transport failures and misuse of a channel that is not open.

use std::io;

use thiserror::Error;

use crate::{close::CloseCode, frame::FrameError, handshake::HandshakeError, message::MessageError};

/// Top-level error returned by channel entry points.
#[derive(Debug, Error)]
pub enum WebSocketError {
    /// A frame header violated the protocol or the configured limits.
    #[error("frame error: {0}")]
    Frame(#[from] FrameError),

    /// Frames did not form a valid message.
    #[error("message error: {0}")]
    Message(#[from] MessageError),

    /// The upgrade handshake failed.
    #[error("handshake failed: {0}")]
    Handshake(#[from] HandshakeError),

    /// The underlying transport failed.
    #[error("transport error: {0}")]
    Transport(#[from] io::Error),

    /// The channel has not completed its handshake.
    #[error("channel is not open")]
    NotOpen,

    /// The channel is closed.
    #[error("channel is closed")]
    Closed,
}

impl WebSocketError {
    /// Close status associated with this error.
    ///
    /// Protocol violations default to 1002. Transport failures map to the
    /// local-only 1006.
    ///
    /// ```
    /// use wiresocket::{CloseCode, WebSocketError, message::MessageError};
    ///
    /// let err = WebSocketError::from(MessageError::InvalidUtf8);
    /// assert_eq!(err.close_code(), CloseCode::INVALID_DATA);
    /// ```
    #[must_use]
    pub fn close_code(&self) -> CloseCode {
        match self {
            Self::Frame(e) => e.close_code(),
            Self::Message(e) => e.close_code(),
            Self::Transport(_) => CloseCode::ABNORMAL,
            Self::Handshake(_) | Self::NotOpen | Self::Closed => CloseCode::PROTOCOL_ERROR,
        }
    }

    /// Whether the error came from the peer violating the protocol.
    #[must_use]
    pub fn is_protocol_error(&self) -> bool { matches!(self, Self::Frame(_) | Self::Message(_)) }
}

impl From<WebSocketError> for io::Error {
    fn from(err: WebSocketError) -> Self {
        match err {
            WebSocketError::Transport(e) => e,
            WebSocketError::NotOpen => io::Error::new(io::ErrorKind::NotConnected, WebSocketError::NotOpen),
            WebSocketError::Closed => io::Error::new(io::ErrorKind::BrokenPipe, WebSocketError::Closed),
            other => io::Error::new(io::ErrorKind::InvalidData, other),
        }
    }
}
