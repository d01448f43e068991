//! WebSocket frame model, incremental parser, and writer.
//!
//! A [`Frame`] is one wire unit: a 2–14 byte header followed by an optional
//! masking key and the payload. [`FrameAssembler`] parses frames out of a
//! [`StreamBuffer`](crate::buffer::StreamBuffer) one stage at a time so that
//! parsing can pause at any byte boundary and resume on the next delivery.
//! [`write_frame`] serialises frames, masking them when the local endpoint is
//! a client.

mod assembler;
pub mod error;
mod header;
pub mod mask;
mod opcode;
mod writer;

use bytes::Bytes;

pub use assembler::{FrameAssembler, FrameRules, MaskPolicy};
pub use error::FrameError;
pub use header::FrameHeader;
pub use mask::apply_mask;
pub use opcode::OpCode;
pub use writer::{MAX_HEADER_LEN, encoded_len, write_frame, write_frame_for};

use crate::close::CloseCode;

/// Largest payload a control frame may carry.
pub const MAX_CONTROL_PAYLOAD: usize = 125;

/// Which side of the connection the local endpoint plays.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Role {
    /// Initiated the handshake; masks every outgoing frame.
    Client,
    /// Accepted the handshake; never masks.
    Server,
}

impl Role {
    /// Whether frames written by this role carry a masking key.
    #[must_use]
    pub const fn masks_outgoing(self) -> bool { matches!(self, Self::Client) }

    /// Mask policy applied to frames received from the peer.
    #[must_use]
    pub const fn inbound_mask_policy(self) -> MaskPolicy {
        match self {
            Self::Client => MaskPolicy::Forbidden,
            Self::Server => MaskPolicy::Required,
        }
    }
}

/// A single WebSocket frame with an unmasked payload.
///
/// Parsed frames keep the masking key they arrived with so callers can tell
/// how the peer framed them; the payload is always delivered in the clear.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Frame {
    fin: bool,
    opcode: OpCode,
    mask: Option<[u8; 4]>,
    payload: Bytes,
}

impl Frame {
    /// Create a final, unmasked frame.
    #[must_use]
    pub fn new(opcode: OpCode, payload: impl Into<Bytes>) -> Self {
        Self {
            fin: true,
            opcode,
            mask: None,
            payload: payload.into(),
        }
    }

    /// Text frame from a UTF-8 string.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self { Self::new(OpCode::Text, text.into()) }

    /// Binary frame.
    #[must_use]
    pub fn binary(payload: impl Into<Bytes>) -> Self { Self::new(OpCode::Binary, payload) }

    /// Continuation frame.
    #[must_use]
    pub fn continuation(payload: impl Into<Bytes>) -> Self { Self::new(OpCode::Continuation, payload) }

    /// Ping frame.
    #[must_use]
    pub fn ping(payload: impl Into<Bytes>) -> Self { Self::new(OpCode::Ping, payload) }

    /// Pong frame.
    #[must_use]
    pub fn pong(payload: impl Into<Bytes>) -> Self { Self::new(OpCode::Pong, payload) }

    /// Close frame. Codes that may not appear on the wire produce an empty
    /// payload.
    #[must_use]
    pub fn close(code: Option<CloseCode>) -> Self {
        let payload = match code {
            Some(code) if code.is_sendable() => Bytes::copy_from_slice(&code.to_payload()),
            _ => Bytes::new(),
        };
        Self::new(OpCode::Close, payload)
    }

    /// Set the FIN flag.
    #[must_use]
    pub fn with_fin(mut self, fin: bool) -> Self {
        self.fin = fin;
        self
    }

    /// Attach a masking key used when the frame is written.
    #[must_use]
    pub fn with_mask(mut self, key: [u8; 4]) -> Self {
        self.mask = Some(key);
        self
    }

    pub(crate) fn from_parts(header: FrameHeader, payload: Bytes) -> Self {
        Self {
            fin: header.fin,
            opcode: header.opcode,
            mask: header.mask,
            payload,
        }
    }

    /// Whether this is the final frame of its message.
    #[must_use]
    pub const fn fin(&self) -> bool { self.fin }

    /// Frame opcode.
    #[must_use]
    pub const fn opcode(&self) -> OpCode { self.opcode }

    /// Masking key the frame was or will be sent with.
    #[must_use]
    pub const fn mask(&self) -> Option<[u8; 4]> { self.mask }

    /// Unmasked payload.
    #[must_use]
    pub fn payload(&self) -> &[u8] { &self.payload }

    /// Consume the frame, returning the payload.
    #[must_use]
    pub fn into_payload(self) -> Bytes { self.payload }
}
