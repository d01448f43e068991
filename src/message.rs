//! Message reassembly from data frames.
//!
//! A message is one text or binary frame with FIN set, or a text/binary frame
//! without FIN followed by continuation frames, the last of which sets FIN.
//! Only one message can be in progress at a time. Control frames interleave
//! freely and are handled by the channel, never by the assembler.

use std::{mem, num::NonZeroUsize, str};

use bytes::{Bytes, BytesMut};
use thiserror::Error;

use crate::{
    close::CloseCode,
    frame::{Frame, OpCode},
};

/// Payload type of a data message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MessageKind {
    /// UTF-8 text.
    Text,
    /// Arbitrary bytes.
    Binary,
}

/// A complete, reassembled data message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Message {
    kind: MessageKind,
    payload: Bytes,
}

impl Message {
    /// Create a message.
    #[must_use]
    pub fn new(kind: MessageKind, payload: impl Into<Bytes>) -> Self {
        Self {
            kind,
            payload: payload.into(),
        }
    }

    /// Text message.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self { Self::new(MessageKind::Text, text.into()) }

    /// Binary message.
    #[must_use]
    pub fn binary(payload: impl Into<Bytes>) -> Self { Self::new(MessageKind::Binary, payload) }

    /// Payload type.
    #[must_use]
    pub const fn kind(&self) -> MessageKind { self.kind }

    /// Whether the message was sent as binary.
    #[must_use]
    pub const fn is_binary(&self) -> bool { matches!(self.kind, MessageKind::Binary) }

    /// Payload bytes.
    #[must_use]
    pub fn payload(&self) -> &[u8] { &self.payload }

    /// Consume the message, returning its payload.
    #[must_use]
    pub fn into_payload(self) -> Bytes { self.payload }

    /// Payload as text, if it is valid UTF-8.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> { str::from_utf8(&self.payload).ok() }
}

/// Fragmentation and content violations found while reassembling.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum MessageError {
    /// Continuation frame with no message in progress.
    #[error("unexpected continuation frame")]
    UnexpectedContinuation,

    /// Text or binary frame while another message is unfinished.
    #[error("unterminated message fragment sequence")]
    UnterminatedFragmentSequence,

    /// Reassembled message would exceed the configured cap.
    #[error("message too large: {attempted} > {limit}")]
    MessageTooLarge {
        /// Size the message would reach with the offending frame.
        attempted: usize,
        /// Configured maximum.
        limit: NonZeroUsize,
    },

    /// Text message is not valid UTF-8.
    #[error("text message is not valid UTF-8")]
    InvalidUtf8,
}

impl MessageError {
    /// Close status sent when this error terminates a channel.
    #[must_use]
    pub const fn close_code(&self) -> CloseCode {
        match self {
            Self::MessageTooLarge { .. } => CloseCode::MESSAGE_TOO_BIG,
            Self::InvalidUtf8 => CloseCode::INVALID_DATA,
            Self::UnexpectedContinuation | Self::UnterminatedFragmentSequence => {
                CloseCode::PROTOCOL_ERROR
            }
        }
    }
}

#[derive(Debug, Default)]
enum AssemblyState {
    #[default]
    Idle,
    InMessage {
        kind: MessageKind,
        body: BytesMut,
    },
}

/// Two-state reassembler for fragmented data messages.
///
/// # Examples
///
/// ```
/// use wiresocket::{
///     frame::Frame,
///     message::{Message, MessageAssembler},
/// };
///
/// let mut assembler = MessageAssembler::new();
/// assert_eq!(assembler.accept(Frame::text("Hel").with_fin(false)), Ok(None));
/// assert!(assembler.is_in_progress());
/// let message = assembler.accept(Frame::continuation("lo")).expect("valid");
/// assert_eq!(message, Some(Message::text("Hello")));
/// ```
#[derive(Debug, Default)]
pub struct MessageAssembler {
    state: AssemblyState,
    max_message_size: Option<NonZeroUsize>,
    validate_utf8: bool,
}

impl MessageAssembler {
    /// Create an assembler with no size cap or UTF-8 validation.
    #[must_use]
    pub fn new() -> Self { Self::default() }

    /// Cap the reassembled message size.
    #[must_use]
    pub fn with_max_message_size(mut self, limit: Option<NonZeroUsize>) -> Self {
        self.max_message_size = limit;
        self
    }

    /// Reject text messages that are not valid UTF-8.
    #[must_use]
    pub fn with_utf8_validation(mut self, enabled: bool) -> Self {
        self.validate_utf8 = enabled;
        self
    }

    /// Whether a fragmented message is waiting for more frames.
    #[must_use]
    pub fn is_in_progress(&self) -> bool { matches!(self.state, AssemblyState::InMessage { .. }) }

    /// Feed one data frame.
    ///
    /// Returns the completed message when `frame` finishes one. Control
    /// frames must be handled by the caller and are ignored here.
    ///
    /// # Errors
    ///
    /// Returns a [`MessageError`] on an out-of-sequence frame, when the size
    /// cap is exceeded, or when UTF-8 validation fails. The assembler is
    /// reset to idle.
    pub fn accept(&mut self, frame: Frame) -> Result<Option<Message>, MessageError> {
        debug_assert!(!frame.opcode().is_control(), "control frames bypass reassembly");
        let result = self.step(frame);
        if result.is_err() {
            self.reset();
        }
        result
    }

    /// Drop any partial message.
    pub fn reset(&mut self) { self.state = AssemblyState::Idle; }

    fn step(&mut self, frame: Frame) -> Result<Option<Message>, MessageError> {
        let fin = frame.fin();
        let kind = match frame.opcode() {
            OpCode::Text => MessageKind::Text,
            OpCode::Binary => MessageKind::Binary,
            OpCode::Continuation => return self.continue_message(fin, frame.payload()),
            OpCode::Close | OpCode::Ping | OpCode::Pong => return Ok(None),
        };
        if self.is_in_progress() {
            return Err(MessageError::UnterminatedFragmentSequence);
        }
        check_size(self.max_message_size, frame.payload().len())?;
        if fin {
            return self.finish(kind, frame.into_payload()).map(Some);
        }
        self.state = AssemblyState::InMessage {
            kind,
            body: BytesMut::from(frame.payload()),
        };
        Ok(None)
    }

    fn continue_message(&mut self, fin: bool, payload: &[u8]) -> Result<Option<Message>, MessageError> {
        let AssemblyState::InMessage { body, .. } = &mut self.state else {
            return Err(MessageError::UnexpectedContinuation);
        };
        check_size(self.max_message_size, body.len().saturating_add(payload.len()))?;
        body.extend_from_slice(payload);
        if !fin {
            return Ok(None);
        }
        match mem::take(&mut self.state) {
            AssemblyState::InMessage { kind, body } => self.finish(kind, body.freeze()).map(Some),
            AssemblyState::Idle => Err(MessageError::UnexpectedContinuation),
        }
    }

    fn finish(&self, kind: MessageKind, payload: Bytes) -> Result<Message, MessageError> {
        if self.validate_utf8 && kind == MessageKind::Text && str::from_utf8(&payload).is_err() {
            return Err(MessageError::InvalidUtf8);
        }
        Ok(Message { kind, payload })
    }
}

fn check_size(limit: Option<NonZeroUsize>, attempted: usize) -> Result<(), MessageError> {
    match limit {
        Some(limit) if attempted > limit.get() => Err(MessageError::MessageTooLarge { attempted, limit }),
        _ => Ok(()),
    }
}
