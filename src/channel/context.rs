//! Write access handed to handler callbacks.

use bytes::Bytes;

use super::{ChannelState, Transport, state::Link};
use crate::{
    close::CloseCode,
    error::WebSocketError,
    frame::{Frame, FrameError, MAX_CONTROL_PAYLOAD, OpCode, Role},
    message::{Message, MessageKind},
};

/// Outbound operations available while a callback runs.
///
/// A handler can reply to a message, ping, or close the channel from inside
/// [`ChannelHandler`](super::ChannelHandler) methods. A close requested here
/// is reported through `on_close` after the current callback returns.
pub struct ChannelContext<'a> {
    link: &'a mut Link,
    transport: &'a mut dyn Transport,
}

impl<'a> ChannelContext<'a> {
    pub(crate) fn new(link: &'a mut Link, transport: &'a mut dyn Transport) -> Self {
        Self { link, transport }
    }

    /// Send a text message as one frame.
    ///
    /// # Errors
    ///
    /// Returns [`WebSocketError::NotOpen`] before the handshake completes,
    /// [`WebSocketError::Closed`] after close, or the transport failure.
    pub fn send_text(&mut self, text: &str) -> Result<(), WebSocketError> {
        self.link.send(self.transport, &Frame::text(text))
    }

    /// Send a binary message as one frame.
    ///
    /// # Errors
    ///
    /// As for [`send_text`](Self::send_text).
    pub fn send_binary(&mut self, payload: impl Into<Bytes>) -> Result<(), WebSocketError> {
        self.link.send(self.transport, &Frame::binary(payload))
    }

    /// Send a message as one frame.
    ///
    /// # Errors
    ///
    /// As for [`send_text`](Self::send_text).
    pub fn send(&mut self, message: Message) -> Result<(), WebSocketError> {
        let opcode = match message.kind() {
            MessageKind::Text => OpCode::Text,
            MessageKind::Binary => OpCode::Binary,
        };
        self.link.send(self.transport, &Frame::new(opcode, message.into_payload()))
    }

    /// Send a ping.
    ///
    /// # Errors
    ///
    /// Returns [`FrameError::ControlFrameTooLarge`] when `payload` exceeds
    /// 125 bytes, otherwise as for [`send_text`](Self::send_text).
    pub fn ping(&mut self, payload: impl Into<Bytes>) -> Result<(), WebSocketError> {
        let payload = payload.into();
        if payload.len() > MAX_CONTROL_PAYLOAD {
            return Err(FrameError::ControlFrameTooLarge(payload.len()).into());
        }
        self.link.send(self.transport, &Frame::ping(payload))
    }

    /// Close the channel, sending `code` in the close frame.
    ///
    /// `None` sends an empty close payload and reports 1005. Closing a
    /// closed channel does nothing.
    ///
    /// # Errors
    ///
    /// Returns the transport failure if the close frame cannot be written.
    /// The channel is closed either way.
    pub fn close(&mut self, code: Option<CloseCode>) -> Result<(), WebSocketError> {
        self.link.close(self.transport, code)
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> ChannelState { self.link.state }

    /// Whether frames may be sent.
    #[must_use]
    pub fn is_open(&self) -> bool { self.link.state.is_open() }

    /// Local role.
    #[must_use]
    pub fn role(&self) -> Role { self.link.role }

    /// Negotiated subprotocol.
    #[must_use]
    pub fn protocol(&self) -> Option<&str> { self.link.protocol.as_deref() }
}
