//! WebSocket channel orchestration.
//!
//! A [`Channel`] owns the parse state for one connection and drives it from
//! bytes the caller pushes in through [`Channel::receive`]. Received bytes
//! flow through the streaming buffer, frame assembler, and message
//! reassembler; complete messages and control frames are dispatched to a
//! [`ChannelHandler`] before parsing resumes. Outbound calls serialise
//! frames straight onto the [`Transport`].
//!
//! A channel is single-owner and synchronous. Callers that receive on one
//! thread and send on another must wrap the channel in a lock.

mod context;
mod handler;
mod state;
mod transport;

use std::io;

use bytes::Bytes;
use log::{debug, warn};

pub use context::ChannelContext;
pub use handler::{ChannelHandler, ChannelHooks};
pub use state::ChannelState;
use state::Link;
pub use transport::{BufferedTransport, Transport};

use crate::{
    buffer::StreamBuffer,
    close::CloseCode,
    config::ChannelConfig,
    error::WebSocketError,
    frame::{Frame, FrameAssembler, OpCode, Role},
    handshake::{ClientHandshake, ServerUpgrade},
    message::{Message, MessageAssembler},
    metrics::{self, Direction},
};

/// One WebSocket connection in either role.
///
/// # Examples
///
/// ```
/// use wiresocket::{
///     channel::{Channel, ChannelHooks},
///     handshake::{Accepted, ServerHandshake},
///     ChannelConfig,
/// };
///
/// let request = b"GET / HTTP/1.1\r\nUpgrade: websocket\r\nConnection: Upgrade\r\n\
///     Sec-WebSocket-Key: dGhlIHNhbXBsZSBub25jZQ==\r\nSec-WebSocket-Version: 13\r\n\r\n";
/// let mut transport = Vec::new();
/// let Accepted::Upgrade(upgrade) = ServerHandshake::new()
///     .accept(request, &mut transport)
///     .expect("valid request")
/// else {
///     panic!("expected upgrade");
/// };
/// transport.clear();
///
/// let hooks = ChannelHooks::default().on_message(|message, ctx| {
///     let _ = ctx.send(message);
/// });
/// let mut channel = Channel::accept(transport, hooks, upgrade, ChannelConfig::default());
/// // Masked "Hi" from the client.
/// channel
///     .receive(&[0x81, 0x82, 1, 2, 3, 4, b'H' ^ 1, b'i' ^ 2])
///     .expect("valid frame");
/// assert_eq!(channel.transport().as_slice(), b"\x81\x02Hi");
/// ```
pub struct Channel<T, H> {
    link: Link,
    transport: T,
    handler: H,
    input: StreamBuffer,
    frames: FrameAssembler,
    messages: MessageAssembler,
    config: ChannelConfig,
    handshake: Option<ClientHandshake>,
    resource: String,
}

impl<T: Transport, H: ChannelHandler> Channel<T, H> {
    /// Client channel awaiting its upgrade response.
    ///
    /// Call [`start`](Self::start) to send the request.
    #[must_use]
    pub fn client(transport: T, handler: H, handshake: ClientHandshake, config: ChannelConfig) -> Self {
        let resource = handshake.resource().to_owned();
        Self {
            link: Link::new(Role::Client, ChannelState::HandshakePending),
            transport,
            handler,
            input: StreamBuffer::new(),
            frames: FrameAssembler::new(config.frame_rules(Role::Client)),
            messages: config.message_assembler(),
            config,
            handshake: Some(handshake),
            resource,
        }
    }

    /// Server channel for an upgrade accepted by
    /// [`ServerHandshake`](crate::handshake::ServerHandshake).
    ///
    /// The channel starts open and `on_open` fires immediately. Bytes that
    /// arrived with the request are buffered and parsed on the next
    /// [`receive`](Self::receive); pass an empty slice to parse them at once.
    #[must_use]
    pub fn accept(transport: T, handler: H, upgrade: ServerUpgrade, config: ChannelConfig) -> Self {
        let mut channel = Self {
            link: Link::new(Role::Server, ChannelState::HandshakePending),
            transport,
            handler,
            input: StreamBuffer::new(),
            frames: FrameAssembler::new(config.frame_rules(Role::Server)),
            messages: config.message_assembler(),
            config,
            handshake: None,
            resource: upgrade.resource,
        };
        channel.input.extend(&upgrade.leftover);
        channel.open(upgrade.protocol);
        channel
    }

    /// Send the upgrade request.
    ///
    /// # Errors
    ///
    /// Returns [`WebSocketError::NotOpen`] if this is not a client channel
    /// waiting to start, or the transport failure.
    pub fn start(&mut self) -> Result<(), WebSocketError> {
        if !matches!(self.link.state, ChannelState::HandshakePending) {
            return Err(WebSocketError::NotOpen);
        }
        let handshake = self.handshake.as_ref().ok_or(WebSocketError::NotOpen)?;
        let request = handshake.request().to_bytes();
        if let Err(err) = self.transport.write(&request) {
            return Err(self.fail(err.into()));
        }
        Ok(())
    }

    /// Feed bytes received from the transport.
    ///
    /// Every complete frame is processed and its events dispatched before
    /// this returns. Partial frames are kept for the next call. Input is
    /// ignored once the channel is closed.
    ///
    /// # Errors
    ///
    /// Returns the handshake, protocol, or transport error that closed the
    /// channel. The handler has already seen it through `on_error`, and
    /// `on_close` has fired.
    pub fn receive(&mut self, data: &[u8]) -> Result<(), WebSocketError> {
        match self.link.state {
            ChannelState::Closed => Ok(()),
            ChannelState::HandshakePending => self.complete_handshake(data),
            ChannelState::Open => {
                self.input.extend(data);
                self.drain()
            }
        }
    }

    /// Report that the transport closed without a close frame.
    ///
    /// An open channel reports 1006; a channel still in its handshake
    /// reports `None`.
    pub fn connection_closed(&mut self) {
        let code = self.link.state.is_open().then_some(CloseCode::ABNORMAL);
        self.link.mark_closed(code);
        self.flush_close();
    }

    /// Report a transport failure.
    ///
    /// The handler sees the error, the transport is closed, and the channel
    /// closes abnormally.
    pub fn transport_error(&mut self, err: io::Error) {
        if self.link.state.is_closed() {
            return;
        }
        let err = WebSocketError::from(err);
        metrics::inc_errors(err.close_code().code());
        self.handler.on_error(&err);
        self.link.abort(&mut self.transport);
        self.flush_close();
    }

    /// Send a text message.
    ///
    /// # Errors
    ///
    /// Returns [`WebSocketError::NotOpen`] before the handshake completes,
    /// [`WebSocketError::Closed`] after close, or the transport failure.
    pub fn send_text(&mut self, text: &str) -> Result<(), WebSocketError> {
        let result = self.context().send_text(text);
        self.flush_close();
        result
    }

    /// Send a binary message.
    ///
    /// # Errors
    ///
    /// As for [`send_text`](Self::send_text).
    pub fn send_binary(&mut self, payload: impl Into<Bytes>) -> Result<(), WebSocketError> {
        let result = self.context().send_binary(payload);
        self.flush_close();
        result
    }

    /// Send a message.
    ///
    /// # Errors
    ///
    /// As for [`send_text`](Self::send_text).
    pub fn send(&mut self, message: Message) -> Result<(), WebSocketError> {
        let result = self.context().send(message);
        self.flush_close();
        result
    }

    /// Send a ping.
    ///
    /// # Errors
    ///
    /// As for [`ChannelContext::ping`].
    pub fn ping(&mut self, payload: impl Into<Bytes>) -> Result<(), WebSocketError> {
        let result = self.context().ping(payload);
        self.flush_close();
        result
    }

    /// Close the channel.
    ///
    /// Writes a close frame carrying `code`, closes the transport, and fires
    /// `on_close` before returning. `None` sends an empty payload and
    /// reports 1005. Calling this on a closed channel does nothing.
    ///
    /// # Errors
    ///
    /// Returns the transport failure if the close frame cannot be written.
    pub fn close(&mut self, code: Option<CloseCode>) -> Result<(), WebSocketError> {
        let result = self.context().close(code);
        self.flush_close();
        result
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

    /// Request target of the upgrade.
    #[must_use]
    pub fn resource(&self) -> &str { &self.resource }

    /// Configuration in force.
    #[must_use]
    pub fn config(&self) -> &ChannelConfig { &self.config }

    /// Whether a fragmented message is partially received.
    #[must_use]
    pub fn is_message_in_progress(&self) -> bool { self.messages.is_in_progress() }

    /// Borrow the transport.
    #[must_use]
    pub fn transport(&self) -> &T { &self.transport }

    /// Mutably borrow the transport.
    pub fn transport_mut(&mut self) -> &mut T { &mut self.transport }

    /// Borrow the handler.
    #[must_use]
    pub fn handler(&self) -> &H { &self.handler }

    /// Mutably borrow the handler.
    pub fn handler_mut(&mut self) -> &mut H { &mut self.handler }

    fn context(&mut self) -> ChannelContext<'_> { ChannelContext::new(&mut self.link, &mut self.transport) }

    fn open(&mut self, protocol: Option<String>) {
        self.link.open(protocol);
        let protocol = self.link.protocol.clone();
        let mut ctx = ChannelContext::new(&mut self.link, &mut self.transport);
        self.handler.on_open(protocol.as_deref(), &mut ctx);
        self.flush_close();
    }

    fn complete_handshake(&mut self, data: &[u8]) -> Result<(), WebSocketError> {
        let Some(handshake) = &self.handshake else {
            return Err(WebSocketError::NotOpen);
        };
        let upgrade = match handshake.validate(data) {
            Ok(upgrade) => upgrade,
            Err(err) => return Err(self.fail(err.into())),
        };
        self.handshake = None;
        self.open(upgrade.protocol);
        self.input.extend(&upgrade.leftover);
        self.drain()
    }

    fn drain(&mut self) -> Result<(), WebSocketError> {
        while self.link.state.is_open() {
            let frame = match self.frames.next_frame(&mut self.input) {
                Ok(Some(frame)) => frame,
                Ok(None) => break,
                Err(err) => return Err(self.fail(err.into())),
            };
            metrics::inc_frames(Direction::Inbound);
            self.handle_frame(frame)?;
        }
        self.input.compact_if_needed(self.config.compaction());
        Ok(())
    }

    fn handle_frame(&mut self, frame: Frame) -> Result<(), WebSocketError> {
        match frame.opcode() {
            OpCode::Close => {
                self.remote_close(frame.payload());
                Ok(())
            }
            OpCode::Ping => match self.link.send(&mut self.transport, &Frame::pong(frame.into_payload())) {
                Ok(()) => Ok(()),
                Err(err) => Err(self.fail(err)),
            },
            OpCode::Pong => {
                let mut ctx = ChannelContext::new(&mut self.link, &mut self.transport);
                self.handler.on_pong(frame.into_payload(), &mut ctx);
                self.flush_close();
                Ok(())
            }
            OpCode::Text | OpCode::Binary | OpCode::Continuation => match self.messages.accept(frame) {
                Ok(Some(message)) => {
                    let mut ctx = ChannelContext::new(&mut self.link, &mut self.transport);
                    self.handler.on_message(message, &mut ctx);
                    self.flush_close();
                    Ok(())
                }
                Ok(None) => Ok(()),
                Err(err) => Err(self.fail(err.into())),
            },
        }
    }

    fn remote_close(&mut self, payload: &[u8]) {
        let code = CloseCode::from_payload(payload).map(|(code, _reason)| code);
        if self.link.send(&mut self.transport, &Frame::close(code)).is_err() {
            warn!("failed to echo close frame");
        }
        if self.link.state.is_open() {
            self.transport.close();
            self.link.mark_closed(Some(code.unwrap_or(CloseCode::NO_STATUS)));
        }
        self.flush_close();
    }

    /// Close after a fatal error, returning it for the caller.
    fn fail(&mut self, err: WebSocketError) -> WebSocketError {
        let code = err.close_code();
        debug!("{:?} channel failed with {code}: {err}", self.link.role);
        metrics::inc_errors(code.code());
        self.handler.on_error(&err);
        match self.link.state {
            ChannelState::Open if err.is_protocol_error() => {
                if self.link.send(&mut self.transport, &Frame::close(Some(code))).is_err() {
                    warn!("failed to send close frame after protocol error");
                }
                if self.link.state.is_open() {
                    self.transport.close();
                    self.link.mark_closed(Some(code));
                }
            }
            ChannelState::Open => self.link.abort(&mut self.transport),
            ChannelState::HandshakePending => {
                self.link.mark_closed(None);
                if matches!(err, WebSocketError::Transport(_)) {
                    self.transport.close();
                }
            }
            ChannelState::Closed => {}
        }
        self.flush_close();
        err
    }

    fn flush_close(&mut self) {
        if let Some(code) = self.link.pending_close.take() {
            self.handler.on_close(code);
        }
    }
}

impl<T, H> Drop for Channel<T, H> {
    fn drop(&mut self) {
        if self.link.state.is_open() {
            metrics::dec_channels();
        }
    }
}

#[cfg(test)]
mod tests;
