//! Channel lifecycle state and the outbound half shared with callbacks.

use std::fmt;

use bytes::BytesMut;
use log::debug;

use super::Transport;
use crate::{
    close::CloseCode,
    error::WebSocketError,
    frame::{Frame, Role, write_frame_for},
    metrics::{self, Direction},
};

/// Lifecycle of a channel. `Closed` is terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ChannelState {
    /// Client waiting for the server's upgrade response.
    HandshakePending,
    /// Frames may flow in both directions.
    Open,
    /// No further reads are processed and writes fail.
    Closed,
}

impl ChannelState {
    /// Whether frames may be sent.
    #[must_use]
    pub const fn is_open(self) -> bool { matches!(self, Self::Open) }

    /// Whether the channel has reached its terminal state.
    #[must_use]
    pub const fn is_closed(self) -> bool { matches!(self, Self::Closed) }
}

impl fmt::Display for ChannelState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::HandshakePending => "handshake pending",
            Self::Open => "open",
            Self::Closed => "closed",
        })
    }
}

/// State and write path reachable from handler callbacks.
///
/// Closing from here cannot call the handler, which is mutably borrowed
/// during a callback, so the close notification is parked in
/// `pending_close` and delivered by the channel once the callback returns.
#[derive(Debug)]
pub(crate) struct Link {
    pub(crate) role: Role,
    pub(crate) state: ChannelState,
    pub(crate) protocol: Option<String>,
    pub(crate) pending_close: Option<Option<CloseCode>>,
    scratch: BytesMut,
}

impl Link {
    pub(crate) fn new(role: Role, state: ChannelState) -> Self {
        Self {
            role,
            state,
            protocol: None,
            pending_close: None,
            scratch: BytesMut::new(),
        }
    }

    pub(crate) fn open(&mut self, protocol: Option<String>) {
        debug!("{:?} channel open, protocol {protocol:?}", self.role);
        self.state = ChannelState::Open;
        self.protocol = protocol;
        metrics::inc_channels();
    }

    /// Move to `Closed` and queue the close notification.
    pub(crate) fn mark_closed(&mut self, code: Option<CloseCode>) {
        if self.state.is_closed() {
            return;
        }
        if self.state.is_open() {
            metrics::dec_channels();
        }
        debug!("{:?} channel closed with {code:?}", self.role);
        self.state = ChannelState::Closed;
        self.pending_close = Some(code);
    }

    pub(crate) fn send(&mut self, transport: &mut dyn Transport, frame: &Frame) -> Result<(), WebSocketError> {
        match self.state {
            ChannelState::HandshakePending => Err(WebSocketError::NotOpen),
            ChannelState::Closed => Err(WebSocketError::Closed),
            ChannelState::Open => {
                self.scratch.clear();
                write_frame_for(self.role, frame, &mut self.scratch);
                if let Err(err) = transport.write(&self.scratch) {
                    self.abort(transport);
                    return Err(err.into());
                }
                metrics::inc_frames(Direction::Outbound);
                Ok(())
            }
        }
    }

    /// Start a local close. A no-op once closed.
    pub(crate) fn close(
        &mut self,
        transport: &mut dyn Transport,
        code: Option<CloseCode>,
    ) -> Result<(), WebSocketError> {
        match self.state {
            ChannelState::Closed => Ok(()),
            ChannelState::HandshakePending => {
                transport.close();
                self.mark_closed(None);
                Ok(())
            }
            ChannelState::Open => {
                let result = self.send(transport, &Frame::close(code));
                if self.state.is_open() {
                    transport.close();
                    let reported = code.filter(|c| c.is_sendable()).unwrap_or(CloseCode::NO_STATUS);
                    self.mark_closed(Some(reported));
                }
                result
            }
        }
    }

    /// Abnormal close after the transport failed.
    pub(crate) fn abort(&mut self, transport: &mut dyn Transport) {
        let code = self.state.is_open().then_some(CloseCode::ABNORMAL);
        if !self.state.is_closed() {
            transport.close();
        }
        self.mark_closed(code);
    }
}
