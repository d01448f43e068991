//! Handler double that records events in delivery order.

use bytes::Bytes;
use wiresocket::{ChannelContext, ChannelHandler, CloseCode, Message, WebSocketError};

/// One observed callback.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event {
    /// `on_open` with the negotiated subprotocol.
    Open(Option<String>),
    /// `on_message`.
    Message(Message),
    /// `on_pong` with its payload.
    Pong(Bytes),
    /// Display text of the reported error.
    Error(String),
    /// `on_close` with the reported status.
    Close(Option<CloseCode>),
}

/// Records every callback, optionally echoing messages back.
#[derive(Debug, Default)]
pub struct RecordingHandler {
    events: Vec<Event>,
    echo: bool,
}

impl RecordingHandler {
    /// Handler that only records.
    #[must_use]
    pub fn new() -> Self { Self::default() }

    /// Handler that sends each received message straight back.
    #[must_use]
    pub fn echoing() -> Self {
        Self {
            echo: true,
            ..Self::default()
        }
    }

    /// Every event so far.
    #[must_use]
    pub fn events(&self) -> &[Event] { &self.events }

    /// Received messages only.
    #[must_use]
    pub fn messages(&self) -> Vec<&Message> {
        self.events
            .iter()
            .filter_map(|event| match event {
                Event::Message(message) => Some(message),
                _ => None,
            })
            .collect()
    }

    /// How many `on_close` calls were seen.
    #[must_use]
    pub fn close_count(&self) -> usize { self.events.iter().filter(|e| matches!(e, Event::Close(_))).count() }

    /// Code from the last `on_close`, if one arrived.
    #[must_use]
    pub fn close_code(&self) -> Option<Option<CloseCode>> {
        self.events.iter().rev().find_map(|event| match event {
            Event::Close(code) => Some(*code),
            _ => None,
        })
    }

    /// Forget recorded events.
    pub fn clear(&mut self) { self.events.clear(); }
}

impl ChannelHandler for RecordingHandler {
    fn on_open(&mut self, protocol: Option<&str>, _ctx: &mut ChannelContext<'_>) {
        self.events.push(Event::Open(protocol.map(str::to_owned)));
    }

    fn on_message(&mut self, message: Message, ctx: &mut ChannelContext<'_>) {
        if self.echo {
            // Echo failures surface through on_error/on_close.
            let _ = ctx.send(message.clone());
        }
        self.events.push(Event::Message(message));
    }

    fn on_pong(&mut self, payload: Bytes, _ctx: &mut ChannelContext<'_>) { self.events.push(Event::Pong(payload)); }

    fn on_error(&mut self, error: &WebSocketError) { self.events.push(Event::Error(error.to_string())); }

    fn on_close(&mut self, code: Option<CloseCode>) { self.events.push(Event::Close(code)); }
}
