//! Consumer-facing channel events.
//!
//! [`ChannelHandler`] is the interface applications implement. Every method
//! has a no-op default. [`ChannelHooks`] implements it from optional boxed
//! closures for callers that would rather not define a type.

use bytes::Bytes;

use super::ChannelContext;
use crate::{close::CloseCode, error::WebSocketError, message::Message};

/// Receives channel events, synchronously and in wire order.
pub trait ChannelHandler {
    /// The handshake completed. `protocol` is the negotiated subprotocol.
    fn on_open(&mut self, _protocol: Option<&str>, _ctx: &mut ChannelContext<'_>) {}

    /// A complete data message arrived.
    fn on_message(&mut self, _message: Message, _ctx: &mut ChannelContext<'_>) {}

    /// A pong arrived.
    fn on_pong(&mut self, _payload: Bytes, _ctx: &mut ChannelContext<'_>) {}

    /// The channel failed. `on_close` follows.
    fn on_error(&mut self, _error: &WebSocketError) {}

    /// The channel closed. `None` means it closed before the handshake
    /// completed. Delivered at most once.
    fn on_close(&mut self, _code: Option<CloseCode>) {}
}

/// Ignores every event.
impl ChannelHandler for () {}

impl<H: ChannelHandler + ?Sized> ChannelHandler for Box<H> {
    fn on_open(&mut self, protocol: Option<&str>, ctx: &mut ChannelContext<'_>) {
        (**self).on_open(protocol, ctx);
    }

    fn on_message(&mut self, message: Message, ctx: &mut ChannelContext<'_>) {
        (**self).on_message(message, ctx);
    }

    fn on_pong(&mut self, payload: Bytes, ctx: &mut ChannelContext<'_>) { (**self).on_pong(payload, ctx); }

    fn on_error(&mut self, error: &WebSocketError) { (**self).on_error(error); }

    fn on_close(&mut self, code: Option<CloseCode>) { (**self).on_close(code); }
}

/// Type alias for the `on_open` callback.
type OnOpenHook = Box<dyn FnMut(Option<&str>, &mut ChannelContext<'_>) + Send + 'static>;

/// Type alias for the `on_message` callback.
type OnMessageHook = Box<dyn FnMut(Message, &mut ChannelContext<'_>) + Send + 'static>;

/// Type alias for the `on_pong` callback.
type OnPongHook = Box<dyn FnMut(Bytes, &mut ChannelContext<'_>) + Send + 'static>;

/// Type alias for the `on_error` callback.
type OnErrorHook = Box<dyn FnMut(&WebSocketError) + Send + 'static>;

/// Type alias for the `on_close` callback.
type OnCloseHook = Box<dyn FnMut(Option<CloseCode>) + Send + 'static>;

/// Closure-based [`ChannelHandler`].
///
/// # Examples
///
/// ```
/// use wiresocket::channel::ChannelHooks;
///
/// let hooks = ChannelHooks::default().on_message(|message, ctx| {
///     if let Some(text) = message.as_text() {
///         let _ = ctx.send_text(text);
///     }
/// });
/// # drop(hooks);
/// ```
#[derive(Default)]
pub struct ChannelHooks {
    on_open: Option<OnOpenHook>,
    on_message: Option<OnMessageHook>,
    on_pong: Option<OnPongHook>,
    on_error: Option<OnErrorHook>,
    on_close: Option<OnCloseHook>,
}

impl ChannelHooks {
    /// Register the `on_open` callback.
    #[must_use]
    pub fn on_open<F>(mut self, hook: F) -> Self
    where
        F: FnMut(Option<&str>, &mut ChannelContext<'_>) + Send + 'static,
    {
        self.on_open = Some(Box::new(hook));
        self
    }

    /// Register the `on_message` callback.
    #[must_use]
    pub fn on_message<F>(mut self, hook: F) -> Self
    where
        F: FnMut(Message, &mut ChannelContext<'_>) + Send + 'static,
    {
        self.on_message = Some(Box::new(hook));
        self
    }

    /// Register the `on_pong` callback.
    #[must_use]
    pub fn on_pong<F>(mut self, hook: F) -> Self
    where
        F: FnMut(Bytes, &mut ChannelContext<'_>) + Send + 'static,
    {
        self.on_pong = Some(Box::new(hook));
        self
    }

    /// Register the `on_error` callback.
    #[must_use]
    pub fn on_error<F>(mut self, hook: F) -> Self
    where
        F: FnMut(&WebSocketError) + Send + 'static,
    {
        self.on_error = Some(Box::new(hook));
        self
    }

    /// Register the `on_close` callback.
    #[must_use]
    pub fn on_close<F>(mut self, hook: F) -> Self
    where
        F: FnMut(Option<CloseCode>) + Send + 'static,
    {
        self.on_close = Some(Box::new(hook));
        self
    }
}

impl ChannelHandler for ChannelHooks {
    fn on_open(&mut self, protocol: Option<&str>, ctx: &mut ChannelContext<'_>) {
        if let Some(hook) = &mut self.on_open {
            hook(protocol, ctx);
        }
    }

    fn on_message(&mut self, message: Message, ctx: &mut ChannelContext<'_>) {
        if let Some(hook) = &mut self.on_message {
            hook(message, ctx);
        }
    }

    fn on_pong(&mut self, payload: Bytes, ctx: &mut ChannelContext<'_>) {
        if let Some(hook) = &mut self.on_pong {
            hook(payload, ctx);
        }
    }

    fn on_error(&mut self, error: &WebSocketError) {
        if let Some(hook) = &mut self.on_error {
            hook(error);
        }
    }

    fn on_close(&mut self, code: Option<CloseCode>) {
        if let Some(hook) = &mut self.on_close {
            hook(code);
        }
    }
}
