#![doc(html_root_url = "https://docs.rs/wiresocket/latest")]
//! Public API for the `wiresocket` library.
//!
//! This crate implements the RFC 6455 WebSocket protocol as a transport
//! agnostic engine: the opening handshake for both roles, frame parsing and
//! serialisation, message reassembly, and the close handshake. Callers push
//! received bytes into a [`Channel`] and supply a [`Transport`] for writes.

pub mod buffer;
pub mod byte_order;
pub mod channel;
pub mod close;
pub mod codec;
pub mod config;
pub mod error;
pub mod frame;
pub mod handshake;
pub mod http;
pub mod message;
pub mod metrics;

pub use channel::{
    BufferedTransport,
    Channel,
    ChannelContext,
    ChannelHandler,
    ChannelHooks,
    ChannelState,
    Transport,
};
pub use close::CloseCode;
pub use codec::WebSocketCodec;
pub use config::ChannelConfig;
pub use error::WebSocketError;
pub use frame::{Frame, FrameError, OpCode, Role};
pub use handshake::{ClientHandshake, ClientHandshakeConfig, HandshakeError, ServerHandshake};
pub use message::{Message, MessageError, MessageKind};
pub use metrics::{CHANNELS_ACTIVE, Direction, ERRORS_TOTAL, FRAMES_PROCESSED};
