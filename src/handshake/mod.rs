//! HTTP upgrade handshake for both roles.
//!
//! [`ClientHandshake`] builds the upgrade request and validates the server's
//! response. [`ServerHandshake`] validates an incoming request and writes the
//! `101 Switching Protocols` reply, a caller-supplied substitute, or a
//! `400 Bad Request`. Either side hands back any bytes that followed the
//! header block so they can be fed to the frame parser.

mod accept;
mod client;
mod server;

use thiserror::Error;

pub use accept::{KEY_LEN, WS_GUID, WS_VERSION, compute_accept_key, generate_client_key, is_valid_client_key};
pub use client::{ClientHandshake, ClientHandshakeConfig, ClientUpgrade, DEFAULT_USER_AGENT};
pub use server::{Accepted, ProtocolSelector, RequestHook, ServerHandshake, ServerUpgrade};

use crate::http::HttpError;

/// Reasons an upgrade exchange is refused.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum HandshakeError {
    /// The message could not be parsed as HTTP/1.x.
    #[error("invalid HTTP message: {0}")]
    Http(#[from] HttpError),

    /// The server answered with something other than 101.
    #[error("unexpected HTTP status {0}")]
    UnexpectedStatus(u16),

    /// `Upgrade` is absent or not `websocket`.
    #[error("missing or invalid upgrade header")]
    MissingUpgrade,

    /// `Connection` does not contain `upgrade`.
    #[error("connection header does not contain upgrade")]
    MissingConnectionUpgrade,

    /// The server omitted `Sec-WebSocket-Accept`.
    #[error("missing sec-websocket-accept header")]
    MissingAccept,

    /// `Sec-WebSocket-Accept` does not match the key that was sent.
    #[error("sec-websocket-accept mismatch: expected {expected}, got {actual}")]
    AcceptMismatch {
        /// Value derived from the client key.
        expected: String,
        /// Value the server sent.
        actual: String,
    },

    /// The server negotiated an extension.
    #[error("server negotiated unsupported extensions")]
    ExtensionsUnsupported,

    /// The request method is not GET.
    #[error("expected GET request, got {0}")]
    MethodNotGet(String),

    /// The request omitted `Sec-WebSocket-Key`.
    #[error("missing sec-websocket-key header")]
    MissingKey,

    /// `Sec-WebSocket-Key` is not base64 of 16 bytes.
    #[error("sec-websocket-key is not 16 base64-encoded bytes")]
    InvalidKey,

    /// `Sec-WebSocket-Version` is absent or not 13.
    #[error("unsupported websocket version {0:?}")]
    UnsupportedWsVersion(Option<String>),
}

/// Split a `Sec-WebSocket-Protocol` value into trimmed tokens.
pub(crate) fn split_protocols(value: &str) -> Vec<&str> {
    value
        .split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect()
}
