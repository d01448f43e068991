//! Test doubles and wire builders for exercising a
//! [`Channel`](wiresocket::Channel) without a socket.
//!
//! ```rust
//! use wiresocket::{Channel, ChannelConfig, handshake::{Accepted, ServerHandshake}};
//! use wiresocket_testing::{RecordingHandler, RecordingTransport, masked_frame, upgrade_request};
//!
//! let mut transport = RecordingTransport::new();
//! let Ok(Accepted::Upgrade(upgrade)) =
//!     ServerHandshake::new().accept(&upgrade_request("/", "dGhlIHNhbXBsZSBub25jZQ=="), &mut transport)
//! else {
//!     panic!("upgrade expected");
//! };
//! let mut channel = Channel::accept(transport, RecordingHandler::echoing(), upgrade, ChannelConfig::default());
//! channel.receive(&masked_frame(0x81, [1, 2, 3, 4], b"hi")).unwrap();
//! assert_eq!(channel.handler().messages().len(), 1);
//! ```

pub mod frames;
pub mod handler;
pub mod logging;
pub mod transport;

pub use frames::{masked_frame, unmasked_frame, upgrade_request, upgrade_response};
pub use handler::{Event, RecordingHandler};
pub use logging::{LoggerHandle, logger};
pub use transport::RecordingTransport;
