//! `tokio_util` codec over the frame layer.
//!
//! [`WebSocketCodec`] lets async callers drive raw frames through
//! [`Framed`](tokio_util::codec::Framed) once the upgrade has completed. It
//! performs no message reassembly or control-frame handling; use
//! [`Channel`](crate::channel::Channel) for the full protocol.

use std::io;

use bytes::BytesMut;
use tokio_util::codec::{Decoder, Encoder};

use crate::{
    buffer::StreamBuffer,
    config::ChannelConfig,
    error::WebSocketError,
    frame::{Frame, FrameAssembler, Role, write_frame_for},
};

/// Frame codec for one side of an upgraded connection.
///
/// # Examples
///
/// ```
/// use bytes::BytesMut;
/// use tokio_util::codec::{Decoder, Encoder};
/// use wiresocket::{codec::WebSocketCodec, frame::{Frame, Role}};
///
/// let mut server = WebSocketCodec::new(Role::Server);
/// let mut client = WebSocketCodec::new(Role::Client);
/// let mut wire = BytesMut::new();
/// client.encode(Frame::text("ping"), &mut wire).expect("encode");
/// let frame = server.decode(&mut wire).expect("decode").expect("complete");
/// assert_eq!(frame.payload(), b"ping");
/// ```
#[derive(Debug)]
pub struct WebSocketCodec {
    role: Role,
    input: StreamBuffer,
    frames: FrameAssembler,
    compact_threshold: usize,
}

impl WebSocketCodec {
    /// Codec with default limits.
    #[must_use]
    pub fn new(role: Role) -> Self { Self::with_config(role, &ChannelConfig::default()) }

    /// Codec honouring the payload cap and mask leniency in `config`.
    #[must_use]
    pub fn with_config(role: Role, config: &ChannelConfig) -> Self {
        Self {
            role,
            input: StreamBuffer::new(),
            frames: FrameAssembler::new(config.frame_rules(role)),
            compact_threshold: config.compaction(),
        }
    }

    /// Local role.
    #[must_use]
    pub fn role(&self) -> Role { self.role }
}

impl Decoder for WebSocketCodec {
    type Item = Frame;
    type Error = WebSocketError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if !src.is_empty() {
            self.input.extend(&src.split());
        }
        let frame = self.frames.next_frame(&mut self.input)?;
        self.input.compact_if_needed(self.compact_threshold);
        Ok(frame)
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if let Some(frame) = self.decode(src)? {
            return Ok(Some(frame));
        }
        if self.frames.is_idle() && self.input.remaining() == 0 {
            return Ok(None);
        }
        tracing::debug!(
            buffered = self.input.remaining(),
            "connection closed inside a frame"
        );
        Err(io::Error::new(io::ErrorKind::UnexpectedEof, "connection closed inside a frame").into())
    }
}

impl Encoder<Frame> for WebSocketCodec {
    type Error = WebSocketError;

    fn encode(&mut self, item: Frame, dst: &mut BytesMut) -> Result<(), Self::Error> {
        write_frame_for(self.role, &item, dst);
        Ok(())
    }
}
