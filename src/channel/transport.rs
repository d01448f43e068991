//! Outbound side of the byte stream a channel runs over.
//!
//! The engine never reads from a transport: the owner pushes received bytes
//! into [`Channel::receive`](super::Channel::receive). A transport only needs
//! to accept writes and honour a close request.

use std::io;

use bytes::{Bytes, BytesMut};

/// Duplex byte stream collaborator.
pub trait Transport {
    /// Queue `data` for delivery to the peer.
    ///
    /// # Errors
    ///
    /// Returns the transport failure. The channel treats it as an abnormal
    /// closure.
    fn write(&mut self, data: &[u8]) -> io::Result<()>;

    /// Close the stream after queued data has been delivered.
    fn close(&mut self);
}

impl<T: Transport + ?Sized> Transport for &mut T {
    fn write(&mut self, data: &[u8]) -> io::Result<()> { (**self).write(data) }

    fn close(&mut self) { (**self).close(); }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn write(&mut self, data: &[u8]) -> io::Result<()> { (**self).write(data) }

    fn close(&mut self) { (**self).close(); }
}

/// Collects writes; closing is a no-op.
impl Transport for Vec<u8> {
    fn write(&mut self, data: &[u8]) -> io::Result<()> {
        self.extend_from_slice(data);
        Ok(())
    }

    fn close(&mut self) {}
}

/// In-memory outbox for drivers that flush writes themselves.
///
/// Async drivers feed socket reads into a channel, then drain the outbox to
/// the socket and shut it down once [`is_closed`](Self::is_closed) reports
/// true.
///
/// # Examples
///
/// ```
/// use wiresocket::channel::{BufferedTransport, Transport};
///
/// let mut transport = BufferedTransport::new();
/// transport.write(b"abc").expect("in-memory write");
/// transport.close();
/// assert_eq!(&transport.take_outbound()[..], b"abc");
/// assert!(transport.is_closed());
/// ```
#[derive(Debug, Default)]
pub struct BufferedTransport {
    outbound: BytesMut,
    closed: bool,
}

impl BufferedTransport {
    /// Empty, open outbox.
    #[must_use]
    pub fn new() -> Self { Self::default() }

    /// Take everything written since the last call.
    pub fn take_outbound(&mut self) -> Bytes { self.outbound.split().freeze() }

    /// Whether any bytes are waiting.
    #[must_use]
    pub fn has_outbound(&self) -> bool { !self.outbound.is_empty() }

    /// Whether the channel asked for the stream to be closed.
    #[must_use]
    pub fn is_closed(&self) -> bool { self.closed }
}

impl Transport for BufferedTransport {
    fn write(&mut self, data: &[u8]) -> io::Result<()> {
        if self.closed {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "transport closed"));
        }
        self.outbound.extend_from_slice(data);
        Ok(())
    }

    fn close(&mut self) { self.closed = true; }
}
