//! Transport double that records every write.

use std::io;

use bytes::Bytes;
use wiresocket::Transport;

/// Records writes and close requests; can be told to start failing.
#[derive(Debug, Default)]
pub struct RecordingTransport {
    writes: Vec<Bytes>,
    closes: usize,
    fail_after: Option<usize>,
}

impl RecordingTransport {
    /// Transport that accepts every write.
    #[must_use]
    pub fn new() -> Self { Self::default() }

    /// Transport whose writes fail once `writes` have succeeded.
    #[must_use]
    pub fn failing_after(writes: usize) -> Self {
        Self {
            fail_after: Some(writes),
            ..Self::default()
        }
    }

    /// Each successful write, in order.
    #[must_use]
    pub fn writes(&self) -> &[Bytes] { &self.writes }

    /// All written bytes concatenated.
    #[must_use]
    pub fn written(&self) -> Vec<u8> { self.writes.concat() }

    /// Drain the recorded writes, returning them concatenated.
    pub fn take_written(&mut self) -> Vec<u8> { std::mem::take(&mut self.writes).concat() }

    /// Whether `close` has been called.
    #[must_use]
    pub fn is_closed(&self) -> bool { self.closes > 0 }

    /// How many times `close` has been called.
    #[must_use]
    pub fn close_count(&self) -> usize { self.closes }
}

impl Transport for RecordingTransport {
    fn write(&mut self, data: &[u8]) -> io::Result<()> {
        if self.fail_after.is_some_and(|limit| self.writes.len() >= limit) {
            return Err(io::Error::new(io::ErrorKind::ConnectionReset, "connection reset by test"));
        }
        self.writes.push(Bytes::copy_from_slice(data));
        Ok(())
    }

    fn close(&mut self) { self.closes += 1; }
}
