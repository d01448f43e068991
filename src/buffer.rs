//! Streaming input buffer with a read cursor.
//!
//! Transport deliveries arrive in arbitrary chunk sizes, so the frame
//! assembler needs somewhere to park bytes until a whole header or payload
//! span is available. [`StreamBuffer`] appends chunks, hands them out through
//! a sequential cursor, and periodically drops the consumed prefix.
//!
//! Every read is all-or-nothing: asking for more bytes than
//! [`remaining`](StreamBuffer::remaining) returns `None` and leaves the cursor
//! where it was.

use bytes::{Buf, BytesMut};

use crate::byte_order::{read_network_u16, read_network_u64};

/// Consumed-prefix size that triggers [`StreamBuffer::compact_if_needed`].
pub const DEFAULT_COMPACT_THRESHOLD: usize = 8 * 1024;

/// Append-only byte accumulator with a read cursor.
///
/// # Examples
///
/// ```
/// use wiresocket::buffer::StreamBuffer;
///
/// let mut buf = StreamBuffer::new();
/// buf.extend(&[0x00]);
/// assert_eq!(buf.read_u16(), None);
/// buf.extend(&[0x7E]);
/// assert_eq!(buf.read_u16(), Some(126));
/// assert_eq!(buf.remaining(), 0);
/// ```
#[derive(Debug, Default)]
pub struct StreamBuffer {
    data: BytesMut,
    cursor: usize,
}

impl StreamBuffer {
    /// Create an empty buffer.
    #[must_use]
    pub fn new() -> Self { Self::default() }

    /// Append a transport delivery.
    pub fn extend(&mut self, chunk: &[u8]) { self.data.extend_from_slice(chunk); }

    /// Number of bytes not yet read.
    #[must_use]
    pub fn remaining(&self) -> usize { self.data.len() - self.cursor }

    /// Number of bytes read but not yet discarded by compaction.
    #[must_use]
    pub fn consumed(&self) -> usize { self.cursor }

    /// Borrow the unread bytes without consuming them.
    #[must_use]
    pub fn unread(&self) -> &[u8] { &self.data[self.cursor..] }

    /// Read one byte.
    pub fn read_u8(&mut self) -> Option<u8> { self.read_array::<1>().map(|[b]| b) }

    /// Read exactly `N` bytes, or nothing at all.
    pub fn read_array<const N: usize>(&mut self) -> Option<[u8; N]> {
        let end = self.cursor.checked_add(N)?;
        let bytes: [u8; N] = self.data.get(self.cursor..end)?.try_into().ok()?;
        self.cursor = end;
        Some(bytes)
    }

    /// Read a big-endian `u16`.
    pub fn read_u16(&mut self) -> Option<u16> { self.read_array().map(read_network_u16) }

    /// Read a big-endian `u64`.
    pub fn read_u64(&mut self) -> Option<u64> { self.read_array().map(read_network_u64) }

    /// Move up to `limit` unread bytes into `dst`.
    ///
    /// Returns the number of bytes transferred, which is less than `limit`
    /// when the buffer runs dry.
    pub fn transfer_into(&mut self, dst: &mut BytesMut, limit: usize) -> usize {
        let count = limit.min(self.remaining());
        let end = self.cursor + count;
        dst.extend_from_slice(&self.data[self.cursor..end]);
        self.cursor = end;
        count
    }

    /// Take every unread byte, leaving the buffer empty.
    pub fn take_unread(&mut self) -> BytesMut {
        self.compact();
        self.data.split()
    }

    /// Discard the consumed prefix.
    pub fn compact(&mut self) {
        self.data.advance(self.cursor);
        self.cursor = 0;
    }

    /// Compact when everything has been read or the consumed prefix has
    /// grown past `threshold`.
    pub fn compact_if_needed(&mut self, threshold: usize) {
        if self.cursor > 0 && (self.remaining() == 0 || self.cursor >= threshold) {
            self.compact();
        }
    }
}
