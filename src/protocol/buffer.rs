//! Fixed-capacity send buffer.
//!
//! One buffer is owned by each request. It first accumulates the inbound
//! request bytes, then carries one response chunk at a time to the
//! transport. Storage is allocated once and reset between chunks, never
//! reallocated.

use std::io::{self, Read};
use std::ops::BitOr;

/// Size of a single send operation.
pub const IO_SIZE: usize = 64 * 1024;

/// Flags attached to a send submission.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SendFlags(u8);

impl SendFlags {
    pub const NONE: SendFlags = SendFlags(0);
    /// Last chunk of the stream; the send direction finishes after it.
    pub const FIN: SendFlags = SendFlags(1);

    pub const fn contains(self, other: SendFlags) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for SendFlags {
    type Output = SendFlags;

    fn bitor(self, rhs: SendFlags) -> SendFlags {
        SendFlags(self.0 | rhs.0)
    }
}

/// Result of draining a reader into the buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fill {
    /// The buffer is full; the reader may have more.
    Full,
    /// The reader is exhausted.
    Eof,
}

/// Fixed-capacity byte accumulator paired with send flags.
///
/// `len() <= capacity()` holds at all times.
pub struct SendBuffer {
    raw: Box<[u8]>,
    len: usize,
    flags: SendFlags,
}

impl SendBuffer {
    /// Create a buffer of [`IO_SIZE`] bytes.
    pub fn new() -> Self {
        Self::with_capacity(IO_SIZE)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            raw: vec![0u8; capacity].into_boxed_slice(),
            len: 0,
            flags: SendFlags::NONE,
        }
    }

    pub fn capacity(&self) -> usize {
        self.raw.len()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn is_full(&self) -> bool {
        self.len == self.capacity()
    }

    /// True iff `n` more bytes fit while leaving the buffer short of full.
    pub fn has_room(&self, n: usize) -> bool {
        self.len
            .checked_add(n)
            .is_some_and(|total| total < self.capacity())
    }

    /// Append `data`. Callers check [`has_room`](Self::has_room) first.
    pub fn write(&mut self, data: &[u8]) {
        debug_assert!(self.has_room(data.len()));
        let end = self.len + data.len();
        self.raw[self.len..end].copy_from_slice(data);
        self.len = end;
    }

    /// Append as much of `data` as fits and return the number of bytes taken.
    pub fn write_truncated(&mut self, data: &[u8]) -> usize {
        let take = data.len().min(self.capacity() - self.len);
        let end = self.len + take;
        self.raw[self.len..end].copy_from_slice(&data[..take]);
        self.len = end;
        take
    }

    /// Read from `reader` until the buffer is full or the reader is exhausted.
    pub fn fill_from(&mut self, reader: &mut dyn Read) -> io::Result<Fill> {
        while !self.is_full() {
            match reader.read(&mut self.raw[self.len..]) {
                Ok(0) => return Ok(Fill::Eof),
                Ok(n) => self.len += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(Fill::Full)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.raw[..self.len]
    }

    pub fn flags(&self) -> SendFlags {
        self.flags
    }

    pub fn set_flags(&mut self, flags: SendFlags) {
        self.flags = flags;
    }

    /// Forget the contents and flags, keeping the storage.
    pub fn reset(&mut self) {
        self.len = 0;
        self.flags = SendFlags::NONE;
    }
}

impl Default for SendBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SendBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SendBuffer")
            .field("len", &self.len)
            .field("capacity", &self.capacity())
            .field("flags", &self.flags)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn room_is_strictly_below_capacity() {
        let mut buf = SendBuffer::with_capacity(8);
        assert!(buf.has_room(7));
        assert!(!buf.has_room(8));

        buf.write(b"abcd");
        assert!(buf.has_room(3));
        assert!(!buf.has_room(4));
        assert!(!buf.has_room(usize::MAX));
        assert_eq!(buf.as_bytes(), b"abcd");
    }

    #[test]
    fn truncated_write_stops_at_capacity() {
        let mut buf = SendBuffer::with_capacity(4);
        assert_eq!(buf.write_truncated(b"abcdef"), 4);
        assert!(buf.is_full());
        assert_eq!(buf.write_truncated(b"x"), 0);
        assert_eq!(buf.len(), 4);
    }

    #[test]
    fn fill_reports_full_then_eof() {
        let mut buf = SendBuffer::with_capacity(4);
        let mut reader = Cursor::new(b"abcdef".to_vec());

        assert_eq!(buf.fill_from(&mut reader).unwrap(), Fill::Full);
        assert_eq!(buf.as_bytes(), b"abcd");

        buf.reset();
        assert_eq!(buf.fill_from(&mut reader).unwrap(), Fill::Eof);
        assert_eq!(buf.as_bytes(), b"ef");
    }

    #[test]
    fn fill_after_partial_write_uses_remaining_space() {
        let mut buf = SendBuffer::with_capacity(6);
        buf.write(b"hi");
        let mut reader = Cursor::new(b"0123456789".to_vec());
        assert_eq!(buf.fill_from(&mut reader).unwrap(), Fill::Full);
        assert_eq!(buf.as_bytes(), b"hi0123");
        assert!(buf.len() <= buf.capacity());
    }

    #[test]
    fn reset_clears_length_and_flags() {
        let mut buf = SendBuffer::new();
        assert_eq!(buf.capacity(), IO_SIZE);
        buf.write(b"data");
        buf.set_flags(SendFlags::FIN);
        buf.reset();
        assert!(buf.is_empty());
        assert_eq!(buf.flags(), SendFlags::NONE);
        assert_eq!(buf.capacity(), IO_SIZE);
    }

    #[test]
    fn flags_combine() {
        let flags = SendFlags::NONE | SendFlags::FIN;
        assert!(flags.contains(SendFlags::FIN));
        assert!(!SendFlags::NONE.contains(SendFlags::FIN));
    }
}
