//! Growable, append-only byte sink with flush-to-fd and shift-from-head.
//!
//! The renderer and the session's output path share one of these instead of
//! issuing a `write` per escape sequence; `flush` hands the whole thing to
//! the OS in a single call so the terminal never sees a torn frame.

use std::io::{self, Write};

use crate::error::{Error, Result};

#[derive(Debug, Default)]
pub struct ByteBuffer {
    bytes: Vec<u8>,
}

impl ByteBuffer {
    pub fn new() -> ByteBuffer {
        ByteBuffer {
            bytes: Vec::with_capacity(32 * 1024),
        }
    }

    pub fn with_capacity(cap: usize) -> ByteBuffer {
        ByteBuffer {
            bytes: Vec::with_capacity(cap),
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }

    /// Append raw bytes, growing with `Vec`'s amortized doubling.
    pub fn append_bytes(&mut self, data: &[u8]) {
        self.bytes.extend_from_slice(data);
    }

    /// Append a NUL-terminated source, excluding the terminator.
    pub fn append_cstr(&mut self, data: &[u8]) {
        let end = data.iter().position(|&b| b == 0).unwrap_or(data.len());
        self.append_bytes(&data[..end]);
    }

    /// Discard the first `n` bytes (clamped to the current length), shifting
    /// the remainder to the start.
    pub fn shift_head(&mut self, n: usize) {
        let n = n.min(self.bytes.len());
        self.bytes.drain(..n);
    }

    /// Write the whole buffer to `w` in one call. A short write is treated
    /// as failure: the caller's transport is assumed to be a tty or a pipe
    /// draining fast enough to take the whole frame at once.
    pub fn flush<W: Write>(&mut self, w: &mut W) -> Result<()> {
        if self.bytes.is_empty() {
            return Ok(());
        }
        match w.write(&self.bytes) {
            Ok(n) if n == self.bytes.len() => {
                self.bytes.clear();
                Ok(())
            }
            Ok(_) => Err(Error::Read(io::Error::new(
                io::ErrorKind::WriteZero,
                "partial write while flushing output buffer",
            ))),
            Err(e) => Err(Error::Read(e)),
        }
    }

    pub fn clear(&mut self) {
        self.bytes.clear();
    }
}

impl Write for ByteBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.bytes.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_and_shift() {
        let mut buf = ByteBuffer::new();
        buf.append_bytes(b"hello world");
        assert_eq!(buf.len(), 11);
        buf.shift_head(6);
        assert_eq!(buf.as_slice(), b"world");
    }

    #[test]
    fn shift_clamps_to_len() {
        let mut buf = ByteBuffer::new();
        buf.append_bytes(b"hi");
        buf.shift_head(100);
        assert!(buf.is_empty());
    }

    #[test]
    fn append_cstr_stops_at_nul() {
        let mut buf = ByteBuffer::new();
        buf.append_cstr(b"enter\0garbage");
        assert_eq!(buf.as_slice(), b"enter");
    }

    #[test]
    fn flush_drains_and_writes_once() {
        let mut buf = ByteBuffer::new();
        buf.append_bytes(b"frame");
        let mut sink = Vec::new();
        buf.flush(&mut sink).unwrap();
        assert_eq!(sink, b"frame");
        assert!(buf.is_empty());
    }
}
