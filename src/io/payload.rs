//! Outbound and inbound application payload streams.
//!
//! The wire encoder/decoder never know whether a payload lives in a
//! caller-owned buffer or is produced/consumed incrementally by a streaming
//! source (a file, a ring buffer, …): both are expressed through these two
//! traits. [`SliceReader`]/[`SliceWriter`] cover the common case of a plain
//! byte slice and never report [`IoResult::WouldBlock`] or an error.

use super::{IoResult, StreamError};

/// Produces outbound bytes for the encoder - the write side of a PUBLISH
/// payload, a CONNECT will-message, and so on.
pub trait PayloadReader {
    /// Copies at most `dst.len()` bytes into `dst`, returning how many were
    /// written. `Ready(0)` with the caller knowing no more remain signals
    /// end of stream; the encoder tracks remaining length separately and
    /// never relies on this to detect completion.
    fn read(&mut self, dst: &mut [u8]) -> IoResult<usize>;
}

/// Accepts inbound bytes for the decoder - an incoming PUBLISH topic or
/// payload.
pub trait PayloadWriter {
    fn write(&mut self, chunk: &[u8]) -> IoResult<usize>;
}

/// A [`PayloadReader`] over a borrowed, already-fully-available byte slice.
/// This is what a caller-owned buffer looks like in practice: reading from
/// it can never block or fail.
#[derive(Debug, Clone, Copy)]
pub struct SliceReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> SliceReader<'a> {
    pub const fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }
}

impl<'a> PayloadReader for SliceReader<'a> {
    fn read(&mut self, dst: &mut [u8]) -> IoResult<usize> {
        let n = core::cmp::min(dst.len(), self.remaining());
        dst[..n].copy_from_slice(&self.buf[self.pos..self.pos + n]);
        self.pos += n;
        IoResult::Ready(n)
    }
}

/// A [`PayloadWriter`] over a borrowed, fixed-capacity destination slice.
/// Writing past capacity is reported as [`StreamError`] rather than
/// panicking, matching the "allocate failed" boundary the decoder already
/// has to handle for streaming destinations.
pub struct SliceWriter<'a> {
    buf: &'a mut [u8],
    pos: usize,
}

impl<'a> SliceWriter<'a> {
    pub fn new(buf: &'a mut [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    pub fn written(&self) -> usize {
        self.pos
    }
}

impl<'a> PayloadWriter for SliceWriter<'a> {
    fn write(&mut self, chunk: &[u8]) -> IoResult<usize> {
        let room = self.buf.len() - self.pos;
        if chunk.len() > room {
            return IoResult::Err(StreamError::new(-1));
        }
        self.buf[self.pos..self.pos + chunk.len()].copy_from_slice(chunk);
        self.pos += chunk.len();
        IoResult::Ready(chunk.len())
    }
}

#[cfg(test)]
mod unit {
    use super::*;

    #[test]
    fn slice_reader_drains_in_chunks() {
        let data = [1u8, 2, 3, 4, 5];
        let mut r = SliceReader::new(&data);
        let mut dst = [0u8; 2];
        assert_eq!(r.read(&mut dst), IoResult::Ready(2));
        assert_eq!(dst, [1, 2]);
        assert_eq!(r.read(&mut dst), IoResult::Ready(2));
        assert_eq!(dst, [3, 4]);
        assert_eq!(r.read(&mut dst), IoResult::Ready(1));
        assert_eq!(dst[0], 5);
        assert_eq!(r.read(&mut dst), IoResult::Ready(0));
    }

    #[test]
    fn slice_writer_rejects_overflow() {
        let mut buf = [0u8; 2];
        let mut w = SliceWriter::new(&mut buf);
        assert_eq!(w.write(&[9]), IoResult::Ready(1));
        assert!(matches!(w.write(&[9, 9]), IoResult::Err(_)));
    }
}
