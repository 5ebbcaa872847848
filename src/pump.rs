//! The two fixed, caller-owned byte buffers that sit between the wire codec
//! and [`Transport`](crate::io::Transport): `rx` accumulates bytes a socket
//! read produced but the decoder has not yet consumed; `tx` accumulates
//! bytes the encoder produced but a socket write has not yet drained. Both
//! are plain cursor-managed windows over a caller-provided slice - no
//! internal allocation, no ring-buffer wraparound.

use crate::io::{IoResult, Transport};

/// Bytes read from the transport, awaiting the decoder.
pub struct RxBuffer<'a> {
    buf: &'a mut [u8],
    len: usize,
}

impl<'a> RxBuffer<'a> {
    pub fn new(buf: &'a mut [u8]) -> Self {
        Self { buf, len: 0 }
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.buf[..self.len]
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Drops whatever was buffered - used when the connection is torn down
    /// and any partially-received framing no longer means anything.
    pub fn reset(&mut self) {
        self.len = 0;
    }

    fn is_full(&self) -> bool {
        self.len == self.buf.len()
    }

    /// Removes the first `n` bytes (already handed to the decoder),
    /// shifting the remainder to the front.
    pub fn consume(&mut self, n: usize) {
        debug_assert!(n <= self.len);
        self.buf.copy_within(n..self.len, 0);
        self.len -= n;
    }

    /// Reads one chunk from `transport` into the free tail of the buffer.
    /// Returns `Ready(0)` for EOF, same as the underlying transport.
    pub fn fill<T: Transport + ?Sized>(&mut self, transport: &mut T) -> IoResult<usize> {
        if self.is_full() {
            return IoResult::Ready(0);
        }
        let result = transport.read(&mut self.buf[self.len..]);
        if let IoResult::Ready(n) = result {
            self.len += n;
        }
        result
    }
}

/// Bytes the encoder produced, awaiting the transport.
pub struct TxBuffer<'a> {
    buf: &'a mut [u8],
    pos: usize,
    len: usize,
}

impl<'a> TxBuffer<'a> {
    pub fn new(buf: &'a mut [u8]) -> Self {
        Self { buf, pos: 0, len: 0 }
    }

    pub fn has_pending(&self) -> bool {
        self.pos < self.len
    }

    fn is_full(&self) -> bool {
        self.len == self.buf.len()
    }

    /// The free tail the encoder may write into.
    pub fn spare_mut(&mut self) -> &mut [u8] {
        &mut self.buf[self.len..]
    }

    /// Records that the encoder just wrote `n` bytes into `spare_mut()`.
    pub fn commit(&mut self, n: usize) {
        self.len += n;
    }

    /// Writes the pending window to `transport`, advancing past however much
    /// it accepted and compacting once fully drained.
    pub fn drain<T: Transport + ?Sized>(&mut self, transport: &mut T) -> IoResult<usize> {
        if !self.has_pending() {
            return IoResult::Ready(0);
        }
        let result = transport.write(&self.buf[self.pos..self.len]);
        if let IoResult::Ready(n) = result {
            self.pos += n;
            if self.pos == self.len {
                self.pos = 0;
                self.len = 0;
            }
        }
        result
    }

    /// True once every committed byte has been handed to the transport and
    /// the buffer is free again - used to decide whether the encoder may be
    /// asked to produce more.
    pub fn is_drained(&self) -> bool {
        self.pos == 0 && self.len == 0
    }

    pub fn has_room(&self) -> bool {
        !self.is_full()
    }

    /// Drops whatever was pending - used when the connection is torn down
    /// and any half-written bytes will never reach a live socket.
    pub fn reset(&mut self) {
        self.pos = 0;
        self.len = 0;
    }
}

#[cfg(test)]
mod unit {
    use super::*;

    struct ScriptedTransport<'a> {
        read_script: &'a [IoResult<usize>],
        read_data: &'a [u8],
        write_script: &'a [IoResult<usize>],
        read_step: usize,
        write_step: usize,
        written: heapless::Vec<u8, 64>,
    }

    impl<'a> Transport for ScriptedTransport<'a> {
        fn read(&mut self, dst: &mut [u8]) -> IoResult<usize> {
            let outcome = self.read_script[self.read_step];
            if let IoResult::Ready(n) = outcome {
                dst[..n].copy_from_slice(&self.read_data[..n]);
            }
            self.read_step += 1;
            outcome
        }

        fn write(&mut self, src: &[u8]) -> IoResult<usize> {
            let outcome = self.write_script[self.write_step];
            if let IoResult::Ready(n) = outcome {
                self.written.extend_from_slice(&src[..n]).ok();
            }
            self.write_step += 1;
            outcome
        }
    }

    #[test]
    fn rx_fill_then_consume_compacts() {
        let mut backing = [0u8; 8];
        let mut rx = RxBuffer::new(&mut backing);
        let mut transport = ScriptedTransport {
            read_script: &[IoResult::Ready(4)],
            read_data: b"abcd",
            write_script: &[],
            read_step: 0,
            write_step: 0,
            written: heapless::Vec::new(),
        };
        assert_eq!(rx.fill(&mut transport), IoResult::Ready(4));
        assert_eq!(rx.as_slice(), b"abcd");
        rx.consume(2);
        assert_eq!(rx.as_slice(), b"cd");
    }

    #[test]
    fn rx_fill_reports_eof_on_zero() {
        let mut backing = [0u8; 4];
        let mut rx = RxBuffer::new(&mut backing);
        let mut transport = ScriptedTransport {
            read_script: &[IoResult::Ready(0)],
            read_data: b"",
            write_script: &[],
            read_step: 0,
            write_step: 0,
            written: heapless::Vec::new(),
        };
        assert_eq!(rx.fill(&mut transport), IoResult::Ready(0));
    }

    #[test]
    fn tx_commit_then_drain_partial_write_keeps_remainder() {
        let mut backing = [0u8; 8];
        let mut tx = TxBuffer::new(&mut backing);
        tx.spare_mut()[..4].copy_from_slice(b"wxyz");
        tx.commit(4);
        assert!(tx.has_pending());

        let mut transport = ScriptedTransport {
            read_script: &[],
            read_data: b"",
            write_script: &[IoResult::Ready(2), IoResult::Ready(2)],
            read_step: 0,
            write_step: 0,
            written: heapless::Vec::new(),
        };
        assert_eq!(tx.drain(&mut transport), IoResult::Ready(2));
        assert!(tx.has_pending());
        assert_eq!(tx.drain(&mut transport), IoResult::Ready(2));
        assert!(tx.is_drained());
        assert_eq!(&transport.written[..], b"wxyz");
    }
}
