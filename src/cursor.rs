//! Buffered byte cursor over a capture source
//!
//! The cursor keeps a [`circular::Buffer`] in front of any `Read` implementation. Readers
//! ask for a number of bytes with [`ByteCursor::fill`], parse them in place from
//! [`ByteCursor::data`], and then [`consume`](ByteCursor::consume) or
//! [`skip`](ByteCursor::skip) them. Memory usage stays constant: the buffer only grows when
//! a single block does not fit, and blocks that are skipped are never buffered whole.

use std::io::{self, Read};

use circular::Buffer;

use crate::error::ImportError;

/// Default size of the read buffer
pub const DEFAULT_BUFFER_CAPACITY: usize = 65536;

const DISCARD_CHUNK: usize = 8192;

pub struct ByteCursor<R: Read> {
    reader: R,
    buffer: Buffer,
    /// Absolute offset of the first byte of `buffer.data()`
    position: u64,
    exhausted: bool,
}

impl<R: Read> ByteCursor<R> {
    pub fn new(capacity: usize, reader: R) -> ByteCursor<R> {
        ByteCursor {
            reader,
            buffer: Buffer::with_capacity(capacity.max(16)),
            position: 0,
            exhausted: false,
        }
    }

    /// Absolute offset of the next unconsumed byte
    #[inline]
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Bytes buffered and not yet consumed
    #[inline]
    pub fn available(&self) -> usize {
        self.buffer.available_data()
    }

    #[inline]
    pub fn data(&self) -> &[u8] {
        self.buffer.data()
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.buffer.capacity()
    }

    /// True once the underlying reader returned end of file
    ///
    /// Buffered data can still be available.
    #[inline]
    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    /// Make at least `n` bytes available in the buffer
    ///
    /// Returns `Ok(false)` if the source ended before `n` bytes could be buffered. Whatever
    /// was read stays available.
    pub fn fill(&mut self, n: usize) -> io::Result<bool> {
        if n > self.buffer.capacity() {
            let new_size = n.next_power_of_two();
            self.buffer.grow(new_size);
        }
        while self.buffer.available_data() < n {
            if self.exhausted {
                return Ok(false);
            }
            if self.buffer.available_space() < n - self.buffer.available_data() {
                self.buffer.shift();
            }
            let space = self.buffer.space();
            let sz = match self.reader.read(space) {
                Ok(sz) => sz,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            };
            if sz == 0 {
                self.exhausted = true;
            }
            self.buffer.fill(sz);
        }
        Ok(true)
    }

    /// Return exactly `n` buffered bytes, without consuming them
    pub fn read_exact(&mut self, n: usize) -> Result<&[u8], ImportError> {
        if !self.fill(n)? {
            return Err(ImportError::UnexpectedEof(self.position + self.available() as u64));
        }
        Ok(&self.buffer.data()[..n])
    }

    /// Consume `n` buffered bytes
    ///
    /// `n` must not exceed [`available`](ByteCursor::available).
    pub fn consume(&mut self, n: usize) {
        debug_assert!(n <= self.buffer.available_data());
        let n = self.buffer.consume(n);
        self.position += n as u64;
    }

    /// Advance by `n` bytes, buffered or not
    ///
    /// Bytes past the buffer are read from the source and dropped.
    pub fn skip(&mut self, n: u64) -> Result<(), ImportError> {
        let buffered = (self.buffer.available_data() as u64).min(n);
        self.consume(buffered as usize);
        let mut remaining = n - buffered;
        if remaining == 0 {
            return Ok(());
        }
        self.buffer.shift();
        let mut scratch = [0u8; DISCARD_CHUNK];
        while remaining > 0 {
            let want = remaining.min(DISCARD_CHUNK as u64) as usize;
            let sz = match self.reader.read(&mut scratch[..want]) {
                Ok(sz) => sz,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            };
            if sz == 0 {
                self.exhausted = true;
                return Err(ImportError::UnexpectedEof(self.position));
            }
            remaining -= sz as u64;
            self.position += sz as u64;
        }
        Ok(())
    }
}
