//! Bounds-checked read cursor over a borrowed byte buffer
//!
//! All multi-byte reads are little-endian unless named otherwise. Slices
//! returned by [`ReadCursor::read_slice`] borrow the underlying buffer, so
//! payload views stay valid for as long as the buffer does.

use bytes::Buf;

use crate::error::{DecodeError, Result};

/// Read cursor over `&'a [u8]`.
#[derive(Debug, Clone)]
pub struct ReadCursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ReadCursor<'a> {
    /// Create a cursor positioned at the start of `data`.
    pub fn new(data: &'a [u8]) -> Self {
        ReadCursor { data, pos: 0 }
    }

    /// Current offset from the start of the buffer.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Total buffer length.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// True when the underlying buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Bytes left after the current position.
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    /// Fail with `TruncatedInput` unless `needed` bytes remain.
    pub fn ensure(&self, field: &'static str, needed: usize) -> Result<()> {
        let remaining = self.remaining();
        if remaining < needed {
            return Err(DecodeError::TruncatedInput {
                field,
                needed,
                remaining,
            });
        }
        Ok(())
    }

    fn take(&mut self, field: &'static str, n: usize) -> Result<&'a [u8]> {
        self.ensure(field, n)?;
        let out = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(out)
    }

    /// Read one byte.
    pub fn read_u8(&mut self, field: &'static str) -> Result<u8> {
        let mut buf = self.take(field, 1)?;
        Ok(buf.get_u8())
    }

    /// Read one signed byte.
    pub fn read_i8(&mut self, field: &'static str) -> Result<i8> {
        let mut buf = self.take(field, 1)?;
        Ok(buf.get_i8())
    }

    /// Read a little-endian u16.
    pub fn read_u16(&mut self, field: &'static str) -> Result<u16> {
        let mut buf = self.take(field, 2)?;
        Ok(buf.get_u16_le())
    }

    /// Read a little-endian i16.
    pub fn read_i16(&mut self, field: &'static str) -> Result<i16> {
        let mut buf = self.take(field, 2)?;
        Ok(buf.get_i16_le())
    }

    /// Read a big-endian u16.
    pub fn read_u16_be(&mut self, field: &'static str) -> Result<u16> {
        let mut buf = self.take(field, 2)?;
        Ok(buf.get_u16())
    }

    /// Read a little-endian u32.
    pub fn read_u32(&mut self, field: &'static str) -> Result<u32> {
        let mut buf = self.take(field, 4)?;
        Ok(buf.get_u32_le())
    }

    /// Read a little-endian u64.
    pub fn read_u64(&mut self, field: &'static str) -> Result<u64> {
        let mut buf = self.take(field, 8)?;
        Ok(buf.get_u64_le())
    }

    /// Look at the next byte without consuming it.
    pub fn peek_u8(&self, field: &'static str) -> Result<u8> {
        self.ensure(field, 1)?;
        Ok(self.data[self.pos])
    }

    /// Borrow the next `n` bytes and advance past them.
    pub fn read_slice(&mut self, field: &'static str, n: usize) -> Result<&'a [u8]> {
        self.take(field, n)
    }

    /// Borrow everything after the current position and advance to the end.
    pub fn read_remaining(&mut self) -> &'a [u8] {
        let out = &self.data[self.pos..];
        self.pos = self.data.len();
        out
    }

    /// Advance by `n` bytes.
    pub fn skip(&mut self, field: &'static str, n: usize) -> Result<()> {
        self.take(field, n).map(|_| ())
    }

    /// Move to an absolute offset. Seeking to `len()` is allowed.
    pub fn seek(&mut self, field: &'static str, pos: usize) -> Result<()> {
        if pos > self.data.len() {
            return Err(DecodeError::TruncatedInput {
                field,
                needed: pos - self.pos.min(pos),
                remaining: self.remaining(),
            });
        }
        self.pos = pos;
        Ok(())
    }

    /// Split off a cursor over the next `n` bytes and advance past them.
    ///
    /// Reads through the returned cursor can never run into bytes that
    /// belong to the following record.
    pub fn sub_cursor(&mut self, field: &'static str, n: usize) -> Result<ReadCursor<'a>> {
        Ok(ReadCursor::new(self.take(field, n)?))
    }
}
