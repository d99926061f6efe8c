//! Variable-length integer codec and bounded byte cursor
//!
//! Implements the standard blockchain varint encoding (`<0xfd` inline,
//! `0xfd` u16-LE, `0xfe` u32-LE, `0xff` u64-LE) on top of a cursor that
//! refuses to read past the end of its slice.

use thiserror::Error;

/// Error raised when a read would overrun the underlying buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ReadError {
    #[error("truncated input")]
    TruncatedInput,
}

/// Bounded forward-only cursor over a byte slice
///
/// Every read and skip is checked against the end of the slice, so a
/// malformed length field can never walk the parser out of bounds.
#[derive(Debug, Clone)]
pub struct ByteCursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> ByteCursor<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Current offset from the start of the slice
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Bytes left before the end of the slice
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    /// Advance by `n` bytes without reading them
    pub fn skip(&mut self, n: usize) -> Result<(), ReadError> {
        let new_pos = self.pos.checked_add(n).ok_or(ReadError::TruncatedInput)?;
        if new_pos > self.buf.len() {
            return Err(ReadError::TruncatedInput);
        }
        self.pos = new_pos;
        Ok(())
    }

    /// Advance by a wire-decoded length, which may not fit in usize
    pub fn skip_var(&mut self, n: u64) -> Result<(), ReadError> {
        let n = usize::try_from(n).map_err(|_| ReadError::TruncatedInput)?;
        self.skip(n)
    }

    /// Read `n` bytes and advance
    pub fn take(&mut self, n: usize) -> Result<&'a [u8], ReadError> {
        let start = self.pos;
        self.skip(n)?;
        Ok(&self.buf[start..self.pos])
    }

    pub fn read_u8(&mut self) -> Result<u8, ReadError> {
        let bytes = self.take(1)?;
        Ok(bytes[0])
    }

    pub fn read_u16_le(&mut self) -> Result<u16, ReadError> {
        let bytes = self.take(2)?;
        Ok(u16::from_le_bytes([bytes[0], bytes[1]]))
    }

    pub fn read_u32_le(&mut self) -> Result<u32, ReadError> {
        let bytes = self.take(4)?;
        Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    pub fn read_u32_be(&mut self) -> Result<u32, ReadError> {
        let bytes = self.take(4)?;
        Ok(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    pub fn read_u64_le(&mut self) -> Result<u64, ReadError> {
        let bytes = self.take(8)?;
        let mut raw = [0u8; 8];
        raw.copy_from_slice(bytes);
        Ok(u64::from_le_bytes(raw))
    }

    /// Read a varint, consuming 1, 3, 5, or 9 bytes
    pub fn read_varint(&mut self) -> Result<u64, ReadError> {
        match self.read_u8()? {
            0xfd => Ok(self.read_u16_le()? as u64),
            0xfe => Ok(self.read_u32_le()? as u64),
            0xff => self.read_u64_le(),
            n => Ok(n as u64),
        }
    }
}

/// Encode a number as a varint
pub fn write_varint(value: u64) -> Vec<u8> {
    if value < 0xfd {
        vec![value as u8]
    } else if value <= 0xffff {
        let mut result = vec![0xfd];
        result.extend_from_slice(&(value as u16).to_le_bytes());
        result
    } else if value <= 0xffffffff {
        let mut result = vec![0xfe];
        result.extend_from_slice(&(value as u32).to_le_bytes());
        result
    } else {
        let mut result = vec![0xff];
        result.extend_from_slice(&value.to_le_bytes());
        result
    }
}
