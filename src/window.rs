//! Bounds-checked byte window and string-pool access.
//!
//! Every higher layer reads the raw typelib bytes through [`Window`]; nothing
//! else indexes the buffer directly. Offsets are untrusted input, so every
//! accessor is checked and misses surface as [`TypelibError::TruncatedBuffer`].

use crate::error::{Result, TypelibError};
use crate::format::MAX_NAME_LEN;

/// Whether `offset` sits on the 4-byte alignment every blob start must have.
pub fn is_aligned(offset: usize) -> bool {
    offset % 4 == 0
}

/// A read-only view over the raw bytes of a typelib buffer.
#[derive(Debug, Clone, Copy)]
pub struct Window<'data> {
    data: &'data [u8],
}

impl<'data> Window<'data> {
    pub fn new(data: &'data [u8]) -> Self {
        Window { data }
    }

    /// Total buffer length in bytes.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// `n` bytes starting at `offset`, or `TruncatedBuffer` if the range does
    /// not fit. Overflow in `offset + n` is treated as out of bounds.
    pub fn bytes_at(&self, offset: usize, n: usize) -> Result<&'data [u8]> {
        let end = offset.checked_add(n).ok_or_else(|| truncated(offset, n))?;
        self.data
            .get(offset..end)
            .ok_or_else(|| truncated(offset, n))
    }

    /// Require that `[offset, offset + n)` fits in the buffer, with a message
    /// naming what was being read.
    pub fn check_room(&self, offset: usize, n: usize, what: &str) -> Result<()> {
        let end = offset.checked_add(n);
        match end {
            Some(end) if end <= self.data.len() => Ok(()),
            _ => Err(TypelibError::TruncatedBuffer(format!(
                "The buffer is too short for the {} at offset {}",
                what, offset
            ))),
        }
    }

    pub fn read_u8(&self, offset: usize) -> Result<u8> {
        Ok(self.bytes_at(offset, 1)?[0])
    }

    pub fn read_u16(&self, offset: usize) -> Result<u16> {
        let b = self.bytes_at(offset, 2)?;
        Ok(u16::from_le_bytes([b[0], b[1]]))
    }

    pub fn read_u32(&self, offset: usize) -> Result<u32> {
        let b = self.bytes_at(offset, 4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub fn read_i32(&self, offset: usize) -> Result<i32> {
        Ok(self.read_u32(offset)? as i32)
    }

    /// The NUL-terminated string starting at `offset`, without charset checks.
    ///
    /// Fails with `TruncatedBuffer` when `offset` is past the end, and with
    /// `NameTooLong` when no NUL shows up within [`MAX_NAME_LEN`] bytes (or
    /// before the end of the buffer). The search is capped so a hostile offset
    /// cannot make us scan the whole file.
    pub fn string_at(&self, offset: usize, what: &str) -> Result<&'data str> {
        if offset >= self.data.len() {
            return Err(TypelibError::TruncatedBuffer(format!(
                "The buffer is too short for the {} string at offset {}",
                what, offset
            )));
        }
        let tail = &self.data[offset..];
        let span = &tail[..tail.len().min(MAX_NAME_LEN)];
        let end = memchr::memchr(0, span).ok_or_else(|| {
            TypelibError::NameTooLong(format!("The {} at offset {} is too long", what, offset))
        })?;
        std::str::from_utf8(&span[..end]).map_err(|_| {
            TypelibError::InvalidName(format!(
                "The {} at offset {} is not valid UTF-8",
                what, offset
            ))
        })
    }

    /// Validate the string at `offset` as a name: NUL-terminated within
    /// [`MAX_NAME_LEN`] bytes and drawn from `[A-Za-z0-9_-]`. `what` labels the
    /// name in error messages ("function symbol", "namespace", ...).
    pub fn validate_name(&self, what: &str, offset: usize) -> Result<&'data str> {
        let name = self.string_at(offset, what)?;
        if let Some(bad) = name
            .bytes()
            .find(|b| !(b.is_ascii_alphanumeric() || *b == b'_' || *b == b'-'))
        {
            return Err(TypelibError::InvalidName(format!(
                "The {} '{}' contains an invalid character {:#04x}",
                what, name, bad
            )));
        }
        Ok(name)
    }
}

fn truncated(offset: usize, n: usize) -> TypelibError {
    TypelibError::TruncatedBuffer(format!(
        "Reading {} bytes at offset {} runs past the end of the buffer",
        n, offset
    ))
}
