//! Endian-aware random-access reader shared by all decoders.
//!
//! Each read consumes exactly the bytes it promises or fails with
//! [`Error::Truncated`] - there is no partial-read ambiguity. The length of
//! the byte source is captured once at construction, so reads are bounds
//! checked before any allocation happens.

use std::io::{Read, Seek, SeekFrom, Take};

use crate::{Error, Result};

/// Byte order used for multi-byte integer reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Endian {
    Big,
    #[default]
    Little,
}

/// Seekable reader over a finite byte source with a switchable byte order.
pub struct ByteCursor<R> {
    inner: R,
    len: u64,
    endian: Endian,
}

macro_rules! read_int {
    ($(#[$doc:meta] $name:ident -> $ty:ty;)*) => {
        $(
            #[$doc]
            #[inline]
            pub fn $name(&mut self) -> Result<$ty> {
                let b = self.read_array::<{ size_of::<$ty>() }>()?;
                Ok(match self.endian {
                    Endian::Big => <$ty>::from_be_bytes(b),
                    Endian::Little => <$ty>::from_le_bytes(b),
                })
            }
        )*
    };
}

impl<R: Read + Seek> ByteCursor<R> {
    /// Wrap `inner`, measure its length and rewind it to offset 0.
    ///
    /// The cursor starts out little-endian.
    pub fn new(mut inner: R) -> Result<Self> {
        let len = inner.seek(SeekFrom::End(0))?;
        inner.seek(SeekFrom::Start(0))?;
        Ok(Self {
            inner,
            len,
            endian: Endian::Little,
        })
    }

    /// Total length of the byte source.
    pub fn len(&self) -> u64 {
        self.len
    }

    /// Whether the byte source is empty.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Current byte order.
    pub fn endian(&self) -> Endian {
        self.endian
    }

    /// Change the byte order used by subsequent multi-byte reads.
    pub fn set_endian(&mut self, endian: Endian) {
        self.endian = endian;
    }

    /// Current absolute position.
    pub fn position(&mut self) -> Result<u64> {
        Ok(self.inner.stream_position()?)
    }

    /// Seek to an absolute offset. Offsets past the end are rejected.
    pub fn seek(&mut self, offset: u64) -> Result<()> {
        if offset > self.len {
            return Err(Error::Truncated);
        }
        self.inner.seek(SeekFrom::Start(offset))?;
        Ok(())
    }

    /// Advance the position by `count` bytes without reading them.
    pub fn skip(&mut self, count: u64) -> Result<()> {
        let pos = self.position()?;
        self.seek(pos.checked_add(count).ok_or(Error::Truncated)?)
    }

    /// Fail with [`Error::Truncated`] unless `count` more bytes are available.
    fn ensure(&mut self, count: u64) -> Result<()> {
        let pos = self.position()?;
        if pos.checked_add(count).is_none_or(|end| end > self.len) {
            return Err(Error::Truncated);
        }
        Ok(())
    }

    /// Read one byte.
    #[inline]
    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.read_array::<1>()?[0])
    }

    read_int! {
        /// Read a `u16` in the current byte order.
        read_u16 -> u16;
        /// Read an `i16` in the current byte order.
        read_i16 -> i16;
        /// Read a `u32` in the current byte order.
        read_u32 -> u32;
        /// Read an `i32` in the current byte order.
        read_i32 -> i32;
        /// Read a `u64` in the current byte order.
        read_u64 -> u64;
        /// Read an `i64` in the current byte order.
        read_i64 -> i64;
    }

    /// Read exactly `N` bytes into a fixed-size array.
    #[inline]
    pub fn read_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        self.ensure(N as u64)?;
        let mut b = [0u8; N];
        self.inner.read_exact(&mut b)?;
        Ok(b)
    }

    /// Read exactly `len` bytes into a `Vec`.
    pub fn read_bytes(&mut self, len: usize) -> Result<Vec<u8>> {
        self.ensure(len as u64)?;
        let mut b = vec![0u8; len];
        self.inner.read_exact(&mut b)?;
        Ok(b)
    }

    /// Read `len` bytes as text, verbatim (embedded or trailing NULs kept).
    pub fn read_string(&mut self, len: usize) -> Result<String> {
        let bytes = self.read_bytes(len)?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Read a fixed-width text field and trim its trailing NUL padding.
    pub fn read_fixed_ascii(&mut self, len: usize) -> Result<String> {
        let s = self.read_string(len)?;
        Ok(s.trim_end_matches('\0').to_owned())
    }

    /// Read bytes up to (and consuming) a NUL terminator, which is excluded.
    ///
    /// Returns [`Error::Truncated`] if the source ends before a NUL.
    pub fn read_cstring_bytes(&mut self) -> Result<Vec<u8>> {
        let mut bytes = Vec::new();
        loop {
            let b = self.read_u8()?;
            if b == 0 {
                break;
            }
            bytes.push(b);
        }
        Ok(bytes)
    }

    /// Read a NUL-terminated string.
    pub fn read_cstring(&mut self) -> Result<String> {
        let bytes = self.read_cstring_bytes()?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Verify that the next bytes match `expected`.
    ///
    /// Returns [`Error::BadMagic`] on mismatch.
    pub fn expect_magic(&mut self, expected: &[u8]) -> Result<()> {
        let got = self.read_bytes(expected.len())?;
        if got != expected {
            return Err(Error::BadMagic);
        }
        Ok(())
    }

    /// Check whether `expected` occurs at `offset`.
    ///
    /// A source too short to hold the signature is simply a mismatch.
    pub fn matches_at(&mut self, offset: u64, expected: &[u8]) -> Result<bool> {
        let end = offset.checked_add(expected.len() as u64);
        if end.is_none_or(|end| end > self.len) {
            return Ok(false);
        }
        self.seek(offset)?;
        Ok(self.read_bytes(expected.len())? == expected)
    }

    /// Run `f` at `offset`, then restore the current position.
    pub fn peek_at<T>(
        &mut self,
        offset: u64,
        f: impl FnOnce(&mut Self) -> Result<T>,
    ) -> Result<T> {
        let saved = self.position()?;
        self.seek(offset)?;
        let out = f(self);
        self.seek(saved)?;
        out
    }

    /// Bounded streaming access to `size` bytes at `offset`.
    ///
    /// The range is checked against the source length up front, so the
    /// returned [`Take`] never comes up short.
    pub fn take(&mut self, offset: u64, size: u64) -> Result<Take<&mut R>> {
        if offset.checked_add(size).is_none_or(|end| end > self.len) {
            return Err(Error::Truncated);
        }
        self.seek(offset)?;
        Ok(self.inner.by_ref().take(size))
    }

    /// Consume the cursor, returning the inner reader.
    pub fn into_inner(self) -> R {
        self.inner
    }
}

/// Convert a signed on-disk offset or size into an absolute `u64`.
#[inline]
pub(crate) fn to_offset(value: i64) -> Result<u64> {
    u64::try_from(value).map_err(|_| Error::InvalidRange)
}

/// Convert a signed on-disk length into a `usize` byte count.
#[inline]
pub(crate) fn to_len(value: i64) -> Result<usize> {
    usize::try_from(value).map_err(|_| Error::InvalidRange)
}
