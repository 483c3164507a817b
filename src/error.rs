//! Library-wide error and result types.

use std::io;

use thiserror::Error;

/// Result alias used throughout assetkit.
pub type Result<T> = std::result::Result<T, Error>;

/// All errors the library can produce.
///
/// Detection-time mismatches never surface as one of these: the registry
/// treats them as "not this format" and moves on. Everything returned from
/// an open after a format matched is a hard failure.
#[derive(Debug, Error)]
pub enum Error {
    /// A read would have gone past the end of the byte source.
    #[error("unexpected end of data")]
    Truncated,
    /// A magic/signature field did not match the expected value.
    #[error("bad magic value")]
    BadMagic,
    /// The Phyre secondary magic (`0x01020304`) did not match.
    #[error("bad secondary magic value: {0:#010x}")]
    BadSecondaryMagic(u32),
    /// The Phyre platform code is neither GCM nor GNM.
    #[error("unsupported platform: {0:#010x}")]
    UnsupportedPlatform(u32),
    /// The texture is not a plain 2D texture (cube map, volume, ...).
    #[error("unsupported texture kind: {0}")]
    UnsupportedTextureKind(String),
    /// Pixel data is wrapped in a container this crate cannot unpack.
    #[error("pixel data is stored in an unsupported container")]
    UnsupportedPixelContainer,
    /// The pixel-format tag string is not one of the known tags.
    #[error("unknown pixel format: {0}")]
    UnknownPixelFormat(String),
    /// The asset is valid but holds something other than a texture.
    #[error("asset is not a texture")]
    NotATexture,
    /// A container element or image index is out of range.
    #[error("invalid index {index} (count {count})")]
    InvalidIndex { index: usize, count: usize },
    /// A structural constraint was violated (message describes which one).
    #[error("structural mismatch: {0}")]
    StructuralMismatch(&'static str),
    /// An offset or size field is negative or overflows.
    #[error("invalid offset or size")]
    InvalidRange,
    /// No registered decoder accepted the byte source.
    #[error("unrecognized format")]
    UnrecognizedFormat,
    /// An underlying I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[source] io::Error),
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        if e.kind() == io::ErrorKind::UnexpectedEof {
            Error::Truncated
        } else {
            Error::Io(e)
        }
    }
}
