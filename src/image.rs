//! Decoded image descriptions and the pixel-engine seam.
//!
//! Image formats in this crate stop at an [`ImageRequest`]: dimensions, a
//! pixel-format tag and the raw pixel bytes. Turning that into a displayable
//! raster (block decompression, swizzle removal, colour conversion) is the
//! job of a [`PixelEngine`] supplied by the caller.

use std::fmt;

use thiserror::Error;

use crate::cursor::Endian;
use crate::{Error, Result};

/// Pixel layout tag attached to raw image bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    /// 16-bit 5:6:5 RGB.
    Rgb565,
    /// 16-bit 1:5:5:5 ARGB.
    Argb1555,
    /// 16-bit 4:4:4:4 ARGB.
    Argb4444,
    /// BC1 block compression.
    Dxt1,
    /// BC2 block compression.
    Dxt3,
    /// BC3 block compression.
    Dxt5,
    /// Two-channel block compression (RGTC2).
    Bc5,
    /// BPTC block compression.
    Bc7,
    /// 32-bit RGBA, one byte per channel.
    Rgba8,
    /// 32-bit ARGB, one byte per channel.
    Argb8,
    /// 8-bit luminance.
    L8,
    /// 8-bit alpha.
    A8,
}

impl PixelFormat {
    /// Map a Phyre memory-type string (`"DXT5"`, `"ARGB8"`, ...) to a tag.
    pub fn from_memory_type(tag: &str) -> Option<Self> {
        Some(match tag {
            "DXT1" => Self::Dxt1,
            "DXT3" => Self::Dxt3,
            "DXT5" => Self::Dxt5,
            "BC5" => Self::Bc5,
            "BC7" => Self::Bc7,
            "RGBA8" => Self::Rgba8,
            "ARGB8" => Self::Argb8,
            "L8" => Self::L8,
            "A8" => Self::A8,
            _ => return None,
        })
    }

    /// Map a PAC format code (1..=3) to a tag.
    pub fn from_pac_code(code: i32) -> Option<Self> {
        match code {
            1 => Some(Self::Rgb565),
            2 => Some(Self::Argb1555),
            3 => Some(Self::Argb4444),
            _ => None,
        }
    }

    /// Whether the format is stored as 4x4 compressed blocks.
    pub fn is_block_compressed(self) -> bool {
        matches!(
            self,
            Self::Dxt1 | Self::Dxt3 | Self::Dxt5 | Self::Bc5 | Self::Bc7
        )
    }

    /// Storage cost per pixel. Block formats report their average rate.
    pub fn bits_per_pixel(self) -> u32 {
        match self {
            Self::Dxt1 => 4,
            Self::Dxt3 | Self::Dxt5 | Self::Bc5 | Self::Bc7 => 8,
            Self::L8 | Self::A8 => 8,
            Self::Rgb565 | Self::Argb1555 | Self::Argb4444 => 16,
            Self::Rgba8 | Self::Argb8 => 32,
        }
    }
}

impl fmt::Display for PixelFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Rgb565 => "RGB565",
            Self::Argb1555 => "ARGB1555",
            Self::Argb4444 => "ARGB4444",
            Self::Dxt1 => "DXT1",
            Self::Dxt3 => "DXT3",
            Self::Dxt5 => "DXT5",
            Self::Bc5 => "BC5",
            Self::Bc7 => "BC7",
            Self::Rgba8 => "RGBA8",
            Self::Argb8 => "ARGB8",
            Self::L8 => "L8",
            Self::A8 => "A8",
        };
        f.write_str(s)
    }
}

/// Row order of the pixel payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Orientation {
    /// Row 0 is the top row.
    #[default]
    TopDown,
    /// Row 0 is the bottom row; flip vertically before display.
    BottomUp,
}

/// Everything a pixel engine needs to turn raw bytes into a raster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRequest {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Layout of `data`.
    pub format: PixelFormat,
    /// Byte order of multi-byte pixel values.
    pub endian: Endian,
    /// Whether pixels are in the platform's swizzled order.
    pub swizzled: bool,
    /// Row order for display.
    pub orientation: Orientation,
    /// Raw pixel bytes.
    pub data: Vec<u8>,
}

impl ImageRequest {
    /// Minimum payload size for the declared dimensions and format.
    pub fn required_len(&self) -> u64 {
        let (w, h) = (self.width as u64, self.height as u64);
        if self.format.is_block_compressed() {
            let block_bytes = self.format.bits_per_pixel() as u64 * 2;
            w.div_ceil(4) * h.div_ceil(4) * block_bytes
        } else {
            w * h * self.format.bits_per_pixel() as u64 / 8
        }
    }

    /// Whether `data` holds at least [`required_len`](Self::required_len) bytes.
    pub fn is_complete(&self) -> bool {
        self.data.len() as u64 >= self.required_len()
    }
}

/// A decoded file holding one or more images.
pub trait ImageFormat: fmt::Debug {
    /// Number of images.
    fn image_count(&self) -> usize;

    /// Image at `index`, or [`None`] if out of range.
    fn get_image(&self, index: usize) -> Option<&ImageRequest>;

    /// Image at `index`.
    ///
    /// Returns [`Error::InvalidIndex`] if `index >= image_count()`.
    fn image(&self, index: usize) -> Result<&ImageRequest> {
        self.get_image(index).ok_or(Error::InvalidIndex {
            index,
            count: self.image_count(),
        })
    }
}

impl<T: ImageFormat + ?Sized> ImageFormat for Box<T> {
    fn image_count(&self) -> usize {
        (**self).image_count()
    }

    fn get_image(&self, index: usize) -> Option<&ImageRequest> {
        (**self).get_image(index)
    }
}

/// Failures a pixel engine may report.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PixelError {
    /// The engine cannot convert this tag.
    #[error("unsupported pixel format: {0}")]
    UnsupportedTag(PixelFormat),
    /// Fewer bytes than the dimensions require.
    #[error("insufficient pixel data: need {needed} bytes, got {got}")]
    InsufficientData { needed: u64, got: u64 },
}

/// Converts an [`ImageRequest`] into a display-ready raster.
///
/// Implementations live outside this crate.
pub trait PixelEngine {
    /// Output raster type.
    type Raster;

    /// Convert `request`, or fail with a [`PixelError`].
    fn convert(&self, request: &ImageRequest) -> std::result::Result<Self::Raster, PixelError>;
}
