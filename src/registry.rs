//! Format detection and dispatch.
//!
//! A [`FormatRegistry`] is an ordered list of decoders, each advertising
//! either a fixed signature or a probe function. Detection tries every
//! signature first, then every probe, both in registration order, and picks
//! the first match. Each check starts from offset 0 in little-endian mode,
//! so one failed check cannot influence the next.
//!
//! Detection never fails loudly: a mismatch only means "try the next one".
//! Once a decoder has been picked, any error it returns is final and is
//! reported as-is; there is no fallback to other decoders.

use std::io::{Read, Seek};

use tracing::debug;

use crate::container::ContainerFormat;
use crate::cursor::{ByteCursor, Endian};
use crate::formats::{Decode, gpda, mpk, pac, phyre};
use crate::image::ImageFormat;
use crate::{Error, Result};

/// Result of opening a byte source through the registry.
#[derive(Debug)]
pub enum Decoded {
    /// An archive of named byte ranges.
    Container(Box<dyn ContainerFormat>),
    /// One or more images.
    Images(Box<dyn ImageFormat>),
}

impl Decoded {
    /// The archive view, if this is an archive.
    pub fn as_container(&self) -> Option<&dyn ContainerFormat> {
        match self {
            Decoded::Container(c) => Some(c.as_ref()),
            Decoded::Images(_) => None,
        }
    }

    /// The image view, if this is an image file.
    pub fn as_images(&self) -> Option<&dyn ImageFormat> {
        match self {
            Decoded::Images(i) => Some(i.as_ref()),
            Decoded::Container(_) => None,
        }
    }
}

/// Decoder invoked once its format has been detected.
pub type OpenFn<R> = fn(&mut ByteCursor<R>) -> Result<Decoded>;
/// Heuristic detection; `true` means "this format".
pub type ProbeFn<R> = fn(&mut ByteCursor<R>) -> bool;

/// How a registered format is recognised.
pub enum Detection<R> {
    /// Fixed bytes at a fixed offset.
    Magic { bytes: &'static [u8], offset: u64 },
    /// A full structural check.
    Probe(ProbeFn<R>),
}

/// One registered decoder.
pub struct FormatEntry<R> {
    /// Short format name, used for logging.
    pub name: &'static str,
    pub detection: Detection<R>,
    open: OpenFn<R>,
}

/// Ordered set of decoders.
pub struct FormatRegistry<R> {
    formats: Vec<FormatEntry<R>>,
}

impl<R> Default for FormatRegistry<R> {
    fn default() -> Self {
        Self {
            formats: Vec::new(),
        }
    }
}

fn open_container<R: Read + Seek, C: Decode + ContainerFormat + 'static>(
    r: &mut ByteCursor<R>,
) -> Result<Decoded> {
    Ok(Decoded::Container(Box::new(C::decode(r)?)))
}

fn open_images<R: Read + Seek, I: Decode + ImageFormat + 'static>(
    r: &mut ByteCursor<R>,
) -> Result<Decoded> {
    Ok(Decoded::Images(Box::new(I::decode(r)?)))
}

impl<R: Read + Seek> FormatRegistry<R> {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with every format this crate implements.
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        registry
            .register_magic("GPDA", gpda::MAGIC, 0, open_container::<R, gpda::Gpda>)
            .register_magic("MPK", mpk::MAGIC, 0, open_container::<R, mpk::Mpk>)
            .register_magic("Phyre", phyre::MAGIC_BE, 0, open_images::<R, phyre::Phyre>)
            .register_magic("Phyre", phyre::MAGIC_LE, 0, open_images::<R, phyre::Phyre>)
            .register_probe("PAC", pac::probe::<R>, open_images::<R, pac::Pac>);
        registry
    }

    /// Register a decoder recognised by `bytes` at `offset`.
    pub fn register_magic(
        &mut self,
        name: &'static str,
        bytes: &'static [u8],
        offset: u64,
        open: OpenFn<R>,
    ) -> &mut Self {
        self.formats.push(FormatEntry {
            name,
            detection: Detection::Magic { bytes, offset },
            open,
        });
        self
    }

    /// Register a decoder recognised by a probe function.
    pub fn register_probe(
        &mut self,
        name: &'static str,
        probe: ProbeFn<R>,
        open: OpenFn<R>,
    ) -> &mut Self {
        self.formats.push(FormatEntry {
            name,
            detection: Detection::Probe(probe),
            open,
        });
        self
    }

    /// Registered formats in registration order.
    pub fn formats(&self) -> impl Iterator<Item = &FormatEntry<R>> {
        self.formats.iter()
    }

    fn reset(cursor: &mut ByteCursor<R>) -> Result<()> {
        cursor.set_endian(Endian::Little);
        cursor.seek(0)
    }

    /// Find the decoder for `cursor`, or [`None`].
    ///
    /// Only I/O failures of the byte source itself are returned as errors.
    pub fn detect(&self, cursor: &mut ByteCursor<R>) -> Result<Option<&FormatEntry<R>>> {
        for entry in &self.formats {
            if let Detection::Magic { bytes, offset } = entry.detection {
                Self::reset(cursor)?;
                if cursor.matches_at(offset, bytes)? {
                    return Ok(Some(entry));
                }
            }
        }
        for entry in &self.formats {
            if let Detection::Probe(probe) = entry.detection {
                Self::reset(cursor)?;
                if probe(cursor) {
                    return Ok(Some(entry));
                }
            }
        }
        Ok(None)
    }

    /// Detect the format of `cursor` and decode it.
    ///
    /// Returns [`Error::UnrecognizedFormat`] if no decoder matches.
    pub fn open(&self, cursor: &mut ByteCursor<R>) -> Result<Decoded> {
        let entry = self.detect(cursor)?.ok_or(Error::UnrecognizedFormat)?;
        debug!(format = entry.name, "detected format");
        Self::reset(cursor)?;
        (entry.open)(cursor)
    }
}
