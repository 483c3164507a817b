//! Uniform archive view: a list of named, independently extractable byte
//! ranges.
//!
//! An element is only a descriptor. Extraction always re-reads the range
//! from the archive's own byte source, so elements stay valid for as long
//! as that source does and never hold file data themselves.

use std::fmt;
use std::io::{Read, Seek, Take};

use crate::cursor::ByteCursor;
use crate::formats::Decode;
use crate::{Error, Result};

/// One named byte range inside an archive.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContainerElement {
    /// Entry name as stored (or fixed up) by the archive.
    pub name: String,
    /// Absolute offset of the entry within the archive.
    pub offset: u64,
    /// Entry size in bytes.
    pub size: u64,
}

/// An opened archive exposing its entries in on-disk order.
pub trait ContainerFormat: fmt::Debug {
    /// Number of entries in the archive.
    fn element_count(&self) -> usize;

    /// Entry at `index`, or [`None`] if out of range.
    fn get(&self, index: usize) -> Option<&ContainerElement>;

    /// Entry at `index`.
    ///
    /// Returns [`Error::InvalidIndex`] if `index >= element_count()`.
    fn element(&self, index: usize) -> Result<&ContainerElement> {
        self.get(index).ok_or(Error::InvalidIndex {
            index,
            count: self.element_count(),
        })
    }

    /// All entries in on-disk order.
    fn elements(&self) -> Vec<&ContainerElement> {
        (0..self.element_count()).filter_map(|i| self.get(i)).collect()
    }

    /// First entry with exactly this name.
    fn find(&self, name: &str) -> Option<&ContainerElement> {
        (0..self.element_count())
            .filter_map(|i| self.get(i))
            .find(|e| e.name == name)
    }
}

impl<T: ContainerFormat + ?Sized> ContainerFormat for Box<T> {
    fn element_count(&self) -> usize {
        (**self).element_count()
    }

    fn get(&self, index: usize) -> Option<&ContainerElement> {
        (**self).get(index)
    }
}

/// Copy exactly `element.size` bytes at `element.offset` out of `cursor`.
pub fn extract<R: Read + Seek>(
    cursor: &mut ByteCursor<R>,
    element: &ContainerElement,
) -> Result<Vec<u8>> {
    let size = usize::try_from(element.size).map_err(|_| Error::InvalidRange)?;
    cursor.seek(element.offset)?;
    cursor.read_bytes(size)
}

/// Reader wrapper owning an archive byte source and its parsed table.
///
/// Extraction seeks the owned cursor, so one reader serves one caller at a
/// time; open a second reader over the same bytes for concurrent use.
pub struct ContainerReader<R, C> {
    inner: ByteCursor<R>,
    /// Parsed metadata.
    pub format: C,
}

impl<R: Read + Seek, C: ContainerFormat> ContainerReader<R, C> {
    /// Wrap an already-parsed container and the cursor it was parsed from.
    pub fn new(inner: ByteCursor<R>, format: C) -> Self {
        Self { inner, format }
    }

    /// Parse a container from `reader` and wrap it.
    pub fn open(reader: R) -> Result<Self>
    where
        C: Decode,
    {
        let mut inner = ByteCursor::new(reader)?;
        let format = C::decode(&mut inner)?;
        Ok(Self { inner, format })
    }

    /// Open an entry for streaming access.
    ///
    /// Seeks to the entry's start and returns a [`Take`] limited to its byte
    /// range. The borrow ends when the [`Take`] is dropped.
    pub fn read_element(&mut self, index: usize) -> Result<Take<&mut R>> {
        let element = self.format.element(index)?;
        let (offset, size) = (element.offset, element.size);
        self.inner.take(offset, size)
    }

    /// Copy an entry's bytes into memory.
    pub fn extract(&mut self, index: usize) -> Result<Vec<u8>> {
        let element = self.format.element(index)?;
        extract(&mut self.inner, element)
    }

    /// Iterate over all entries.
    pub fn elements(&self) -> impl Iterator<Item = &ContainerElement> {
        (0..self.format.element_count()).filter_map(|i| self.format.get(i))
    }

    /// Find an entry by name. Returns [`None`] if not found.
    pub fn find(&self, name: &str) -> Option<&ContainerElement> {
        self.format.find(name)
    }

    /// Consume the reader, returning the inner cursor.
    pub fn into_inner(self) -> ByteCursor<R> {
        self.inner
    }
}
