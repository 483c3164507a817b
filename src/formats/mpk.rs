//! MPK - versioned archive with fixed-width path records.
//!
//! ## Layout
//! ```text
//! [0x00] Magic "MPK\0"             (4 bytes)
//! [0x04] Unknown                   (u16)
//! [0x06] Version                   (i16)
//! [0x08] FileCount                 (i32)
//! [0x0C] Reserved                  (0x34 bytes)
//! [0x40] RecordTable               (FileCount × record_size(Version))
//! ```
//!
//! ## Record, version <= 1 (0x100 bytes)
//! ```text
//! [0x00] CompressionFlag           (u32)
//! [0x04] Offset                    (u32)
//! [0x08] CompressedSize            (u32)
//! [0x0C] UncompressedSize          (u32)
//! [0x10] Reserved                  (0x10 bytes)
//! [0x20] Path, NUL padded          (0xE0 bytes)
//! ```
//!
//! ## Record, version >= 2 (0x100 bytes)
//! ```text
//! [0x00] CompressionFlag           (u32)
//! [0x04] Id                        (u32)
//! [0x08] Offset                    (u64)
//! [0x10] CompressedSize            (u64)
//! [0x18] UncompressedSize          (u64)
//! [0x20] Path, NUL padded          (0xE0 bytes)
//! ```
//!
//! ## Notes
//! * Extraction copies `CompressedSize` bytes as stored. Decompressing
//!   entries with a non-zero `CompressionFlag` is left to the caller.

use std::io::{Read, Seek};

use tracing::debug;

use crate::Result;
use crate::container::{ContainerElement, ContainerFormat};
use crate::cursor::{ByteCursor, to_len};
use crate::formats::Decode;

/// Signature at offset 0.
pub const MAGIC: &[u8; 4] = b"MPK\0";

const HEADER_SIZE: u64 = 0x40;
const PATH_LEN: usize = 0xE0;

const NUMERIC_FIELDS_LEN: u64 = 0x20;

/// On-disk size of one record for the given archive version.
///
/// Both record shapes pack their numeric fields into 0x20 bytes, so the
/// stride does not actually depend on the version.
pub const fn record_size(_version: i16) -> u64 {
    NUMERIC_FIELDS_LEN + PATH_LEN as u64
}

/// One record of an MPK archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MpkFile {
    /// Path and stored byte range (`size` is the compressed size).
    pub element: ContainerElement,
    /// Raw compression flag; non-zero means the stored bytes are packed.
    pub compression_flag: u32,
    /// Record id (always 0 for version <= 1).
    pub id: u32,
    /// Size after decompression.
    pub uncompressed_size: u64,
}

impl MpkFile {
    /// Whether the stored bytes need decompressing.
    pub fn is_compressed(&self) -> bool {
        self.compression_flag != 0
    }
}

/// Parsed MPK archive (metadata only).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mpk {
    /// Unknown header word at 0x04.
    pub unknown: u16,
    /// Archive version; selects the record shape.
    pub version: i16,
    /// All records in on-disk order.
    pub files: Vec<MpkFile>,
}

impl Decode for Mpk {
    fn decode<R: Read + Seek>(r: &mut ByteCursor<R>) -> Result<Self> {
        r.expect_magic(MAGIC)?;
        let unknown = r.read_u16()?;
        let version = r.read_i16()?;
        let file_count = to_len(r.read_i32()?.into())?;
        r.skip(HEADER_SIZE - 0x0C)?;

        let stride = record_size(version);
        let mut files = Vec::with_capacity(file_count.min((r.len() / stride) as usize));
        for _ in 0..file_count {
            files.push(read_record(r, version)?);
        }

        debug!(version, count = files.len(), "parsed MPK table");
        Ok(Self {
            unknown,
            version,
            files,
        })
    }
}

fn read_record<R: Read + Seek>(r: &mut ByteCursor<R>, version: i16) -> Result<MpkFile> {
    let compression_flag = r.read_u32()?;
    let (id, offset, compressed_size, uncompressed_size) = if version <= 1 {
        let offset = r.read_u32()? as u64;
        let compressed = r.read_u32()? as u64;
        let uncompressed = r.read_u32()? as u64;
        r.skip(0x10)?;
        (0, offset, compressed, uncompressed)
    } else {
        let id = r.read_u32()?;
        (id, r.read_u64()?, r.read_u64()?, r.read_u64()?)
    };
    let name = r.read_fixed_ascii(PATH_LEN)?;

    Ok(MpkFile {
        element: ContainerElement {
            name,
            offset,
            size: compressed_size,
        },
        compression_flag,
        id,
        uncompressed_size,
    })
}

impl ContainerFormat for Mpk {
    fn element_count(&self) -> usize {
        self.files.len()
    }

    fn get(&self, index: usize) -> Option<&ContainerElement> {
        self.files.get(index).map(|f| &f.element)
    }
}
