//! GPDA - archive used by `.dat` files of a PS3 visual novel.
//!
//! ## Layout
//! ```text
//! [0x00] Magic "GPDA64BY"          (8 bytes)
//! [0x08] FileSize                  (i64)
//! [0x10] Unknown (0 so far)        (i32)
//! [0x14] FileCount                 (i32)
//! [0x18] EntryTable                (FileCount × 0x20 bytes)
//! [...]  Name records and file data, located by absolute offsets
//! ```
//!
//! ## File Entry (0x20 bytes)
//! ```text
//! [0x00] Offset     - absolute (i64)
//! [0x08] Reserved   (i64)
//! [0x10] Size       (i64)
//! [0x18] NameOffset - absolute offset of the name record (i64)
//! ```
//!
//! ## Name Record
//! An `i32` byte count followed by that many ASCII bytes, taken verbatim
//! (no NUL trimming).
//!
//! ## Notes
//! * Stored names do not always carry the right extension. An entry whose
//!   payload starts with the gzip magic `1F 8B` gets `.gz` appended unless
//!   the name already ends in `.gz`. This is a naming fixup only and never
//!   fails the archive.

use std::io::{Read, Seek};

use tracing::{debug, trace};

use crate::Result;
use crate::container::{ContainerElement, ContainerFormat};
use crate::cursor::{ByteCursor, to_len, to_offset};
use crate::formats::Decode;

/// Signature at offset 0.
pub const MAGIC: &[u8; 8] = b"GPDA64BY";

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Parsed GPDA archive (metadata only).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Gpda {
    /// File size recorded in the header.
    pub file_size: i64,
    /// Unknown header word.
    pub unknown: i32,
    /// All entries in on-disk order.
    pub files: Vec<ContainerElement>,
}

impl Decode for Gpda {
    fn decode<R: Read + Seek>(r: &mut ByteCursor<R>) -> Result<Self> {
        r.expect_magic(MAGIC)?;
        let file_size = r.read_i64()?;
        let unknown = r.read_i32()?;
        let file_count = to_len(r.read_i32()?.into())?;

        let mut files = Vec::with_capacity(file_count.min(r.len() as usize / 0x20));
        for _ in 0..file_count {
            let offset = to_offset(r.read_i64()?)?;
            let _reserved = r.read_i64()?;
            let size = to_offset(r.read_i64()?)?;
            let name_offset = to_offset(r.read_i64()?)?;

            let entry_end = r.position()?;

            r.seek(name_offset)?;
            let name_len = to_len(r.read_i32()?.into())?;
            let mut name = r.read_string(name_len)?;

            // Short or out-of-range payloads just skip the fixup.
            let gzipped = matches!(r.matches_at(offset, &GZIP_MAGIC), Ok(true));
            if gzipped && !name.ends_with(".gz") {
                trace!(%name, "gzip payload without .gz suffix");
                name.push_str(".gz");
            }

            r.seek(entry_end)?;
            files.push(ContainerElement { name, offset, size });
        }

        debug!(count = files.len(), file_size, "parsed GPDA table");
        Ok(Self {
            file_size,
            unknown,
            files,
        })
    }
}

impl ContainerFormat for Gpda {
    fn element_count(&self) -> usize {
        self.files.len()
    }

    fn get(&self, index: usize) -> Option<&ContainerElement> {
        self.files.get(index)
    }
}
