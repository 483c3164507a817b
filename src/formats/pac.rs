//! PAC - headerless bundle of 16-bit images from Dreamcast titles.
//!
//! There is no magic number; a file is recognised only if its table adds up
//! to exactly the file length and every image-shaped entry is consistent.
//!
//! ## Layout (always little-endian)
//! ```text
//! [0x00] EntryCount                (i32, at most 0x10000)
//! [0x04] EntryTable                (EntryCount × { Offset: i32, Length: i32 })
//! [...]  Entries, each located by its absolute Offset
//! ```
//!
//! ## Entry
//! ```text
//! [0x00] Width                     (i32)
//! [0x04] Height                    (i32)
//! [0x08] Format                    (i32: 1 = RGB565, 2 = ARGB1555, 3 = ARGB4444)
//! [0x0C] Pixel data                (Length - 12 bytes, at least Width × Height × 2)
//! ```
//!
//! ## Notes
//! * `4 + EntryCount × 8 + Σ Length` must equal the file length.
//! * Entries with a dimension outside `9..=4096` are auxiliary data, not
//!   images, and are dropped from the image list.
//! * An image-shaped entry that is too short for its dimensions, or whose
//!   payload runs past the end of the file, means the whole file is not
//!   PAC. So does an unknown format code.

use std::io::{Read, Seek};

use tracing::{debug, trace};

use crate::cursor::{ByteCursor, Endian, to_len, to_offset};
use crate::formats::Decode;
use crate::image::{ImageFormat, ImageRequest, Orientation, PixelFormat};
use crate::{Error, Result};

/// Upper bound on the entry count.
pub const MAX_ENTRIES: i32 = 0x10000;

const ENTRY_HEADER_SIZE: i64 = 12;
const MIN_DIMENSION: i32 = 9;
const MAX_DIMENSION: i32 = 4096;

/// One accepted image of a PAC file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PacImage {
    /// Absolute offset of the entry (its 12-byte sub-header).
    pub offset: u32,
    /// Entry length including the sub-header.
    pub length: u32,
    /// Raw format code (1..=3).
    pub format_code: i32,
    /// Decoded description and pixel payload.
    pub image: ImageRequest,
}

/// Parsed PAC file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pac {
    /// Entry count from the header, images and auxiliary entries alike.
    pub entry_count: u32,
    /// Accepted images in table order.
    pub images: Vec<PacImage>,
}

/// What the shape checks make of a single table entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EntryVerdict {
    /// A usable image.
    Image(PixelFormat),
    /// Not an image; drop it and keep going.
    SkipEntry,
    /// The file cannot be PAC.
    RejectFile(&'static str),
}

fn classify(width: i32, height: i32, format: i32, length: i32) -> EntryVerdict {
    let in_range = |d: i32| (MIN_DIMENSION..=MAX_DIMENSION).contains(&d);
    if !in_range(width) || !in_range(height) {
        return EntryVerdict::SkipEntry;
    }
    let needed = ENTRY_HEADER_SIZE + width as i64 * height as i64 * 2;
    if needed > length as i64 {
        return EntryVerdict::RejectFile("PAC image data shorter than its dimensions");
    }
    match PixelFormat::from_pac_code(format) {
        Some(format) => EntryVerdict::Image(format),
        None => EntryVerdict::RejectFile("unknown PAC pixel format"),
    }
}

/// An image entry that passed every shape check.
#[derive(Debug, Clone, Copy)]
struct ImageEntry {
    offset: u64,
    length: i32,
    width: i32,
    height: i32,
    format_code: i32,
    format: PixelFormat,
}

/// Validate the table and sub-headers without keeping anything on failure.
fn read_layout<R: Read + Seek>(r: &mut ByteCursor<R>) -> Result<(u32, Vec<ImageEntry>)> {
    r.set_endian(Endian::Little);
    r.seek(0)?;

    let count = r.read_i32()?;
    if !(0..=MAX_ENTRIES).contains(&count) {
        return Err(Error::StructuralMismatch("PAC entry count out of range"));
    }
    let table_end = 4 + count as u64 * 8;
    if r.len() < table_end {
        return Err(Error::StructuralMismatch("PAC table longer than file"));
    }

    let mut table = Vec::with_capacity(count as usize);
    let mut total = table_end as i64;
    for _ in 0..count {
        let offset = r.read_i32()?;
        let length = r.read_i32()?;
        total += length as i64;
        table.push((offset, length));
    }
    if total != r.len() as i64 {
        return Err(Error::StructuralMismatch(
            "PAC sizes do not add up to file length",
        ));
    }

    let mut images = Vec::new();
    for (index, (offset, length)) in table.into_iter().enumerate() {
        let offset = to_offset(offset.into())?;
        r.seek(offset)?;
        let width = r.read_i32()?;
        let height = r.read_i32()?;
        let format_code = r.read_i32()?;

        match classify(width, height, format_code, length) {
            EntryVerdict::Image(_) if offset + length as u64 > r.len() => {
                return Err(Error::StructuralMismatch(
                    "PAC image data runs past end of file",
                ));
            }
            EntryVerdict::Image(format) => images.push(ImageEntry {
                offset,
                length,
                width,
                height,
                format_code,
                format,
            }),
            EntryVerdict::SkipEntry => {
                trace!(index, width, height, "skipping non-image PAC entry");
            }
            EntryVerdict::RejectFile(reason) => return Err(Error::StructuralMismatch(reason)),
        }
    }

    Ok((count as u32, images))
}

/// Heuristic detection: accept only if every PAC shape check holds.
pub fn probe<R: Read + Seek>(r: &mut ByteCursor<R>) -> bool {
    read_layout(r).is_ok()
}

impl Decode for Pac {
    fn decode<R: Read + Seek>(r: &mut ByteCursor<R>) -> Result<Self> {
        let (entry_count, entries) = read_layout(r)?;

        let mut images = Vec::with_capacity(entries.len());
        for entry in entries {
            r.seek(entry.offset + ENTRY_HEADER_SIZE as u64)?;
            let data = r.read_bytes(to_len(entry.length as i64 - ENTRY_HEADER_SIZE)?)?;
            images.push(PacImage {
                offset: entry.offset as u32,
                length: entry.length as u32,
                format_code: entry.format_code,
                image: ImageRequest {
                    width: entry.width as u32,
                    height: entry.height as u32,
                    format: entry.format,
                    endian: Endian::Little,
                    swizzled: false,
                    orientation: Orientation::TopDown,
                    data,
                },
            });
        }

        debug!(entry_count, images = images.len(), "parsed PAC bundle");
        Ok(Self {
            entry_count,
            images,
        })
    }
}

impl ImageFormat for Pac {
    fn image_count(&self) -> usize {
        self.images.len()
    }

    fn get_image(&self, index: usize) -> Option<&ImageRequest> {
        self.images.get(index).map(|i| &i.image)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use rstest::rstest;

    use super::*;

    /// A table entry: `(width, height, format, extra payload bytes)`.
    type EntryShape = (i32, i32, i32, usize);

    /// Build a PAC whose entries follow the table back to back. Image-shaped
    /// entries get exactly `width × height × 2 + extra` pixel bytes.
    fn build(entries: &[EntryShape]) -> Vec<u8> {
        let mut bodies = Vec::new();
        for &(w, h, f, extra) in entries {
            let pixels = if w > 0 && h > 0 {
                (w * h * 2) as usize
            } else {
                0
            };
            let mut body = Vec::new();
            body.extend_from_slice(&w.to_le_bytes());
            body.extend_from_slice(&h.to_le_bytes());
            body.extend_from_slice(&f.to_le_bytes());
            body.extend((0..pixels + extra).map(|i| i as u8));
            bodies.push(body);
        }

        let mut out = Vec::new();
        out.extend_from_slice(&(entries.len() as i32).to_le_bytes());
        let mut pos = 4 + entries.len() * 8;
        for body in &bodies {
            out.extend_from_slice(&(pos as i32).to_le_bytes());
            out.extend_from_slice(&(body.len() as i32).to_le_bytes());
            pos += body.len();
        }
        for body in bodies {
            out.extend(body);
        }
        out
    }

    fn cursor(bytes: Vec<u8>) -> ByteCursor<Cursor<Vec<u8>>> {
        ByteCursor::new(Cursor::new(bytes)).unwrap()
    }

    fn decode(bytes: Vec<u8>) -> Result<Pac> {
        Pac::decode(&mut cursor(bytes))
    }

    #[rstest]
    #[case(8, 16, 1, 100, EntryVerdict::SkipEntry)]
    #[case(16, 8, 1, 100, EntryVerdict::SkipEntry)]
    #[case(4097, 16, 1, 1_000_000, EntryVerdict::SkipEntry)]
    #[case(0, 0, 0, 0, EntryVerdict::SkipEntry)]
    #[case(9, 9, 1, 12 + 162, EntryVerdict::Image(PixelFormat::Rgb565))]
    #[case(4096, 9, 3, 12 + 4096 * 18, EntryVerdict::Image(PixelFormat::Argb4444))]
    #[case(9, 9, 2, 12 + 161, EntryVerdict::RejectFile("PAC image data shorter than its dimensions"))]
    #[case(9, 9, 4, 12 + 162, EntryVerdict::RejectFile("unknown PAC pixel format"))]
    #[case(9, 9, 0, 12 + 162, EntryVerdict::RejectFile("unknown PAC pixel format"))]
    fn entry_classification(
        #[case] width: i32,
        #[case] height: i32,
        #[case] format: i32,
        #[case] length: i32,
        #[case] expected: EntryVerdict,
    ) {
        assert_eq!(classify(width, height, format, length), expected);
    }

    #[test]
    fn two_images_and_one_skipped_entry() {
        let bytes = build(&[(16, 16, 1, 0), (4, 4, 0, 0), (10, 12, 2, 6)]);
        let pac = decode(bytes).unwrap();

        assert_eq!(pac.entry_count, 3);
        assert_eq!(pac.image_count(), 2);

        let first = pac.image(0).unwrap();
        assert_eq!((first.width, first.height), (16, 16));
        assert_eq!(first.format, PixelFormat::Rgb565);
        assert_eq!(first.endian, Endian::Little);
        assert_eq!(first.data.len(), 16 * 16 * 2);
        assert_eq!(first.data[0], 0);

        let second = &pac.images[1];
        assert_eq!(second.format_code, 2);
        assert_eq!(second.image.format, PixelFormat::Argb1555);
        assert_eq!(second.image.data.len(), 10 * 12 * 2 + 6);
        assert_eq!(second.length as usize, 12 + 10 * 12 * 2 + 6);
    }

    #[test]
    fn width_nine_is_an_image_width_eight_is_not() {
        let pac = decode(build(&[(8, 16, 1, 0), (9, 16, 1, 0)])).unwrap();
        assert_eq!(pac.image_count(), 1);
        assert_eq!(pac.images[0].image.width, 9);
    }

    #[test]
    fn too_many_entries_rejected_before_table() {
        // Only the count is present; a table read would be truncated.
        let bytes = 0x10001i32.to_le_bytes().to_vec();
        let mut c = cursor(bytes);
        assert!(matches!(
            read_layout(&mut c),
            Err(Error::StructuralMismatch("PAC entry count out of range"))
        ));
        assert!(!probe(&mut c));
    }

    #[test]
    fn table_longer_than_file() {
        let mut bytes = 3i32.to_le_bytes().to_vec();
        bytes.extend_from_slice(&[0; 16]);
        assert!(matches!(
            decode(bytes),
            Err(Error::StructuralMismatch("PAC table longer than file"))
        ));
    }

    #[rstest]
    #[case(1)]
    #[case(-1)]
    fn size_mismatch_by_one_byte(#[case] delta: i32) {
        let mut bytes = build(&[(16, 16, 1, 0)]);
        if delta > 0 {
            bytes.push(0);
        } else {
            bytes.pop();
        }
        assert!(!probe(&mut cursor(bytes.clone())));
        assert!(matches!(
            decode(bytes),
            Err(Error::StructuralMismatch(
                "PAC sizes do not add up to file length",
            ))
        ));
    }

    #[test]
    fn image_past_end_of_file_rejected() {
        // Sizes add up, but the image entry sits after a short auxiliary
        // entry and its payload runs 8 bytes past the end.
        let mut bytes = vec![0u8; 206];
        let fields: [(usize, i32); 8] = [
            (0, 2),
            (4, 40),
            (8, 174),
            (12, 20),
            (16, 12),
            (40, 9),
            (44, 9),
            (48, 1),
        ];
        for (at, v) in fields {
            bytes[at..at + 4].copy_from_slice(&v.to_le_bytes());
        }
        assert!(!probe(&mut cursor(bytes.clone())));
        assert!(matches!(
            decode(bytes),
            Err(Error::StructuralMismatch(
                "PAC image data runs past end of file",
            ))
        ));
    }

    #[test]
    fn unknown_format_rejects_whole_file() {
        let bytes = build(&[(16, 16, 1, 0), (16, 16, 4, 0)]);
        assert!(!probe(&mut cursor(bytes.clone())));
        assert!(decode(bytes).is_err());
    }

    #[test]
    fn short_image_rejects_whole_file() {
        // Store 16x15 worth of pixels, then claim a height of 16.
        let mut bytes = build(&[(16, 15, 1, 0)]);
        bytes[16..20].copy_from_slice(&16i32.to_le_bytes());
        assert!(!probe(&mut cursor(bytes)));
    }

    #[test]
    fn empty_bundle_is_valid() {
        let pac = decode(0i32.to_le_bytes().to_vec()).unwrap();
        assert_eq!(pac.entry_count, 0);
        assert_eq!(pac.image_count(), 0);
    }

    #[test]
    fn probe_resets_to_start() {
        let bytes = build(&[(16, 16, 3, 0)]);
        let mut c = cursor(bytes);
        c.seek(10).unwrap();
        c.set_endian(Endian::Big);
        assert!(probe(&mut c));
        let pac = Pac::decode(&mut c).unwrap();
        assert_eq!(pac.images[0].image.format, PixelFormat::Argb4444);
    }

    #[test]
    fn decoding_is_deterministic() {
        let bytes = build(&[(16, 16, 1, 2), (32, 9, 3, 0)]);
        assert_eq!(decode(bytes.clone()).unwrap(), decode(bytes).unwrap());
    }
}
