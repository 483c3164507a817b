//! Phyre - descriptor-table driven texture asset (PS3 / PS4 engines).
//!
//! A Phyre file describes its own object layout: a descriptor table lists
//! named classes (root records) and their named fields (subrecords) with
//! per-field offsets and sizes. Field positions differ between engine
//! versions, so the image metadata is found by walking that table rather
//! than at fixed offsets.
//!
//! ## Layout
//! ```text
//! [0x00] Magic "PHYR" (big-endian) or "RYHP" (little-endian)  (4 bytes)
//! [0x04] MagicOffset                 (i32)
//! [0x08] DescriptorTableSize         (i32)
//! [0x0C] Platform                    (u32: "GCM\0" or "GNM\2")
//! [MagicOffset]
//!        Descriptor table            (DescriptorTableSize bytes)
//! [MagicOffset + DescriptorTableSize]
//!        Instance list headers       (InstanceCount × 0x24 bytes)
//! [InstanceRegionEnd]
//!        Object data, then variable-length fields, then pixel data
//! ```
//!
//! ## Descriptor Table
//! ```text
//! [0x00] Magic 0x01020304            (u32)
//! [0x04] DescriptorTableSize again   (i32)
//! [0x08] PaddingWords - 2            (i32)
//! [0x0C] RootCount                   (i32)
//! [0x10] SubCount                    (i32)
//! [0x14] StringTableSize             (i32)
//! [0x18] Padding                     ((PaddingWords) × 4 bytes)
//! [...]  Root records                (RootCount × 0x24 bytes)
//! [...]  Subrecords                  (SubCount × 0x18 bytes)
//! [...]  String table                (StringTableSize bytes, ends the table)
//! ```
//!
//! ## Root Record (0x24 bytes)
//! ```text
//! [0x00] Unknown                     (8 bytes)
//! [0x08] NameOffset                  (i32, into the string table)
//! [0x0C] SubrecordCount              (i32)
//! [0x10] Unknown                     (0x14 bytes)
//! ```
//! Subrecords are assigned to root records contiguously, in order.
//!
//! ## Subrecord (0x18 bytes)
//! ```text
//! [0x00] NameOffset                  (i32, into the string table)
//! [0x04] Unknown                     (4 bytes)
//! [0x08] Offset                      (i32)
//! [0x0C] Size                        (i32)
//! [0x10] Unknown                     (8 bytes)
//! ```
//!
//! ## Field walk
//! Root records are visited in order and their subrecords dispatched by
//! class and field name:
//!
//! | Root record              | Field(s) read |
//! |--------------------------|---------------|
//! | first six                | buffer size and `m_instanceListCount`, at absolute `Offset` |
//! | `PInstanceListHeader`    | `m_size` / `m_objectsSize` / `m_arraysSize` per instance |
//! | `PString`                | import name (diagnostic) |
//! | `PTexture2DGNM`          | texture state (diagnostic, PS4 only) |
//! | `PTexture2DBase`         | `m_width`, `m_height` |
//! | `PTextureCommonBase`     | `m_format` and `m_memoryType` strings, other fields skipped |
//!
//! `PTextureCommonBase` fields are laid out back to back after all
//! instance objects; a running offset tracks the position of the next one.
//! Pixel data follows the memory-type string after a fixed 0x25 (GCM) or
//! 0x2B (GNM) bytes of trailing metadata.
//!
//! ## Notes
//! * Row 0 of a non-swizzled image is the bottom row; the emitted request
//!   is marked [`Orientation::BottomUp`].
//! * GNM pixel data is a headerless GNF payload and is rejected with
//!   [`Error::UnsupportedPixelContainer`] once it has been located.

use std::io::{Read, Seek};
use std::ops::Range;

use tracing::{debug, trace};

use crate::cursor::{ByteCursor, Endian, to_len, to_offset};
use crate::formats::Decode;
use crate::image::{ImageFormat, ImageRequest, Orientation, PixelFormat};
use crate::{Error, Result};

/// Signature of a big-endian file.
pub const MAGIC_BE: &[u8; 4] = b"PHYR";
/// Signature of a little-endian file.
pub const MAGIC_LE: &[u8; 4] = b"RYHP";
/// Magic value opening the descriptor table.
pub const SECONDARY_MAGIC: u32 = 0x0102_0304;

const INSTANCE_HEADER_STRIDE: i64 = 0x24;
const ROOT_RECORD_SIZE: u64 = 0x24;
const SUB_RECORD_SIZE: u64 = 0x18;
/// Root records before this index hold fields at absolute offsets.
const ABSOLUTE_ROOTS: usize = 6;
const SWIZZLE_FLAG_OFFSET: i64 = 0x10;
const SWIZZLE_FLAG: i32 = 9;
const TEX_STATE_TEXT_OFFSET: i64 = 14;
const TEX_STATE_TEXT_LEN: usize = 13;

/// Target platform recorded in the file header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Platform {
    /// PS3 (`"GCM\0"`).
    Gcm,
    /// PS4 (`"GNM\2"`).
    Gnm,
}

impl Platform {
    /// Raw code for [`Platform::Gcm`].
    pub const GCM_CODE: u32 = 0x4743_4d00;
    /// Raw code for [`Platform::Gnm`].
    pub const GNM_CODE: u32 = 0x474e_4d02;

    /// Look up a raw platform code.
    pub fn from_code(code: u32) -> Option<Self> {
        match code {
            Self::GCM_CODE => Some(Self::Gcm),
            Self::GNM_CODE => Some(Self::Gnm),
            _ => None,
        }
    }

    /// Raw platform code.
    pub fn code(self) -> u32 {
        match self {
            Self::Gcm => Self::GCM_CODE,
            Self::Gnm => Self::GNM_CODE,
        }
    }

    /// Metadata bytes between the memory-type string and the pixel data.
    fn trailing_metadata(self) -> i64 {
        match self {
            Self::Gcm => 0x25,
            Self::Gnm => 0x2b,
        }
    }
}

/// File header plus descriptor table header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhyreHeader {
    /// Byte order chosen by the primary magic.
    pub endian: Endian,
    /// Absolute offset of the descriptor table.
    pub magic_offset: i32,
    /// Descriptor table size in bytes.
    pub descriptor_table_size: i32,
    /// Target platform.
    pub platform: Platform,
    /// Number of root records.
    pub root_count: i32,
    /// Number of subrecords.
    pub sub_count: i32,
    /// String table size in bytes.
    pub string_table_size: i32,
}

impl PhyreHeader {
    fn string_table(&self) -> i64 {
        self.instance_headers() - self.string_table_size as i64
    }

    fn instance_headers(&self) -> i64 {
        self.magic_offset as i64 + self.descriptor_table_size as i64
    }
}

/// A named class in the descriptor table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RootRecord {
    pub name: String,
    /// Index of the first owned subrecord (0 when `count` is 0).
    pub first: i32,
    /// Index of the last owned subrecord (0 when `count` is 0).
    pub last: i32,
    /// Number of owned subrecords.
    pub count: i32,
}

impl RootRecord {
    /// Indices of the owned subrecords.
    pub fn subrecords(&self) -> Range<usize> {
        if self.count <= 0 {
            0..0
        } else {
            self.first as usize..self.last as usize + 1
        }
    }
}

/// A named field in the descriptor table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubRecord {
    pub name: String,
    pub offset: i32,
    pub size: i32,
}

/// Values read along the way that decoding does not use.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Diagnostics {
    /// Name of the imported source asset (`PString`).
    pub import_name: Option<String>,
    /// Texture-state text of GNM files (`PTexture2DGNM::m_texState`).
    pub tex_state: Option<String>,
}

/// Decoded Phyre texture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Phyre {
    pub header: PhyreHeader,
    /// Root records in table order.
    pub roots: Vec<RootRecord>,
    /// Subrecords in table order.
    pub subs: Vec<SubRecord>,
    /// GCM swizzle flag as found in the texture object.
    pub swizzled: bool,
    /// Raw memory-type string the pixel format was taken from.
    pub memory_type: String,
    pub diagnostics: Diagnostics,
    /// The single image of the file.
    pub image: ImageRequest,
}

impl Decode for Phyre {
    fn decode<R: Read + Seek>(r: &mut ByteCursor<R>) -> Result<Self> {
        let header = read_header(r)?;
        let (roots, subs) = resolve_records(r, &header)?;
        let state = walk_instance_fields(r, &header, &roots, &subs)?;
        let swizzled = locate_swizzle(r, &header, &state)?;
        let data = locate_pixel_data(r, &header, &state)?;

        let DecodeState {
            width,
            height,
            memory_type,
            diagnostics,
            ..
        } = state;
        let memory_type = memory_type.unwrap_or_default();
        let format = PixelFormat::from_memory_type(&memory_type)
            .ok_or_else(|| Error::UnknownPixelFormat(memory_type.clone()))?;

        let image = ImageRequest {
            width: u32::try_from(width).map_err(|_| Error::InvalidRange)?,
            height: u32::try_from(height).map_err(|_| Error::InvalidRange)?,
            format,
            endian: header.endian,
            swizzled: swizzled && format == PixelFormat::Argb8,
            orientation: if swizzled {
                Orientation::TopDown
            } else {
                Orientation::BottomUp
            },
            data,
        };
        debug!(
            width = image.width,
            height = image.height,
            %format,
            swizzled,
            "decoded Phyre texture"
        );

        Ok(Self {
            header,
            roots,
            subs,
            swizzled,
            memory_type,
            diagnostics,
            image,
        })
    }
}

impl ImageFormat for Phyre {
    fn image_count(&self) -> usize {
        1
    }

    fn get_image(&self, index: usize) -> Option<&ImageRequest> {
        (index == 0).then_some(&self.image)
    }
}

/// Whether a file name looks like a Phyre model or shader rather than a
/// texture (`*.dae.phyre`, `*.fx#...`, `*.fx.phyre`).
pub fn is_non_texture_path(name: &str) -> bool {
    let name = name.to_ascii_lowercase();
    [".dae.", ".fx#", ".fx."].iter().any(|p| name.contains(p))
}

fn read_header<R: Read + Seek>(r: &mut ByteCursor<R>) -> Result<PhyreHeader> {
    r.seek(0)?;
    let magic = r.read_array::<4>()?;
    let endian = if magic == *MAGIC_BE {
        Endian::Big
    } else if magic == *MAGIC_LE {
        Endian::Little
    } else {
        return Err(Error::BadMagic);
    };
    r.set_endian(endian);

    let magic_offset = r.read_i32()?;
    let descriptor_table_size = r.read_i32()?;
    let platform_code = r.read_u32()?;
    let platform = Platform::from_code(platform_code)
        .ok_or(Error::UnsupportedPlatform(platform_code))?;

    r.seek(to_offset(magic_offset.into())?)?;
    let secondary = r.read_u32()?;
    if secondary != SECONDARY_MAGIC {
        return Err(Error::BadSecondaryMagic(secondary));
    }
    if r.read_i32()? != descriptor_table_size {
        return Err(Error::StructuralMismatch(
            "Phyre descriptor table size mismatch",
        ));
    }
    let padding_words = r.read_i32()? as i64 + 2;
    let root_count = r.read_i32()?;
    let sub_count = r.read_i32()?;
    let string_table_size = r.read_i32()?;
    r.skip(to_offset(padding_words * 4)?)?;

    debug!(
        ?endian,
        ?platform,
        root_count,
        sub_count,
        "parsed Phyre header"
    );
    Ok(PhyreHeader {
        endian,
        magic_offset,
        descriptor_table_size,
        platform,
        root_count,
        sub_count,
        string_table_size,
    })
}

fn read_name<R: Read + Seek>(
    r: &mut ByteCursor<R>,
    header: &PhyreHeader,
    offset: i32,
) -> Result<String> {
    let at = to_offset(header.string_table() + offset as i64)?;
    r.peek_at(at, |r| r.read_cstring())
}

fn resolve_records<R: Read + Seek>(
    r: &mut ByteCursor<R>,
    header: &PhyreHeader,
) -> Result<(Vec<RootRecord>, Vec<SubRecord>)> {
    let root_count = to_len(header.root_count.into())?;
    let sub_count = to_len(header.sub_count.into())?;
    let table_len = root_count as u64 * ROOT_RECORD_SIZE + sub_count as u64 * SUB_RECORD_SIZE;
    if table_len > r.len() {
        return Err(Error::Truncated);
    }

    let mut roots = Vec::with_capacity(root_count);
    let mut next_sub: i32 = 0;
    for _ in 0..root_count {
        r.skip(8)?;
        let name_offset = r.read_i32()?;
        let count = r.read_i32()?;
        r.skip(0x14)?;

        let (first, last) = if count > 0 {
            let first = next_sub;
            next_sub = next_sub.checked_add(count).ok_or(Error::InvalidRange)?;
            (first, next_sub - 1)
        } else {
            (0, 0)
        };

        let name = read_name(r, header, name_offset)?;
        if name == "PEffect" {
            return Err(Error::NotATexture);
        }
        roots.push(RootRecord {
            name,
            first,
            last,
            count,
        });
    }

    let mut subs = Vec::with_capacity(sub_count);
    for _ in 0..sub_count {
        let name_offset = r.read_i32()?;
        r.skip(4)?;
        let offset = r.read_i32()?;
        let size = r.read_i32()?;
        r.skip(8)?;
        let name = read_name(r, header, name_offset)?;
        subs.push(SubRecord { name, offset, size });
    }

    Ok((roots, subs))
}

/// Running state of the field walk. Fields must be visited in table order:
/// later positions are derived from values read earlier.
#[derive(Debug, Default)]
struct DecodeState {
    data_size: i32,
    instance_count: usize,
    sizes: Vec<i32>,
    objects_sizes: Vec<i32>,
    arrays_sizes: Vec<i32>,
    total_size: i64,
    manual_offset: i64,
    width: i32,
    height: i32,
    memory_type: Option<String>,
    data_offset: Option<i64>,
    diagnostics: Diagnostics,
}

fn first_of(values: &[i32]) -> Result<i64> {
    values
        .first()
        .map(|&v| v as i64)
        .ok_or(Error::StructuralMismatch("Phyre instance list is empty"))
}

fn read_i32_at<R: Read + Seek>(r: &mut ByteCursor<R>, offset: i64) -> Result<i32> {
    r.seek(to_offset(offset)?)?;
    r.read_i32()
}

impl DecodeState {
    fn instance_region_end(&self, header: &PhyreHeader) -> i64 {
        header.instance_headers() + INSTANCE_HEADER_STRIDE * self.instance_count as i64
    }

    /// Fields of the leading root records, stored at absolute offsets.
    fn read_global<R: Read + Seek>(
        &mut self,
        r: &mut ByteCursor<R>,
        sub: &SubRecord,
    ) -> Result<()> {
        let value = read_i32_at(r, sub.offset.into())?;
        match sub.name.as_str() {
            "m_vramBufferSize" | "m_maxTextureBufferSize" | "m_sharedVideoMemoryBufferSize" => {
                trace!(field = %sub.name, value, "pixel data size");
                self.data_size = value;
            }
            "m_instanceListCount" => {
                let count = to_len(value.into())?;
                if count as u64 * INSTANCE_HEADER_STRIDE as u64 > r.len() {
                    return Err(Error::StructuralMismatch(
                        "Phyre instance list larger than file",
                    ));
                }
                trace!(count, "instance list");
                self.instance_count = count;
                self.sizes = vec![0; count];
                self.objects_sizes = vec![0; count];
                self.arrays_sizes = vec![0; count];
            }
            _ => {}
        }
        Ok(())
    }

    fn read_instance_headers<R: Read + Seek>(
        &mut self,
        r: &mut ByteCursor<R>,
        header: &PhyreHeader,
        sub: &SubRecord,
    ) -> Result<()> {
        for k in 0..self.instance_count {
            let at =
                header.instance_headers() + k as i64 * INSTANCE_HEADER_STRIDE + sub.offset as i64;
            let value = read_i32_at(r, at)?;
            match sub.name.as_str() {
                "m_size" => {
                    self.sizes[k] = value;
                    self.total_size += value as i64;
                }
                "m_objectsSize" => self.objects_sizes[k] = value,
                "m_arraysSize" => self.arrays_sizes[k] = value,
                _ => {}
            }
        }
        Ok(())
    }

    fn read_import_name<R: Read + Seek>(
        &mut self,
        r: &mut ByteCursor<R>,
        header: &PhyreHeader,
    ) -> Result<()> {
        let at = self.instance_region_end(header) + first_of(&self.objects_sizes)?;
        let len = to_len(first_of(&self.arrays_sizes)?)?;
        r.seek(to_offset(at)?)?;
        let name = r.read_fixed_ascii(len)?;
        debug!(import_name = %name, "Phyre import name");
        self.diagnostics.import_name = Some(name);
        Ok(())
    }

    fn read_gnm_state<R: Read + Seek>(
        &mut self,
        r: &mut ByteCursor<R>,
        header: &PhyreHeader,
        sub: &SubRecord,
    ) -> Result<()> {
        let at = self.instance_region_end(header) + first_of(&self.sizes)? + sub.offset as i64;
        r.seek(to_offset(at)?)?;
        r.skip(to_offset(sub.size.into())?)?;
        if sub.name == "m_texState" {
            r.seek(to_offset(at + TEX_STATE_TEXT_OFFSET)?)?;
            let state = r.read_fixed_ascii(TEX_STATE_TEXT_LEN)?;
            trace!(tex_state = %state, "GNM texture state");
            self.diagnostics.tex_state = Some(state);
        }
        Ok(())
    }

    fn read_dimension<R: Read + Seek>(
        &mut self,
        r: &mut ByteCursor<R>,
        header: &PhyreHeader,
        sub: &SubRecord,
    ) -> Result<()> {
        let at = self.instance_region_end(header) + first_of(&self.sizes)? + sub.offset as i64;
        let value = read_i32_at(r, at)?;
        match sub.name.as_str() {
            "m_width" => self.width = value,
            "m_height" => self.height = value,
            _ => {}
        }
        Ok(())
    }

    fn read_common_field<R: Read + Seek>(
        &mut self,
        r: &mut ByteCursor<R>,
        header: &PhyreHeader,
        sub: &SubRecord,
    ) -> Result<()> {
        let base = self.instance_region_end(header) + self.total_size + self.manual_offset;
        match sub.name.as_str() {
            "m_format" => {
                r.seek(to_offset(base)?)?;
                let kind = r.read_cstring_bytes()?;
                self.manual_offset += kind.len() as i64 + 1;
                if kind != b"PTexture2D" {
                    return Err(Error::UnsupportedTextureKind(
                        String::from_utf8_lossy(&kind).into_owned(),
                    ));
                }
            }
            "m_memoryType" => {
                r.seek(to_offset(base)?)?;
                let tag = r.read_cstring()?;
                self.manual_offset += tag.len() as i64 + 1;
                let data_offset = self.instance_region_end(header)
                    + self.total_size
                    + self.manual_offset
                    + header.platform.trailing_metadata();
                trace!(memory_type = %tag, data_offset, "pixel data located");
                self.memory_type = Some(tag);
                self.data_offset = Some(data_offset);
            }
            _ => self.manual_offset += sub.size as i64,
        }
        Ok(())
    }
}

fn walk_instance_fields<R: Read + Seek>(
    r: &mut ByteCursor<R>,
    header: &PhyreHeader,
    roots: &[RootRecord],
    subs: &[SubRecord],
) -> Result<DecodeState> {
    let mut state = DecodeState::default();
    for (index, root) in roots.iter().enumerate() {
        let fields = subs
            .get(root.subrecords())
            .ok_or(Error::StructuralMismatch(
                "Phyre subrecord range exceeds table",
            ))?;
        for sub in fields {
            if index < ABSOLUTE_ROOTS {
                state.read_global(r, sub)?;
                continue;
            }
            match root.name.as_str() {
                "PInstanceListHeader" => state.read_instance_headers(r, header, sub)?,
                "PString" => state.read_import_name(r, header)?,
                "PTexture2DGNM" => state.read_gnm_state(r, header, sub)?,
                "PTexture2DBase" => state.read_dimension(r, header, sub)?,
                "PTextureCommonBase" => state.read_common_field(r, header, sub)?,
                _ => {}
            }
        }
    }
    Ok(state)
}

fn locate_swizzle<R: Read + Seek>(
    r: &mut ByteCursor<R>,
    header: &PhyreHeader,
    state: &DecodeState,
) -> Result<bool> {
    if header.platform != Platform::Gcm {
        return Ok(false);
    }
    let at = state.instance_region_end(header) + first_of(&state.sizes)? + SWIZZLE_FLAG_OFFSET;
    Ok(read_i32_at(r, at)? == SWIZZLE_FLAG)
}

fn locate_pixel_data<R: Read + Seek>(
    r: &mut ByteCursor<R>,
    header: &PhyreHeader,
    state: &DecodeState,
) -> Result<Vec<u8>> {
    let data_offset = state
        .data_offset
        .ok_or(Error::StructuralMismatch(
            "Phyre texture has no memory type field",
        ))?;
    r.seek(to_offset(data_offset)?)?;
    let data = r.read_bytes(to_len(state.data_size.into())?)?;
    if header.platform == Platform::Gnm {
        return Err(Error::UnsupportedPixelContainer);
    }
    Ok(data)
}
