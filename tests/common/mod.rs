//! Synthetic file builders shared by the integration tests.

#![allow(dead_code)]

use std::io::Cursor;

use assetkit::ByteCursor;

pub const GCM: u32 = 0x4743_4d00;
pub const GNM: u32 = 0x474e_4d02;

pub fn cursor(bytes: Vec<u8>) -> ByteCursor<Cursor<Vec<u8>>> {
    ByteCursor::new(Cursor::new(bytes)).expect("in-memory cursor")
}

/// Writes integers at fixed positions in a chosen byte order.
struct Writer {
    buf: Vec<u8>,
    big_endian: bool,
}

impl Writer {
    fn put(&mut self, at: usize, bytes: &[u8]) {
        if self.buf.len() < at + bytes.len() {
            self.buf.resize(at + bytes.len(), 0);
        }
        self.buf[at..at + bytes.len()].copy_from_slice(bytes);
    }

    fn i32(&mut self, at: usize, v: i32) {
        let b = if self.big_endian {
            v.to_be_bytes()
        } else {
            v.to_le_bytes()
        };
        self.put(at, &b);
    }

    fn u32(&mut self, at: usize, v: u32) {
        let b = if self.big_endian {
            v.to_be_bytes()
        } else {
            v.to_le_bytes()
        };
        self.put(at, &b);
    }
}

type Field = (&'static str, i32, i32);
type Class = (&'static str, Vec<Field>);

/// Builds a single-texture Phyre file.
///
/// Layout produced:
/// * descriptor table at 0x10, two instances (object sizes 0x20 and 0x40);
/// * instance count and pixel-data size stored at the start of the object
///   region, referenced by absolute offsets from the first root record;
/// * import name at object offset 8;
/// * width, height and swizzle flag inside the second instance's block;
/// * `m_format`, a 4-byte field and `m_memoryType` packed after all
///   objects, followed by the trailing metadata and the pixel data.
#[derive(Debug, Clone)]
pub struct PhyreBuilder {
    pub big_endian: bool,
    pub platform: u32,
    pub secondary_magic: u32,
    pub texture_kind: &'static str,
    pub memory_type: &'static str,
    /// Whether `PTextureCommonBase` declares `m_memoryType` at all.
    pub memory_type_field: bool,
    pub width: i32,
    pub height: i32,
    pub swizzle_flag: i32,
    pub import_name: &'static str,
    pub extra_class: Option<&'static str>,
    pub data: Vec<u8>,
}

impl Default for PhyreBuilder {
    fn default() -> Self {
        Self {
            big_endian: true,
            platform: GCM,
            secondary_magic: 0x0102_0304,
            texture_kind: "PTexture2D",
            memory_type: "DXT5",
            memory_type_field: true,
            width: 16,
            height: 16,
            swizzle_flag: 0,
            import_name: "tex.dds",
            extra_class: None,
            data: (0..256).map(|i| i as u8).collect(),
        }
    }
}

const MAGIC_OFFSET: usize = 0x10;
const INSTANCE_STRIDE: usize = 0x24;
const INSTANCE_SIZES: [usize; 2] = [0x20, 0x40];
const OBJECTS_SIZE: i32 = 8;
const ARRAYS_SIZE: i32 = 8;
const TEX_STATE_OFFSET: i32 = 0x14;

impl PhyreBuilder {
    fn classes(&self, region_end: i32) -> Vec<Class> {
        let mut classes: Vec<Class> = vec![
            (
                "PCluster",
                vec![
                    ("m_instanceListCount", region_end, 4),
                    ("m_maxTextureBufferSize", region_end + 4, 4),
                ],
            ),
            ("PNode", vec![]),
            ("PAssetReference", vec![]),
            ("PSharray", vec![]),
            ("PWorldMatrix", vec![]),
            ("PClassDescriptor", vec![]),
            (
                "PInstanceListHeader",
                vec![("m_size", 0, 4), ("m_objectsSize", 4, 4), ("m_arraysSize", 8, 4)],
            ),
            ("PString", vec![("m_buffer", 0, 4)]),
            ("PTexture2DBase", vec![("m_width", 4, 4), ("m_height", 8, 4)]),
        ];
        if self.platform == GNM {
            classes.push(("PTexture2DGNM", vec![("m_texState", TEX_STATE_OFFSET, 4)]));
        }
        let mut common = vec![("m_format", 0, 4), ("m_mipmapCount", 0, 4)];
        if self.memory_type_field {
            common.push(("m_memoryType", 0, 4));
        }
        classes.push(("PTextureCommonBase", common));
        if let Some(name) = self.extra_class {
            classes.push((name, vec![]));
        }
        classes
    }

    /// Absolute offset of the pixel data in the built file.
    pub fn data_offset(&self) -> usize {
        let strings = self.texture_kind.len() + 1 + 4 + self.memory_type.len() + 1;
        let padding = if self.platform == GNM { 0x2b } else { 0x25 };
        self.region_end() + INSTANCE_SIZES.iter().sum::<usize>() + strings + padding
    }

    fn string_table(&self) -> (Vec<u8>, Vec<(&'static str, i32)>) {
        let mut table = Vec::new();
        let mut offsets = Vec::new();
        for (class, fields) in self.classes(0) {
            for name in std::iter::once(class).chain(fields.iter().map(|f| f.0)) {
                if !offsets.iter().any(|&(n, _)| n == name) {
                    offsets.push((name, table.len() as i32));
                    table.extend_from_slice(name.as_bytes());
                    table.push(0);
                }
            }
        }
        (table, offsets)
    }

    fn table_size(&self) -> usize {
        let classes = self.classes(0);
        let fields: usize = classes.iter().map(|c| c.1.len()).sum();
        0x20 + classes.len() * 0x24 + fields * 0x18 + self.string_table().0.len()
    }

    fn region_end(&self) -> usize {
        MAGIC_OFFSET + self.table_size() + INSTANCE_STRIDE * INSTANCE_SIZES.len()
    }

    pub fn build(&self) -> Vec<u8> {
        let mut w = Writer {
            buf: Vec::new(),
            big_endian: self.big_endian,
        };
        let (strings, name_offsets) = self.string_table();
        let name_of = |name: &str| {
            name_offsets
                .iter()
                .find(|&&(n, _)| n == name)
                .map(|&(_, o)| o)
                .expect("name in table")
        };
        let table_size = self.table_size();
        let region_end = self.region_end();
        let classes = self.classes(region_end as i32);
        let field_count: usize = classes.iter().map(|c| c.1.len()).sum();

        // File header.
        w.put(0, if self.big_endian { b"PHYR" } else { b"RYHP" });
        w.i32(4, MAGIC_OFFSET as i32);
        w.i32(8, table_size as i32);
        w.u32(12, self.platform);

        // Descriptor table header; padding word count 0 means 8 bytes.
        let mo = MAGIC_OFFSET;
        w.u32(mo, self.secondary_magic);
        w.i32(mo + 4, table_size as i32);
        w.i32(mo + 8, 0);
        w.i32(mo + 12, classes.len() as i32);
        w.i32(mo + 16, field_count as i32);
        w.i32(mo + 20, strings.len() as i32);

        let mut pos = mo + 0x20;
        for (class, fields) in &classes {
            w.i32(pos + 8, name_of(*class));
            w.i32(pos + 12, fields.len() as i32);
            pos += 0x24;
        }
        for (_, fields) in &classes {
            for &(name, offset, size) in fields {
                w.i32(pos, name_of(name));
                w.i32(pos + 8, offset);
                w.i32(pos + 12, size);
                pos += 0x18;
            }
        }
        w.put(pos, &strings);
        assert_eq!(pos + strings.len(), mo + table_size);

        // Instance list headers.
        let headers = mo + table_size;
        for (k, size) in INSTANCE_SIZES.iter().enumerate() {
            let at = headers + k * INSTANCE_STRIDE;
            w.i32(at, *size as i32);
            w.i32(at + 4, if k == 0 { OBJECTS_SIZE } else { 0 });
            w.i32(at + 8, if k == 0 { ARRAYS_SIZE } else { 0 });
        }

        // Object region.
        let re = region_end;
        w.i32(re, INSTANCE_SIZES.len() as i32);
        w.i32(re + 4, self.data.len() as i32);
        let mut import = self.import_name.as_bytes().to_vec();
        import.resize(ARRAYS_SIZE as usize, 0);
        w.put(re + OBJECTS_SIZE as usize, &import);

        let texture = re + INSTANCE_SIZES[0];
        w.i32(texture + 4, self.width);
        w.i32(texture + 8, self.height);
        w.i32(texture + 0x10, self.swizzle_flag);
        if self.platform == GNM {
            w.put(texture + TEX_STATE_OFFSET as usize + 14, b"GNM texstate!");
        }

        let mut at = re + INSTANCE_SIZES.iter().sum::<usize>();
        w.put(at, self.texture_kind.as_bytes());
        at += self.texture_kind.len() + 1;
        w.put(at, &[0; 5]);
        at += 4;
        w.put(at, self.memory_type.as_bytes());
        at += self.memory_type.len() + 1;

        let data_offset = self.data_offset();
        assert_eq!(data_offset, at + if self.platform == GNM { 0x2b } else { 0x25 });
        w.put(data_offset, &self.data);
        w.buf
    }
}

/// GPDA archive with payloads stored after a name block.
pub fn gpda(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let table_end = 0x18 + entries.len() * 0x20;
    let mut names = Vec::new();
    let mut data = Vec::new();
    let mut table = Vec::new();
    let names_len: usize = entries.iter().map(|(n, _)| 4 + n.len()).sum();
    for (name, payload) in entries {
        let name_at = table_end + names.len();
        let data_at = table_end + names_len + data.len();
        table.extend_from_slice(&(data_at as i64).to_le_bytes());
        table.extend_from_slice(&0i64.to_le_bytes());
        table.extend_from_slice(&(payload.len() as i64).to_le_bytes());
        table.extend_from_slice(&(name_at as i64).to_le_bytes());
        names.extend_from_slice(&(name.len() as i32).to_le_bytes());
        names.extend_from_slice(name.as_bytes());
        data.extend_from_slice(payload);
    }
    let mut out = b"GPDA64BY".to_vec();
    out.extend_from_slice(&((table_end + names_len + data.len()) as i64).to_le_bytes());
    out.extend_from_slice(&0i32.to_le_bytes());
    out.extend_from_slice(&(entries.len() as i32).to_le_bytes());
    out.extend(table);
    out.extend(names);
    out.extend(data);
    out
}

/// Version-2 MPK archive with uncompressed payloads.
pub fn mpk(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut out = b"MPK\0".to_vec();
    out.extend_from_slice(&0u16.to_le_bytes());
    out.extend_from_slice(&2i16.to_le_bytes());
    out.extend_from_slice(&(entries.len() as i32).to_le_bytes());
    out.resize(0x40, 0);
    let mut data_at = 0x40 + entries.len() as u64 * assetkit::formats::mpk::record_size(2);
    for (i, (path, payload)) in entries.iter().enumerate() {
        out.extend_from_slice(&0u32.to_le_bytes());
        out.extend_from_slice(&(i as u32).to_le_bytes());
        out.extend_from_slice(&data_at.to_le_bytes());
        out.extend_from_slice(&(payload.len() as u64).to_le_bytes());
        out.extend_from_slice(&(payload.len() as u64).to_le_bytes());
        let mut field = path.as_bytes().to_vec();
        field.resize(0xE0, 0);
        out.extend(field);
        data_at += payload.len() as u64;
    }
    for (_, payload) in entries {
        out.extend_from_slice(payload);
    }
    out
}

/// PAC bundle of `(width, height, format)` entries, each with exactly
/// `width × height × 2` pixel bytes.
pub fn pac(entries: &[(i32, i32, i32)]) -> Vec<u8> {
    let bodies: Vec<Vec<u8>> = entries
        .iter()
        .map(|&(w, h, f)| {
            let mut body = Vec::new();
            body.extend_from_slice(&w.to_le_bytes());
            body.extend_from_slice(&h.to_le_bytes());
            body.extend_from_slice(&f.to_le_bytes());
            body.resize(12 + (w.max(0) * h.max(0) * 2) as usize, 0xAA);
            body
        })
        .collect();
    let mut out = (entries.len() as i32).to_le_bytes().to_vec();
    let mut at = 4 + entries.len() * 8;
    for body in &bodies {
        out.extend_from_slice(&(at as i32).to_le_bytes());
        out.extend_from_slice(&(body.len() as i32).to_le_bytes());
        at += body.len();
    }
    for body in bodies {
        out.extend(body);
    }
    out
}
