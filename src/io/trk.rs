//! TrackVis `.trk` (version 2) header and record codec.
//!
//! Layout of the 1000-byte header, offsets in bytes:
//!
//! ```text
//!   0  id_string            6 x u8   "TRACK\0"
//!   6  dim                  3 x i16
//!  12  voxel_size           3 x f32
//!  24  origin               3 x f32
//!  36  n_scalars            i16
//!  38  scalar_name         10 x 20 x u8
//! 238  n_properties         i16
//! 240  property_name       10 x 20 x u8
//! 440  vox_to_ras           4 x 4 x f32
//! 504  reserved           444 x u8
//! 948  voxel_order          4 x u8
//! 952  pad2                 4 x u8
//! 956  image_orientation    6 x f32
//! 980  pad1                 2 x u8
//! 982  invert_x/y/z, swap_xy/yz/zx
//! 988  n_count              i32
//! 992  version              i32
//! 996  hdr_size             i32
//! ```
//!
//! Each record is an `i32` point count followed by `n_points` rows of
//! `3 + n_scalars` `f32` values and then `n_properties` `f32` values.
//! Files are written little-endian; either byte order is accepted on read.

use std::io::{self, Read, Write};

use super::IoError;

pub(crate) const HEADER_SIZE: usize = 1000;
const MAGIC: &[u8; 6] = b"TRACK\0";
const VERSION: i32 = 2;
const HDR_SIZE_FIELD: i32 = 1000;
const MAX_NAMES: usize = 10;
const NAME_LEN: usize = 20;

const OFFSET_DIM: usize = 6;
const OFFSET_VOXEL_SIZE: usize = 12;
const OFFSET_ORIGIN: usize = 24;
const OFFSET_N_SCALARS: usize = 36;
const OFFSET_SCALAR_NAME: usize = 38;
const OFFSET_N_PROPERTIES: usize = 238;
const OFFSET_PROPERTY_NAME: usize = 240;
const OFFSET_VOX_TO_RAS: usize = 440;
const OFFSET_VOXEL_ORDER: usize = 948;
const OFFSET_IMAGE_ORIENTATION: usize = 956;
const OFFSET_N_COUNT: usize = 988;
const OFFSET_VERSION: usize = 992;
const OFFSET_HDR_SIZE: usize = 996;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ByteOrder {
    Little,
    Big,
}

/// A named block of `columns` values, per point or per streamline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Field {
    pub name: String,
    pub columns: usize,
}

/// Decoded header fields this crate uses.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct TrkHeader {
    pub dimensions: [i16; 3],
    pub voxel_sizes: [f32; 3],
    pub origin: [f32; 3],
    pub scalars: Vec<Field>,
    pub properties: Vec<Field>,
    pub vox_to_ras: [[f32; 4]; 4],
    pub voxel_order: [u8; 4],
    pub image_orientation_patient: [f32; 6],
    pub n_count: i32,
    pub byte_order: ByteOrder,
}

impl Default for TrkHeader {
    fn default() -> Self {
        let mut vox_to_ras = [[0.0; 4]; 4];
        for (i, row) in vox_to_ras.iter_mut().enumerate() {
            row[i] = 1.0;
        }
        Self {
            dimensions: [1, 1, 1],
            voxel_sizes: [1.0, 1.0, 1.0],
            origin: [0.0; 3],
            scalars: Vec::new(),
            properties: Vec::new(),
            vox_to_ras,
            voxel_order: *b"RAS\0",
            image_orientation_patient: [0.0; 6],
            n_count: 0,
            byte_order: ByteOrder::Little,
        }
    }
}

impl TrkHeader {
    pub fn scalar_columns(&self) -> usize {
        self.scalars.iter().map(|f| f.columns).sum()
    }

    pub fn property_columns(&self) -> usize {
        self.properties.iter().map(|f| f.columns).sum()
    }

    pub fn decode(bytes: &[u8; HEADER_SIZE]) -> Result<Self, IoError> {
        if &bytes[..MAGIC.len()] != MAGIC {
            return Err(IoError::InvalidHeader("missing TRACK magic".to_owned()));
        }

        let byte_order = detect_byte_order(bytes)?;
        let cursor = Fields { bytes, byte_order };

        let version = cursor.i32_at(OFFSET_VERSION);
        if version != 1 && version != VERSION {
            log::warn!("unexpected trk version {version}, reading as version 2");
        }

        let n_scalars = non_negative(cursor.i16_at(OFFSET_N_SCALARS), "n_scalars")?;
        let n_properties = non_negative(cursor.i16_at(OFFSET_N_PROPERTIES), "n_properties")?;

        let mut vox_to_ras = [[0.0; 4]; 4];
        for (row, values) in vox_to_ras.iter_mut().enumerate() {
            for (col, value) in values.iter_mut().enumerate() {
                *value = cursor.f32_at(OFFSET_VOX_TO_RAS + 4 * (row * 4 + col));
            }
        }

        let mut voxel_order = [0u8; 4];
        voxel_order.copy_from_slice(&bytes[OFFSET_VOXEL_ORDER..OFFSET_VOXEL_ORDER + 4]);

        Ok(Self {
            dimensions: [0, 1, 2].map(|i| cursor.i16_at(OFFSET_DIM + 2 * i)),
            voxel_sizes: [0, 1, 2].map(|i| cursor.f32_at(OFFSET_VOXEL_SIZE + 4 * i)),
            origin: [0, 1, 2].map(|i| cursor.f32_at(OFFSET_ORIGIN + 4 * i)),
            scalars: decode_names(bytes, OFFSET_SCALAR_NAME, n_scalars, "scalars"),
            properties: decode_names(bytes, OFFSET_PROPERTY_NAME, n_properties, "properties"),
            vox_to_ras,
            voxel_order,
            image_orientation_patient: [0, 1, 2, 3, 4, 5]
                .map(|i| cursor.f32_at(OFFSET_IMAGE_ORIENTATION + 4 * i)),
            n_count: cursor.i32_at(OFFSET_N_COUNT),
            byte_order,
        })
    }

    /// Little-endian header bytes.
    pub fn encode(&self) -> Result<[u8; HEADER_SIZE], IoError> {
        let mut out = [0u8; HEADER_SIZE];
        out[..MAGIC.len()].copy_from_slice(MAGIC);

        for (i, dim) in self.dimensions.iter().enumerate() {
            put(&mut out, OFFSET_DIM + 2 * i, &dim.to_le_bytes());
        }
        for (i, size) in self.voxel_sizes.iter().enumerate() {
            put(&mut out, OFFSET_VOXEL_SIZE + 4 * i, &size.to_le_bytes());
        }
        for (i, origin) in self.origin.iter().enumerate() {
            put(&mut out, OFFSET_ORIGIN + 4 * i, &origin.to_le_bytes());
        }

        let n_scalars = column_count(self.scalar_columns(), "scalar")?;
        put(&mut out, OFFSET_N_SCALARS, &n_scalars.to_le_bytes());
        encode_names(&mut out, OFFSET_SCALAR_NAME, &self.scalars, "scalar")?;

        let n_properties = column_count(self.property_columns(), "property")?;
        put(&mut out, OFFSET_N_PROPERTIES, &n_properties.to_le_bytes());
        encode_names(&mut out, OFFSET_PROPERTY_NAME, &self.properties, "property")?;

        for (row, values) in self.vox_to_ras.iter().enumerate() {
            for (col, value) in values.iter().enumerate() {
                put(&mut out, OFFSET_VOX_TO_RAS + 4 * (row * 4 + col), &value.to_le_bytes());
            }
        }
        put(&mut out, OFFSET_VOXEL_ORDER, &self.voxel_order);
        for (i, value) in self.image_orientation_patient.iter().enumerate() {
            put(&mut out, OFFSET_IMAGE_ORIENTATION + 4 * i, &value.to_le_bytes());
        }

        put(&mut out, OFFSET_N_COUNT, &self.n_count.to_le_bytes());
        put(&mut out, OFFSET_VERSION, &VERSION.to_le_bytes());
        put(&mut out, OFFSET_HDR_SIZE, &HDR_SIZE_FIELD.to_le_bytes());
        Ok(out)
    }
}

fn put(out: &mut [u8; HEADER_SIZE], offset: usize, bytes: &[u8]) {
    out[offset..offset + bytes.len()].copy_from_slice(bytes);
}

fn detect_byte_order(bytes: &[u8; HEADER_SIZE]) -> Result<ByteOrder, IoError> {
    let mut raw = [0u8; 4];
    raw.copy_from_slice(&bytes[OFFSET_HDR_SIZE..OFFSET_HDR_SIZE + 4]);
    if i32::from_le_bytes(raw) == HDR_SIZE_FIELD {
        Ok(ByteOrder::Little)
    } else if i32::from_be_bytes(raw) == HDR_SIZE_FIELD {
        Ok(ByteOrder::Big)
    } else {
        Err(IoError::InvalidHeader(format!(
            "hdr_size is {}, expected {HEADER_SIZE}",
            i32::from_le_bytes(raw)
        )))
    }
}

fn non_negative(value: i16, field: &str) -> Result<usize, IoError> {
    usize::try_from(value).map_err(|_| IoError::InvalidHeader(format!("{field} is {value}")))
}

fn column_count(columns: usize, kind: &str) -> Result<i16, IoError> {
    i16::try_from(columns)
        .map_err(|_| IoError::HeaderOverflow(format!("{columns} {kind} columns")))
}

/// Fixed-offset reads honoring the detected byte order.
struct Fields<'a> {
    bytes: &'a [u8; HEADER_SIZE],
    byte_order: ByteOrder,
}

impl Fields<'_> {
    fn i16_at(&self, offset: usize) -> i16 {
        let raw = [self.bytes[offset], self.bytes[offset + 1]];
        match self.byte_order {
            ByteOrder::Little => i16::from_le_bytes(raw),
            ByteOrder::Big => i16::from_be_bytes(raw),
        }
    }

    fn i32_at(&self, offset: usize) -> i32 {
        let mut raw = [0u8; 4];
        raw.copy_from_slice(&self.bytes[offset..offset + 4]);
        match self.byte_order {
            ByteOrder::Little => i32::from_le_bytes(raw),
            ByteOrder::Big => i32::from_be_bytes(raw),
        }
    }

    fn f32_at(&self, offset: usize) -> f32 {
        let mut raw = [0u8; 4];
        raw.copy_from_slice(&self.bytes[offset..offset + 4]);
        match self.byte_order {
            ByteOrder::Little => f32::from_le_bytes(raw),
            ByteOrder::Big => f32::from_be_bytes(raw),
        }
    }
}

// ============================================================================
// Names
// ============================================================================

/// Reads up to ten name slots. A slot `name\0<count>` names `count`
/// columns; columns left unnamed are grouped under `fallback`.
fn decode_names(
    bytes: &[u8; HEADER_SIZE],
    offset: usize,
    total_columns: usize,
    fallback: &str,
) -> Vec<Field> {
    let mut fields = Vec::new();
    let mut named = 0;

    for slot in 0..MAX_NAMES {
        if named >= total_columns {
            break;
        }
        let start = offset + slot * NAME_LEN;
        let raw = &bytes[start..start + NAME_LEN];

        let name_end = raw.iter().position(|b| *b == 0).unwrap_or(NAME_LEN);
        if name_end == 0 {
            break;
        }
        let name = String::from_utf8_lossy(&raw[..name_end]).into_owned();

        let columns = raw
            .get(name_end + 1..)
            .map(|tail| {
                let digits: String = tail
                    .iter()
                    .take_while(|b| b.is_ascii_digit())
                    .map(|b| char::from(*b))
                    .collect();
                digits.parse::<usize>().unwrap_or(1)
            })
            .unwrap_or(1)
            .clamp(1, total_columns - named);

        named += columns;
        fields.push(Field { name, columns });
    }

    if named < total_columns {
        fields.push(Field {
            name: fallback.to_owned(),
            columns: total_columns - named,
        });
    }
    fields
}

fn encode_names(
    out: &mut [u8; HEADER_SIZE],
    offset: usize,
    fields: &[Field],
    kind: &str,
) -> Result<(), IoError> {
    if fields.len() > MAX_NAMES {
        return Err(IoError::HeaderOverflow(format!(
            "{} {kind} names, at most {MAX_NAMES} fit",
            fields.len()
        )));
    }

    for (slot, field) in fields.iter().enumerate() {
        let mut encoded = field.name.clone().into_bytes();
        if encoded.is_empty() || encoded.contains(&0) {
            return Err(IoError::HeaderOverflow(format!(
                "{kind} name `{}` cannot be stored",
                field.name
            )));
        }
        if field.columns > 1 {
            encoded.push(0);
            encoded.extend_from_slice(field.columns.to_string().as_bytes());
        }
        if encoded.len() > NAME_LEN {
            return Err(IoError::HeaderOverflow(format!(
                "{kind} name `{}` longer than {NAME_LEN} bytes",
                field.name
            )));
        }
        let start = offset + slot * NAME_LEN;
        out[start..start + encoded.len()].copy_from_slice(&encoded);
    }
    Ok(())
}

// ============================================================================
// Records
// ============================================================================

/// One decoded streamline record, coordinates still in voxmm.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Record {
    pub points: Vec<[f32; 3]>,
    /// `points.len() * n_scalars` values, row-major.
    pub scalars: Vec<f32>,
    pub properties: Vec<f32>,
}

/// Reads the next record. `Ok(None)` at a clean end of file.
pub(crate) fn read_record<R: Read>(
    reader: &mut R,
    header: &TrkHeader,
    index: usize,
) -> Result<Option<Record>, IoError> {
    let mut count_bytes = [0u8; 4];
    match read_full(reader, &mut count_bytes)? {
        0 => return Ok(None),
        4 => {}
        _ => return Err(IoError::Truncated { index }),
    }
    let n_points = match header.byte_order {
        ByteOrder::Little => i32::from_le_bytes(count_bytes),
        ByteOrder::Big => i32::from_be_bytes(count_bytes),
    };
    let n_points = usize::try_from(n_points).map_err(|_| {
        IoError::InvalidHeader(format!("streamline {index} has {n_points} points"))
    })?;

    let n_scalars = header.scalar_columns();
    let n_properties = header.property_columns();
    let row_width = 3 + n_scalars;

    let value_count = n_points
        .checked_mul(row_width)
        .and_then(|n| n.checked_add(n_properties))
        .ok_or_else(|| {
            IoError::InvalidHeader(format!("streamline {index} has {n_points} points"))
        })?;
    let values = read_f32s(reader, value_count, header.byte_order)?
        .ok_or(IoError::Truncated { index })?;

    let (rows, properties) = values.split_at(n_points * row_width);
    let mut points = Vec::with_capacity(n_points);
    let mut scalars = Vec::with_capacity(n_points * n_scalars);
    for row in rows.chunks_exact(row_width) {
        points.push([row[0], row[1], row[2]]);
        scalars.extend_from_slice(&row[3..]);
    }

    Ok(Some(Record {
        points,
        scalars,
        properties: properties.to_vec(),
    }))
}

pub(crate) fn write_record<W: Write>(writer: &mut W, record: &Record) -> Result<(), IoError> {
    let n_points = i32::try_from(record.points.len()).map_err(|_| {
        IoError::HeaderOverflow(format!("{} points in one streamline", record.points.len()))
    })?;
    writer.write_all(&n_points.to_le_bytes())?;

    let n_scalars = if record.points.is_empty() {
        0
    } else {
        record.scalars.len() / record.points.len()
    };
    for (i, point) in record.points.iter().enumerate() {
        for value in point {
            writer.write_all(&value.to_le_bytes())?;
        }
        for value in &record.scalars[i * n_scalars..(i + 1) * n_scalars] {
            writer.write_all(&value.to_le_bytes())?;
        }
    }
    for value in &record.properties {
        writer.write_all(&value.to_le_bytes())?;
    }
    Ok(())
}

/// Fills `buf` as far as the stream allows and returns the byte count.
fn read_full<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => {}
            Err(err) => return Err(err),
        }
    }
    Ok(filled)
}

/// Reads `count` values, or `None` when the stream ends first.
fn read_f32s<R: Read>(
    reader: &mut R,
    count: usize,
    order: ByteOrder,
) -> io::Result<Option<Vec<f32>>> {
    let byte_count = count.saturating_mul(4);
    let mut raw = Vec::new();
    reader
        .take(u64::try_from(byte_count).unwrap_or(u64::MAX))
        .read_to_end(&mut raw)?;
    if raw.len() < byte_count {
        return Ok(None);
    }
    Ok(Some(
        raw.chunks_exact(4)
            .map(|chunk| {
                let bytes = [chunk[0], chunk[1], chunk[2], chunk[3]];
                match order {
                    ByteOrder::Little => f32::from_le_bytes(bytes),
                    ByteOrder::Big => f32::from_be_bytes(bytes),
                }
            })
            .collect(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header_with_fields() -> TrkHeader {
        TrkHeader {
            dimensions: [9, 10, 11],
            voxel_sizes: [1.25, 1.25, 2.0],
            scalars: vec![
                Field {
                    name: "fa".to_owned(),
                    columns: 1,
                },
                Field {
                    name: "colors".to_owned(),
                    columns: 3,
                },
            ],
            properties: vec![Field {
                name: "weight".to_owned(),
                columns: 1,
            }],
            voxel_order: *b"LAS\0",
            n_count: 2,
            ..TrkHeader::default()
        }
    }

    #[test]
    fn header_fields_survive_encoding() {
        let header = header_with_fields();
        let bytes = header.encode().expect("header fits");
        assert_eq!(&bytes[..6], b"TRACK\0");
        let second = OFFSET_SCALAR_NAME + NAME_LEN;
        assert_eq!(&bytes[second..second + 8], b"colors\x003");

        let decoded = TrkHeader::decode(&bytes).expect("valid header");
        assert_eq!(decoded, header);
        assert_eq!(decoded.scalar_columns(), 4);
    }

    #[test]
    fn big_endian_headers_are_detected() {
        let mut bytes = TrkHeader::default().encode().expect("header fits");
        bytes[OFFSET_HDR_SIZE..OFFSET_HDR_SIZE + 4].copy_from_slice(&1000i32.to_be_bytes());
        bytes[OFFSET_DIM..OFFSET_DIM + 2].copy_from_slice(&7i16.to_be_bytes());
        let decoded = TrkHeader::decode(&bytes).expect("valid header");
        assert_eq!(decoded.byte_order, ByteOrder::Big);
        assert_eq!(decoded.dimensions[0], 7);
    }

    #[test]
    fn bad_magic_and_size_are_rejected() {
        let mut bytes = TrkHeader::default().encode().expect("header fits");
        bytes[0] = b'X';
        assert!(matches!(TrkHeader::decode(&bytes), Err(IoError::InvalidHeader(_))));

        let mut bytes = TrkHeader::default().encode().expect("header fits");
        bytes[OFFSET_HDR_SIZE..OFFSET_HDR_SIZE + 4].copy_from_slice(&12i32.to_le_bytes());
        assert!(matches!(TrkHeader::decode(&bytes), Err(IoError::InvalidHeader(_))));
    }

    #[test]
    fn unnamed_columns_get_fallback_name() {
        let mut bytes = TrkHeader::default().encode().expect("header fits");
        bytes[OFFSET_N_SCALARS..OFFSET_N_SCALARS + 2].copy_from_slice(&2i16.to_le_bytes());
        let decoded = TrkHeader::decode(&bytes).expect("valid header");
        assert_eq!(
            decoded.scalars,
            vec![Field {
                name: "scalars".to_owned(),
                columns: 2
            }]
        );
    }

    #[test]
    fn too_many_or_long_names_overflow() {
        let mut header = TrkHeader::default();
        header.scalars = (0..11)
            .map(|i| Field {
                name: format!("s{i}"),
                columns: 1,
            })
            .collect();
        assert!(matches!(header.encode(), Err(IoError::HeaderOverflow(_))));

        header.scalars = vec![Field {
            name: "a_very_long_scalar_name".to_owned(),
            columns: 1,
        }];
        assert!(matches!(header.encode(), Err(IoError::HeaderOverflow(_))));
    }

    #[test]
    fn records_round_trip_and_detect_truncation() {
        let header = header_with_fields();
        let record = Record {
            points: vec![[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]],
            scalars: vec![0.5, 1.0, 2.0, 3.0, 0.25, 4.0, 5.0, 6.0],
            properties: vec![9.0],
        };
        let mut bytes = Vec::new();
        write_record(&mut bytes, &record).expect("in-memory write");

        let mut reader = bytes.as_slice();
        let read = read_record(&mut reader, &header, 0).expect("valid record");
        assert_eq!(read, Some(record));
        assert_eq!(read_record(&mut reader, &header, 1).expect("clean eof"), None);

        let mut short = &bytes[..bytes.len() - 2];
        assert!(matches!(
            read_record(&mut short, &header, 3),
            Err(IoError::Truncated { index: 3 })
        ));
    }
}
