//! Reading and writing streamline collections.
//!
//! The container format is TrackVis `.trk`. In memory, collection points are
//! kept in rasmm ([`Space::Physical`]) or in voxel indices of the reference
//! volume ([`Space::Voxel`]). On disk they are stored as TrackVis "voxmm"
//! (voxel index + 0.5, scaled by the voxel size, in the header's voxel
//! order), so both load and save convert through the header affine.

mod orientation;
mod trk;

use std::fmt;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::geom::{Point3, Tolerance, Transform, Vec3};
use crate::streamline::{Streamline, StreamlineData, StreamlineError, Streamlines};

pub use orientation::axcodes;

use orientation::{parse_voxel_order, reorder_transform};
use trk::{Field, Record, TrkHeader};

/// Result type for load and save.
pub type IoResult<T> = Result<T, IoError>;

/// Failures at the file boundary.
#[derive(Debug, thiserror::Error)]
pub enum IoError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("unsupported file format `{0}`, expected a .trk file")]
    UnsupportedFormat(String),
    #[error("unsupported space `{0}`, expected `mm` or `voxel`")]
    UnsupportedSpace(String),
    #[error("voxel space requested but the file has no voxel-to-rasmm affine")]
    MissingAffine,
    #[error("invalid trk header: {0}")]
    InvalidHeader(String),
    #[error("file ends inside streamline {index}")]
    Truncated { index: usize },
    #[error("does not fit in a trk header: {0}")]
    HeaderOverflow(String),
    #[error("streamline {index} metadata `{key}` does not match the first streamline")]
    InconsistentData { index: usize, key: String },
    #[error(transparent)]
    Streamline(#[from] StreamlineError),
}

/// Coordinate system of collection points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Space {
    /// World millimeters (rasmm).
    #[default]
    Physical,
    /// Voxel indices of the reference volume.
    Voxel,
}

impl FromStr for Space {
    type Err = IoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mm" | "rasmm" | "physical" => Ok(Self::Physical),
            "voxel" | "vox" => Ok(Self::Voxel),
            _ => Err(IoError::UnsupportedSpace(s.to_owned())),
        }
    }
}

impl fmt::Display for Space {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Physical => f.write_str("mm"),
            Self::Voxel => f.write_str("voxel"),
        }
    }
}

// ============================================================================
// Load
// ============================================================================

/// Loads a `.trk` file with points in `space`.
///
/// Per-point scalars become [`StreamlineData::PerPoint`] entries and
/// per-streamline properties become [`StreamlineData::PerStreamline`]
/// entries, keyed by their header names.
///
/// # Errors
/// [`IoError::UnsupportedFormat`] for other extensions,
/// [`IoError::MissingAffine`] when `space` is voxel and the header affine is
/// the identity, and header or body decoding errors.
pub fn load(path: impl AsRef<Path>, space: Space) -> IoResult<Streamlines> {
    let path = path.as_ref();
    check_extension(path)?;

    let mut reader = BufReader::new(File::open(path)?);
    let mut header_bytes = [0u8; trk::HEADER_SIZE];
    reader.read_exact(&mut header_bytes).map_err(|err| {
        if err.kind() == std::io::ErrorKind::UnexpectedEof {
            IoError::InvalidHeader("file is shorter than the header".to_owned())
        } else {
            IoError::Io(err)
        }
    })?;
    let header = TrkHeader::decode(&header_bytes)?;

    let affine = header_affine(&header);
    if space == Space::Voxel && affine.is_identity(Tolerance::LOOSE) {
        return Err(IoError::MissingAffine);
    }

    let dimensions = header_dimensions(&header)?;
    let voxel_sizes = checked_voxel_sizes(header.voxel_sizes.map(f64::from))?;
    let voxel_order = parse_voxel_order(&header.voxel_order)?;
    let to_rasmm = voxmm_to_rasmm(&affine, voxel_order, dimensions, voxel_sizes);

    let expected = usize::try_from(header.n_count).ok().filter(|n| *n > 0);
    let mut streamlines = Streamlines::new().with_header(affine, dimensions, voxel_sizes);
    let mut index = 0;
    while expected.is_none_or(|n| index < n) {
        let Some(record) = trk::read_record(&mut reader, &header, index)? else {
            if expected.is_some() {
                return Err(IoError::Truncated { index });
            }
            break;
        };
        streamlines.push(streamline_from_record(record, &header, &to_rasmm)?);
        index += 1;
    }

    log::info!(
        "loaded {} streamlines from {} (voxel order {}, {} scalars, {} properties)",
        streamlines.len(),
        path.display(),
        voxel_order.iter().collect::<String>(),
        header.scalar_columns(),
        header.property_columns()
    );

    if space == Space::Voxel {
        streamlines.to_voxel()?;
    }
    Ok(streamlines)
}

fn header_affine(header: &TrkHeader) -> Transform {
    let m = header.vox_to_ras.map(|row| row.map(f64::from));
    if m.iter().flatten().all(|v| *v == 0.0) {
        log::warn!("vox_to_ras is zero, using the identity");
        return Transform::identity();
    }
    Transform::from_matrix(m)
}

fn header_dimensions(header: &TrkHeader) -> IoResult<[u32; 3]> {
    let mut dims = [0u32; 3];
    for (dim, raw) in dims.iter_mut().zip(header.dimensions) {
        *dim = u32::try_from(raw)
            .map_err(|_| IoError::InvalidHeader(format!("dimension {raw}")))?;
    }
    Ok(dims)
}

fn checked_voxel_sizes(sizes: [f64; 3]) -> IoResult<[f64; 3]> {
    if sizes.iter().all(|s| s.is_finite() && *s > 0.0) {
        Ok(sizes)
    } else {
        Err(IoError::InvalidHeader(format!("voxel sizes {sizes:?}")))
    }
}

/// TrackVis voxmm (in `voxel_order`) to rasmm.
fn voxmm_to_rasmm(
    affine: &Transform,
    voxel_order: [char; 3],
    dimensions: [u32; 3],
    voxel_sizes: [f64; 3],
) -> Transform {
    let to_voxel = Transform::translate(Vec3::new(-0.5, -0.5, -0.5)).compose(Transform::scale(
        1.0 / voxel_sizes[0],
        1.0 / voxel_sizes[1],
        1.0 / voxel_sizes[2],
    ));
    let reorder = reorder_transform(voxel_order, axcodes(affine), dimensions.map(f64::from));
    affine.compose(reorder).compose(to_voxel)
}

fn streamline_from_record(
    record: Record,
    header: &TrkHeader,
    to_rasmm: &Transform,
) -> IoResult<Streamline> {
    let n_points = record.points.len();
    let points: Vec<Point3> = record
        .points
        .iter()
        .map(|&[x, y, z]| to_rasmm.apply_point(Point3::new(x.into(), y.into(), z.into())))
        .collect();
    let mut streamline = Streamline::from_points(points);

    let n_scalars = header.scalar_columns();
    let mut offset = 0;
    for field in &header.scalars {
        let mut values = Vec::with_capacity(n_points * field.columns);
        for row in record.scalars.chunks_exact(n_scalars) {
            values.extend(row[offset..offset + field.columns].iter().map(|v| f64::from(*v)));
        }
        streamline.insert_data(
            field.name.clone(),
            StreamlineData::per_point_rows(field.columns, values),
        )?;
        offset += field.columns;
    }

    let mut offset = 0;
    for field in &header.properties {
        let values = record.properties[offset..offset + field.columns]
            .iter()
            .map(|v| f64::from(*v))
            .collect();
        streamline.insert_data(field.name.clone(), StreamlineData::per_streamline(values))?;
        offset += field.columns;
    }
    Ok(streamline)
}

// ============================================================================
// Save
// ============================================================================

/// Saves `streamlines` as a `.trk` file.
///
/// Metadata layout follows the first streamline: its per-point entries
/// become scalars and its per-streamline entries become properties, in key
/// order. Every other streamline must carry the same keys with the same
/// kinds and widths.
///
/// # Errors
/// [`IoError::UnsupportedFormat`], [`IoError::InconsistentData`],
/// [`IoError::HeaderOverflow`] when names or sizes exceed the header limits,
/// a wrapped [`StreamlineError::SingularAffine`], and file errors.
pub fn save(streamlines: &Streamlines, path: impl AsRef<Path>) -> IoResult<()> {
    let path = path.as_ref();
    check_extension(path)?;

    let affine = *streamlines.affine();
    let voxel_order = axcodes(&affine);
    let dimensions = streamlines.reference_volume_shape();
    let voxel_sizes = checked_voxel_sizes(streamlines.voxel_sizes())?;

    let to_rasmm = voxmm_to_rasmm(&affine, voxel_order, dimensions, voxel_sizes);
    let mut to_voxmm = to_rasmm
        .try_inverse()
        .map_err(|_| StreamlineError::SingularAffine)?;
    if streamlines.space() == Space::Voxel {
        to_voxmm = to_voxmm.compose(affine);
    }

    let layout = DataLayout::of(streamlines)?;
    let header = TrkHeader {
        dimensions: encode_dimensions(dimensions)?,
        voxel_sizes: voxel_sizes.map(narrow),
        scalars: layout.fields(true),
        properties: layout.fields(false),
        vox_to_ras: affine.as_matrix().map(|row| row.map(narrow)),
        voxel_order: encode_voxel_order(voxel_order),
        n_count: i32::try_from(streamlines.len()).map_err(|_| {
            IoError::HeaderOverflow(format!("{} streamlines", streamlines.len()))
        })?,
        ..TrkHeader::default()
    };

    let mut writer = BufWriter::new(File::create(path)?);
    writer.write_all(&header.encode()?)?;
    for streamline in streamlines {
        trk::write_record(&mut writer, &layout.record(streamline, &to_voxmm))?;
    }
    writer.flush()?;

    log::info!(
        "saved {} streamlines to {} (voxel order {})",
        streamlines.len(),
        path.display(),
        voxel_order.iter().collect::<String>()
    );
    Ok(())
}

#[allow(clippy::cast_possible_truncation)]
fn narrow(value: f64) -> f32 {
    value as f32
}

fn encode_dimensions(dimensions: [u32; 3]) -> IoResult<[i16; 3]> {
    let mut out = [0i16; 3];
    for (slot, dim) in out.iter_mut().zip(dimensions) {
        *slot = i16::try_from(dim)
            .map_err(|_| IoError::HeaderOverflow(format!("dimension {dim}")))?;
    }
    Ok(out)
}

fn encode_voxel_order(codes: [char; 3]) -> [u8; 4] {
    let mut out = [0u8; 4];
    for (slot, code) in out.iter_mut().zip(codes) {
        *slot = u8::try_from(code).unwrap_or(b'?');
    }
    out
}

/// Metadata keys of a collection in on-disk order.
struct DataLayout {
    /// `(key, per_point, width)` in key order.
    entries: Vec<(String, bool, usize)>,
}

impl DataLayout {
    fn of(streamlines: &Streamlines) -> IoResult<Self> {
        let Some(first) = streamlines.get(0) else {
            return Ok(Self {
                entries: Vec::new(),
            });
        };

        let mut entries = Vec::new();
        for (key, value) in first.data() {
            if value.width() == 0 {
                log::warn!("skipping empty metadata entry `{key}`");
                continue;
            }
            entries.push((key.clone(), value.is_per_point(), value.width()));
        }

        for (index, streamline) in streamlines.iter().enumerate().skip(1) {
            for (key, per_point, width) in &entries {
                let matches = streamline
                    .data_value(key)
                    .is_some_and(|v| v.is_per_point() == *per_point && v.width() == *width);
                if !matches {
                    return Err(IoError::InconsistentData {
                        index,
                        key: key.clone(),
                    });
                }
            }
            if let Some(extra) = streamline.data().iter().find(|(key, value)| {
                value.width() > 0 && !entries.iter().any(|(k, _, _)| k == *key)
            }) {
                return Err(IoError::InconsistentData {
                    index,
                    key: extra.0.clone(),
                });
            }
        }
        Ok(Self { entries })
    }

    fn fields(&self, per_point: bool) -> Vec<Field> {
        self.entries
            .iter()
            .filter(|(_, p, _)| *p == per_point)
            .map(|(name, _, columns)| Field {
                name: name.clone(),
                columns: *columns,
            })
            .collect()
    }

    fn record(&self, streamline: &Streamline, to_voxmm: &Transform) -> Record {
        let points: Vec<[f32; 3]> = streamline
            .iter()
            .map(|p| {
                let v = to_voxmm.apply_point(*p);
                [narrow(v.x), narrow(v.y), narrow(v.z)]
            })
            .collect();

        let mut scalars = Vec::new();
        for row in 0..points.len() {
            for (key, _, _) in self.entries.iter().filter(|(_, p, _)| *p) {
                if let Some(values) = streamline.data_value(key).and_then(|d| d.row(row)) {
                    scalars.extend(values.iter().copied().map(narrow));
                }
            }
        }

        let properties = self
            .entries
            .iter()
            .filter(|(_, p, _)| !*p)
            .filter_map(|(key, _, _)| streamline.data_value(key))
            .flat_map(|d| d.values().iter().copied().map(narrow))
            .collect();

        Record {
            points,
            scalars,
            properties,
        }
    }
}

fn check_extension(path: &Path) -> IoResult<()> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match extension.as_deref() {
        Some("trk") => Ok(()),
        Some(other) => Err(IoError::UnsupportedFormat(other.to_owned())),
        None => Err(IoError::UnsupportedFormat(path.display().to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn space_keywords() {
        assert_eq!("mm".parse::<Space>().expect("known"), Space::Physical);
        assert_eq!("RASMM".parse::<Space>().expect("known"), Space::Physical);
        assert_eq!("voxel".parse::<Space>().expect("known"), Space::Voxel);
        assert!(matches!(
            "world".parse::<Space>(),
            Err(IoError::UnsupportedSpace(s)) if s == "world"
        ));
        assert_eq!(Space::Voxel.to_string(), "voxel");
    }

    #[test]
    fn extension_is_checked() {
        assert!(check_extension(Path::new("a/b.trk")).is_ok());
        assert!(check_extension(Path::new("b.TRK")).is_ok());
        assert!(matches!(
            check_extension(Path::new("b.tck")),
            Err(IoError::UnsupportedFormat(e)) if e == "tck"
        ));
        assert!(check_extension(Path::new("noext")).is_err());
    }

    #[test]
    fn voxmm_mapping_matches_voxel_centers() {
        let affine = Transform::scale(2.0, 2.0, 2.0);
        let to_rasmm = voxmm_to_rasmm(&affine, ['R', 'A', 'S'], [10, 10, 10], [2.0, 2.0, 2.0]);
        // center of voxel (0, 0, 0) sits at voxmm (1, 1, 1)
        let p = to_rasmm.apply_point(Point3::new(1.0, 1.0, 1.0));
        assert!(Tolerance::DEFAULT.approx_eq_point3(p, Point3::ORIGIN));
    }
}
