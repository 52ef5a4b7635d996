//! Streamline wrappers around the point-sequence kernel.
//!
//! A [`Streamline`] owns one point sequence plus keyed metadata. Geometry
//! methods run the matching [`crate::geom`] primitive and replace the stored
//! sequence with the result. [`Streamlines`] is an ordered collection that
//! also carries the reference volume header shared by its members.

mod collection;
mod data;

use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};

use crate::geom::{
    self, CompressOptions, ContentHash, GeomError, Point3, SmoothOptions, Transform,
};

pub use collection::Streamlines;
pub use data::StreamlineData;

/// Failures raised by streamline and collection operations.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StreamlineError {
    #[error("point {index} has {found} coordinates, expected 3")]
    InvalidPointShape { index: usize, found: usize },
    #[error("data `{key}` has {found} rows but the streamline has {expected} points")]
    DataLengthMismatch {
        key: String,
        expected: usize,
        found: usize,
    },
    #[error("mask has {found} entries but the collection has {expected} streamlines")]
    MaskLengthMismatch { expected: usize, found: usize },
    #[error("index {index} is out of range for {len} streamlines")]
    IndexOutOfRange { index: usize, len: usize },
    #[error("affine is not invertible")]
    SingularAffine,
    #[error(transparent)]
    Geom(#[from] GeomError),
}

/// One fiber pathway: an ordered point sequence plus metadata.
///
/// Equality and hashing go through [`Streamline::content_hash`], so two
/// streamlines are equal when their points are bit-for-bit identical.
/// Metadata does not take part in equality.
#[derive(Debug, Clone, Default)]
pub struct Streamline {
    points: Vec<Point3>,
    data: BTreeMap<String, StreamlineData>,
}

impl Streamline {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn from_points(points: Vec<Point3>) -> Self {
        Self {
            points,
            data: BTreeMap::new(),
        }
    }

    /// Builds a streamline from coordinate rows.
    ///
    /// # Errors
    /// [`StreamlineError::InvalidPointShape`] when a row does not hold exactly
    /// three values.
    pub fn try_from_rows<R: AsRef<[f64]>>(rows: &[R]) -> Result<Self, StreamlineError> {
        let points = rows
            .iter()
            .enumerate()
            .map(|(index, row)| {
                Point3::try_from_slice(row.as_ref()).map_err(|err| match err {
                    GeomError::InvalidPointShape { found } => {
                        StreamlineError::InvalidPointShape { index, found }
                    }
                    other => StreamlineError::Geom(other),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::from_points(points))
    }

    /// Builds a streamline with metadata, validating every entry.
    ///
    /// # Errors
    /// [`StreamlineError::DataLengthMismatch`] for per-point data whose row
    /// count differs from the point count.
    pub fn with_data<I, K>(points: Vec<Point3>, data: I) -> Result<Self, StreamlineError>
    where
        I: IntoIterator<Item = (K, StreamlineData)>,
        K: Into<String>,
    {
        let mut streamline = Self::from_points(points);
        for (key, value) in data {
            streamline.insert_data(key, value)?;
        }
        Ok(streamline)
    }

    // ------------------------------------------------------------------
    // Access
    // ------------------------------------------------------------------

    #[must_use]
    pub fn points(&self) -> &[Point3] {
        &self.points
    }

    #[must_use]
    pub fn into_points(self) -> Vec<Point3> {
        self.points
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<Point3> {
        self.points.get(index).copied()
    }

    #[must_use]
    pub fn first(&self) -> Option<Point3> {
        self.points.first().copied()
    }

    #[must_use]
    pub fn last(&self) -> Option<Point3> {
        self.points.last().copied()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Point3> {
        self.points.iter()
    }

    /// Whether `point` is one of the vertices, compared exactly.
    #[must_use]
    pub fn contains(&self, point: &Point3) -> bool {
        self.points.iter().any(|p| p.bits_eq(*point))
    }

    #[must_use]
    pub fn length(&self) -> f64 {
        geom::length(&self.points)
    }

    #[must_use]
    pub fn content_hash(&self) -> ContentHash {
        geom::content_hash(&self.points)
    }

    #[must_use]
    pub fn content_eq(&self, other: &Self) -> bool {
        self.content_hash() == other.content_hash()
    }

    /// Mean point-to-point distance after resampling both streamlines to
    /// `resolution` points.
    ///
    /// # Errors
    /// [`GeomError::InvalidSampleCount`] (wrapped) when `resolution < 2`.
    pub fn distance(&self, other: &Self, resolution: usize) -> Result<f64, StreamlineError> {
        Ok(geom::distance(&self.points, &other.points, resolution)?)
    }

    // ------------------------------------------------------------------
    // Geometry
    // ------------------------------------------------------------------

    pub fn compress(&mut self, options: CompressOptions) -> &mut Self {
        let (points, diagnostics) = geom::compress(&self.points, options);
        log::debug!(
            "compress: {} -> {} points",
            diagnostics.input_point_count,
            diagnostics.output_point_count
        );
        self.replace_points(points, "compress")
    }

    /// # Errors
    /// [`GeomError::InvalidSampleCount`] (wrapped) when `count < 2`; the
    /// streamline is left untouched.
    pub fn resample(&mut self, count: usize) -> Result<&mut Self, StreamlineError> {
        if count < 2 {
            return Err(GeomError::InvalidSampleCount(count).into());
        }
        Ok(self.resample_validated(count))
    }

    /// [`Streamline::resample`] for a count already checked to be `>= 2`.
    pub(crate) fn resample_validated(&mut self, count: usize) -> &mut Self {
        let points = geom::resample_unchecked(&self.points, count);
        self.replace_points(points, "resample")
    }

    pub fn smooth(&mut self, options: SmoothOptions) -> &mut Self {
        let (points, _) = geom::smooth(&self.points, options);
        self.replace_points(points, "smooth")
    }

    pub fn reverse(&mut self) -> &mut Self {
        self.points.reverse();
        for value in self.data.values_mut() {
            value.reverse_rows();
        }
        self
    }

    /// Flips the streamline when its reverse is closer to `template`.
    /// Returns whether it was flipped.
    pub fn reorient(&mut self, template: &Self) -> bool {
        let (_, reversed) = geom::orient(
            &self.points,
            &template.points,
            geom::DEFAULT_DISTANCE_RESOLUTION,
        );
        if reversed {
            self.reverse();
        }
        reversed
    }

    pub fn transform(&mut self, affine: &Transform) -> &mut Self {
        self.points = geom::transform(&self.points, affine);
        self
    }

    fn replace_points(&mut self, points: Vec<Point3>, operation: &str) -> &mut Self {
        self.points = points;
        self.drop_per_point_data(operation);
        self
    }

    fn drop_per_point_data(&mut self, operation: &str) {
        let dropped: Vec<String> = self
            .data
            .iter()
            .filter(|(_, value)| value.is_per_point())
            .map(|(key, _)| key.clone())
            .collect();
        if dropped.is_empty() {
            return;
        }
        log::warn!(
            "{operation} changed the points; dropping per-point data {}",
            dropped.join(", ")
        );
        self.data.retain(|_, value| !value.is_per_point());
    }

    // ------------------------------------------------------------------
    // Metadata
    // ------------------------------------------------------------------

    #[must_use]
    pub fn data(&self) -> &BTreeMap<String, StreamlineData> {
        &self.data
    }

    #[must_use]
    pub fn data_value(&self, key: &str) -> Option<&StreamlineData> {
        self.data.get(key)
    }

    /// Inserts or replaces a metadata entry.
    ///
    /// # Errors
    /// [`StreamlineError::DataLengthMismatch`] when per-point data does not
    /// have one row per point.
    pub fn insert_data(
        &mut self,
        key: impl Into<String>,
        value: StreamlineData,
    ) -> Result<Option<StreamlineData>, StreamlineError> {
        let key = key.into();
        if value.is_per_point() {
            let expected = self.points.len();
            match value.rows() {
                Some(rows) if rows == expected => {}
                rows => {
                    return Err(StreamlineError::DataLengthMismatch {
                        key,
                        expected,
                        found: rows.unwrap_or_else(|| value.values().len()),
                    });
                }
            }
        }
        Ok(self.data.insert(key, value))
    }

    pub fn remove_data(&mut self, key: &str) -> Option<StreamlineData> {
        self.data.remove(key)
    }
}

impl PartialEq for Streamline {
    fn eq(&self, other: &Self) -> bool {
        self.content_eq(other)
    }
}

impl Eq for Streamline {}

impl Hash for Streamline {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.content_hash().hash(state);
    }
}

impl fmt::Display for Streamline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "streamline: {} points", self.points.len())
    }
}

impl From<Vec<Point3>> for Streamline {
    fn from(points: Vec<Point3>) -> Self {
        Self::from_points(points)
    }
}

impl<'a> IntoIterator for &'a Streamline {
    type Item = &'a Point3;
    type IntoIter = std::slice::Iter<'a, Point3>;

    fn into_iter(self) -> Self::IntoIter {
        self.points.iter()
    }
}
