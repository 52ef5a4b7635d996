//! Point-sequence primitives: length, arc-length resampling, compression,
//! reversal and affine transforms.
//!
//! Every function takes the input sequence by slice and returns a freshly
//! allocated sequence; nothing here mutates its input.
//!
//! # Example
//!
//! ```ignore
//! use streamlines::geom::{Point3, compress, resample, CompressOptions};
//!
//! let points = vec![Point3::new(0.0, 0.0, 0.0), Point3::new(10.0, 0.0, 0.0)];
//! let dense = resample(&points, 11)?;
//! let (sparse, diag) = compress(&dense, CompressOptions::default());
//! assert_eq!(sparse.len(), 2);
//! ```

use serde::{Deserialize, Serialize};

use super::core::{Point3, Tolerance, Transform};
use super::error::GeomError;

// ============================================================================
// Length
// ============================================================================

/// Total polyline arc length. Sequences with fewer than 2 points have
/// length 0.
#[must_use]
pub fn length(points: &[Point3]) -> f64 {
    points
        .windows(2)
        .map(|pair| pair[0].distance_to(pair[1]))
        .sum()
}

/// Arc length from the first point to every vertex. The first entry is
/// always 0 and the result has one entry per input point.
#[must_use]
pub fn cumulative_lengths(points: &[Point3]) -> Vec<f64> {
    let mut lengths = Vec::with_capacity(points.len());
    if points.is_empty() {
        return lengths;
    }

    let mut total = 0.0;
    lengths.push(total);
    for pair in points.windows(2) {
        total += pair[0].distance_to(pair[1]);
        lengths.push(total);
    }
    lengths
}

// ============================================================================
// Resample
// ============================================================================

/// Sample count used when a caller has no specific resolution in mind.
pub const DEFAULT_RESAMPLE_COUNT: usize = 20;

/// Resamples a polyline to `count` points evenly spaced by arc length.
///
/// The first and last samples are the original endpoints. Interior samples
/// are linear interpolations inside the bracketing original segment.
///
/// Degenerate inputs do not fail: an empty sequence yields `count` origin
/// points, and a single point or a sequence with zero total length yields
/// `count` copies of its first point.
///
/// # Errors
/// [`GeomError::InvalidSampleCount`] when `count < 2`.
pub fn resample(points: &[Point3], count: usize) -> Result<Vec<Point3>, GeomError> {
    if count < 2 {
        return Err(GeomError::InvalidSampleCount(count));
    }
    Ok(resample_unchecked(points, count))
}

/// Body of [`resample`]; callers guarantee `count >= 2`.
#[allow(clippy::cast_precision_loss)]
pub(crate) fn resample_unchecked(points: &[Point3], count: usize) -> Vec<Point3> {
    let Some(&first) = points.first() else {
        return vec![Point3::ORIGIN; count];
    };

    let cumulative = cumulative_lengths(points);
    let total = cumulative[cumulative.len() - 1];
    if points.len() == 1 || Tolerance::ZERO_LENGTH.is_zero_length(total) {
        return vec![first; count];
    }

    let last_index = points.len() - 1;
    let step = total / (count - 1) as f64;

    let mut samples = Vec::with_capacity(count);
    samples.push(first);

    // `segment` is the index of the end vertex of the current segment.
    let mut segment = 1;
    for step_index in 1..count - 1 {
        let target = step * step_index as f64;
        while segment < last_index && cumulative[segment] < target {
            segment += 1;
        }

        let start_length = cumulative[segment - 1];
        let segment_length = cumulative[segment] - start_length;
        let t = if Tolerance::ZERO_LENGTH.is_zero_length(segment_length) {
            0.0
        } else {
            ((target - start_length) / segment_length).clamp(0.0, 1.0)
        };
        samples.push(points[segment - 1].lerp(points[segment], t));
    }

    samples.push(points[last_index]);
    samples
}

// ============================================================================
// Compress
// ============================================================================

/// Options for lossy compression.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CompressOptions {
    /// Maximum distance a dropped point may lie from the segment replacing it.
    pub tolerance: f64,
    /// Longest segment compression may create.
    pub max_segment_length: f64,
}

impl CompressOptions {
    #[must_use]
    pub const fn new(tolerance: f64) -> Self {
        Self {
            tolerance,
            max_segment_length: 10.0,
        }
    }

    #[must_use]
    pub const fn with_max_segment_length(mut self, length: f64) -> Self {
        self.max_segment_length = length;
        self
    }
}

impl Default for CompressOptions {
    fn default() -> Self {
        Self::new(0.01)
    }
}

/// Diagnostics for compression.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompressDiagnostics {
    pub input_point_count: usize,
    pub output_point_count: usize,
    pub points_removed: usize,
}

/// Removes points lying within `tolerance` of the segment joining their
/// retained neighbours.
///
/// Scans forward from the last retained point (the anchor), extending the
/// candidate segment one vertex at a time while every skipped vertex stays
/// within tolerance and the segment stays shorter than
/// `max_segment_length`. When an extension fails the previous candidate is
/// retained and becomes the new anchor. Endpoints are always kept, so the
/// result never has fewer than 2 points unless the input did.
#[must_use]
pub fn compress(
    points: &[Point3],
    options: CompressOptions,
) -> (Vec<Point3>, CompressDiagnostics) {
    let mut diagnostics = CompressDiagnostics {
        input_point_count: points.len(),
        ..Default::default()
    };

    if points.len() <= 2 {
        diagnostics.output_point_count = points.len();
        return (points.to_vec(), diagnostics);
    }

    let tolerance = if options.tolerance.is_finite() {
        options.tolerance.max(0.0)
    } else {
        0.0
    };
    let max_segment_length =
        if options.max_segment_length.is_finite() && options.max_segment_length > 0.0 {
            options.max_segment_length
        } else {
            f64::INFINITY
        };

    let last_index = points.len() - 1;
    let mut kept = vec![points[0]];
    let mut anchor = 0;
    let mut candidate = 1;
    let mut end = 2;

    while end <= last_index {
        if segment_covers(points, anchor, end, tolerance, max_segment_length) {
            candidate = end;
            end += 1;
        } else {
            kept.push(points[candidate]);
            anchor = candidate;
            candidate = anchor + 1;
            end = anchor + 2;
        }
    }
    kept.push(points[last_index]);

    diagnostics.output_point_count = kept.len();
    diagnostics.points_removed = points.len() - kept.len();
    (kept, diagnostics)
}

fn segment_covers(
    points: &[Point3],
    start: usize,
    end: usize,
    tolerance: f64,
    max_segment_length: f64,
) -> bool {
    let a = points[start];
    let b = points[end];
    if a.distance_to(b) > max_segment_length {
        return false;
    }
    points[start + 1..end]
        .iter()
        .all(|p| point_segment_distance(*p, a, b) <= tolerance)
}

/// Distance from `point` to the closed segment `a`–`b`.
#[must_use]
pub fn point_segment_distance(point: Point3, a: Point3, b: Point3) -> f64 {
    let ab = b - a;
    let ap = point - a;
    let ab_len_sq = ab.length_squared();
    if ab_len_sq <= Tolerance::ZERO_LENGTH.eps {
        return ap.length();
    }
    let t = (ap.dot(ab) / ab_len_sq).clamp(0.0, 1.0);
    point.distance_to(a + ab * t)
}

// ============================================================================
// Reverse / Transform
// ============================================================================

/// The same pathway traversed from the other end.
#[must_use]
pub fn reverse(points: &[Point3]) -> Vec<Point3> {
    points.iter().rev().copied().collect()
}

/// Maps every point through `affine` (homogeneous multiply, then
/// de-homogenize).
#[must_use]
pub fn transform(points: &[Point3], affine: &Transform) -> Vec<Point3> {
    points.iter().map(|p| affine.apply_point(*p)).collect()
}
