//! Shape comparison between streamlines.

use super::core::Point3;
use super::error::GeomError;
use super::polyline::{resample_unchecked, reverse};

/// Number of points both sequences are resampled to before comparison.
pub const DEFAULT_DISTANCE_RESOLUTION: usize = 20;

/// Mean Euclidean distance between corresponding points after resampling
/// both sequences to `resolution` points.
///
/// The comparison is order sensitive: a sequence and its reverse are
/// generally far apart. Use [`reorient`] first for an orientation
/// independent comparison. The value depends on `resolution`.
///
/// # Errors
/// [`GeomError::InvalidSampleCount`] when `resolution < 2`.
pub fn distance(left: &[Point3], right: &[Point3], resolution: usize) -> Result<f64, GeomError> {
    if resolution < 2 {
        return Err(GeomError::InvalidSampleCount(resolution));
    }
    Ok(resampled_distance(
        &resample_unchecked(left, resolution),
        right,
        resolution,
    ))
}

#[allow(clippy::cast_precision_loss)]
fn resampled_distance(left_resampled: &[Point3], right: &[Point3], resolution: usize) -> f64 {
    let right_resampled = resample_unchecked(right, resolution);
    let sum: f64 = left_resampled
        .iter()
        .zip(&right_resampled)
        .map(|(a, b)| a.distance_to(*b))
        .sum();
    sum / resolution as f64
}

/// Orders `points` so that it starts at the same end as `template`.
///
/// Both the forward and the reversed sequence are compared to the template
/// at [`DEFAULT_DISTANCE_RESOLUTION`]; the closer one wins and ties keep the
/// forward orientation.
#[must_use]
pub fn reorient(points: &[Point3], template: &[Point3]) -> Vec<Point3> {
    let (reoriented, _) = orient(points, template, DEFAULT_DISTANCE_RESOLUTION);
    reoriented
}

/// [`reorient`] at an explicit comparison resolution. The flag tells whether
/// the sequence was reversed.
///
/// # Errors
/// [`GeomError::InvalidSampleCount`] when `resolution < 2`.
pub fn reorient_with_resolution(
    points: &[Point3],
    template: &[Point3],
    resolution: usize,
) -> Result<(Vec<Point3>, bool), GeomError> {
    if resolution < 2 {
        return Err(GeomError::InvalidSampleCount(resolution));
    }
    Ok(orient(points, template, resolution))
}

/// Body of [`reorient_with_resolution`]; callers guarantee `resolution >= 2`.
pub(crate) fn orient(
    points: &[Point3],
    template: &[Point3],
    resolution: usize,
) -> (Vec<Point3>, bool) {
    let template_resampled = resample_unchecked(template, resolution);
    let forward = resampled_distance(&template_resampled, points, resolution);

    let reversed = reverse(points);
    let backward = resampled_distance(&template_resampled, &reversed, resolution);

    if forward <= backward {
        (points.to_vec(), false)
    } else {
        (reversed, true)
    }
}
