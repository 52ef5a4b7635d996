//! Point-sequence kernel.
//!
//! Pure functions over ordered 3D point sequences. Inputs are borrowed
//! slices and every operation returns a new sequence (or a scalar), so a
//! frozen sequence can be shared between threads freely.

mod core;
mod error;
mod hash;
mod metric;
mod polyline;
mod spline;

pub use self::core::{Point3, Tolerance, Transform, Vec3};
pub use error::GeomError;
pub use hash::{ContentHash, content_eq, content_hash};
pub use metric::{DEFAULT_DISTANCE_RESOLUTION, distance, reorient, reorient_with_resolution};
pub use polyline::{
    CompressDiagnostics, CompressOptions, DEFAULT_RESAMPLE_COUNT, compress, cumulative_lengths,
    length, point_segment_distance, resample, reverse, transform,
};
pub use spline::{SmoothDiagnostics, SmoothFallback, SmoothOptions, smooth};

pub(crate) use metric::orient;
pub(crate) use polyline::resample_unchecked;

#[cfg(test)]
mod tests;
