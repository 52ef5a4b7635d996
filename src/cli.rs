//! File-level commands behind the `streamlines` binary.
//!
//! Each command loads `.trk` files in rasmm, runs one collection operation
//! and writes the result, so it can be tested without spawning a process.

use std::fmt;
use std::path::Path;

use serde::Serialize;

use crate::geom::SmoothOptions;
use crate::io::{self, IoResult, Space, axcodes};
use crate::streamline::{StreamlineError, Streamlines};

/// Concatenates `inputs` in order into `output`. The header of the first
/// input is kept. Returns the merged size.
///
/// # Errors
/// Any load or save failure.
pub fn merge<P: AsRef<Path>>(inputs: &[P], output: impl AsRef<Path>) -> IoResult<usize> {
    let mut merged: Option<Streamlines> = None;
    for input in inputs {
        let loaded = io::load(input, Space::Physical)?;
        match merged.as_mut() {
            Some(acc) => *acc += loaded,
            None => merged = Some(loaded),
        }
    }
    let merged = merged.unwrap_or_default();
    io::save(&merged, output)?;
    log::info!("merged {} files into {} streamlines", inputs.len(), merged.len());
    Ok(merged.len())
}

/// Keeps streamlines at least `min_length` long. Returns how many remain.
///
/// # Errors
/// Any load or save failure.
pub fn filter(
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    min_length: f64,
) -> IoResult<usize> {
    let mut streamlines = io::load(input, Space::Physical)?;
    streamlines.filter(Some(min_length));
    io::save(&streamlines, output)?;
    Ok(streamlines.len())
}

/// Orients every streamline like member `template` (default: the first).
/// Returns the collection size.
///
/// # Errors
/// [`StreamlineError::IndexOutOfRange`] (wrapped) for a template index past
/// the end, and any load or save failure.
pub fn reorient(
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    template: Option<usize>,
) -> IoResult<usize> {
    let mut streamlines = io::load(input, Space::Physical)?;
    let template = match template {
        Some(index) => Some(streamlines.get(index).cloned().ok_or(
            StreamlineError::IndexOutOfRange {
                index,
                len: streamlines.len(),
            },
        )?),
        None => None,
    };
    streamlines.reorient(template.as_ref());
    io::save(&streamlines, output)?;
    Ok(streamlines.len())
}

/// Smooths every streamline. Returns the collection size.
///
/// # Errors
/// Any load or save failure.
pub fn smooth(
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    options: SmoothOptions,
) -> IoResult<usize> {
    let mut streamlines = io::load(input, Space::Physical)?;
    streamlines.smooth(options);
    io::save(&streamlines, output)?;
    Ok(streamlines.len())
}

/// Overview of a streamlines file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub streamline_count: usize,
    pub point_count: usize,
    pub min_length: f64,
    pub mean_length: f64,
    pub max_length: f64,
    pub reference_volume_shape: [u32; 3],
    pub voxel_sizes: [f64; 3],
    pub voxel_order: String,
    pub affine: [[f64; 4]; 4],
    pub metadata_keys: Vec<String>,
}

impl Summary {
    #[allow(clippy::cast_precision_loss)]
    #[must_use]
    pub fn of(streamlines: &Streamlines) -> Self {
        let lengths = streamlines.lengths();
        let (min_length, max_length) = if lengths.is_empty() {
            (0.0, 0.0)
        } else {
            lengths
                .iter()
                .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), l| {
                    (lo.min(*l), hi.max(*l))
                })
        };
        let mean_length = if lengths.is_empty() {
            0.0
        } else {
            lengths.iter().sum::<f64>() / lengths.len() as f64
        };

        Self {
            streamline_count: streamlines.len(),
            point_count: streamlines.iter().map(|s| s.len()).sum(),
            min_length,
            mean_length,
            max_length,
            reference_volume_shape: streamlines.reference_volume_shape(),
            voxel_sizes: streamlines.voxel_sizes(),
            voxel_order: axcodes(streamlines.affine()).iter().collect(),
            affine: *streamlines.affine().as_matrix(),
            metadata_keys: streamlines
                .get(0)
                .map(|s| s.data().keys().cloned().collect())
                .unwrap_or_default(),
        }
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{:<16} {}", "streamlines:", self.streamline_count)?;
        writeln!(f, "{:<16} {}", "points:", self.point_count)?;
        writeln!(
            f,
            "{:<16} min {:.3} / mean {:.3} / max {:.3} mm",
            "length:", self.min_length, self.mean_length, self.max_length
        )?;
        let [x, y, z] = self.reference_volume_shape;
        writeln!(f, "{:<16} {x} x {y} x {z}", "volume shape:")?;
        let [sx, sy, sz] = self.voxel_sizes;
        writeln!(f, "{:<16} {sx} x {sy} x {sz} mm", "voxel sizes:")?;
        writeln!(f, "{:<16} {}", "voxel order:", self.voxel_order)?;
        if self.metadata_keys.is_empty() {
            write!(f, "{:<16} none", "metadata:")
        } else {
            write!(f, "{:<16} {}", "metadata:", self.metadata_keys.join(", "))
        }
    }
}

/// Loads `input` and summarizes it.
///
/// # Errors
/// Any load failure.
pub fn info(input: impl AsRef<Path>) -> IoResult<Summary> {
    let streamlines = io::load(input, Space::Physical)?;
    Ok(Summary::of(&streamlines))
}
