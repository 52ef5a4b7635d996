//! Metadata attached to a streamline.

use serde::{Deserialize, Serialize};

/// One metadata entry, tagged by how it relates to the points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StreamlineData {
    /// One row of `width` values per point, stored row-major.
    PerPoint { width: usize, values: Vec<f64> },
    /// A scalar or fixed-size vector describing the whole streamline.
    PerStreamline(Vec<f64>),
}

impl StreamlineData {
    /// One value per point.
    #[must_use]
    pub fn per_point(values: Vec<f64>) -> Self {
        Self::PerPoint { width: 1, values }
    }

    #[must_use]
    pub fn per_point_rows(width: usize, values: Vec<f64>) -> Self {
        Self::PerPoint { width, values }
    }

    #[must_use]
    pub fn per_streamline(values: Vec<f64>) -> Self {
        Self::PerStreamline(values)
    }

    #[must_use]
    pub const fn is_per_point(&self) -> bool {
        matches!(self, Self::PerPoint { .. })
    }

    /// Values per point, or the vector length for per-streamline data.
    #[must_use]
    pub fn width(&self) -> usize {
        match self {
            Self::PerPoint { width, .. } => *width,
            Self::PerStreamline(values) => values.len(),
        }
    }

    #[must_use]
    pub fn values(&self) -> &[f64] {
        match self {
            Self::PerPoint { values, .. } | Self::PerStreamline(values) => values,
        }
    }

    /// Number of complete rows, `None` for per-streamline data or when the
    /// values do not divide evenly into rows.
    #[must_use]
    pub fn rows(&self) -> Option<usize> {
        match self {
            Self::PerPoint { width, values } => {
                if *width == 0 {
                    return values.is_empty().then_some(0);
                }
                (values.len() % width == 0).then(|| values.len() / width)
            }
            Self::PerStreamline(_) => None,
        }
    }

    /// Row `index` of per-point data.
    #[must_use]
    pub fn row(&self, index: usize) -> Option<&[f64]> {
        match self {
            Self::PerPoint { width, values } => {
                let start = index.checked_mul(*width)?;
                let end = start.checked_add(*width)?;
                values.get(start..end)
            }
            Self::PerStreamline(_) => None,
        }
    }

    /// Reverses the row order of per-point data in place.
    pub(crate) fn reverse_rows(&mut self) {
        if let Self::PerPoint { width, values } = self {
            if *width == 0 {
                return;
            }
            let reversed: Vec<f64> = values
                .chunks_exact(*width)
                .rev()
                .flatten()
                .copied()
                .collect();
            *values = reversed;
        }
    }
}
