/// Validation failures raised by the point-sequence kernel.
///
/// Degenerate geometry (empty sequences, zero arc length, too few points to
/// fit a spline) is never an error; the kernel falls back instead.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GeomError {
    #[error("resampling requires at least 2 points, got {0}")]
    InvalidSampleCount(usize),
    #[error("points must have exactly 3 coordinates, got {found}")]
    InvalidPointShape { found: usize },
    #[error("affine must be a 4x4 matrix, got {rows}x{cols}")]
    InvalidMatrixShape { rows: usize, cols: usize },
    #[error("affine is not invertible")]
    SingularMatrix,
}
