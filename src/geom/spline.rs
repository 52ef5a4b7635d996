//! Spline smoothing of point sequences.
//!
//! A clamped B-spline with uniformly spaced knots (one span per
//! `knot_distance` of arc length) is fitted to the sequence by least
//! squares, with the first and last control points pinned to the original
//! endpoints. The fitted curve is then evaluated at the chord-length
//! parameters of the original points, so the output keeps the input point
//! count.

use serde::{Deserialize, Serialize};

use super::core::{Point3, Tolerance};
use super::polyline::cumulative_lengths;

/// Options for spline smoothing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SmoothOptions {
    /// Arc length between consecutive knots.
    pub knot_distance: f64,
    /// Spline degree (3 = cubic).
    pub degree: usize,
}

impl SmoothOptions {
    #[must_use]
    pub const fn new(knot_distance: f64) -> Self {
        Self {
            knot_distance,
            degree: 3,
        }
    }

    #[must_use]
    pub const fn with_degree(mut self, degree: usize) -> Self {
        self.degree = degree;
        self
    }
}

impl Default for SmoothOptions {
    fn default() -> Self {
        Self::new(10.0)
    }
}

/// Why smoothing returned its input unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SmoothFallback {
    /// Fewer points than `degree + 1`.
    TooFewPoints,
    /// All points coincide.
    ZeroLength,
    /// Knot distance is not a positive finite number.
    InvalidKnotDistance,
    /// The least-squares system had no unique solution.
    SingularFit,
}

/// Diagnostics for smoothing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SmoothDiagnostics {
    pub input_point_count: usize,
    pub output_point_count: usize,
    pub control_point_count: usize,
    pub fallback: Option<SmoothFallback>,
}

/// Smooths a sequence with a least-squares B-spline fit.
///
/// Endpoints are preserved exactly. Sequences too short or too degenerate
/// to fit are returned unchanged with [`SmoothDiagnostics::fallback`] set.
#[must_use]
pub fn smooth(points: &[Point3], options: SmoothOptions) -> (Vec<Point3>, SmoothDiagnostics) {
    let mut diagnostics = SmoothDiagnostics {
        input_point_count: points.len(),
        output_point_count: points.len(),
        ..Default::default()
    };

    match fit(points, options) {
        Ok(spline) => {
            let cumulative = cumulative_lengths(points);
            let total = cumulative[cumulative.len() - 1];
            let last_index = points.len() - 1;

            let mut smoothed = Vec::with_capacity(points.len());
            smoothed.push(points[0]);
            for &arc in &cumulative[1..last_index] {
                smoothed.push(spline.point_at(arc / total));
            }
            smoothed.push(points[last_index]);

            diagnostics.control_point_count = spline.control_points.len();
            (smoothed, diagnostics)
        }
        Err(reason) => {
            log::debug!("smooth fallback on {} points: {reason:?}", points.len());
            diagnostics.fallback = Some(reason);
            (points.to_vec(), diagnostics)
        }
    }
}

fn fit(points: &[Point3], options: SmoothOptions) -> Result<ClampedBSpline, SmoothFallback> {
    let degree = options.degree.max(1);
    // Past this check `degree < points.len()`, so knot sizes cannot overflow.
    match degree.checked_add(1) {
        Some(needed) if points.len() >= needed => {}
        _ => return Err(SmoothFallback::TooFewPoints),
    }
    if !options.knot_distance.is_finite() || options.knot_distance <= 0.0 {
        return Err(SmoothFallback::InvalidKnotDistance);
    }

    let cumulative = cumulative_lengths(points);
    let total = cumulative[cumulative.len() - 1];
    if Tolerance::ZERO_LENGTH.is_zero_length(total) {
        return Err(SmoothFallback::ZeroLength);
    }

    let params: Vec<f64> = cumulative.iter().map(|arc| arc / total).collect();
    let spans = span_count(total, options.knot_distance, points.len() - degree);
    let knots = uniform_clamped_knots(spans, degree);

    let control_points = least_squares_control_points(points, &params, &knots, degree)?;
    Ok(ClampedBSpline {
        degree,
        control_points,
        knots,
    })
}

#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
fn span_count(total_length: f64, knot_distance: f64, max_spans: usize) -> usize {
    let wanted = (total_length / knot_distance).ceil();
    let wanted = if wanted.is_finite() && wanted >= 1.0 {
        wanted.min(max_spans as f64) as usize
    } else {
        1
    };
    wanted.clamp(1, max_spans.max(1))
}

#[allow(clippy::cast_precision_loss)]
fn uniform_clamped_knots(spans: usize, degree: usize) -> Vec<f64> {
    let mut knots = Vec::with_capacity(spans + 2 * degree + 1);
    knots.extend(std::iter::repeat_n(0.0, degree + 1));
    for i in 1..spans {
        knots.push(i as f64 / spans as f64);
    }
    knots.extend(std::iter::repeat_n(1.0, degree + 1));
    knots
}

/// Solves the normal equations for the interior control points, holding the
/// first and last control points at the sequence endpoints.
fn least_squares_control_points(
    points: &[Point3],
    params: &[f64],
    knots: &[f64],
    degree: usize,
) -> Result<Vec<Point3>, SmoothFallback> {
    let control_count = knots.len() - degree - 1;
    let first = points[0];
    let last = points[points.len() - 1];

    let unknowns = control_count - 2;
    if unknowns == 0 {
        return Ok(vec![first, last]);
    }

    let mut normal = vec![vec![0.0; unknowns]; unknowns];
    let mut rhs_x = vec![0.0; unknowns];
    let mut rhs_y = vec![0.0; unknowns];
    let mut rhs_z = vec![0.0; unknowns];

    for (point, &u) in points.iter().zip(params) {
        let span = find_span(control_count - 1, degree, u, knots);
        let basis = basis_functions(span, u, degree, knots);
        let offset = span - degree;

        // Remove the pinned endpoint contributions from the residual.
        let mut residual = *point;
        for (j, &b) in basis.iter().enumerate() {
            let pinned = match offset + j {
                0 => first,
                index if index == control_count - 1 => last,
                _ => continue,
            };
            residual = residual.add_vec(pinned.sub_point(Point3::ORIGIN) * -b);
        }

        for (j, &bj) in basis.iter().enumerate() {
            let row = offset + j;
            if row == 0 || row == control_count - 1 {
                continue;
            }
            rhs_x[row - 1] += bj * residual.x;
            rhs_y[row - 1] += bj * residual.y;
            rhs_z[row - 1] += bj * residual.z;
            for (k, &bk) in basis.iter().enumerate() {
                let col = offset + k;
                if col == 0 || col == control_count - 1 {
                    continue;
                }
                normal[row - 1][col - 1] += bj * bk;
            }
        }
    }

    let xs = solve_linear_system(&normal, &rhs_x)?;
    let ys = solve_linear_system(&normal, &rhs_y)?;
    let zs = solve_linear_system(&normal, &rhs_z)?;

    let mut control_points = Vec::with_capacity(control_count);
    control_points.push(first);
    control_points.extend(
        xs.iter()
            .zip(&ys)
            .zip(&zs)
            .map(|((x, y), z)| Point3::new(*x, *y, *z)),
    );
    control_points.push(last);
    Ok(control_points)
}

/// Gaussian elimination with partial pivoting.
fn solve_linear_system(matrix: &[Vec<f64>], rhs: &[f64]) -> Result<Vec<f64>, SmoothFallback> {
    let n = matrix.len();
    let mut aug: Vec<Vec<f64>> = matrix
        .iter()
        .zip(rhs)
        .map(|(row, b)| {
            let mut r = row.clone();
            r.push(*b);
            r
        })
        .collect();

    for k in 0..n {
        let mut max_row = k;
        let mut max_val = aug[k][k].abs();
        for (i, row) in aug.iter().enumerate().skip(k + 1) {
            if row[k].abs() > max_val {
                max_val = row[k].abs();
                max_row = i;
            }
        }

        if !max_val.is_finite() || max_val < 1e-14 {
            return Err(SmoothFallback::SingularFit);
        }
        aug.swap(k, max_row);

        let pivot_row = aug[k].clone();
        for row in aug.iter_mut().skip(k + 1) {
            let factor = row[k] / pivot_row[k];
            for j in k..=n {
                row[j] -= factor * pivot_row[j];
            }
        }
    }

    let mut result = vec![0.0; n];
    for i in (0..n).rev() {
        let mut sum = aug[i][n];
        for j in (i + 1)..n {
            sum -= aug[i][j] * result[j];
        }
        result[i] = sum / aug[i][i];
    }
    Ok(result)
}

/// Clamped, non-rational B-spline over `[0, 1]`.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ClampedBSpline {
    pub degree: usize,
    pub control_points: Vec<Point3>,
    pub knots: Vec<f64>,
}

impl ClampedBSpline {
    pub(crate) fn point_at(&self, u: f64) -> Point3 {
        let p = self.degree;
        let u = u.clamp(0.0, 1.0);
        let span = find_span(self.control_points.len() - 1, p, u, &self.knots);
        let basis = basis_functions(span, u, p, &self.knots);

        let mut x = 0.0;
        let mut y = 0.0;
        let mut z = 0.0;
        for (j, b) in basis.iter().enumerate() {
            let cp = self.control_points[span - p + j];
            x += b * cp.x;
            y += b * cp.y;
            z += b * cp.z;
        }
        Point3::new(x, y, z)
    }
}

/// Knot span index containing `u`; `n` is the last control point index.
fn find_span(n: usize, p: usize, u: f64, knots: &[f64]) -> usize {
    if u >= knots[n + 1] {
        return n;
    }
    if u <= knots[p] {
        return p;
    }

    let mut low = p;
    let mut high = n + 1;
    let mut mid = (low + high) / 2;
    while u < knots[mid] || u >= knots[mid + 1] {
        if u < knots[mid] {
            high = mid;
        } else {
            low = mid;
        }
        mid = (low + high) / 2;
    }
    mid
}

/// The `p + 1` non-zero basis functions on `span` (Cox-de Boor, triangular
/// form). Entry `j` belongs to control point `span - p + j`.
fn basis_functions(span: usize, u: f64, p: usize, knots: &[f64]) -> Vec<f64> {
    let mut values = vec![0.0; p + 1];
    let mut left = vec![0.0; p + 1];
    let mut right = vec![0.0; p + 1];
    values[0] = 1.0;

    for j in 1..=p {
        left[j] = u - knots[span + 1 - j];
        right[j] = knots[span + j] - u;
        let mut saved = 0.0;
        for r in 0..j {
            let denom = right[r + 1] + left[j - r];
            let temp = if denom == 0.0 { 0.0 } else { values[r] / denom };
            values[r] = saved + right[r + 1] * temp;
            saved = left[j - r] * temp;
        }
        values[j] = saved;
    }
    values
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basis_functions_partition_unity() {
        let knots = uniform_clamped_knots(4, 3);
        for step in 0..=20 {
            let u = f64::from(step) / 20.0;
            let span = find_span(knots.len() - 3 - 2, 3, u, &knots);
            let sum: f64 = basis_functions(span, u, 3, &knots).iter().sum();
            assert!((sum - 1.0).abs() < 1e-12, "u={u} sum={sum}");
        }
    }

    #[test]
    fn uniform_knots_are_clamped() {
        let knots = uniform_clamped_knots(2, 3);
        assert_eq!(knots, vec![0.0, 0.0, 0.0, 0.0, 0.5, 1.0, 1.0, 1.0, 1.0]);
    }

    #[test]
    fn span_count_is_bounded_by_point_count() {
        assert_eq!(span_count(100.0, 10.0, 50), 10);
        assert_eq!(span_count(100.0, 10.0, 4), 4);
        assert_eq!(span_count(0.5, 10.0, 4), 1);
    }

    #[test]
    fn clamped_spline_hits_end_control_points() {
        let spline = ClampedBSpline {
            degree: 3,
            control_points: vec![
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(1.0, 2.0, 0.0),
                Point3::new(2.0, -2.0, 0.0),
                Point3::new(3.0, 0.0, 0.0),
            ],
            knots: uniform_clamped_knots(1, 3),
        };
        assert_eq!(spline.point_at(0.0), Point3::new(0.0, 0.0, 0.0));
        let end = spline.point_at(1.0);
        assert!(Tolerance::DEFAULT.approx_eq_point3(end, Point3::new(3.0, 0.0, 0.0)));
    }
}
