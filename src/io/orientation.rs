//! Axis orientation codes (`RAS`, `LPS`, ...) of voxel-to-rasmm affines.

use crate::geom::Transform;

use super::IoError;

/// Orientation codes assumed when a header leaves the field blank.
pub(crate) const DEFAULT_VOXEL_ORDER: [char; 3] = ['L', 'P', 'S'];

/// Nearest-axis orientation codes of `affine`.
///
/// Entry `j` names the world direction voxel axis `j` points along: `R`/`L`
/// for x, `A`/`P` for y, `S`/`I` for z. Axes are matched greedily by the
/// largest normalized component. Degenerate columns receive the remaining
/// world axes in positive direction.
#[must_use]
pub fn axcodes(affine: &Transform) -> [char; 3] {
    let m = affine.as_matrix();

    let mut block = [[0.0_f64; 3]; 3];
    for col in 0..3 {
        let norm = (0..3).map(|row| m[row][col] * m[row][col]).sum::<f64>().sqrt();
        if norm > 0.0 && norm.is_finite() {
            for row in 0..3 {
                block[row][col] = m[row][col] / norm;
            }
        }
    }

    let mut codes: [Option<char>; 3] = [None; 3];
    let mut row_used = [false; 3];
    for _ in 0..3 {
        let mut best: Option<(usize, usize, f64)> = None;
        for row in (0..3).filter(|r| !row_used[*r]) {
            for col in (0..3).filter(|c| codes[*c].is_none()) {
                let value = block[row][col];
                if value.abs() > best.map_or(0.0, |(_, _, v)| v.abs()) {
                    best = Some((row, col, value));
                }
            }
        }
        let Some((row, col, value)) = best else { break };
        codes[col] = Some(axis_code(row, value < 0.0));
        row_used[row] = true;
    }

    let mut free_rows = (0..3).filter(|r| !row_used[*r]);
    let mut result = ['R', 'A', 'S'];
    for (col, code) in codes.iter().enumerate() {
        result[col] = match code {
            Some(c) => *c,
            None => free_rows.next().map_or('R', |row| axis_code(row, false)),
        };
    }
    result
}

const fn axis_code(world_axis: usize, negative: bool) -> char {
    match (world_axis, negative) {
        (0, false) => 'R',
        (0, true) => 'L',
        (1, false) => 'A',
        (1, true) => 'P',
        (2, false) => 'S',
        _ => 'I',
    }
}

/// World axis and direction sign of an orientation code.
fn world_axis(code: char) -> Option<(usize, bool)> {
    match code.to_ascii_uppercase() {
        'R' => Some((0, false)),
        'L' => Some((0, true)),
        'A' => Some((1, false)),
        'P' => Some((1, true)),
        'S' => Some((2, false)),
        'I' => Some((2, true)),
        _ => None,
    }
}

/// Parses a header `voxel_order` field. A blank field means
/// [`DEFAULT_VOXEL_ORDER`].
pub(crate) fn parse_voxel_order(raw: &[u8]) -> Result<[char; 3], IoError> {
    let text: String = raw
        .iter()
        .take_while(|b| **b != 0)
        .map(|b| char::from(*b))
        .collect();
    let text = text.trim();
    if text.is_empty() {
        log::warn!("voxel order is blank, assuming LPS");
        return Ok(DEFAULT_VOXEL_ORDER);
    }

    let chars: Vec<char> = text.chars().map(|c| c.to_ascii_uppercase()).collect();
    let invalid = || IoError::InvalidHeader(format!("voxel order `{text}`"));
    let [a, b, c] = chars.as_slice() else {
        return Err(invalid());
    };
    let codes = [*a, *b, *c];

    let mut seen = [false; 3];
    for code in codes {
        let (axis, _) = world_axis(code).ok_or_else(invalid)?;
        if seen[axis] {
            return Err(invalid());
        }
        seen[axis] = true;
    }
    Ok(codes)
}

/// Voxel-index transform from axes ordered as `from` to axes ordered as
/// `to`. `dims` are the volume dimensions along the `from` axes; flipped
/// axes map index `i` to `dims - 1 - i`.
pub(crate) fn reorder_transform(from: [char; 3], to: [char; 3], dims: [f64; 3]) -> Transform {
    let mut m = [[0.0; 4]; 4];
    m[3][3] = 1.0;

    for (src, code) in from.iter().enumerate() {
        let Some((axis, negative)) = world_axis(*code) else {
            continue;
        };
        let target = to
            .iter()
            .position(|c| world_axis(*c).is_some_and(|(a, _)| a == axis));
        let Some((dst, dst_negative)) =
            target.and_then(|dst| world_axis(to[dst]).map(|(_, n)| (dst, n)))
        else {
            continue;
        };

        if negative == dst_negative {
            m[dst][src] = 1.0;
        } else {
            m[dst][src] = -1.0;
            m[dst][3] = dims[src] - 1.0;
        }
    }
    Transform::from_matrix(m)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::{Point3, Vec3};

    #[test]
    fn identity_is_ras() {
        assert_eq!(axcodes(&Transform::identity()), ['R', 'A', 'S']);
    }

    #[test]
    fn flipped_x_is_las() {
        let affine = Transform::translate(Vec3::new(90.0, -126.0, -72.0))
            .compose(Transform::scale(-1.25, 1.25, 1.25));
        assert_eq!(axcodes(&affine), ['L', 'A', 'S']);
    }

    #[test]
    fn permuted_axes() {
        let affine = Transform::from_matrix([
            [0.0, 0.0, 2.0, 0.0],
            [-2.0, 0.0, 0.0, 0.0],
            [0.0, 2.0, 0.0, 0.0],
            [0.0, 0.0, 0.0, 1.0],
        ]);
        assert_eq!(axcodes(&affine), ['P', 'S', 'R']);
    }

    #[test]
    fn voxel_order_parsing() {
        assert_eq!(parse_voxel_order(b"LAS\0").expect("valid"), ['L', 'A', 'S']);
        assert_eq!(parse_voxel_order(b"ras\0").expect("valid"), ['R', 'A', 'S']);
        assert_eq!(parse_voxel_order(b"\0\0\0\0").expect("blank"), DEFAULT_VOXEL_ORDER);
        assert!(parse_voxel_order(b"LLS\0").is_err());
        assert!(parse_voxel_order(b"XYZ\0").is_err());
    }

    #[test]
    fn reorder_flips_and_permutes() {
        let same = reorder_transform(['L', 'A', 'S'], ['L', 'A', 'S'], [10.0, 10.0, 10.0]);
        assert_eq!(same, Transform::identity());

        let flip = reorder_transform(['L', 'A', 'S'], ['R', 'A', 'S'], [10.0, 20.0, 30.0]);
        assert_eq!(flip.apply_point(Point3::new(2.0, 3.0, 4.0)), Point3::new(7.0, 3.0, 4.0));

        let swap = reorder_transform(['A', 'R', 'S'], ['R', 'A', 'S'], [10.0, 20.0, 30.0]);
        assert_eq!(swap.apply_point(Point3::new(2.0, 3.0, 4.0)), Point3::new(3.0, 2.0, 4.0));
    }
}
