use crate::geom::{GeomError, Point3, Tolerance, Transform, Vec3, transform};

fn anisotropic_affine() -> Transform {
    Transform::from_matrix([
        [-1.25, 0.0, 0.0, 90.0],
        [0.0, 1.25, 0.0, -126.0],
        [0.0, 0.0, 1.25, -72.0],
        [0.0, 0.0, 0.0, 1.0],
    ])
}

#[test]
fn identity_keeps_points() {
    let points = vec![Point3::new(1.0, 2.0, 3.0), Point3::new(-4.0, 5.5, 0.25)];
    assert_eq!(transform(&points, &Transform::identity()), points);
}

#[test]
fn affine_maps_voxel_to_millimeters() {
    let points = [Point3::new(0.0, 0.0, 0.0), Point3::new(2.0, 4.0, 8.0)];
    let mapped = transform(&points, &anisotropic_affine());
    assert_eq!(mapped[0], Point3::new(90.0, -126.0, -72.0));
    assert_eq!(mapped[1], Point3::new(87.5, -121.0, -62.0));
}

#[test]
fn inverse_round_trip() {
    let affine = anisotropic_affine();
    let inverse = affine.try_inverse().expect("invertible");
    let points: Vec<Point3> = (0..10)
        .map(|i| {
            let t = f64::from(i);
            Point3::new(t, 2.0 * t - 3.0, 0.5 * t)
        })
        .collect();

    let round_trip = transform(&transform(&points, &affine), &inverse);
    for (a, b) in round_trip.iter().zip(&points) {
        assert!(Tolerance::DEFAULT.approx_eq_point3(*a, *b), "{a:?} vs {b:?}");
    }
}

#[test]
fn composed_transforms_apply_right_first() {
    let scale = Transform::scale(2.0, 2.0, 2.0);
    let shift = Transform::translate(Vec3::new(1.0, 0.0, 0.0));
    let p = Point3::new(1.0, 1.0, 1.0);
    assert_eq!(shift.compose(scale).apply_point(p), Point3::new(3.0, 2.0, 2.0));
    assert_eq!(scale.compose(shift).apply_point(p), Point3::new(4.0, 2.0, 2.0));
}

#[test]
fn singular_affine_has_no_inverse() {
    let flat = Transform::scale(1.0, 0.0, 1.0);
    assert!(flat.inverse().is_none());
    assert_eq!(flat.try_inverse(), Err(GeomError::SingularMatrix));
}
