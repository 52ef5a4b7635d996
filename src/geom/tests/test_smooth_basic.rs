use crate::geom::{Point3, SmoothFallback, SmoothOptions, smooth};

#[test]
fn short_sequences_are_returned_unchanged() {
    let points = vec![
        Point3::new(0.0, 0.0, 0.0),
        Point3::new(1.0, 1.0, 0.0),
        Point3::new(2.0, 0.0, 0.0),
    ];
    let (out, diag) = smooth(&points, SmoothOptions::default());
    assert_eq!(out, points);
    assert_eq!(diag.fallback, Some(SmoothFallback::TooFewPoints));
}

#[test]
fn coincident_points_are_returned_unchanged() {
    let points = vec![Point3::new(1.0, 2.0, 3.0); 6];
    let (out, diag) = smooth(&points, SmoothOptions::default());
    assert_eq!(out, points);
    assert_eq!(diag.fallback, Some(SmoothFallback::ZeroLength));
}

#[test]
fn invalid_knot_distance_falls_back() {
    let points: Vec<Point3> = (0..10).map(|i| Point3::new(f64::from(i), 0.0, 0.0)).collect();
    for knot_distance in [0.0, -1.0, f64::NAN, f64::INFINITY] {
        let (out, diag) = smooth(&points, SmoothOptions::new(knot_distance));
        assert_eq!(out, points);
        assert_eq!(diag.fallback, Some(SmoothFallback::InvalidKnotDistance));
    }
}

#[test]
fn straight_line_is_preserved() {
    let points: Vec<Point3> = (0..30).map(|i| Point3::new(f64::from(i), 0.0, 0.0)).collect();
    let (out, diag) = smooth(&points, SmoothOptions::default());
    assert!(diag.fallback.is_none());
    assert_eq!(out.len(), points.len());
    for (smoothed, original) in out.iter().zip(&points) {
        assert!((smoothed.x - original.x).abs() < 1e-9, "{smoothed:?} vs {original:?}");
        assert_eq!(smoothed.y, 0.0);
        assert_eq!(smoothed.z, 0.0);
    }
}

#[test]
fn zigzag_is_flattened_with_endpoints_kept() {
    let points: Vec<Point3> = (0..=40)
        .map(|i| {
            let y = if i % 2 == 0 { 0.5 } else { -0.5 };
            Point3::new(f64::from(i), y, 0.0)
        })
        .collect();
    let (out, diag) = smooth(&points, SmoothOptions::default());

    assert!(diag.fallback.is_none());
    assert!(diag.control_point_count > 4);
    assert_eq!(diag.output_point_count, points.len());
    assert_eq!(out.len(), points.len());
    assert!(out[0].bits_eq(points[0]));
    assert!(out[40].bits_eq(points[40]));

    for point in &out[12..=28] {
        assert!(point.y.abs() < 0.25, "not flattened: {point:?}");
        assert!(point.z.abs() < 1e-12);
    }
}

#[test]
fn smaller_knot_distance_uses_more_control_points() {
    let points: Vec<Point3> = (0..=60)
        .map(|i| {
            let t = f64::from(i) * 0.5;
            Point3::new(t, t.sin(), 0.0)
        })
        .collect();
    let (_, coarse) = smooth(&points, SmoothOptions::new(10.0));
    let (_, fine) = smooth(&points, SmoothOptions::new(2.0));
    assert!(coarse.fallback.is_none());
    assert!(fine.fallback.is_none());
    assert!(fine.control_point_count > coarse.control_point_count);
}

#[test]
fn quadratic_fit_keeps_lines_and_endpoints() {
    let line: Vec<Point3> = (0..12).map(|i| Point3::new(f64::from(i), 0.0, 0.0)).collect();
    let options = SmoothOptions::new(3.0).with_degree(2);
    let (out, diag) = smooth(&line, options);
    assert!(diag.fallback.is_none());
    assert_eq!(out.len(), line.len());
    for (smoothed, original) in out.iter().zip(&line) {
        assert!((smoothed.x - original.x).abs() < 1e-9, "{smoothed:?} vs {original:?}");
        assert!(smoothed.y.abs() < 1e-12);
    }

    let three = vec![
        Point3::new(0.0, 0.0, 0.0),
        Point3::new(1.0, 1.0, 0.0),
        Point3::new(2.0, 0.0, 0.0),
    ];
    let (out, diag) = smooth(&three, options);
    assert!(diag.fallback.is_none());
    assert!(out[0].bits_eq(three[0]));
    assert!(out[2].bits_eq(three[2]));
}

#[test]
fn huge_degree_falls_back_instead_of_overflowing() {
    let points: Vec<Point3> = (0..10).map(|i| Point3::new(f64::from(i), 0.0, 0.0)).collect();
    let (out, diag) = smooth(&points, SmoothOptions::default().with_degree(usize::MAX));
    assert_eq!(out, points);
    assert_eq!(diag.fallback, Some(SmoothFallback::TooFewPoints));
}
