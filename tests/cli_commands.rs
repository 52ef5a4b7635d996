use std::path::{Path, PathBuf};

use rand::{Rng, SeedableRng, rngs::StdRng};
use tempfile::TempDir;

use streamlines::cli;
use streamlines::geom::{Point3, SmoothOptions, Transform};
use streamlines::io::{self, IoError, Space};
use streamlines::{StreamlineError, Streamlines};

struct Fixture {
    dir: TempDir,
}

impl Fixture {
    fn new() -> Self {
        let dir = TempDir::new().expect("temp dir");

        let short = Streamlines::from_sequences([
            vec![Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 0.0, 0.0)],
            vec![Point3::new(0.0, 0.0, 0.0), Point3::new(0.0, 1.0, 0.0)],
            vec![Point3::new(0.0, 0.0, 0.0), Point3::new(0.0, 0.0, 1.0)],
        ]);
        io::save(&short, dir.path().join("short.trk")).expect("save short");

        let mut rng = StdRng::seed_from_u64(42);
        let random: Vec<Point3> = (0..100)
            .map(|_| {
                Point3::new(
                    rng.random_range(-1.0..1.0),
                    rng.random_range(-1.0..1.0),
                    rng.random_range(-1.0..1.0),
                )
            })
            .collect();
        io::save(
            &Streamlines::from_sequences([random]),
            dir.path().join("random.trk"),
        )
        .expect("save random");

        io::save(&Streamlines::new(), dir.path().join("empty.trk")).expect("save empty");

        Self { dir }
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }
}

fn load(path: &Path) -> Streamlines {
    io::load(path, Space::Physical).expect("load output")
}

#[test]
fn filter_drops_short_streamlines() {
    let fx = Fixture::new();
    let output = fx.path("filter-1.trk");

    let kept = cli::filter(fx.path("short.trk"), &output, 1.1).expect("filter");
    assert_eq!(kept, 0);
    assert_eq!(load(&output).len(), 0);

    let output = fx.path("filter-2.trk");
    let kept = cli::filter(fx.path("short.trk"), &output, 0.5).expect("filter");
    assert_eq!(kept, 3);
    assert_eq!(load(&output).len(), 3);
}

#[test]
fn merge_concatenates_in_order() {
    let fx = Fixture::new();
    let output = fx.path("merge-1.trk");

    let count = cli::merge(&[fx.path("short.trk"), fx.path("random.trk")], &output)
        .expect("merge");
    assert_eq!(count, 4);

    let merged = load(&output);
    assert_eq!(merged.len(), 4);
    let short = load(&fx.path("short.trk"));
    for (got, want) in merged.iter().zip(&short) {
        assert_eq!(got.content_hash(), want.content_hash());
    }
    assert_eq!(merged[3].len(), 100);
}

#[test]
fn merge_with_empty_file() {
    let fx = Fixture::new();
    let output = fx.path("merge-2.trk");

    let count =
        cli::merge(&[fx.path("short.trk"), fx.path("empty.trk")], &output).expect("merge");
    assert_eq!(count, 3);
    assert_eq!(load(&output).len(), 3);
}

#[test]
fn merge_keeps_first_header() {
    let fx = Fixture::new();
    let affine = Transform::scale(2.0, 2.0, 2.0);
    let scaled = Streamlines::from_sequences([vec![
        Point3::new(0.0, 0.0, 0.0),
        Point3::new(4.0, 0.0, 0.0),
    ]])
    .with_header(affine, [64, 64, 32], [2.0, 2.0, 2.0]);
    io::save(&scaled, fx.path("scaled.trk")).expect("save scaled");

    let output = fx.path("merge-3.trk");
    cli::merge(&[fx.path("scaled.trk"), fx.path("short.trk")], &output).expect("merge");

    let merged = load(&output);
    assert_eq!(merged.len(), 4);
    assert_eq!(merged.affine(), &affine);
    assert_eq!(merged.reference_volume_shape(), [64, 64, 32]);
}

#[test]
fn merge_fails_on_missing_input() {
    let fx = Fixture::new();
    let result = cli::merge(&[fx.path("short.trk"), fx.path("nope.trk")], fx.path("out.trk"));
    assert!(matches!(result, Err(IoError::Io(_))));
}

#[test]
fn reorient_flips_against_template() {
    let fx = Fixture::new();
    let input = fx.path("pair.trk");
    let pair = Streamlines::from_sequences([
        vec![Point3::new(0.0, 0.0, 0.0), Point3::new(10.0, 0.0, 0.0)],
        vec![Point3::new(10.0, 1.0, 0.0), Point3::new(0.0, 1.0, 0.0)],
    ]);
    io::save(&pair, &input).expect("save pair");

    let output = fx.path("pair-reoriented.trk");
    cli::reorient(&input, &output, None).expect("reorient");
    let reoriented = load(&output);
    assert_eq!(reoriented[0].first(), Some(Point3::new(0.0, 0.0, 0.0)));
    assert_eq!(reoriented[1].first(), Some(Point3::new(0.0, 1.0, 0.0)));

    cli::reorient(&input, &output, Some(1)).expect("reorient");
    let reoriented = load(&output);
    assert_eq!(reoriented[0].first(), Some(Point3::new(10.0, 0.0, 0.0)));

    assert!(matches!(
        cli::reorient(&input, &output, Some(5)),
        Err(IoError::Streamline(StreamlineError::IndexOutOfRange { index: 5, len: 2 }))
    ));
}

#[test]
fn smooth_keeps_point_counts() {
    let fx = Fixture::new();
    let input = fx.path("zigzag.trk");
    let zigzag: Vec<Point3> = (0..=40)
        .map(|i| Point3::new(f64::from(i), if i % 2 == 0 { 0.5 } else { -0.5 }, 0.0))
        .collect();
    io::save(&Streamlines::from_sequences([zigzag]), &input).expect("save zigzag");

    let output = fx.path("zigzag-smooth.trk");
    cli::smooth(&input, &output, SmoothOptions::default()).expect("smooth");

    let smoothed = load(&output);
    assert_eq!(smoothed[0].len(), 41);
    let middle = smoothed[0].get(20).expect("middle point");
    assert!(middle.y.abs() < 0.25);
    let first = smoothed[0].first().expect("first point");
    assert!(first.distance_to(Point3::new(0.0, 0.5, 0.0)) < 1e-4);
}

#[test]
fn info_summarizes_file() {
    let fx = Fixture::new();
    let summary = cli::info(fx.path("short.trk")).expect("info");

    assert_eq!(summary.streamline_count, 3);
    assert_eq!(summary.point_count, 6);
    assert!((summary.mean_length - 1.0).abs() < 1e-6);
    assert_eq!(summary.voxel_order, "RAS");

    let json = serde_json::to_value(&summary).expect("serializable");
    assert_eq!(json["streamline_count"], 3);
    assert!(summary.to_string().contains("streamlines:"));

    let empty = cli::info(fx.path("empty.trk")).expect("info");
    assert_eq!(empty.streamline_count, 0);
    assert_eq!(empty.max_length, 0.0);
}
