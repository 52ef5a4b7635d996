use crate::geom::{Point3, content_eq, content_hash, reverse};

fn sample() -> Vec<Point3> {
    vec![
        Point3::new(0.0, 1.0, 2.0),
        Point3::new(3.5, -4.25, 6.0),
        Point3::new(7.0, 8.0, 9.125),
    ]
}

#[test]
fn hash_is_deterministic() {
    let a = sample();
    let b = sample();
    assert_eq!(content_hash(&a), content_hash(&b));
    assert!(content_eq(&a, &b));
}

#[test]
fn tiny_perturbation_changes_hash() {
    let a = sample();
    let mut b = sample();
    b[1].y += 1e-6;
    assert_ne!(content_hash(&a), content_hash(&b));
    assert!(!content_eq(&a, &b));
}

#[test]
fn order_and_length_are_hashed() {
    let a = sample();
    assert_ne!(content_hash(&a), content_hash(&reverse(&a)));
    assert_ne!(content_hash(&a), content_hash(&a[..2]));
    assert_ne!(content_hash(&[]), content_hash(&[Point3::ORIGIN]));
}

#[test]
fn signed_zero_is_distinct() {
    let positive = [Point3::new(0.0, 0.0, 0.0)];
    let negative = [Point3::new(-0.0, 0.0, 0.0)];
    assert_ne!(content_hash(&positive), content_hash(&negative));
}

#[test]
fn display_is_lowercase_hex() {
    let text = content_hash(&sample()).to_string();
    assert_eq!(text.len(), 64);
    assert!(text.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));

    let hash = content_hash(&sample());
    let mut head = [0u8; 8];
    head.copy_from_slice(&hash.as_bytes()[..8]);
    assert_eq!(hash.short(), u64::from_le_bytes(head));
}
