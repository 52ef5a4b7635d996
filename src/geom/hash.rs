//! Content identifiers for point sequences.
//!
//! The hash covers the point count and the IEEE-754 bit pattern of every
//! coordinate, in order. Equality is exact: coordinates that differ in
//! their last bit, or `0.0` versus `-0.0`, hash differently.

use std::fmt;

use sha2::{Digest, Sha256};

use super::core::Point3;

/// SHA-256 digest of a point sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContentHash([u8; 32]);

impl ContentHash {
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Leading eight bytes, for use where a `u64` key is wanted.
    #[must_use]
    pub fn short(&self) -> u64 {
        let mut head = [0u8; 8];
        head.copy_from_slice(&self.0[..8]);
        u64::from_le_bytes(head)
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

/// Hashes `points` by exact byte representation.
#[must_use]
pub fn content_hash(points: &[Point3]) -> ContentHash {
    let mut hasher = Sha256::new();
    hasher.update((points.len() as u64).to_le_bytes());
    for point in points {
        hasher.update(point.x.to_bits().to_le_bytes());
        hasher.update(point.y.to_bits().to_le_bytes());
        hasher.update(point.z.to_bits().to_le_bytes());
    }
    let digest = hasher.finalize();
    let mut bytes = [0u8; 32];
    bytes.copy_from_slice(&digest);
    ContentHash(bytes)
}

/// Content equality, defined as equality of [`content_hash`].
#[must_use]
pub fn content_eq(left: &[Point3], right: &[Point3]) -> bool {
    content_hash(left) == content_hash(right)
}
