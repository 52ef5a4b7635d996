use std::fmt;
use std::ops::{AddAssign, Index};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::geom::{CompressOptions, GeomError, Point3, SmoothOptions, Transform};
use crate::io::Space;

use super::{Streamline, StreamlineError};

/// An ordered collection of streamlines sharing one reference volume.
///
/// `affine` maps voxel indices of the reference volume to rasmm. `space`
/// records which of the two coordinate systems the stored points are in.
/// Batch operations apply to every member in order.
#[derive(Debug, Clone, PartialEq)]
pub struct Streamlines {
    items: Vec<Streamline>,
    affine: Transform,
    reference_volume_shape: [u32; 3],
    voxel_sizes: [f64; 3],
    space: Space,
}

impl Default for Streamlines {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            affine: Transform::identity(),
            reference_volume_shape: [1, 1, 1],
            voxel_sizes: [1.0, 1.0, 1.0],
            space: Space::Physical,
        }
    }
}

impl Streamlines {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Wraps raw point sequences, each becoming one member.
    pub fn from_sequences<I>(sequences: I) -> Self
    where
        I: IntoIterator<Item = Vec<Point3>>,
    {
        sequences.into_iter().map(Streamline::from_points).collect()
    }

    /// Replaces the reference volume header.
    #[must_use]
    pub fn with_header(
        mut self,
        affine: Transform,
        reference_volume_shape: [u32; 3],
        voxel_sizes: [f64; 3],
    ) -> Self {
        self.affine = affine;
        self.reference_volume_shape = reference_volume_shape;
        self.voxel_sizes = voxel_sizes;
        self
    }

    #[must_use]
    pub const fn affine(&self) -> &Transform {
        &self.affine
    }

    #[must_use]
    pub const fn reference_volume_shape(&self) -> [u32; 3] {
        self.reference_volume_shape
    }

    #[must_use]
    pub const fn voxel_sizes(&self) -> [f64; 3] {
        self.voxel_sizes
    }

    #[must_use]
    pub const fn space(&self) -> Space {
        self.space
    }

    pub(crate) fn set_space(&mut self, space: Space) {
        self.space = space;
    }

    // ------------------------------------------------------------------
    // Membership
    // ------------------------------------------------------------------

    pub fn push(&mut self, streamline: Streamline) {
        self.items.push(streamline);
    }

    /// Moves every member of `other` to the end of `self`. The header of
    /// `self` is kept; points of `other` are taken as they are.
    pub fn append(&mut self, other: &mut Self) {
        if other.space != self.space && !other.items.is_empty() {
            log::warn!(
                "appending {} streamlines stored in {:?} space to a collection in {:?} space",
                other.items.len(),
                other.space,
                self.space
            );
        }
        self.items.append(&mut other.items);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Streamline> {
        self.items.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Streamline> {
        self.items.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, Streamline> {
        self.items.iter_mut()
    }

    /// Whether a member has exactly the points of `streamline`.
    #[must_use]
    pub fn contains(&self, streamline: &Streamline) -> bool {
        let hash = streamline.content_hash();
        self.items.iter().any(|s| s.content_hash() == hash)
    }

    #[must_use]
    pub fn lengths(&self) -> Vec<f64> {
        self.items.iter().map(Streamline::length).collect()
    }

    /// Members whose mask entry is `true`, with the header preserved.
    ///
    /// # Errors
    /// [`StreamlineError::MaskLengthMismatch`] when the mask length differs
    /// from the collection size.
    pub fn select(&self, mask: &[bool]) -> Result<Self, StreamlineError> {
        if mask.len() != self.items.len() {
            return Err(StreamlineError::MaskLengthMismatch {
                expected: self.items.len(),
                found: mask.len(),
            });
        }
        let items = self
            .items
            .iter()
            .zip(mask)
            .filter(|&(_, keep)| *keep)
            .map(|(s, _)| s.clone())
            .collect();
        Ok(self.with_items(items))
    }

    fn with_items(&self, items: Vec<Streamline>) -> Self {
        Self {
            items,
            affine: self.affine,
            reference_volume_shape: self.reference_volume_shape,
            voxel_sizes: self.voxel_sizes,
            space: self.space,
        }
    }

    // ------------------------------------------------------------------
    // Batch operations
    // ------------------------------------------------------------------

    pub fn compress(&mut self, options: CompressOptions) -> &mut Self {
        for_each_member(&mut self.items, |s| {
            s.compress(options);
        });
        self
    }

    /// # Errors
    /// [`GeomError::InvalidSampleCount`] (wrapped) when `count < 2`; no
    /// member is touched in that case.
    pub fn resample(&mut self, count: usize) -> Result<&mut Self, StreamlineError> {
        if count < 2 {
            return Err(GeomError::InvalidSampleCount(count).into());
        }
        for_each_member(&mut self.items, |s| {
            s.resample_validated(count);
        });
        Ok(self)
    }

    pub fn smooth(&mut self, options: SmoothOptions) -> &mut Self {
        for_each_member(&mut self.items, |s| {
            s.smooth(options);
        });
        self
    }

    /// Orients every member like `template`, or like the first member when
    /// no template is given.
    pub fn reorient(&mut self, template: Option<&Streamline>) -> &mut Self {
        let template = match template {
            Some(t) => t.clone(),
            None => match self.items.first() {
                Some(first) => first.clone(),
                None => return self,
            },
        };
        for_each_member(&mut self.items, |s| {
            s.reorient(&template);
        });
        self
    }

    pub fn reverse(&mut self) -> &mut Self {
        for_each_member(&mut self.items, |s| {
            s.reverse();
        });
        self
    }

    pub fn transform(&mut self, affine: &Transform) -> &mut Self {
        for_each_member(&mut self.items, |s| {
            s.transform(affine);
        });
        self
    }

    /// Keeps members with `length >= min_length`, in order. `None` keeps
    /// everything.
    pub fn filter(&mut self, min_length: Option<f64>) -> &mut Self {
        if let Some(min_length) = min_length {
            let before = self.items.len();
            self.items.retain(|s| s.length() >= min_length);
            log::debug!(
                "filter: kept {} of {before} streamlines (min length {min_length})",
                self.items.len()
            );
        }
        self
    }

    // ------------------------------------------------------------------
    // Coordinate spaces
    // ------------------------------------------------------------------

    /// Maps voxel-space points to rasmm through `affine`.
    pub fn to_physical(&mut self) -> &mut Self {
        if self.space == Space::Voxel {
            let affine = self.affine;
            self.transform(&affine);
            self.space = Space::Physical;
        }
        self
    }

    /// Maps rasmm points to voxel space through the inverse of `affine`.
    ///
    /// # Errors
    /// [`StreamlineError::SingularAffine`] when `affine` has no inverse.
    pub fn to_voxel(&mut self) -> Result<&mut Self, StreamlineError> {
        if self.space == Space::Physical {
            let inverse = self
                .affine
                .try_inverse()
                .map_err(|_| StreamlineError::SingularAffine)?;
            self.transform(&inverse);
            self.space = Space::Voxel;
        }
        Ok(self)
    }
}

#[cfg(feature = "parallel")]
fn for_each_member<F>(items: &mut [Streamline], op: F)
where
    F: Fn(&mut Streamline) + Send + Sync,
{
    items.par_iter_mut().for_each(op);
}

#[cfg(not(feature = "parallel"))]
fn for_each_member<F>(items: &mut [Streamline], op: F)
where
    F: Fn(&mut Streamline),
{
    items.iter_mut().for_each(op);
}

impl Index<usize> for Streamlines {
    type Output = Streamline;

    fn index(&self, index: usize) -> &Self::Output {
        &self.items[index]
    }
}

impl AddAssign for Streamlines {
    fn add_assign(&mut self, mut rhs: Self) {
        self.append(&mut rhs);
    }
}

impl FromIterator<Streamline> for Streamlines {
    fn from_iter<I: IntoIterator<Item = Streamline>>(iter: I) -> Self {
        Self {
            items: iter.into_iter().collect(),
            ..Self::default()
        }
    }
}

impl Extend<Streamline> for Streamlines {
    fn extend<I: IntoIterator<Item = Streamline>>(&mut self, iter: I) {
        self.items.extend(iter);
    }
}

impl IntoIterator for Streamlines {
    type Item = Streamline;
    type IntoIter = std::vec::IntoIter<Streamline>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl<'a> IntoIterator for &'a Streamlines {
    type Item = &'a Streamline;
    type IntoIter = std::slice::Iter<'a, Streamline>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

impl fmt::Display for Streamlines {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "streamlines: {} items", self.items.len())
    }
}
