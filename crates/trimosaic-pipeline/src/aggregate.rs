//! Per-triangle mean color by point location.
//!
//! Every pixel `(x, y)` of the source image is located in the
//! triangulation at the coordinate `(x, y)` and its color is added to the
//! containing triangle's slot.  The slot table is sized from the
//! triangle count up front; a slot with no pixels stays undefined and the
//! renderers leave that triangle unfilled.
//!
//! Rows are distributed over the rayon pool.  Each worker folds into its
//! own table and the tables are summed, so the result does not depend on
//! scheduling.

use rayon::prelude::*;

use crate::triangulate::Triangulation;
use crate::types::{Point, RgbImage};

/// Running sum and pixel count for one triangle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ColorSlot {
    /// Channel sums over covered pixels.
    pub sum: [u64; 3],
    /// Number of covered pixels.
    pub count: u64,
}

impl ColorSlot {
    fn add(&mut self, rgb: [u8; 3]) {
        for (s, c) in self.sum.iter_mut().zip(rgb) {
            *s += u64::from(c);
        }
        self.count += 1;
    }

    fn merge(&mut self, other: &Self) {
        for (s, o) in self.sum.iter_mut().zip(other.sum) {
            *s += o;
        }
        self.count += other.count;
    }

    /// Mean color, or `None` when no pixel was covered.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn mean(&self) -> Option<[f64; 3]> {
        if self.count == 0 {
            return None;
        }
        let n = self.count as f64;
        Some(self.sum.map(|s| s as f64 / n))
    }

    /// Mean color rounded to 8 bits, or `None` when no pixel was covered.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn rgb8(&self) -> Option<[u8; 3]> {
        self.mean()
            .map(|m| m.map(|c| c.round().clamp(0.0, 255.0) as u8))
    }
}

/// Mean colors for every triangle of one triangulation, indexed by
/// triangle index.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TriangleColors {
    slots: Vec<ColorSlot>,
}

impl TriangleColors {
    /// An empty table with `triangle_count` undefined slots.
    #[must_use]
    pub fn with_triangles(triangle_count: usize) -> Self {
        Self {
            slots: vec![ColorSlot::default(); triangle_count],
        }
    }

    /// Number of slots (equals the triangle count).
    #[must_use]
    pub const fn len(&self) -> usize {
        self.slots.len()
    }

    /// Returns `true` if there are no triangles.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// All slots in triangle order.
    #[must_use]
    pub fn slots(&self) -> &[ColorSlot] {
        &self.slots
    }

    /// 8-bit mean color of triangle `index`; `None` if undefined or out of
    /// range.
    #[must_use]
    pub fn color(&self, index: usize) -> Option<[u8; 3]> {
        self.slots.get(index).and_then(ColorSlot::rgb8)
    }

    /// Number of pixels aggregated into triangle `index`.
    #[must_use]
    pub fn pixel_count(&self, index: usize) -> u64 {
        self.slots.get(index).map_or(0, |s| s.count)
    }

    /// Pixels counted across all triangles.
    #[must_use]
    pub fn covered_pixels(&self) -> u64 {
        self.slots.iter().map(|s| s.count).sum()
    }

    /// Number of triangles with no covering pixel.
    #[must_use]
    pub fn undefined_count(&self) -> usize {
        self.slots.iter().filter(|s| s.count == 0).count()
    }

    fn add(&mut self, index: usize, rgb: [u8; 3]) {
        if let Some(slot) = self.slots.get_mut(index) {
            slot.add(rgb);
        }
    }

    fn merge(mut self, other: Self) -> Self {
        for (slot, o) in self.slots.iter_mut().zip(&other.slots) {
            slot.merge(o);
        }
        self
    }
}

/// Aggregate the mean color of `image` per triangle of `triangulation`.
///
/// Pixels outside the convex hull are not counted anywhere.
#[must_use]
#[tracing::instrument(skip_all, fields(triangles = triangulation.triangle_count()))]
pub fn aggregate(triangulation: &Triangulation, image: &RgbImage) -> TriangleColors {
    let triangle_count = triangulation.triangle_count();
    if triangle_count == 0 {
        return TriangleColors::default();
    }

    let (width, height) = image.dimensions();
    let colors = (0..height)
        .into_par_iter()
        .fold(
            || TriangleColors::with_triangles(triangle_count),
            |mut acc, y| {
                let mut locator = triangulation.locator();
                for x in 0..width {
                    let point = Point::new(f64::from(x), f64::from(y));
                    if let Some(index) = locator.locate(point) {
                        acc.add(index, image.get_pixel(x, y).0);
                    }
                }
                acc
            },
        )
        .reduce(
            || TriangleColors::with_triangles(triangle_count),
            TriangleColors::merge,
        );

    tracing::debug!(
        covered = colors.covered_pixels(),
        undefined = colors.undefined_count(),
        "aggregation finished"
    );
    colors
}
