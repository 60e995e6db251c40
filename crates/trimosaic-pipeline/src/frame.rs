//! One rendered state of the mosaic: a triangulation of a point-set
//! prefix plus the mean color of every triangle.

use std::time::Instant;

use crate::aggregate::{TriangleColors, aggregate};
use crate::diagnostics::FrameDiagnostics;
use crate::triangulate::{PointSet, Triangulation};
use crate::types::{Dimensions, Point, RgbImage};

/// A triangulated, colored mosaic ready for rendering.
#[derive(Debug)]
pub struct Frame {
    dimensions: Dimensions,
    sampled_points: usize,
    triangulation: Triangulation,
    colors: TriangleColors,
    diagnostics: FrameDiagnostics,
}

impl Frame {
    /// Triangulate `points` and color each triangle from `image`.
    ///
    /// `points` must lie in the pixel grid of `image`.
    #[must_use]
    #[tracing::instrument(skip_all, fields(points = points.len()))]
    pub fn build(image: &RgbImage, points: &PointSet) -> Self {
        let start = Instant::now();
        let triangulation = Triangulation::build(points);
        let triangulate = start.elapsed();

        let start = Instant::now();
        let colors = aggregate(&triangulation, image);
        let aggregate = start.elapsed();

        let diagnostics = FrameDiagnostics {
            sampled_points: points.sampled_count(),
            vertices: triangulation.vertex_count(),
            triangles: triangulation.triangle_count(),
            covered_pixels: colors.covered_pixels(),
            undefined_triangles: colors.undefined_count(),
            triangulate,
            aggregate,
        };
        tracing::debug!(summary = %diagnostics.summary(), "frame built");

        Self {
            dimensions: Dimensions::new(image.width(), image.height()),
            sampled_points: points.sampled_count(),
            triangulation,
            colors,
            diagnostics,
        }
    }

    /// Dimensions of the source image.
    #[must_use]
    pub const fn dimensions(&self) -> Dimensions {
        self.dimensions
    }

    /// Number of sampled points in the frame (anchors excluded).
    #[must_use]
    pub const fn sampled_points(&self) -> usize {
        self.sampled_points
    }

    /// The triangulation.
    #[must_use]
    pub const fn triangulation(&self) -> &Triangulation {
        &self.triangulation
    }

    /// Per-triangle colors, indexed like the triangulation's triangles.
    #[must_use]
    pub const fn colors(&self) -> &TriangleColors {
        &self.colors
    }

    /// Counts and timings for this frame.
    #[must_use]
    pub const fn diagnostics(&self) -> &FrameDiagnostics {
        &self.diagnostics
    }

    /// Triangles with a defined color, as corner positions and 8-bit
    /// RGB, in triangle order.
    pub fn filled_triangles(&self) -> impl Iterator<Item = ([Point; 3], [u8; 3])> + '_ {
        (0..self.triangulation.triangle_count()).filter_map(|i| {
            let color = self.colors.color(i)?;
            let corners = self.triangulation.triangle_points(i)?;
            Some((corners, color))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SamplePoint;

    #[test]
    fn flat_image_frame_has_two_gray_triangles() {
        let image = RgbImage::from_pixel(10, 10, image::Rgb([128, 128, 128]));
        let frame = Frame::build(&image, &PointSet::new(Dimensions::new(10, 10), &[]));
        assert_eq!(frame.dimensions(), Dimensions::new(10, 10));
        assert_eq!(frame.sampled_points(), 0);
        let filled: Vec<_> = frame.filled_triangles().collect();
        assert_eq!(filled.len(), 2);
        assert!(filled.iter().all(|(_, c)| *c == [128, 128, 128]));
        assert_eq!(frame.diagnostics().covered_pixels, 100);
        assert_eq!(frame.diagnostics().triangles, 2);
        assert_eq!(frame.diagnostics().vertices, 4);
    }

    #[test]
    fn single_pixel_frame_is_blank() {
        let image = RgbImage::from_pixel(1, 1, image::Rgb([1, 2, 3]));
        let frame = Frame::build(&image, &PointSet::new(Dimensions::new(1, 1), &[]));
        assert!(frame.triangulation().is_empty());
        assert_eq!(frame.filled_triangles().count(), 0);
        assert_eq!(frame.diagnostics().covered_pixels, 0);
    }

    #[test]
    fn sampled_count_excludes_anchors() {
        let image = RgbImage::from_pixel(8, 8, image::Rgb([0, 0, 0]));
        let samples = [
            SamplePoint {
                x: 3,
                y: 4,
                saliency: 1.0,
            },
            SamplePoint {
                x: 5,
                y: 2,
                saliency: 0.5,
            },
        ];
        let frame = Frame::build(&image, &PointSet::new(Dimensions::new(8, 8), &samples));
        assert_eq!(frame.sampled_points(), 2);
        assert_eq!(frame.diagnostics().sampled_points, 2);
        assert_eq!(frame.diagnostics().covered_pixels, 64);
    }
}
