//! trimosaic-pipeline: Pure low-poly mosaic pipeline (sans-IO).
//!
//! Converts a raster image into triangle mosaics through:
//! decode -> luminance -> difference-of-Gaussians saliency ->
//! importance sampling -> Delaunay triangulation -> per-triangle mean
//! color.
//!
//! This crate has **no I/O dependencies** -- it operates on in-memory
//! byte slices and returns structured data. Rendering and file output
//! live in `trimosaic-export` and the `trimosaic` binary.

pub mod aggregate;
pub mod blur;
pub mod diagnostics;
pub mod frame;
pub mod grayscale;
pub mod pipeline;
pub mod saliency;
pub mod sample;
pub mod schedule;
pub mod triangulate;
pub mod types;

pub use aggregate::{ColorSlot, TriangleColors};
pub use diagnostics::{FrameDiagnostics, RunDiagnostics};
pub use frame::Frame;
pub use pipeline::{Pipeline, Rollout, Sampled};
pub use saliency::{SaliencyField, SaliencyParams};
pub use sample::{ImportanceSampler, SamplePool};
pub use schedule::{PointSchedule, ScheduleFormula};
pub use triangulate::{Locator, PointSet, Triangulation};
pub use types::{
    AlphaHandling, Dimensions, MosaicConfig, PipelineError, Point, RgbImage, RgbaImage,
    SamplePoint,
};

/// Run the whole pipeline for a single mosaic with `points` sampled
/// points.
///
/// # Pipeline steps
///
/// 1. Validate the configuration
/// 2. Decode the image and compute perceptual luminance
/// 3. Saliency: fine and coarse Gaussian blur, difference, normalization
/// 4. Importance sampling of `config.draws` candidates
/// 5. Triangulate the four anchors plus the first `points` samples
/// 6. Aggregate the mean color of every triangle
///
/// Use [`Pipeline`] directly to build several frames from one sampled
/// pool.
///
/// # Errors
///
/// Returns [`PipelineError::InvalidConfig`] for an invalid config,
/// [`PipelineError::EmptyInput`], [`PipelineError::ImageDecode`] or
/// [`PipelineError::EmptyImage`] for unusable input, and
/// [`PipelineError::PoolExhausted`] if fewer than `points` candidates were
/// accepted.
pub fn process(
    image_bytes: &[u8],
    config: &MosaicConfig,
    points: usize,
) -> Result<Frame, PipelineError> {
    Pipeline::new(image_bytes.to_vec(), config.clone())
        .decode()?
        .saliency()
        .sample()
        .frame(points)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn encode_png(img: &image::RgbImage) -> Vec<u8> {
        let mut buf = Vec::new();
        let encoder = image::codecs::png::PngEncoder::new(&mut buf);
        image::ImageEncoder::write_image(
            encoder,
            img.as_raw(),
            img.width(),
            img.height(),
            image::ExtendedColorType::Rgb8,
        )
        .unwrap();
        buf
    }

    /// Left half black, right half white.
    fn sharp_edge_png(width: u32, height: u32) -> Vec<u8> {
        let img = image::RgbImage::from_fn(width, height, |x, _y| {
            if x < width / 2 {
                image::Rgb([0, 0, 0])
            } else {
                image::Rgb([255, 255, 255])
            }
        });
        encode_png(&img)
    }

    fn config() -> MosaicConfig {
        MosaicConfig {
            draws: 50_000,
            ..MosaicConfig::default()
        }
    }

    #[test]
    fn process_empty_input() {
        let result = process(&[], &config(), 0);
        assert!(matches!(result, Err(PipelineError::EmptyInput)));
    }

    #[test]
    fn process_corrupt_input() {
        let result = process(&[0xFF, 0x00], &config(), 0);
        assert!(matches!(result, Err(PipelineError::ImageDecode(_))));
    }

    #[test]
    fn process_flat_gray_image_gives_two_triangles() {
        let flat = image::RgbImage::from_pixel(10, 10, image::Rgb([128, 128, 128]));
        let frame = process(&encode_png(&flat), &config(), 0).unwrap();
        let filled: Vec<_> = frame.filled_triangles().collect();
        assert_eq!(filled.len(), 2);
        assert!(filled.iter().all(|(_, c)| *c == [128, 128, 128]));
    }

    #[test]
    fn process_flat_image_cannot_serve_sampled_points() {
        let flat = image::RgbImage::from_pixel(10, 10, image::Rgb([128, 128, 128]));
        let result = process(&encode_png(&flat), &config(), 1);
        assert!(matches!(
            result,
            Err(PipelineError::PoolExhausted {
                requested: 1,
                available: 0
            })
        ));
    }

    #[test]
    fn process_sharp_edge_concentrates_points_near_the_edge() {
        let frame = process(&sharp_edge_png(60, 40), &config(), 200).unwrap();
        assert_eq!(frame.sampled_points(), 200);
        assert_eq!(frame.dimensions(), Dimensions::new(60, 40));
        // Anchors span the whole image.
        assert_eq!(frame.diagnostics().covered_pixels, 60 * 40);

        let near_edge = frame
            .triangulation()
            .points()
            .iter()
            .skip(4)
            .filter(|p| (p.x - 30.0).abs() < 12.0)
            .count();
        // The band is under 40% of the width but holds most of the points.
        assert!(near_edge > 100, "only {near_edge} of 200 points near the edge");
    }

    #[test]
    fn process_is_deterministic() {
        let png = sharp_edge_png(40, 30);
        let a = process(&png, &config(), 50).unwrap();
        let b = process(&png, &config(), 50).unwrap();
        assert_eq!(a.triangulation().triangles(), b.triangulation().triangles());
        assert_eq!(a.colors(), b.colors());
    }
}
