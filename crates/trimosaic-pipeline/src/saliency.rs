//! Difference-of-Gaussians saliency field.
//!
//! The field measures local edge strength: the luminance is blurred at a
//! fine and a coarse sigma, and the difference `coarse - fine` is large
//! wherever detail is lost by the wider blur.  Negative differences are
//! multiplied by a configurable factor (0.1 by default) before taking
//! magnitudes, so one edge polarity is emphasized over the other.  The
//! magnitudes are normalized by their maximum and square-rooted, which
//! maps the strongest pixel to exactly 1.0 and lifts weak edges.

use serde::{Deserialize, Serialize};

use crate::blur::gaussian_blur;
use crate::types::{Dimensions, GrayImage, LumaImage};

/// Largest `|diff|` (on the 0..=255 luminance scale) still treated as a
/// flat image.  Blurring a constant raster leaves rounding residue far
/// below this.
pub const FLAT_TOLERANCE: f32 = 1e-3;

/// Parameters of the saliency computation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SaliencyParams {
    /// Fine blur sigma.
    pub sigma_fine: f32,
    /// Coarse blur sigma.
    pub sigma_coarse: f32,
    /// Factor applied to negative differences.
    pub negative_scale: f32,
}

/// Per-pixel interestingness in `[0, 1]`, row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct SaliencyField {
    dimensions: Dimensions,
    values: Vec<f32>,
}

impl SaliencyField {
    /// Compute the field from a luminance raster.
    #[must_use]
    #[tracing::instrument(skip(luminance), fields(width = luminance.width(), height = luminance.height()))]
    pub fn from_luminance(luminance: &LumaImage, params: SaliencyParams) -> Self {
        let fine = gaussian_blur(luminance, params.sigma_fine);
        let coarse = gaussian_blur(luminance, params.sigma_coarse);
        Self::from_blurs(&fine, &coarse, params.negative_scale)
    }

    /// Build the field from two precomputed blurs of the same raster.
    #[must_use]
    pub fn from_blurs(fine: &LumaImage, coarse: &LumaImage, negative_scale: f32) -> Self {
        let dimensions = Dimensions::new(fine.width(), fine.height());

        let mut values: Vec<f32> = coarse
            .as_raw()
            .iter()
            .zip(fine.as_raw())
            .map(|(c, f)| {
                let diff = c - f;
                if diff < 0.0 {
                    (diff * negative_scale).abs()
                } else {
                    diff
                }
            })
            .collect();

        let max = values.iter().copied().fold(0.0_f32, f32::max);
        if max <= FLAT_TOLERANCE {
            tracing::debug!(max, "flat image, saliency is zero everywhere");
            values.iter_mut().for_each(|v| *v = 0.0);
        } else {
            for v in &mut values {
                *v = (*v / max).sqrt();
            }
        }

        Self { dimensions, values }
    }

    /// Field dimensions (same as the source image).
    #[must_use]
    pub const fn dimensions(&self) -> Dimensions {
        self.dimensions
    }

    /// Saliency at pixel `(x, y)`, or `None` outside the field.
    #[must_use]
    pub fn get(&self, x: u32, y: u32) -> Option<f32> {
        if x >= self.dimensions.width || y >= self.dimensions.height {
            return None;
        }
        let index = y as usize * self.dimensions.width as usize + x as usize;
        self.values.get(index).copied()
    }

    /// All values in row-major order.
    #[must_use]
    pub fn values(&self) -> &[f32] {
        &self.values
    }

    /// Largest value in the field: 1.0 unless the image is flat.
    #[must_use]
    pub fn max(&self) -> f32 {
        self.values.iter().copied().fold(0.0, f32::max)
    }

    /// Render the field as an 8-bit grayscale preview.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn to_gray_image(&self) -> GrayImage {
        let pixels = self
            .values
            .iter()
            .map(|v| (v * 255.0).round().clamp(0.0, 255.0) as u8)
            .collect();
        GrayImage::from_raw(self.dimensions.width, self.dimensions.height, pixels)
            .unwrap_or_else(|| GrayImage::new(self.dimensions.width, self.dimensions.height))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> SaliencyParams {
        SaliencyParams {
            sigma_fine: 1.0,
            sigma_coarse: 3.0,
            negative_scale: 0.1,
        }
    }

    fn raster(values: &[f32], width: u32) -> LumaImage {
        let height = u32::try_from(values.len()).unwrap_or(0) / width;
        LumaImage::from_raw(width, height, values.to_vec()).unwrap_or_default()
    }

    #[test]
    fn flat_image_has_zero_saliency() {
        let luma = LumaImage::from_pixel(10, 10, image::Luma([128.0]));
        let field = SaliencyField::from_luminance(&luma, params());
        assert!(field.values().iter().all(|&v| v == 0.0));
        assert!(field.values().iter().all(|v| !v.is_nan()));
        assert!(field.max().abs() < f32::EPSILON);
    }

    #[test]
    fn nan_sigma_leaves_luminance_unblurred() {
        let luma = LumaImage::from_fn(12, 12, |x, _| image::Luma([if x < 6 { 0.0 } else { 255.0 }]));
        let field = SaliencyField::from_luminance(
            &luma,
            SaliencyParams {
                sigma_fine: f32::NAN,
                sigma_coarse: f32::NAN,
                negative_scale: 0.1,
            },
        );
        assert!(field.values().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn values_are_bounded_and_peak_is_one() {
        let luma = LumaImage::from_fn(24, 24, |x, y| {
            if (x / 6 + y / 6) % 2 == 0 {
                image::Luma([20.0])
            } else {
                image::Luma([230.0])
            }
        });
        let field = SaliencyField::from_luminance(&luma, params());
        assert!(field.values().iter().all(|&v| (0.0..=1.0).contains(&v)));
        assert!((field.max() - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn normalization_uses_square_root_of_ratio() {
        let fine = raster(&[0.0, 0.0, 0.0], 3);
        let coarse = raster(&[4.0, 1.0, 0.0], 3);
        let field = SaliencyField::from_blurs(&fine, &coarse, 0.1);
        let v = field.values();
        assert!((v[0] - 1.0).abs() < 1e-6);
        assert!((v[1] - 0.5).abs() < 1e-6);
        assert!(v[2].abs() < 1e-6);
    }

    #[test]
    fn negative_differences_are_suppressed() {
        // Same magnitude, opposite sign: the negative one is scaled by 0.1.
        let fine = raster(&[0.0, 10.0], 2);
        let coarse = raster(&[10.0, 0.0], 2);
        let field = SaliencyField::from_blurs(&fine, &coarse, 0.1);
        let v = field.values();
        assert!((v[0] - 1.0).abs() < 1e-6);
        assert!((v[1] - 0.1_f32.sqrt()).abs() < 1e-6);
    }

    #[test]
    fn negative_scale_only_touches_negative_pixels() {
        let fine = raster(&[0.0, 10.0, 0.0], 3);
        let coarse = raster(&[10.0, 0.0, 5.0], 3);
        let a = SaliencyField::from_blurs(&fine, &coarse, 0.1);
        let b = SaliencyField::from_blurs(&fine, &coarse, 0.5);
        assert!((a.values()[0] - b.values()[0]).abs() < 1e-6);
        assert!((a.values()[2] - b.values()[2]).abs() < 1e-6);
        assert!(a.values()[1] < b.values()[1]);
    }

    #[test]
    fn unit_negative_scale_is_symmetric() {
        let fine = raster(&[0.0, 10.0], 2);
        let coarse = raster(&[10.0, 0.0], 2);
        let field = SaliencyField::from_blurs(&fine, &coarse, 1.0);
        assert!((field.values()[0] - field.values()[1]).abs() < 1e-6);
    }

    #[test]
    fn get_is_row_major_and_bounds_checked() {
        let fine = raster(&[0.0; 6], 3);
        let coarse = raster(&[0.0, 0.0, 0.0, 0.0, 0.0, 9.0], 3);
        let field = SaliencyField::from_blurs(&fine, &coarse, 0.1);
        assert_eq!(field.dimensions(), Dimensions::new(3, 2));
        assert_eq!(field.get(2, 1), Some(1.0));
        assert_eq!(field.get(0, 0), Some(0.0));
        assert_eq!(field.get(3, 0), None);
        assert_eq!(field.get(0, 2), None);
    }

    #[test]
    fn gray_preview_maps_peak_to_white() {
        let fine = raster(&[0.0, 0.0], 2);
        let coarse = raster(&[0.0, 8.0], 2);
        let gray = SaliencyField::from_blurs(&fine, &coarse, 0.1).to_gray_image();
        assert_eq!(gray.dimensions(), (2, 1));
        assert_eq!(gray.get_pixel(0, 0).0[0], 0);
        assert_eq!(gray.get_pixel(1, 0).0[0], 255);
    }
}
