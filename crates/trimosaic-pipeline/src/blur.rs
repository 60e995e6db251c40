//! Gaussian blur on floating point luminance.
//!
//! Wraps [`imageproc::filter::gaussian_blur_f32`]. Blurring in `f32`
//! keeps the difference of two blurs free of 8-bit quantization, which
//! matters because saliency is derived from small differences.

use crate::types::LumaImage;

/// Apply Gaussian blur to a luminance raster.
///
/// Higher `sigma` values produce more smoothing. Non-positive or
/// non-finite sigma values return the image unchanged, since `imageproc`'s
/// underlying function panics unless `sigma > 0.0`.
#[must_use = "returns the blurred image"]
pub fn gaussian_blur(image: &LumaImage, sigma: f32) -> LumaImage {
    if !(sigma.is_finite() && sigma > 0.0) {
        return image.clone();
    }

    imageproc::filter::gaussian_blur_f32(image, sigma)
}
