//! Image decoding and perceptual luminance.
//!
//! Accepts raw image bytes (PNG, JPEG, BMP, WebP, GIF) and produces the
//! 3-channel color image used for triangle colors plus a floating point
//! luminance raster used for saliency.
//!
//! Every supported format arrives on the same 0..=255 intensity scale:
//! 16-bit and float sources are rescaled by the `image` crate during
//! conversion to 8 bits per channel.

use image::{DynamicImage, Luma, Rgb, RgbImage};

use crate::types::{AlphaHandling, LumaImage, PipelineError};

/// Perceptual RGB weights used for luminance.
pub const PERCEPTUAL_WEIGHTS: [f32; 3] = [0.213, 0.715, 0.072];

/// Decode raw image bytes into an 8-bit RGB image.
///
/// # Errors
///
/// Returns [`PipelineError::EmptyInput`] if `bytes` is empty,
/// [`PipelineError::ImageDecode`] if the data cannot be decoded, and
/// [`PipelineError::EmptyImage`] if the decoded image has no pixels.
pub fn decode_rgb(bytes: &[u8], alpha: AlphaHandling) -> Result<RgbImage, PipelineError> {
    if bytes.is_empty() {
        return Err(PipelineError::EmptyInput);
    }

    let image = image::load_from_memory(bytes)?;
    if image.width() == 0 || image.height() == 0 {
        return Err(PipelineError::EmptyImage);
    }
    Ok(to_rgb(&image, alpha))
}

/// Convert a decoded image to RGB, applying the alpha policy.
#[must_use]
pub fn to_rgb(image: &DynamicImage, alpha: AlphaHandling) -> RgbImage {
    match alpha {
        AlphaHandling::Flatten { background } if image.color().has_alpha() => {
            let rgba = image.to_rgba8();
            RgbImage::from_fn(rgba.width(), rgba.height(), |x, y| {
                let px = rgba.get_pixel(x, y).0;
                let a = u16::from(px[3]);
                let blend = |c: u8, bg: u8| -> u8 {
                    let mixed = (u16::from(c) * a + u16::from(bg) * (255 - a) + 127) / 255;
                    u8::try_from(mixed).unwrap_or(u8::MAX)
                };
                Rgb([
                    blend(px[0], background[0]),
                    blend(px[1], background[1]),
                    blend(px[2], background[2]),
                ])
            })
        }
        _ => image.to_rgb8(),
    }
}

/// Compute perceptual luminance on the 0..=255 scale.
#[must_use = "returns the luminance raster"]
pub fn luminance(image: &RgbImage) -> LumaImage {
    let [wr, wg, wb] = PERCEPTUAL_WEIGHTS;
    LumaImage::from_fn(image.width(), image.height(), |x, y| {
        let [r, g, b] = image.get_pixel(x, y).0;
        Luma([wb.mul_add(
            f32::from(b),
            wr.mul_add(f32::from(r), wg * f32::from(g)),
        )])
    })
}
