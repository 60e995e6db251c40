//! Raster rendering via tiny-skia.
//!
//! Each colored triangle is filled and then stroked with a hairline in
//! the same color.  Both are drawn without anti-aliasing: partial
//! coverage along shared edges would let the transparent background
//! show through as seams.

use std::io::Cursor;

use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use tiny_skia::{FillRule, Paint, PathBuilder, Pixmap, Stroke, Transform};

use trimosaic_pipeline::Frame;

use crate::error::ExportError;
use crate::{RenderOptions, hull_scale};

/// Render a frame onto a transparent canvas of
/// [`RenderOptions::output_size`].
///
/// The anchor hull `[0, w-1] x [0, h-1]` is stretched over the whole
/// canvas.  Triangles without a color are left transparent; a triangle
/// whose path tiny-skia rejects is logged and skipped.
///
/// # Errors
///
/// Returns [`ExportError::EmptyCanvas`] if the output size has a zero
/// axis.
#[tracing::instrument(skip_all, fields(triangles = frame.triangulation().triangle_count()))]
#[allow(clippy::cast_possible_truncation)]
pub fn render_rgba(frame: &Frame, options: &RenderOptions) -> Result<RgbaImage, ExportError> {
    let (width, height) = options.output_size(frame.dimensions());
    let Some(mut pixmap) = Pixmap::new(width, height) else {
        return Err(ExportError::EmptyCanvas { width, height });
    };

    let (sx, sy) = hull_scale(frame, (width, height));
    let transform = Transform::from_scale(sx as f32, sy as f32);
    let hairline = Stroke {
        width: 0.0,
        ..Stroke::default()
    };

    for (index, (corners, [r, g, b])) in frame.filled_triangles().enumerate() {
        let mut pb = PathBuilder::new();
        pb.move_to(corners[0].x as f32, corners[0].y as f32);
        pb.line_to(corners[1].x as f32, corners[1].y as f32);
        pb.line_to(corners[2].x as f32, corners[2].y as f32);
        pb.close();
        let Some(path) = pb.finish() else {
            tracing::warn!(index, ?corners, "skipping triangle with degenerate path");
            continue;
        };

        let mut paint = Paint::default();
        paint.set_color_rgba8(r, g, b, 255);
        paint.anti_alias = false;

        pixmap.fill_path(&path, &paint, FillRule::Winding, transform, None);
        pixmap.stroke_path(&path, &paint, &hairline, transform, None);
    }

    // Convert the pixmap (premultiplied RGBA) to an `RgbaImage` (straight RGBA).
    let mut img = RgbaImage::new(width, height);
    for (pixel, src) in img.pixels_mut().zip(pixmap.pixels()) {
        let c = src.demultiply();
        *pixel = Rgba([c.red(), c.green(), c.blue(), c.alpha()]);
    }
    Ok(img)
}

/// Encode a rendered frame in `format`.
///
/// Formats without an alpha channel (JPEG) receive the RGB channels
/// only.
///
/// # Errors
///
/// Returns [`ExportError::Encode`] if the `image` crate cannot encode
/// the format.
pub fn encode(image: &RgbaImage, format: ImageFormat) -> Result<Vec<u8>, ExportError> {
    let mut buf = Cursor::new(Vec::new());
    match format {
        ImageFormat::Jpeg => {
            DynamicImage::ImageRgba8(image.clone())
                .to_rgb8()
                .write_to(&mut buf, format)?;
        }
        _ => image.write_to(&mut buf, format)?,
    }
    Ok(buf.into_inner())
}

/// Render a frame and encode it as PNG.
///
/// # Errors
///
/// Returns [`ExportError::EmptyCanvas`] for a zero-sized output and
/// [`ExportError::Encode`] if PNG encoding fails.
pub fn to_png(frame: &Frame, options: &RenderOptions) -> Result<Vec<u8>, ExportError> {
    encode(&render_rgba(frame, options)?, ImageFormat::Png)
}
