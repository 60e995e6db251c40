//! trimosaic-export: Pure format serializers (sans-IO)
//!
//! Renders [`Frame`]s as SVG documents or raster images and assembles
//! raster frames into looping GIF animations.  Nothing here touches the
//! file system: serializers return strings or bytes, and the GIF
//! assembler writes into any [`std::io::Write`] sink.

pub mod animation;
pub mod error;
pub mod raster;
pub mod svg;

pub use animation::GifAssembler;
pub use error::ExportError;
pub use raster::{encode, render_rgba, to_png};
pub use svg::{SvgMetadata, to_svg};

use serde::{Deserialize, Serialize};
use trimosaic_pipeline::{Dimensions, Frame};

/// Output sizing shared by the vector and raster renderers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderOptions {
    /// Output size as a multiple of the source image size.
    pub scale: f64,
}

impl RenderOptions {
    /// Default output scale.
    pub const DEFAULT_SCALE: f64 = 1.0;

    /// Output width and height for a frame of `dimensions`, rounded to
    /// whole pixels.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn output_size(&self, dimensions: Dimensions) -> (u32, u32) {
        let scale = if self.scale.is_finite() && self.scale > 0.0 {
            self.scale
        } else {
            0.0
        };
        let axis = |n: u32| (f64::from(n) * scale).round().min(f64::from(u32::MAX)) as u32;
        (axis(dimensions.width), axis(dimensions.height))
    }
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            scale: Self::DEFAULT_SCALE,
        }
    }
}

/// Per-axis factors mapping the anchor hull `[0, w-1] x [0, h-1]` of a
/// frame onto an `out_w x out_h` canvas.
fn hull_scale(frame: &Frame, (out_w, out_h): (u32, u32)) -> (f64, f64) {
    let dims = frame.dimensions();
    let span = |n: u32| f64::from(n.saturating_sub(1).max(1));
    (
        f64::from(out_w) / span(dims.width),
        f64::from(out_h) / span(dims.height),
    )
}
