//! Shared types for the trimosaic pipeline.

use serde::{Deserialize, Serialize};

/// Re-export `RgbImage` so downstream crates can reference the decoded
/// source image without depending on `image` directly.
pub use image::RgbImage;

/// Re-export `RgbaImage` for rendered raster frames.
pub use image::RgbaImage;

/// Re-export `GrayImage` for 8-bit previews of intermediate fields.
pub use image::GrayImage;

/// Single-channel floating point raster (luminance and its blurs).
///
/// Values are on the same 0..=255 scale as the 8-bit source channels.
pub type LumaImage = image::ImageBuffer<image::Luma<f32>, Vec<f32>>;

/// A 2D point in image coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// Horizontal position (pixels from left edge).
    pub x: f64,
    /// Vertical position (pixels from top edge).
    pub y: f64,
}

impl Point {
    /// Create a new point.
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Image dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Dimensions {
    /// Create new dimensions.
    #[must_use]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Total number of pixels.
    #[must_use]
    pub const fn pixel_count(self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// Returns `true` if either axis is zero.
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// The four corner pixels that pin every triangulation to the image
    /// bounds, in the fixed order `(0,0), (0,h-1), (w-1,0), (w-1,h-1)`.
    ///
    /// For a one-pixel-wide or -tall image some corners coincide; the
    /// triangulator inserts coincident positions once.
    #[must_use]
    pub fn anchors(self) -> [Point; 4] {
        let right = f64::from(self.width.saturating_sub(1));
        let bottom = f64::from(self.height.saturating_sub(1));
        [
            Point::new(0.0, 0.0),
            Point::new(0.0, bottom),
            Point::new(right, 0.0),
            Point::new(right, bottom),
        ]
    }
}

/// A pixel accepted by the importance sampler, together with the
/// saliency value that admitted it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SamplePoint {
    /// Pixel column.
    pub x: u32,
    /// Pixel row.
    pub y: u32,
    /// Saliency at `(x, y)` when the point was drawn.
    pub saliency: f32,
}

impl SamplePoint {
    /// The pixel position as a floating point coordinate.
    #[must_use]
    pub fn position(self) -> Point {
        Point::new(f64::from(self.x), f64::from(self.y))
    }
}

/// How to treat an alpha channel in the source image.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlphaHandling {
    /// Drop the alpha channel and keep the stored color values.
    #[default]
    Discard,
    /// Composite each pixel over an opaque background color.
    Flatten {
        /// Background color as `[r, g, b]`.
        background: [u8; 3],
    },
}

/// Configuration for the mosaic pipeline up to and including sampling.
///
/// Per-frame choices (point count, rollout schedule, output format) are
/// supplied separately so one sampled pool can serve many frames.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MosaicConfig {
    /// Sigma of the fine Gaussian blur. Must be smaller than
    /// `sigma_coarse`.
    pub sigma_fine: f32,

    /// Sigma of the coarse Gaussian blur.
    pub sigma_coarse: f32,

    /// Factor applied to negative blur differences before
    /// normalization. Values below 1.0 suppress dark-to-light edges
    /// relative to light-to-dark ones.
    pub negative_scale: f32,

    /// Number of candidate pixels drawn by the importance sampler.
    /// The accepted pool is usually far smaller.
    pub draws: usize,

    /// Seed for the importance sampler.
    pub seed: u64,

    /// Alpha channel handling at decode time.
    pub alpha: AlphaHandling,
}

impl MosaicConfig {
    /// Default fine blur sigma.
    pub const DEFAULT_SIGMA_FINE: f32 = 2.0;
    /// Default coarse blur sigma.
    pub const DEFAULT_SIGMA_COARSE: f32 = 10.0;
    /// Default scale for negative differences.
    pub const DEFAULT_NEGATIVE_SCALE: f32 = 0.1;
    /// Default number of sampler draws.
    pub const DEFAULT_DRAWS: usize = 1_000_000;
    /// Default sampler seed.
    pub const DEFAULT_SEED: u64 = 0;

    /// Check the configuration for values the pipeline cannot honor.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidConfig`] if a sigma is not a
    /// positive finite number, if `sigma_fine >= sigma_coarse`, or if
    /// `negative_scale` is negative or not finite.
    pub fn validate(&self) -> Result<(), PipelineError> {
        for (name, sigma) in [
            ("sigma_fine", self.sigma_fine),
            ("sigma_coarse", self.sigma_coarse),
        ] {
            if !sigma.is_finite() || sigma <= 0.0 {
                return Err(PipelineError::InvalidConfig(format!(
                    "{name} must be a positive finite number, got {sigma}"
                )));
            }
        }
        if self.sigma_fine >= self.sigma_coarse {
            return Err(PipelineError::InvalidConfig(format!(
                "sigma_fine ({}) must be smaller than sigma_coarse ({})",
                self.sigma_fine, self.sigma_coarse
            )));
        }
        if !self.negative_scale.is_finite() || self.negative_scale < 0.0 {
            return Err(PipelineError::InvalidConfig(format!(
                "negative_scale must be a non-negative finite number, got {}",
                self.negative_scale
            )));
        }
        Ok(())
    }
}

impl Default for MosaicConfig {
    fn default() -> Self {
        Self {
            sigma_fine: Self::DEFAULT_SIGMA_FINE,
            sigma_coarse: Self::DEFAULT_SIGMA_COARSE,
            negative_scale: Self::DEFAULT_NEGATIVE_SCALE,
            draws: Self::DEFAULT_DRAWS,
            seed: Self::DEFAULT_SEED,
            alpha: AlphaHandling::default(),
        }
    }
}

/// Errors that can occur during pipeline processing.
///
/// Degenerate geometry and triangles without covering pixels are not
/// errors: they produce empty triangulations and undefined colors.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Failed to decode the input image.
    #[error("failed to decode image: {0}")]
    ImageDecode(#[from] image::ImageError),

    /// The input image bytes were empty.
    #[error("input image data is empty")]
    EmptyInput,

    /// The decoded image has no pixels.
    #[error("decoded image has zero width or height")]
    EmptyImage,

    /// Pipeline configuration is invalid.
    #[error("invalid pipeline configuration: {0}")]
    InvalidConfig(String),

    /// A frame asked for more sampled points than the pool holds.
    #[error(
        "requested {requested} sampled points but the pool only holds {available}; \
         increase the draw count"
    )]
    PoolExhausted {
        /// Number of sampled points requested.
        requested: usize,
        /// Number of points in the accepted pool.
        available: usize,
    },
}
