//! Incremental pipeline: advance stage-by-stage, inspecting each
//! intermediate result before continuing.
//!
//! ```rust
//! # use trimosaic_pipeline::{MosaicConfig, Pipeline, PipelineError};
//! # fn run(png: Vec<u8>) -> Result<(), PipelineError> {
//! let sampled = Pipeline::new(png, MosaicConfig::default())
//!     .decode()?
//!     .saliency()
//!     .sample();
//!
//! let frame = sampled.frame(200)?;
//! # Ok(())
//! # }
//! ```
//!
//! Each stage method consumes `self` and returns the next state, carrying
//! the intermediates later stages need.  The last stage, [`Sampled`], is
//! computed once per run and then produces any number of frames from
//! prefixes of its pool without recomputing the shared work.

use std::time::{Duration, Instant};

use crate::diagnostics::RunDiagnostics;
use crate::frame::Frame;
use crate::saliency::{SaliencyField, SaliencyParams};
use crate::sample::{ImportanceSampler, SamplePool};
use crate::schedule::PointSchedule;
use crate::triangulate::PointSet;
use crate::types::{Dimensions, LumaImage, MosaicConfig, PipelineError, RgbImage};

// ───────────────────────── Stage 0: Pending ──────────────────────────

/// Pipeline state before any processing has occurred.
#[must_use = "pipeline stages are consumed by advancing, call .decode() to continue"]
pub struct Pending {
    config: MosaicConfig,
    source: Vec<u8>,
}

impl Pending {
    /// The raw source image bytes.
    #[must_use]
    pub fn source(&self) -> &[u8] {
        &self.source
    }

    /// Validate the configuration, decode the source image and compute
    /// its luminance.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidConfig`] before touching the
    /// image if the configuration is invalid, then
    /// [`PipelineError::EmptyInput`], [`PipelineError::ImageDecode`] or
    /// [`PipelineError::EmptyImage`] for unusable input.
    #[tracing::instrument(skip_all, fields(bytes = self.source.len()))]
    pub fn decode(self) -> Result<Decoded, PipelineError> {
        self.config.validate()?;

        let start = Instant::now();
        let image = crate::grayscale::decode_rgb(&self.source, self.config.alpha)?;
        let luminance = crate::grayscale::luminance(&image);
        let decode = start.elapsed();

        tracing::debug!(
            width = image.width(),
            height = image.height(),
            "decoded source image"
        );
        Ok(Decoded {
            config: self.config,
            image,
            luminance,
            input_bytes: self.source.len(),
            decode,
        })
    }
}

// ───────────────────────── Stage 1: Decoded ──────────────────────────

/// Pipeline state after decoding: the color image and its luminance.
#[must_use = "pipeline stages are consumed by advancing, call .saliency() to continue"]
pub struct Decoded {
    config: MosaicConfig,
    image: RgbImage,
    luminance: LumaImage,
    input_bytes: usize,
    decode: Duration,
}

impl Decoded {
    /// The decoded RGB image.
    #[must_use]
    pub const fn image(&self) -> &RgbImage {
        &self.image
    }

    /// Perceptual luminance of the image.
    #[must_use]
    pub const fn luminance(&self) -> &LumaImage {
        &self.luminance
    }

    /// Compute the saliency field and advance to [`Salient`].
    pub fn saliency(self) -> Salient {
        let params = SaliencyParams {
            sigma_fine: self.config.sigma_fine,
            sigma_coarse: self.config.sigma_coarse,
            negative_scale: self.config.negative_scale,
        };
        let start = Instant::now();
        let field = SaliencyField::from_luminance(&self.luminance, params);
        let saliency = start.elapsed();

        Salient {
            config: self.config,
            image: self.image,
            field,
            input_bytes: self.input_bytes,
            decode: self.decode,
            saliency,
        }
    }
}

// ───────────────────────── Stage 2: Salient ──────────────────────────

/// Pipeline state after the saliency field has been computed.
#[must_use = "pipeline stages are consumed by advancing, call .sample() to continue"]
pub struct Salient {
    config: MosaicConfig,
    image: RgbImage,
    field: SaliencyField,
    input_bytes: usize,
    decode: Duration,
    saliency: Duration,
}

impl Salient {
    /// The saliency field.
    #[must_use]
    pub const fn saliency(&self) -> &SaliencyField {
        &self.field
    }

    /// Draw the sample pool with the configured seed and draw count and
    /// advance to [`Sampled`].
    pub fn sample(self) -> Sampled {
        let start = Instant::now();
        let pool = ImportanceSampler::new(self.config.seed).sample(&self.field, self.config.draws);
        let sampling = start.elapsed();

        let diagnostics = RunDiagnostics {
            dimensions: self.field.dimensions(),
            input_bytes: self.input_bytes,
            decode: self.decode,
            saliency: self.saliency,
            sampling,
            draws: self.config.draws,
            pool_size: pool.len(),
        };
        tracing::info!(
            pool = pool.len(),
            draws = self.config.draws,
            "sample pool ready"
        );

        Sampled {
            config: self.config,
            image: self.image,
            field: self.field,
            pool,
            diagnostics,
        }
    }
}

// ───────────────────────── Stage 3: Sampled ──────────────────────────

/// Pipeline state holding everything shared across frames: the image,
/// saliency field and ordered sample pool.
///
/// Read-only from here on; every frame is built independently from a
/// prefix of the pool.
#[must_use = "call .frame() or .rollout() to produce output"]
pub struct Sampled {
    config: MosaicConfig,
    image: RgbImage,
    field: SaliencyField,
    pool: SamplePool,
    diagnostics: RunDiagnostics,
}

impl Sampled {
    /// The configuration the run was computed with.
    #[must_use]
    pub const fn config(&self) -> &MosaicConfig {
        &self.config
    }

    /// The decoded RGB image.
    #[must_use]
    pub const fn image(&self) -> &RgbImage {
        &self.image
    }

    /// The saliency field.
    #[must_use]
    pub const fn saliency(&self) -> &SaliencyField {
        &self.field
    }

    /// The ordered sample pool.
    #[must_use]
    pub const fn pool(&self) -> &SamplePool {
        &self.pool
    }

    /// Image dimensions.
    #[must_use]
    pub const fn dimensions(&self) -> Dimensions {
        self.diagnostics.dimensions
    }

    /// Timings and counts of the shared stages.
    #[must_use]
    pub const fn diagnostics(&self) -> &RunDiagnostics {
        &self.diagnostics
    }

    /// Anchors plus the first `n` pool points.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::PoolExhausted`] if the pool holds fewer
    /// than `n` points.
    pub fn point_set(&self, n: usize) -> Result<PointSet, PipelineError> {
        Ok(PointSet::new(self.dimensions(), self.pool.prefix(n)?))
    }

    /// Build the frame with `n` sampled points.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::PoolExhausted`] if the pool holds fewer
    /// than `n` points.
    pub fn frame(&self, n: usize) -> Result<Frame, PipelineError> {
        let points = self.point_set(n)?;
        Ok(Frame::build(&self.image, &points))
    }

    /// Validate `schedule` and check that the pool can serve every frame.
    ///
    /// Returns the per-frame counts so a rollout fails before its first
    /// frame rather than partway through.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidConfig`] for an invalid schedule
    /// and [`PipelineError::PoolExhausted`] naming the largest request
    /// if the pool is too small.
    pub fn check_schedule(&self, schedule: &PointSchedule) -> Result<Vec<usize>, PipelineError> {
        let counts = schedule.counts()?;
        let max = counts.iter().copied().max().unwrap_or(0);
        if max > self.pool.len() {
            return Err(PipelineError::PoolExhausted {
                requested: max,
                available: self.pool.len(),
            });
        }
        Ok(counts)
    }

    /// Frames for every entry of `schedule`, in frame order.
    ///
    /// # Errors
    ///
    /// Fails up front with the errors of
    /// [`check_schedule`](Self::check_schedule).
    pub fn rollout(&self, schedule: &PointSchedule) -> Result<Rollout<'_>, PipelineError> {
        let counts = self.check_schedule(schedule)?;
        Ok(Rollout {
            sampled: self,
            counts: counts.into_iter().enumerate(),
        })
    }
}

/// Lazily built rollout frames.
///
/// Yields `(frame_index, frame)` pairs; each frame is built on demand
/// and may be dropped before the next one is requested.
pub struct Rollout<'a> {
    sampled: &'a Sampled,
    counts: std::iter::Enumerate<std::vec::IntoIter<usize>>,
}

impl Rollout<'_> {
    /// Frames not yet yielded.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.counts.len()
    }
}

impl Iterator for Rollout<'_> {
    type Item = Result<(usize, Frame), PipelineError>;

    fn next(&mut self) -> Option<Self::Item> {
        let (index, n) = self.counts.next()?;
        tracing::debug!(frame = index, points = n, "building rollout frame");
        Some(self.sampled.frame(n).map(|frame| (index, frame)))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.counts.size_hint()
    }
}

impl ExactSizeIterator for Rollout<'_> {}

/// Entry point for the typed pipeline.
///
/// ```rust
/// # use trimosaic_pipeline::{MosaicConfig, Pipeline, PipelineError, PointSchedule};
/// # fn run(png: Vec<u8>) -> Result<(), PipelineError> {
/// let sampled = Pipeline::new(png, MosaicConfig::default())
///     .decode()?
///     .saliency()
///     .sample();
/// for item in sampled.rollout(&PointSchedule::default())? {
///     let (index, frame) = item?;
///     # let _ = (index, frame);
/// }
/// # Ok(())
/// # }
/// ```
///
/// Each stage method consumes the current state and returns the next,
/// making it a compile-time error to skip stages or call them out of
/// order.
pub struct Pipeline;

impl Pipeline {
    /// Create a new pipeline from source image bytes and config.
    ///
    /// No processing is performed until [`.decode()`](Pending::decode).
    #[allow(clippy::new_ret_no_self)]
    pub const fn new(image_bytes: Vec<u8>, config: MosaicConfig) -> Pending {
        Pending {
            config,
            source: image_bytes,
        }
    }
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

    /// Dark square on a light background: strong edges along the border.
    fn square_png(size: u32) -> Vec<u8> {
        let img = image::RgbImage::from_fn(size, size, |x, y| {
            let inside = (size / 4..3 * size / 4).contains(&x) && (size / 4..3 * size / 4).contains(&y);
            if inside {
                image::Rgb([20, 30, 40])
            } else {
                image::Rgb([230, 220, 210])
            }
        });
        encode_png(&img)
    }

    fn small_config() -> MosaicConfig {
        MosaicConfig {
            draws: 20_000,
            seed: 11,
            ..MosaicConfig::default()
        }
    }

    #[test]
    fn pending_exposes_source_bytes() {
        let png = square_png(16);
        let len = png.len();
        let pending = Pipeline::new(png, MosaicConfig::default());
        assert_eq!(pending.source().len(), len);
    }

    #[test]
    fn decode_empty_input_returns_error() {
        let result = Pipeline::new(vec![], MosaicConfig::default()).decode();
        assert!(matches!(result, Err(PipelineError::EmptyInput)));
    }

    #[test]
    fn decode_corrupt_input_returns_error() {
        let result = Pipeline::new(vec![0xFF, 0x00], MosaicConfig::default()).decode();
        assert!(matches!(result, Err(PipelineError::ImageDecode(_))));
    }

    #[test]
    fn invalid_config_is_reported_before_decoding() {
        let config = MosaicConfig {
            sigma_fine: 12.0,
            ..MosaicConfig::default()
        };
        // Corrupt bytes would fail decoding; the config error wins.
        let result = Pipeline::new(vec![0xFF], config).decode();
        assert!(matches!(result, Err(PipelineError::InvalidConfig(_))));
    }

    #[test]
    fn stages_expose_intermediates() {
        let decoded = Pipeline::new(square_png(32), small_config())
            .decode()
            .unwrap();
        assert_eq!(decoded.image().dimensions(), (32, 32));
        assert_eq!(decoded.luminance().dimensions(), (32, 32));

        let salient = decoded.saliency();
        assert!((salient.saliency().max() - 1.0).abs() < 1e-6);

        let sampled = salient.sample();
        assert_eq!(sampled.dimensions(), Dimensions::new(32, 32));
        assert!(!sampled.pool().is_empty());
        assert_eq!(sampled.diagnostics().draws, 20_000);
        assert_eq!(sampled.diagnostics().pool_size, sampled.pool().len());
    }

    #[test]
    fn flat_image_gives_empty_pool_and_two_triangle_frame() {
        let flat = image::RgbImage::from_pixel(10, 10, image::Rgb([128, 128, 128]));
        let sampled = Pipeline::new(encode_png(&flat), small_config())
            .decode()
            .unwrap()
            .saliency()
            .sample();
        assert!(sampled.pool().is_empty());

        let frame = sampled.frame(0).unwrap();
        assert_eq!(frame.triangulation().triangle_count(), 2);
        assert!(frame.filled_triangles().all(|(_, c)| c == [128, 128, 128]));
        assert_eq!(frame.diagnostics().covered_pixels, 100);
    }

    #[test]
    fn frame_beyond_pool_is_an_error() {
        let sampled = Pipeline::new(square_png(16), small_config())
            .decode()
            .unwrap()
            .saliency()
            .sample();
        let available = sampled.pool().len();
        let err = sampled.frame(available + 1).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::PoolExhausted { requested, available: a }
                if requested == available + 1 && a == available
        ));
    }

    #[test]
    fn check_schedule_fails_before_any_frame() {
        let sampled = Pipeline::new(square_png(16), small_config())
            .decode()
            .unwrap()
            .saliency()
            .sample();
        let too_many = sampled.pool().len() + 10;
        let schedule = PointSchedule::explicit(vec![1, 2, too_many]);
        let err = sampled.rollout(&schedule).err().unwrap();
        assert!(matches!(
            err,
            PipelineError::PoolExhausted { requested, .. } if requested == too_many
        ));
    }

    #[test]
    fn rollout_yields_frames_in_order_with_growing_points() {
        let sampled = Pipeline::new(square_png(24), small_config())
            .decode()
            .unwrap()
            .saliency()
            .sample();
        let schedule = PointSchedule::polynomial(1, 1, 2, 5);
        let rollout = sampled.rollout(&schedule).unwrap();
        assert_eq!(rollout.remaining(), 5);
        let frames: Vec<(usize, Frame)> = rollout.map(Result::unwrap).collect();
        let indices: Vec<usize> = frames.iter().map(|(i, _)| *i).collect();
        assert_eq!(indices, vec![0, 1, 2, 3, 4]);
        let counts: Vec<usize> = frames.iter().map(|(_, f)| f.sampled_points()).collect();
        assert_eq!(counts, vec![1, 4, 11, 22, 37]);
    }

    #[test]
    fn each_point_set_extends_the_previous_one() {
        let sampled = Pipeline::new(square_png(24), small_config())
            .decode()
            .unwrap()
            .saliency()
            .sample();
        let schedule = PointSchedule::explicit(vec![0, 1, 1, 5, 12, 30]);
        let sets: Vec<PointSet> = sampled
            .check_schedule(&schedule)
            .unwrap()
            .into_iter()
            .map(|n| sampled.point_set(n).unwrap())
            .collect();
        for pair in sets.windows(2) {
            let (earlier, later) = (pair[0].points(), pair[1].points());
            assert!(earlier.len() <= later.len());
            assert!(later.starts_with(earlier), "point set is not a prefix of the next");
        }
        assert_eq!(sets[0].points(), &sampled.dimensions().anchors()[..]);
    }

    #[test]
    fn same_seed_gives_identical_frames() {
        let run = || {
            Pipeline::new(square_png(24), small_config())
                .decode()
                .unwrap()
                .saliency()
                .sample()
        };
        let a = run();
        let b = run();
        assert_eq!(a.pool(), b.pool());
        let fa = a.frame(30).unwrap();
        let fb = b.frame(30).unwrap();
        assert_eq!(fa.triangulation().triangles(), fb.triangulation().triangles());
        assert_eq!(fa.colors(), fb.colors());
    }
}
