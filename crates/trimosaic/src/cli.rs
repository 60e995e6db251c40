//! Command-line arguments and their translation into pipeline
//! configuration.

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Args, Parser, Subcommand, ValueEnum};
use trimosaic_export::RenderOptions;
use trimosaic_export::animation::DEFAULT_FRAME_DELAY_MS;
use trimosaic_pipeline::{AlphaHandling, MosaicConfig, PointSchedule};

/// Render low-poly mosaics and animated rollouts from images.
///
/// Points are sampled where the image has edges, triangulated, and each
/// triangle is filled with the mean color of the pixels it covers.
#[derive(Debug, Parser)]
#[command(name = "trimosaic", version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Log at debug level (overrides `RUST_LOG`).
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Render one mosaic with a fixed number of sampled points.
    Single(SingleArgs),
    /// Render a sequence of mosaics with a growing number of points.
    Rollout(RolloutArgs),
}

#[derive(Debug, Args)]
pub struct SingleArgs {
    /// Path to the input image (PNG, JPEG, BMP, WebP, GIF).
    pub input: PathBuf,

    /// Number of sampled points (the four corner anchors are added).
    #[arg(long)]
    pub points: usize,

    /// Output file; `.svg` writes a vector document, any other image
    /// extension a raster.
    #[arg(short, long)]
    pub output: PathBuf,

    #[command(flatten)]
    pub common: CommonArgs,
}

#[derive(Debug, Args)]
pub struct RolloutArgs {
    /// Path to the input image (PNG, JPEG, BMP, WebP, GIF).
    pub input: PathBuf,

    /// Output path template; `{frame}` is replaced by the zero-padded
    /// frame index and `{points}` by the sampled point count.
    #[arg(short, long)]
    pub output: String,

    /// Number of frames.
    #[arg(long, default_value_t = PointSchedule::DEFAULT_FRAMES)]
    pub frames: usize,

    /// Points in the first frame.
    #[arg(long, default_value_t = 1)]
    pub constant: usize,

    /// Linear growth of the point count per frame.
    #[arg(long, default_value_t = 1)]
    pub linear: usize,

    /// Quadratic growth of the point count per frame.
    #[arg(long, default_value_t = 2)]
    pub quadratic: usize,

    /// Explicit comma-separated point counts, one per frame.
    ///
    /// Replaces `--frames`, `--constant`, `--linear` and `--quadratic`.
    #[arg(long, value_delimiter = ',')]
    pub counts: Option<Vec<usize>>,

    /// Also assemble the frames into a looping GIF at this path.
    #[arg(long)]
    pub gif: Option<PathBuf>,

    /// Delay between GIF frames in milliseconds.
    #[arg(long, default_value_t = DEFAULT_FRAME_DELAY_MS)]
    pub frame_delay_ms: u32,

    /// Extra time the last GIF frame stays on screen, in milliseconds.
    #[arg(long)]
    pub final_hold_ms: Option<u32>,

    #[command(flatten)]
    pub common: CommonArgs,
}

impl RolloutArgs {
    /// The point schedule selected by the flags.
    #[must_use]
    pub fn schedule(&self) -> PointSchedule {
        self.counts.as_ref().map_or_else(
            || PointSchedule::polynomial(self.constant, self.linear, self.quadratic, self.frames),
            |counts| PointSchedule::explicit(counts.clone()),
        )
    }
}

/// Flags shared by every subcommand.
#[derive(Debug, Args)]
pub struct CommonArgs {
    /// Gaussian sigma of the fine blur.
    #[arg(long, default_value_t = MosaicConfig::DEFAULT_SIGMA_FINE)]
    pub sigma_fine: f32,

    /// Gaussian sigma of the coarse blur.
    #[arg(long, default_value_t = MosaicConfig::DEFAULT_SIGMA_COARSE)]
    pub sigma_coarse: f32,

    /// Weight of dark-side edges relative to light-side edges.
    #[arg(long, default_value_t = MosaicConfig::DEFAULT_NEGATIVE_SCALE)]
    pub negative_scale: f32,

    /// Candidate pixels drawn by the importance sampler.
    #[arg(long, default_value_t = MosaicConfig::DEFAULT_DRAWS)]
    pub draws: usize,

    /// Sampler seed.
    #[arg(long, default_value_t = MosaicConfig::DEFAULT_SEED)]
    pub seed: u64,

    /// What to do with an alpha channel.
    #[arg(long, value_enum, default_value_t = AlphaMode::Discard)]
    pub alpha: AlphaMode,

    /// Background for `--alpha flatten`, as `R,G,B`.
    #[arg(long, value_parser = parse_rgb)]
    pub background: Option<[u8; 3]>,

    /// Output size as a multiple of the input size.
    #[arg(long, default_value_t = RenderOptions::DEFAULT_SCALE)]
    pub scale: f64,

    /// Pipeline config as a JSON file.
    ///
    /// When provided, the pipeline parameter flags above are ignored.
    /// The JSON must be a `MosaicConfig` serialization; missing fields
    /// take their defaults.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Write the saliency field as a grayscale image.
    #[arg(long)]
    pub saliency_out: Option<PathBuf>,

    /// Write per-frame diagnostics as JSON.
    #[arg(long)]
    pub diagnostics: Option<PathBuf>,
}

/// Alpha channel handling selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum AlphaMode {
    /// Drop the alpha channel.
    Discard,
    /// Composite over `--background` (white by default).
    Flatten,
}

/// Background used by `--alpha flatten` without `--background`.
const DEFAULT_BACKGROUND: [u8; 3] = [255, 255, 255];

/// Parse `R,G,B` with each channel in `0..=255`.
pub fn parse_rgb(s: &str) -> Result<[u8; 3], String> {
    let channels = s
        .split(',')
        .map(|c| {
            c.trim()
                .parse::<u8>()
                .map_err(|e| format!("invalid channel {c:?}: {e}"))
        })
        .collect::<Result<Vec<_>, _>>()?;
    <[u8; 3]>::try_from(channels)
        .map_err(|v| format!("expected three channels R,G,B, got {}", v.len()))
}

impl CommonArgs {
    /// Build the pipeline config from `--config` or the individual flags.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file cannot be read or parsed.
    pub fn mosaic_config(&self) -> anyhow::Result<MosaicConfig> {
        if let Some(path) = &self.config {
            return load_config(path);
        }

        let alpha = match self.alpha {
            AlphaMode::Discard => {
                if self.background.is_some() {
                    tracing::warn!("--background has no effect with --alpha discard");
                }
                AlphaHandling::Discard
            }
            AlphaMode::Flatten => AlphaHandling::Flatten {
                background: self.background.unwrap_or(DEFAULT_BACKGROUND),
            },
        };
        Ok(MosaicConfig {
            sigma_fine: self.sigma_fine,
            sigma_coarse: self.sigma_coarse,
            negative_scale: self.negative_scale,
            draws: self.draws,
            seed: self.seed,
            alpha,
        })
    }

    /// Render options from the flags.
    #[must_use]
    pub const fn render_options(&self) -> RenderOptions {
        RenderOptions { scale: self.scale }
    }
}

fn load_config(path: &Path) -> anyhow::Result<MosaicConfig> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing config {}", path.display()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use trimosaic_pipeline::ScheduleFormula;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).unwrap()
    }

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn single_defaults_match_pipeline_defaults() {
        let cli = parse(&["trimosaic", "single", "in.png", "--points", "50", "-o", "out.svg"]);
        let Command::Single(args) = cli.command else {
            panic!("expected single");
        };
        assert_eq!(args.points, 50);
        assert_eq!(args.output, PathBuf::from("out.svg"));
        assert_eq!(args.common.mosaic_config().unwrap(), MosaicConfig::default());
        assert_eq!(args.common.render_options(), RenderOptions::default());
        assert!(!cli.verbose);
    }

    #[test]
    fn pipeline_flags_reach_the_config() {
        let cli = parse(&[
            "trimosaic",
            "single",
            "in.png",
            "--points",
            "1",
            "-o",
            "o.png",
            "--sigma-fine",
            "1.5",
            "--sigma-coarse",
            "6",
            "--negative-scale",
            "0.5",
            "--draws",
            "1000",
            "--seed",
            "9",
            "--alpha",
            "flatten",
            "--background",
            "0,0,255",
            "-v",
        ]);
        assert!(cli.verbose);
        let Command::Single(args) = cli.command else {
            panic!("expected single");
        };
        let config = args.common.mosaic_config().unwrap();
        assert!((config.sigma_fine - 1.5).abs() < f32::EPSILON);
        assert!((config.sigma_coarse - 6.0).abs() < f32::EPSILON);
        assert!((config.negative_scale - 0.5).abs() < f32::EPSILON);
        assert_eq!(config.draws, 1000);
        assert_eq!(config.seed, 9);
        assert_eq!(
            config.alpha,
            AlphaHandling::Flatten {
                background: [0, 0, 255]
            }
        );
    }

    #[test]
    fn flatten_defaults_to_white() {
        let cli = parse(&[
            "trimosaic", "single", "in.png", "--points", "1", "-o", "o.png", "--alpha", "flatten",
        ]);
        let Command::Single(args) = cli.command else {
            panic!("expected single");
        };
        assert_eq!(
            args.common.mosaic_config().unwrap().alpha,
            AlphaHandling::Flatten {
                background: [255, 255, 255]
            }
        );
    }

    #[test]
    fn rollout_defaults_to_reference_pacing() {
        let cli = parse(&["trimosaic", "rollout", "in.png", "-o", "out/{frame}.png"]);
        let Command::Rollout(args) = cli.command else {
            panic!("expected rollout");
        };
        assert_eq!(args.schedule(), PointSchedule::default());
        assert_eq!(args.frame_delay_ms, 100);
        assert!(args.gif.is_none());
    }

    #[test]
    fn explicit_counts_replace_the_polynomial() {
        let cli = parse(&[
            "trimosaic",
            "rollout",
            "in.png",
            "-o",
            "{points}.svg",
            "--counts",
            "10,20,40",
            "--frames",
            "7",
        ]);
        let Command::Rollout(args) = cli.command else {
            panic!("expected rollout");
        };
        let schedule = args.schedule();
        assert_eq!(schedule.formula, ScheduleFormula::Explicit(vec![10, 20, 40]));
        assert_eq!(schedule.frames, 3);
    }

    #[test]
    fn config_file_overrides_flags() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"seed": 42, "draws": 123}"#).unwrap();
        let cli = parse(&[
            "trimosaic",
            "single",
            "in.png",
            "--points",
            "1",
            "-o",
            "o.svg",
            "--seed",
            "7",
            "--config",
            path.to_str().unwrap(),
        ]);
        let Command::Single(args) = cli.command else {
            panic!("expected single");
        };
        let config = args.common.mosaic_config().unwrap();
        assert_eq!(config.seed, 42);
        assert_eq!(config.draws, 123);
        assert!((config.sigma_coarse - MosaicConfig::DEFAULT_SIGMA_COARSE).abs() < f32::EPSILON);
    }

    #[test]
    fn malformed_config_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ not json").unwrap();
        let err = load_config(&path).unwrap_err();
        assert!(format!("{err:#}").contains("parsing config"), "{err:#}");
    }

    #[test]
    fn parse_rgb_accepts_three_channels() {
        assert_eq!(parse_rgb("1,2,3"), Ok([1, 2, 3]));
        assert_eq!(parse_rgb(" 255 , 0 ,10"), Ok([255, 0, 10]));
        assert!(parse_rgb("1,2").is_err());
        assert!(parse_rgb("1,2,3,4").is_err());
        assert!(parse_rgb("1,2,300").is_err());
    }

    #[test]
    fn points_is_required_for_single() {
        assert!(Cli::try_parse_from(["trimosaic", "single", "in.png", "-o", "o.svg"]).is_err());
    }
}
