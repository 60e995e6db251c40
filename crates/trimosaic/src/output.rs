//! Output paths, formats and file writing.

use std::collections::HashSet;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use image::ImageFormat;
use serde::Serialize;
use trimosaic_export::{GifAssembler, RenderOptions, SvgMetadata, encode, render_rgba, to_svg};
use trimosaic_pipeline::{Frame, FrameDiagnostics, MosaicConfig, RgbaImage, RunDiagnostics};

/// How a frame is written, chosen by the output extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// SVG document.
    Svg,
    /// Raster image in the given format.
    Raster(ImageFormat),
}

impl OutputFormat {
    /// Pick the format from `path`'s extension.
    ///
    /// # Errors
    ///
    /// Returns an error if the extension is missing or not an image
    /// format the `image` crate can write.
    pub fn from_path(path: &Path) -> anyhow::Result<Self> {
        let is_svg = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("svg"));
        if is_svg {
            return Ok(Self::Svg);
        }
        match ImageFormat::from_path(path) {
            Ok(format) if format.can_write() => Ok(Self::Raster(format)),
            _ => bail!(
                "cannot infer an output format from {}; use .svg or an image extension such as .png",
                path.display()
            ),
        }
    }
}

/// A rollout output path with `{frame}` and `{points}` placeholders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputTemplate {
    pattern: String,
}

impl OutputTemplate {
    const FRAME: &'static str = "{frame}";
    const POINTS: &'static str = "{points}";

    /// Parse a template.
    ///
    /// # Errors
    ///
    /// Returns an error if neither placeholder is present, since every
    /// frame would then overwrite the same file.
    pub fn parse(pattern: &str) -> anyhow::Result<Self> {
        if !pattern.contains(Self::FRAME) && !pattern.contains(Self::POINTS) {
            bail!(
                "output template {pattern:?} needs a {} or {} placeholder",
                Self::FRAME,
                Self::POINTS
            );
        }
        Ok(Self {
            pattern: pattern.to_string(),
        })
    }

    /// Output format implied by the template's extension.
    ///
    /// # Errors
    ///
    /// See [`OutputFormat::from_path`].
    pub fn format(&self) -> anyhow::Result<OutputFormat> {
        OutputFormat::from_path(Path::new(&self.pattern))
    }

    /// Path for frame `index` of `frame_count` holding `points` sampled
    /// points.  Frame indices are zero-padded to the width of the last
    /// index so files sort in frame order.
    #[must_use]
    pub fn render(&self, index: usize, points: usize, frame_count: usize) -> PathBuf {
        let width = frame_count.saturating_sub(1).max(1).to_string().len();
        PathBuf::from(
            self.pattern
                .replace(Self::FRAME, &format!("{index:0width$}"))
                .replace(Self::POINTS, &points.to_string()),
        )
    }

    /// Paths for every frame of a schedule with the given point `counts`.
    ///
    /// # Errors
    ///
    /// Returns an error if two frames map to the same path, which happens
    /// when a `{points}`-only template meets a schedule that repeats a
    /// count.
    pub fn paths(&self, counts: &[usize]) -> anyhow::Result<Vec<PathBuf>> {
        let mut seen = HashSet::with_capacity(counts.len());
        let mut paths = Vec::with_capacity(counts.len());
        for (index, &points) in counts.iter().enumerate() {
            let path = self.render(index, points, counts.len());
            if !seen.insert(path.clone()) {
                bail!(
                    "frame {index} would overwrite {} ({points} points repeats); add a {} placeholder",
                    path.display(),
                    Self::FRAME
                );
            }
            paths.push(path);
        }
        Ok(paths)
    }
}

/// Write `bytes` to `path`, creating parent directories.
///
/// # Errors
///
/// Returns an error if a directory or the file cannot be written.
pub fn write_file(path: &Path, bytes: &[u8]) -> anyhow::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating directory {}", parent.display()))?;
    }
    std::fs::write(path, bytes).with_context(|| format!("writing {}", path.display()))
}

/// Render `frame` in `format` and write it to `path`.
///
/// Returns the raster render when one was produced so a caller can
/// reuse it.
///
/// # Errors
///
/// Returns an error if rendering, encoding, or writing fails.
pub fn write_frame(
    frame: &Frame,
    path: &Path,
    format: OutputFormat,
    options: &RenderOptions,
    metadata: &SvgMetadata<'_>,
) -> anyhow::Result<Option<RgbaImage>> {
    let (bytes, raster) = match format {
        OutputFormat::Svg => (to_svg(frame, options, metadata).into_bytes(), None),
        OutputFormat::Raster(image_format) => {
            let rgba = render_rgba(frame, options)?;
            (encode(&rgba, image_format)?, Some(rgba))
        }
    };
    write_file(path, &bytes)?;
    tracing::info!(
        path = %path.display(),
        points = frame.sampled_points(),
        bytes = bytes.len(),
        "wrote frame"
    );
    Ok(raster)
}

/// Outcome of exporting one rollout frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameExport {
    /// Whether the frame file was written.
    pub written: bool,
    /// Whether the frame reached the GIF, or `None` without a GIF.
    pub in_gif: Option<bool>,
}

/// Write `frame` to `path` and append it to `gif` when one is open.
///
/// The file and the GIF succeed or fail independently; failures are
/// logged and reported in the returned [`FrameExport`].
pub fn export_frame<W: Write>(
    frame: &Frame,
    path: &Path,
    format: OutputFormat,
    options: &RenderOptions,
    metadata: &SvgMetadata<'_>,
    gif: Option<&mut GifAssembler<W>>,
) -> FrameExport {
    let (written, raster) = match write_frame(frame, path, format, options, metadata) {
        Ok(raster) => (true, raster),
        Err(err) => {
            tracing::error!(path = %path.display(), "frame export failed: {err:#}");
            (false, None)
        }
    };
    let in_gif = gif.map(|gif| {
        let pushed = match raster {
            Some(rgba) => gif.push(rgba),
            None => render_rgba(frame, options).and_then(|rgba| gif.push(rgba)),
        };
        pushed
            .inspect_err(|err| tracing::error!(path = %path.display(), "gif frame failed: {err:#}"))
            .is_ok()
    });
    FrameExport { written, in_gif }
}

/// Human-readable description embedded in SVG output.
#[must_use]
pub fn describe(config: &MosaicConfig, points: usize) -> String {
    format!(
        "trimosaic: {points} points, sigma {}/{}, negative scale {}, {} draws, seed {}",
        config.sigma_fine, config.sigma_coarse, config.negative_scale, config.draws, config.seed
    )
}

/// Diagnostics of one written (or failed) frame.
#[derive(Debug, Serialize)]
pub struct FrameRecord {
    /// Frame index within the run.
    pub index: usize,
    /// Output path.
    pub output: PathBuf,
    /// Whether the frame file was written.
    pub written: bool,
    /// Whether the frame reached the GIF, when one was requested.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub in_gif: Option<bool>,
    /// Frame counts and timings.
    pub diagnostics: FrameDiagnostics,
}

/// Everything written by `--diagnostics`.
#[derive(Debug, Serialize)]
pub struct DiagnosticsReport<'a> {
    /// Input image path.
    pub input: &'a Path,
    /// Pipeline configuration used.
    pub config: &'a MosaicConfig,
    /// Shared stage diagnostics.
    pub run: &'a RunDiagnostics,
    /// Per-frame diagnostics in frame order.
    pub frames: &'a [FrameRecord],
}

impl DiagnosticsReport<'_> {
    /// Serialize as pretty JSON and write to `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    pub fn write(&self, path: &Path) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(self).context("serializing diagnostics")?;
        write_file(path, json.as_bytes())
    }
}
