//! trimosaic: render low-poly mosaics and animated rollouts from images.
//!
//! Samples points where the image has edges, triangulates them, and fills
//! every triangle with the mean color of the pixels it covers.
//!
//! # Usage
//!
//! ```text
//! trimosaic single photo.jpg --points 2000 -o mosaic.svg
//! trimosaic rollout photo.jpg -o frames/{frame}.png --gif rollout.gif
//! ```

#![allow(clippy::print_stderr)]

mod cli;
mod output;

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;
use trimosaic_export::{GifAssembler, SvgMetadata};
use trimosaic_pipeline::{MosaicConfig, Pipeline, Sampled};

use crate::cli::{Cli, Command, CommonArgs, RolloutArgs, SingleArgs};
use crate::output::{
    DiagnosticsReport, FrameRecord, OutputFormat, OutputTemplate, describe, export_frame,
    write_frame,
};

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match &cli.command {
        Command::Single(args) => run_single(args),
        Command::Rollout(args) => run_rollout(args),
    };
    match result {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

/// Log to stderr at `info`, honoring `RUST_LOG` unless `--verbose` asks
/// for `debug`.
fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Decode, compute saliency and sample: the work shared by every frame.
fn prepare(input: &Path, common: &CommonArgs) -> anyhow::Result<(MosaicConfig, Sampled)> {
    let config = common.mosaic_config()?;
    let bytes = std::fs::read(input).with_context(|| format!("reading {}", input.display()))?;
    tracing::info!(input = %input.display(), bytes = bytes.len(), "loaded image");

    let sampled = Pipeline::new(bytes, config.clone())
        .decode()
        .with_context(|| format!("processing {}", input.display()))?
        .saliency()
        .sample();
    tracing::debug!("\n{}", sampled.diagnostics().report());

    if let Some(path) = &common.saliency_out {
        let preview = sampled.saliency().to_gray_image();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating directory {}", parent.display()))?;
        }
        preview
            .save(path)
            .with_context(|| format!("writing saliency preview {}", path.display()))?;
        tracing::info!(path = %path.display(), "wrote saliency preview");
    }

    Ok((config, sampled))
}

fn title_of(input: &Path) -> &str {
    input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("trimosaic")
}

fn run_single(args: &SingleArgs) -> anyhow::Result<ExitCode> {
    let format = OutputFormat::from_path(&args.output)?;
    let (config, sampled) = prepare(&args.input, &args.common)?;

    let frame = sampled.frame(args.points)?;
    let description = describe(&config, args.points);
    let metadata = SvgMetadata {
        title: Some(title_of(&args.input)),
        description: Some(&description),
    };
    write_frame(
        &frame,
        &args.output,
        format,
        &args.common.render_options(),
        &metadata,
    )?;

    if let Some(path) = &args.common.diagnostics {
        let frames = [FrameRecord {
            index: 0,
            output: args.output.clone(),
            written: true,
            in_gif: None,
            diagnostics: frame.diagnostics().clone(),
        }];
        DiagnosticsReport {
            input: &args.input,
            config: &config,
            run: sampled.diagnostics(),
            frames: &frames,
        }
        .write(path)?;
    }
    Ok(ExitCode::SUCCESS)
}

fn run_rollout(args: &RolloutArgs) -> anyhow::Result<ExitCode> {
    let template = OutputTemplate::parse(&args.output)?;
    let format = template.format()?;
    let schedule = args.schedule();
    schedule.validate()?;
    let paths = template.paths(&schedule.counts()?)?;

    let (config, sampled) = prepare(&args.input, &args.common)?;
    let rollout = sampled.rollout(&schedule)?;
    let frame_count = rollout.len();
    tracing::info!(
        frames = frame_count,
        pool = sampled.pool().len(),
        "starting rollout"
    );

    let mut gif = match &args.gif {
        Some(path) => Some(open_gif(path, args)?),
        None => None,
    };
    let options = args.common.render_options();
    let title = title_of(&args.input);
    let mut records = Vec::with_capacity(frame_count);
    let mut failed = 0usize;
    let mut gif_failed = 0usize;

    for (item, path) in rollout.zip(paths) {
        let (index, frame) = item?;
        let description = describe(&config, frame.sampled_points());
        let metadata = SvgMetadata {
            title: Some(title),
            description: Some(&description),
        };

        let outcome = export_frame(&frame, &path, format, &options, &metadata, gif.as_mut());
        if !outcome.written {
            failed += 1;
        }
        if outcome.in_gif == Some(false) {
            gif_failed += 1;
        }
        records.push(FrameRecord {
            index,
            output: path,
            written: outcome.written,
            in_gif: outcome.in_gif,
            diagnostics: frame.diagnostics().clone(),
        });
    }

    if let Some(gif) = gif {
        let frames = gif.finish().context("finishing gif")?;
        if gif_failed > 0 {
            tracing::warn!(failed = gif_failed, "some frames are missing from the gif");
        }
        tracing::info!(frames, "wrote gif");
    }

    if let Some(path) = &args.common.diagnostics {
        DiagnosticsReport {
            input: &args.input,
            config: &config,
            run: sampled.diagnostics(),
            frames: &records,
        }
        .write(path)?;
    }

    if failed > 0 {
        tracing::warn!(failed, total = frame_count, "some frames failed to export");
    }
    if failed == frame_count {
        eprintln!("Error: every frame failed to export");
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}

fn open_gif(path: &Path, args: &RolloutArgs) -> anyhow::Result<GifAssembler<BufWriter<File>>> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating directory {}", parent.display()))?;
    }
    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    let gif = GifAssembler::new(BufWriter::new(file), args.frame_delay_ms)?;
    Ok(match args.final_hold_ms {
        Some(hold) => gif.with_final_hold(hold),
        None => gif,
    })
}
