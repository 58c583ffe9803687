// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Coverscan: rectify a book cover from a still photo.
//
// Entry point. Initialises logging, loads configuration, and drives one scan
// session over the input photo: start, capture, optional manual corners,
// confirm, then writes the flattened cover.

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;

use clap::Parser;

use coverscan_core::human_errors::humanize_error;
use coverscan_core::{Frame, Point, ScanConfig, ScanError};
use coverscan_document::image::{frame_digest, open_frame, save_frame};
use coverscan_session::{FnSink, ScanSession, StillFrameSource};

type CliError = Box<dyn std::error::Error>;
type CliResult<T> = Result<T, CliError>;

/// Four corners in natural image coordinates, any order.
#[derive(Debug, Clone, Copy, PartialEq)]
struct CornerList([Point; 4]);

#[derive(Parser)]
#[command(name = "coverscan")]
#[command(about = "Detect a book cover in a photo and flatten it into an upright image")]
#[command(version)]
struct Cli {
    /// Path to the input photo (JPEG, PNG, ...).
    input: PathBuf,

    /// Where to write the rectified cover. The extension picks the format.
    output: PathBuf,

    /// JSON configuration file. Defaults are used when omitted or unreadable.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Manual corners as eight comma-separated numbers: x,y,x,y,x,y,x,y.
    /// Overrides the detected outline.
    #[arg(long, value_parser = parse_corners, allow_hyphen_values = true)]
    corners: Option<CornerList>,

    /// Skip the homography and use the edge-interpolation rectifier.
    #[arg(long)]
    fallback_only: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match run(&cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            match err.downcast_ref::<ScanError>() {
                Some(scan_err) => {
                    let human = humanize_error(scan_err);
                    eprintln!("error: {}", human.message);
                    eprintln!("hint: {}", human.suggestion);
                }
                None => eprintln!("error: {err}"),
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: &Cli) -> CliResult<()> {
    let mut config = load_config(cli.config.as_ref());
    if cli.fallback_only {
        config.prefer_projective = false;
    }

    tracing::info!("Loading photo: {}", cli.input.display());
    let photo = open_frame(&cli.input)?;
    tracing::info!("Photo size: {}x{}", photo.width(), photo.height());

    let sink = FnSink::new(|cover: &Frame| {
        tracing::info!(width = cover.width(), height = cover.height(), "Cover ready");
    });
    let mut session = ScanSession::new(config, Box::new(StillFrameSource::new(photo)), Box::new(sink))?;

    session.start()?;
    if let Some(report) = session.poll_source(Instant::now())? {
        tracing::info!(
            found = report.detection.quad.is_some(),
            area_ratio = report.detection.area_ratio,
            corners = report.detection.corner_count,
            ready = report.ready,
            "Detection"
        );
    }
    session.capture_current()?;

    if let Some(CornerList(points)) = cli.corners {
        session.set_corners(points)?;
    }
    if let Some(quad) = session.quad() {
        tracing::info!(corners = ?quad.corners(), "Rectifying quad");
    }

    session.confirm_and_wait().await?;

    let cover = session
        .take_output()
        .ok_or_else(|| CliError::from("session completed without a cover"))?;
    save_frame(&cover, &cli.output)?;
    tracing::info!(digest = %frame_digest(&cover), "Cover written to {}", cli.output.display());
    Ok(())
}

fn load_config(path: Option<&PathBuf>) -> ScanConfig {
    let Some(path) = path else {
        return ScanConfig::default();
    };
    match ScanConfig::load(path) {
        Ok(config) => {
            tracing::info!("Configuration loaded from {}", path.display());
            config
        }
        Err(e) => {
            tracing::warn!(error = %e, "Could not load {}; using defaults", path.display());
            ScanConfig::default()
        }
    }
}

fn parse_corners(raw: &str) -> Result<CornerList, String> {
    let values = raw
        .split(',')
        .map(|part| {
            part.trim()
                .parse::<f64>()
                .map_err(|e| format!("'{}' is not a number: {e}", part.trim()))
        })
        .collect::<Result<Vec<_>, _>>()?;

    if values.len() != 8 {
        return Err(format!("expected 8 numbers (4 x,y pairs), got {}", values.len()));
    }
    if values.iter().any(|v| !v.is_finite()) {
        return Err("corner coordinates must be finite".into());
    }

    Ok(CornerList([
        Point::new(values[0], values[1]),
        Point::new(values[2], values[3]),
        Point::new(values[4], values[5]),
        Point::new(values[6], values[7]),
    ]))
}
