//! crtmatch CLI: CRT t0 matching of reconstructed tracks.
//!
//! Reads JSON event files, matches every track to the CRT hits of its event
//! and writes one result row per track.
#![allow(
    clippy::uninlined_format_args,
    clippy::cast_precision_loss,
    clippy::too_many_lines
)]

use clap::{Parser, Subcommand, ValueEnum};
use crtmatch_algorithms::{track_t0_range, CrtT0Matcher, TpcLayout};
use crtmatch_core::{
    ConstantDriftVelocity, DcaShape, DetectorServices, DirectionMethod, DistortionCorrection,
    DriftGeometry, MatchConfig, NoDistortion, SelectionPolicy,
};
use crtmatch_io::{
    read_config, read_distortion, read_event_file, read_layout, EventFile, MatchRecord,
    MatchWriter,
};
use log::{debug, info};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::time::Instant;
use thiserror::Error;

/// Result type for CLI operations.
type Result<T> = std::result::Result<T, CliError>;

/// CLI error types.
#[derive(Error, Debug)]
enum CliError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("I/O error: {0}")]
    CrtmatchIo(#[from] crtmatch_io::Error),

    #[error("Core error: {0}")]
    Core(#[from] crtmatch_core::Error),
}

/// Track direction estimate.
#[derive(Debug, Clone, Copy, ValueEnum)]
enum Direction {
    /// Chords from each end to the midpoint
    Midpoint,
    /// Average of local directions near each end
    Averaged,
    /// Chords over the end blocks of points
    Points,
}

impl From<Direction> for DirectionMethod {
    fn from(value: Direction) -> Self {
        match value {
            Direction::Midpoint => Self::EndpointMidpoint,
            Direction::Averaged => Self::Averaged,
            Direction::Points => Self::AveragedPoints,
        }
    }
}

/// Hit shape for the distance of closest approach.
#[derive(Debug, Clone, Copy, ValueEnum)]
enum Shape {
    /// Hit centre
    Point,
    /// Uncertainty box
    Box,
}

impl From<Shape> for DcaShape {
    fn from(value: Shape) -> Self {
        match value {
            Shape::Point => Self::Point,
            Shape::Box => Self::Box,
        }
    }
}

/// Best-candidate rule.
#[derive(Debug, Clone, Copy, ValueEnum)]
enum Selection {
    /// Smallest DCA
    Dca,
    /// Smallest DCA over extrapolation length
    DcaOverLength,
}

impl From<Selection> for SelectionPolicy {
    fn from(value: Selection) -> Self {
        match value {
            Selection::Dca => Self::Dca,
            Selection::DcaOverLength => Self::DcaOverLength,
        }
    }
}

/// Parses a drift velocity, which must be finite and positive.
fn parse_drift_velocity(value: &str) -> std::result::Result<f64, String> {
    let velocity: f64 = value.parse().map_err(|e| format!("{e}"))?;
    if velocity.is_finite() && velocity > 0.0 {
        Ok(velocity)
    } else {
        Err(format!("drift velocity must be positive, got {value}"))
    }
}

/// CRT track-to-hit t0 matching.
#[derive(Parser)]
#[command(name = "crtmatch")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Match every track of an event file to CRT hits
    Match {
        /// Input event file (JSON)
        input: PathBuf,

        /// Output file path (.csv, or .jsonl for JSON lines)
        #[arg(short, long)]
        output: PathBuf,

        /// Matcher configuration (JSON); missing fields keep their defaults
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// TPC layout (JSON); defaults to the two-cryostat layout
        #[arg(short, long)]
        geometry: Option<PathBuf>,

        /// Per-volume space-charge offsets (JSON); no correction when absent
        #[arg(long)]
        distortion: Option<PathBuf>,

        /// Drift velocity (cm/us)
        #[arg(
            long,
            default_value_t = ConstantDriftVelocity::NOMINAL,
            value_parser = parse_drift_velocity
        )]
        drift_velocity: f64,

        /// Track direction estimate, overrides the configuration
        #[arg(long, value_enum)]
        direction_method: Option<Direction>,

        /// Hit shape for the DCA, overrides the configuration
        #[arg(long, value_enum)]
        dca_shape: Option<Shape>,

        /// Best-candidate rule, overrides the configuration
        #[arg(long, value_enum)]
        selection: Option<Selection>,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Show information about an event file
    Info {
        /// Input event file (JSON)
        input: PathBuf,
    },

    /// Print the admissible t0 window of a track
    #[command(allow_negative_numbers = true)]
    Window {
        /// x of the track start (cm)
        start_x: f64,
        /// x of the track end (cm)
        end_x: f64,
        /// Drift direction: -1, 0 or 1
        drift_direction: i32,
        /// Lower x limit of the drift volume (cm)
        x_min: f64,
        /// Upper x limit of the drift volume (cm)
        x_max: f64,

        /// Drift velocity (cm/us)
        #[arg(
            long,
            default_value_t = ConstantDriftVelocity::NOMINAL,
            value_parser = parse_drift_velocity
        )]
        drift_velocity: f64,
    },
}

/// Matches all tracks of `events` in parallel, in file order.
///
/// Tracks with a drift override in the file use it; the others are looked up
/// in `layout`.
fn match_events(
    events: &EventFile,
    matcher: &CrtT0Matcher<'_>,
    layout: &TpcLayout,
) -> Result<Vec<MatchRecord>> {
    let jobs: Vec<_> = events
        .events
        .iter()
        .flat_map(|event| event.tracks.iter().map(move |track| (event, track)))
        .collect();

    let records = jobs
        .par_iter()
        .map(|&(event, entry)| -> Result<MatchRecord> {
            let track = entry.to_track()?;
            if track.length() < matcher.config().min_track_length {
                debug!("event {} track {}: too short", event.id, track.id);
                return Ok(MatchRecord::unmatched(event.id, track.id));
            }

            let fixed = entry.drift_override();
            let geometry: &dyn DriftGeometry = match &fixed {
                Some(fixed) => fixed,
                None => layout,
            };
            let best = matcher.closest_hit(&track, &event.hits, geometry);
            let matched = matcher.accepts(&best);
            Ok(MatchRecord::new(event.id, track.id, &best, matched))
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(records)
}

/// Distortion correction from `path`, or none.
fn load_distortion(path: Option<&Path>) -> Result<Box<dyn DistortionCorrection>> {
    Ok(match path {
        Some(path) => Box::new(read_distortion(path)?),
        None => Box::new(NoDistortion),
    })
}

fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Match {
            input,
            output,
            config,
            geometry,
            distortion,
            drift_velocity,
            direction_method,
            dca_shape,
            selection,
            verbose,
        } => {
            init_logging(verbose);

            let mut config = match config {
                Some(path) => read_config(path)?,
                None => MatchConfig::default(),
            };
            if let Some(method) = direction_method {
                config = config.with_direction_method(method.into());
            }
            if let Some(shape) = dca_shape {
                config = config.with_dca_shape(shape.into());
            }
            if let Some(selection) = selection {
                config = config.with_selection(selection.into());
            }

            let layout = match geometry {
                Some(path) => read_layout(path)?,
                None => TpcLayout::two_cryostat(),
            };
            info!("Using {} TPC volumes", layout.tpcs().len());

            let distortion = load_distortion(distortion.as_deref())?;
            if !config.sce_position_correction && distortion.enabled() {
                info!("Distortion offsets loaded but position correction is disabled");
            }

            let drift = ConstantDriftVelocity(drift_velocity);
            let services = DetectorServices::new(&drift, &layout, distortion.as_ref());
            let matcher = CrtT0Matcher::new(config, services)?;

            let start = Instant::now();
            let events = read_event_file(&input)?;
            let records = match_events(&events, &matcher, &layout)?;

            let mut writer = MatchWriter::create(&output)?;
            writer.write_all(&records)?;
            let written = writer.finish()?;
            let elapsed = start.elapsed();

            let matched = records.iter().filter(|r| r.matched).count();
            info!("Wrote {} records to {}", written, output.display());
            println!(
                "Processed {} events in {:.2}s",
                events.events.len(),
                elapsed.as_secs_f64()
            );
            println!("Tracks: {}", records.len());
            println!("Matched: {}", matched);
        }

        Commands::Info { input } => {
            init_logging(false);
            let events = read_event_file(&input)?;

            println!("File: {}", input.display());
            println!("Events: {}", events.events.len());
            println!("Tracks: {}", events.num_tracks());
            println!("Hits: {}", events.num_hits());

            let range = events
                .events
                .iter()
                .filter_map(|event| event.ts1_range())
                .reduce(|(lo, hi), (a, b)| (lo.min(a), hi.max(b)));
            if let Some((lo, hi)) = range {
                println!(
                    "Hit time range (ts1): {:.3} - {:.3} us",
                    lo as f64 * 1e-3,
                    hi as f64 * 1e-3
                );
            }

            let overrides = events
                .events
                .iter()
                .flat_map(|event| &event.tracks)
                .filter(|track| track.drift_override().is_some())
                .count();
            println!("Tracks with drift override: {}", overrides);
        }

        Commands::Window {
            start_x,
            end_x,
            drift_direction,
            x_min,
            x_max,
            drift_velocity,
        } => {
            let window = track_t0_range(
                start_x,
                end_x,
                drift_direction,
                (x_min, x_max),
                drift_velocity,
            );
            if window.is_degenerate() {
                println!("t0 window: unconstrained");
            } else {
                println!("t0 window: {:.3} - {:.3} us", window.t0_min, window.t0_max);
            }
        }
    }

    Ok(())
}
