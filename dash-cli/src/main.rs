//! Dashboard Reader CLI Application
//!
//! Command-line front end for the dash-decoder library:
//! - Batch decoding of cluster screenshots to JSON
//! - Probe overlays for checking a calibration
//! - Replay of a frame sequence through the decode tick and the gear poller

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use dash_decoder::gear::{Actuator, GrindEffect, ShifterInput};
use dash_decoder::{
    mark_probes, prepare_frame, Calibration, CropBox, DashboardDecoder, GearPoller, LapTracker, SharedVehicleState,
};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Instant;

mod config;
mod report;
mod script;

use config::AppConfig;
use report::{FrameReport, ReplayReport};
use script::{LoggingActuator, LoggingGrind, ScriptedShifter};

/// Dashboard Reader - Read telemetry from instrument cluster screenshots
#[derive(Parser, Debug)]
#[command(name = "dash-cli")]
#[command(about = "Decode instrument cluster screenshots and replay gear shifting", long_about = None)]
#[command(version)]
struct Args {
    /// Path to application config (dash.toml)
    #[arg(short, long, value_name = "FILE", global = true, default_value = "dash.toml")]
    config: PathBuf,

    /// Calibration file, overriding the one named in the config
    #[arg(long, value_name = "FILE", global = true)]
    calibration: Option<PathBuf>,

    /// Verbosity level (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Decode screenshots independently and print their readings
    Decode {
        /// Screenshot files (PNG)
        #[arg(required = true)]
        frames: Vec<PathBuf>,

        /// Output file for the JSON report (default: stdout)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// Draw every calibrated probe point onto a screenshot
    Mark {
        /// Screenshot file (PNG)
        frame: PathBuf,

        /// Where to write the marked image
        #[arg(short, long, value_name = "FILE")]
        output: PathBuf,
    },

    /// Replay frames in order at the decode tick rate
    Replay {
        /// Screenshot files, replayed in name order
        #[arg(required = true)]
        frames: Vec<PathBuf>,

        /// Shifter script (TOML) driving the gear poller
        #[arg(short, long, value_name = "FILE")]
        script: Option<PathBuf>,

        /// Directory to export completed laps to
        #[arg(long, value_name = "DIR")]
        laps_dir: Option<PathBuf>,

        /// Output file for the JSON report (default: stdout)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(args.verbose, args.quiet);

    log::info!("Dashboard Reader CLI v{}", env!("CARGO_PKG_VERSION"));
    log::info!("Using decoder library v{}", dash_decoder::VERSION);

    let config = config::load_or_default(&args.config)?;
    let calibration = Arc::new(config.load_calibration(args.calibration.as_deref())?);

    match &args.command {
        Command::Decode { frames, output } => decode_mode(&config, calibration, frames, output.as_deref()),
        Command::Mark { frame, output } => mark_mode(&config, &calibration, frame, output),
        Command::Replay {
            frames,
            script,
            laps_dir,
            output,
        } => replay_mode(
            &config,
            calibration,
            frames,
            script.as_deref(),
            laps_dir.as_deref(),
            output.as_deref(),
        ),
    }
}

/// Open a screenshot and bring it to the reference size
fn load_frame(path: &Path, crop: Option<CropBox>) -> Result<image::RgbImage> {
    let capture = image::open(path)
        .with_context(|| format!("Failed to open frame: {:?}", path))?
        .to_rgb8();
    let (frame, used) = prepare_frame(&capture, crop).with_context(|| format!("Failed to prepare frame: {:?}", path))?;
    log::trace!("{:?}: content area {:?}", path, used);
    Ok(frame)
}

/// Decode mode - every screenshot on its own, in parallel
fn decode_mode(config: &AppConfig, calibration: Arc<Calibration>, frames: &[PathBuf], output: Option<&Path>) -> Result<()> {
    log::info!("Decoding {} frame(s)", frames.len());

    let reports: Vec<FrameReport> = frames
        .par_iter()
        .map(|path| match decode_one(config, Arc::clone(&calibration), path) {
            Ok(report) => report,
            Err(e) => {
                log::warn!("{:#}", e);
                FrameReport::failed(path.clone(), &e)
            }
        })
        .collect();

    let failed = reports.iter().filter(|r| r.error.is_some()).count();
    if failed > 0 {
        log::warn!("{} of {} frame(s) could not be decoded", failed, reports.len());
    }

    report::write_json(&reports, output)
}

fn decode_one(config: &AppConfig, calibration: Arc<Calibration>, path: &Path) -> Result<FrameReport> {
    let frame = load_frame(path, config.crop)?;
    let mut decoder = DashboardDecoder::new(calibration);

    let readout = decoder.read_readout(&frame)?;
    let state = decoder.decode(&frame, Instant::now())?.clone();

    Ok(FrameReport {
        file: path.to_path_buf(),
        state: Some(state),
        unrecognized_slots: readout.unrecognized_slots().collect(),
        error: None,
    })
}

/// Mark mode - overlay the probe points for calibration checks
fn mark_mode(config: &AppConfig, calibration: &Calibration, frame: &Path, output: &Path) -> Result<()> {
    let mut image = load_frame(frame, config.crop)?;
    let marked = mark_probes(&mut image, calibration);
    let total = calibration.probe_points().len();
    if marked < total {
        log::warn!("{} probe point(s) fall outside the frame", total - marked);
    }

    image
        .save(output)
        .with_context(|| format!("Failed to write marked frame: {:?}", output))?;
    log::info!("Marked {} probe points into {:?}", marked, output);
    Ok(())
}

/// Replay mode - decode tick plus gear poller over a frame sequence
fn replay_mode(
    config: &AppConfig,
    calibration: Arc<Calibration>,
    frames: &[PathBuf],
    script: Option<&Path>,
    laps_dir: Option<&Path>,
    output: Option<&Path>,
) -> Result<()> {
    let mut frames = frames.to_vec();
    frames.sort();

    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        log::info!("Shutdown signal received...");
        r.store(false, Ordering::SeqCst);
    })
    .context("Failed to install Ctrl-C handler")?;

    let steps = match script {
        Some(path) => script::load_script(path)?,
        None => Vec::new(),
    };

    let started = Instant::now();
    let started_wall = chrono::Local::now();
    let shared = SharedVehicleState::default();
    let actuator = LoggingActuator::new(started);
    let mut poller = config.hshifter.then(|| {
        GearPoller::new(
            &calibration.shifting,
            shared.clone(),
            ScriptedShifter::new(steps, started),
            actuator.clone(),
            LoggingGrind::default(),
        )
    });
    if poller.is_none() && script.is_some() {
        log::warn!("Shifter script ignored: hshifter is off");
    }

    let detector = config.view_detector();
    let mut decoder = DashboardDecoder::with_start_time(calibration, started);
    let mut laps = LapTracker::new(started);
    let mut summary = ReplayReport {
        frames: frames.len(),
        ..ReplayReport::default()
    };

    log::info!("Replaying {} frame(s) every {} ms", frames.len(), config.loop_ms);
    for path in &frames {
        if !running.load(Ordering::SeqCst) {
            summary.interrupted = true;
            break;
        }
        let tick_start = Instant::now();

        let frame = match load_frame(path, config.crop) {
            Ok(frame) => frame,
            Err(e) => {
                log::warn!("Skipping frame: {:#}", e);
                summary.skipped += 1;
                continue;
            }
        };

        if detector.is_cockpit_view(&frame) {
            if cockpit_tick(&mut decoder, &frame, &shared, poller.as_mut(), tick_start)? {
                summary.decoded += 1;
                let (lap_time, fuel) = shared.read(|s| (s.lap_time, s.fuel));
                laps.update(lap_time, fuel, tick_start);
            } else {
                log::warn!("Skipping tick for {:?}", path);
                summary.skipped += 1;
            }
        } else {
            log::debug!("{:?} is not the cockpit view", path);
            summary.outside_cockpit += 1;
            if let Some(poller) = poller.as_mut() {
                poller.stop();
            }
        }

        if let Some(rest) = config.tick_interval().checked_sub(tick_start.elapsed()) {
            thread::sleep(rest);
        }
    }

    if let Some(poller) = poller.as_mut() {
        poller.stop();
        summary.shift_state = Some(poller.shift_state());
    }

    summary.final_state = (summary.decoded > 0).then(|| shared.snapshot());
    summary.pulses = actuator.pulses();
    summary.laps = laps.laps().to_vec();

    if let Some(dir) = laps_dir {
        let path = report::export_laps(dir, laps.laps(), started_wall)?;
        log::info!("{} lap(s) exported to {:?}", laps.laps().len(), path);
    }

    report::write_json(&summary, output)
}

/// Decode one cockpit frame; returns whether it was decoded
///
/// The poller is only started once a tick has succeeded, so its first poll
/// sees a decoded gear.
fn cockpit_tick<S, A, G>(
    decoder: &mut DashboardDecoder,
    frame: &image::RgbImage,
    shared: &SharedVehicleState,
    poller: Option<&mut GearPoller<S, A, G>>,
    now: Instant,
) -> Result<bool>
where
    S: ShifterInput + Send + 'static,
    A: Actuator + Send + 'static,
    G: GrindEffect + Send + 'static,
{
    if let Err(e) = decoder.tick(frame, shared, now) {
        log::warn!("Decode failed: {}", e);
        return Ok(false);
    }
    if let Some(poller) = poller {
        poller.start()?;
    }
    Ok(true)
}

/// Initialize logging based on verbosity level
fn init_logging(verbose: u8, quiet: bool) {
    use env_logger::Builder;
    use log::LevelFilter;
    use std::io::Write;

    let level = if quiet {
        LevelFilter::Error
    } else {
        match verbose {
            0 => LevelFilter::Info,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    };

    Builder::new()
        .filter_level(level)
        .format(|buf, record| {
            writeln!(
                buf,
                "[{} {}] {}",
                record.level(),
                record.target(),
                record.args()
            )
        })
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_parse_replay() {
        let args = Args::try_parse_from([
            "dash-cli",
            "-vv",
            "replay",
            "b.png",
            "a.png",
            "--script",
            "shift.toml",
        ])
        .unwrap();

        assert_eq!(args.verbose, 2);
        assert_eq!(args.config, PathBuf::from("dash.toml"));
        match args.command {
            Command::Replay { frames, script, .. } => {
                assert_eq!(frames.len(), 2);
                assert_eq!(script, Some(PathBuf::from("shift.toml")));
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_poller_waits_for_successful_tick() {
        use dash_decoder::config::{BarCalibration, KnobCalibration};
        use dash_decoder::segments::SegmentMap;
        use dash_decoder::types::Point;

        let calibration = Calibration::new(
            100,
            std::array::from_fn(|i| SegmentMap::grid(Point::new(10 + 16 * i as u32, 10), 10)),
            BarCalibration {
                min_x: 20,
                max_x: 180,
                front_rollbar_y: 60,
                rear_rollbar_y: 70,
                brake_y: 80,
            },
            KnobCalibration {
                positions: std::array::from_fn(|k| Point::new(20 + 20 * k as u32, 120)),
            },
        );
        let started = Instant::now();
        let shared = SharedVehicleState::default();
        let mut poller = GearPoller::new(
            &calibration.shifting,
            shared.clone(),
            ScriptedShifter::new(Vec::new(), started),
            LoggingActuator::new(started),
            LoggingGrind::default(),
        );
        let mut decoder = DashboardDecoder::new(Arc::new(calibration));

        let small = image::RgbImage::new(50, 50);
        assert!(!cockpit_tick(&mut decoder, &small, &shared, Some(&mut poller), started).unwrap());
        assert!(!poller.is_running());

        let frame = image::RgbImage::from_pixel(400, 200, image::Rgb([235, 235, 235]));
        assert!(cockpit_tick(&mut decoder, &frame, &shared, Some(&mut poller), started).unwrap());
        assert!(poller.is_running());
        poller.stop();
    }

    #[test]
    fn test_decode_requires_frames() {
        assert!(Args::try_parse_from(["dash-cli", "decode"]).is_err());
    }
}
