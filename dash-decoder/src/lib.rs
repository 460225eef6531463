//! Dashboard Decoder Library
//!
//! Reads vehicle telemetry off an instrument cluster rendered as pixels and
//! drives a sequential gearbox from an H-pattern shifter.
//!
//! # Architecture
//!
//! - Samples calibrated probe points in a frame: 23 seven-segment digits,
//!   three bar indicators and a nine-position boost knob
//! - Assembles the digits into named telemetry and smooths the boost reading
//! - Publishes a [`VehicleState`] snapshot once per decode tick
//! - Runs a gear state machine on its own poll thread that reads the
//!   published gear and emits up/down pulses
//!
//! The library does NOT:
//! - Capture the screen or find the game window
//! - Render gauges or play sounds
//! - Register hotkeys or send key presses itself (see [`gear::Actuator`])
//!
//! The command-line front end lives in `dash-cli`.
//!
//! # Example Usage
//!
//! ```no_run
//! use dash_decoder::{prepare_frame, Calibration, DashboardDecoder, SharedVehicleState};
//! use std::path::Path;
//! use std::sync::Arc;
//! use std::time::Instant;
//!
//! let calibration = Arc::new(Calibration::load(Path::new("calibration.toml")).unwrap());
//! let mut decoder = DashboardDecoder::new(calibration);
//! let shared = SharedVehicleState::default();
//!
//! let screenshot = image::open("frame.png").unwrap().to_rgb8();
//! let (frame, _crop) = prepare_frame(&screenshot, None).unwrap();
//! decoder.tick(&frame, &shared, Instant::now()).unwrap();
//!
//! let state = shared.snapshot();
//! println!("{} rpm in gear {}", state.rpm, state.gear);
//! ```

pub mod assembler;
pub mod boost;
pub mod config;
pub mod decoder;
pub mod frame;
pub mod gauges;
pub mod gear;
pub mod laps;
pub mod segments;
pub mod state;
pub mod types;
pub mod view;

// Re-export main types for convenience
pub use assembler::{Telemetry, TelemetryAssembler};
pub use boost::BoostSmoother;
pub use config::{BarCalibration, BoostConfig, Calibration, CalibrationError, KnobCalibration, ShiftConfig};
pub use decoder::DashboardDecoder;
pub use frame::{mark_probes, prepare_frame, CropBox};
pub use gear::{GearPoller, GearShiftState, GearShiftStateMachine, ShiftDirection, ShiftMode};
pub use laps::{LapRecord, LapTracker};
pub use segments::{Segment, SegmentDecoder, SegmentMap, SegmentSet};
pub use state::{SharedVehicleState, VehicleState};
pub use types::{DecoderError, PixelSource, Point, RawReadout, Result, Rgb};
pub use view::{CockpitViewDetector, ReferencePixel};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
