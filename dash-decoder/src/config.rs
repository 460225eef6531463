//! Calibration record
//!
//! The calibration file is TOML. It is deserialized into a loose raw form
//! first and then validated into [`Calibration`], so that a missing section
//! fails at load time with a descriptive error instead of surfacing later in
//! the decode path.
//!
//! ```toml
//! [general]
//! lcd_detect_threshold = 100
//!
//! [[digits]]
//! a = [612, 804]
//! b = [617, 809]
//! # ... c through g, then 22 more [[digits]] tables
//!
//! [bars]
//! min_x = 500
//! max_x = 580
//! front_rollbar_y = 900
//! rear_rollbar_y = 910
//! brake_y = 920
//!
//! [boost_knob]
//! positions = [[700, 880], [705, 876], ...]
//!
//! [boost]
//! climb_rate_per_second = 20.0
//! drop_rate_per_second = 30.0
//!
//! [gear_shifting]
//! mode = "clutch"
//! upshift_delay = 0.05
//! downshift_delay = 0.08
//! poll_interval = 0.01
//! ```

use crate::boost::{DEFAULT_INITIAL_BOOST, DEFAULT_SNAP_THRESHOLD};
use crate::gauges::{Bar, LinearBarDecoder, KNOB_POSITIONS};
use crate::gear::ShiftMode;
use crate::segments::{Segment, SegmentMap};
use crate::types::{Point, READOUT_DIGITS};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Errors raised while loading or validating a calibration
#[derive(Debug, thiserror::Error)]
pub enum CalibrationError {
    #[error("Failed to read calibration file {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse calibration: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Missing required calibration section [{0}]")]
    MissingSection(&'static str),

    #[error("Expected {expected} digit layouts, found {found}")]
    DigitCount { expected: usize, found: usize },

    #[error("Digit layout {digit}: {reason}")]
    InvalidDigit { digit: usize, reason: String },

    #[error("Expected {expected} boost knob positions, found {found}")]
    KnobCount { expected: usize, found: usize },

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

/// Horizontal bounds shared by the three bars, and each bar's row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BarCalibration {
    pub min_x: u32,
    pub max_x: u32,
    pub front_rollbar_y: u32,
    pub rear_rollbar_y: u32,
    pub brake_y: u32,
}

impl BarCalibration {
    /// Row at which `bar` is probed
    pub fn y(&self, bar: Bar) -> u32 {
        match bar {
            Bar::FrontRollbar => self.front_rollbar_y,
            Bar::RearRollbar => self.rear_rollbar_y,
            Bar::Brake => self.brake_y,
        }
    }
}

/// Ordered probe points of the boost knob, position 1 first
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KnobCalibration {
    pub positions: [Point; KNOB_POSITIONS],
}

/// Boost smoothing parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoostConfig {
    /// Units per second the smoothed value may rise
    pub climb_rate_per_second: f64,
    /// Units per second the smoothed value may fall
    pub drop_rate_per_second: f64,
    /// Gap above which the smoothed value jumps to the reading
    #[serde(default = "default_snap_threshold")]
    pub snap_threshold: f64,
    /// Value shown before the first reading
    #[serde(default = "default_initial_boost")]
    pub initial: f64,
    /// Stop the rate step at the reading instead of overshooting it
    #[serde(default)]
    pub clamp_to_reading: bool,
}

fn default_snap_threshold() -> f64 {
    DEFAULT_SNAP_THRESHOLD
}

fn default_initial_boost() -> f64 {
    DEFAULT_INITIAL_BOOST
}

impl Default for BoostConfig {
    fn default() -> Self {
        Self {
            climb_rate_per_second: 0.0,
            drop_rate_per_second: 0.0,
            snap_threshold: DEFAULT_SNAP_THRESHOLD,
            initial: DEFAULT_INITIAL_BOOST,
            clamp_to_reading: false,
        }
    }
}

impl BoostConfig {
    /// Builder method: set climb and drop rates (units per second)
    pub fn with_rates(mut self, climb: f64, drop: f64) -> Self {
        self.climb_rate_per_second = climb;
        self.drop_rate_per_second = drop;
        self
    }

    /// Builder method: set the snap threshold
    pub fn with_snap_threshold(mut self, threshold: f64) -> Self {
        self.snap_threshold = threshold;
        self
    }

    /// Builder method: set the initial smoothed value
    pub fn with_initial(mut self, initial: f64) -> Self {
        self.initial = initial;
        self
    }

    /// Builder method: never step past the reading
    pub fn with_clamp_to_reading(mut self, clamp: bool) -> Self {
        self.clamp_to_reading = clamp;
        self
    }

    fn validate(&self) -> Result<(), CalibrationError> {
        non_negative("boost.climb_rate_per_second", self.climb_rate_per_second)?;
        non_negative("boost.drop_rate_per_second", self.drop_rate_per_second)?;
        non_negative("boost.snap_threshold", self.snap_threshold)?;
        if !self.initial.is_finite() {
            return Err(CalibrationError::InvalidValue {
                field: "boost.initial",
                reason: format!("{} is not finite", self.initial),
            });
        }
        Ok(())
    }
}

/// Gear actuation timing and mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShiftConfig {
    pub mode: ShiftMode,
    /// Pause after each upshift pulse
    pub upshift_delay: Duration,
    /// Pause after each downshift pulse
    pub downshift_delay: Duration,
    /// Interval between shifter polls
    pub poll_interval: Duration,
}

impl Default for ShiftConfig {
    fn default() -> Self {
        Self {
            mode: ShiftMode::Clutch,
            upshift_delay: Duration::from_millis(50),
            downshift_delay: Duration::from_millis(50),
            poll_interval: Duration::from_millis(10),
        }
    }
}

impl ShiftConfig {
    /// Builder method: set the operating mode
    pub fn with_mode(mut self, mode: ShiftMode) -> Self {
        self.mode = mode;
        self
    }

    /// Builder method: set per-pulse delays
    pub fn with_delays(mut self, upshift: Duration, downshift: Duration) -> Self {
        self.upshift_delay = upshift;
        self.downshift_delay = downshift;
        self
    }

    /// Builder method: set the poll interval
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }
}

/// Validated, immutable description of the cluster layout
#[derive(Debug, Clone, PartialEq)]
pub struct Calibration {
    /// Brightness below which a probe counts as lit
    pub threshold: u8,
    /// Segment maps in readout order
    pub digits: [SegmentMap; READOUT_DIGITS],
    pub bars: BarCalibration,
    pub knob: KnobCalibration,
    pub boost: BoostConfig,
    pub shifting: ShiftConfig,
}

impl Calibration {
    /// Create a calibration with default boost and shifting parameters
    pub fn new(
        threshold: u8,
        digits: [SegmentMap; READOUT_DIGITS],
        bars: BarCalibration,
        knob: KnobCalibration,
    ) -> Self {
        Self {
            threshold,
            digits,
            bars,
            knob,
            boost: BoostConfig::default(),
            shifting: ShiftConfig::default(),
        }
    }

    /// Builder method: replace the boost parameters
    pub fn with_boost(mut self, boost: BoostConfig) -> Self {
        self.boost = boost;
        self
    }

    /// Builder method: replace the shifting parameters
    pub fn with_shifting(mut self, shifting: ShiftConfig) -> Self {
        self.shifting = shifting;
        self
    }

    /// Load and validate a calibration file
    pub fn load(path: &Path) -> Result<Self, CalibrationError> {
        log::info!("Loading calibration file: {:?}", path);

        let content = std::fs::read_to_string(path).map_err(|source| CalibrationError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let calibration = Self::from_toml_str(&content)?;

        log::info!(
            "Calibration loaded: {} digits, threshold {}, {:?} shifting",
            READOUT_DIGITS,
            calibration.threshold,
            calibration.shifting.mode
        );
        Ok(calibration)
    }

    /// Parse and validate calibration TOML
    pub fn from_toml_str(content: &str) -> Result<Self, CalibrationError> {
        let raw: RawCalibration = toml::from_str(content)?;
        raw.validate()
    }

    /// Every probe point the decoders sample, for overlays and bounds checks
    pub fn probe_points(&self) -> Vec<Point> {
        let mut points: Vec<Point> = self
            .digits
            .iter()
            .flat_map(|map| map.iter().map(|(_, point)| point))
            .collect();

        let bar = LinearBarDecoder::new(self.bars.min_x, self.bars.max_x, self.threshold);
        for which in Bar::ALL {
            points.extend(bar.probes(self.bars.y(which)));
        }

        points.extend(self.knob.positions.iter().copied());
        points
    }

    /// The probe furthest right and the probe furthest down
    ///
    /// A frame must be strictly larger than both coordinates to be decodable.
    pub fn probe_extent(&self) -> Point {
        self.probe_points()
            .into_iter()
            .fold(Point::new(0, 0), |max, p| Point::new(max.x.max(p.x), max.y.max(p.y)))
    }
}

fn non_negative(field: &'static str, value: f64) -> Result<(), CalibrationError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(CalibrationError::InvalidValue {
            field,
            reason: format!("{} must be a non-negative number", value),
        })
    }
}

fn seconds(field: &'static str, value: f64) -> Result<Duration, CalibrationError> {
    Duration::try_from_secs_f64(value).map_err(|e| CalibrationError::InvalidValue {
        field,
        reason: format!("{} seconds: {}", value, e),
    })
}

/// Calibration as written on disk, before validation
#[derive(Debug, Default, Deserialize)]
struct RawCalibration {
    general: Option<RawGeneral>,
    #[serde(default)]
    digits: Vec<BTreeMap<String, Point>>,
    bars: Option<BarCalibration>,
    boost_knob: Option<RawKnob>,
    boost: Option<BoostConfig>,
    #[serde(default)]
    gear_shifting: RawShifting,
}

#[derive(Debug, Deserialize)]
struct RawGeneral {
    lcd_detect_threshold: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct RawKnob {
    #[serde(default)]
    positions: Vec<Point>,
}

#[derive(Debug, Deserialize)]
struct RawShifting {
    #[serde(default = "default_mode")]
    mode: ShiftMode,
    #[serde(default = "default_shift_delay")]
    upshift_delay: f64,
    #[serde(default = "default_shift_delay")]
    downshift_delay: f64,
    #[serde(default = "default_poll_interval")]
    poll_interval: f64,
}

fn default_mode() -> ShiftMode {
    ShiftMode::Clutch
}

fn default_shift_delay() -> f64 {
    0.05
}

fn default_poll_interval() -> f64 {
    0.01
}

impl Default for RawShifting {
    fn default() -> Self {
        Self {
            mode: default_mode(),
            upshift_delay: default_shift_delay(),
            downshift_delay: default_shift_delay(),
            poll_interval: default_poll_interval(),
        }
    }
}

impl RawCalibration {
    fn validate(self) -> Result<Calibration, CalibrationError> {
        let general = self.general.ok_or(CalibrationError::MissingSection("general"))?;
        let raw_threshold = general
            .lcd_detect_threshold
            .ok_or_else(|| CalibrationError::InvalidValue {
                field: "general.lcd_detect_threshold",
                reason: "missing".to_string(),
            })?;
        let threshold = u8::try_from(raw_threshold).map_err(|_| CalibrationError::InvalidValue {
            field: "general.lcd_detect_threshold",
            reason: format!("{} is outside 0..=255", raw_threshold),
        })?;

        if self.digits.is_empty() {
            return Err(CalibrationError::MissingSection("digits"));
        }
        if self.digits.len() != READOUT_DIGITS {
            return Err(CalibrationError::DigitCount {
                expected: READOUT_DIGITS,
                found: self.digits.len(),
            });
        }
        let maps = self
            .digits
            .iter()
            .enumerate()
            .map(|(digit, raw)| segment_map(digit, raw))
            .collect::<Result<Vec<_>, _>>()?;
        let digits: [SegmentMap; READOUT_DIGITS] =
            maps.try_into().map_err(|v: Vec<SegmentMap>| CalibrationError::DigitCount {
                expected: READOUT_DIGITS,
                found: v.len(),
            })?;

        let bars = self.bars.ok_or(CalibrationError::MissingSection("bars"))?;
        if bars.max_x <= bars.min_x {
            return Err(CalibrationError::InvalidValue {
                field: "bars.max_x",
                reason: format!("{} must be greater than min_x {}", bars.max_x, bars.min_x),
            });
        }

        let knob = self.boost_knob.ok_or(CalibrationError::MissingSection("boost_knob"))?;
        let found = knob.positions.len();
        let positions: [Point; KNOB_POSITIONS] = knob
            .positions
            .try_into()
            .map_err(|_| CalibrationError::KnobCount {
                expected: KNOB_POSITIONS,
                found,
            })?;

        let boost = self.boost.ok_or(CalibrationError::MissingSection("boost"))?;
        boost.validate()?;

        let raw_shift = self.gear_shifting;
        let shifting = ShiftConfig {
            mode: raw_shift.mode,
            upshift_delay: seconds("gear_shifting.upshift_delay", raw_shift.upshift_delay)?,
            downshift_delay: seconds("gear_shifting.downshift_delay", raw_shift.downshift_delay)?,
            poll_interval: seconds("gear_shifting.poll_interval", raw_shift.poll_interval)?,
        };

        Ok(Calibration {
            threshold,
            digits,
            bars,
            knob: KnobCalibration { positions },
            boost,
            shifting,
        })
    }
}

fn segment_map(digit: usize, raw: &BTreeMap<String, Point>) -> Result<SegmentMap, CalibrationError> {
    let mut points: [Option<Point>; 7] = [None; 7];

    for (label, point) in raw {
        let segment = Segment::from_label(label).ok_or_else(|| CalibrationError::InvalidDigit {
            digit,
            reason: format!("unknown segment label '{}'", label),
        })?;
        points[segment as usize] = Some(*point);
    }

    let mut resolved = [Point::new(0, 0); 7];
    for (segment, (slot, point)) in Segment::ALL.iter().zip(resolved.iter_mut().zip(points)) {
        *slot = point.ok_or_else(|| CalibrationError::InvalidDigit {
            digit,
            reason: format!("missing segment '{}'", segment.label()),
        })?;
    }

    Ok(SegmentMap::new(resolved))
}
