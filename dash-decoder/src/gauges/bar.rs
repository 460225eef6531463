//! Linear bar decoder (rollbars and brake bias)

use crate::types::{PixelSource, Point};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of evenly spaced probes across a bar
pub const BAR_PROBES: usize = 9;

/// Level reported when the very first probe is unlit
pub const BAR_EMPTY_LEVEL: i8 = -1;

/// Level reported when every probe is lit and no boundary exists
pub const BAR_FULL_LEVEL: i8 = 7;

/// The three bars that share one set of x-bounds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Bar {
    FrontRollbar,
    RearRollbar,
    Brake,
}

impl Bar {
    pub const ALL: [Bar; 3] = [Bar::FrontRollbar, Bar::RearRollbar, Bar::Brake];
}

impl fmt::Display for Bar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Bar::FrontRollbar => write!(f, "front rollbar"),
            Bar::RearRollbar => write!(f, "rear rollbar"),
            Bar::Brake => write!(f, "brake"),
        }
    }
}

/// Finds the lit/unlit boundary of a horizontal bar
///
/// The probe x-coordinates are derived once from the bounds: the span is cut
/// into 8 equal cells and probe `i` sits at `x_min + width * (i + 0.5)`,
/// truncated to a whole pixel.
#[derive(Debug, Clone, PartialEq)]
pub struct LinearBarDecoder {
    probe_x: [u32; BAR_PROBES],
    threshold: u8,
}

impl LinearBarDecoder {
    pub fn new(x_min: u32, x_max: u32, threshold: u8) -> Self {
        let width = (f64::from(x_max) - f64::from(x_min)) / (BAR_PROBES - 1) as f64;
        let mut probe_x = [0u32; BAR_PROBES];
        for (i, x) in probe_x.iter_mut().enumerate() {
            *x = (f64::from(x_min) + width * (i as f64 + 0.5)) as u32;
        }

        Self { probe_x, threshold }
    }

    /// Probe x-coordinates, left to right
    pub fn probe_xs(&self) -> &[u32; BAR_PROBES] {
        &self.probe_x
    }

    /// Probe coordinates for a bar drawn at row `y`
    pub fn probes(&self, y: u32) -> impl Iterator<Item = Point> + '_ {
        self.probe_x.iter().map(move |x| Point::new(*x, y))
    }

    /// Read the bar drawn at row `y`
    ///
    /// Returns `i - 1` for the first unlit probe `i`, so the result is in
    /// `-1..=7`. A fully lit bar has no boundary and clamps to
    /// [`BAR_FULL_LEVEL`].
    pub fn decode<P: PixelSource + ?Sized>(&self, frame: &P, y: u32) -> i8 {
        for (i, point) in self.probes(y).enumerate() {
            if !frame.is_lit(point, self.threshold) {
                return i as i8 - 1;
            }
        }

        log::trace!("Bar at y={} fully lit, clamping to {}", y, BAR_FULL_LEVEL);
        BAR_FULL_LEVEL
    }
}
