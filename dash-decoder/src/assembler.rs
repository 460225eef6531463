//! Telemetry assembly
//!
//! Turns the ordered digit readout into named fields using the fixed
//! positional weights of the reference cluster layout.

use crate::types::RawReadout;
use serde::Serialize;

/// Named values assembled from one readout
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Telemetry {
    pub rpm: u32,
    pub boost_raw: u32,
    pub temp: u32,
    pub fuel: f64,
    pub speed: u32,
    pub gear: u8,
    /// Lap time in seconds
    pub lap_time: f64,
}

/// Digit slot ranges of the reference layout
pub mod slots {
    use std::ops::Range;

    pub const RPM: Range<usize> = 0..4;
    pub const BOOST: Range<usize> = 4..6;
    pub const TEMP: Range<usize> = 6..9;
    pub const FUEL: Range<usize> = 9..13;
    pub const SPEED: Range<usize> = 13..16;
    pub const GEAR: usize = 16;
    pub const LAP_TIME: Range<usize> = 17..23;
}

/// Pure mapping from a readout to [`Telemetry`]
pub struct TelemetryAssembler;

impl TelemetryAssembler {
    pub fn assemble(readout: &RawReadout) -> Telemetry {
        let d = |slot: usize| u32::from(readout.digit(slot));
        let f = |slot: usize| f64::from(readout.digit(slot));

        Telemetry {
            rpm: d(0) * 1000 + d(1) * 100 + d(2) * 10 + d(3),
            boost_raw: d(4) * 10 + d(5),
            temp: d(6) * 100 + d(7) * 10 + d(8),
            fuel: f(9) * 10.0 + f(10) + f(11) * 0.1 + f(12) * 0.01,
            speed: d(13) * 100 + d(14) * 10 + d(15),
            gear: readout.digit(slots::GEAR),
            // Minutes, tens of seconds and seconds sit in the last three slots;
            // the sub-second digits run backwards from slot 19 to slot 17.
            lap_time: f(22) * 60.0
                + f(21) * 10.0
                + f(20)
                + f(19) * 0.1
                + f(18) * 0.01
                + f(17) * 0.001,
        }
    }
}
