//! Inertial boost gauge
//!
//! The LCD boost readout jumps in whole units and glitches now and then. The
//! smoother moves its output toward each reading at a bounded rate so a needle
//! driven from it sweeps instead of jumping, and snaps straight to the reading
//! when the gap is too large to be ordinary motion (a restart, a decode glitch).

use crate::config::BoostConfig;
use std::time::Instant;

/// Default gap above which the smoother snaps to the reading
pub const DEFAULT_SNAP_THRESHOLD: f64 = 15.0;

/// Boost value shown before the first reading arrives
pub const DEFAULT_INITIAL_BOOST: f64 = 30.0;

#[derive(Debug, Clone)]
pub struct BoostSmoother {
    current: f64,
    last_update: Instant,
    climb_rate: f64,
    drop_rate: f64,
    snap_threshold: f64,
    clamp_to_reading: bool,
}

impl BoostSmoother {
    pub fn new(config: &BoostConfig, now: Instant) -> Self {
        Self {
            current: config.initial,
            last_update: now,
            climb_rate: config.climb_rate_per_second,
            drop_rate: config.drop_rate_per_second,
            snap_threshold: config.snap_threshold,
            clamp_to_reading: config.clamp_to_reading,
        }
    }

    /// Smoothed value
    pub fn current(&self) -> f64 {
        self.current
    }

    pub fn last_update(&self) -> Instant {
        self.last_update
    }

    /// Feed one reading taken at `now` and return the new smoothed value
    ///
    /// The output moves `rate * elapsed` toward the reading, which can carry it
    /// past a reading that is closer than one step unless `clamp_to_reading`
    /// is set. A remaining gap above the snap threshold jumps to the reading.
    pub fn update(&mut self, reading: f64, now: Instant) -> f64 {
        let elapsed = now.saturating_duration_since(self.last_update).as_secs_f64();

        if reading < self.current {
            self.current -= self.drop_rate * elapsed;
            if self.clamp_to_reading {
                self.current = self.current.max(reading);
            }
        } else if reading > self.current {
            self.current += self.climb_rate * elapsed;
            if self.clamp_to_reading {
                self.current = self.current.min(reading);
            }
        }

        if (reading - self.current).abs() > self.snap_threshold {
            log::debug!(
                "Boost gap {:.1} exceeds {:.1}, snapping to {}",
                (reading - self.current).abs(),
                self.snap_threshold,
                reading
            );
            self.current = reading;
        }

        self.last_update = now;
        self.current
    }
}
