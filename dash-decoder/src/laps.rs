//! Lap detection from the LCD lap timer
//!
//! The cluster has no lap counter, only a running lap clock. A lap is closed
//! when that clock either jumps backwards (new lap or restart) or stops moving
//! for longer than [`FREEZE_THRESHOLD`] (the clock holds the finished time for
//! a moment at the line).

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::{Duration, Instant};

/// How long the LCD clock must stand still before the lap counts as closed
pub const FREEZE_THRESHOLD: Duration = Duration::from_millis(100);

/// One completed lap
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LapRecord {
    /// Zero-based lap index
    pub lap: u32,
    /// Lap time in seconds
    pub lap_time: f64,
    /// Fuel reading when the lap closed
    pub fuel: f64,
    pub recorded_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct LapTracker {
    laps: Vec<LapRecord>,
    last_lcd_time: f64,
    last_refresh: Instant,
    /// Set once the current lap is recorded; cleared when the clock advances
    recorded: bool,
}

impl LapTracker {
    pub fn new(now: Instant) -> Self {
        Self {
            laps: Vec::new(),
            last_lcd_time: 0.0,
            last_refresh: now,
            recorded: false,
        }
    }

    pub fn laps(&self) -> &[LapRecord] {
        &self.laps
    }

    /// Fastest lap so far
    pub fn best_lap(&self) -> Option<&LapRecord> {
        self.laps.iter().min_by(|a, b| a.lap_time.total_cmp(&b.lap_time))
    }

    /// Forget all laps. The clock tracking is kept.
    pub fn reset(&mut self) {
        self.laps.clear();
        log::info!("Lap tracker reset");
    }

    /// Feed the lap clock and fuel from one decode tick
    ///
    /// Returns the lap closed by this reading, if any.
    pub fn update(&mut self, lcd_time: f64, fuel: f64, now: Instant) -> Option<LapRecord> {
        if lcd_time > self.last_lcd_time {
            self.last_lcd_time = lcd_time;
            self.last_refresh = now;
            self.recorded = false;
            return None;
        }

        if lcd_time < self.last_lcd_time {
            let closed = if self.recorded {
                None
            } else {
                self.close_lap(self.last_lcd_time, fuel)
            };
            self.last_lcd_time = lcd_time;
            self.last_refresh = now;
            self.recorded = true;
            return closed;
        }

        // Clock frozen
        if !self.recorded && now.saturating_duration_since(self.last_refresh) > FREEZE_THRESHOLD {
            self.recorded = true;
            return self.close_lap(lcd_time, fuel);
        }
        None
    }

    fn close_lap(&mut self, lap_time: f64, fuel: f64) -> Option<LapRecord> {
        // A clock that never started is not a lap
        if lap_time <= 0.0 {
            return None;
        }

        let record = LapRecord {
            lap: self.laps.len() as u32,
            lap_time,
            fuel,
            recorded_at: Utc::now(),
        };
        log::info!("Lap {} closed: {:.3}s, fuel {:.2}", record.lap, lap_time, fuel);
        self.laps.push(record.clone());
        Some(record)
    }
}
