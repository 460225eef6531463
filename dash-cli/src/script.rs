//! Scripted shifter and logging collaborators for replay
//!
//! A shifter script is a TOML list of timed positions:
//!
//! ```toml
//! [[step]]
//! at_ms = 0
//! gear = 0
//! clutch = true
//!
//! [[step]]
//! at_ms = 400
//! gear = 3
//! clutch = true
//! ```

use anyhow::{Context, Result};
use dash_decoder::gear::{
    Actuator, ActuatorError, GrindEffect, ShiftDirection, ShifterInput, ShifterSnapshot, SHIFTER_GEARS,
};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct ScriptStep {
    /// Offset from the start of the replay
    pub at_ms: u64,
    /// Gear key held (0 = none)
    #[serde(default)]
    pub gear: u8,
    #[serde(default)]
    pub clutch: bool,
}

#[derive(Debug, Default, Deserialize)]
struct ScriptFile {
    #[serde(default)]
    step: Vec<ScriptStep>,
}

/// Load a shifter script, sorted by time
pub fn load_script(path: &Path) -> Result<Vec<ScriptStep>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read shifter script: {:?}", path))?;
    let file: ScriptFile = toml::from_str(&content)
        .with_context(|| format!("Failed to parse shifter script: {:?}", path))?;

    let mut steps = file.step;
    if let Some(bad) = steps.iter().find(|s| s.gear as usize > SHIFTER_GEARS) {
        anyhow::bail!("Gear {} at {} ms is not on the shifter", bad.gear, bad.at_ms);
    }
    steps.sort_by_key(|s| s.at_ms);
    Ok(steps)
}

/// Plays back a shifter script against the wall clock
pub struct ScriptedShifter {
    steps: Vec<ScriptStep>,
    started: Instant,
}

impl ScriptedShifter {
    pub fn new(steps: Vec<ScriptStep>, started: Instant) -> Self {
        Self { steps, started }
    }

    /// Position at `elapsed` into the replay
    pub fn position_at(&self, elapsed: Duration) -> ShifterSnapshot {
        let elapsed_ms = elapsed.as_millis() as u64;
        self.steps
            .iter()
            .take_while(|s| s.at_ms <= elapsed_ms)
            .last()
            .map(|s| ShifterSnapshot::in_gear(s.gear).with_clutch(s.clutch))
            .unwrap_or_default()
    }
}

impl ShifterInput for ScriptedShifter {
    fn read(&mut self) -> ShifterSnapshot {
        self.position_at(self.started.elapsed())
    }
}

/// One pulse sent during a replay
#[derive(Debug, Clone, Serialize)]
pub struct PulseEvent {
    pub direction: ShiftDirection,
    pub at_ms: u64,
}

/// Logs pulses instead of pressing keys
#[derive(Clone)]
pub struct LoggingActuator {
    started: Instant,
    sent: Arc<Mutex<Vec<PulseEvent>>>,
}

impl LoggingActuator {
    pub fn new(started: Instant) -> Self {
        Self {
            started,
            sent: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn pulses(&self) -> Vec<PulseEvent> {
        self.sent.lock().clone()
    }
}

impl Actuator for LoggingActuator {
    fn send(&mut self, direction: ShiftDirection) -> std::result::Result<(), ActuatorError> {
        let at_ms = self.started.elapsed().as_millis() as u64;
        log::info!("Shift {} at {} ms", direction, at_ms);
        self.sent.lock().push(PulseEvent { direction, at_ms });
        Ok(())
    }
}

/// Logs grind transitions, ignoring repeats
#[derive(Debug, Default)]
pub struct LoggingGrind {
    grinding: bool,
}

impl GrindEffect for LoggingGrind {
    fn start(&mut self) {
        if !self.grinding {
            log::warn!("Gears grinding");
            self.grinding = true;
        }
    }

    fn stop(&mut self) {
        if self.grinding {
            log::info!("Grinding stopped");
            self.grinding = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn steps() -> Vec<ScriptStep> {
        vec![
            ScriptStep { at_ms: 0, gear: 0, clutch: true },
            ScriptStep { at_ms: 100, gear: 2, clutch: true },
            ScriptStep { at_ms: 250, gear: 2, clutch: false },
        ]
    }

    #[test]
    fn test_position_follows_script() {
        let shifter = ScriptedShifter::new(steps(), Instant::now());

        let at = |ms| shifter.position_at(Duration::from_millis(ms));
        assert_eq!(at(50), ShifterSnapshot::neutral().with_clutch(true));
        assert_eq!(at(100), ShifterSnapshot::in_gear(2).with_clutch(true));
        assert_eq!(at(900), ShifterSnapshot::in_gear(2));
    }

    #[test]
    fn test_empty_script_is_neutral() {
        let shifter = ScriptedShifter::new(Vec::new(), Instant::now());
        assert_eq!(shifter.position_at(Duration::from_secs(1)), ShifterSnapshot::neutral());
    }

    #[test]
    fn test_load_script_sorts_and_validates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shift.toml");
        fs::write(
            &path,
            "[[step]]\nat_ms = 300\ngear = 4\n\n[[step]]\nat_ms = 10\nclutch = true\n",
        )
        .unwrap();

        let steps = load_script(&path).unwrap();
        assert_eq!(steps[0].at_ms, 10);
        assert_eq!(steps[1].gear, 4);

        fs::write(&path, "[[step]]\nat_ms = 0\ngear = 9\n").unwrap();
        assert!(load_script(&path).is_err());
    }

    #[test]
    fn test_logging_actuator_records() {
        let mut actuator = LoggingActuator::new(Instant::now());
        actuator.send(ShiftDirection::Up).unwrap();
        actuator.send(ShiftDirection::Down).unwrap();

        let pulses = actuator.pulses();
        assert_eq!(pulses.len(), 2);
        assert_eq!(pulses[1].direction, ShiftDirection::Down);
    }
}
