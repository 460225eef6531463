//! Gear-shift actuation
//!
//! Turns H-pattern shifter and clutch inputs into sequential up/down pulses
//! for a game that only understands a sequential gearbox.
//!
//! - [`GearShiftStateMachine`] decides what to do on each poll. It is pure:
//!   it never sleeps and never touches the outside world.
//! - [`GearPoller`] runs the machine on its own thread, reads the shifter,
//!   sends the pulses and sleeps between them.
//!
//! The outside world is reached through three traits: [`ShifterInput`],
//! [`Actuator`] and [`GrindEffect`].

mod poller;
mod state_machine;

pub use poller::GearPoller;
pub use state_machine::{GearShiftStateMachine, GrindSignal, ShiftBurst, ShiftCommand};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Number of physical gear keys on the shifter
pub const SHIFTER_GEARS: usize = 6;

/// Gear value meaning "nothing selected"
pub const NEUTRAL_GEAR: u8 = 0;

/// Capability of the attached shifter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShiftMode {
    /// H-pattern shifter with a clutch pedal
    #[default]
    Clutch,
    /// Shifter keys only, no clutch
    Sequential,
}

/// Direction of one actuator pulse
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ShiftDirection {
    Up,
    Down,
}

impl std::fmt::Display for ShiftDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ShiftDirection::Up => write!(f, "up"),
            ShiftDirection::Down => write!(f, "down"),
        }
    }
}

/// Mutable state of the gear state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct GearShiftState {
    /// Gear key held on the last poll (0 = none)
    pub pressed_gear: u8,
    pub clutch_engaged: bool,
    /// Gear the driver asked for (0 = neutral)
    pub target_gear: u8,
    pub gears_grinding: bool,
    /// Set while a burst for the current target has been issued
    pub shift_locked: bool,
}

impl GearShiftState {
    pub fn is_neutral(&self) -> bool {
        self.target_gear == NEUTRAL_GEAR
    }
}

/// One reading of the shifter and clutch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ShifterSnapshot {
    /// Keys for gears 1..=6
    pub gear_keys: [bool; SHIFTER_GEARS],
    pub clutch: bool,
}

impl ShifterSnapshot {
    /// Nothing pressed, clutch released
    pub fn neutral() -> Self {
        Self::default()
    }

    /// Only the key for `gear` pressed. Gears outside 1..=6 give neutral.
    pub fn in_gear(gear: u8) -> Self {
        let mut snapshot = Self::default();
        if let Some(key) = (gear as usize).checked_sub(1).and_then(|i| snapshot.gear_keys.get_mut(i)) {
            *key = true;
        }
        snapshot
    }

    pub fn with_clutch(mut self, clutch: bool) -> Self {
        self.clutch = clutch;
        self
    }

    /// Lowest pressed gear, 0 if none
    pub fn pressed_gear(&self) -> u8 {
        self.gear_keys
            .iter()
            .position(|&pressed| pressed)
            .map(|i| i as u8 + 1)
            .unwrap_or(NEUTRAL_GEAR)
    }
}

/// Errors reported by an [`Actuator`]
#[derive(Error, Debug)]
pub enum ActuatorError {
    #[error("Actuator unavailable: {0}")]
    Unavailable(String),

    #[error("Failed to send {direction} pulse: {reason}")]
    SendFailed { direction: ShiftDirection, reason: String },
}

/// Source of shifter and clutch readings
pub trait ShifterInput {
    fn read(&mut self) -> ShifterSnapshot;
}

/// Receiver of shift pulses, e.g. a key sender
pub trait Actuator {
    fn send(&mut self, direction: ShiftDirection) -> Result<(), ActuatorError>;
}

/// Receiver of grind start/stop signals
///
/// Signals repeat while the condition holds, so implementations should
/// treat a second `start` (or `stop`) as a no-op.
pub trait GrindEffect {
    fn start(&mut self);
    fn stop(&mut self);
}

/// No grind effect attached
impl GrindEffect for () {
    fn start(&mut self) {}
    fn stop(&mut self) {}
}
