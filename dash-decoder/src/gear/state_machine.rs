use super::{GearShiftState, ShiftDirection, ShiftMode, ShifterSnapshot, NEUTRAL_GEAR};
use crate::config::ShiftConfig;
use std::time::Duration;

/// Signal for the grind effect collaborator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrindSignal {
    Start,
    Stop,
}

/// A run of identical pulses, each followed by `delay`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShiftBurst {
    pub direction: ShiftDirection,
    pub pulses: u8,
    pub delay: Duration,
}

/// What one poll asks the outside world to do
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ShiftCommand {
    pub grind: Option<GrindSignal>,
    pub burst: Option<ShiftBurst>,
}

impl ShiftCommand {
    /// Number of pulses this command emits
    pub fn pulse_count(&self) -> u8 {
        self.burst.map_or(0, |b| b.pulses)
    }

    pub fn is_idle(&self) -> bool {
        self.grind.is_none() && self.burst.is_none()
    }
}

/// Decides grind signals and shift bursts from shifter input and the
/// gear currently shown by the cluster
#[derive(Debug, Clone)]
pub struct GearShiftStateMachine {
    mode: ShiftMode,
    upshift_delay: Duration,
    downshift_delay: Duration,
    state: GearShiftState,
}

impl GearShiftStateMachine {
    pub fn new(config: &ShiftConfig) -> Self {
        Self {
            mode: config.mode,
            upshift_delay: config.upshift_delay,
            downshift_delay: config.downshift_delay,
            state: GearShiftState::default(),
        }
    }

    pub fn mode(&self) -> ShiftMode {
        self.mode
    }

    pub fn state(&self) -> &GearShiftState {
        &self.state
    }

    /// Allow the next poll to issue a burst again
    pub fn release_lock(&mut self) {
        self.state.shift_locked = false;
    }

    /// Advance the machine by one poll
    pub fn poll(&mut self, input: ShifterSnapshot, current_gear: u8) -> ShiftCommand {
        self.state.pressed_gear = input.pressed_gear();
        self.state.clutch_engaged = input.clutch;

        match self.mode {
            ShiftMode::Clutch => self.poll_clutch(current_gear),
            ShiftMode::Sequential => self.poll_sequential(current_gear),
        }
    }

    fn poll_clutch(&mut self, current_gear: u8) -> ShiftCommand {
        let mut command = ShiftCommand::default();
        let pressed = self.state.pressed_gear;
        let clutch = self.state.clutch_engaged;

        if self.state.target_gear == NEUTRAL_GEAR {
            self.state.shift_locked = false;
        }

        if pressed == NEUTRAL_GEAR {
            self.state.target_gear = NEUTRAL_GEAR;
            self.state.gears_grinding = false;
            command.grind = Some(GrindSignal::Stop);
        } else if !clutch && self.state.target_gear == NEUTRAL_GEAR {
            // Gear pushed in without the clutch
            self.state.gears_grinding = true;
            command.grind = Some(GrindSignal::Start);
        } else if clutch && !self.state.gears_grinding {
            self.state.target_gear = pressed;
        }

        if !clutch && self.state.target_gear != NEUTRAL_GEAR && !self.state.shift_locked {
            self.state.shift_locked = true;
            command.burst = self.plan(current_gear);
        }

        command
    }

    fn poll_sequential(&mut self, current_gear: u8) -> ShiftCommand {
        let mut command = ShiftCommand::default();

        if self.state.pressed_gear != NEUTRAL_GEAR {
            self.state.target_gear = self.state.pressed_gear;
        }

        if self.state.target_gear == current_gear {
            self.state.shift_locked = false;
        }

        if !self.state.shift_locked
            && self.state.target_gear != NEUTRAL_GEAR
            && self.state.target_gear != current_gear
        {
            self.state.shift_locked = true;
            command.burst = self.plan(current_gear);
        }

        command
    }

    /// Burst that moves `current_gear` to the target, if they differ
    fn plan(&self, current_gear: u8) -> Option<ShiftBurst> {
        let target = self.state.target_gear;
        let burst = if target > current_gear {
            ShiftBurst {
                direction: ShiftDirection::Up,
                pulses: target - current_gear,
                delay: self.upshift_delay,
            }
        } else if target < current_gear {
            ShiftBurst {
                direction: ShiftDirection::Down,
                pulses: current_gear - target,
                delay: self.downshift_delay,
            }
        } else {
            return None;
        };

        log::debug!(
            "Planned {} x{} (gear {} -> {})",
            burst.direction,
            burst.pulses,
            current_gear,
            target
        );
        Some(burst)
    }
}
