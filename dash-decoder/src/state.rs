//! Vehicle state published by the decode tick
//!
//! The decode tick is the only writer. Readers (rendering, the gear poller)
//! take cheap snapshots through [`SharedVehicleState`].

use parking_lot::RwLock;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;

use crate::boost::DEFAULT_INITIAL_BOOST;

/// Everything read from the cluster on one decode tick
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VehicleState {
    pub rpm: u32,
    /// Boost as read from the LCD digits
    pub boost_raw: u32,
    /// Boost after inertial smoothing
    pub cur_boost: f64,
    pub temp: u32,
    pub fuel: f64,
    pub speed: u32,
    pub gear: u8,
    /// -1..=7
    pub front_rollbar: i8,
    /// -1..=7
    pub rear_rollbar: i8,
    /// -1..=7
    pub brake: i8,
    /// 1..=9
    pub boost_knob: u8,
    /// Current lap time in seconds
    pub lap_time: f64,
    /// Monotonic time of the tick that produced this state
    #[serde(skip)]
    pub updated_at: Option<Instant>,
}

impl Default for VehicleState {
    fn default() -> Self {
        Self {
            rpm: 0,
            boost_raw: 0,
            cur_boost: DEFAULT_INITIAL_BOOST,
            temp: 0,
            fuel: 0.0,
            speed: 0,
            gear: 1,
            front_rollbar: 0,
            rear_rollbar: 0,
            brake: 0,
            boost_knob: 1,
            lap_time: 0.0,
            updated_at: None,
        }
    }
}

impl VehicleState {
    /// Compare every reading, ignoring when the state was produced
    pub fn same_readings(&self, other: &VehicleState) -> bool {
        let mut a = self.clone();
        a.updated_at = other.updated_at;
        a == *other
    }
}

/// Single-writer/multi-reader handle to the latest [`VehicleState`]
#[derive(Debug, Clone, Default)]
pub struct SharedVehicleState {
    inner: Arc<RwLock<VehicleState>>,
}

impl SharedVehicleState {
    pub fn new(initial: VehicleState) -> Self {
        Self {
            inner: Arc::new(RwLock::new(initial)),
        }
    }

    /// Replace the published state
    pub fn publish(&self, state: VehicleState) {
        *self.inner.write() = state;
    }

    /// Copy of the latest state
    pub fn snapshot(&self) -> VehicleState {
        self.inner.read().clone()
    }

    /// Gear last read from the cluster
    pub fn current_gear(&self) -> u8 {
        self.inner.read().gear
    }

    /// Run `f` against the latest state without cloning it
    pub fn read<R>(&self, f: impl FnOnce(&VehicleState) -> R) -> R {
        f(&self.inner.read())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_initial_state() {
        let state = VehicleState::default();
        assert_eq!(state.gear, 1);
        assert_eq!(state.boost_knob, 1);
        assert_eq!(state.cur_boost, 30.0);
        assert!(state.updated_at.is_none());
    }

    #[test]
    fn test_same_readings_ignores_timestamp() {
        let a = VehicleState {
            updated_at: Some(Instant::now()),
            ..VehicleState::default()
        };
        let b = VehicleState::default();
        assert!(a.same_readings(&b));

        let c = VehicleState { rpm: 1, ..VehicleState::default() };
        assert!(!a.same_readings(&c));
    }

    #[test]
    fn test_publish_visible_across_threads() {
        let shared = SharedVehicleState::default();
        let writer = shared.clone();

        thread::spawn(move || {
            writer.publish(VehicleState {
                gear: 4,
                ..VehicleState::default()
            });
        })
        .join()
        .unwrap();

        assert_eq!(shared.current_gear(), 4);
        assert_eq!(shared.read(|s| s.gear), 4);
    }

    #[test]
    fn test_serializes_without_timestamp() {
        let json = serde_json::to_value(VehicleState::default()).unwrap();
        assert_eq!(json["gear"], 1);
        assert!(json.get("updated_at").is_none());
    }
}
