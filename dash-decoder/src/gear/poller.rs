use super::{
    Actuator, GearShiftState, GearShiftStateMachine, GrindEffect, GrindSignal, ShiftCommand, ShifterInput,
};
use crate::config::ShiftConfig;
use crate::state::SharedVehicleState;
use crate::types::Result;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// State machine plus the collaborators it drives
struct Worker<S, A, G> {
    machine: GearShiftStateMachine,
    input: S,
    actuator: A,
    grind: G,
}

impl<S: ShifterInput, A: Actuator, G: GrindEffect> Worker<S, A, G> {
    /// Publishes the new state before the burst so readers see the lock
    /// for as long as the pulses are going out
    fn poll_once(&mut self, current_gear: u8, published: &Mutex<GearShiftState>) -> ShiftCommand {
        let snapshot = self.input.read();
        let command = self.machine.poll(snapshot, current_gear);
        *published.lock() = *self.machine.state();
        self.execute(&command);
        command
    }

    /// Blocks for the whole burst; never checks for stop mid-burst
    fn execute(&mut self, command: &ShiftCommand) {
        match command.grind {
            Some(GrindSignal::Start) => self.grind.start(),
            Some(GrindSignal::Stop) => self.grind.stop(),
            None => {}
        }

        let Some(burst) = command.burst else {
            return;
        };

        for sent in 0..burst.pulses {
            if let Err(e) = self.actuator.send(burst.direction) {
                log::warn!(
                    "Dropping {} remaining {} pulse(s): {}",
                    burst.pulses - sent,
                    burst.direction,
                    e
                );
                return;
            }
            thread::sleep(burst.delay);
        }
    }
}

/// Runs a [`GearShiftStateMachine`] on its own thread
///
/// Each iteration reads the shifter, reads the current gear from the shared
/// vehicle state, executes whatever the machine decides and then sleeps for
/// the poll interval. The stop flag is checked once per iteration.
pub struct GearPoller<S, A, G> {
    worker: Arc<Mutex<Worker<S, A, G>>>,
    published: Arc<Mutex<GearShiftState>>,
    vehicle: SharedVehicleState,
    poll_interval: Duration,
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl<S, A, G> GearPoller<S, A, G>
where
    S: ShifterInput + Send + 'static,
    A: Actuator + Send + 'static,
    G: GrindEffect + Send + 'static,
{
    pub fn new(config: &ShiftConfig, vehicle: SharedVehicleState, input: S, actuator: A, grind: G) -> Self {
        let worker = Worker {
            machine: GearShiftStateMachine::new(config),
            input,
            actuator,
            grind,
        };

        Self {
            worker: Arc::new(Mutex::new(worker)),
            published: Arc::new(Mutex::new(GearShiftState::default())),
            vehicle,
            poll_interval: config.poll_interval,
            stop: Arc::new(AtomicBool::new(false)),
            handle: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.is_some()
    }

    /// State decided by the most recent poll, visible while its burst runs
    pub fn shift_state(&self) -> GearShiftState {
        *self.published.lock()
    }

    /// Start the poll thread. Does nothing if it is already running.
    pub fn start(&mut self) -> Result<()> {
        if self.handle.is_some() {
            return Ok(());
        }

        self.worker.lock().machine.release_lock();
        self.stop.store(false, Ordering::SeqCst);

        let worker = Arc::clone(&self.worker);
        let published = Arc::clone(&self.published);
        let vehicle = self.vehicle.clone();
        let stop = Arc::clone(&self.stop);
        let interval = self.poll_interval;

        let handle = thread::Builder::new()
            .name("gear-poller".to_string())
            .spawn(move || {
                log::debug!("Gear poller running every {:?}", interval);
                while !stop.load(Ordering::SeqCst) {
                    worker.lock().poll_once(vehicle.current_gear(), &published);

                    thread::sleep(interval);
                }
            })?;

        log::info!("Gear poller started");
        self.handle = Some(handle);
        Ok(())
    }

    /// Stop the poll thread and wait for it. Does nothing if it is not running.
    ///
    /// A burst in flight is finished before the thread exits.
    pub fn stop(&mut self) {
        let Some(handle) = self.handle.take() else {
            return;
        };

        self.stop.store(true, Ordering::SeqCst);
        if handle.join().is_err() {
            log::warn!("Gear poller thread panicked");
        }
        log::info!("Gear poller stopped");
    }

    /// Run one poll on the calling thread, for stepping the machine by hand
    pub fn poll_once(&self) -> ShiftCommand {
        self.worker.lock().poll_once(self.vehicle.current_gear(), &self.published)
    }
}

impl<S, A, G> Drop for GearPoller<S, A, G> {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            self.stop.store(true, Ordering::SeqCst);
            let _ = handle.join();
        }
    }
}
