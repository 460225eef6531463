//! Main decoder API
//!
//! [`DashboardDecoder`] is the entry point for the decode tick. It owns the
//! per-gauge decoders built from one [`Calibration`], plus the little state
//! that has to survive between ticks (boost smoothing, last knob position).

use crate::assembler::TelemetryAssembler;
use crate::boost::BoostSmoother;
use crate::config::Calibration;
use crate::gauges::{Bar, DiscreteKnobDecoder, LinearBarDecoder};
use crate::segments::SegmentDecoder;
use crate::state::{SharedVehicleState, VehicleState};
use crate::types::{DecoderError, PixelSource, Point, RawReadout, Result};
use std::sync::Arc;
use std::time::Instant;

/// Decodes prepared cluster frames into [`VehicleState`]
pub struct DashboardDecoder {
    calibration: Arc<Calibration>,
    segments: SegmentDecoder,
    bars: LinearBarDecoder,
    knob: DiscreteKnobDecoder,
    smoother: BoostSmoother,
    /// Smallest frame that covers every probe
    extent: Point,
    state: VehicleState,
}

impl DashboardDecoder {
    /// Create a decoder whose boost smoothing starts now
    pub fn new(calibration: Arc<Calibration>) -> Self {
        Self::with_start_time(calibration, Instant::now())
    }

    /// Create a decoder whose boost smoothing starts at `now`
    pub fn with_start_time(calibration: Arc<Calibration>, now: Instant) -> Self {
        let threshold = calibration.threshold;
        let segments = SegmentDecoder::new(threshold);
        let bars = LinearBarDecoder::new(calibration.bars.min_x, calibration.bars.max_x, threshold);
        let knob = DiscreteKnobDecoder::new(calibration.knob.positions, threshold);
        let smoother = BoostSmoother::new(&calibration.boost, now);
        let extent = calibration.probe_extent();

        Self {
            calibration,
            segments,
            bars,
            knob,
            smoother,
            extent,
            state: VehicleState::default(),
        }
    }

    pub fn calibration(&self) -> &Calibration {
        &self.calibration
    }

    /// State produced by the last successful decode
    pub fn state(&self) -> &VehicleState {
        &self.state
    }

    /// Fail if `frame` is too small for the calibrated probes
    pub fn check_frame<P: PixelSource + ?Sized>(&self, frame: &P) -> Result<()> {
        let (width, height) = frame.dimensions();
        if self.extent.x >= width || self.extent.y >= height {
            return Err(DecoderError::FrameTooSmall {
                width,
                height,
                probe: self.extent,
            });
        }
        Ok(())
    }

    /// Read the digit slots only, without touching decoder state
    pub fn read_readout<P: PixelSource + ?Sized>(&self, frame: &P) -> Result<RawReadout> {
        self.check_frame(frame)?;
        Ok(self.segments.decode_readout(frame, &self.calibration.digits))
    }

    /// Decode one frame taken at `now`
    ///
    /// On error the previous state is left untouched.
    pub fn decode<P: PixelSource + ?Sized>(&mut self, frame: &P, now: Instant) -> Result<&VehicleState> {
        let readout = self.read_readout(frame)?;
        if !readout.all_recognized() {
            log::debug!(
                "Unrecognised digit slots {:?} resolved to 0",
                readout.unrecognized_slots().collect::<Vec<_>>()
            );
        }

        let telemetry = TelemetryAssembler::assemble(&readout);
        let bars = &self.calibration.bars;

        self.state = VehicleState {
            rpm: telemetry.rpm,
            boost_raw: telemetry.boost_raw,
            cur_boost: self.smoother.update(f64::from(telemetry.boost_raw), now),
            temp: telemetry.temp,
            fuel: telemetry.fuel,
            speed: telemetry.speed,
            gear: telemetry.gear,
            front_rollbar: self.bars.decode(frame, bars.y(Bar::FrontRollbar)),
            rear_rollbar: self.bars.decode(frame, bars.y(Bar::RearRollbar)),
            brake: self.bars.decode(frame, bars.y(Bar::Brake)),
            boost_knob: self.knob.decode_or(frame, self.state.boost_knob),
            lap_time: telemetry.lap_time,
            updated_at: Some(now),
        };

        log::trace!(
            "Decoded rpm={} gear={} speed={} boost={:.1}",
            self.state.rpm,
            self.state.gear,
            self.state.speed,
            self.state.cur_boost
        );
        Ok(&self.state)
    }

    /// Decode one frame and publish the result
    pub fn tick<P: PixelSource + ?Sized>(
        &mut self,
        frame: &P,
        shared: &SharedVehicleState,
        now: Instant,
    ) -> Result<()> {
        let state = self.decode(frame, now)?.clone();
        shared.publish(state);
        Ok(())
    }
}
