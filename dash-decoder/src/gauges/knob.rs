//! Discrete boost knob decoder

use crate::types::{PixelSource, Point};

/// Number of knob detents
pub const KNOB_POSITIONS: usize = 9;

/// Reads a 9-position knob where the active position is drawn lit
#[derive(Debug, Clone, PartialEq)]
pub struct DiscreteKnobDecoder {
    probes: [Point; KNOB_POSITIONS],
    threshold: u8,
}

impl DiscreteKnobDecoder {
    pub fn new(probes: [Point; KNOB_POSITIONS], threshold: u8) -> Self {
        Self { probes, threshold }
    }

    pub fn probes(&self) -> &[Point; KNOB_POSITIONS] {
        &self.probes
    }

    /// 1-based position of the first lit probe, `None` when nothing is lit
    pub fn decode<P: PixelSource + ?Sized>(&self, frame: &P) -> Option<u8> {
        self.probes
            .iter()
            .position(|p| frame.is_lit(*p, self.threshold))
            .map(|index| index as u8 + 1)
    }

    /// Like [`decode`](Self::decode), keeping `previous` when no probe is lit
    pub fn decode_or<P: PixelSource + ?Sized>(&self, frame: &P, previous: u8) -> u8 {
        match self.decode(frame) {
            Some(position) => position,
            None => {
                log::trace!("No knob probe lit, keeping position {}", previous);
                previous
            }
        }
    }
}
