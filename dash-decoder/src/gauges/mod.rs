//! Bar and knob gauge decoders
//!
//! Both gauges are read by scanning an ordered list of probe points and
//! stopping at the first lit/unlit transition. Neither scan is guaranteed to
//! find one, so each decoder defines an explicit fallback.

pub mod bar;
pub mod knob;

pub use bar::{Bar, LinearBarDecoder, BAR_EMPTY_LEVEL, BAR_FULL_LEVEL, BAR_PROBES};
pub use knob::{DiscreteKnobDecoder, KNOB_POSITIONS};
