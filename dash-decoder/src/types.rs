//! Core types for the dashboard decoder library
//!
//! This module defines the pixel-level inputs the decoders sample from and the
//! raw digit readout they produce. Higher level telemetry lives in
//! [`crate::state`].

use serde::{Deserialize, Serialize};
use std::fmt;

/// Result type for decoder operations
pub type Result<T> = std::result::Result<T, DecoderError>;

/// Number of 7-segment digits in the reference cluster layout
///
/// rpm×4, boost×2, temp×3, fuel×4, speed×3, gear×1, lap time×6
pub const READOUT_DIGITS: usize = 23;

/// Pixel coordinate inside a prepared frame
///
/// Serialized as a two-element `[x, y]` array so calibration files stay terse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "[u32; 2]", into = "[u32; 2]")]
pub struct Point {
    pub x: u32,
    pub y: u32,
}

impl Point {
    pub const fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }
}

impl From<[u32; 2]> for Point {
    fn from([x, y]: [u32; 2]) -> Self {
        Self { x, y }
    }
}

impl From<Point> for [u32; 2] {
    fn from(point: Point) -> Self {
        [point.x, point.y]
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// A single RGB sample
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Mean of the three channels
    pub fn brightness(&self) -> f64 {
        (f64::from(self.r) + f64::from(self.g) + f64::from(self.b)) / 3.0
    }

    /// Dark ink on a bright LCD background counts as lit
    pub fn is_lit(&self, threshold: u8) -> bool {
        self.brightness() < f64::from(threshold)
    }
}

/// Read access to a decoded image region
///
/// Implemented for [`image::RgbImage`]; the capture layer can implement it for
/// whatever buffer it produces.
pub trait PixelSource {
    /// Width and height in pixels
    fn dimensions(&self) -> (u32, u32);

    /// Sample a pixel, `None` when the coordinate is outside the frame
    fn pixel(&self, x: u32, y: u32) -> Option<Rgb>;

    /// Whether the pixel at `point` is lit under `threshold`
    ///
    /// Out-of-frame samples are never lit.
    fn is_lit(&self, point: Point, threshold: u8) -> bool {
        match self.pixel(point.x, point.y) {
            Some(rgb) => rgb.is_lit(threshold),
            None => {
                log::trace!("Probe {} outside frame, treating as unlit", point);
                false
            }
        }
    }
}

impl PixelSource for image::RgbImage {
    fn dimensions(&self) -> (u32, u32) {
        image::RgbImage::dimensions(self)
    }

    fn pixel(&self, x: u32, y: u32) -> Option<Rgb> {
        self.get_pixel_checked(x, y)
            .map(|p| Rgb::new(p.0[0], p.0[1], p.0[2]))
    }
}

/// Ordered digit values read from the cluster, one per calibrated digit slot
///
/// Every digit is in `0..=9`. Slots whose lit-segment pattern matched no
/// known digit hold `0` and are flagged, so callers can tell a decode failure
/// from a genuine zero when they care to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawReadout {
    digits: [u8; READOUT_DIGITS],
    /// Bit `i` set when slot `i` was not a recognised pattern
    unrecognized: u32,
}

impl RawReadout {
    /// Build a readout from per-slot classification results
    pub fn from_slots(slots: [Option<u8>; READOUT_DIGITS]) -> Self {
        let mut digits = [0u8; READOUT_DIGITS];
        let mut unrecognized = 0u32;

        for (slot, value) in slots.iter().enumerate() {
            match value {
                Some(digit) if *digit <= 9 => digits[slot] = *digit,
                _ => unrecognized |= 1 << slot,
            }
        }

        Self {
            digits,
            unrecognized,
        }
    }

    /// Build a readout from known digits (values above 9 are treated as unrecognised)
    pub fn from_digits(digits: [u8; READOUT_DIGITS]) -> Self {
        Self::from_slots(digits.map(Some))
    }

    /// Digit value at `slot` (0 for out-of-range slots)
    pub fn digit(&self, slot: usize) -> u8 {
        self.digits.get(slot).copied().unwrap_or(0)
    }

    pub fn digits(&self) -> &[u8; READOUT_DIGITS] {
        &self.digits
    }

    /// True if slot `slot` matched a known segment pattern
    pub fn is_recognized(&self, slot: usize) -> bool {
        slot < READOUT_DIGITS && self.unrecognized & (1 << slot) == 0
    }

    /// Slots that resolved to 0 because their pattern was unknown
    pub fn unrecognized_slots(&self) -> impl Iterator<Item = usize> + '_ {
        (0..READOUT_DIGITS).filter(move |slot| !self.is_recognized(*slot))
    }

    pub fn all_recognized(&self) -> bool {
        self.unrecognized == 0
    }
}

/// Errors that can occur while decoding frames
#[derive(Debug, thiserror::Error)]
pub enum DecoderError {
    #[error("Frame {width}x{height} does not cover calibrated probe at {probe}")]
    FrameTooSmall { width: u32, height: u32, probe: Point },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_brightness_threshold() {
        let dark = Rgb::new(30, 30, 30);
        let bright = Rgb::new(200, 210, 190);
        assert!(dark.is_lit(100));
        assert!(!bright.is_lit(100));

        // Exactly at the threshold is not lit
        assert!(!Rgb::new(100, 100, 100).is_lit(100));
    }

    #[test]
    fn test_pixel_source_out_of_bounds() {
        let img = image::RgbImage::from_pixel(4, 4, image::Rgb([0, 0, 0]));
        assert!(img.is_lit(Point::new(3, 3), 50));
        assert!(!img.is_lit(Point::new(4, 0), 50));
        assert_eq!(PixelSource::pixel(&img, 10, 10), None);
    }

    #[test]
    fn test_readout_tracks_unrecognized_slots() {
        let mut slots = [Some(1u8); READOUT_DIGITS];
        slots[4] = None;
        slots[17] = None;

        let readout = RawReadout::from_slots(slots);
        assert_eq!(readout.digit(4), 0);
        assert_eq!(readout.digit(5), 1);
        assert!(!readout.is_recognized(4));
        assert!(readout.is_recognized(5));
        assert_eq!(readout.unrecognized_slots().collect::<Vec<_>>(), vec![4, 17]);
        assert!(!readout.all_recognized());
    }

    #[test]
    fn test_point_serializes_as_pair() {
        let point: Point = serde_json::from_str("[12, 34]").unwrap();
        assert_eq!(point, Point::new(12, 34));
        assert_eq!(serde_json::to_string(&point).unwrap(), "[12,34]");
    }
}
