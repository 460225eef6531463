//! Synthetic cluster frames for integration tests
#![allow(dead_code)]

use dash_decoder::config::{BarCalibration, BoostConfig, Calibration, KnobCalibration};
use dash_decoder::gauges::{Bar, LinearBarDecoder};
use dash_decoder::segments::{SegmentDecoder, SegmentMap};
use dash_decoder::types::{Point, READOUT_DIGITS};
use image::{Rgb, RgbImage};

pub const BACKGROUND: Rgb<u8> = Rgb([235, 235, 235]);
pub const INK: Rgb<u8> = Rgb([20, 20, 20]);

/// Route library logs to the test output (RUST_LOG=debug cargo test)
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Small calibration: digits along the top, bars below, knob at the bottom
pub fn calibration() -> Calibration {
    let digits: [SegmentMap; READOUT_DIGITS] =
        std::array::from_fn(|i| SegmentMap::grid(Point::new(10 + 16 * i as u32, 10), 10));
    let bars = BarCalibration {
        min_x: 20,
        max_x: 180,
        front_rollbar_y: 60,
        rear_rollbar_y: 70,
        brake_y: 80,
    };
    let knob = KnobCalibration {
        positions: std::array::from_fn(|k| Point::new(20 + 20 * k as u32, 120)),
    };

    Calibration::new(100, digits, bars, knob).with_boost(BoostConfig::default().with_rates(20.0, 30.0))
}

/// Paints gauge readings onto a blank frame at the calibrated probe points
pub struct ClusterPainter<'a> {
    calibration: &'a Calibration,
    frame: RgbImage,
}

impl<'a> ClusterPainter<'a> {
    pub fn new(calibration: &'a Calibration, width: u32, height: u32) -> Self {
        Self {
            calibration,
            frame: RgbImage::from_pixel(width, height, BACKGROUND),
        }
    }

    fn ink(&mut self, point: Point) {
        self.frame.put_pixel(point.x, point.y, INK);
    }

    /// Light the segments of `digit` in readout slot `slot`
    pub fn digit(mut self, slot: usize, digit: u8) -> Self {
        let calibration = self.calibration;
        let map = &calibration.digits[slot];
        if let Some(pattern) = SegmentDecoder::pattern(digit) {
            for segment in pattern.iter() {
                self.ink(map.point(segment));
            }
        }
        self
    }

    pub fn digits(mut self, start: usize, digits: &[u8]) -> Self {
        for (offset, digit) in digits.iter().enumerate() {
            self = self.digit(start + offset, *digit);
        }
        self
    }

    /// Light every segment listed, whatever digit that makes
    pub fn raw_segments(mut self, slot: usize, labels: &str) -> Self {
        let calibration = self.calibration;
        let map = &calibration.digits[slot];
        for (segment, point) in map.iter() {
            if labels.contains(segment.label()) {
                self.ink(point);
            }
        }
        self
    }

    /// Draw `bar` at `level` (-1..=7)
    pub fn bar(mut self, bar: Bar, level: i8) -> Self {
        let calibration = self.calibration;
        let bars = &calibration.bars;
        let decoder = LinearBarDecoder::new(bars.min_x, bars.max_x, calibration.threshold);
        let lit = (level + 1).max(0) as usize;
        for point in decoder.probes(bars.y(bar)).take(lit) {
            self.ink(point);
        }
        self
    }

    /// Light knob position `position` (1..=9)
    pub fn knob(mut self, position: u8) -> Self {
        let point = self.calibration.knob.positions[position as usize - 1];
        self.ink(point);
        self
    }

    pub fn finish(self) -> RgbImage {
        self.frame
    }
}

/// Place `content` on a larger black canvas at `(left, top)`
pub fn letterbox(content: &RgbImage, width: u32, height: u32, left: u32, top: u32) -> RgbImage {
    let mut canvas = RgbImage::new(width, height);
    image::imageops::replace(&mut canvas, content, i64::from(left), i64::from(top));
    canvas
}
