//! Cockpit view detection
//!
//! The cluster is only on screen in the driving view. A handful of reference
//! pixels with known colours tell the driving view apart from menus and
//! replays; both the decode tick and the gear poller are gated on it.

use crate::types::{PixelSource, Point, Rgb};
use serde::Deserialize;

/// Default per-channel colour tolerance
pub const DEFAULT_COLOR_TOLERANCE: u8 = 3;

/// A pixel expected to have a fixed colour in the driving view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct ReferencePixel {
    pub at: Point,
    pub color: [u8; 3],
}

impl ReferencePixel {
    pub fn new(at: Point, color: [u8; 3]) -> Self {
        Self { at, color }
    }

    fn matches(&self, pixel: Rgb, tolerance: u8) -> bool {
        let [r, g, b] = self.color;
        pixel.r.abs_diff(r) <= tolerance && pixel.g.abs_diff(g) <= tolerance && pixel.b.abs_diff(b) <= tolerance
    }
}

#[derive(Debug, Clone)]
pub struct CockpitViewDetector {
    references: Vec<ReferencePixel>,
    tolerance: u8,
}

impl CockpitViewDetector {
    pub fn new(references: Vec<ReferencePixel>) -> Self {
        Self {
            references,
            tolerance: DEFAULT_COLOR_TOLERANCE,
        }
    }

    pub fn with_tolerance(mut self, tolerance: u8) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn references(&self) -> &[ReferencePixel] {
        &self.references
    }

    /// True if every reference pixel matches. With no references every frame
    /// counts as the driving view.
    pub fn is_cockpit_view<P: PixelSource + ?Sized>(&self, frame: &P) -> bool {
        self.references.iter().all(|reference| match frame.pixel(reference.at.x, reference.at.y) {
            Some(pixel) => reference.matches(pixel, self.tolerance),
            None => {
                log::trace!("Reference pixel {} outside frame", reference.at);
                false
            }
        })
    }
}
