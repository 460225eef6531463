//! Frame preparation and probe overlay
//!
//! Captured frames arrive at whatever size the game window has, often
//! letterboxed. Calibrations are made against the content area scaled to
//! [`REFERENCE_WIDTH`] x [`REFERENCE_HEIGHT`], so every frame is cropped to
//! its non-black content and resized before decoding.

use crate::config::Calibration;
use crate::types::{DecoderError, Point, Result};
use image::imageops::{self, FilterType};
use image::{Pixel, Rgb, RgbImage};
use serde::{Deserialize, Serialize};

pub const REFERENCE_WIDTH: u32 = 1280;
pub const REFERENCE_HEIGHT: u32 = 960;

/// Overlay colour for calibrated probe points
pub const PROBE_MARK: Rgb<u8> = Rgb([255, 0, 0]);

/// Content area of a captured frame, right/bottom exclusive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CropBox {
    pub left: u32,
    pub top: u32,
    pub right: u32,
    pub bottom: u32,
}

impl CropBox {
    pub fn full(width: u32, height: u32) -> Self {
        Self {
            left: 0,
            top: 0,
            right: width,
            bottom: height,
        }
    }

    pub fn width(&self) -> u32 {
        self.right.saturating_sub(self.left)
    }

    pub fn height(&self) -> u32 {
        self.bottom.saturating_sub(self.top)
    }

    pub fn is_empty(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }

    /// Shrink to fit inside a `width` x `height` image
    fn clamp_to(self, width: u32, height: u32) -> Self {
        Self {
            left: self.left.min(width),
            top: self.top.min(height),
            right: self.right.min(width),
            bottom: self.bottom.min(height),
        }
    }
}

/// Bounding box of every pixel whose luma is above zero
///
/// Returns `None` for an all-black image.
pub fn find_content_box(image: &RgbImage) -> Option<CropBox> {
    let mut bounds: Option<CropBox> = None;

    for (x, y, pixel) in image.enumerate_pixels() {
        if pixel.to_luma()[0] == 0 {
            continue;
        }
        let b = bounds.get_or_insert(CropBox {
            left: x,
            top: y,
            right: x + 1,
            bottom: y + 1,
        });
        b.left = b.left.min(x);
        b.top = b.top.min(y);
        b.right = b.right.max(x + 1);
        b.bottom = b.bottom.max(y + 1);
    }

    bounds
}

/// Crop a captured frame to its content and scale it to the reference size
///
/// With `locked` the given box is reused instead of searching for borders.
/// Returns the prepared frame and the box that was used.
pub fn prepare_frame(image: &RgbImage, locked: Option<CropBox>) -> Result<(RgbImage, CropBox)> {
    let (width, height) = image.dimensions();
    let crop = match locked {
        Some(crop) => crop.clamp_to(width, height),
        None => find_content_box(image).unwrap_or_else(|| CropBox::full(width, height)),
    };

    if crop.is_empty() {
        return Err(DecoderError::FrameTooSmall {
            width: crop.width(),
            height: crop.height(),
            probe: Point::new(crop.left, crop.top),
        });
    }

    let content = imageops::crop_imm(image, crop.left, crop.top, crop.width(), crop.height()).to_image();
    let prepared = if content.dimensions() == (REFERENCE_WIDTH, REFERENCE_HEIGHT) {
        content
    } else {
        imageops::resize(&content, REFERENCE_WIDTH, REFERENCE_HEIGHT, FilterType::Nearest)
    };

    log::trace!("Prepared {}x{} frame using {:?}", width, height, crop);
    Ok((prepared, crop))
}

/// Paint every calibrated probe point onto `image`
///
/// Returns how many points fell inside the image.
pub fn mark_probes(image: &mut RgbImage, calibration: &Calibration) -> usize {
    let mut marked = 0;
    for point in calibration.probe_points() {
        if let Some(pixel) = image.get_pixel_mut_checked(point.x, point.y) {
            *pixel = PROBE_MARK;
            marked += 1;
        }
    }
    marked
}

#[cfg(test)]
mod tests {
    use super::*;

    fn letterboxed() -> RgbImage {
        // 100x60 black with a 40x30 grey block at (30, 15)
        let mut img = RgbImage::new(100, 60);
        for y in 15..45 {
            for x in 30..70 {
                img.put_pixel(x, y, Rgb([90, 90, 90]));
            }
        }
        img
    }

    #[test]
    fn test_find_content_box() {
        let crop = find_content_box(&letterboxed()).unwrap();
        assert_eq!(
            crop,
            CropBox {
                left: 30,
                top: 15,
                right: 70,
                bottom: 45
            }
        );
        assert!(find_content_box(&RgbImage::new(8, 8)).is_none());
    }

    #[test]
    fn test_prepare_frame_scales_content() {
        let (prepared, crop) = prepare_frame(&letterboxed(), None).unwrap();
        assert_eq!(prepared.dimensions(), (REFERENCE_WIDTH, REFERENCE_HEIGHT));
        assert_eq!(crop.width(), 40);
        // Border removed: corners are content colour
        assert_eq!(*prepared.get_pixel(0, 0), Rgb([90, 90, 90]));
        assert_eq!(*prepared.get_pixel(1279, 959), Rgb([90, 90, 90]));
    }

    #[test]
    fn test_black_frame_uses_full_image() {
        let (prepared, crop) = prepare_frame(&RgbImage::new(64, 48), None).unwrap();
        assert_eq!(crop, CropBox::full(64, 48));
        assert_eq!(prepared.dimensions(), (REFERENCE_WIDTH, REFERENCE_HEIGHT));
    }

    #[test]
    fn test_locked_box_is_reused() {
        let locked = CropBox {
            left: 0,
            top: 0,
            right: 50,
            bottom: 60,
        };
        let (prepared, crop) = prepare_frame(&letterboxed(), Some(locked)).unwrap();
        assert_eq!(crop, locked);
        // Left quarter of the reference frame is border
        assert_eq!(*prepared.get_pixel(10, 480), Rgb([0, 0, 0]));
    }

    #[test]
    fn test_locked_box_outside_image() {
        let locked = CropBox {
            left: 200,
            top: 0,
            right: 300,
            bottom: 60,
        };
        assert!(prepare_frame(&letterboxed(), Some(locked)).is_err());
    }
}
