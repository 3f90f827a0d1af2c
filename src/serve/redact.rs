//! Region redaction.
//!
//! Detected boxes are clamped to the image bounds and each non-empty region
//! gets a strong Gaussian blur applied on a copy of the original image. Boxes
//! are processed independently; overlapping regions compound, last write wins.

use image::{imageops, RgbImage};

use crate::adapters::BoundingBox;

/// Blur strength for redacted regions
pub const BLUR_SIGMA: f32 = 30.0;

/// Clamp a box to the image bounds.
///
/// Returns integer pixel corners `(x1, y1, x2, y2)` with `x1,y1 >= 0`,
/// `x2 <= width`, `y2 <= height`, or `None` if the clamped region is empty.
pub fn clamp_box(bbox: &BoundingBox, width: u32, height: u32) -> Option<(u32, u32, u32, u32)> {
    let x1 = bbox.x1.max(0.0) as u32;
    let y1 = bbox.y1.max(0.0) as u32;
    let x2 = bbox.x2.max(0.0).min(width as f32) as u32;
    let y2 = bbox.y2.max(0.0).min(height as f32) as u32;

    if x2 <= x1 || y2 <= y1 {
        return None;
    }
    Some((x1, y1, x2, y2))
}

/// Blur every detected region on a copy of the image.
///
/// Pixels outside all boxes are untouched; zero boxes returns the input
/// unchanged.
pub fn blur_regions(image: &RgbImage, boxes: &[BoundingBox]) -> RgbImage {
    let mut out = image.clone();

    for bbox in boxes {
        let Some((x1, y1, x2, y2)) = clamp_box(bbox, out.width(), out.height()) else {
            continue;
        };

        // Crop from the working copy so overlapping boxes compound
        let region = imageops::crop_imm(&out, x1, y1, x2 - x1, y2 - y1).to_image();
        let blurred = imageops::blur(&region, BLUR_SIGMA);
        imageops::replace(&mut out, &blurred, x1 as i64, y1 as i64);
    }

    out
}
