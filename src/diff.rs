//! Pixel-level comparison of rendered screenshots.
//!
//! Two images are compared on a canvas sized to the larger of the two in
//! each dimension, with the shorter image padded with black. A pixel counts
//! as different when any channel differs. The report carries the raw counts
//! so callers can apply their own thresholds; [`DiffReport::within`] is the
//! common gate.

use std::path::Path;

use image::{Rgb as Pixel, RgbImage};

use crate::builtin_font;
use crate::error::Result;

/// Outcome of comparing two images.
#[derive(Debug, Clone, PartialEq)]
pub struct DiffReport {
    /// Differing pixels as a percentage of the padded canvas, 0.0..=100.0.
    pub difference_percent: f64,
    /// Number of pixels that differ in at least one channel.
    pub differing_pixels: u64,
    /// Total pixels on the padded canvas.
    pub total_pixels: u64,
    /// Padded canvas width.
    pub width: u32,
    /// Padded canvas height.
    pub height: u32,
}

impl DiffReport {
    /// Whether the difference is at or below `threshold` percent.
    pub fn within(&self, threshold: f64) -> bool {
        self.difference_percent <= threshold
    }
}

/// Compares two images pixel by pixel.
///
/// Size mismatches do not fail: both images are placed at the top-left of
/// a shared canvas padded with black, so a size change shows up as a band
/// of differing pixels rather than an error.
pub fn compare(golden: &RgbImage, actual: &RgbImage) -> DiffReport {
    let width = golden.width().max(actual.width());
    let height = golden.height().max(actual.height());
    let total_pixels = u64::from(width) * u64::from(height);

    let mut differing_pixels = 0u64;
    for y in 0..height {
        for x in 0..width {
            if padded_pixel(golden, x, y) != padded_pixel(actual, x, y) {
                differing_pixels += 1;
            }
        }
    }

    let difference_percent = if total_pixels == 0 {
        0.0
    } else {
        differing_pixels as f64 / total_pixels as f64 * 100.0
    };

    DiffReport {
        difference_percent,
        differing_pixels,
        total_pixels,
        width,
        height,
    }
}

/// Loads both images from disk and compares them.
pub fn compare_files(golden: &Path, actual: &Path) -> Result<DiffReport> {
    let golden = image::open(golden)?.into_rgb8();
    let actual = image::open(actual)?.into_rgb8();
    Ok(compare(&golden, &actual))
}

const VIZ_PADDING: u32 = 10;
const VIZ_LABEL_HEIGHT: u32 = 25;
const VIZ_BACKGROUND: Pixel<u8> = Pixel([50, 50, 50]);
const VIZ_LABEL_COLOR: Pixel<u8> = Pixel([200, 200, 200]);

/// Builds a labeled side-by-side review image.
///
/// Layout is three panels, `Golden | Actual | Diff`, where the diff panel
/// paints differing pixels solid red on black.
pub fn visualize(golden: &RgbImage, actual: &RgbImage) -> RgbImage {
    let panel_w = golden.width().max(actual.width());
    let panel_h = golden.height().max(actual.height());
    let total_w = panel_w * 3 + VIZ_PADDING * 4;
    let total_h = panel_h + VIZ_LABEL_HEIGHT + VIZ_PADDING * 2;

    let mut viz = RgbImage::from_pixel(total_w, total_h, VIZ_BACKGROUND);

    let labels = ["Golden", "Actual", "Diff"];
    for (i, label) in labels.iter().enumerate() {
        let x = VIZ_PADDING + i as u32 * (panel_w + VIZ_PADDING);
        draw_label(&mut viz, x, 5, label);
    }

    let y0 = VIZ_LABEL_HEIGHT;
    blit(&mut viz, golden, VIZ_PADDING, y0);
    blit(&mut viz, actual, VIZ_PADDING * 2 + panel_w, y0);

    let x2 = VIZ_PADDING * 3 + panel_w * 2;
    for y in 0..panel_h {
        for x in 0..panel_w {
            let differs = padded_pixel(golden, x, y) != padded_pixel(actual, x, y);
            let color = if differs {
                Pixel([255, 0, 0])
            } else {
                Pixel([0, 0, 0])
            };
            viz.put_pixel(x2 + x, y0 + y, color);
        }
    }

    viz
}

fn padded_pixel(img: &RgbImage, x: u32, y: u32) -> Pixel<u8> {
    if x < img.width() && y < img.height() {
        *img.get_pixel(x, y)
    } else {
        Pixel([0, 0, 0])
    }
}

fn blit(dst: &mut RgbImage, src: &RgbImage, at_x: u32, at_y: u32) {
    for y in 0..src.height() {
        for x in 0..src.width() {
            if at_x + x < dst.width() && at_y + y < dst.height() {
                dst.put_pixel(at_x + x, at_y + y, *src.get_pixel(x, y));
            }
        }
    }
}

/// Draws a short label with the 8x8 builtin font.
fn draw_label(img: &mut RgbImage, x: u32, y: u32, text: &str) {
    for (i, ch) in text.chars().enumerate() {
        let bitmap = builtin_font::glyph(ch);
        let ox = x + i as u32 * 8;
        for (row, bits) in bitmap.iter().enumerate() {
            for col in 0..8u32 {
                if bits & (1u8 << col) != 0 {
                    let px = ox + col;
                    let py = y + row as u32;
                    if px < img.width() && py < img.height() {
                        img.put_pixel(px, py, VIZ_LABEL_COLOR);
                    }
                }
            }
        }
    }
}
