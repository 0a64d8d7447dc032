//! Canvas helpers

use image::{Rgb, RgbImage, imageops};

pub const WHITE: Rgb<u8> = Rgb([255, 255, 255]);
pub const BLACK: Rgb<u8> = Rgb([0, 0, 0]);

/// Fresh white RGB canvas
pub fn blank(width: u32, height: u32) -> RgbImage {
    RgbImage::from_pixel(width, height, WHITE)
}

/// Copy `overlay` onto `base` with its top-left corner at (`x`, `y`)
///
/// Parts falling outside `base` are dropped.
pub fn paste(base: &mut RgbImage, overlay: &RgbImage, x: u32, y: u32) {
    imageops::replace(base, overlay, i64::from(x), i64::from(y));
}

/// Luma of an RGB pixel (ITU-R 601)
pub fn luma(pixel: &Rgb<u8>) -> u8 {
    let [r, g, b] = pixel.0;
    ((299 * r as u32 + 587 * g as u32 + 114 * b as u32) / 1000) as u8
}
