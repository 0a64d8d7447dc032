//! QR code images

use image::{Rgb, RgbImage};
use qrcode::{Color, EcLevel, QrCode};

use crate::error::{RenderError, RenderResult};

/// Largest symbol side in pixels
pub const MAX_CODE_SIDE: u32 = 8192;

/// Geometry of a rendered QR symbol
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodeStyle {
    /// Pixels per module
    pub box_size: u32,
    /// Quiet zone width in modules
    pub border: u32,
}

impl Default for CodeStyle {
    fn default() -> Self {
        Self {
            box_size: 10,
            border: 4,
        }
    }
}

/// Encode `data` as a QR symbol (error correction M, smallest version that
/// fits) and render it black on white
///
/// Side length is `(modules + 2 * border) * box_size` pixels; styles that
/// would exceed [`MAX_CODE_SIDE`] are rejected.
pub fn render_code(data: &str, style: &CodeStyle) -> RenderResult<RgbImage> {
    let code = QrCode::with_error_correction_level(data.as_bytes(), EcLevel::M)
        .map_err(|e| RenderError::Code(format!("{} ({} bytes)", e, data.len())))?;

    let modules = code.width() as u32;
    let scale = style.box_size.max(1);
    let side = style
        .border
        .checked_mul(2)
        .and_then(|quiet| quiet.checked_add(modules))
        .and_then(|span| span.checked_mul(scale))
        .filter(|&side| side <= MAX_CODE_SIDE)
        .ok_or_else(|| {
            RenderError::Code(format!(
                "{} modules with border {} at {}px per module exceed {}px",
                modules, style.border, scale, MAX_CODE_SIDE
            ))
        })?;

    let mut img = RgbImage::from_pixel(side, side, Rgb([255, 255, 255]));

    for (i, color) in code.to_colors().into_iter().enumerate() {
        if color != Color::Dark {
            continue;
        }
        let mx = (i as u32) % modules + style.border;
        let my = (i as u32) / modules + style.border;
        for dy in 0..scale {
            for dx in 0..scale {
                img.put_pixel(mx * scale + dx, my * scale + dy, Rgb([0, 0, 0]));
            }
        }
    }

    Ok(img)
}
