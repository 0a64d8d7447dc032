//! Font fitting and text drawing
//!
//! [`fit`] picks the largest font size at which a string stays strictly
//! inside a bounding box. Glyph metrics come from a [`Typeface`]; the
//! production implementation is [`TrueTypeFace`] (rusttype).

use std::path::Path;

use image::{Rgb, RgbImage};
use rusttype::{Font, Scale, VMetrics, point};
use tracing::{debug, instrument};

use crate::error::{RenderError, RenderResult};

/// Smallest font size the fitter returns
pub const MIN_FONT_SIZE: u32 = 1;

/// Upper bound of the size search
///
/// Real fonts stop growing inside any sane box long before this; the cap
/// only guarantees termination for degenerate metrics.
pub const MAX_FONT_SIZE: u32 = 1024;

/// Rendered size of a string in pixels
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TextExtent {
    pub width: u32,
    pub height: u32,
}

impl TextExtent {
    /// Strictly inside both bounds
    pub fn fits_within(&self, max_width: f32, max_height: f32) -> bool {
        (self.width as f32) < max_width && (self.height as f32) < max_height
    }
}

/// Glyph measurement and drawing
pub trait Typeface {
    /// Bounding box of `text` rendered at `size` pixels (0×0 for empty text)
    fn measure(&self, text: &str, size: u32) -> TextExtent;

    /// Draw `text` with its top-left corner at (`x`, `y`)
    ///
    /// Ink stays within the rows `y..y + measure(text, size).height` and is
    /// clipped to the canvas.
    fn draw(&self, canvas: &mut RgbImage, text: &str, x: u32, y: u32, size: u32, color: Rgb<u8>);
}

/// Result of [`fit`]: the chosen size and the extent measured at that size
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FontFit {
    pub size: u32,
    pub extent: TextExtent,
}

/// Find the largest font size whose rendering of `text` stays strictly under
/// `max_width` × `max_height`
///
/// Linear scan upward from [`MIN_FONT_SIZE`], stopping at the first size that
/// touches either bound. Empty text, non-positive bounds, or a box too small
/// for even the minimum size all yield [`MIN_FONT_SIZE`].
pub fn fit<F: Typeface + ?Sized>(face: &F, text: &str, max_width: f32, max_height: f32) -> FontFit {
    let mut best = FontFit {
        size: MIN_FONT_SIZE,
        extent: face.measure(text, MIN_FONT_SIZE),
    };

    // NaN bounds fail these comparisons as well
    if text.is_empty() || !(max_width > 0.0) || !(max_height > 0.0) {
        return best;
    }

    for size in MIN_FONT_SIZE..=MAX_FONT_SIZE {
        let extent = face.measure(text, size);
        if !extent.fits_within(max_width, max_height) {
            break;
        }
        best = FontFit { size, extent };
    }

    best
}

/// TrueType/OpenType face backed by rusttype
pub struct TrueTypeFace {
    font: Font<'static>,
}

impl TrueTypeFace {
    /// Load a font file (loaded once at startup, kept for the process lifetime)
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn load(path: impl AsRef<Path>) -> RenderResult<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)
            .map_err(|e| RenderError::Font(format!("{}: {}", path.display(), e)))?;
        let face = Self::from_bytes(bytes)?;
        debug!("Font loaded");
        Ok(face)
    }

    pub fn from_bytes(bytes: Vec<u8>) -> RenderResult<Self> {
        let font = Font::try_from_vec(bytes)
            .ok_or_else(|| RenderError::Font("unsupported font data".to_string()))?;
        Ok(Self { font })
    }
}

impl Typeface for TrueTypeFace {
    fn measure(&self, text: &str, size: u32) -> TextExtent {
        if text.is_empty() || size == 0 {
            return TextExtent::default();
        }

        let scale = Scale::uniform(size as f32);
        let v_metrics = self.font.v_metrics(scale);

        let mut width: f32 = 0.0;
        for glyph in self.font.layout(text, scale, point(0.0, v_metrics.ascent)) {
            let advance = glyph.position().x + glyph.unpositioned().h_metrics().advance_width;
            width = width.max(advance);
            if let Some(bb) = glyph.pixel_bounding_box() {
                width = width.max(bb.max.x as f32);
            }
        }

        TextExtent {
            width: width.ceil() as u32,
            height: line_height(&v_metrics),
        }
    }

    fn draw(&self, canvas: &mut RgbImage, text: &str, x: u32, y: u32, size: u32, color: Rgb<u8>) {
        if text.is_empty() || size == 0 {
            return;
        }

        let scale = Scale::uniform(size as f32);
        let v_metrics = self.font.v_metrics(scale);
        let origin = point(x as f32, y as f32 + v_metrics.ascent);
        let cw = canvas.width();
        let bottom = y.saturating_add(line_height(&v_metrics)).min(canvas.height());

        for glyph in self.font.layout(text, scale, origin) {
            let Some(bb) = glyph.pixel_bounding_box() else {
                continue;
            };
            glyph.draw(|gx, gy, coverage| {
                let px = gx as i32 + bb.min.x;
                let py = gy as i32 + bb.min.y;
                // Accents and antialiasing may reach past the line box
                if px < 0 || py < 0 || px as u32 >= cw || (py as u32) < y || py as u32 >= bottom {
                    return;
                }
                if coverage <= 0.0 {
                    return;
                }
                let dst = canvas.get_pixel_mut(px as u32, py as u32);
                let a = coverage.min(1.0);
                let inv = 1.0 - a;
                for c in 0..3 {
                    dst.0[c] = (color.0[c] as f32 * a + dst.0[c] as f32 * inv) as u8;
                }
            });
        }
    }
}

fn line_height(v_metrics: &VMetrics) -> u32 {
    (v_metrics.ascent - v_metrics.descent).ceil() as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Square glyphs: each char is `size` wide and `size` tall
    struct BlockFace;

    impl Typeface for BlockFace {
        fn measure(&self, text: &str, size: u32) -> TextExtent {
            if text.is_empty() {
                return TextExtent::default();
            }
            TextExtent {
                width: text.chars().count() as u32 * size,
                height: size,
            }
        }

        fn draw(&self, _: &mut RgbImage, _: &str, _: u32, _: u32, _: u32, _: Rgb<u8>) {}
    }

    /// Metrics that never grow
    struct FlatFace;

    impl Typeface for FlatFace {
        fn measure(&self, _: &str, _: u32) -> TextExtent {
            TextExtent { width: 1, height: 1 }
        }

        fn draw(&self, _: &mut RgbImage, _: &str, _: u32, _: u32, _: u32, _: Rgb<u8>) {}
    }

    #[test]
    fn test_fit_is_maximal() {
        let cases = [
            ("Camp Alpha", 696.0, 75.0),
            ("Wolves", 696.0, 30.0),
            ("ABC123", 696.0, 15.0),
            ("a considerably longer line of text", 200.0, 80.0),
            ("x", 3.5, 100.0),
        ];

        for (text, w, h) in cases {
            let result = fit(&BlockFace, text, w, h);
            assert!(result.extent.fits_within(w, h), "{text}: {result:?}");
            assert_eq!(result.extent, BlockFace.measure(text, result.size));
            let next = BlockFace.measure(text, result.size + 1);
            assert!(!next.fits_within(w, h), "{text}: size {} is not maximal", result.size);
        }
    }

    #[test]
    fn test_fit_height_bound() {
        // 10 chars * 69 = 690 < 696, 69 < 75; 70 would be 700 wide
        let result = fit(&BlockFace, "Camp Alpha", 696.0, 75.0);
        assert_eq!(result.size, 69);

        let result = fit(&BlockFace, "Wolves", 696.0, 30.0);
        assert_eq!(result.size, 29);
    }

    #[test]
    fn test_fit_bound_is_strict() {
        // size 10 measures exactly 10x10, which must not count as fitting
        let result = fit(&BlockFace, "x", 10.0, 10.0);
        assert_eq!(result.size, 9);
    }

    #[test]
    fn test_fit_tiny_box_returns_minimum() {
        let result = fit(&BlockFace, "Camp Alpha", 0.5, 0.5);
        assert_eq!(result.size, MIN_FONT_SIZE);

        let result = fit(&BlockFace, "Camp Alpha", 5.0, 100.0);
        assert_eq!(result.size, MIN_FONT_SIZE);
    }

    #[test]
    fn test_fit_degenerate_bounds_return_minimum() {
        for (w, h) in [(0.0, 10.0), (10.0, 0.0), (-1.0, 10.0), (f32::NAN, 10.0)] {
            assert_eq!(fit(&BlockFace, "abc", w, h).size, MIN_FONT_SIZE);
        }
    }

    #[test]
    fn test_fit_empty_text() {
        let result = fit(&BlockFace, "", 696.0, 75.0);
        assert_eq!(result.size, MIN_FONT_SIZE);
        assert_eq!(result.extent, TextExtent::default());
    }

    #[test]
    fn test_fit_terminates_on_flat_metrics() {
        let result = fit(&FlatFace, "anything", 696.0, 75.0);
        assert_eq!(result.size, MAX_FONT_SIZE);
    }

    #[test]
    fn test_invalid_font_data() {
        let result = TrueTypeFace::from_bytes(vec![0, 1, 2, 3]);
        assert!(matches!(result, Err(RenderError::Font(_))));
    }

    #[test]
    fn test_missing_font_file() {
        let result = TrueTypeFace::load("/nonexistent/Verdana.ttf");
        assert!(matches!(result, Err(RenderError::Font(_))));
    }
}
