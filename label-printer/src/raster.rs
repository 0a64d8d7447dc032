//! Brother QL raster command builder
//!
//! Provides a fluent API for building QL raster print data, plus
//! [`rasterize`] which turns a finished label bitmap into a complete job.

use image::RgbImage;
use image::imageops::{self, FilterType};
use tracing::{debug, instrument};

use crate::canvas::luma;
use crate::error::{PrintError, PrintResult};

// ============================================================================
// Models
// ============================================================================

/// Printer model capabilities
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Model {
    pub name: &'static str,
    /// Bytes per raster line (90 = 720 dots, 162 = 1296 dots for wide models)
    pub bytes_per_row: usize,
    /// NUL bytes sent to flush a half-received job
    pub invalidate_bytes: usize,
    /// Has an automatic cutter
    pub cutting: bool,
    /// Understands `ESC i K`
    pub expanded_mode: bool,
    /// Understands `ESC i a` (raster mode switch)
    pub mode_setting: bool,
}

impl Model {
    const fn new(
        name: &'static str,
        bytes_per_row: usize,
        invalidate_bytes: usize,
        cutting: bool,
        expanded_mode: bool,
        mode_setting: bool,
    ) -> Self {
        Self {
            name,
            bytes_per_row,
            invalidate_bytes,
            cutting,
            expanded_mode,
            mode_setting,
        }
    }

    /// Find a model by name (case-insensitive, e.g. "QL-710W")
    pub fn lookup(name: &str) -> PrintResult<&'static Model> {
        let name = name.trim();
        MODELS
            .iter()
            .find(|m| m.name.eq_ignore_ascii_case(name))
            .ok_or_else(|| PrintError::InvalidConfig(format!("Unknown printer model: {}", name)))
    }

    /// Raster line width in dots
    pub fn dots_per_row(&self) -> u32 {
        (self.bytes_per_row * 8) as u32
    }
}

pub const MODELS: &[Model] = &[
    Model::new("QL-500", 90, 200, false, false, false),
    Model::new("QL-550", 90, 200, true, false, false),
    Model::new("QL-560", 90, 200, true, true, false),
    Model::new("QL-570", 90, 200, true, true, false),
    Model::new("QL-580N", 90, 200, true, true, true),
    Model::new("QL-650TD", 90, 200, true, true, true),
    Model::new("QL-700", 90, 200, true, true, true),
    Model::new("QL-710W", 90, 200, true, true, true),
    Model::new("QL-720NW", 90, 200, true, true, true),
    Model::new("QL-800", 90, 400, true, true, true),
    Model::new("QL-810W", 90, 400, true, true, true),
    Model::new("QL-820NWB", 90, 400, true, true, true),
    Model::new("QL-1050", 162, 200, true, true, true),
    Model::new("QL-1060N", 162, 200, true, true, true),
];

// ============================================================================
// Media
// ============================================================================

/// Label roll type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    /// Endless tape, cut to the image length
    Continuous,
    /// Pre-cut labels of fixed length
    DieCut,
}

impl MediaKind {
    fn code(self) -> u8 {
        match self {
            MediaKind::Continuous => 0x0A,
            MediaKind::DieCut => 0x0B,
        }
    }
}

/// Label media geometry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelMedia {
    /// Identifier as written on the roll ("62", "62x29", ...)
    pub id: &'static str,
    pub kind: MediaKind,
    pub width_mm: u8,
    /// 0 for continuous media
    pub length_mm: u8,
    /// Printable width in dots
    pub printable_width: u32,
    /// Printable length in dots (0 for continuous media)
    pub printable_length: u32,
    /// Unprintable dots at the right edge of the print head
    pub right_margin: u32,
    /// Feed margin in dots (`ESC i d`)
    pub feed_margin: u16,
}

impl LabelMedia {
    const fn continuous(id: &'static str, width_mm: u8, printable_width: u32, right_margin: u32) -> Self {
        Self {
            id,
            kind: MediaKind::Continuous,
            width_mm,
            length_mm: 0,
            printable_width,
            printable_length: 0,
            right_margin,
            feed_margin: 35,
        }
    }

    const fn die_cut(
        id: &'static str,
        width_mm: u8,
        length_mm: u8,
        printable: (u32, u32),
        right_margin: u32,
    ) -> Self {
        Self {
            id,
            kind: MediaKind::DieCut,
            width_mm,
            length_mm,
            printable_width: printable.0,
            printable_length: printable.1,
            right_margin,
            feed_margin: 0,
        }
    }

    /// Find media by identifier
    pub fn lookup(id: &str) -> PrintResult<&'static LabelMedia> {
        let id = id.trim();
        MEDIA
            .iter()
            .find(|m| m.id.eq_ignore_ascii_case(id))
            .ok_or_else(|| PrintError::InvalidConfig(format!("Unknown label media: {}", id)))
    }

    /// Check that the media fits under the model's print head
    pub fn check_model(&self, model: &Model) -> PrintResult<()> {
        if self.printable_width + self.right_margin > model.dots_per_row() {
            return Err(PrintError::InvalidConfig(format!(
                "Media {} is too wide for {}",
                self.id, model.name
            )));
        }
        Ok(())
    }

    /// Check that labels drawn at `width` x `height` can go on this media
    ///
    /// Die-cut labels take exactly their printable size; continuous media
    /// accept any non-empty canvas and rescale it.
    pub fn check_canvas(&self, width: u32, height: u32) -> PrintResult<()> {
        if width == 0 || height == 0 {
            return Err(PrintError::InvalidConfig(format!(
                "Empty label canvas {}x{}",
                width, height
            )));
        }
        if self.kind == MediaKind::DieCut
            && (width, height) != (self.printable_width, self.printable_length)
        {
            return Err(PrintError::InvalidConfig(format!(
                "Label canvas {}x{} does not match die-cut media {} ({}x{})",
                width, height, self.id, self.printable_width, self.printable_length
            )));
        }
        Ok(())
    }
}

pub const MEDIA: &[LabelMedia] = &[
    LabelMedia::continuous("12", 12, 106, 29),
    LabelMedia::continuous("29", 29, 306, 6),
    LabelMedia::continuous("38", 38, 413, 12),
    LabelMedia::continuous("50", 50, 554, 12),
    LabelMedia::continuous("54", 54, 590, 0),
    LabelMedia::continuous("62", 62, 696, 12),
    LabelMedia::continuous("102", 102, 1164, 12),
    LabelMedia::die_cut("17x54", 17, 54, (165, 566), 0),
    LabelMedia::die_cut("29x90", 29, 90, (306, 991), 6),
    LabelMedia::die_cut("62x29", 62, 29, (696, 271), 12),
    LabelMedia::die_cut("62x100", 62, 100, (696, 1109), 12),
];

// ============================================================================
// Command builder
// ============================================================================

/// QL raster command builder
///
/// Builds the byte sequence of a single-page raster job.
pub struct QlRasterBuilder {
    buf: Vec<u8>,
    model: &'static Model,
}

impl QlRasterBuilder {
    /// Start a job: invalidate + initialize (ESC @)
    pub fn new(model: &'static Model) -> Self {
        let mut buf = Vec::with_capacity(model.invalidate_bytes + 64 * 1024);
        buf.resize(model.invalidate_bytes, 0x00);
        buf.extend_from_slice(&[0x1B, 0x40]);
        Self { buf, model }
    }

    /// Status information request (ESC i S)
    pub fn status_request(&mut self) -> &mut Self {
        self.buf.extend_from_slice(&[0x1B, 0x69, 0x53]);
        self
    }

    /// Switch to raster mode (ESC i a 1), skipped on models without mode setting
    pub fn raster_mode(&mut self) -> &mut Self {
        if self.model.mode_setting {
            self.buf.extend_from_slice(&[0x1B, 0x69, 0x61, 0x01]);
        }
        self
    }

    /// Print information (ESC i z): media type, size and raster line count
    pub fn media(&mut self, media: &LabelMedia, rows: u32) -> &mut Self {
        // Valid flags: recover | kind | width | length | high quality
        let flags = 0x80 | 0x02 | 0x04 | 0x08 | 0x40;
        self.buf.extend_from_slice(&[
            0x1B,
            0x69,
            0x7A,
            flags,
            media.kind.code(),
            media.width_mm,
            media.length_mm,
        ]);
        self.buf.extend_from_slice(&rows.to_le_bytes());
        // Starting page, fixed trailer
        self.buf.extend_from_slice(&[0x00, 0x00]);
        self
    }

    /// Auto cut every `every` labels (ESC i M / ESC i A), skipped without a cutter
    pub fn autocut(&mut self, every: u8) -> &mut Self {
        if self.model.cutting {
            self.buf.extend_from_slice(&[0x1B, 0x69, 0x4D, 0x40]);
            self.buf.extend_from_slice(&[0x1B, 0x69, 0x41, every.max(1)]);
        }
        self
    }

    /// Expanded mode (ESC i K), skipped on models that lack it
    pub fn expanded(&mut self, cut_at_end: bool) -> &mut Self {
        if self.model.expanded_mode {
            let flags = if cut_at_end { 0x08 } else { 0x00 };
            self.buf.extend_from_slice(&[0x1B, 0x69, 0x4B, flags]);
        }
        self
    }

    /// Feed margin in dots (ESC i d)
    pub fn margins(&mut self, dots: u16) -> &mut Self {
        self.buf.extend_from_slice(&[0x1B, 0x69, 0x64]);
        self.buf.extend_from_slice(&dots.to_le_bytes());
        self
    }

    /// One uncompressed raster line (g 0x00 n data)
    pub fn raster_line(&mut self, row: &[u8]) -> &mut Self {
        self.buf.extend_from_slice(&[0x67, 0x00, row.len() as u8]);
        self.buf.extend_from_slice(row);
        self
    }

    /// Print with feeding (last page)
    pub fn print(&mut self) -> &mut Self {
        self.buf.push(0x1A);
        self
    }

    /// Build the final byte buffer
    pub fn build(self) -> Vec<u8> {
        self.buf
    }
}

// ============================================================================
// Image conversion
// ============================================================================

/// Raster conversion options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RasterOptions {
    /// Cut after the label (models with a cutter only)
    pub cut: bool,
    /// Pixels with luma below this print black
    pub threshold: u8,
}

impl Default for RasterOptions {
    fn default() -> Self {
        Self {
            cut: true,
            threshold: 128,
        }
    }
}

/// Convert a label bitmap into a complete QL raster job
///
/// Continuous media rescale images whose width differs from the printable
/// width (aspect preserved); die-cut media require the exact printable size.
#[instrument(skip(image), fields(model = model.name, media = media.id, size = ?image.dimensions()))]
pub fn rasterize(
    image: &RgbImage,
    model: &'static Model,
    media: &LabelMedia,
    options: &RasterOptions,
) -> PrintResult<Vec<u8>> {
    media.check_model(model)?;

    let (w, h) = image.dimensions();
    if w == 0 || h == 0 {
        return Err(PrintError::InvalidImage(format!("empty image {}x{}", w, h)));
    }

    let resized;
    let image = match media.kind {
        MediaKind::Continuous if w != media.printable_width => {
            let ratio = media.printable_width as f64 / w as f64;
            let new_h = ((h as f64 * ratio).round() as u32).max(1);
            debug!(from = ?(w, h), to = ?(media.printable_width, new_h), "Rescaling label");
            resized = imageops::resize(image, media.printable_width, new_h, FilterType::Nearest);
            &resized
        }
        MediaKind::DieCut if (w, h) != (media.printable_width, media.printable_length) => {
            return Err(PrintError::InvalidImage(format!(
                "{}x{} does not match die-cut media {} ({}x{})",
                w, h, media.id, media.printable_width, media.printable_length
            )));
        }
        _ => image,
    };

    let (w, h) = image.dimensions();
    let cut = options.cut && model.cutting;

    let mut b = QlRasterBuilder::new(model);
    b.status_request()
        .raster_mode()
        .media(media, h);
    if cut {
        b.autocut(1);
    }
    b.expanded(cut).margins(media.feed_margin);

    let mut row = vec![0u8; model.bytes_per_row];
    for y in 0..h {
        row.fill(0);
        for x in 0..w {
            if luma(image.get_pixel(x, y)) < options.threshold {
                // Right-aligned against the media margin and mirrored for the head
                let col = (media.right_margin + (w - 1 - x)) as usize;
                row[col / 8] |= 0x80 >> (col % 8);
            }
        }
        b.raster_line(&row);
    }

    b.print();
    let data = b.build();
    debug!(bytes = data.len(), rows = h, "Raster job built");
    Ok(data)
}
