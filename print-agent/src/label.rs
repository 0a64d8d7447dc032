//! Label composition
//!
//! Lays a [`LabelSpec`] out on a fixed-size canvas: four auto-fitted text
//! lines stacked from the top, then the ticket's QR code from the middle down.

use image::RgbImage;
use label_printer::canvas::{self, BLACK};
use label_printer::{CodeStyle, RenderError, Typeface, fit, render_code};
use shared::{LabelField, LabelSpec};
use thiserror::Error;

/// Left edge of every drawn element
pub const LEFT_MARGIN: u32 = 10;

/// Text rows in drawing order with their share of the canvas height
pub const TEXT_LAYOUT: [(LabelField, f32); 4] = [
    (LabelField::Camp, 0.25),
    (LabelField::Clan, 0.10),
    (LabelField::Fee, 0.10),
    (LabelField::Guid, 0.05),
];

#[derive(Debug, Error)]
pub enum ComposeError {
    #[error("invalid canvas size {width}x{height}")]
    InvalidCanvas { width: u32, height: u32 },

    #[error("cannot render {field} {value:?}: {source}")]
    Field {
        field: LabelField,
        value: String,
        #[source]
        source: RenderError,
    },
}

/// Vertical band occupied by one text field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldRegion {
    pub field: LabelField,
    pub top: u32,
    /// Rendered text height (0 for an empty field)
    pub height: u32,
    /// Chosen font size in pixels
    pub size: u32,
}

impl FieldRegion {
    pub fn bottom(&self) -> u32 {
        self.top + self.height
    }
}

/// A finished label bitmap and where its text went
///
/// Read-only once composed.
#[derive(Debug, Clone)]
pub struct RenderedLabel {
    image: RgbImage,
    regions: Vec<FieldRegion>,
}

impl RenderedLabel {
    pub fn image(&self) -> &RgbImage {
        &self.image
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Text regions in drawing order
    pub fn regions(&self) -> &[FieldRegion] {
        &self.regions
    }

    pub fn region(&self, field: LabelField) -> Option<&FieldRegion> {
        self.regions.iter().find(|r| r.field == field)
    }
}

/// Draws labels with one typeface and code style
pub struct LabelComposer<F> {
    face: F,
    code_style: CodeStyle,
}

impl<F: Typeface> LabelComposer<F> {
    pub fn new(face: F) -> Self {
        Self::with_code_style(face, CodeStyle::default())
    }

    pub fn with_code_style(face: F, code_style: CodeStyle) -> Self {
        Self { face, code_style }
    }

    /// Compose `spec` onto a fresh white `width` × `height` canvas
    ///
    /// Each text field gets a box as wide as the canvas and a fixed share of
    /// its height; the next field starts right below the previous field's
    /// rendered height. The QR code of `ticket_guid` is pasted at
    /// (`LEFT_MARGIN`, `height / 2`) and clipped to the canvas.
    pub fn compose(
        &self,
        spec: &LabelSpec,
        width: u32,
        height: u32,
    ) -> Result<RenderedLabel, ComposeError> {
        if width == 0 || height == 0 {
            return Err(ComposeError::InvalidCanvas { width, height });
        }

        let mut image = canvas::blank(width, height);
        let mut regions = Vec::with_capacity(TEXT_LAYOUT.len());
        let mut cursor = 0u32;

        for (field, share) in TEXT_LAYOUT {
            let text = spec.text(field).unwrap_or_default();
            let fitted = fit(&self.face, text, width as f32, height as f32 * share);

            if !text.is_empty() {
                self.face
                    .draw(&mut image, text, LEFT_MARGIN, cursor, fitted.size, BLACK);
            }

            regions.push(FieldRegion {
                field,
                top: cursor,
                height: fitted.extent.height,
                size: fitted.size,
            });
            cursor = cursor.saturating_add(fitted.extent.height);
        }

        let code = render_code(&spec.ticket_guid, &self.code_style).map_err(|source| {
            ComposeError::Field {
                field: LabelField::Code,
                value: spec.ticket_guid.clone(),
                source,
            }
        })?;
        canvas::paste(&mut image, &code, LEFT_MARGIN, height / 2);

        Ok(RenderedLabel { image, regions })
    }
}
