//! Printer sink: rendered label in, raster bytes out to the device

use label_printer::{LabelMedia, Model, PrintResult, Printer, RasterOptions, rasterize};
use tracing::{info, instrument};

use crate::label::RenderedLabel;

/// Raster byte stream for exactly one label
///
/// Only [`PrinterSink::render_job`] builds one, and [`PrinterSink::write`]
/// consumes it.
#[derive(Debug)]
pub struct RasterJob {
    bytes: Vec<u8>,
}

impl RasterJob {
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

/// A printer plus the model/media it is loaded with
pub struct PrinterSink<P> {
    printer: P,
    model: &'static Model,
    media: &'static LabelMedia,
    options: RasterOptions,
}

impl<P: Printer> PrinterSink<P> {
    /// Resolve `model` and `media` identifiers
    ///
    /// Fails for unknown identifiers and for media wider than the model's head.
    pub fn new(printer: P, model: &str, media: &str, options: RasterOptions) -> PrintResult<Self> {
        let model = Model::lookup(model)?;
        let media = LabelMedia::lookup(media)?;
        media.check_model(model)?;

        Ok(Self {
            printer,
            model,
            media,
            options,
        })
    }

    pub fn model(&self) -> &'static Model {
        self.model
    }

    pub fn media(&self) -> &'static LabelMedia {
        self.media
    }

    pub fn printer(&self) -> &P {
        &self.printer
    }

    /// Fail unless labels of `width` x `height` fit the loaded media
    pub fn check_canvas(&self, width: u32, height: u32) -> PrintResult<()> {
        self.media.check_canvas(width, height)
    }

    /// Convert a label into the printer's raster stream
    pub fn render_job(&self, label: &RenderedLabel) -> PrintResult<RasterJob> {
        let bytes = rasterize(label.image(), self.model, self.media, &self.options)?;
        Ok(RasterJob { bytes })
    }

    /// Write a job in full; returns only once every byte reached the transport
    #[instrument(skip_all, fields(model = self.model.name, bytes = job.len()))]
    pub async fn write(&self, job: RasterJob) -> PrintResult<()> {
        self.printer.print(&job.bytes).await?;
        info!("Raster job written");
        Ok(())
    }

    pub async fn is_online(&self) -> bool {
        self.printer.is_online().await
    }
}
