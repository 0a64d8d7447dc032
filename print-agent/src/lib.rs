//! qcos print agent
//!
//! Polls the qcos ticket API and prints every queued ticket as a label on a
//! Brother QL printer, acknowledging each one once it has been written out.
//!
//! # Pipeline
//!
//! ```text
//! TicketSource ──► LabelComposer ──► PrinterSink ──► acknowledge
//!  (HTTP API)      (text + QR)       (QL raster)
//! ```
//!
//! [`JobLoop`] sequences the steps; [`build`] wires the production pieces
//! from an [`AgentConfig`].

pub mod config;
mod error;
pub mod label;
pub mod logger;
pub mod sink;
pub mod worker;

use anyhow::Context;
use label_printer::{CodeStyle, RasterOptions, Transport, TrueTypeFace};
use ticket_client::HttpTicketSource;

pub use config::AgentConfig;
pub use error::JobError;
pub use label::{ComposeError, FieldRegion, LabelComposer, RenderedLabel};
pub use sink::{PrinterSink, RasterJob};
pub use worker::{AckPolicy, CycleOutcome, JobLoop, JobState, LoopSettings};

/// The production agent
pub type Agent = JobLoop<HttpTicketSource, TrueTypeFace, Transport>;

/// Assemble the agent from configuration
///
/// Fails when the font cannot be loaded, the model or media is unknown, the
/// ticket size does not fit the media, or the printer is not reachable.
pub async fn build(config: &AgentConfig) -> anyhow::Result<Agent> {
    let source = HttpTicketSource::with_timeout(&config.api_url, config.request_timeout())
        .context("Invalid ticket API settings")?;

    let face = TrueTypeFace::load(&config.font_path)
        .with_context(|| format!("Failed to load font {}", config.font_path.display()))?;
    let composer = LabelComposer::with_code_style(
        face,
        CodeStyle {
            box_size: config.qr_box_size,
            border: config.qr_border,
        },
    );

    let transport = Transport::from_path(&config.printer_path)?;
    let options = RasterOptions {
        cut: config.cut,
        threshold: config.threshold,
    };
    let sink = PrinterSink::new(transport, &config.model, &config.media, options)?;
    sink.check_canvas(config.ticket_width, config.ticket_height)
        .context("Ticket size does not fit the label media")?;

    if !sink.is_online().await {
        anyhow::bail!("Printer {} is not available", config.printer_path);
    }
    tracing::info!(
        model = sink.model().name,
        media = sink.media().id,
        printer = %config.printer_path,
        "Printer ready"
    );

    Ok(JobLoop::new(
        source,
        composer,
        sink,
        LoopSettings::from_config(config),
    ))
}
