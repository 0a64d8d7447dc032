//! Job loop errors

use label_printer::PrintError;
use thiserror::Error;
use ticket_client::ClientError;

use crate::label::ComposeError;

/// Why a print cycle was abandoned
///
/// None of these acknowledges the ticket; it stays queued on the service.
#[derive(Debug, Error)]
pub enum JobError {
    /// Polling or resolving the ticket failed
    #[error("ticket source: {0}")]
    Source(#[from] ClientError),

    /// The label could not be drawn
    #[error("label: {0}")]
    Render(#[from] ComposeError),

    /// The label could not be converted for the loaded media
    #[error("raster: {0}")]
    Raster(PrintError),

    /// Writing to the device failed
    #[error("printer: {0}")]
    Device(#[from] PrintError),
}
