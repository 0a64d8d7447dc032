//! # label-printer
//!
//! Brother QL label printer library - low-level printing capabilities only.
//!
//! ## Scope
//!
//! This crate handles HOW to print:
//! - Font fitting and text drawing (TrueType via rusttype)
//! - QR code images
//! - Canvas helpers (blank canvas, clipped paste)
//! - Brother QL raster command building
//! - Device file and network (TCP port 9100) transports
//!
//! Business logic (WHAT to print) stays in application code:
//! - Ticket label layout → print-agent
//!
//! ## Example
//!
//! ```ignore
//! use label_printer::raster::{LabelMedia, Model, RasterOptions, rasterize};
//! use label_printer::{Printer, Transport};
//!
//! let model = Model::lookup("QL-710W")?;
//! let media = LabelMedia::lookup("62")?;
//! let data = rasterize(&image, model, media, &RasterOptions::default())?;
//!
//! let printer = Transport::from_path("/dev/usb/lp0")?;
//! printer.print(&data).await?;
//! ```

pub mod canvas;
pub mod code;
mod error;
pub mod font;
mod printer;
pub mod raster;

// Re-exports
pub use code::{CodeStyle, render_code};
pub use error::{PrintError, PrintResult, RenderError, RenderResult};
pub use font::{FontFit, TextExtent, TrueTypeFace, Typeface, fit};
pub use printer::{DevicePrinter, NetworkPrinter, Printer, Transport};
pub use raster::{LabelMedia, MediaKind, Model, QlRasterBuilder, RasterOptions, rasterize};
