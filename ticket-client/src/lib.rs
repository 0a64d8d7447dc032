//! # ticket-client
//!
//! Client for the qcos ticketing API.
//!
//! The print agent only depends on the [`TicketSource`] trait; the
//! [`HttpTicketSource`] implementation talks to the real service:
//!
//! ```ignore
//! use ticket_client::{HttpTicketSource, TicketSource};
//!
//! let source = HttpTicketSource::new("http://qcos.local/api/")?;
//! if let Some(ticket) = source.next_printable().await? {
//!     let spec = source.resolve(&ticket).await?;
//!     // ... print ...
//!     source.acknowledge(&ticket).await?;
//! }
//! ```

mod error;
mod http;
mod source;

// Re-exports
pub use error::{ClientError, ClientResult};
pub use http::HttpTicketSource;
pub use source::TicketSource;
