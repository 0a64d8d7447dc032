//! Shared types for the qcos print agent
//!
//! Records served by the ticketing API and the flattened label view
//! built from them. Used by `ticket-client` and `print-agent`.

pub mod models;

// Re-exports
pub use models::*;
pub use serde::{Deserialize, Serialize};
