//! Data models
//!
//! Mirrors the JSON records of the ticketing API.
//! All record references are `i64` primary keys.

pub mod label_spec;
pub mod ticket;

// Re-exports
pub use label_spec::*;
pub use ticket::*;
