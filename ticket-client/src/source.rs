//! Ticket source abstraction

use async_trait::async_trait;
use shared::models::{LabelSpec, Ticket};

use crate::ClientResult;

/// Remote queue of tickets waiting to be printed
///
/// Each call is a fresh round trip. Nothing is cached between tickets
/// because the remote records may change between polls.
#[async_trait]
pub trait TicketSource: Send + Sync {
    /// First ticket the service reports as awaiting print, if any
    async fn next_printable(&self) -> ClientResult<Option<Ticket>>;

    /// Resolve the records behind a ticket into its label fields
    async fn resolve(&self, ticket: &Ticket) -> ClientResult<LabelSpec>;

    /// Tell the service the ticket was printed
    ///
    /// Returns whether the service accepted the acknowledgment.
    async fn acknowledge(&self, ticket: &Ticket) -> ClientResult<bool>;
}
