//! Ticket Models
//!
//! Only the fields the print agent reads are declared; unknown fields
//! in the API responses are ignored.

use serde::{Deserialize, Serialize};

/// Ticket awaiting print (`GET ticketstoprint/`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ticket {
    pub pk: i64,
    /// Printable token, encoded into the label's QR code
    pub guid: String,
    /// TicketInfo reference
    pub ticket_info: i64,
    /// Owned by the service; only changed through `markTicketPrinted`
    #[serde(default)]
    pub printed: bool,
}

/// Ticket info record (`GET ticketinfo/{pk}/`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketInfo {
    pub fee: i64,
    pub registration: i64,
}

/// Fee record (`GET fee/{pk}/`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fee {
    pub name: String,
    pub camp: i64,
}

/// Camp record (`GET camp/{pk}/`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Camp {
    pub name: String,
}

/// Registration record (`GET registration/{pk}/`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registration {
    pub clan: i64,
}

/// Clan record (`GET clan/{pk}/`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Clan {
    pub name: String,
}

/// Response of `GET markTicketPrinted/{pk}/`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AckResponse {
    pub success: bool,
}
