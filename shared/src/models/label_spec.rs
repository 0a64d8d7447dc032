//! Label Spec Model

use serde::{Deserialize, Serialize};
use std::fmt;

/// Flattened display data for one ticket, ready for rendering
///
/// Built fresh per ticket from the Ticket → TicketInfo → Fee/Camp and
/// TicketInfo → Registration/Clan chain. Never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelSpec {
    pub camp_name: String,
    pub clan_name: String,
    pub fee_name: String,
    pub ticket_guid: String,
}

impl LabelSpec {
    /// Value of a text field (`None` for the code, which has no text of its own)
    pub fn text(&self, field: LabelField) -> Option<&str> {
        match field {
            LabelField::Camp => Some(&self.camp_name),
            LabelField::Clan => Some(&self.clan_name),
            LabelField::Fee => Some(&self.fee_name),
            LabelField::Guid => Some(&self.ticket_guid),
            LabelField::Code => None,
        }
    }
}

/// Drawable parts of a label, in drawing order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LabelField {
    Camp,
    Clan,
    Fee,
    Guid,
    Code,
}

impl fmt::Display for LabelField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LabelField::Camp => write!(f, "camp_name"),
            LabelField::Clan => write!(f, "clan_name"),
            LabelField::Fee => write!(f, "fee_name"),
            LabelField::Guid => write!(f, "ticket_guid"),
            LabelField::Code => write!(f, "code"),
        }
    }
}
