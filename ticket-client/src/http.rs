// ticket-client/src/http.rs
// HTTP ticket source - talks to the qcos ticketing API

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use shared::models::{
    AckResponse, Camp, Clan, Fee, LabelSpec, Registration, Ticket, TicketInfo,
};
use tracing::{debug, instrument};

use crate::{ClientError, ClientResult, TicketSource};

/// Default per-request timeout
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Ticket source backed by the ticketing HTTP API
#[derive(Debug, Clone)]
pub struct HttpTicketSource {
    client: Client,
    base_url: String,
}

impl HttpTicketSource {
    pub fn new(base_url: &str) -> ClientResult<Self> {
        Self::with_timeout(base_url, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(base_url: &str, timeout: Duration) -> ClientResult<Self> {
        let base_url = base_url.trim().trim_end_matches('/');
        if base_url.is_empty() {
            return Err(ClientError::InvalidConfig("api_url is empty".into()));
        }
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.to_string(),
        })
    }

    /// 获取基础 URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn tickets_to_print(&self) -> ClientResult<Vec<Ticket>> {
        self.get("ticketstoprint/").await
    }

    pub async fn ticket_info(&self, pk: i64) -> ClientResult<TicketInfo> {
        self.get(&format!("ticketinfo/{}/", pk)).await
    }

    pub async fn fee(&self, pk: i64) -> ClientResult<Fee> {
        self.get(&format!("fee/{}/", pk)).await
    }

    pub async fn camp(&self, pk: i64) -> ClientResult<Camp> {
        self.get(&format!("camp/{}/", pk)).await
    }

    pub async fn registration(&self, pk: i64) -> ClientResult<Registration> {
        self.get(&format!("registration/{}/", pk)).await
    }

    pub async fn clan(&self, pk: i64) -> ClientResult<Clan> {
        self.get(&format!("clan/{}/", pk)).await
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> ClientResult<T> {
        let url = format!("{}/{}", self.base_url, path);
        let response = self.client.get(&url).send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            return Err(ClientError::Status {
                path: path.to_string(),
                status: status.as_u16(),
                body: text,
            });
        }

        serde_json::from_str(&text).map_err(|e| ClientError::InvalidResponse {
            path: path.to_string(),
            reason: e.to_string(),
        })
    }
}

#[async_trait]
impl TicketSource for HttpTicketSource {
    #[instrument(skip(self), fields(base_url = %self.base_url))]
    async fn next_printable(&self) -> ClientResult<Option<Ticket>> {
        let tickets = self.tickets_to_print().await?;
        debug!(queued = tickets.len(), "Fetched printable tickets");
        Ok(tickets.into_iter().next())
    }

    #[instrument(skip(self, ticket), fields(pk = ticket.pk))]
    async fn resolve(&self, ticket: &Ticket) -> ClientResult<LabelSpec> {
        let info = self.ticket_info(ticket.ticket_info).await?;
        let fee = self.fee(info.fee).await?;
        let camp = self.camp(fee.camp).await?;
        let registration = self.registration(info.registration).await?;
        let clan = self.clan(registration.clan).await?;

        debug!(camp = %camp.name, clan = %clan.name, fee = %fee.name, "Resolved ticket");

        Ok(LabelSpec {
            camp_name: camp.name,
            clan_name: clan.name,
            fee_name: fee.name,
            ticket_guid: ticket.guid.clone(),
        })
    }

    #[instrument(skip(self, ticket), fields(pk = ticket.pk))]
    async fn acknowledge(&self, ticket: &Ticket) -> ClientResult<bool> {
        let response: AckResponse = self
            .get(&format!("markTicketPrinted/{}/", ticket.pk))
            .await?;
        Ok(response.success)
    }
}
