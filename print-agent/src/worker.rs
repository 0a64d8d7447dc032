//! Print job loop
//!
//! Polls the ticket source and drives each ticket through
//! `Polling → Resolving → Rendering → Printing → Acknowledging`, one at a time.
//! A ticket is acknowledged only after its raster job was written in full;
//! any earlier failure leaves it queued on the service for the next poll.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use image::ImageFormat;
use label_printer::{Printer, Typeface};
use shared::Ticket;
use ticket_client::TicketSource;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::AgentConfig;
use crate::error::JobError;
use crate::label::{LabelComposer, RenderedLabel};
use crate::logger::JOBS_TARGET;
use crate::sink::PrinterSink;

/// Where a cycle currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Idle,
    Polling,
    Resolving,
    Rendering,
    Printing,
    Acknowledging,
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            JobState::Idle => "idle",
            JobState::Polling => "polling",
            JobState::Resolving => "resolving",
            JobState::Rendering => "rendering",
            JobState::Printing => "printing",
            JobState::Acknowledging => "acknowledging",
        };
        f.write_str(name)
    }
}

/// Result of one completed cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Nothing was queued
    Idle,
    /// Printed and acknowledged
    Printed { pk: i64 },
    /// Printed, but the service never accepted the acknowledgment.
    /// The ticket will be offered (and printed) again.
    PrintedUnacknowledged { pk: i64, reason: String },
    /// Shutdown was requested before the ticket reached the printer
    Cancelled { pk: i64 },
}

/// How hard to try acknowledging a printed ticket
///
/// Retries only repeat the acknowledgment, never the print.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AckPolicy {
    pub retries: u32,
    pub retry_delay: Duration,
}

impl Default for AckPolicy {
    fn default() -> Self {
        Self {
            retries: 0,
            retry_delay: Duration::from_millis(500),
        }
    }
}

/// Fixed parameters of the loop
#[derive(Debug, Clone)]
pub struct LoopSettings {
    pub width: u32,
    pub height: u32,
    pub poll_interval: Duration,
    pub ack: AckPolicy,
    /// PNG copy of every rendered label
    pub snapshot: Option<PathBuf>,
}

impl LoopSettings {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            poll_interval: Duration::from_secs(2),
            ack: AckPolicy::default(),
            snapshot: None,
        }
    }

    pub fn from_config(config: &AgentConfig) -> Self {
        Self {
            width: config.ticket_width,
            height: config.ticket_height,
            poll_interval: config.poll_interval(),
            ack: AckPolicy {
                retries: config.ack_retries,
                retry_delay: config.ack_retry_delay(),
            },
            snapshot: config.temp_file.clone(),
        }
    }
}

/// Sequential poll → print → acknowledge loop
pub struct JobLoop<S, F, P> {
    source: S,
    composer: LabelComposer<F>,
    sink: PrinterSink<P>,
    settings: LoopSettings,
}

impl<S, F, P> JobLoop<S, F, P>
where
    S: TicketSource,
    F: Typeface,
    P: Printer,
{
    pub fn new(
        source: S,
        composer: LabelComposer<F>,
        sink: PrinterSink<P>,
        settings: LoopSettings,
    ) -> Self {
        Self {
            source,
            composer,
            sink,
            settings,
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn sink(&self) -> &PrinterSink<P> {
        &self.sink
    }

    /// Run until `shutdown` is cancelled
    ///
    /// Per-ticket failures are logged and the loop carries on with the next
    /// poll. Cancellation is honoured while idle and between steps; a job
    /// that has started printing is always finished and acknowledged.
    pub async fn run(&self, shutdown: CancellationToken) {
        info!(
            poll_interval = ?self.settings.poll_interval,
            width = self.settings.width,
            height = self.settings.height,
            "Job loop started"
        );

        while !shutdown.is_cancelled() {
            if let Ok(CycleOutcome::Cancelled { .. }) = self.run_once(&shutdown).await {
                break;
            }

            debug!(state = %JobState::Idle, "Waiting for next poll");
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = tokio::time::sleep(self.settings.poll_interval) => {}
            }
        }

        info!("Job loop stopped");
    }

    /// One poll cycle
    ///
    /// Errors have already been logged when they are returned. `shutdown` is
    /// checked once more right before printing.
    pub async fn run_once(&self, shutdown: &CancellationToken) -> Result<CycleOutcome, JobError> {
        let ticket = match self.source.next_printable().await {
            Ok(Some(ticket)) => ticket,
            Ok(None) => {
                debug!(state = %JobState::Polling, "No ticket awaiting print");
                return Ok(CycleOutcome::Idle);
            }
            Err(e) => return Err(self.abandon(JobState::Polling, None, e.into())),
        };
        info!(state = %JobState::Polling, pk = ticket.pk, guid = %ticket.guid, "Ticket received");

        let spec = self
            .source
            .resolve(&ticket)
            .await
            .map_err(|e| self.abandon(JobState::Resolving, Some(&ticket), e.into()))?;
        debug!(
            state = %JobState::Resolving,
            pk = ticket.pk,
            camp = %spec.camp_name,
            clan = %spec.clan_name,
            fee = %spec.fee_name,
            "Ticket resolved"
        );

        let label = self
            .composer
            .compose(&spec, self.settings.width, self.settings.height)
            .map_err(|e| self.abandon(JobState::Rendering, Some(&ticket), e.into()))?;
        self.save_snapshot(&label);

        let job = self
            .sink
            .render_job(&label)
            .map_err(|e| self.abandon(JobState::Rendering, Some(&ticket), JobError::Raster(e)))?;

        if shutdown.is_cancelled() {
            info!(state = %JobState::Printing, pk = ticket.pk, "Shutdown requested, ticket left queued");
            return Ok(CycleOutcome::Cancelled { pk: ticket.pk });
        }

        self.sink
            .write(job)
            .await
            .map_err(|e| self.abandon(JobState::Printing, Some(&ticket), e.into()))?;

        Ok(self.acknowledge(&ticket).await)
    }

    async fn acknowledge(&self, ticket: &Ticket) -> CycleOutcome {
        let policy = self.settings.ack;
        let mut attempt = 0;

        loop {
            let reason = match self.source.acknowledge(ticket).await {
                Ok(true) => {
                    info!(target: JOBS_TARGET, pk = ticket.pk, guid = %ticket.guid, "Ticket printed");
                    return CycleOutcome::Printed { pk: ticket.pk };
                }
                Ok(false) => "service refused the acknowledgment".to_string(),
                Err(e) => e.to_string(),
            };

            if attempt >= policy.retries {
                error!(
                    target: JOBS_TARGET,
                    pk = ticket.pk,
                    guid = %ticket.guid,
                    attempts = attempt + 1,
                    reason = %reason,
                    "Ticket printed but not acknowledged, it will print again"
                );
                return CycleOutcome::PrintedUnacknowledged {
                    pk: ticket.pk,
                    reason,
                };
            }

            attempt += 1;
            warn!(
                state = %JobState::Acknowledging,
                pk = ticket.pk,
                attempt,
                reason = %reason,
                "Acknowledgment failed, retrying"
            );
            tokio::time::sleep(policy.retry_delay).await;
        }
    }

    fn save_snapshot(&self, label: &RenderedLabel) {
        let Some(path) = &self.settings.snapshot else {
            return;
        };
        if let Err(e) = label.image().save_with_format(path, ImageFormat::Png) {
            warn!(path = %path.display(), error = %e, "Failed to save label snapshot");
        }
    }

    /// Log an abandoned cycle
    fn abandon(&self, state: JobState, ticket: Option<&Ticket>, err: JobError) -> JobError {
        let pk = ticket.map(|t| t.pk);
        match &err {
            JobError::Source(e) => {
                warn!(state = %state, pk, error = %e, "Ticket source unavailable, retrying next poll");
            }
            JobError::Render(e) => {
                error!(state = %state, pk, error = %e, "Label rendering failed");
            }
            JobError::Raster(e) => {
                error!(state = %state, pk, error = %e, "Label rendering failed");
            }
            JobError::Device(e) => {
                error!(state = %state, pk, error = %e, "Printing failed");
                error!(target: JOBS_TARGET, pk, state = %state, error = %e, "Print failed, ticket left queued");
            }
        }
        err
    }
}
