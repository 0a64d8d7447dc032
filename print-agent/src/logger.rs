//! Logging Infrastructure
//!
//! Structured logging for the agent.
//! Features:
//! - Console output, pretty or JSON
//! - Daily rotating application logs (deleted after 14 days)
//! - Permanent jobs ledger (never deleted), fed by the [`JOBS_TARGET`] target

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDate};
use tracing::Metadata;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::filter::filter_fn;
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt, prelude::*};

/// Target of print outcome events (printed, unacknowledged, device failure)
pub const JOBS_TARGET: &str = "jobs";

/// Days an application log file is kept
pub const APP_LOG_RETENTION_DAYS: i64 = 14;

const APP_PREFIX: &str = "app";
const JOBS_PREFIX: &str = "jobs";
const LOG_SUFFIX: &str = "log";

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Initialize the logging system
///
/// # Arguments
/// * `level` - Log level (e.g., "info", "debug", "warn"); `RUST_LOG` wins when set
/// * `json_format` - JSON lines instead of the human-readable format
/// * `log_dir` - Optional directory for file logging; `app/` and `jobs/` are created below it
pub fn init_logger_with_file(
    level: &str,
    json_format: bool,
    log_dir: Option<&str>,
) -> anyhow::Result<()> {
    let env_filter = with_ledger(
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)),
    )?;

    let mut layers: Vec<BoxedLayer> = vec![console_layer(json_format)];

    if let Some(dir) = log_dir {
        let log_dir = Path::new(dir);
        let app_log_dir = log_dir.join("app");
        let jobs_log_dir = log_dir.join("jobs");
        fs::create_dir_all(&app_log_dir)?;
        fs::create_dir_all(&jobs_log_dir)?;

        // Application logs: everything except the ledger, subject to cleanup
        let app_log = daily_appender(&app_log_dir, APP_PREFIX)?;
        layers.push(file_layer(app_log, json_format, |meta| {
            meta.target() != JOBS_TARGET
        }));

        // Jobs ledger: never cleaned up
        let jobs_log = daily_appender(&jobs_log_dir, JOBS_PREFIX)?;
        layers.push(file_layer(jobs_log, json_format, |meta| {
            meta.target() == JOBS_TARGET
        }));

        tokio::spawn(periodic_cleanup(log_dir.to_path_buf()));
    }

    tracing_subscriber::registry()
        .with(layers)
        .with(env_filter)
        .try_init()?;

    Ok(())
}

/// Keep [`JOBS_TARGET`] at info whatever the configured level
fn with_ledger(filter: EnvFilter) -> anyhow::Result<EnvFilter> {
    Ok(filter.add_directive(format!("{JOBS_TARGET}=info").parse()?))
}

fn console_layer(json_format: bool) -> BoxedLayer {
    if json_format {
        fmt::layer()
            .json()
            .with_target(true)
            .with_current_span(true)
            .with_file(true)
            .with_line_number(true)
            .boxed()
    } else {
        fmt::layer()
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
            .boxed()
    }
}

fn file_layer(
    appender: RollingFileAppender,
    json_format: bool,
    keep: fn(&Metadata<'_>) -> bool,
) -> BoxedLayer {
    if json_format {
        fmt::layer()
            .json()
            .with_target(true)
            .with_current_span(true)
            .with_file(true)
            .with_line_number(true)
            .with_writer(appender)
            .with_filter(filter_fn(keep))
            .boxed()
    } else {
        fmt::layer()
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
            .with_ansi(false)
            .with_writer(appender)
            .with_filter(filter_fn(keep))
            .boxed()
    }
}

/// `<prefix>.YYYY-MM-DD.log`, one file per (UTC) day
fn daily_appender(dir: &Path, prefix: &str) -> anyhow::Result<RollingFileAppender> {
    Ok(RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(prefix)
        .filename_suffix(LOG_SUFFIX)
        .build(dir)?)
}

/// Clean up application log files older than [`APP_LOG_RETENTION_DAYS`]
///
/// The jobs ledger is left alone. Returns the number of files deleted.
pub fn cleanup_old_logs(log_dir: &Path) -> anyhow::Result<usize> {
    let cutoff = Local::now() - chrono::Duration::days(APP_LOG_RETENTION_DAYS);
    cleanup_app_logs_before(log_dir, cutoff.date_naive())
}

fn cleanup_app_logs_before(log_dir: &Path, cutoff: NaiveDate) -> anyhow::Result<usize> {
    let app_log_dir = log_dir.join("app");
    if !app_log_dir.exists() {
        return Ok(0);
    }

    let mut deleted = 0;
    for entry in fs::read_dir(app_log_dir)? {
        let path = entry?.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        let Some(date) = app_log_date(name) else {
            continue;
        };

        if date < cutoff {
            fs::remove_file(&path)?;
            deleted += 1;
            tracing::info!(file = %name, "Deleted old log file");
        }
    }

    Ok(deleted)
}

/// Date of an `app.YYYY-MM-DD.log` file name
fn app_log_date(name: &str) -> Option<NaiveDate> {
    let date_part = name
        .strip_prefix(APP_PREFIX)?
        .strip_prefix('.')?
        .strip_suffix(LOG_SUFFIX)?
        .strip_suffix('.')?;
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d").ok()
}

/// Periodic cleanup task - runs every hour to clean old logs
async fn periodic_cleanup(log_dir: PathBuf) {
    use tokio::time::{Duration, sleep};

    loop {
        if let Err(e) = cleanup_old_logs(&log_dir) {
            tracing::error!(error = %e, "Failed to cleanup old logs");
        }
        sleep(Duration::from_secs(3600)).await;
    }
}
