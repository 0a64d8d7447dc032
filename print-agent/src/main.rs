use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use print_agent::config::{AgentConfig, DEFAULT_CONFIG_PATH};
use print_agent::logger::init_logger_with_file;
use tokio_util::sync::CancellationToken;

/// Prints qcos tickets on a Brother QL label printer
#[derive(Debug, Parser)]
#[command(name = "qcos-printer", version, about)]
struct Cli {
    /// Configuration file
    #[arg(short, long, env = "QCOS_PRINTER_CONFIG", default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let config = AgentConfig::load(&cli.config)
        .with_context(|| format!("Failed to load {}", cli.config.display()))?;

    init_logger_with_file(&config.log_level, config.log_json, config.log_dir.as_deref())?;

    tracing::info!(
        config = %cli.config.display(),
        api_url = %config.api_url,
        "qcos print agent starting"
    );

    let agent = print_agent::build(&config).await.inspect_err(|e| {
        tracing::error!(error = ?e, "Startup failed");
    })?;

    let shutdown = CancellationToken::new();
    tokio::spawn(cancel_on_signal(shutdown.clone()));

    agent.run(shutdown).await;
    Ok(())
}

/// Cancel `shutdown` on Ctrl+C or SIGTERM
async fn cancel_on_signal(shutdown: CancellationToken) {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C signal, finishing current job...");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM signal, finishing current job...");
        },
    }

    shutdown.cancel();
}
