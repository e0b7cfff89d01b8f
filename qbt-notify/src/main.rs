//! "Release downloaded" hook: validate the event, fan it out to sinks.

use std::process::ExitCode;

use clap::Parser;
use release_notify::{NotifierService, NotifyConfig, ReleaseEvent};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "qbt-notify", version)]
#[command(about = "Dispatch a completed-download event to notification sinks")]
struct Args {
    /// Release display name.
    name: String,
    /// 40-character torrent info hash.
    info_hash: String,
    /// Download category label.
    category: String,
    /// Release size in bytes.
    size: String,
    /// Announce URL of the source indexer.
    indexer: String,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    init_logging();

    info!(version = env!("CARGO_PKG_VERSION"), "starting release notifier");

    let raw = [
        args.name,
        args.info_hash,
        args.category,
        args.size,
        args.indexer,
    ];
    let event = match ReleaseEvent::from_args(&raw) {
        Ok(event) => event,
        Err(err) => {
            error!(error = %err, "invalid release event");
            return ExitCode::FAILURE;
        }
    };

    let config = NotifyConfig::from_env();
    debug!(
        pushover_enabled = config.pushover.enabled,
        cross_seed_enabled = config.cross_seed.enabled,
        "loaded configuration"
    );

    let mut service = match NotifierService::new(config) {
        Ok(service) => service,
        Err(err) => {
            error!(error = %err, "failed to build HTTP client");
            return ExitCode::FAILURE;
        }
    };

    let cancel = CancellationToken::new();
    spawn_signal_watcher(cancel.clone());

    let delivered = service.dispatch(&event, &cancel).await;
    info!(delivered, "processing completed");

    // Sink failures are logged, not fatal: the download itself succeeded.
    ExitCode::SUCCESS
}

fn spawn_signal_watcher(cancel: CancellationToken) {
    tokio::spawn(async move {
        if let Err(err) = wait_for_shutdown_signal().await {
            error!(error = %err, "failed to install signal handlers");
        }
        cancel.cancel();
    });
}

async fn wait_for_shutdown_signal() -> std::io::Result<()> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;

    tokio::select! {
        _ = sigint.recv() => {}
        _ = sigterm.recv() => {}
    }
    Ok(())
}

fn init_logging() {
    let directive = match std::env::var("LOG_LEVEL")
        .unwrap_or_default()
        .trim()
        .to_ascii_uppercase()
        .as_str()
    {
        "DEBUG" => "debug",
        "WARN" | "WARNING" => "warn",
        "ERROR" => "error",
        _ => "info",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directive));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().json().with_target(false))
        .init();
}
