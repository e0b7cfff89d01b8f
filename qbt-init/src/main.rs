//! Container entrypoint: prepare the environment, then supervise the daemon.

use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use proc_supervisor::{Bootstrap, Shutdown, Supervisor, sanitize_args};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_DAEMON_BIN: &str = "/usr/bin/qbittorrent-nox";

#[derive(Parser)]
#[command(name = "qbt-init")]
#[command(about = "Bootstrap the container environment and supervise the qBittorrent daemon")]
// Help and version flags stay with the daemon: `-h`/`-v`/`--help`/`--version`
// belong to its sanitized argument vector, not to the entrypoint.
#[command(disable_help_flag = true, disable_version_flag = true)]
struct Args {
    /// Path to the daemon executable.
    #[arg(long, env = "QBT_BIN", default_value = DEFAULT_DAEMON_BIN)]
    daemon_bin: String,

    /// Seconds to wait after SIGTERM before killing the process group.
    #[arg(long, env = "QBT_GRACE_PERIOD_SECS", default_value_t = 30)]
    grace_period_secs: u64,

    /// Arguments forwarded to the daemon, filtered through the allow-list.
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    daemon_args: Vec<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    init_logging();

    info!(version = env!("CARGO_PKG_VERSION"), "starting qbt-init");

    let bootstrap = Bootstrap::new();
    if let Err(err) = bootstrap.prepare() {
        error!(error = %err, "environment preparation failed");
        return ExitCode::FAILURE;
    }

    let cancel = CancellationToken::new();
    spawn_signal_watcher(cancel.clone());

    let supervisor = Supervisor::new(&args.daemon_bin)
        .args(sanitize_args(&args.daemon_args))
        .envs(bootstrap.child_env())
        .grace_period(Duration::from_secs(args.grace_period_secs));

    match supervisor.run(&cancel).await {
        Ok(Shutdown::SignalStopped(status)) => {
            info!(%status, "daemon stopped, shutting down");
            ExitCode::SUCCESS
        }
        Ok(Shutdown::ChildExited(status)) => {
            error!(%status, "daemon exited unexpectedly");
            exit_code_for(status)
        }
        Err(err) => {
            error!(error = %err, "supervision failed");
            ExitCode::FAILURE
        }
    }
}

/// Propagate the child's exit code where possible; an unexpected exit is
/// never a success, even when the child reported 0.
fn exit_code_for(status: std::process::ExitStatus) -> ExitCode {
    match status.code() {
        Some(code) if code > 0 && code <= 255 => ExitCode::from(code as u8),
        _ => ExitCode::FAILURE,
    }
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
