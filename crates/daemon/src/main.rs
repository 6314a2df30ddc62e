//! scanwatchd — host-resident container vulnerability scanning daemon.

use std::path::Path;

use sw_daemon::{DaemonConfig, ScanwatchDaemon};
use tokio::signal::unix::{signal, SignalKind};
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    if let Some(arg) = std::env::args().nth(1) {
        match arg.as_str() {
            "--version" | "-V" => {
                println!("scanwatchd {}", env!("CARGO_PKG_VERSION"));
                return Ok(());
            }
            "--help" | "-h" => {
                println!("scanwatchd {}", env!("CARGO_PKG_VERSION"));
                println!("Host-resident container vulnerability scanning daemon.");
                println!();
                println!("Configuration is read entirely from SW_* environment variables;");
                println!("see SPEC_FULL.md section 6 for the full list.");
                return Ok(());
            }
            other => {
                eprintln!("error: unexpected argument '{other}'");
                eprintln!("usage: scanwatchd [--help | --version]");
                std::process::exit(1);
            }
        }
    }

    let config = match DaemonConfig::from_env() {
        Ok(config) => config,
        Err(error) => {
            eprintln!("invalid configuration: {error}");
            std::process::exit(2);
        }
    };

    let _log_guard = setup_logging(&config.log_dir)?;

    info!("starting scanwatchd");

    let daemon = match ScanwatchDaemon::start(config).await {
        Ok(daemon) => daemon,
        Err(error) => {
            error!(%error, "failed to start scanwatchd");
            return Err(error.into());
        }
    };

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    info!("scanwatchd ready");

    tokio::select! {
        _ = sigterm.recv() => info!("received SIGTERM, shutting down"),
        _ = sigint.recv() => info!("received SIGINT, shutting down"),
    }

    daemon.shutdown().await;
    info!("scanwatchd stopped");
    Ok(())
}

/// Sets up a rotating file appender plus an `EnvFilter`-driven subscriber,
/// the way the daemon's teacher process does in its own `setup_logging`.
fn setup_logging(log_dir: &Path) -> anyhow::Result<tracing_appender::non_blocking::WorkerGuard> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    std::fs::create_dir_all(log_dir)?;
    let file_appender = tracing_appender::rolling::daily(log_dir, "scanwatchd.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry().with(filter).with(fmt::layer().with_writer(non_blocking)).init();

    Ok(guard)
}
