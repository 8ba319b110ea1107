//! Lanwatch Daemon - network presence scanner
//!
//! This binary runs as a background daemon, sweeping the local network for
//! hardware addresses, probing declared hosts, and deriving a household
//! occupancy signal from the configured residents' device liveness.
//!
//! # Usage
//!
//! ```bash
//! # Start the daemon (foreground)
//! lanwatchd start
//!
//! # Start the daemon (background/daemonized)
//! lanwatchd start -d
//!
//! # Start with a specific config file
//! lanwatchd start --config /etc/lanwatch/config.toml
//!
//! # Stop the daemon
//! lanwatchd stop
//!
//! # Check daemon status
//! lanwatchd status
//!
//! # Enable debug logging
//! RUST_LOG=lanwatchd=debug lanwatchd start
//! ```
//!
//! # Signal Handling
//!
//! - SIGTERM/SIGINT: graceful shutdown; sweeps in flight are abandoned

use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use lanwatch_core::{AppConfig, DeviceRoster};
use lanwatchd::prober::ReachabilityProber;
use lanwatchd::reconciler::{spawn_reconciler, ReconcilerSettings};
use lanwatchd::report::spawn_report_task;
use lanwatchd::scanner::LinkScanner;
use lanwatchd::scheduler::spawn_scheduler;

/// Lanwatch daemon - device presence and occupancy monitor
#[derive(Parser, Debug)]
#[command(name = "lanwatchd", version, about)]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the daemon
    Start {
        /// Run as a background daemon (fork to background)
        #[arg(short = 'd', long)]
        daemon: bool,

        /// Path to the TOML config file
        #[arg(short, long, default_value = "config.toml")]
        config: PathBuf,
    },
    /// Stop the running daemon
    Stop,
    /// Show daemon status
    Status,
}

fn pid_file_path() -> PathBuf {
    let state_dir = dirs::state_dir()
        .unwrap_or_else(|| PathBuf::from("/tmp"))
        .join("lanwatch");
    state_dir.join("lanwatchd.pid")
}

fn log_file_path() -> PathBuf {
    let state_dir = dirs::state_dir()
        .unwrap_or_else(|| PathBuf::from("/tmp"))
        .join("lanwatch");
    state_dir.join("lanwatchd.log")
}

fn read_pid() -> Option<u32> {
    let path = pid_file_path();
    let mut file = File::open(&path).ok()?;
    let mut contents = String::new();
    file.read_to_string(&mut contents).ok()?;
    contents.trim().parse().ok()
}

fn write_pid() -> Result<()> {
    let path = pid_file_path();
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).context("Failed to create state directory")?;
    }
    let mut file = File::create(&path).context("Failed to create PID file")?;
    write!(file, "{}", process::id()).context("Failed to write PID")?;
    Ok(())
}

fn remove_pid_file() {
    let path = pid_file_path();
    let _ = fs::remove_file(path);
}

fn is_process_running(pid: u32) -> bool {
    PathBuf::from(format!("/proc/{pid}")).exists()
}

fn is_daemon_running() -> Option<u32> {
    if let Some(pid) = read_pid() {
        if is_process_running(pid) {
            return Some(pid);
        }
        remove_pid_file();
    }
    None
}

fn stop_daemon(pid: u32) -> Result<()> {
    #[cfg(unix)]
    {
        let result = unsafe { libc::kill(pid as i32, libc::SIGTERM) };
        if result != 0 {
            bail!("Failed to send SIGTERM to process {pid}");
        }
    }
    #[cfg(not(unix))]
    {
        bail!("Stop command is only supported on Unix systems");
    }
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();

    let command = args.command.unwrap_or(Command::Start {
        daemon: false,
        config: PathBuf::from("config.toml"),
    });

    match command {
        Command::Start { daemon, config } => {
            if let Some(pid) = is_daemon_running() {
                eprintln!("Daemon is already running (PID {pid})");
                eprintln!("Use 'lanwatchd stop' to stop it first.");
                process::exit(1);
            }

            if daemon {
                daemonize()?;
            }

            write_pid()?;

            let result = run_daemon(config);

            remove_pid_file();

            result
        }
        Command::Stop => {
            if let Some(pid) = is_daemon_running() {
                println!("Stopping daemon (PID {pid})...");
                stop_daemon(pid)?;

                for _ in 0..50 {
                    if !is_process_running(pid) {
                        println!("Daemon stopped.");
                        return Ok(());
                    }
                    std::thread::sleep(std::time::Duration::from_millis(100));
                }

                eprintln!("Daemon did not stop within 5 seconds.");
                process::exit(1);
            } else {
                println!("Daemon is not running.");
                Ok(())
            }
        }
        Command::Status => {
            if let Some(pid) = is_daemon_running() {
                println!("Daemon is running (PID {pid})");
                println!("Log: {}", log_file_path().display());
                Ok(())
            } else {
                println!("Daemon is not running.");
                process::exit(1);
            }
        }
    }
}

fn daemonize() -> Result<()> {
    use daemonize::Daemonize;

    let log_path = log_file_path();

    if let Some(parent) = log_path.parent() {
        fs::create_dir_all(parent).context("Failed to create log directory")?;
    }

    let stdout = File::create(&log_path).context("Failed to create log file for stdout")?;
    let stderr = File::create(&log_path).context("Failed to create log file for stderr")?;

    let daemonize = Daemonize::new()
        .working_directory("/")
        .stdout(stdout)
        .stderr(stderr);

    daemonize.start().context("Failed to daemonize")?;

    Ok(())
}

#[tokio::main]
async fn run_daemon(config_path: PathBuf) -> Result<()> {
    let config = AppConfig::load(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;

    // The config's debug flag raises the default level; RUST_LOG still wins.
    let level = if config.debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive(format!("lanwatch={level}").parse()?)
                .add_directive(format!("lanwatchd={level}").parse()?)
                .add_directive(format!("lanwatch_core={level}").parse()?),
        )
        .init();

    info!(
        version = env!("CARGO_PKG_VERSION"),
        pid = process::id(),
        config = %config_path.display(),
        devices = config.devices.len(),
        residents = config.residents.len(),
        "Lanwatch daemon starting"
    );

    let cancel_token = CancellationToken::new();

    let shutdown_token = cancel_token.clone();
    tokio::spawn(async move {
        if let Err(e) = wait_for_shutdown_signal().await {
            error!(error = %e, "Error waiting for shutdown signal");
        }
        info!("Shutdown signal received");
        shutdown_token.cancel();
    });

    let roster = Arc::new(DeviceRoster::from_config(&config));

    let reconciler = spawn_reconciler(Arc::clone(&roster), ReconcilerSettings::from_config(&config));
    info!("Presence reconciler started");

    let report_handle = spawn_report_task(&reconciler, config.show_last_seen, cancel_token.clone());

    let scanner = LinkScanner::new(Arc::clone(&roster), config.scan_target(), config.show_unknown);
    let prober = ReachabilityProber::new(Arc::clone(&roster), reconciler.clone());

    let scheduler_handle = spawn_scheduler(
        config.update_interval,
        scanner,
        prober,
        reconciler,
        cancel_token.clone(),
    );

    // Run until the scheduler winds down on cancellation.
    scheduler_handle
        .await
        .context("Scheduler task terminated abnormally")?;
    let _ = report_handle.await;

    info!("Lanwatch daemon stopped");
    Ok(())
}

async fn wait_for_shutdown_signal() -> Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigterm = signal(SignalKind::terminate())?;
        let mut sigint = signal(SignalKind::interrupt())?;

        tokio::select! {
            _ = sigterm.recv() => {
                info!("Received SIGTERM");
            }
            _ = sigint.recv() => {
                info!("Received SIGINT");
            }
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await?;
        info!("Received Ctrl+C");
    }

    Ok(())
}
