//! transcribe-timer: work/break timer for audio transcription
//!
//! The daemon converts elapsed working time into audio progress and break
//! credit and projects when the file will be finished. It provides:
//! - An explicit time-accounting engine driven by explicit timestamps
//! - A host driver that ticks the display and serializes user events
//! - IPC for status queries, timer actions and event notifications
//!
//! Every other subcommand is a client of the running daemon.

mod cli;
mod config;
mod engine;
mod events;
mod host;
mod ipc;
mod lifecycle;
mod serde_f64;
mod timefmt;

use anyhow::Result;
use clap::Parser;
use tokio::sync::{broadcast, mpsc};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, CliCommand};
use crate::config::Config;
use crate::events::TimerEvent;
use crate::host::Driver;
use crate::ipc::Server;
use crate::lifecycle::ShutdownSignal;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let is_daemon = matches!(cli.command, CliCommand::Serve);

    // Initialize logging; clients stay quiet unless something goes wrong
    let default_level = if is_daemon { "info" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    let config = Config::load()?.with_socket_path(cli.socket);

    if is_daemon {
        serve(config).await
    } else {
        cli::run_client(cli.command, &config).await
    }
}

async fn serve(config: Config) -> Result<()> {
    info!(
        version = env!("CARGO_PKG_VERSION"),
        "transcribe-timer daemon starting"
    );
    info!(?config.socket_path, ?config.data_dir, "configuration loaded");

    // Create shutdown signal handler
    let mut shutdown = ShutdownSignal::new()?;

    // Create channels for inter-component communication
    // IPC server -> driver (timer actions)
    let (command_tx, command_rx) = mpsc::channel(32);
    // Driver -> IPC server (events for subscribed clients)
    let (event_tx, _event_rx) = broadcast::channel::<TimerEvent>(64);

    // Create the driver that owns the engine
    let (driver, display_rx) = Driver::new(config.tick_interval, event_tx.clone());

    // Create IPC server
    let server = Server::new(&config.socket_path, command_tx, display_rx, event_tx)?;

    info!("daemon initialized, entering main loop");

    tokio::select! {
        // Run the driver (ticks and timer actions)
        _ = driver.run(command_rx) => {
            info!("timer driver exited");
        }

        // Run the IPC server (accepts client connections)
        result = server.run() => {
            if let Err(e) = result {
                error!(?e, "IPC server error");
            }
        }

        // Wait for shutdown signal
        _ = shutdown.wait() => {
            info!("shutdown signal received");
        }
    }

    // Cleanup
    info!("shutting down...");

    server.shutdown().await;

    info!("transcribe-timer daemon stopped");

    Ok(())
}
