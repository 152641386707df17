//! Configuration loading and management

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};

/// Overrides the socket location
const SOCKET_ENV: &str = "TRANSCRIBE_TIMER_SOCKET";

/// Overrides the display tick period, in milliseconds
const TICK_ENV: &str = "TRANSCRIBE_TIMER_TICK_MS";

const DEFAULT_TICK_MS: u64 = 100;

/// Daemon and client configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Path to the Unix domain socket for IPC
    pub socket_path: PathBuf,

    /// Directory for runtime data
    pub data_dir: PathBuf,

    /// How often the driver samples the clock and re-renders
    pub tick_interval: Duration,
}

impl Config {
    /// Load configuration from environment and defaults
    pub fn load() -> Result<Self> {
        let home = std::env::var("HOME").context("HOME is not set")?;
        let data_dir = PathBuf::from(&home)
            .join(".local")
            .join("share")
            .join("transcribe-timer");

        let socket_path = match std::env::var_os(SOCKET_ENV) {
            Some(path) => PathBuf::from(path),
            None => data_dir.join("daemon.sock"),
        };

        let tick_ms = match std::env::var(TICK_ENV) {
            Ok(value) => parse_tick_ms(&value)?,
            Err(_) => DEFAULT_TICK_MS,
        };

        Ok(Self {
            socket_path,
            data_dir,
            tick_interval: Duration::from_millis(tick_ms),
        })
    }

    /// Replace the socket path when one was given on the command line
    pub fn with_socket_path(mut self, socket_path: Option<PathBuf>) -> Self {
        if let Some(path) = socket_path {
            self.socket_path = path;
        }
        self
    }
}

fn parse_tick_ms(value: &str) -> Result<u64> {
    let ms: u64 = value
        .trim()
        .parse()
        .with_context(|| format!("{TICK_ENV} must be a whole number of milliseconds"))?;
    if ms == 0 {
        bail!("{TICK_ENV} must be greater than zero");
    }
    Ok(ms)
}
