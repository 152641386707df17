//! Command line interface: the daemon entry point and client commands

use std::io::Write;
use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing::warn;

use crate::config::Config;
use crate::host::SettingsForm;
use crate::ipc::{Client, Mode, Request, Response, Subscription, TimerDisplay};
use crate::lifecycle::ShutdownSignal;

#[derive(Debug, Parser)]
#[command(name = "transcribe-timer", version, about)]
pub struct Cli {
    /// Path to the daemon socket
    #[arg(long, global = true)]
    pub socket: Option<PathBuf>,

    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Run the timer daemon
    Serve,
    /// Check the daemon is reachable
    Ping,
    /// Print the current timer display
    Status,
    /// Start (or restart) work on an audio file
    Start {
        /// Audio length, [[HH:]MM:]SS; a bare number is minutes
        length: String,
        #[command(flatten)]
        ratios: RatioArgs,
    },
    /// Change settings while working
    Settings {
        /// Audio length, [[HH:]MM:]SS; a bare number is minutes
        length: String,
        #[command(flatten)]
        ratios: RatioArgs,
    },
    /// Go on or come back from a break
    Break {
        #[arg(value_enum)]
        state: BreakState,
    },
    /// Correct the audio counter to the player's position
    Seek {
        /// Audio position, [[HH:]MM:]SS; a bare number is minutes
        time: String,
    },
    /// Follow the timer live
    Watch,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum BreakState {
    On,
    Off,
}

/// Pace given as two ratio pairs
#[derive(Debug, Clone, Args)]
pub struct RatioArgs {
    /// Audio seconds transcribed ...
    #[arg(long, default_value_t = 1.0)]
    pub audio_target: f64,
    /// ... per this many real seconds
    #[arg(long, default_value_t = 4.0)]
    pub real_target: f64,
    /// Break seconds earned ...
    #[arg(long, default_value_t = 1.0)]
    pub real_break: f64,
    /// ... per this many audio seconds
    #[arg(long, default_value_t = 6.0)]
    pub audio_break: f64,
}

impl RatioArgs {
    fn into_form(self, length: String) -> SettingsForm {
        SettingsForm {
            length,
            audio_target: self.audio_target,
            real_target: self.real_target,
            real_break: self.real_break,
            audio_break: self.audio_break,
        }
    }
}

/// Run a client command against the daemon
pub async fn run_client(command: CliCommand, config: &Config) -> Result<()> {
    let request = match command {
        CliCommand::Serve => bail!("serve is not a client command"),
        CliCommand::Watch => return watch(config).await,
        CliCommand::Ping => Request::Ping,
        CliCommand::Status => Request::GetStatus,
        CliCommand::Start { length, ratios } => Request::Start {
            form: ratios.into_form(length),
        },
        CliCommand::Settings { length, ratios } => Request::UpdateSettings {
            form: ratios.into_form(length),
        },
        CliCommand::Break { state } => Request::SetBreak {
            on_break: state == BreakState::On,
        },
        CliCommand::Seek { time } => Request::SetAudioTime { time },
    };

    let mut client = Client::connect(&config.socket_path).await?;
    match client.request(&request).await? {
        Response::Pong => println!("pong"),
        Response::Status(status) => {
            print_display(&status.display);
            println!("daemon   v{} (up {}s)", status.version, status.uptime_secs);
        }
        Response::Rejected { reason } => bail!("rejected: {reason}"),
        Response::Error { code, message } => bail!("daemon error [{code}]: {message}"),
        Response::Subscribed => bail!("unexpected subscription response"),
    }

    Ok(())
}

/// Redraw the display line every tick and print events as they arrive
async fn watch(config: &Config) -> Result<()> {
    let mut client = Client::connect(&config.socket_path).await?;
    let subscription = Client::connect(&config.socket_path)
        .await?
        .subscribe()
        .await?;
    tokio::spawn(print_events(subscription));

    let mut shutdown = ShutdownSignal::new()?;
    let mut interval = tokio::time::interval(config.tick_interval);

    loop {
        tokio::select! {
            _ = interval.tick() => {
                match client.request(&Request::GetStatus).await? {
                    Response::Status(status) => {
                        print!("\r\x1b[2K{}", watch_line(&status.display));
                        std::io::stdout().flush()?;
                    }
                    other => warn!(?other, "unexpected status response"),
                }
            }
            _ = shutdown.wait() => {
                println!();
                return Ok(());
            }
        }
    }
}

async fn print_events(mut subscription: Subscription) {
    loop {
        match subscription.next().await {
            Ok(Some(event)) => println!("\r\x1b[2K{}", event),
            Ok(None) => break,
            Err(e) => {
                warn!(?e, "event subscription failed");
                break;
            }
        }
    }
}

fn watch_line(display: &TimerDisplay) -> String {
    let target = display.target_time.as_deref().unwrap_or("-");
    format!(
        "{} {}  {}  target {}",
        display.current_time, display.am_pm, display.title, target
    )
}

fn print_display(display: &TimerDisplay) {
    let state = match display.mode {
        Mode::Idle => "idle",
        Mode::Working => "working",
        Mode::OnBreak => "on break",
    };
    let or_dash = |value: &Option<String>| value.clone().unwrap_or_else(|| "-".to_string());

    println!("state    {}", state);
    println!("now      {} {}", display.current_time, display.am_pm);
    println!("audio    {}", or_dash(&display.audio_time));
    println!("break    {}", or_dash(&display.break_time));
    println!("started  {}", or_dash(&display.start_time));
    println!("target   {}", or_dash(&display.target_time));
}
