//! IPC message protocol definitions
//!
//! All messages are JSON-encoded, prefixed with a 4-byte little-endian length.

use serde::{Deserialize, Serialize};

use crate::engine::Phase;
use crate::events::TimerEvent;
use crate::host::SettingsForm;

/// Current phase of the timer as seen by clients
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// Work not started yet
    Idle,
    /// Working, audio progress accruing
    Working,
    /// On break, break balance counting down
    OnBreak,
}

/// Requests from client to daemon
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Request {
    /// Request current timer status
    GetStatus,

    /// Ping to check connectivity
    Ping,

    /// Subscribe to timer event notifications
    Subscribe,

    /// Start or restart work with the given settings
    Start { form: SettingsForm },

    /// Re-read settings while working
    UpdateSettings { form: SettingsForm },

    /// Go on or come back from a break
    SetBreak { on_break: bool },

    /// Correct the audio counter, `[[HH:]MM:]SS`
    SetAudioTime { time: String },
}

/// Responses from daemon to client
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Response {
    /// Current timer status
    Status(TimerStatus),

    /// Pong response to ping
    Pong,

    /// Subscription confirmed; event notifications follow
    Subscribed,

    /// Input failed validation, nothing changed
    Rejected { reason: String },

    /// Error response
    Error { code: String, message: String },
}

/// Push notification from daemon to subscribed clients
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Notification {
    /// The timer crossed a segment boundary
    Event { event: TimerEvent },
}

/// Rendered timer values, ready for display
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimerDisplay {
    pub mode: Mode,

    /// Wall-clock time of the last render, `H:MM:SS`
    pub current_time: String,

    /// `am` or `pm` for `current_time`
    pub am_pm: String,

    /// Audio progress, `MM:SS`
    pub audio_time: Option<String>,

    /// Break balance, `MM:SS`, negative when overspent
    pub break_time: Option<String>,

    /// When work started, `H:MM:SS am`
    pub start_time: Option<String>,

    /// Projected finish, `H:MM:SS pm`
    pub target_time: Option<String>,

    /// Short summary line, e.g. `12:30 (audio)`
    pub title: String,
}

/// Full timer status snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimerStatus {
    /// Daemon version
    pub version: String,

    /// Uptime in seconds
    pub uptime_secs: u64,

    /// Latest rendered display
    pub display: TimerDisplay,
}

/// Convert the engine phase to the IPC mode
impl From<Phase> for Mode {
    fn from(phase: Phase) -> Self {
        match phase {
            Phase::Idle => Mode::Idle,
            Phase::Working => Mode::Working,
            Phase::OnBreak => Mode::OnBreak,
        }
    }
}
