//! Events module for timer transitions
//!
//! Every transition the engine performs is reported as a `TimerEvent`.
//! The daemon logs them and pushes them to subscribed clients.

use serde::{Deserialize, Serialize};

/// Events emitted when the engine crosses a segment boundary
///
/// Degenerate ratios make any of these values inf or NaN; on the wire
/// those travel as strings (see `serde_f64`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TimerEvent {
    /// Work session (re)started with fresh offsets
    WorkStarted {
        /// Length of the audio being transcribed
        #[serde(with = "crate::serde_f64")]
        target_audio_secs: f64,
    },

    /// Break started; pending work credit was flushed first
    BreakStarted {
        /// Audio progress at the start of the break
        #[serde(with = "crate::serde_f64")]
        audio_secs: f64,
        /// Break balance available at the start of the break
        #[serde(with = "crate::serde_f64")]
        break_secs: f64,
    },

    /// Break ended and its real duration was debited
    BreakEnded {
        /// Real seconds spent on the break
        #[serde(with = "crate::serde_f64")]
        break_spent_secs: f64,
        /// Break balance left after the debit
        #[serde(with = "crate::serde_f64")]
        break_secs: f64,
    },

    /// Pace settings replaced after realizing progress under the old ones
    SettingsChanged {
        #[serde(with = "crate::serde_f64")]
        target_audio_secs: f64,
        #[serde(with = "crate::serde_f64")]
        audio_ratio: f64,
        #[serde(with = "crate::serde_f64")]
        break_ratio: f64,
    },

    /// Audio counter corrected by hand
    AudioPositionSet {
        /// New audio position
        #[serde(with = "crate::serde_f64")]
        audio_secs: f64,
        /// Break balance after the correction
        #[serde(with = "crate::serde_f64")]
        break_secs: f64,
    },
}

impl std::fmt::Display for TimerEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TimerEvent::WorkStarted { target_audio_secs } => {
                write!(f, "WORK_STARTED (target {:.0}s)", target_audio_secs)
            }
            TimerEvent::BreakStarted { audio_secs, break_secs } => {
                write!(
                    f,
                    "BREAK_STARTED (audio {:.1}s, break {:.1}s)",
                    audio_secs, break_secs
                )
            }
            TimerEvent::BreakEnded {
                break_spent_secs,
                break_secs,
            } => {
                write!(
                    f,
                    "BREAK_ENDED (spent {:.1}s, break {:.1}s)",
                    break_spent_secs, break_secs
                )
            }
            TimerEvent::SettingsChanged {
                audio_ratio,
                break_ratio,
                ..
            } => {
                write!(
                    f,
                    "SETTINGS_CHANGED (audio ratio {:.3}, break ratio {:.3})",
                    audio_ratio, break_ratio
                )
            }
            TimerEvent::AudioPositionSet { audio_secs, break_secs } => {
                write!(
                    f,
                    "AUDIO_POSITION_SET (audio {:.1}s, break {:.1}s)",
                    audio_secs, break_secs
                )
            }
        }
    }
}
