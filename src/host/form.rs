//! Settings form read from the user and its validation

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::engine::Settings;
use crate::timefmt::{parse_time, TimeParseError};

/// Input rejected before it reaches the engine
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HostError {
    #[error("invalid audio length: {0}")]
    InvalidLength(TimeParseError),

    #[error("invalid audio time: {0}")]
    InvalidAudioTime(TimeParseError),
}

/// The user's settings as entered
///
/// Ratios are given as two pairs: `audio_target` audio seconds per
/// `real_target` real seconds, and `real_break` break seconds per
/// `audio_break` audio seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettingsForm {
    /// Audio length as `[[HH:]MM:]SS`, bare numbers are minutes
    pub length: String,
    #[serde(with = "crate::serde_f64")]
    pub audio_target: f64,
    #[serde(with = "crate::serde_f64")]
    pub real_target: f64,
    #[serde(with = "crate::serde_f64")]
    pub real_break: f64,
    #[serde(with = "crate::serde_f64")]
    pub audio_break: f64,
}

impl SettingsForm {
    /// Validate the length and compute the ratios
    ///
    /// Zero denominators are passed through as infinite or NaN ratios.
    pub fn to_settings(&self) -> Result<Settings, HostError> {
        let length = parse_time(&self.length).map_err(HostError::InvalidLength)?;

        Ok(Settings::new(
            length as f64,
            self.audio_target / self.real_target,
            self.real_break / self.audio_break,
        ))
    }
}

/// Parse a manually entered audio position
pub fn parse_audio_time(time: &str) -> Result<f64, HostError> {
    parse_time(time)
        .map(|secs| secs as f64)
        .map_err(HostError::InvalidAudioTime)
}
