//! Settings and accumulated offsets for a work session

/// Pace settings for a session
///
/// `audio_ratio` converts elapsed real seconds into audio seconds, and
/// `break_ratio` converts audio seconds into earned break seconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Settings {
    /// Length of the audio file being transcribed, in seconds
    pub target_audio_seconds: f64,
    /// Audio seconds consumed per real second worked
    pub audio_ratio: f64,
    /// Break seconds earned per audio second consumed
    pub break_ratio: f64,
}

impl Settings {
    pub fn new(target_audio_seconds: f64, audio_ratio: f64, break_ratio: f64) -> Self {
        Self {
            target_audio_seconds,
            audio_ratio,
            break_ratio,
        }
    }
}

/// Credit accumulated as of the last segment boundary
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Offsets {
    /// Audio progress, in audio seconds
    pub audio_seconds: f64,
    /// Unused break time, in real seconds; negative when overspent
    pub break_seconds: f64,
}
