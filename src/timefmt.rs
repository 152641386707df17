//! Time string parsing and display formatting
//!
//! Length and audio-position strings use `[[HH:]MM:]SS`, where a bare number
//! means minutes. Durations are shown as signed `MM:SS`, wall-clock times as
//! 12-hour `H:MM:SS` with a separate am/pm marker.

use chrono::Timelike;
use thiserror::Error;

/// Errors produced when a time string is rejected
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimeParseError {
    #[error("time string is empty")]
    Empty,

    #[error("time string {0:?} may only contain digits and ':'")]
    InvalidCharacters(String),

    #[error("time string {0:?} has an empty field")]
    EmptyField(String),

    #[error("time string {0:?} is out of range")]
    Overflow(String),
}

/// Check that `s` looks like a time string (`^[0-9:]+$`)
pub fn is_time_string(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_digit() || c == ':')
}

/// Parse a time string into whole seconds
///
/// - no colon: the value is minutes (`"90"` is 5400)
/// - one colon: `MM:SS`
/// - two or more colons: the first three fields as `HH:MM:SS`, the rest ignored
///
/// The accepted set is narrower than [`is_time_string`]: a string with an
/// empty field among the ones used (`"1:"`, `":30"`, `"::"`) is rejected
/// with [`TimeParseError::EmptyField`], and values past `u64` with
/// [`TimeParseError::Overflow`].
pub fn parse_time(s: &str) -> Result<u64, TimeParseError> {
    if s.is_empty() {
        return Err(TimeParseError::Empty);
    }
    if !is_time_string(s) {
        return Err(TimeParseError::InvalidCharacters(s.to_string()));
    }

    let fields: Vec<&str> = s.split(':').collect();
    let used = fields.len().min(3);
    let multipliers: &[u64] = match used {
        1 => &[60],
        2 => &[60, 1],
        _ => &[3600, 60, 1],
    };

    let mut total: u64 = 0;
    for (field, multiplier) in fields[..used].iter().zip(multipliers) {
        if field.is_empty() {
            return Err(TimeParseError::EmptyField(s.to_string()));
        }
        let value: u64 = field
            .parse()
            .map_err(|_| TimeParseError::Overflow(s.to_string()))?;
        total = value
            .checked_mul(*multiplier)
            .and_then(|v| total.checked_add(v))
            .ok_or_else(|| TimeParseError::Overflow(s.to_string()))?;
    }

    Ok(total)
}

/// Format a signed number of seconds as `MM:SS`
///
/// Negative values get a leading `-`. Minutes grow past two digits as needed.
/// Non-finite input renders as the float's own text (`inf`, `NaN`).
pub fn seconds_format(s: f64) -> String {
    if !s.is_finite() {
        return s.to_string();
    }

    let sign = if s >= 0.0 { "" } else { "-" };
    let total = s.floor().abs() as u64;
    let mins = total / 60;
    let secs = total % 60;

    format!("{}{:02}:{:02}", sign, mins, secs)
}

/// Format a wall-clock time as 12-hour `H:MM:SS` (hour not padded)
pub fn clock_format<T: Timelike>(time: &T) -> String {
    let hour = match time.hour() {
        0 => 12,
        h if h > 12 => h - 12,
        h => h,
    };
    format!("{}:{:02}:{:02}", hour, time.minute(), time.second())
}

/// `"am"` or `"pm"` for the given wall-clock time
pub fn am_pm<T: Timelike>(time: &T) -> &'static str {
    if time.hour() >= 12 {
        "pm"
    } else {
        "am"
    }
}
