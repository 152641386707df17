//! Rendering engine snapshots into display strings

use chrono::{DateTime, TimeZone, Timelike, Utc};

use crate::engine::{Engine, Phase};
use crate::ipc::{Mode, TimerDisplay};
use crate::timefmt::{am_pm, clock_format, seconds_format};

/// Shown as the target time when the projection is not finite
const UNKNOWN_CLOCK: &str = "--:--:--";

const IDLE_TITLE: &str = "transcribe-timer";

/// Render the engine state at `now`, with clock strings in `zone`
pub fn render<Tz: TimeZone>(engine: &Engine, now: DateTime<Utc>, zone: &Tz) -> TimerDisplay {
    let local_now = now.with_timezone(zone);
    let phase = engine.phase();
    let snapshot = engine.snapshot(now);

    let audio_time = snapshot.map(|s| seconds_format(s.audio_seconds));
    let break_time = snapshot.map(|s| seconds_format(s.break_seconds));

    let title = match snapshot {
        Some(s) if s.phase == Phase::OnBreak => {
            format!("{} (break)", seconds_format(s.break_seconds))
        }
        Some(s) => format!("{} (audio)", seconds_format(s.audio_seconds)),
        None => IDLE_TITLE.to_string(),
    };

    let target_time = match phase {
        Phase::Idle => None,
        Phase::Working | Phase::OnBreak => Some(
            engine
                .projected_completion(now)
                .map(|t| clock_with_marker(&t.with_timezone(zone)))
                .unwrap_or_else(|| UNKNOWN_CLOCK.to_string()),
        ),
    };

    TimerDisplay {
        mode: Mode::from(phase),
        current_time: clock_format(&local_now),
        am_pm: am_pm(&local_now).to_string(),
        audio_time,
        break_time,
        start_time: engine
            .started_at()
            .map(|t| clock_with_marker(&t.with_timezone(zone))),
        target_time,
        title,
    }
}

fn clock_with_marker<T: Timelike>(time: &T) -> String {
    format!("{} {}", clock_format(time), am_pm(time))
}
