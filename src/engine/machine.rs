//! Core time-accounting state machine
//!
//! Handles transitions between Idle, Working and OnBreak, converting elapsed
//! real time into audio progress and break credit. Every operation takes
//! the current instant explicitly; the engine never reads the clock.
//!
//! Instants are UTC so that a local clock change (DST, a zone switch) never
//! shows up as elapsed time. Conversion to local time happens at rendering.

use chrono::{DateTime, TimeDelta, Utc};
use tracing::debug;

use crate::events::TimerEvent;

use super::settings::{Offsets, Settings};

/// The three phases of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Work has not been started
    Idle,
    /// Working: audio progress and break credit accrue
    Working,
    /// On break: accrual is frozen, the break balance counts down
    OnBreak,
}

impl Default for Phase {
    fn default() -> Self {
        Self::Idle
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Phase::Idle => write!(f, "Idle"),
            Phase::Working => write!(f, "Working"),
            Phase::OnBreak => write!(f, "OnBreak"),
        }
    }
}

/// Derived values for a single instant
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Snapshot {
    pub phase: Phase,
    /// Current audio progress, in audio seconds
    pub audio_seconds: f64,
    /// Current break balance, in real seconds
    pub break_seconds: f64,
}

/// State that only exists once work has started
#[derive(Debug, Clone, PartialEq)]
struct Session {
    settings: Settings,
    offsets: Offsets,
    /// When `start` was called
    started_at: DateTime<Utc>,
    /// Start of the current uninterrupted work or break segment
    segment_start: DateTime<Utc>,
    on_break: bool,
}

impl Session {
    fn elapsed_secs(&self, now: DateTime<Utc>) -> f64 {
        elapsed_secs(self.segment_start, now)
    }

    /// Audio seconds earned in the open work segment, not yet committed
    fn pending_work(&self, now: DateTime<Utc>) -> f64 {
        self.elapsed_secs(now) * self.settings.audio_ratio
    }

    fn accrue(&mut self, now: DateTime<Utc>) {
        if self.on_break {
            return;
        }
        let work_done = self.pending_work(now);
        self.offsets.audio_seconds += work_done;
        self.offsets.break_seconds += work_done * self.settings.break_ratio;
        self.segment_start = now;
    }
}

/// The time accounting engine
///
/// A single explicit state record; the host owns it and serializes all
/// calls into it. Transitions return the event they performed, or `None`
/// when their precondition does not hold, in which case nothing changes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Engine {
    session: Option<Session>,
}

impl Engine {
    /// Create an idle engine
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the current phase
    pub fn phase(&self) -> Phase {
        match &self.session {
            None => Phase::Idle,
            Some(s) if s.on_break => Phase::OnBreak,
            Some(_) => Phase::Working,
        }
    }

    pub fn settings(&self) -> Option<&Settings> {
        self.session.as_ref().map(|s| &s.settings)
    }

    pub fn offsets(&self) -> Option<&Offsets> {
        self.session.as_ref().map(|s| &s.offsets)
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.session.as_ref().map(|s| s.started_at)
    }

    pub fn segment_start(&self) -> Option<DateTime<Utc>> {
        self.session.as_ref().map(|s| s.segment_start)
    }

    /// Start (or restart) work with fresh offsets
    ///
    /// Nothing from a previous session carries over.
    pub fn start(&mut self, now: DateTime<Utc>, settings: Settings) -> TimerEvent {
        if self.session.is_some() {
            debug!("restarting session, previous offsets discarded");
        }

        self.session = Some(Session {
            settings,
            offsets: Offsets::default(),
            started_at: now,
            segment_start: now,
            on_break: false,
        });

        TimerEvent::WorkStarted {
            target_audio_secs: settings.target_audio_seconds,
        }
    }

    /// Commit the open work segment into the offsets
    ///
    /// No-op while idle or on break.
    pub fn accrue(&mut self, now: DateTime<Utc>) {
        if let Some(session) = self.session.as_mut() {
            session.accrue(now);
        }
    }

    /// Flush pending work credit and go on break
    pub fn enter_break(&mut self, now: DateTime<Utc>) -> Option<TimerEvent> {
        if self.phase() != Phase::Working {
            debug!(phase = %self.phase(), "not working, break ignored");
            return None;
        }

        self.accrue(now);
        let session = self.session.as_mut()?;
        session.on_break = true;

        Some(TimerEvent::BreakStarted {
            audio_secs: session.offsets.audio_seconds,
            break_secs: session.offsets.break_seconds,
        })
    }

    /// Debit the real break duration and resume work
    ///
    /// The debit is 1:1 in real seconds and may drive the balance negative.
    pub fn exit_break(&mut self, now: DateTime<Utc>) -> Option<TimerEvent> {
        let session = self.session.as_mut()?;
        if !session.on_break {
            debug!("not on break");
            return None;
        }

        let break_spent = session.elapsed_secs(now);
        session.offsets.break_seconds -= break_spent;
        session.segment_start = now;
        session.on_break = false;

        Some(TimerEvent::BreakEnded {
            break_spent_secs: break_spent,
            break_secs: session.offsets.break_seconds,
        })
    }

    /// Enter or leave a break depending on `on_break`
    pub fn set_break(&mut self, now: DateTime<Utc>, on_break: bool) -> Option<TimerEvent> {
        if on_break {
            self.enter_break(now)
        } else {
            self.exit_break(now)
        }
    }

    /// Replace the settings after realizing progress under the old ones
    pub fn apply_settings_change(
        &mut self,
        now: DateTime<Utc>,
        settings: Settings,
    ) -> Option<TimerEvent> {
        if self.phase() == Phase::Idle {
            return None;
        }

        self.accrue(now);
        let session = self.session.as_mut()?;
        session.settings = settings;

        Some(TimerEvent::SettingsChanged {
            target_audio_secs: settings.target_audio_seconds,
            audio_ratio: settings.audio_ratio,
            break_ratio: settings.break_ratio,
        })
    }

    /// Correct the audio counter to the player's actual position
    ///
    /// Break credit moves by the jump from the last committed audio offset.
    /// Work done since the last boundary is dropped, not committed.
    pub fn set_audio_position(
        &mut self,
        now: DateTime<Utc>,
        audio_seconds: f64,
    ) -> Option<TimerEvent> {
        let session = self.session.as_mut()?;

        let discarded = session.pending_work(now);
        let jump = audio_seconds - session.offsets.audio_seconds;
        session.offsets.break_seconds += jump * session.settings.break_ratio;
        session.offsets.audio_seconds = audio_seconds;
        session.segment_start = now;

        debug!(
            jump_secs = jump,
            discarded_audio_secs = discarded,
            "audio position corrected"
        );

        Some(TimerEvent::AudioPositionSet {
            audio_secs: session.offsets.audio_seconds,
            break_secs: session.offsets.break_seconds,
        })
    }

    /// Current audio progress and break balance, including the open segment
    pub fn snapshot(&self, now: DateTime<Utc>) -> Option<Snapshot> {
        let session = self.session.as_ref()?;

        let snapshot = if session.on_break {
            Snapshot {
                phase: Phase::OnBreak,
                audio_seconds: session.offsets.audio_seconds,
                break_seconds: session.offsets.break_seconds - session.elapsed_secs(now),
            }
        } else {
            let work_done = session.pending_work(now);
            Snapshot {
                phase: Phase::Working,
                audio_seconds: session.offsets.audio_seconds + work_done,
                break_seconds: session.offsets.break_seconds
                    + work_done * session.settings.break_ratio,
            }
        };

        Some(snapshot)
    }

    /// Real seconds from `now` until the audio and all earned break are used up
    pub fn remaining_seconds(&self, now: DateTime<Utc>) -> Option<f64> {
        let settings = self.settings()?;
        let snapshot = self.snapshot(now)?;

        let remaining_audio = settings.target_audio_seconds - snapshot.audio_seconds;
        let work_time = remaining_audio / settings.audio_ratio;
        let break_time = remaining_audio * settings.break_ratio + snapshot.break_seconds;

        Some(work_time + break_time)
    }

    /// Projected wall-clock time the session finishes
    ///
    /// Constant within a segment. `None` while idle, or when the projection
    /// is not finite or falls outside the representable range.
    pub fn projected_completion(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let remaining = self.remaining_seconds(now)?;
        if !remaining.is_finite() {
            return None;
        }

        let delta = TimeDelta::try_milliseconds((remaining * 1000.0).round() as i64)?;
        now.checked_add_signed(delta)
    }
}

/// Real seconds from `from` to `to`, with millisecond resolution
fn elapsed_secs(from: DateTime<Utc>, to: DateTime<Utc>) -> f64 {
    to.signed_duration_since(from).num_milliseconds() as f64 / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 14, 9, 0, 0).unwrap()
    }

    fn at(secs: i64) -> DateTime<Utc> {
        t0() + TimeDelta::seconds(secs)
    }

    /// One hour of audio, 1 audio second per 4 real, 1 break second per 2 audio
    fn settings() -> Settings {
        Settings::new(3600.0, 0.25, 0.5)
    }

    fn started() -> Engine {
        let mut engine = Engine::new();
        engine.start(t0(), settings());
        engine
    }

    #[test]
    fn test_initial_phase() {
        let engine = Engine::new();
        assert_eq!(engine.phase(), Phase::Idle);
        assert!(engine.snapshot(t0()).is_none());
        assert!(engine.projected_completion(t0()).is_none());
    }

    #[test]
    fn test_start_resets_offsets() {
        let engine = started();
        assert_eq!(engine.phase(), Phase::Working);
        assert_eq!(engine.offsets(), Some(&Offsets::default()));
        assert_eq!(engine.segment_start(), Some(t0()));
        assert_eq!(engine.started_at(), Some(t0()));
    }

    #[test]
    fn test_restart_discards_previous_session() {
        let mut engine = started();
        engine.accrue(at(400));
        engine.enter_break(at(400));

        let event = engine.start(at(1000), settings());
        assert_eq!(
            event,
            TimerEvent::WorkStarted {
                target_audio_secs: 3600.0
            }
        );
        assert_eq!(engine.phase(), Phase::Working);
        assert_eq!(engine.offsets(), Some(&Offsets::default()));
        assert_eq!(engine.started_at(), Some(at(1000)));
    }

    #[test]
    fn test_break_at_start_instant_earns_nothing() {
        let mut engine = started();
        let event = engine.enter_break(t0());

        assert_eq!(
            event,
            Some(TimerEvent::BreakStarted {
                audio_secs: 0.0,
                break_secs: 0.0
            })
        );
        assert_eq!(engine.phase(), Phase::OnBreak);
        assert_eq!(engine.offsets().unwrap().audio_seconds, 0.0);
        assert_eq!(engine.offsets().unwrap().break_seconds, 0.0);
    }

    #[test]
    fn test_accrue_is_additive_across_a_split() {
        let mut split = started();
        split.accrue(at(40));
        split.accrue(at(100));

        let mut single = started();
        single.accrue(at(100));

        assert_eq!(split.offsets(), single.offsets());
        assert_eq!(single.offsets().unwrap().audio_seconds, 25.0);
        assert_eq!(single.offsets().unwrap().break_seconds, 12.5);
        assert_eq!(split.segment_start(), Some(at(100)));
    }

    #[test]
    fn test_accrue_is_frozen_on_break() {
        let mut engine = started();
        engine.enter_break(at(400));
        engine.accrue(at(900));

        assert_eq!(engine.offsets().unwrap().audio_seconds, 100.0);
        assert_eq!(engine.segment_start(), Some(at(400)));
    }

    #[test]
    fn test_exit_break_debits_real_seconds() {
        let mut engine = started();
        engine.enter_break(at(400));
        assert_eq!(engine.offsets().unwrap().break_seconds, 50.0);

        let event = engine.exit_break(at(430));
        assert_eq!(
            event,
            Some(TimerEvent::BreakEnded {
                break_spent_secs: 30.0,
                break_secs: 20.0
            })
        );
        assert_eq!(engine.phase(), Phase::Working);
        assert_eq!(engine.segment_start(), Some(at(430)));
        // break time never advances audio
        assert_eq!(engine.offsets().unwrap().audio_seconds, 100.0);
    }

    #[test]
    fn test_exit_break_debit_ignores_ratios() {
        for (audio_ratio, break_ratio) in [(0.25, 0.5), (2.0, 0.0), (1.0, 10.0)] {
            let mut engine = Engine::new();
            engine.start(t0(), Settings::new(3600.0, audio_ratio, break_ratio));
            engine.enter_break(at(100));
            let before = engine.offsets().unwrap().break_seconds;
            engine.exit_break(at(145));
            let after = engine.offsets().unwrap().break_seconds;
            assert_eq!(before - after, 45.0);
        }
    }

    #[test]
    fn test_overspent_break_goes_negative() {
        let mut engine = started();
        engine.enter_break(at(400));

        let snapshot = engine.snapshot(at(480)).unwrap();
        assert_eq!(snapshot.phase, Phase::OnBreak);
        assert_eq!(snapshot.break_seconds, -30.0);
        assert_eq!(snapshot.audio_seconds, 100.0);

        engine.exit_break(at(480));
        assert_eq!(engine.offsets().unwrap().break_seconds, -30.0);
    }

    #[test]
    fn test_settings_change_keeps_earned_audio() {
        let mut engine = started();
        let event = engine.apply_settings_change(at(400), Settings::new(3600.0, 1.0, 0.5));

        assert!(matches!(event, Some(TimerEvent::SettingsChanged { .. })));
        assert_eq!(engine.offsets().unwrap().audio_seconds, 100.0);
        assert_eq!(engine.offsets().unwrap().break_seconds, 50.0);
        assert_eq!(engine.segment_start(), Some(at(400)));

        // new ratio applies only from here on
        let snapshot = engine.snapshot(at(500)).unwrap();
        assert_eq!(snapshot.audio_seconds, 200.0);
    }

    #[test]
    fn test_settings_change_on_break_stays_on_break() {
        let mut engine = started();
        engine.enter_break(at(400));
        engine.apply_settings_change(at(420), Settings::new(7200.0, 1.0, 1.0));

        assert_eq!(engine.phase(), Phase::OnBreak);
        assert_eq!(engine.segment_start(), Some(at(400)));
        assert_eq!(engine.settings().unwrap().target_audio_seconds, 7200.0);
    }

    #[test]
    fn test_set_audio_position_moves_break_by_jump() {
        let mut engine = started();
        engine.accrue(at(400));

        let event = engine.set_audio_position(at(400), 300.0);
        assert_eq!(
            event,
            Some(TimerEvent::AudioPositionSet {
                audio_secs: 300.0,
                break_secs: 150.0
            })
        );
        assert_eq!(engine.segment_start(), Some(at(400)));
    }

    #[test]
    fn test_set_audio_position_drops_pending_work() {
        // Known quirk: the 100 audio seconds worked since start are never
        // committed, so the break credit for them is lost with the jump.
        let mut engine = started();
        engine.set_audio_position(at(400), 300.0);

        let offsets = engine.offsets().unwrap();
        assert_eq!(offsets.audio_seconds, 300.0);
        assert_eq!(offsets.break_seconds, 150.0);

        let snapshot = engine.snapshot(at(400)).unwrap();
        assert_eq!(snapshot.audio_seconds, 300.0);
        assert_eq!(snapshot.break_seconds, 150.0);
    }

    #[test]
    fn test_set_audio_position_on_break_restarts_break_segment() {
        // Known quirk: the seek leaves the phase alone but moves the segment
        // start, so the 60 break seconds taken before it are never debited.
        let mut engine = Engine::new();
        engine.start(t0(), Settings::new(3600.0, 1.0, 0.5));
        engine.enter_break(at(100));
        assert_eq!(engine.offsets().unwrap().break_seconds, 50.0);

        engine.set_audio_position(at(160), 100.0);
        assert_eq!(engine.phase(), Phase::OnBreak);
        assert_eq!(engine.segment_start(), Some(at(160)));

        let event = engine.exit_break(at(170));
        assert_eq!(
            event,
            Some(TimerEvent::BreakEnded {
                break_spent_secs: 10.0,
                break_secs: 40.0
            })
        );
    }

    #[test]
    fn test_set_audio_position_backwards_reduces_break() {
        let mut engine = started();
        engine.accrue(at(400));
        engine.set_audio_position(at(400), 40.0);

        assert_eq!(engine.offsets().unwrap().break_seconds, 20.0);
    }

    #[test]
    fn test_working_snapshot_includes_open_segment() {
        let mut engine = started();
        engine.accrue(at(400));

        let snapshot = engine.snapshot(at(800)).unwrap();
        assert_eq!(snapshot.phase, Phase::Working);
        assert_eq!(snapshot.audio_seconds, 200.0);
        assert_eq!(snapshot.break_seconds, 100.0);
    }

    #[test]
    fn test_enter_break_twice_is_ignored() {
        let mut engine = started();
        engine.enter_break(at(400));
        let before = engine.clone();

        assert_eq!(engine.enter_break(at(500)), None);
        assert_eq!(engine, before);
    }

    #[test]
    fn test_exit_break_while_working_is_ignored() {
        let mut engine = started();
        let before = engine.clone();

        assert_eq!(engine.exit_break(at(100)), None);
        assert_eq!(engine, before);
    }

    #[test]
    fn test_set_break_dispatches() {
        let mut engine = started();
        assert!(matches!(
            engine.set_break(at(10), true),
            Some(TimerEvent::BreakStarted { .. })
        ));
        assert!(matches!(
            engine.set_break(at(20), false),
            Some(TimerEvent::BreakEnded { .. })
        ));
        assert_eq!(engine.phase(), Phase::Working);
    }

    #[test]
    fn test_idle_ignores_every_transition() {
        let mut engine = Engine::new();

        engine.accrue(at(10));
        assert_eq!(engine.enter_break(at(20)), None);
        assert_eq!(engine.exit_break(at(30)), None);
        assert_eq!(engine.set_break(at(35), true), None);
        assert_eq!(engine.apply_settings_change(at(40), settings()), None);
        assert_eq!(engine.set_audio_position(at(50), 120.0), None);

        assert_eq!(engine, Engine::new());
        assert_eq!(engine.phase(), Phase::Idle);
    }

    #[test]
    fn test_local_clock_change_is_not_elapsed_time() {
        // 01:59 EDT, then 01:01 EST two real minutes later
        let edt = FixedOffset::west_opt(4 * 3600).unwrap();
        let est = FixedOffset::west_opt(5 * 3600).unwrap();
        let before = edt.with_ymd_and_hms(2024, 11, 3, 1, 59, 0).unwrap();
        let after = est.with_ymd_and_hms(2024, 11, 3, 1, 1, 0).unwrap();

        let mut engine = Engine::new();
        engine.start(before.with_timezone(&Utc), Settings::new(3600.0, 1.0, 0.5));

        let snapshot = engine.snapshot(after.with_timezone(&Utc)).unwrap();
        assert_eq!(snapshot.audio_seconds, 120.0);
        assert_eq!(snapshot.break_seconds, 60.0);

        engine.enter_break(after.with_timezone(&Utc));
        let event = engine.exit_break((after + TimeDelta::seconds(30)).with_timezone(&Utc));
        assert_eq!(
            event,
            Some(TimerEvent::BreakEnded {
                break_spent_secs: 30.0,
                break_secs: 30.0
            })
        );
    }

    #[test]
    fn test_projection_at_start() {
        let engine = started();
        // 3600 / 0.25 work + 3600 * 0.5 break
        assert_eq!(engine.remaining_seconds(t0()), Some(16200.0));
        assert_eq!(engine.projected_completion(t0()), Some(at(16200)));
    }

    #[test]
    fn test_projection_is_constant_within_segments() {
        let mut engine = started();
        let expected = Some(at(16200));

        assert_eq!(engine.projected_completion(at(400)), expected);
        engine.enter_break(at(400));
        assert_eq!(engine.projected_completion(at(400)), expected);
        assert_eq!(engine.projected_completion(at(430)), expected);
        engine.exit_break(at(430));
        assert_eq!(engine.projected_completion(at(430)), expected);
        assert_eq!(engine.projected_completion(at(1000)), expected);
    }

    #[test]
    fn test_projection_moves_with_audio_correction() {
        let mut engine = started();
        engine.accrue(at(400));
        // jump 100s of audio ahead of the counter
        engine.set_audio_position(at(400), 200.0);

        // remaining 3400 audio: 13600 work + 1700 break + 100 banked
        assert_eq!(engine.remaining_seconds(at(400)), Some(15400.0));
        assert_eq!(engine.projected_completion(at(400)), Some(at(15800)));
    }

    #[test]
    fn test_degenerate_ratios_do_not_panic() {
        let mut engine = Engine::new();
        // zero real-target denominator
        engine.start(t0(), Settings::new(3600.0, f64::INFINITY, 0.5));
        assert!(engine.snapshot(at(10)).unwrap().audio_seconds.is_infinite());
        assert!(engine.projected_completion(at(10)).is_none());

        // zero audio-target numerator
        engine.start(t0(), Settings::new(3600.0, 0.0, 0.5));
        assert_eq!(engine.snapshot(at(10)).unwrap().audio_seconds, 0.0);
        assert_eq!(engine.remaining_seconds(at(10)), Some(f64::INFINITY));
        assert!(engine.projected_completion(at(10)).is_none());
    }
}
