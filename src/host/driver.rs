//! Host driver: the single task that owns the engine
//!
//! Samples the clock on a fixed tick, applies point events from clients,
//! and publishes the rendered display after every change.

use std::time::Duration;

use chrono::{DateTime, Local, Utc};
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::engine::{Engine, Phase};
use crate::events::TimerEvent;
use crate::ipc::TimerDisplay;

use super::display::render;
use super::form::{parse_audio_time, HostError, SettingsForm};

/// A point event from the user
#[derive(Debug, Clone)]
pub enum Action {
    /// Start or restart work
    Start(SettingsForm),
    /// Settings re-read after an edit
    UpdateSettings(SettingsForm),
    /// Break checkbox toggled
    SetBreak(bool),
    /// Manual audio position, `[[HH:]MM:]SS`
    SetAudioTime(String),
}

/// An action plus the channel its outcome is sent back on
#[derive(Debug)]
pub struct Command {
    pub action: Action,
    pub reply: oneshot::Sender<Result<TimerDisplay, HostError>>,
}

/// Owns the engine and serializes every call into it
pub struct Driver {
    engine: Engine,
    tick_interval: Duration,
    display_tx: watch::Sender<TimerDisplay>,
    event_tx: broadcast::Sender<TimerEvent>,
}

impl Driver {
    /// Create a driver with an idle engine
    ///
    /// Returns the receiving side of the published display.
    pub fn new(
        tick_interval: Duration,
        event_tx: broadcast::Sender<TimerEvent>,
    ) -> (Self, watch::Receiver<TimerDisplay>) {
        let engine = Engine::new();
        let (display_tx, display_rx) = watch::channel(render(&engine, Utc::now(), &Local));

        let driver = Self {
            engine,
            tick_interval,
            display_tx,
            event_tx,
        };
        (driver, display_rx)
    }

    /// Apply a point event at `now`
    ///
    /// Invalid input is rejected without touching the engine. Events whose
    /// precondition does not hold (e.g. a break toggle while idle) are
    /// silently ignored.
    pub fn handle(
        &mut self,
        action: Action,
        now: DateTime<Utc>,
    ) -> Result<TimerDisplay, HostError> {
        let event = match action {
            Action::Start(form) => {
                let settings = form.to_settings()?;
                Some(self.engine.start(now, settings))
            }
            Action::UpdateSettings(form) => {
                if self.engine.phase() == Phase::Idle {
                    debug!("settings change ignored while idle");
                    None
                } else {
                    let settings = form.to_settings()?;
                    self.engine.apply_settings_change(now, settings)
                }
            }
            Action::SetBreak(on_break) => self.engine.set_break(now, on_break),
            Action::SetAudioTime(time) => {
                let audio_seconds = parse_audio_time(&time)?;
                self.engine.set_audio_position(now, audio_seconds)
            }
        };

        if let Some(event) = event {
            info!(%event, phase = %self.engine.phase(), "timer transition");
            if let Some(offsets) = self.engine.offsets() {
                debug!(
                    audio_secs = offsets.audio_seconds,
                    break_secs = offsets.break_seconds,
                    segment_start = ?self.engine.segment_start(),
                    "offsets settled"
                );
            }
            let _ = self.event_tx.send(event);
        }

        Ok(self.publish(now))
    }

    /// Render and publish the display for `now`
    ///
    /// Clock strings use the local zone as of `now`; accounting never does.
    pub fn tick(&self, now: DateTime<Utc>) -> TimerDisplay {
        self.publish(now)
    }

    fn publish(&self, now: DateTime<Utc>) -> TimerDisplay {
        let display = render(&self.engine, now, &Local);
        self.display_tx.send_replace(display.clone());
        display
    }

    /// Run the driver until every command sender is dropped
    pub async fn run(mut self, mut command_rx: mpsc::Receiver<Command>) {
        info!(
            tick_ms = self.tick_interval.as_millis() as u64,
            "timer driver started"
        );

        let mut interval = time::interval(self.tick_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    self.tick(Utc::now());
                }

                command = command_rx.recv() => {
                    let Some(Command { action, reply }) = command else {
                        break;
                    };
                    debug!(?action, "received action");

                    let result = self.handle(action, Utc::now());
                    if let Err(e) = &result {
                        warn!(%e, "action rejected");
                    }
                    let _ = reply.send(result);
                }
            }
        }

        info!("timer driver stopped");
    }
}
