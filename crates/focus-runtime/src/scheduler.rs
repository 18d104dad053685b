//! Timer management for the coordinator.
//!
//! Every timer is a small tokio task that sleeps and then sends its
//! [`TimerKind`] into an unbounded channel owned by the coordinator's event
//! loop, so timer fires are handled one at a time alongside commands and
//! resource events. Timers live only in memory: nothing here survives a
//! restart, which is why periodic timers are re-armed on every start-up.

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use focus_core::config::Timings;
use focus_core::time_utils::to_std_duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};

// ── TimerKind ─────────────────────────────────────────────────────────────────

/// Identifies a timer and is the payload delivered when it fires.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TimerKind {
    /// Periodic: look at the focused resource for a meeting platform.
    ContextCheck,
    /// Periodic: look for scheduled meetings starting soon.
    CalendarSync,
    /// Periodic: purge stale actions and meetings.
    Cleanup,
    /// One-shot: the focus-mode duration has elapsed.
    MeetingEnd,
    /// One-shot: a scheduled meeting is about to start.
    MeetingReminder(String),
}

impl TimerKind {
    pub fn is_periodic(&self) -> bool {
        matches!(self, Self::ContextCheck | Self::CalendarSync | Self::Cleanup)
    }
}

// ── Scheduler ─────────────────────────────────────────────────────────────────

/// Owns the running timer tasks, keyed by [`TimerKind`].
pub struct Scheduler {
    tx: mpsc::UnboundedSender<TimerKind>,
    timers: HashMap<TimerKind, JoinHandle<()>>,
}

impl Scheduler {
    /// Create a scheduler together with the receiver its timers fire into.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<TimerKind>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                tx,
                timers: HashMap::new(),
            },
            rx,
        )
    }

    /// Clear any previously armed periodic timers and arm all three afresh.
    pub fn start_periodic(&mut self, timings: &Timings) {
        for kind in [TimerKind::ContextCheck, TimerKind::CalendarSync, TimerKind::Cleanup] {
            self.cancel(&kind);
        }
        self.arm_every(TimerKind::ContextCheck, to_std_duration(timings.context_check_every));
        self.arm_every(TimerKind::CalendarSync, to_std_duration(timings.calendar_sync_every));
        self.arm_every(TimerKind::Cleanup, to_std_duration(timings.cleanup_every));
        tracing::debug!("periodic timers armed");
    }

    /// Arm a repeating timer. The first fire happens one `period` from now.
    pub fn arm_every(&mut self, kind: TimerKind, period: Duration) {
        let tx = self.tx.clone();
        let fired = kind.clone();
        let handle = tokio::spawn(async move {
            let mut interval = time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately.
            interval.tick().await;
            loop {
                interval.tick().await;
                if tx.send(fired.clone()).is_err() {
                    break;
                }
            }
        });
        self.replace(kind, handle);
    }

    /// Arm a one-shot timer for the wall-clock instant `at`. An instant in
    /// the past fires as soon as possible.
    pub fn arm_at(&mut self, kind: TimerKind, at: DateTime<Utc>, now: DateTime<Utc>) {
        self.arm_after(kind, to_std_duration(at - now));
    }

    /// Arm a one-shot timer that fires after `delay`.
    pub fn arm_after(&mut self, kind: TimerKind, delay: Duration) {
        let tx = self.tx.clone();
        let fired = kind.clone();
        let handle = tokio::spawn(async move {
            time::sleep(delay).await;
            let _ = tx.send(fired);
        });
        tracing::debug!(timer = ?kind, delay_secs = delay.as_secs(), "one-shot timer armed");
        self.replace(kind, handle);
    }

    /// Stop a timer. Returns `true` if one was still pending.
    pub fn cancel(&mut self, kind: &TimerKind) -> bool {
        match self.timers.remove(kind) {
            Some(handle) => {
                let pending = !handle.is_finished();
                handle.abort();
                pending
            }
            None => false,
        }
    }

    /// Forget a one-shot timer after its fire has been handled.
    pub fn complete(&mut self, kind: &TimerKind) {
        if !kind.is_periodic() {
            self.timers.remove(kind);
        }
    }

    /// `true` while the timer is armed and has not yet delivered its fire.
    pub fn is_armed(&self, kind: &TimerKind) -> bool {
        self.timers.get(kind).is_some_and(|h| !h.is_finished())
    }

    /// Abort every timer.
    pub fn shutdown(&mut self) {
        for (_, handle) in self.timers.drain() {
            handle.abort();
        }
    }

    fn replace(&mut self, kind: TimerKind, handle: JoinHandle<()>) {
        if let Some(previous) = self.timers.insert(kind, handle) {
            previous.abort();
        }
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.shutdown();
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
