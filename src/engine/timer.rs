//! Countdown timer state machine
//!
//! The engine owns the configured duration, the remaining time and the
//! stopped/running/paused status, and decrements once per second while
//! running. Every mutation publishes a [`TimerSnapshot`] on a watch channel;
//! the display layer and the HTTP surface are plain consumers of those
//! snapshots and have no back-channel into the engine.

use std::{
    fmt,
    sync::{Arc, Mutex, PoisonError},
    time::Duration,
};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, error, info};

use super::scheduler::{ScheduleHandle, Scheduler};

/// Period of the repeating tick while the timer is running.
pub const TICK_PERIOD: Duration = Duration::from_secs(1);
/// Delay between reaching zero and the automatic restart when looping.
pub const LOOP_RESTART_DELAY: Duration = Duration::from_secs(1);

#[derive(Debug, Error)]
pub enum TimerError {
    #[error("timer state lock poisoned")]
    StatePoisoned,
}

impl<T> From<PoisonError<T>> for TimerError {
    fn from(_: PoisonError<T>) -> Self {
        TimerError::StatePoisoned
    }
}

/// Timer lifecycle status. Exactly one at any time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimerStatus {
    Stopped,
    Running,
    Paused,
}

impl TimerStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimerStatus::Stopped => "stopped",
            TimerStatus::Running => "running",
            TimerStatus::Paused => "paused",
        }
    }
}

/// Duration inputs as hours/minutes/seconds.
///
/// Only applied to the live countdown on the next start-from-stopped or reset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DurationConfig {
    pub hours: u64,
    pub minutes: u64,
    pub seconds: u64,
}

impl DurationConfig {
    pub fn new(hours: u64, minutes: u64, seconds: u64) -> Self {
        Self {
            hours,
            minutes,
            seconds,
        }
    }

    pub fn total_seconds(&self) -> u64 {
        self.hours
            .saturating_mul(3600)
            .saturating_add(self.minutes.saturating_mul(60))
            .saturating_add(self.seconds)
    }
}

/// Published after every state mutation: once per tick while running and once
/// immediately after start/pause/reset for the initial paint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimerSnapshot {
    pub status: TimerStatus,
    pub total_seconds: u64,
    pub remaining_seconds: u64,
    pub loop_enabled: bool,
    /// The engine's sole derived signal, always in `[0, 1]`.
    pub fraction_remaining: f64,
}

impl TimerSnapshot {
    fn idle() -> Self {
        Self {
            status: TimerStatus::Stopped,
            total_seconds: 0,
            remaining_seconds: 0,
            loop_enabled: false,
            fraction_remaining: 0.0,
        }
    }
}

#[derive(Debug)]
struct TimerInner {
    config: DurationConfig,
    total_seconds: u64,
    remaining_seconds: u64,
    status: TimerStatus,
    loop_enabled: bool,
    /// At most one live repeating tick.
    tick_handle: Option<ScheduleHandle>,
    /// At most one live delayed loop restart.
    restart_handle: Option<ScheduleHandle>,
}

struct Shared<S> {
    scheduler: Arc<S>,
    state: Mutex<TimerInner>,
    updates: watch::Sender<TimerSnapshot>,
    /// Keep one receiver alive so publishing never fails.
    _updates_rx: watch::Receiver<TimerSnapshot>,
}

/// Countdown timer engine handle.
///
/// Cheap to clone; all clones share the same state. Commands never raise for
/// bad input -- the only failure mode is a poisoned state lock.
pub struct CountdownTimer<S: Scheduler> {
    shared: Arc<Shared<S>>,
}

impl<S: Scheduler> Clone for CountdownTimer<S> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<S: Scheduler> fmt::Debug for CountdownTimer<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CountdownTimer").finish_non_exhaustive()
    }
}

impl<S: Scheduler> CountdownTimer<S> {
    pub fn new(scheduler: Arc<S>) -> Self {
        let (updates, updates_rx) = watch::channel(TimerSnapshot::idle());
        Self {
            shared: Arc::new(Shared {
                scheduler,
                state: Mutex::new(TimerInner {
                    config: DurationConfig::default(),
                    total_seconds: 0,
                    remaining_seconds: 0,
                    status: TimerStatus::Stopped,
                    loop_enabled: false,
                    tick_handle: None,
                    restart_handle: None,
                }),
                updates,
                _updates_rx: updates_rx,
            }),
        }
    }

    /// Subscribe to snapshot updates.
    pub fn subscribe(&self) -> watch::Receiver<TimerSnapshot> {
        self.shared.updates.subscribe()
    }

    /// Current state without waiting for an update.
    pub fn snapshot(&self) -> Result<TimerSnapshot, TimerError> {
        let state = self.shared.state.lock()?;
        Ok(snapshot_of(&state))
    }

    /// Configure the duration inputs. Takes effect on the next
    /// start-from-stopped or reset, never on a paused countdown.
    pub fn set_duration(&self, hours: u64, minutes: u64, seconds: u64) -> Result<(), TimerError> {
        let mut state = self.shared.state.lock()?;
        state.config = DurationConfig::new(hours, minutes, seconds);
        debug!(
            total = state.config.total_seconds(),
            "Duration configured"
        );
        Ok(())
    }

    /// Toggle automatic restart after reaching zero. Read at finish time.
    pub fn set_loop(&self, enabled: bool) -> Result<TimerSnapshot, TimerError> {
        let mut state = self.shared.state.lock()?;
        state.loop_enabled = enabled;
        debug!(enabled, "Loop configured");
        Ok(publish(&self.shared, &state))
    }

    /// Start from stopped (rereading the configuration) or resume from paused
    /// (keeping the current remaining time).
    ///
    /// A start whose configured total is zero is silently ignored; a start
    /// while already running is a no-op.
    pub fn start(&self) -> Result<TimerSnapshot, TimerError> {
        let mut state = self.shared.state.lock()?;
        match state.status {
            TimerStatus::Running => return Ok(snapshot_of(&state)),
            TimerStatus::Stopped => {
                state.total_seconds = state.config.total_seconds();
                state.remaining_seconds = state.total_seconds;
            }
            TimerStatus::Paused => {}
        }
        if state.remaining_seconds == 0 {
            debug!("Start ignored: configured duration is zero");
            return Ok(snapshot_of(&state));
        }

        cancel_pending(&self.shared, &mut state);
        state.status = TimerStatus::Running;
        let weak = Arc::downgrade(&self.shared);
        state.tick_handle = Some(self.shared.scheduler.schedule_repeating(
            TICK_PERIOD,
            Box::new(move || {
                if let Some(shared) = weak.upgrade() {
                    on_tick(&shared);
                }
            }),
        ));
        info!(
            total = state.total_seconds,
            remaining = state.remaining_seconds,
            "Timer started"
        );
        Ok(publish(&self.shared, &state))
    }

    /// Pause a running countdown, preserving the remaining time. No-op in any
    /// other status.
    pub fn pause(&self) -> Result<TimerSnapshot, TimerError> {
        let mut state = self.shared.state.lock()?;
        if state.status != TimerStatus::Running {
            return Ok(snapshot_of(&state));
        }
        if let Some(handle) = state.tick_handle.take() {
            self.shared.scheduler.cancel(handle);
        }
        state.status = TimerStatus::Paused;
        info!(remaining = state.remaining_seconds, "Timer paused");
        Ok(publish(&self.shared, &state))
    }

    /// Stop everything (tick and any pending loop restart) and reload the
    /// configured duration. Valid from any status.
    pub fn reset(&self) -> Result<TimerSnapshot, TimerError> {
        let mut state = self.shared.state.lock()?;
        cancel_pending(&self.shared, &mut state);
        state.total_seconds = state.config.total_seconds();
        state.remaining_seconds = state.total_seconds;
        state.status = TimerStatus::Stopped;
        info!(total = state.total_seconds, "Timer reset");
        Ok(publish(&self.shared, &state))
    }
}

fn fraction_remaining(remaining: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (remaining as f64 / total as f64).clamp(0.0, 1.0)
}

fn snapshot_of(state: &TimerInner) -> TimerSnapshot {
    TimerSnapshot {
        status: state.status,
        total_seconds: state.total_seconds,
        remaining_seconds: state.remaining_seconds,
        loop_enabled: state.loop_enabled,
        fraction_remaining: fraction_remaining(state.remaining_seconds, state.total_seconds),
    }
}

fn publish<S>(shared: &Shared<S>, state: &TimerInner) -> TimerSnapshot {
    let snapshot = snapshot_of(state);
    // A receiver is held inside Shared, so this only fails during teardown.
    let _ = shared.updates.send(snapshot.clone());
    snapshot
}

fn cancel_pending<S: Scheduler>(shared: &Shared<S>, state: &mut TimerInner) {
    if let Some(handle) = state.tick_handle.take() {
        shared.scheduler.cancel(handle);
    }
    if let Some(handle) = state.restart_handle.take() {
        shared.scheduler.cancel(handle);
    }
}

/// One tick: decrement while running, finish at zero.
fn on_tick<S: Scheduler>(shared: &Arc<Shared<S>>) {
    let mut state = match shared.state.lock() {
        Ok(state) => state,
        Err(_) => {
            error!("Timer state lock poisoned, tick skipped");
            return;
        }
    };
    if state.status != TimerStatus::Running {
        return;
    }
    state.remaining_seconds = state.remaining_seconds.saturating_sub(1);
    if state.remaining_seconds == 0 {
        if let Some(handle) = state.tick_handle.take() {
            shared.scheduler.cancel(handle);
        }
        finish(shared, &mut state);
    }
    publish(shared, &state);
}

/// Finish decision: settle stopped, or schedule the delayed reset+start.
fn finish<S: Scheduler>(shared: &Arc<Shared<S>>, state: &mut TimerInner) {
    state.status = TimerStatus::Stopped;
    if state.loop_enabled {
        info!("Countdown finished, restarting after delay");
        let weak = Arc::downgrade(shared);
        state.restart_handle = Some(shared.scheduler.schedule_once(
            LOOP_RESTART_DELAY,
            Box::new(move || {
                if let Some(shared) = weak.upgrade() {
                    restart(&shared);
                }
            }),
        ));
    } else {
        info!("Countdown finished");
    }
}

/// Loop restart is the reset+start composition, rereading the configuration.
fn restart<S: Scheduler>(shared: &Arc<Shared<S>>) {
    let timer = CountdownTimer {
        shared: Arc::clone(shared),
    };
    if let Err(e) = timer.reset().and_then(|_| timer.start()) {
        error!("Loop restart failed: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::scheduler::ManualScheduler;

    fn timer() -> (CountdownTimer<ManualScheduler>, Arc<ManualScheduler>) {
        let scheduler = Arc::new(ManualScheduler::new());
        (CountdownTimer::new(Arc::clone(&scheduler)), scheduler)
    }

    #[test]
    fn configure_then_reset_loads_the_duration() {
        let (timer, _) = timer();
        timer.set_duration(1, 2, 3).unwrap();
        let snapshot = timer.reset().unwrap();

        assert_eq!(snapshot.total_seconds, 3723);
        assert_eq!(snapshot.remaining_seconds, 3723);
        assert_eq!(snapshot.status, TimerStatus::Stopped);
    }

    #[test]
    fn start_with_zero_total_is_silently_ignored() {
        let (timer, scheduler) = timer();
        timer.set_duration(0, 0, 0).unwrap();
        let snapshot = timer.start().unwrap();

        assert_eq!(snapshot.status, TimerStatus::Stopped);
        assert_eq!(scheduler.pending(), 0);
    }

    #[test]
    fn ticks_decrement_while_running() {
        let (timer, scheduler) = timer();
        timer.set_duration(0, 0, 10).unwrap();
        timer.start().unwrap();

        scheduler.advance(3);
        let snapshot = timer.snapshot().unwrap();
        assert_eq!(snapshot.remaining_seconds, 7);
        assert_eq!(snapshot.status, TimerStatus::Running);
    }

    #[test]
    fn start_while_running_changes_nothing() {
        let (timer, scheduler) = timer();
        timer.set_duration(0, 0, 5).unwrap();
        timer.start().unwrap();
        scheduler.advance(2);

        let snapshot = timer.start().unwrap();
        assert_eq!(snapshot.remaining_seconds, 3);
        assert_eq!(snapshot.status, TimerStatus::Running);
        assert_eq!(scheduler.pending(), 1);
    }

    #[test]
    fn resume_ignores_configuration_changed_mid_pause() {
        let (timer, scheduler) = timer();
        timer.set_duration(0, 0, 10).unwrap();
        timer.start().unwrap();
        scheduler.advance(4);
        timer.pause().unwrap();

        timer.set_duration(0, 1, 39).unwrap();
        let snapshot = timer.start().unwrap();
        assert_eq!(snapshot.remaining_seconds, 6);
        assert_eq!(snapshot.total_seconds, 10);

        scheduler.advance(1);
        assert_eq!(timer.snapshot().unwrap().remaining_seconds, 5);
    }

    #[test]
    fn pause_preserves_remaining_and_stops_ticking() {
        let (timer, scheduler) = timer();
        timer.set_duration(0, 0, 8).unwrap();
        timer.start().unwrap();
        scheduler.advance(3);

        let snapshot = timer.pause().unwrap();
        assert_eq!(snapshot.status, TimerStatus::Paused);
        assert_eq!(snapshot.remaining_seconds, 5);
        assert_eq!(scheduler.pending(), 0);

        scheduler.advance(10);
        assert_eq!(timer.snapshot().unwrap().remaining_seconds, 5);
    }

    #[test]
    fn pause_when_not_running_is_a_noop() {
        let (timer, _) = timer();
        timer.set_duration(0, 0, 5).unwrap();
        timer.reset().unwrap();

        let snapshot = timer.pause().unwrap();
        assert_eq!(snapshot.status, TimerStatus::Stopped);
        assert_eq!(snapshot.remaining_seconds, 5);
    }

    #[test]
    fn finish_without_loop_settles_stopped() {
        let (timer, scheduler) = timer();
        timer.set_duration(0, 0, 2).unwrap();
        timer.start().unwrap();

        scheduler.advance(2);
        let snapshot = timer.snapshot().unwrap();
        assert_eq!(snapshot.status, TimerStatus::Stopped);
        assert_eq!(snapshot.remaining_seconds, 0);
        assert_eq!(scheduler.pending(), 0);
    }

    #[test]
    fn finish_with_loop_restarts_after_the_delay() {
        let (timer, scheduler) = timer();
        timer.set_duration(0, 0, 2).unwrap();
        timer.set_loop(true).unwrap();
        timer.start().unwrap();

        scheduler.advance(2);
        assert_eq!(timer.snapshot().unwrap().status, TimerStatus::Stopped);
        assert_eq!(timer.snapshot().unwrap().remaining_seconds, 0);

        // Restart fires one second later and performs reset+start.
        scheduler.advance(1);
        let snapshot = timer.snapshot().unwrap();
        assert_eq!(snapshot.status, TimerStatus::Running);
        assert_eq!(snapshot.remaining_seconds, 2);

        // One tick into the new cycle.
        scheduler.advance(1);
        assert_eq!(timer.snapshot().unwrap().remaining_seconds, 1);
    }

    #[test]
    fn loop_restart_rereads_the_configuration() {
        let (timer, scheduler) = timer();
        timer.set_duration(0, 0, 3).unwrap();
        timer.set_loop(true).unwrap();
        timer.start().unwrap();
        scheduler.advance(3);

        timer.set_duration(0, 0, 5).unwrap();
        scheduler.advance(1);
        let snapshot = timer.snapshot().unwrap();
        assert_eq!(snapshot.status, TimerStatus::Running);
        assert_eq!(snapshot.total_seconds, 5);
        assert_eq!(snapshot.remaining_seconds, 5);
    }

    #[test]
    fn reset_cancels_a_pending_loop_restart() {
        let (timer, scheduler) = timer();
        timer.set_duration(0, 0, 2).unwrap();
        timer.set_loop(true).unwrap();
        timer.start().unwrap();
        scheduler.advance(2);
        assert_eq!(scheduler.pending(), 1);

        timer.reset().unwrap();
        assert_eq!(scheduler.pending(), 0);
        scheduler.advance(5);
        assert_eq!(timer.snapshot().unwrap().status, TimerStatus::Stopped);
    }

    #[test]
    fn three_second_scenario_observes_two_one_zero() {
        let (timer, scheduler) = timer();
        timer.set_duration(0, 0, 3).unwrap();
        timer.start().unwrap();

        let rx = timer.subscribe();
        assert_eq!(rx.borrow().remaining_seconds, 3);

        let mut observed = Vec::new();
        for _ in 0..3 {
            scheduler.advance(1);
            observed.push(rx.borrow().remaining_seconds);
        }
        assert_eq!(observed, vec![2, 1, 0]);
        assert_eq!(rx.borrow().status, TimerStatus::Stopped);
    }

    #[test]
    fn reset_while_running_cancels_the_active_tick() {
        let (timer, scheduler) = timer();
        timer.set_duration(0, 0, 5).unwrap();
        timer.start().unwrap();
        scheduler.advance(1);
        assert_eq!(timer.snapshot().unwrap().remaining_seconds, 4);

        timer.reset().unwrap();
        assert_eq!(scheduler.pending(), 0);

        // No update from the old schedule.
        scheduler.advance(3);
        let snapshot = timer.snapshot().unwrap();
        assert_eq!(snapshot.remaining_seconds, 5);
        assert_eq!(snapshot.status, TimerStatus::Stopped);
    }

    #[test]
    fn fraction_tracks_remaining_over_total() {
        let (timer, scheduler) = timer();
        timer.set_duration(0, 0, 4).unwrap();
        timer.start().unwrap();

        let mut expected = 4u64;
        while expected > 0 {
            let snapshot = timer.snapshot().unwrap();
            assert!((0.0..=1.0).contains(&snapshot.fraction_remaining));
            assert!((snapshot.fraction_remaining - expected as f64 / 4.0).abs() < f64::EPSILON);
            scheduler.advance(1);
            expected -= 1;
        }
        assert_eq!(timer.snapshot().unwrap().fraction_remaining, 0.0);
    }

    #[test]
    fn fraction_is_zero_when_total_is_zero() {
        let (timer, _) = timer();
        let snapshot = timer.reset().unwrap();
        assert_eq!(snapshot.total_seconds, 0);
        assert_eq!(snapshot.fraction_remaining, 0.0);
    }

    #[test]
    fn duration_config_saturates_instead_of_overflowing() {
        let config = DurationConfig::new(u64::MAX, 0, 1);
        assert_eq!(config.total_seconds(), u64::MAX);
    }
}
