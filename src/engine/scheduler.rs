//! Scheduling capability injected into the countdown engine
//!
//! The engine never touches wall-clock time directly: it asks a [`Scheduler`]
//! for a repeating tick or a one-shot delay and keeps the returned handle so
//! the activity can be cancelled before a new one is scheduled.

use std::{
    collections::HashMap,
    fmt,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Mutex, PoisonError,
    },
    time::Duration,
};

use tokio::task::AbortHandle;
use tracing::warn;

/// Callback fired on every period of a repeating schedule.
pub type RepeatingFn = Box<dyn FnMut() + Send + 'static>;
/// Callback fired once after a delay.
pub type OnceFn = Box<dyn FnOnce() + Send + 'static>;

/// Opaque handle to a scheduled activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScheduleHandle(u64);

/// Scheduling capability used by the countdown engine.
///
/// Production code runs on [`TokioScheduler`]; tests drive a [`ManualScheduler`]
/// so no real time passes.
pub trait Scheduler: Send + Sync + 'static {
    /// Schedule `tick` to fire every `period`, starting one period from now.
    fn schedule_repeating(&self, period: Duration, tick: RepeatingFn) -> ScheduleHandle;

    /// Schedule `action` to fire once, `delay` from now.
    fn schedule_once(&self, delay: Duration, action: OnceFn) -> ScheduleHandle;

    /// Cancel a scheduled activity. Unknown or already-finished handles are ignored.
    fn cancel(&self, handle: ScheduleHandle);
}

/// Scheduler backed by spawned tokio tasks.
///
/// Each schedule becomes one task; cancellation aborts the task through a
/// registry of abort handles.
#[derive(Debug, Default)]
pub struct TokioScheduler {
    tasks: Arc<Mutex<HashMap<u64, AbortHandle>>>,
    next_id: AtomicU64,
}

impl TokioScheduler {
    /// Create a new scheduler. Must be used from within a tokio runtime.
    pub fn new() -> Self {
        Self::default()
    }

    fn next_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    fn register(&self, id: u64, handle: AbortHandle) {
        if let Ok(mut tasks) = self.tasks.lock() {
            tasks.insert(id, handle);
        }
    }
}

impl Scheduler for TokioScheduler {
    fn schedule_repeating(&self, period: Duration, mut tick: RepeatingFn) -> ScheduleHandle {
        let id = self.next_id();
        // Anchor the first deadline now, not when the task is first polled.
        let start = tokio::time::Instant::now() + period;
        let task = tokio::spawn(async move {
            let mut interval = tokio::time::interval_at(start, period);
            loop {
                interval.tick().await;
                tick();
            }
        });
        self.register(id, task.abort_handle());
        ScheduleHandle(id)
    }

    fn schedule_once(&self, delay: Duration, action: OnceFn) -> ScheduleHandle {
        let id = self.next_id();
        let deadline = tokio::time::Instant::now() + delay;
        let tasks = Arc::clone(&self.tasks);
        let task = tokio::spawn(async move {
            tokio::time::sleep_until(deadline).await;
            action();
            if let Ok(mut tasks) = tasks.lock() {
                tasks.remove(&id);
            }
        });
        self.register(id, task.abort_handle());
        ScheduleHandle(id)
    }

    fn cancel(&self, handle: ScheduleHandle) {
        match self.tasks.lock() {
            Ok(mut tasks) => {
                if let Some(task) = tasks.remove(&handle.0) {
                    task.abort();
                }
            }
            Err(e) => warn!("Failed to lock scheduler task registry: {}", e),
        }
    }
}

struct ManualEntry {
    fire_at: u64,
    /// Repeat period in seconds; `None` for one-shots.
    period: Option<u64>,
    /// Taken out while the callback runs so reentrant cancel/schedule calls
    /// never observe it mid-fire.
    callback: Option<RepeatingFn>,
}

struct ManualInner {
    now: u64,
    next_id: u64,
    entries: HashMap<u64, ManualEntry>,
}

/// Deterministic scheduler driven by explicit [`advance`](ManualScheduler::advance) calls.
///
/// Time is counted in whole seconds and only moves when the caller says so.
/// Callbacks run synchronously on the advancing thread and may cancel their
/// own schedule or register new ones while firing.
pub struct ManualScheduler {
    inner: Mutex<ManualInner>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(ManualInner {
                now: 0,
                next_id: 0,
                entries: HashMap::new(),
            }),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ManualInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Current virtual time in seconds.
    pub fn now(&self) -> u64 {
        self.lock().now
    }

    /// Number of live schedules (repeating or pending one-shots).
    pub fn pending(&self) -> usize {
        self.lock().entries.len()
    }

    /// Move virtual time forward one second at a time, firing every due
    /// callback synchronously.
    pub fn advance(&self, seconds: u64) {
        for _ in 0..seconds {
            let now = {
                let mut inner = self.lock();
                inner.now += 1;
                inner.now
            };
            loop {
                // Take one due callback out, run it unlocked, then decide
                // whether it survived its own firing.
                let due = {
                    let mut inner = self.lock();
                    inner
                        .entries
                        .iter_mut()
                        .filter(|(_, entry)| entry.fire_at <= now)
                        .find_map(|(id, entry)| {
                            entry.callback.take().map(|f| (*id, f, entry.period))
                        })
                };
                let Some((id, mut callback, period)) = due else {
                    break;
                };
                callback();
                let mut inner = self.lock();
                match period {
                    Some(period) => {
                        // Entry is gone if the callback cancelled itself.
                        if let Some(entry) = inner.entries.get_mut(&id) {
                            entry.fire_at = now + period;
                            entry.callback = Some(callback);
                        }
                    }
                    None => {
                        inner.entries.remove(&id);
                    }
                }
            }
        }
    }
}

impl Default for ManualScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ManualScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.lock();
        f.debug_struct("ManualScheduler")
            .field("now", &inner.now)
            .field("pending", &inner.entries.len())
            .finish()
    }
}

impl Scheduler for ManualScheduler {
    fn schedule_repeating(&self, period: Duration, tick: RepeatingFn) -> ScheduleHandle {
        let period = period.as_secs().max(1);
        let mut inner = self.lock();
        let id = inner.next_id;
        inner.next_id += 1;
        let fire_at = inner.now + period;
        inner.entries.insert(
            id,
            ManualEntry {
                fire_at,
                period: Some(period),
                callback: Some(tick),
            },
        );
        ScheduleHandle(id)
    }

    fn schedule_once(&self, delay: Duration, action: OnceFn) -> ScheduleHandle {
        let delay = delay.as_secs().max(1);
        let mut inner = self.lock();
        let id = inner.next_id;
        inner.next_id += 1;
        let fire_at = inner.now + delay;
        let mut action = Some(action);
        inner.entries.insert(
            id,
            ManualEntry {
                fire_at,
                period: None,
                callback: Some(Box::new(move || {
                    if let Some(action) = action.take() {
                        action();
                    }
                })),
            },
        );
        ScheduleHandle(id)
    }

    fn cancel(&self, handle: ScheduleHandle) {
        self.lock().entries.remove(&handle.0);
    }
}
