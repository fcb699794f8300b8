//! Countdown engine module
//!
//! The timer state machine, the scheduler capability it runs on, and the
//! display contract its consumers paint from.

pub mod display;
pub mod scheduler;
pub mod timer;

// Re-export main types
pub use display::{ControlHints, DisplayFrame, Renderer, TracingRenderer};
pub use scheduler::{ManualScheduler, ScheduleHandle, Scheduler, TokioScheduler};
pub use timer::{CountdownTimer, DurationConfig, TimerError, TimerSnapshot, TimerStatus};
