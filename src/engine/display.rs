//! Display adapter: clock formatting and the renderer seam
//!
//! A visual layer (bar fill, clip mask, particle threshold) only ever sees a
//! ready-made [`DisplayFrame`]; the fraction inside it is the engine's signal
//! passed through untouched, never re-derived here.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::timer::{TimerSnapshot, TimerStatus};

/// Format remaining seconds as a zero-padded `HH:MM:SS` clock.
pub fn format_hms(remaining_seconds: u64) -> String {
    let hrs = remaining_seconds / 3600;
    let mins = (remaining_seconds % 3600) / 60;
    let secs = remaining_seconds % 60;
    format!("{:02}:{:02}:{:02}", hrs, mins, secs)
}

/// Button/label hints, derived purely from the timer status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlHints {
    pub start_enabled: bool,
    pub pause_enabled: bool,
    pub start_label: String,
}

impl ControlHints {
    pub fn for_status(status: TimerStatus) -> Self {
        Self {
            start_enabled: status != TimerStatus::Running,
            pause_enabled: status == TimerStatus::Running,
            start_label: match status {
                TimerStatus::Paused => "Resume",
                TimerStatus::Stopped | TimerStatus::Running => "Start",
            }
            .to_string(),
        }
    }
}

/// Everything a visual layer needs for one paint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplayFrame {
    pub clock: String,
    pub fraction: f64,
    pub hints: ControlHints,
}

impl DisplayFrame {
    pub fn from_snapshot(snapshot: &TimerSnapshot) -> Self {
        Self {
            clock: format_hms(snapshot.remaining_seconds),
            fraction: snapshot.fraction_remaining,
            hints: ControlHints::for_status(snapshot.status),
        }
    }
}

/// Seam for whatever visual layer is mounted. Implementations only consume
/// frames; they have no way back into the engine.
pub trait Renderer: Send + 'static {
    fn render(&mut self, frame: &DisplayFrame);
}

/// Renderer that writes frames to the log. The only renderer this crate ships.
#[derive(Debug, Default)]
pub struct TracingRenderer;

impl Renderer for TracingRenderer {
    fn render(&mut self, frame: &DisplayFrame) {
        debug!(clock = %frame.clock, fraction = frame.fraction, "Display frame");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clock_is_zero_padded() {
        assert_eq!(format_hms(0), "00:00:00");
        assert_eq!(format_hms(5), "00:00:05");
        assert_eq!(format_hms(65), "00:01:05");
        assert_eq!(format_hms(3661), "01:01:01");
        assert_eq!(format_hms(86399), "23:59:59");
    }

    #[test]
    fn hours_are_not_truncated() {
        assert_eq!(format_hms(100 * 3600), "100:00:00");
    }

    #[test]
    fn hints_follow_status() {
        let stopped = ControlHints::for_status(TimerStatus::Stopped);
        assert!(stopped.start_enabled);
        assert!(!stopped.pause_enabled);
        assert_eq!(stopped.start_label, "Start");

        let running = ControlHints::for_status(TimerStatus::Running);
        assert!(!running.start_enabled);
        assert!(running.pause_enabled);
        assert_eq!(running.start_label, "Start");

        let paused = ControlHints::for_status(TimerStatus::Paused);
        assert!(paused.start_enabled);
        assert!(!paused.pause_enabled);
        assert_eq!(paused.start_label, "Resume");
    }

    #[test]
    fn frame_forwards_the_fraction_verbatim() {
        let snapshot = TimerSnapshot {
            status: TimerStatus::Running,
            total_seconds: 100,
            remaining_seconds: 42,
            loop_enabled: false,
            fraction_remaining: 0.42,
        };
        let frame = DisplayFrame::from_snapshot(&snapshot);
        assert_eq!(frame.clock, "00:00:42");
        assert_eq!(frame.fraction, 0.42);
    }
}
