//! Coffee Countdown - a coffee-themed countdown timer service
//!
//! The countdown engine is a small state machine (stopped, running, paused)
//! driven by an injected scheduler and observed through a watch channel of
//! snapshots. The display adapter and the HTTP command surface are plain
//! consumers of those snapshots with no back-channel into the engine.

pub mod api;
pub mod config;
pub mod engine;
pub mod state;
pub mod tasks;
pub mod utils;

// Re-export commonly used types
pub use api::create_router;
pub use config::Config;
pub use engine::{CountdownTimer, ManualScheduler, Scheduler, TokioScheduler};
pub use state::AppState;
pub use utils::shutdown_signal;
