//! State management module
//!
//! Application-level state shared across the HTTP surface and background tasks.

pub mod app_state;

// Re-export main types
pub use app_state::AppState;
