//! Background tasks module
//!
//! Tasks that run alongside the HTTP server.

pub mod render_loop;

// Re-export main functions
pub use render_loop::render_loop_task;
