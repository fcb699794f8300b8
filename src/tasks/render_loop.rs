//! Render loop background task

use std::sync::Arc;

use tracing::info;

use crate::{
    engine::{DisplayFrame, Renderer},
    state::AppState,
};

/// Background task that watches engine updates and paints one frame per
/// update through the mounted renderer.
pub async fn render_loop_task<R: Renderer>(state: Arc<AppState>, mut renderer: R) {
    info!("Starting render loop task");

    let mut updates = state.timer.subscribe();

    // Initial paint with whatever the engine currently holds
    let frame = DisplayFrame::from_snapshot(&updates.borrow_and_update().clone());
    renderer.render(&frame);

    while updates.changed().await.is_ok() {
        let snapshot = updates.borrow_and_update().clone();
        renderer.render(&DisplayFrame::from_snapshot(&snapshot));
    }

    info!("Timer update channel closed, render loop exiting");
}
