//! Coffee Countdown - a coffee-themed countdown timer service
//!
//! This is the main entry point for the coffee-countdown application.

use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::info;

use coffee_countdown::{
    api::create_router,
    config::Config,
    engine::{CountdownTimer, TokioScheduler, TracingRenderer},
    state::AppState,
    tasks::render_loop_task,
    utils::shutdown_signal,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();

    // Initialize tracing with appropriate log level
    tracing_subscriber::fmt()
        .with_env_filter(format!(
            "coffee_countdown={},tower_http=info",
            config.log_level()
        ))
        .init();

    info!(
        "Starting coffee-countdown server v{}",
        env!("CARGO_PKG_VERSION")
    );
    info!(
        "Configuration: host={}, port={}, duration={:02}:{:02}:{:02}, loop={}",
        config.host, config.port, config.hours, config.minutes, config.seconds, config.loop_enabled
    );

    // Countdown engine on the tokio scheduler, primed from the CLI duration
    let timer = CountdownTimer::new(Arc::new(TokioScheduler::new()));
    timer.set_duration(config.hours, config.minutes, config.seconds)?;
    timer.set_loop(config.loop_enabled)?;
    timer.reset()?;

    // Create application state
    let state = Arc::new(AppState::new(config.port, config.host.clone(), timer));

    // Start the render loop background task with the log-backed renderer
    let render_state = Arc::clone(&state);
    tokio::spawn(async move {
        render_loop_task(render_state, TracingRenderer).await;
    });

    // Create HTTP router with all endpoints
    let app = create_router(Arc::clone(&state));

    // Bind to the specified address
    let addr = config.address();
    let listener = TcpListener::bind(&addr).await?;

    info!("Server running on http://{}", addr);
    info!("Endpoints:");
    info!("  POST /start    - Start or resume the countdown");
    info!("  POST /pause    - Pause the countdown");
    info!("  POST /reset    - Reset to the configured duration");
    info!("  PUT  /duration - Configure hours/minutes/seconds");
    info!("  PUT  /loop     - Toggle automatic restart");
    info!("  GET  /status   - Current timer status and display frame");
    info!("  GET  /health   - Health check");

    // Setup graceful shutdown
    let server = axum::serve(listener, app);

    tokio::select! {
        result = server => {
            if let Err(e) = result {
                tracing::error!("Server error: {}", e);
            }
        }
        _ = shutdown_signal() => {
            info!("Shutdown signal received");
        }
    }

    info!("Server shutdown complete");
    Ok(())
}
