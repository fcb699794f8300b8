//! HTTP endpoint handlers

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, response::Json};
use serde::{Deserialize, Deserializer};
use tracing::{error, info};

use crate::{
    engine::{DisplayFrame, TimerError, TimerStatus},
    state::AppState,
};

use super::responses::{CommandResponse, HealthResponse, StatusResponse};

/// Body for PUT /duration. Missing, negative, or non-numeric fields coerce
/// to 0; nothing here ever rejects the request.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct DurationRequest {
    #[serde(default, deserialize_with = "lenient_seconds")]
    pub hours: u64,
    #[serde(default, deserialize_with = "lenient_seconds")]
    pub minutes: u64,
    #[serde(default, deserialize_with = "lenient_seconds")]
    pub seconds: u64,
}

/// Body for PUT /loop
#[derive(Debug, Clone, Deserialize)]
pub struct LoopRequest {
    pub enabled: bool,
}

fn lenient_seconds<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::Number(n) => n
            .as_u64()
            .or_else(|| {
                n.as_f64()
                    .filter(|f| f.is_finite() && *f > 0.0)
                    .map(|f| f as u64)
            })
            .unwrap_or(0),
        serde_json::Value::String(s) => s.trim().parse::<u64>().unwrap_or(0),
        _ => 0,
    })
}

fn internal_error(context: &str, e: TimerError) -> StatusCode {
    error!("{}: {}", context, e);
    StatusCode::INTERNAL_SERVER_ERROR
}

/// Handle POST /start - Start or resume the countdown
pub async fn start_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<CommandResponse>, StatusCode> {
    state.record_command("start");
    let snapshot = state
        .timer
        .start()
        .map_err(|e| internal_error("Failed to start timer", e))?;

    let message = if snapshot.status == TimerStatus::Running {
        info!("Start endpoint called - countdown running");
        "Countdown running".to_string()
    } else {
        info!("Start endpoint called - ignored, configured duration is zero");
        "Start ignored: configured duration is zero".to_string()
    };
    Ok(Json(CommandResponse::new(message, snapshot)))
}

/// Handle POST /pause - Pause the countdown
pub async fn pause_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<CommandResponse>, StatusCode> {
    state.record_command("pause");
    let snapshot = state
        .timer
        .pause()
        .map_err(|e| internal_error("Failed to pause timer", e))?;

    let message = if snapshot.status == TimerStatus::Paused {
        info!("Pause endpoint called - countdown paused");
        "Countdown paused".to_string()
    } else {
        "Pause ignored: timer is not running".to_string()
    };
    Ok(Json(CommandResponse::new(message, snapshot)))
}

/// Handle POST /reset - Reset to the configured duration
pub async fn reset_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<CommandResponse>, StatusCode> {
    state.record_command("reset");
    let snapshot = state
        .timer
        .reset()
        .map_err(|e| internal_error("Failed to reset timer", e))?;

    info!("Reset endpoint called - countdown reset");
    Ok(Json(CommandResponse::new(
        "Countdown reset".to_string(),
        snapshot,
    )))
}

/// Handle PUT /duration - Configure the countdown duration
pub async fn duration_handler(
    State(state): State<Arc<AppState>>,
    Json(body): Json<DurationRequest>,
) -> Result<Json<CommandResponse>, StatusCode> {
    state.record_command("duration");
    state
        .timer
        .set_duration(body.hours, body.minutes, body.seconds)
        .map_err(|e| internal_error("Failed to configure duration", e))?;
    let snapshot = state
        .timer
        .snapshot()
        .map_err(|e| internal_error("Failed to read timer state", e))?;

    info!(
        "Duration endpoint called - {}h {}m {}s",
        body.hours, body.minutes, body.seconds
    );
    Ok(Json(CommandResponse::new(
        "Duration configured".to_string(),
        snapshot,
    )))
}

/// Handle PUT /loop - Toggle automatic restart
pub async fn loop_handler(
    State(state): State<Arc<AppState>>,
    Json(body): Json<LoopRequest>,
) -> Result<Json<CommandResponse>, StatusCode> {
    state.record_command("loop");
    let snapshot = state
        .timer
        .set_loop(body.enabled)
        .map_err(|e| internal_error("Failed to configure loop", e))?;

    info!("Loop endpoint called - enabled={}", body.enabled);
    let message = if body.enabled {
        "Loop enabled".to_string()
    } else {
        "Loop disabled".to_string()
    };
    Ok(Json(CommandResponse::new(message, snapshot)))
}

/// Handle GET /status - Return current timer status and display frame
pub async fn status_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<StatusResponse>, StatusCode> {
    let snapshot = state
        .timer
        .snapshot()
        .map_err(|e| internal_error("Failed to read timer state", e))?;
    let (last_command, last_command_time) = state.last_command();

    Ok(Json(StatusResponse {
        display: DisplayFrame::from_snapshot(&snapshot),
        timer: snapshot,
        uptime: state.uptime(),
        port: state.port,
        host: state.host.clone(),
        last_command,
        last_command_time,
    }))
}

/// Handle GET /health - Health check endpoint
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::ok())
}
