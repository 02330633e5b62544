use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
};
use tracing::info;

use super::AppState;
use crate::error::AppError;
use crate::models::{NewTimeLog, TimeLog};
use crate::realtime::events;

const INVALID_TIME_LOG: &str = "Invalid time log payload";

/// POST /api/time-logs
pub async fn create_time_log(
    State(state): State<AppState>,
    payload: Result<Json<NewTimeLog>, JsonRejection>,
) -> Result<(StatusCode, Json<TimeLog>), AppError> {
    let Json(payload) = payload.map_err(|_| AppError::InvalidPayload(INVALID_TIME_LOG))?;
    if !payload.hours.is_finite() || payload.hours <= 0.0 {
        return Err(AppError::InvalidPayload(INVALID_TIME_LOG));
    }

    let log = state
        .store
        .create_time_log(&payload)
        .await
        .map_err(AppError::store("Failed to create time log"))?;

    info!(
        time_log_id = log.id,
        user_id = log.user_id,
        project_id = log.project_id,
        hours = log.hours,
        "time log created"
    );
    state.events.publish_created(
        &[
            events::user_channel(log.user_id),
            events::project_channel(log.project_id),
        ],
        "time_log",
        &log,
    );

    Ok((StatusCode::CREATED, Json(log)))
}
