use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
};
use tracing::{debug, info};

use super::{AppState, parse_id, require_text};
use crate::error::AppError;
use crate::models::{NewUser, Project, TimeLogDetail, User};
use crate::realtime::events;

const INVALID_USER_ID: &str = "Invalid user ID";

/// GET /api/users
pub async fn list_users(State(state): State<AppState>) -> Result<Json<Vec<User>>, AppError> {
    let users = state
        .store
        .list_users()
        .await
        .map_err(AppError::store("Failed to fetch users"))?;

    Ok(Json(users))
}

/// POST /api/users
pub async fn create_user(
    State(state): State<AppState>,
    payload: Result<Json<NewUser>, JsonRejection>,
) -> Result<(StatusCode, Json<User>), AppError> {
    let Json(payload) = payload.map_err(|_| AppError::InvalidPayload("Invalid user payload"))?;
    require_text(&payload.name, "Invalid user payload")?;
    require_text(&payload.email, "Invalid user payload")?;

    let user = state
        .store
        .create_user(&payload)
        .await
        .map_err(AppError::store("Failed to create user"))?;

    info!(user_id = user.id, role = %payload.role, "user created");
    state
        .events
        .publish_created(&[events::USERS.to_string()], "user", &user);

    Ok((StatusCode::CREATED, Json(user)))
}

/// GET /api/users/{id}/projects
///
/// Projects whose team includes the user.
pub async fn user_projects(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<Project>>, AppError> {
    let user_id = parse_id(&id, INVALID_USER_ID)?;

    let projects = state
        .store
        .projects_for_user(user_id)
        .await
        .map_err(AppError::store("Failed to fetch user projects"))?;

    debug!(user_id, count = projects.len(), "fetched user projects");
    Ok(Json(projects))
}

/// GET /api/users/{id}/time-logs
///
/// The user's time logs with project and task attached, newest first.
pub async fn user_time_logs(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<TimeLogDetail>>, AppError> {
    let user_id = parse_id(&id, INVALID_USER_ID)?;

    let logs = state
        .store
        .time_logs_for_user(user_id)
        .await
        .map_err(AppError::store("Failed to fetch time logs"))?;

    debug!(user_id, count = logs.len(), "fetched user time logs");
    Ok(Json(logs))
}
