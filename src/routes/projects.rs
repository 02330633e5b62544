use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
};
use tracing::info;

use super::{AppState, parse_id, require_text};
use crate::error::AppError;
use crate::models::{NewProject, NewTask, Project, Task};
use crate::realtime::events;

const INVALID_PROJECT_ID: &str = "Invalid project ID";

/// GET /api/projects
pub async fn list_projects(State(state): State<AppState>) -> Result<Json<Vec<Project>>, AppError> {
    let projects = state
        .store
        .list_projects()
        .await
        .map_err(AppError::store("Failed to fetch projects"))?;

    Ok(Json(projects))
}

/// POST /api/projects
pub async fn create_project(
    State(state): State<AppState>,
    payload: Result<Json<NewProject>, JsonRejection>,
) -> Result<(StatusCode, Json<Project>), AppError> {
    let Json(payload) =
        payload.map_err(|_| AppError::InvalidPayload("Invalid project payload"))?;
    require_text(&payload.name, "Invalid project payload")?;

    let project = state
        .store
        .create_project(&payload)
        .await
        .map_err(AppError::store("Failed to create project"))?;

    info!(
        project_id = project.id,
        client_id = project.client_id,
        members = payload.member_ids.len(),
        "project created"
    );
    let mut channels = vec![
        events::PROJECTS.to_string(),
        events::client_channel(project.client_id),
    ];
    channels.extend(payload.member_ids.iter().map(|id| events::user_channel(*id)));
    state.events.publish_created(&channels, "project", &project);

    Ok((StatusCode::CREATED, Json(project)))
}

/// GET /api/projects/{id}/tasks
pub async fn list_tasks(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<Task>>, AppError> {
    let project_id = parse_id(&id, INVALID_PROJECT_ID)?;

    let tasks = state
        .store
        .tasks_for_project(project_id)
        .await
        .map_err(AppError::store("Failed to fetch tasks"))?;

    Ok(Json(tasks))
}

/// POST /api/projects/{id}/tasks
pub async fn create_task(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<NewTask>, JsonRejection>,
) -> Result<(StatusCode, Json<Task>), AppError> {
    let project_id = parse_id(&id, INVALID_PROJECT_ID)?;
    let Json(payload) = payload.map_err(|_| AppError::InvalidPayload("Invalid task payload"))?;
    require_text(&payload.title, "Invalid task payload")?;

    let task = state
        .store
        .create_task(project_id, &payload)
        .await
        .map_err(AppError::store("Failed to create task"))?;

    info!(task_id = task.id, project_id, "task created");
    state
        .events
        .publish_created(&[events::project_channel(project_id)], "task", &task);

    Ok((StatusCode::CREATED, Json(task)))
}
