use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
};
use tracing::info;

use super::AppState;
use crate::error::AppError;
use crate::models::{Client, NewClient};
use crate::realtime::events;

const CREATE_FAILED: &str = "Failed to create client";

/// GET /api/clients
pub async fn list_clients(State(state): State<AppState>) -> Result<Json<Vec<Client>>, AppError> {
    let clients = state
        .store
        .list_clients()
        .await
        .map_err(AppError::store("Failed to fetch clients"))?;

    Ok(Json(clients))
}

/// POST /api/clients
///
/// Answers 201 or 500; an unreadable body is reported like any other failed insert.
pub async fn create_client(
    State(state): State<AppState>,
    payload: Result<Json<NewClient>, JsonRejection>,
) -> Result<(StatusCode, Json<Client>), AppError> {
    let Json(payload) = payload.map_err(|rejection| AppError::Store {
        message: CREATE_FAILED,
        source: anyhow::anyhow!(rejection),
    })?;

    let client = state
        .store
        .create_client(&payload)
        .await
        .map_err(AppError::store(CREATE_FAILED))?;

    info!(client_id = client.id, "client created");
    state
        .events
        .publish_created(&[events::CLIENTS.to_string()], "client", &client);

    Ok((StatusCode::CREATED, Json(client)))
}
