use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};

use super::AppState;

#[derive(Serialize, Deserialize, Debug)]
pub struct HealthResponse {
    pub status: String,
    pub realtime: bool,
    pub connections: usize,
}

/// GET /health
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        realtime: state.realtime.is_attached(),
        connections: state.realtime.connection_count().await,
    })
}
