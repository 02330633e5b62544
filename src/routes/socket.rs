use axum::{
    extract::{State, WebSocketUpgrade},
    http::StatusCode,
    response::Response,
};
use tracing::debug;

use super::AppState;
use crate::realtime::socket::serve_connection;

/// GET|POST /api/socket
///
/// Makes sure the realtime server is running. Always answers with an empty 200.
pub async fn attach(State(state): State<AppState>) -> StatusCode {
    let (_, started) = state.realtime.attach().await;
    if !started {
        debug!("realtime server already running");
    }
    StatusCode::OK
}

/// GET /api/socket/ws
pub async fn upgrade(State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    let (server, _) = state.realtime.attach().await;
    ws.on_upgrade(move |socket| serve_connection(socket, server))
}
