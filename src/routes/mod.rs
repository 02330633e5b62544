pub mod clients;
pub mod health;
pub mod projects;
pub mod socket;
pub mod time_logs;
pub mod users;

use std::sync::Arc;

use axum::{
    Router,
    http::{Method, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};

use crate::config::Config;
use crate::db::Store;
use crate::error::AppError;
use crate::realtime::{EventBus, Realtime};

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub events: EventBus,
    pub realtime: Arc<Realtime>,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, config: &Config) -> Self {
        let events = EventBus::new(config.realtime_buffer);
        let realtime = Arc::new(Realtime::new(events.clone(), config.realtime_buffer));
        Self {
            store,
            events,
            realtime,
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .route(
            "/api/clients",
            get(clients::list_clients).post(clients::create_client),
        )
        .route("/api/users", get(users::list_users).post(users::create_user))
        .route(
            "/api/users/:id/projects",
            get(users::user_projects)
                .head(get_only)
                .fallback(get_only),
        )
        .route(
            "/api/users/:id/time-logs",
            get(users::user_time_logs)
                .head(get_only)
                .fallback(get_only),
        )
        .route(
            "/api/projects",
            get(projects::list_projects).post(projects::create_project),
        )
        .route(
            "/api/projects/:id/tasks",
            get(projects::list_tasks).post(projects::create_task),
        )
        .route("/api/time-logs", post(time_logs::create_time_log))
        .route("/api/socket", get(socket::attach).post(socket::attach))
        .route("/api/socket/ws", get(socket::upgrade))
        .with_state(state)
}

/// Fallback for GET-only resources: 405 with an `Allow: GET` header.
///
/// Also mounted on HEAD, which axum would otherwise route to the GET handler.
async fn get_only(method: Method) -> Response {
    (
        StatusCode::METHOD_NOT_ALLOWED,
        [(header::ALLOW, "GET")],
        format!("Method {method} Not Allowed"),
    )
        .into_response()
}

/// Parse a path id: a positive integer, surrounding whitespace ignored.
pub fn parse_id(raw: &str, invalid: &'static str) -> Result<i32, AppError> {
    match raw.trim().parse::<i32>() {
        Ok(id) if id > 0 => Ok(id),
        _ => Err(AppError::InvalidId(invalid)),
    }
}

/// Reject blank required text fields.
pub fn require_text(value: &str, invalid: &'static str) -> Result<(), AppError> {
    if value.trim().is_empty() {
        Err(AppError::InvalidPayload(invalid))
    } else {
        Ok(())
    }
}
