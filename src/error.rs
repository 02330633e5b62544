use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::error;

/// Body of every error response: `{"error": "..."}`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ErrorBody {
    pub error: String,
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("{0}")]
    InvalidId(&'static str),

    #[error("{0}")]
    InvalidPayload(&'static str),

    /// A data-access failure. `message` is the fixed string sent to the
    /// client; the source stays in the logs.
    #[error("{message}")]
    Store {
        message: &'static str,
        #[source]
        source: anyhow::Error,
    },
}

impl AppError {
    pub fn store(message: &'static str) -> impl FnOnce(anyhow::Error) -> Self {
        move |source| AppError::Store { message, source }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::InvalidId(_) | AppError::InvalidPayload(_) => StatusCode::BAD_REQUEST,
            AppError::Store { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if let AppError::Store { message, source } = &self {
            error!(error = %source, "{message}");
        }

        let body = ErrorBody {
            error: self.to_string(),
        };

        (self.status(), Json(body)).into_response()
    }
}
