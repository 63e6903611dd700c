//! Error handling
//!
//! Every failure that reaches the HTTP boundary is rendered as
//! `{"error": "<message>"}` with status 200. Callers tell success from
//! failure by the body shape, never by the status code.

use axum::{
    response::{IntoResponse, Response},
    http::StatusCode,
    Json,
};
use serde_json::json;
use std::any::Any;
use thiserror::Error;

pub type AppResult<T> = Result<T, AppError>;

/// Message for an empty record list or a horizon below one day
pub const INVALID_REQUEST_MESSAGE: &str = "No data provided or invalid forecastDays.";

/// Message for a record with an empty threat type
pub const EMPTY_TYPE_MESSAGE: &str = "Invalid threat record: type must not be empty.";

#[derive(Debug, Error)]
pub enum AppError {
    /// Structurally invalid request (empty data, bad horizon, empty type)
    #[error("{0}")]
    InvalidRequest(String),

    /// Anything else: malformed payload, runtime fault, panic
    #[error("{0}")]
    Unclassified(String),
}

impl AppError {
    pub fn message(&self) -> &str {
        match self {
            AppError::InvalidRequest(msg) | AppError::Unclassified(msg) => msg,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match &self {
            AppError::InvalidRequest(msg) => {
                tracing::info!("Rejected prediction request: {}", msg);
            }
            AppError::Unclassified(msg) => {
                tracing::error!("Prediction failed: {}", msg);
            }
        }

        error_body(self.message())
    }
}

impl From<tokio::task::JoinError> for AppError {
    fn from(err: tokio::task::JoinError) -> Self {
        AppError::Unclassified(err.to_string())
    }
}

fn error_body(message: &str) -> Response {
    (StatusCode::OK, Json(json!({ "error": message }))).into_response()
}

/// Renders a caught panic the same way as any other unclassified failure
pub fn panic_response(err: Box<dyn Any + Send + 'static>) -> Response {
    let message = panic_message(err.as_ref());
    tracing::error!("Request handler panicked: {}", message);
    error_body(&message)
}

/// Extract the payload of a panic as text
pub fn panic_message(err: &(dyn Any + Send)) -> String {
    if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "Unknown panic".to_string()
    }
}
