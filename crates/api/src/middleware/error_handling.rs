//! # Error Handling Middleware
//!
//! Maps booking errors and caller-identity failures to HTTP status codes and
//! JSON error bodies of the form `{ "error": <message>, "kind": <kind> }`.
//! Persistence failures only ever expose their generic message; the store
//! error behind them stays in the logs.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use clinic_core::errors::BookingError;
use serde_json::json;

/// Application error wrapper that provides HTTP status code mapping
#[derive(Debug)]
pub enum AppError {
    /// A booking operation failed
    Booking(BookingError),
    /// The caller identity is missing or malformed
    Unauthorized(String),
    /// The caller's role may not perform the operation
    Forbidden(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Booking(err) => StatusCode::from_u16(err.http_status())
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        let body = match &self {
            AppError::Booking(err) => json!({ "error": err.to_string(), "kind": err.kind() }),
            AppError::Unauthorized(message) => json!({ "error": message, "kind": "Unauthorized" }),
            AppError::Forbidden(message) => json!({ "error": message, "kind": "Forbidden" }),
        };

        (status, Json(body)).into_response()
    }
}

/// Allows using `?` on booking results inside handlers
impl From<BookingError> for AppError {
    fn from(err: BookingError) -> Self {
        AppError::Booking(err)
    }
}

/// Maps a BookingError straight to an HTTP response
pub fn map_error(err: BookingError) -> Response {
    AppError::from(err).into_response()
}
