// src/error.rs

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::fmt;
use thiserror::Error;

use crate::services::lifecycle::QuizStatus;

/// Failures raised by the quiz core (token codec, generator, lifecycle gate, importer).
/// All of them are terminal for the operation that raised them.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum QuizError {
    /// The access token could not be split, decoded or decrypted.
    #[error("Invalid quiz link")]
    MalformedToken,

    /// The question bank returned fewer questions than the quiz asks for.
    #[error("Not enough questions in the bank: requested {requested}, available {available}")]
    InsufficientQuestions { requested: i64, available: i64 },

    /// A submission or read was attempted outside the allowed lifecycle state.
    #[error("{}", window_message(.0))]
    OutOfWindow(QuizStatus),

    /// Import text violates the line grammar. `line` is 0-indexed.
    #[error("At line {line}: {expected}")]
    Grammar { line: usize, expected: &'static str },
}

fn window_message(status: &QuizStatus) -> &'static str {
    match status {
        QuizStatus::Scheduled => "Quiz has not started yet",
        QuizStatus::Active | QuizStatus::Closed => "Quiz has expired",
    }
}

/// Global Application Error Enum.
/// Centralizes error handling and mapping to HTTP responses.
#[derive(Debug)]
pub enum AppError {
    // 500 Internal Server Error
    InternalServerError(String),

    // 400 Bad Request
    BadRequest(String),

    // 401 Unauthorized
    AuthError(String),

    // 403 Forbidden (wrong organization or role)
    Forbidden(String),

    // 404 Not Found
    NotFound(String),

    // Domain failures, mapped per kind
    Quiz(QuizError),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Quiz(err) => write!(f, "{}", err),
            other => write!(f, "{:?}", other),
        }
    }
}

impl std::error::Error for AppError {}

/// Converts the error into a JSON response with appropriate HTTP status code.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::InternalServerError(msg) => {
                tracing::error!("Internal Server Error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal Server Error".to_string(),
                )
            }
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::AuthError(msg) => (StatusCode::UNAUTHORIZED, msg),
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Quiz(err) => {
                let status = match err {
                    QuizError::OutOfWindow(_) => StatusCode::FORBIDDEN,
                    QuizError::MalformedToken
                    | QuizError::InsufficientQuestions { .. }
                    | QuizError::Grammar { .. } => StatusCode::BAD_REQUEST,
                };
                (status, err.to_string())
            }
        };
        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

/// Allows using `?` operator on database queries.
impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::InternalServerError(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::BadRequest(err.to_string())
    }
}

impl From<QuizError> for AppError {
    fn from(err: QuizError) -> Self {
        AppError::Quiz(err)
    }
}
