use std::time::Duration;

use axum::{Json, http::StatusCode, response::{IntoResponse, Response}};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("persistence call timed out after {0:?}")]
    Timeout(Duration),

    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("corrupt stored value: {0}")]
    Corrupt(String),
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("course not found: {0}")]
    CourseNotFound(String),

    #[error("invalid course: {0}")]
    InvalidCourse(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("corrupt stored value: {0}")]
    Corrupt(String),
}

#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("no active round")]
    NoActiveRound,

    #[error("invalid hole number: {0}")]
    InvalidHoleNumber(u32),

    #[error("course not found: {0}")]
    CourseNotFound(String),

    #[error("course {0} has no holes")]
    EmptyCourse(String),

    #[error("course cannot be played: {0}")]
    InvalidCourse(String),

    #[error("invalid score: {strokes} strokes with {putts} putts")]
    InvalidScore { strokes: u32, putts: u32 },

    #[error("round is already complete")]
    RoundComplete,

    #[error("round not found: {0}")]
    RoundNotFound(String),

    #[error("persistence failed: {0}")]
    PersistenceFailed(#[source] PersistenceError),
}

impl From<PersistenceError> for TrackerError {
    fn from(err: PersistenceError) -> Self {
        TrackerError::PersistenceFailed(err)
    }
}

impl From<CatalogError> for TrackerError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::CourseNotFound(id) => TrackerError::CourseNotFound(id),
            CatalogError::Database(e) => {
                TrackerError::PersistenceFailed(PersistenceError::Database(e))
            }
            CatalogError::InvalidCourse(reason) => TrackerError::InvalidCourse(reason),
            CatalogError::Corrupt(msg) => {
                TrackerError::PersistenceFailed(PersistenceError::Corrupt(msg))
            }
        }
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error(transparent)]
    Tracker(#[from] TrackerError),

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Persistence(#[from] PersistenceError),

    #[error("Not found")]
    NotFound,

    #[error("Bad request: {0}")]
    BadRequest(String),
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

impl AppError {
    fn status_and_message(self) -> (StatusCode, String) {
        match self {
            AppError::NotFound => (StatusCode::NOT_FOUND, "Not Found".to_string()),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Tracker(err) => match err {
                TrackerError::NoActiveRound
                | TrackerError::InvalidHoleNumber(_)
                | TrackerError::EmptyCourse(_)
                | TrackerError::InvalidCourse(_)
                | TrackerError::InvalidScore { .. } => (StatusCode::BAD_REQUEST, err.to_string()),
                TrackerError::RoundComplete => (StatusCode::CONFLICT, err.to_string()),
                TrackerError::CourseNotFound(_) | TrackerError::RoundNotFound(_) => {
                    (StatusCode::NOT_FOUND, err.to_string())
                }
                TrackerError::PersistenceFailed(cause) => {
                    error!("persistence failure: {}", cause);
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "Failed to save round".to_string(),
                    )
                }
            },
            AppError::Catalog(err) => match err {
                CatalogError::CourseNotFound(_) => (StatusCode::NOT_FOUND, err.to_string()),
                CatalogError::InvalidCourse(_) => (StatusCode::BAD_REQUEST, err.to_string()),
                CatalogError::Database(_) | CatalogError::Corrupt(_) => {
                    error!("catalog error: {}", err);
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "Database error occurred".to_string(),
                    )
                }
            },
            AppError::Persistence(e) => {
                error!("persistence error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Database error occurred".to_string(),
                )
            }
            AppError::Database(e) => {
                error!("database error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Database error occurred".to_string(),
                )
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = self.status_and_message();

        let body = Json(ErrorResponse {
            error: status.to_string(),
            message: error_message,
        });

        (status, body).into_response()
    }
}
