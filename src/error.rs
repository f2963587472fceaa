use axum::{Json, extract::rejection::FormRejection, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use thiserror::Error;
use validator::ValidationErrors;

use crate::{dao::storage::StorageError, state::session::SessionError};

/// Errors that can occur in service layer operations.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Archive backend is unavailable or rejected the call.
    #[error("storage unavailable")]
    Unavailable(#[source] StorageError),
    /// Invalid input provided by the client.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// Operation cannot be performed in the current state.
    #[error("invalid state: {0}")]
    InvalidState(String),
    /// Requested resource was not found.
    #[error("not found: {0}")]
    NotFound(String),
}

impl From<StorageError> for ServiceError {
    fn from(err: StorageError) -> Self {
        ServiceError::Unavailable(err)
    }
}

impl From<SessionError> for ServiceError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::UnknownSession(_) | SessionError::UnknownAttempt { .. } => {
                ServiceError::NotFound(err.to_string())
            }
            SessionError::DuplicateAttempt(_) | SessionError::AlreadyResolved { .. } => {
                ServiceError::InvalidState(err.to_string())
            }
            SessionError::InvalidOutcome => ServiceError::InvalidInput(err.to_string()),
        }
    }
}

impl From<ValidationErrors> for AppError {
    fn from(err: ValidationErrors) -> Self {
        AppError::BadRequest(format!("validation failed: {}", err))
    }
}

impl From<FormRejection> for AppError {
    fn from(rejection: FormRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

/// Application-level errors that are converted to HTTP responses.
#[derive(Debug, Error)]
pub enum AppError {
    /// Bad request with invalid input.
    #[error("bad request: {0}")]
    BadRequest(String),
    /// Requested resource not found.
    #[error("not found: {0}")]
    NotFound(String),
    /// Conflict with current state.
    #[error("conflict: {0}")]
    Conflict(String),
    /// Archive backend unavailable.
    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Unavailable(source) => AppError::ServiceUnavailable(source.to_string()),
            ServiceError::InvalidInput(message) => AppError::BadRequest(message),
            ServiceError::InvalidState(message) => AppError::Conflict(message),
            ServiceError::NotFound(message) => AppError::NotFound(message),
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        };

        let payload = Json(ErrorBody {
            message: self.to_string(),
        });

        (status, payload).into_response()
    }
}

#[cfg(test)]
mod tests {
    use validator::Validate;

    use super::*;
    use crate::state::session::Outcome;

    #[test]
    fn session_errors_map_to_http_statuses() {
        let cases = [
            (
                SessionError::UnknownSession("g1".into()),
                StatusCode::NOT_FOUND,
            ),
            (
                SessionError::UnknownAttempt {
                    session_id: "g1".into(),
                    attempt_id: "a1".into(),
                },
                StatusCode::NOT_FOUND,
            ),
            (
                SessionError::AlreadyResolved {
                    attempt_id: "a1".into(),
                    outcome: Outcome::Made,
                },
                StatusCode::CONFLICT,
            ),
            (SessionError::InvalidOutcome, StatusCode::BAD_REQUEST),
        ];

        for (err, status) in cases {
            let response = AppError::from(ServiceError::from(err)).into_response();
            assert_eq!(response.status(), status);
        }
    }

    #[tokio::test]
    async fn validation_errors_render_as_json_message() {
        let err = crate::dto::session::StartSessionRequest {
            session_id: "a/b".into(),
        }
        .validate()
        .unwrap_err();

        let response = AppError::from(err).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
        let message = value["message"].as_str().unwrap();
        assert!(message.starts_with("bad request: validation failed"));
        assert!(message.contains("session_id"));
    }
}
