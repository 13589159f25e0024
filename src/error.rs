//! Structured error types for API responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Error codes for programmatic error handling.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Caller errors
    ValidationError,
    NotFound,
    Unauthorized,
    Forbidden,

    // State conflicts
    Conflict,
    AlreadyCompleted,

    // Dependency failures
    UpstreamUnavailable,
    InternalError,
}

impl ErrorCode {
    /// HTTP status for this code.
    pub fn status(self) -> StatusCode {
        match self {
            ErrorCode::ValidationError => StatusCode::BAD_REQUEST,
            ErrorCode::NotFound => StatusCode::NOT_FOUND,
            ErrorCode::Unauthorized => StatusCode::UNAUTHORIZED,
            ErrorCode::Forbidden => StatusCode::FORBIDDEN,
            ErrorCode::Conflict | ErrorCode::AlreadyCompleted => StatusCode::CONFLICT,
            ErrorCode::UpstreamUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            ErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Structured error returned by every service operation.
#[derive(Debug, Serialize, Error)]
#[error("{message}")]
pub struct ApiError {
    pub code: ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            field: None,
            details: None,
        }
    }

    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    // Convenience constructors

    pub fn missing_field(field: &str) -> Self {
        Self::new(ErrorCode::ValidationError, format!("{} is required", field)).with_field(field)
    }

    pub fn invalid_value(field: &str, reason: impl Into<String>) -> Self {
        Self::new(ErrorCode::ValidationError, reason).with_field(field)
    }

    pub fn task_not_found(task_id: &str) -> Self {
        Self::new(ErrorCode::NotFound, format!("Task not found: {}", task_id))
    }

    pub fn user_not_found(user_id: &str) -> Self {
        Self::new(ErrorCode::NotFound, format!("User not found: {}", user_id))
    }

    pub fn referral_not_found(referral_id: &str) -> Self {
        Self::new(
            ErrorCode::NotFound,
            format!("Referral not found: {}", referral_id),
        )
    }

    /// Missing or unknown credentials. The message never says which.
    pub fn unauthorized() -> Self {
        Self::new(ErrorCode::Unauthorized, "Authentication required")
    }

    /// Caller lacks the role or scope. The message never says why.
    pub fn forbidden() -> Self {
        Self::new(ErrorCode::Forbidden, "Forbidden")
    }

    pub fn open_task_exists(task_id: &str) -> Self {
        Self::new(
            ErrorCode::Conflict,
            "Complete the task in progress before starting another",
        )
        .with_details(format!("open task: {}", task_id))
    }

    pub fn version_conflict(task_id: &str, expected: i64, actual: i64) -> Self {
        Self::new(
            ErrorCode::Conflict,
            format!("Task {} was modified concurrently", task_id),
        )
        .with_details(format!("expected version {}, found {}", expected, actual))
    }

    pub fn already_completed(task_id: &str) -> Self {
        Self::new(
            ErrorCode::AlreadyCompleted,
            format!("Task {} is already completed", task_id),
        )
    }

    /// The cause is logged here and kept out of the response body.
    pub fn upstream(err: impl fmt::Display) -> Self {
        tracing::warn!(error = %err, "Storage failure");
        Self::new(ErrorCode::UpstreamUnavailable, "Storage unavailable")
    }

    pub fn internal(err: impl fmt::Display) -> Self {
        Self::new(ErrorCode::InternalError, err.to_string())
    }
}

// Store-layer errors arrive as anyhow; keep any ApiError that was raised inside
// a closure and classify database failures as upstream.
impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        match err.downcast::<ApiError>() {
            Ok(api_err) => api_err,
            Err(err) => {
                if err.downcast_ref::<rusqlite::Error>().is_some() {
                    ApiError::upstream(err)
                } else {
                    ApiError::internal(err)
                }
            }
        }
    }
}

impl From<rusqlite::Error> for ApiError {
    fn from(err: rusqlite::Error) -> Self {
        ApiError::upstream(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.code.status();
        if status.is_server_error() {
            tracing::error!(code = ?self.code, message = %self.message, details = ?self.details, "Request failed");
        } else {
            tracing::debug!(code = ?self.code, message = %self.message, "Request rejected");
        }
        (status, Json(self)).into_response()
    }
}

/// Result type for service operations.
pub type ApiResult<T> = std::result::Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_map_to_statuses() {
        assert_eq!(ErrorCode::ValidationError.status(), StatusCode::BAD_REQUEST);
        assert_eq!(ErrorCode::NotFound.status(), StatusCode::NOT_FOUND);
        assert_eq!(ErrorCode::Unauthorized.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(ErrorCode::Forbidden.status(), StatusCode::FORBIDDEN);
        assert_eq!(ErrorCode::Conflict.status(), StatusCode::CONFLICT);
        assert_eq!(ErrorCode::AlreadyCompleted.status(), StatusCode::CONFLICT);
        assert_eq!(
            ErrorCode::UpstreamUnavailable.status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn serializes_without_empty_fields() {
        let json = serde_json::to_value(ApiError::forbidden()).unwrap();
        assert_eq!(json["code"], "FORBIDDEN");
        assert!(json.get("field").is_none());
        assert!(json.get("details").is_none());

        let json = serde_json::to_value(ApiError::missing_field("queueName")).unwrap();
        assert_eq!(json["code"], "VALIDATION_ERROR");
        assert_eq!(json["field"], "queueName");
    }

    #[test]
    fn anyhow_roundtrip_keeps_api_error() {
        let err: anyhow::Error = ApiError::task_not_found("abc").into();
        let back = ApiError::from(err);
        assert_eq!(back.code, ErrorCode::NotFound);
    }

    #[test]
    fn sqlite_failures_are_upstream() {
        let err: anyhow::Error = rusqlite::Error::InvalidQuery.into();
        assert_eq!(ApiError::from(err).code, ErrorCode::UpstreamUnavailable);
    }

    #[test]
    fn upstream_body_hides_storage_details() {
        let err = ApiError::from(rusqlite::Error::InvalidColumnName("api_token".into()));
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["code"], "UPSTREAM_UNAVAILABLE");
        assert_eq!(json["message"], "Storage unavailable");
        assert!(json.get("details").is_none());
    }
}
