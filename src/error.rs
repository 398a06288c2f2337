// HTTP API Error Types
use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::{json, Value};

use crate::services::{AuthServiceError, DataError, LeaderboardError};

/// HTTP API error with appropriate status codes and client-friendly messages
#[derive(Debug)]
pub enum ApiError {
    // 400 Bad Request
    BadRequest { message: String, details: Option<Value> },
    ValidationError(String),
    InvalidJson(String),

    // 500 Internal Server Error
    InternalServerError { message: String, details: Option<Value> },
}

impl ApiError {
    /// Get HTTP status code
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            ApiError::ValidationError(_) => StatusCode::BAD_REQUEST,
            ApiError::InvalidJson(_) => StatusCode::BAD_REQUEST,
            ApiError::InternalServerError { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get client-safe error message
    pub fn message(&self) -> &str {
        match self {
            ApiError::BadRequest { message, .. } => message,
            ApiError::ValidationError(msg) => msg,
            ApiError::InvalidJson(msg) => msg,
            ApiError::InternalServerError { message, .. } => message,
        }
    }

    /// Get error code for client handling
    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::BadRequest { .. } => "BAD_REQUEST",
            ApiError::ValidationError(_) => "VALIDATION_ERROR",
            ApiError::InvalidJson(_) => "INVALID_JSON",
            ApiError::InternalServerError { .. } => "INTERNAL_SERVER_ERROR",
        }
    }

    pub fn details(&self) -> Option<&Value> {
        match self {
            ApiError::BadRequest { details, .. } | ApiError::InternalServerError { details, .. } => details.as_ref(),
            _ => None,
        }
    }

    /// Auth routes read `error`, data routes read `message`; both carry the same text.
    pub fn to_json(&self) -> Value {
        let mut body = json!({
            "success": false,
            "error": self.message(),
            "message": self.message(),
            "code": self.error_code(),
        });
        if let Some(details) = self.details() {
            body["details"] = details.clone();
        }
        body
    }
}

// Static constructor methods
impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest {
            message: message.into(),
            details: None,
        }
    }

    pub fn validation_error(message: impl Into<String>) -> Self {
        ApiError::ValidationError(message.into())
    }

    pub fn invalid_json(message: impl Into<String>) -> Self {
        ApiError::InvalidJson(message.into())
    }

    pub fn internal_server_error(message: impl Into<String>) -> Self {
        ApiError::InternalServerError {
            message: message.into(),
            details: None,
        }
    }

    /// Insert, update and delete report every failure as a client error.
    pub fn from_write_error(err: DataError) -> Self {
        match err {
            DataError::Validation(e) => ApiError::validation_error(e.to_string()),
            DataError::Query { details } => ApiError::BadRequest {
                message: "Error executing the query.".to_string(),
                details,
            },
        }
    }
}

// Select semantics: validation is the client's fault, a failed query is ours
impl From<DataError> for ApiError {
    fn from(err: DataError) -> Self {
        match err {
            DataError::Validation(e) => ApiError::validation_error(e.to_string()),
            DataError::Query { details } => ApiError::InternalServerError {
                message: "Error executing the query.".to_string(),
                details,
            },
        }
    }
}

impl From<AuthServiceError> for ApiError {
    fn from(err: AuthServiceError) -> Self {
        match err {
            AuthServiceError::Validation(e) => ApiError::validation_error(e.to_string()),
            other => ApiError::bad_request(other.to_string()),
        }
    }
}

impl From<LeaderboardError> for ApiError {
    fn from(err: LeaderboardError) -> Self {
        let details = Some(err.details());
        let message = match &err {
            LeaderboardError::Data(_) => "An error occurred in the query.".to_string(),
            stage => stage.to_string(),
        };
        ApiError::InternalServerError { message, details }
    }
}

// Standard error trait implementations
impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for ApiError {}

// Automatic HTTP response conversion for Axum
impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        (self.status_code(), Json(self.to_json())).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::ValidationError;

    #[test]
    fn validation_errors_are_400_with_both_keys() {
        let err: ApiError = DataError::Validation(ValidationError::UnknownTable("x".into())).into();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        let body = err.to_json();
        assert_eq!(body["error"], json!("Invalid table."));
        assert_eq!(body["message"], json!("Invalid table."));
        assert_eq!(body["code"], json!("VALIDATION_ERROR"));
    }

    #[test]
    fn select_query_errors_are_500_but_writes_are_400() {
        let details = Some(json!({"hint": "x"}));
        let select: ApiError = DataError::Query { details: details.clone() }.into();
        assert_eq!(select.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(select.to_json()["details"], json!({"hint": "x"}));

        let write = ApiError::from_write_error(DataError::Query { details });
        assert_eq!(write.status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn auth_failures_are_always_400() {
        let save: ApiError = AuthServiceError::SaveUserData { user_id: "u".into() }.into();
        assert_eq!(save.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(save.message(), "Error saving the user data.");

        let rejected: ApiError = AuthServiceError::Rejected("User already registered".into()).into();
        assert_eq!(rejected.to_json()["error"], json!("User already registered"));
    }

    #[test]
    fn leaderboard_stages_are_500_with_details() {
        let err: ApiError = LeaderboardError::NoSessions.into();
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.message(), "No sessions found for the game.");
        assert!(err.to_json()["details"].is_string());
    }
}
