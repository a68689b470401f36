//! Error types for web handlers.
//!
//! [`AppError`] bridges registry errors and HTTP responses. Every error is
//! rendered in the same envelope as successful responses, with
//! `success: false`, so clients branch on one shape.

use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use reunion_core::error::{ConflictField, ExistingRegistration, RegistryError, ValidationErrors};
use serde::Serialize;
use std::fmt;

/// Application error type for web handlers.
///
/// # Examples
///
/// ```ignore
/// async fn handler(State(state): State<AppState>) -> Result<ApiResponse<Registration>, AppError> {
///     let registration = state.service.get(&id).await?;
///     Ok(ApiResponse::data(registration))
/// }
/// ```
#[derive(Debug)]
pub struct AppError {
    /// HTTP status code
    status: StatusCode,
    /// Error message (user-facing)
    message: String,
    /// Error code (for client error handling)
    code: &'static str,
    /// Field-level validation failures
    errors: Option<ValidationErrors>,
    /// Unique key that collided
    field: Option<ConflictField>,
    /// Record the submission collided with
    existing: Option<ExistingRegistration>,
    /// Internal error (for logging, not exposed to client)
    source: Option<anyhow::Error>,
}

impl AppError {
    /// Create a new application error.
    #[must_use]
    pub fn new(status: StatusCode, message: impl Into<String>, code: &'static str) -> Self {
        Self {
            status,
            message: message.into(),
            code,
            errors: None,
            field: None,
            existing: None,
            source: None,
        }
    }

    /// Create a new error with a source error.
    #[must_use]
    pub fn with_source(mut self, source: anyhow::Error) -> Self {
        self.source = Some(source);
        self
    }

    /// Create a 400 Bad Request error.
    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message, "BAD_REQUEST")
    }

    /// Create a 400 error listing every field failure.
    #[must_use]
    pub fn validation(errors: ValidationErrors) -> Self {
        let mut error = Self::new(StatusCode::BAD_REQUEST, "Validation failed", "VALIDATION_ERROR");
        error.errors = Some(errors);
        error
    }

    /// Create a 401 Unauthorized error.
    #[must_use]
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message, "UNAUTHORIZED")
    }

    /// Create a 404 Not Found error.
    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message, "NOT_FOUND")
    }

    /// Create a 409 Conflict error for a taken unique key.
    #[must_use]
    pub fn conflict(field: ConflictField, existing: Option<ExistingRegistration>) -> Self {
        let mut error = Self::new(StatusCode::CONFLICT, field.message(), "CONFLICT");
        error.field = Some(field);
        error.existing = existing;
        error
    }

    /// Create a 500 Internal Server Error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message, "INTERNAL_SERVER_ERROR")
    }

    /// Create a 503 Service Unavailable error.
    #[must_use]
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(StatusCode::SERVICE_UNAVAILABLE, message, "SERVICE_UNAVAILABLE")
    }

    /// HTTP status this error renders with.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }

    /// Client-facing error code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        self.code
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

/// Error response body (JSON).
#[derive(Debug, Serialize)]
struct ErrorResponse {
    success: bool,
    code: &'static str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    errors: Option<ValidationErrors>,
    #[serde(skip_serializing_if = "Option::is_none")]
    field: Option<ConflictField>,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<ExistingRegistration>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            if let Some(source) = &self.source {
                tracing::error!(
                    status = %self.status,
                    code = %self.code,
                    message = %self.message,
                    error = %source,
                    "Internal server error"
                );
            } else {
                tracing::error!(
                    status = %self.status,
                    code = %self.code,
                    message = %self.message,
                    "Internal server error"
                );
            }
        } else {
            tracing::debug!(status = %self.status, code = %self.code, message = %self.message, "Request rejected");
        }

        let body = ErrorResponse {
            success: false,
            code: self.code,
            message: self.message,
            errors: self.errors,
            field: self.field,
            data: self.existing,
        };

        (self.status, Json(body)).into_response()
    }
}

impl From<RegistryError> for AppError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::Validation(errors) => Self::validation(errors),
            RegistryError::Conflict { field, existing } => Self::conflict(field, existing),
            RegistryError::NotFound(_) => Self::not_found("Registration not found"),
            err @ (RegistryError::Storage(_) | RegistryError::Internal(_)) => {
                Self::internal("An internal error occurred").with_source(err.into())
            },
        }
    }
}

/// Convert `anyhow::Error` to `AppError`.
impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        Self::internal("An internal error occurred").with_source(err)
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::bad_request(format!("Invalid JSON body: {}", rejection.body_text()))
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        Self::bad_request(format!("Invalid query string: {}", rejection.body_text()))
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        Self::bad_request(format!("Invalid path: {}", rejection.body_text()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)] // Test code can use unwrap/expect
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    async fn body_json(error: AppError) -> (StatusCode, serde_json::Value) {
        let response = error.into_response();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[test]
    fn test_error_display() {
        let err = AppError::bad_request("Invalid input");
        assert_eq!(err.to_string(), "[BAD_REQUEST] Invalid input");
    }

    #[tokio::test]
    async fn test_validation_lists_every_field() {
        let mut errors = ValidationErrors::new();
        errors.push("email", "must be a valid email address");
        errors.push("mobile", "must be exactly 10 digits");

        let (status, body) = body_json(RegistryError::Validation(errors).into()).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
        assert_eq!(body["code"], "VALIDATION_ERROR");
        assert_eq!(body["errors"].as_array().unwrap().len(), 2);
        assert_eq!(body["errors"][1]["field"], "mobile");
    }

    #[tokio::test]
    async fn test_conflict_carries_field_and_existing() {
        let existing = ExistingRegistration {
            email: "alum1@example.com".to_string(),
            mobile: "9800000001".to_string(),
            created_at: Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
        };
        let err = RegistryError::conflict(ConflictField::Email, Some(existing));

        let (status, body) = body_json(err.into()).await;

        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["field"], "email");
        assert_eq!(body["data"]["mobile"], "9800000001");
        assert!(body["data"]["createdAt"].is_string());
    }

    #[tokio::test]
    async fn test_transaction_conflict_has_no_data() {
        let err = RegistryError::conflict(ConflictField::TransactionId, None);
        let (status, body) = body_json(err.into()).await;

        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["field"], "paymentTransactionId");
        assert!(body.get("data").is_none());
    }

    #[tokio::test]
    async fn test_storage_error_is_generic() {
        let err = RegistryError::Storage("connection refused to 10.0.0.5".to_string());
        let (status, body) = body_json(err.into()).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["message"], "An internal error occurred");
        assert!(!body.to_string().contains("10.0.0.5"));
    }

    #[test]
    fn test_not_found() {
        let err = AppError::from(RegistryError::NotFound("REG00009".to_string()));
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
        assert_eq!(err.code(), "NOT_FOUND");
    }
}
