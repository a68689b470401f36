//! Success envelope.
//!
//! Every JSON response has the shape
//! `{ success, message?, data?, pagination? }`; errors add `errors`,
//! `field` and `code` (see [`AppError`](crate::AppError)).

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use reunion_core::query::PageInfo;
use reunion_core::types::Registration;
use serde::Serialize;

/// Successful JSON response.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    #[serde(skip)]
    status: StatusCode,
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pagination: Option<PageInfo>,
}

impl<T: Serialize> ApiResponse<T> {
    /// 200 carrying `data`.
    #[must_use]
    pub fn data(data: T) -> Self {
        Self {
            status: StatusCode::OK,
            success: true,
            message: None,
            data: Some(data),
            pagination: None,
        }
    }

    /// 201 carrying the created resource.
    #[must_use]
    pub fn created(data: T) -> Self {
        Self {
            status: StatusCode::CREATED,
            ..Self::data(data)
        }
    }

    /// Attach a human-readable message.
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Attach pagination metadata.
    #[must_use]
    pub fn with_pagination(mut self, pagination: PageInfo) -> Self {
        self.pagination = Some(pagination);
        self
    }
}

impl ApiResponse<()> {
    /// 200 with a message and no data.
    #[must_use]
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::OK,
            success: true,
            message: Some(message.into()),
            data: None,
            pagination: None,
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        (self.status, Json(self)).into_response()
    }
}

/// A registration as returned to clients, with derived totals.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationView {
    #[serde(flatten)]
    registration: Registration,
    total_attendees: u32,
}

impl From<Registration> for RegistrationView {
    fn from(registration: Registration) -> Self {
        Self {
            total_attendees: registration.total_attendees(),
            registration,
        }
    }
}

/// Views over a list of registrations, order preserved.
#[must_use]
pub fn views(registrations: Vec<Registration>) -> Vec<RegistrationView> {
    registrations.into_iter().map(RegistrationView::from).collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)] // Test code can use unwrap/expect
mod tests {
    use super::*;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_created_envelope() {
        let response = ApiResponse::created(serde_json::json!({"id": 1}))
            .with_message("Registration successful")
            .into_response();

        assert_eq!(response.status(), StatusCode::CREATED);
        let body = body_json(response).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["message"], "Registration successful");
        assert_eq!(body["data"]["id"], 1);
        assert!(body.get("pagination").is_none());
    }

    #[tokio::test]
    async fn test_pagination_is_camel_case() {
        let response = ApiResponse::data(Vec::<u8>::new())
            .with_pagination(PageInfo::new(2, 10, 25))
            .into_response();

        let body = body_json(response).await;
        assert_eq!(body["pagination"]["pages"], 3);
        assert_eq!(body["pagination"]["hasNext"], true);
        assert_eq!(body["pagination"]["hasPrev"], true);
    }

    #[tokio::test]
    async fn test_message_only() {
        let body = body_json(ApiResponse::message("Deleted").into_response()).await;
        assert_eq!(body["message"], "Deleted");
        assert!(body.get("data").is_none());
    }
}
