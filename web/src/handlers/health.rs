//! Health check endpoints.
//!
//! These endpoints are used by load balancers and monitoring systems
//! to verify service health.

use crate::error::AppError;
use crate::response::ApiResponse;
use crate::state::AppState;
use axum::extract::State;

/// Liveness: the process is serving requests.
///
/// Does NOT check dependencies.
///
/// ```text
/// GET /health
/// ```
#[allow(clippy::unused_async)]
pub async fn health_check() -> ApiResponse<()> {
    ApiResponse::message("ok")
}

/// Readiness: the registration store answers.
///
/// # Status Codes
///
/// - 200 OK: store reachable
/// - 503 Service Unavailable: store unreachable
///
/// ```text
/// GET /health/ready
/// ```
///
/// # Errors
///
/// 503 when the store health check fails.
pub async fn readiness(State(state): State<AppState>) -> Result<ApiResponse<()>, AppError> {
    state.service.health().await.map_err(|e| {
        tracing::warn!(error = %e, "Readiness check failed");
        AppError::unavailable("Registration store unavailable")
    })?;
    Ok(ApiResponse::message("ready"))
}
