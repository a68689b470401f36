//! Registration endpoints.
//!
//! Public: create and quote. Everything else requires [`AdminAuth`].
//! Record keys in paths accept either the internal UUID or the
//! human-readable registration ID.

use crate::error::AppError;
use crate::export;
use crate::extractors::{AdminAuth, ClientIp, CorrelationId};
use crate::response::{ApiResponse, RegistrationView, views};
use crate::state::AppState;
use axum::{
    Json,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    http::header,
    response::{IntoResponse, Response},
};
use reunion_core::pricing::Quote;
use reunion_core::query::{ListParams, PageInfo, QuoteParams};
use reunion_core::service::ResendSummary;
use reunion_core::stats::RegistrationStats;
use serde_json::Value;
use tracing::info;

type Body = Result<Json<Value>, JsonRejection>;

/// Create a registration from the public form.
///
/// ```text
/// POST /api/registrations
/// ```
///
/// # Errors
///
/// 400 on validation failure, 409 on a taken email, mobile or transaction ID.
pub async fn create(
    State(state): State<AppState>,
    client_ip: ClientIp,
    correlation_id: CorrelationId,
    payload: Body,
) -> Result<ApiResponse<RegistrationView>, AppError> {
    let Json(payload) = payload?;
    let registration = state.service.register(&payload).await?;
    info!(
        registration_id = %registration.registration_id,
        client_ip = %client_ip.0,
        correlation_id = %correlation_id.0,
        "Registration received"
    );
    Ok(ApiResponse::created(registration.into()).with_message("Registration successful"))
}

/// Create a registration on someone's behalf (desk sign-up).
///
/// Same validation, duplicate checks and confirmation as [`create`].
///
/// ```text
/// POST /api/registrations/quick
/// ```
///
/// # Errors
///
/// 401 without admin auth; otherwise as [`create`].
pub async fn quick_create(
    _admin: AdminAuth,
    State(state): State<AppState>,
    correlation_id: CorrelationId,
    payload: Body,
) -> Result<ApiResponse<RegistrationView>, AppError> {
    let Json(payload) = payload?;
    let registration = state.service.register(&payload).await?;
    info!(
        registration_id = %registration.registration_id,
        correlation_id = %correlation_id.0,
        "Quick registration created"
    );
    Ok(ApiResponse::created(registration.into()).with_message("Registration successful"))
}

/// Itemised contribution for a cohort and party size.
///
/// ```text
/// GET /api/registrations/quote?batch=Batch%205&adults=2&children=1
/// ```
///
/// # Errors
///
/// 400 when `batch` is missing or a count is malformed.
pub async fn quote(
    State(state): State<AppState>,
    params: Result<Query<QuoteParams>, QueryRejection>,
) -> Result<ApiResponse<Quote>, AppError> {
    let Query(params) = params?;
    let (batch, attendees) = params.parse().map_err(AppError::validation)?;
    Ok(ApiResponse::data(state.service.quote(batch, &attendees)))
}

/// Paginated, filtered, sorted list.
///
/// ```text
/// GET /api/registrations?page=1&limit=10&sortBy=createdAt&sortOrder=desc
/// ```
///
/// # Errors
///
/// 400 on malformed parameters.
pub async fn list(
    _admin: AdminAuth,
    State(state): State<AppState>,
    params: Result<Query<ListParams>, QueryRejection>,
) -> Result<ApiResponse<Vec<RegistrationView>>, AppError> {
    let Query(params) = params?;
    let query = params.parse().map_err(AppError::validation)?;
    let page = state.service.list(&query).await?;
    let pagination = PageInfo::new(query.page, query.limit, page.total);
    Ok(ApiResponse::data(views(page.items)).with_pagination(pagination))
}

/// One record.
///
/// ```text
/// GET /api/registrations/:id
/// ```
///
/// # Errors
///
/// 404 for an unknown key.
pub async fn get(
    _admin: AdminAuth,
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<ApiResponse<RegistrationView>, AppError> {
    Ok(ApiResponse::data(state.service.get(&key).await?.into()))
}

/// Apply an admin edit.
///
/// ```text
/// PUT /api/registrations/:id
/// ```
///
/// # Errors
///
/// 404 for an unknown key, 400 on validation failure, 409 on a taken key.
pub async fn update(
    _admin: AdminAuth,
    State(state): State<AppState>,
    Path(key): Path<String>,
    payload: Body,
) -> Result<ApiResponse<RegistrationView>, AppError> {
    let Json(payload) = payload?;
    let registration = state.service.update(&key, &payload).await?;
    Ok(ApiResponse::data(registration.into()).with_message("Registration updated"))
}

/// Remove a record.
///
/// ```text
/// DELETE /api/registrations/:id
/// ```
///
/// # Errors
///
/// 404 for an unknown key.
pub async fn delete(
    _admin: AdminAuth,
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<ApiResponse<RegistrationView>, AppError> {
    let removed = state.service.delete(&key).await?;
    Ok(ApiResponse::data(removed.into()).with_message("Registration deleted"))
}

/// Flip the verified flag.
///
/// ```text
/// PATCH /api/registrations/:id/verify
/// ```
///
/// # Errors
///
/// 404 for an unknown key.
pub async fn toggle_verified(
    _admin: AdminAuth,
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<ApiResponse<RegistrationView>, AppError> {
    let registration = state.service.toggle_verified(&key).await?;
    let message = if registration.verified {
        "Registration verified"
    } else {
        "Registration marked unverified"
    };
    Ok(ApiResponse::data(registration.into()).with_message(message))
}

/// Flip the attendance flag.
///
/// ```text
/// PATCH /api/registrations/:id/attendance
/// ```
///
/// # Errors
///
/// 404 for an unknown key.
pub async fn toggle_attendance(
    _admin: AdminAuth,
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<ApiResponse<RegistrationView>, AppError> {
    let registration = state.service.toggle_attendance(&key).await?;
    let message = if registration.attended {
        "Attendance marked"
    } else {
        "Attendance cleared"
    };
    Ok(ApiResponse::data(registration.into()).with_message(message))
}

/// Change payment status and/or transaction ID.
///
/// ```text
/// PATCH /api/registrations/:id/payment
/// { "paymentStatus": "completed", "paymentTransactionId": "TXN1" }
/// ```
///
/// # Errors
///
/// 404 for an unknown key, 400 on validation failure, 409 on a taken
/// transaction ID.
pub async fn update_payment(
    _admin: AdminAuth,
    State(state): State<AppState>,
    Path(key): Path<String>,
    payload: Body,
) -> Result<ApiResponse<RegistrationView>, AppError> {
    let Json(payload) = payload?;
    let registration = state.service.update_payment(&key, &payload).await?;
    Ok(ApiResponse::data(registration.into()).with_message("Payment updated"))
}

/// Exact lookup by transaction ID, email or registration ID.
///
/// ```text
/// GET /api/registrations/search/:query
/// ```
///
/// # Errors
///
/// 404 when nothing matches.
pub async fn search(
    _admin: AdminAuth,
    State(state): State<AppState>,
    Path(term): Path<String>,
) -> Result<ApiResponse<Vec<RegistrationView>>, AppError> {
    let found = state.service.search(term.trim()).await?;
    if found.is_empty() {
        return Err(AppError::not_found("No registration matches the search"));
    }
    Ok(ApiResponse::data(views(found)))
}

/// Aggregate statistics.
///
/// ```text
/// GET /api/registrations/stats/summary
/// ```
///
/// # Errors
///
/// 500 on storage failure.
pub async fn stats(_admin: AdminAuth, State(state): State<AppState>) -> Result<ApiResponse<RegistrationStats>, AppError> {
    Ok(ApiResponse::data(state.service.stats().await?))
}

/// Every record as a CSV download.
///
/// ```text
/// GET /api/registrations/download
/// ```
///
/// # Errors
///
/// 500 on storage failure.
pub async fn download(_admin: AdminAuth, State(state): State<AppState>) -> Result<Response, AppError> {
    let registrations = state.service.export().await?;
    let csv = export::to_csv(&registrations)?;
    info!(rows = registrations.len(), "Registrations exported");
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (header::CONTENT_DISPOSITION, "attachment; filename=\"registrations.csv\""),
        ],
        csv,
    )
        .into_response())
}

/// Queue a confirmation for every record whose email was never delivered.
///
/// ```text
/// GET /api/registrations/send-confirmation-email
/// ```
///
/// # Errors
///
/// 500 on storage failure.
pub async fn send_confirmation_emails(
    _admin: AdminAuth,
    State(state): State<AppState>,
) -> Result<ApiResponse<ResendSummary>, AppError> {
    let summary = state.service.resend_unsent().await?;
    let message = format!(
        "Queued {} of {} pending confirmation emails",
        summary.queued, summary.pending
    );
    Ok(ApiResponse::data(summary).with_message(message))
}
