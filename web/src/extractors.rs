//! Custom Axum extractors.
//!
//! - [`AdminAuth`]: bearer-token guard for admin routes
//! - [`CorrelationId`]: the request's correlation ID
//! - [`ClientIp`]: client IP address from proxy headers
//!
//! # Examples
//!
//! ```ignore
//! async fn handler(
//!     _admin: AdminAuth,
//!     State(state): State<AppState>,
//!     client_ip: ClientIp,
//! ) -> Result<ApiResponse<Stats>, AppError> {
//!     tracing::info!(client_ip = %client_ip.0, "Serving statistics");
//!     Ok(ApiResponse::data(state.service.stats().await?))
//! }
//! ```

use crate::error::AppError;
use crate::middleware::CORRELATION_ID_HEADER;
use crate::state::AppState;
use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{HeaderMap, header, request::Parts},
};
use std::net::{IpAddr, Ipv4Addr};
use uuid::Uuid;

/// Proof that the request carried the admin bearer token.
///
/// Add it as a handler argument to protect the route. Missing, malformed and
/// wrong tokens are all rejected with the same 401.
#[derive(Debug, Clone, Copy)]
pub struct AdminAuth;

#[async_trait]
impl FromRequestParts<AppState> for AdminAuth {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        match bearer_token(&parts.headers) {
            Some(token) if state.admin_token_matches(token) => Ok(Self),
            presented => {
                metrics::counter!("reunion_admin_auth_failures_total").increment(1);
                tracing::warn!(
                    path = %parts.uri.path(),
                    token_present = presented.is_some(),
                    "Admin request rejected"
                );
                Err(AppError::unauthorized("Admin authentication required"))
            },
        }
    }
}

/// The token from an `Authorization: Bearer <token>` header.
fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

/// Correlation ID for request tracing.
///
/// Prefers the ID the correlation middleware stored on the request, then the
/// `X-Correlation-ID` header, and generates a UUID v4 otherwise.
#[derive(Debug, Clone, Copy)]
pub struct CorrelationId(pub Uuid);

#[async_trait]
impl<S> FromRequestParts<S> for CorrelationId
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let correlation_id = parts.extensions.get::<Uuid>().copied().unwrap_or_else(|| {
            parts
                .headers
                .get(CORRELATION_ID_HEADER)
                .and_then(|v| v.to_str().ok())
                .and_then(|s| Uuid::parse_str(s).ok())
                .unwrap_or_else(Uuid::new_v4)
        });

        Ok(Self(correlation_id))
    }
}

/// Client IP address.
///
/// # Priority
///
/// 1. `X-Forwarded-For` (first IP in the list)
/// 2. `X-Real-IP`
/// 3. Localhost
#[derive(Debug, Clone, Copy)]
pub struct ClientIp(pub IpAddr);

#[async_trait]
impl<S> FromRequestParts<S> for ClientIp
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(extract_client_ip(&parts.headers)))
    }
}

fn extract_client_ip(headers: &HeaderMap) -> IpAddr {
    let forwarded = headers
        .get("X-Forwarded-For")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .and_then(|ip| ip.trim().parse().ok());

    forwarded
        .or_else(|| {
            headers
                .get("X-Real-IP")
                .and_then(|v| v.to_str().ok())
                .and_then(|ip| ip.trim().parse().ok())
        })
        .unwrap_or(IpAddr::V4(Ipv4Addr::LOCALHOST))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)] // Test code can use unwrap/expect
mod tests {
    use super::*;
    use axum::http::Request;

    fn headers(pairs: &[(&str, &str)]) -> HeaderMap {
        let mut builder = Request::builder();
        for (name, value) in pairs {
            builder = builder.header(*name, *value);
        }
        builder.body(()).unwrap().into_parts().0.headers
    }

    #[test]
    fn test_bearer_token_parsing() {
        assert_eq!(bearer_token(&headers(&[("Authorization", "Bearer s3cret")])), Some("s3cret"));
        assert_eq!(bearer_token(&headers(&[("Authorization", "bearer s3cret ")])), Some("s3cret"));
        assert_eq!(bearer_token(&headers(&[("Authorization", "Basic s3cret")])), None);
        assert_eq!(bearer_token(&headers(&[("Authorization", "Bearer ")])), None);
        assert_eq!(bearer_token(&headers(&[])), None);
    }

    #[tokio::test]
    async fn test_correlation_id_from_header() {
        let uuid = Uuid::new_v4();
        let req = Request::builder()
            .header(CORRELATION_ID_HEADER, uuid.to_string())
            .body(())
            .expect("Valid request");

        let (mut parts, _) = req.into_parts();
        let correlation_id = CorrelationId::from_request_parts(&mut parts, &())
            .await
            .expect("Should extract");

        assert_eq!(correlation_id.0, uuid);
    }

    #[tokio::test]
    async fn test_correlation_id_prefers_extension() {
        let stored = Uuid::new_v4();
        let req = Request::builder()
            .header(CORRELATION_ID_HEADER, Uuid::new_v4().to_string())
            .body(())
            .expect("Valid request");

        let (mut parts, _) = req.into_parts();
        parts.extensions.insert(stored);
        let correlation_id = CorrelationId::from_request_parts(&mut parts, &())
            .await
            .expect("Should extract");

        assert_eq!(correlation_id.0, stored);
    }

    #[test]
    fn test_client_ip_priority() {
        let forwarded = headers(&[("X-Forwarded-For", "203.0.113.1, 198.51.100.1"), ("X-Real-IP", "198.51.100.42")]);
        assert_eq!(extract_client_ip(&forwarded).to_string(), "203.0.113.1");

        let real = headers(&[("X-Real-IP", "198.51.100.42")]);
        assert_eq!(extract_client_ip(&real).to_string(), "198.51.100.42");

        assert_eq!(extract_client_ip(&headers(&[])).to_string(), "127.0.0.1");
    }
}
