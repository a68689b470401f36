//! Service metrics.
//!
//! # Exported Metrics
//!
//! ## Counters
//! - `reunion_registrations_total` - Registrations created
//! - `reunion_conflicts_total{field}` - Submissions rejected for a taken key
//! - `reunion_registration_id_fallbacks_total` - IDs issued without the sequence
//! - `reunion_emails_total{outcome}` - Confirmation deliveries by outcome
//! - `reunion_email_queue_rejections_total` - Confirmations dropped on a full queue
//! - `reunion_http_responses_total{method,status}` - Responses by status class
//! - `reunion_admin_auth_failures_total` - Rejected admin requests

use metrics::describe_counter;
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;

/// Register descriptions for every metric the service records.
///
/// Call once at startup, after the recorder is installed.
pub fn register_metrics() {
    describe_counter!("reunion_registrations_total", "Registrations created");
    describe_counter!(
        "reunion_conflicts_total",
        "Submissions rejected because an email, mobile or transaction ID was taken"
    );
    describe_counter!(
        "reunion_registration_id_fallbacks_total",
        "Registration IDs issued from the timestamp fallback instead of the sequence"
    );
    describe_counter!("reunion_emails_total", "Confirmation email deliveries by outcome (sent, failed)");
    describe_counter!(
        "reunion_email_queue_rejections_total",
        "Confirmation emails dropped because the queue was full"
    );
    describe_counter!(
        "reunion_http_responses_total",
        "HTTP responses by method and status class"
    );
    describe_counter!("reunion_admin_auth_failures_total", "Admin requests rejected for a bad or missing token");

    tracing::debug!("Metrics registered");
}

/// Serve Prometheus metrics on `addr` at `/metrics`.
///
/// # Errors
///
/// Fails if the recorder is already installed or the listener cannot bind.
pub fn install_exporter(addr: SocketAddr) -> anyhow::Result<()> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    register_metrics();
    tracing::info!(%addr, "Prometheus metrics available at /metrics");
    Ok(())
}
