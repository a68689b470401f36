//! Route table and middleware stack.

use crate::handlers::{health, registrations};
use crate::middleware::correlation_id_layer;
use crate::state::AppState;
use axum::{
    Router,
    routing::{get, patch, post},
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Build the full application router.
///
/// Static segments such as `/quote` and `/download` take priority over the
/// `/:id` capture.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_check))
        .route("/health/ready", get(health::readiness))
        .route(
            "/api/registrations",
            post(registrations::create).get(registrations::list),
        )
        .route("/api/registrations/quote", get(registrations::quote))
        .route("/api/registrations/quick", post(registrations::quick_create))
        .route("/api/registrations/search/:query", get(registrations::search))
        .route("/api/registrations/stats/summary", get(registrations::stats))
        .route("/api/registrations/download", get(registrations::download))
        .route(
            "/api/registrations/send-confirmation-email",
            get(registrations::send_confirmation_emails),
        )
        .route(
            "/api/registrations/:id",
            get(registrations::get)
                .put(registrations::update)
                .delete(registrations::delete),
        )
        .route("/api/registrations/:id/verify", patch(registrations::toggle_verified))
        .route("/api/registrations/:id/attendance", patch(registrations::toggle_attendance))
        .route("/api/registrations/:id/payment", patch(registrations::update_payment))
        .layer(TraceLayer::new_for_http())
        .layer(correlation_id_layer())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
