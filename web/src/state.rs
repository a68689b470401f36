//! Application state for Axum handlers.

use constant_time_eq::constant_time_eq;
use reunion_core::service::RegistrationService;
use std::sync::Arc;

/// Application state shared across all HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    /// Registration use cases
    pub service: RegistrationService,
    admin_token: Arc<str>,
}

impl AppState {
    /// Create a new application state.
    ///
    /// An empty `admin_token` locks every admin route.
    #[must_use]
    pub fn new(service: RegistrationService, admin_token: impl Into<Arc<str>>) -> Self {
        Self {
            service,
            admin_token: admin_token.into(),
        }
    }

    /// Whether `presented` matches the configured admin token.
    ///
    /// Compared in constant time; always `false` when no token is configured.
    #[must_use]
    pub fn admin_token_matches(&self, presented: &str) -> bool {
        !self.admin_token.is_empty() && constant_time_eq(presented.as_bytes(), self.admin_token.as_bytes())
    }
}
