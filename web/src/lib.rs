//! # Reunion Web
//!
//! Axum HTTP API over [`RegistrationService`](reunion_core::RegistrationService).
//!
//! Handlers are thin: extract, call the service, wrap the result in the
//! response envelope. All business rules live in `reunion-core`.
//!
//! # Request Flow
//!
//! 1. **Middleware** assigns a correlation ID and opens a tracing span
//! 2. **Extractors** check admin auth and parse path, query and body
//! 3. **Service** validates, checks duplicates, persists, queues email
//! 4. **Response** is `{ success, message?, data?, pagination? }`, or the
//!    same envelope with `success: false` from [`AppError`]
//!
//! # Example
//!
//! ```ignore
//! let state = AppState::new(service, config.admin.token.clone());
//! let app = reunion_web::router(state);
//! axum::serve(listener, app).await?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod export;
pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod response;
pub mod router;
pub mod state;

// Re-export key types for convenience
pub use error::AppError;
pub use extractors::{AdminAuth, ClientIp, CorrelationId};
pub use middleware::{CORRELATION_ID_HEADER, correlation_id_layer};
pub use response::{ApiResponse, RegistrationView};
pub use router::router;
pub use state::AppState;

/// Result type alias for web handlers.
pub type WebResult<T> = Result<T, AppError>;
