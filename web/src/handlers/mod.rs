//! HTTP request handlers.

pub mod health;
pub mod registrations;

pub use health::{health_check, readiness};
