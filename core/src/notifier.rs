//! Hand-off point for confirmation emails.

use crate::types::Registration;

/// Accepts registrations for background confirmation delivery.
///
/// `enqueue` must not block or fail the caller. Returns `false` when the job
/// was not accepted (queue full or shut down); the record then stays unsent
/// until the next resend.
pub trait Notifier: Send + Sync {
    /// Queue a confirmation for `registration`.
    fn enqueue(&self, registration: Registration) -> bool;
}
