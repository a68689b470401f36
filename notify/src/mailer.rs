//! Mail transport seam.

use crate::email::ConfirmationEmail;
use crate::error::DeliveryError;
use async_trait::async_trait;

/// Something that can check a port and deliver an email through it.
///
/// Implementations:
/// - [`SmtpMailer`](crate::smtp::SmtpMailer): real SMTP via lettre
/// - [`ConsoleMailer`](crate::console::ConsoleMailer): logs instead of sending
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Check that a session can be opened on `port`.
    ///
    /// # Errors
    ///
    /// Returns a categorised failure when the server cannot be reached or
    /// rejects the session.
    async fn verify(&self, port: u16) -> Result<(), DeliveryError>;

    /// Deliver `email` through `port`.
    ///
    /// # Errors
    ///
    /// Returns a categorised failure when delivery is refused or interrupted.
    async fn send(&self, port: u16, email: &ConfirmationEmail) -> Result<(), DeliveryError>;
}
