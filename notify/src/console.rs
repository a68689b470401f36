//! Console mailer for development mode.

use crate::email::ConfirmationEmail;
use crate::error::DeliveryError;
use crate::mailer::Mailer;
use async_trait::async_trait;
use tracing::info;

/// Logs confirmations instead of sending them.
///
/// Every verify and send succeeds, so records are flagged as sent.
#[derive(Clone, Debug, Default)]
pub struct ConsoleMailer;

impl ConsoleMailer {
    /// Create a console mailer.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Mailer for ConsoleMailer {
    async fn verify(&self, _port: u16) -> Result<(), DeliveryError> {
        Ok(())
    }

    async fn send(&self, port: u16, email: &ConfirmationEmail) -> Result<(), DeliveryError> {
        info!(
            to = %email.to,
            subject = %email.subject,
            port,
            "📧 Confirmation Email (Development Mode)"
        );
        println!("\n╔══════════════════════════════════════════════════════════════╗");
        println!("║ To: {:<57}║", email.to);
        println!("║ Subject: {:<52}║", email.subject);
        println!("╚══════════════════════════════════════════════════════════════╝");
        println!("{}\n", email.body);
        Ok(())
    }
}
