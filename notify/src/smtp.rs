//! SMTP mailer implementation using Lettre.

use crate::config::MailerConfig;
use crate::email::ConfirmationEmail;
use crate::error::{DeliveryError, FailureSignals, classify};
use crate::mailer::Mailer;
use async_trait::async_trait;
use lettre::message::Mailbox;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::transport::smtp::client::{Tls, TlsParameters};
use lettre::{Address, Message, SmtpTransport, Transport};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Implicit-TLS submission port.
const SMTPS_PORT: u16 = 465;

/// Plain relay port, STARTTLS when offered.
const RELAY_PORT: u16 = 25;

/// Extra time allowed for the blocking task beyond lettre's own socket timeout.
const TASK_GRACE: Duration = Duration::from_secs(1);

/// SMTP mailer.
///
/// Builds a fresh transport for every attempt so that each port gets the
/// transport security it expects:
///
/// - 465: implicit TLS
/// - 25: STARTTLS when the server offers it
/// - anything else: STARTTLS required
///
/// Lettre's SMTP client is blocking, so each attempt runs on
/// `spawn_blocking` bounded by the configured timeout.
#[derive(Clone)]
pub struct SmtpMailer {
    config: Arc<MailerConfig>,
    credentials: Credentials,
    sender: Mailbox,
}

impl SmtpMailer {
    /// Create an SMTP mailer.
    ///
    /// # Errors
    ///
    /// Returns an error when credentials are missing or no valid sender
    /// address can be derived.
    pub fn new(config: Arc<MailerConfig>) -> Result<Self, DeliveryError> {
        let (Some(username), Some(password)) = (config.username.clone(), config.password.clone()) else {
            return Err(DeliveryError::auth("SMTP credentials are not configured"));
        };
        let address: Address = config
            .sender_address()
            .ok_or_else(|| DeliveryError::unknown("no sender address configured"))?
            .parse()
            .map_err(|e| DeliveryError::unknown(format!("Invalid from address: {e}")))?;
        let sender = Mailbox::new(Some(config.from_name.clone()), address);

        Ok(Self {
            credentials: Credentials::new(username, password),
            config,
            sender,
        })
    }

    fn transport(&self, port: u16) -> Result<SmtpTransport, DeliveryError> {
        let host = self.config.host.as_str();
        let builder = match port {
            SMTPS_PORT => SmtpTransport::relay(host).map_err(|e| transport_error(&e))?,
            RELAY_PORT => {
                let parameters = TlsParameters::new(host.to_string()).map_err(|e| transport_error(&e))?;
                SmtpTransport::builder_dangerous(host).tls(Tls::Opportunistic(parameters))
            },
            _ => SmtpTransport::starttls_relay(host).map_err(|e| transport_error(&e))?,
        };

        Ok(builder
            .port(port)
            .credentials(self.credentials.clone())
            .timeout(Some(self.config.timeout))
            .build())
    }

    fn message(&self, email: &ConfirmationEmail) -> Result<Message, DeliveryError> {
        let address: Address = email
            .to
            .parse()
            .map_err(|e| DeliveryError::unknown(format!("Invalid to address: {e}")))?;

        Message::builder()
            .from(self.sender.clone())
            .to(Mailbox::new(Some(email.to_name.clone()), address))
            .subject(email.subject.clone())
            .header(ContentType::TEXT_PLAIN)
            .body(email.body.clone())
            .map_err(|e| DeliveryError::unknown(format!("Failed to build email: {e}")))
    }

    /// Run a blocking SMTP operation within the attempt timeout.
    async fn run_blocking<T, F>(&self, operation: F) -> Result<T, DeliveryError>
    where
        T: Send + 'static,
        F: FnOnce() -> Result<T, DeliveryError> + Send + 'static,
    {
        let task = tokio::task::spawn_blocking(operation);
        match tokio::time::timeout(self.config.timeout + TASK_GRACE, task).await {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => Err(DeliveryError::unknown(format!("Email task failed: {e}"))),
            Err(_) => Err(DeliveryError::socket("SMTP attempt timed out")),
        }
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn verify(&self, port: u16) -> Result<(), DeliveryError> {
        let transport = self.transport(port)?;
        debug!(host = %self.config.host, port, "Verifying SMTP connection");
        self.run_blocking(move || match transport.test_connection() {
            Ok(true) => Ok(()),
            Ok(false) => Err(DeliveryError::connection("SMTP server did not accept the session")),
            Err(e) => Err(transport_error(&e)),
        })
        .await
    }

    async fn send(&self, port: u16, email: &ConfirmationEmail) -> Result<(), DeliveryError> {
        let message = self.message(email)?;
        let transport = self.transport(port)?;
        self.run_blocking(move || {
            transport
                .send(&message)
                .map(|_| ())
                .map_err(|e| transport_error(&e))
        })
        .await
    }
}

fn transport_error(error: &lettre::transport::smtp::Error) -> DeliveryError {
    let text = error.to_string();
    let code = error
        .status()
        .and_then(|code| code.to_string().parse::<u16>().ok());
    let kind = classify(FailureSignals {
        code,
        timed_out: error.is_timeout(),
        tls: error.is_tls(),
        text: &text,
    });
    DeliveryError::new(kind, text)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)] // Test code can use unwrap/expect
mod tests {
    use super::*;

    #[test]
    fn requires_credentials() {
        let config = Arc::new(MailerConfig::default());
        let error = SmtpMailer::new(config).err().unwrap();
        assert_eq!(error.kind, crate::error::DeliveryErrorKind::Auth);
    }

    #[test]
    fn builds_plain_text_message() {
        let config = Arc::new(MailerConfig {
            username: Some("events@example.com".to_string()),
            password: Some("secret".to_string()),
            ..MailerConfig::default()
        });
        let mailer = SmtpMailer::new(config).unwrap();
        let email = ConfirmationEmail {
            to: "asha@example.com".to_string(),
            to_name: "Asha Rao".to_string(),
            subject: "Registration confirmed: REG00001".to_string(),
            body: "hello".to_string(),
        };

        let formatted = String::from_utf8(mailer.message(&email).unwrap().formatted()).unwrap();
        assert!(formatted.contains("Asha Rao"));
        assert!(formatted.contains("<asha@example.com>"));
        assert!(formatted.contains("Content-Type: text/plain"));
    }
}
