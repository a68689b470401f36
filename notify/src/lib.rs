//! # Reunion Notify
//!
//! Background delivery of registration confirmation emails.
//!
//! ## Pieces
//!
//! - [`delivery`]: the per-registration state machine, expressed as a
//!   [`Reducer`](reunion_core::reducer::Reducer) whose effects verify, send
//!   and record the outcome
//! - [`driver`]: runs a reducer and its effects to completion
//! - [`dispatcher`]: bounded queue + worker pool, implements
//!   [`Notifier`](reunion_core::notifier::Notifier)
//! - [`Mailer`] with [`SmtpMailer`] (lettre) and [`ConsoleMailer`] (dev mode)
//!
//! ## Example
//!
//! ```ignore
//! let config = MailerConfig::default();
//! let mailer = build_mailer(&config);
//! let dispatcher = NotificationDispatcher::spawn(&config, mailer, store);
//! dispatcher.enqueue(registration);
//! ```

pub mod config;
pub mod console;
pub mod delivery;
pub mod dispatcher;
pub mod driver;
pub mod email;
pub mod error;
pub mod mailer;
pub mod smtp;

pub use config::MailerConfig;
pub use console::ConsoleMailer;
pub use delivery::{DeliveryMachine, DeliveryStatus};
pub use dispatcher::{NotificationDispatcher, deliver};
pub use email::ConfirmationEmail;
pub use error::{DeliveryError, DeliveryErrorKind};
pub use mailer::Mailer;
pub use smtp::SmtpMailer;

use std::sync::Arc;
use tracing::{info, warn};

/// Pick the mailer for a configuration.
///
/// Development mode, or missing SMTP credentials, selects the console mailer.
#[must_use]
pub fn build_mailer(config: &MailerConfig) -> Arc<dyn Mailer> {
    if config.dev_mode {
        info!("Email development mode: confirmations are logged, not sent");
        return Arc::new(ConsoleMailer::new());
    }
    if !config.has_credentials() {
        warn!("SMTP credentials missing; falling back to console mailer");
        return Arc::new(ConsoleMailer::new());
    }
    match SmtpMailer::new(Arc::new(config.clone())) {
        Ok(mailer) => {
            info!(host = %config.host, port = config.port, "SMTP mailer configured");
            Arc::new(mailer)
        },
        Err(e) => {
            warn!(error = %e, "SMTP mailer unavailable; falling back to console mailer");
            Arc::new(ConsoleMailer::new())
        },
    }
}
