//! Scripted mailer.

use async_trait::async_trait;
use reunion_notify::{ConfirmationEmail, DeliveryError, Mailer};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// A call made against [`ScriptedMailer`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MailerCall {
    /// `verify(port)`
    Verify(u16),
    /// `send(port, email)`
    Send {
        /// Port used
        port: u16,
        /// Recipient
        to: String,
    },
}

#[derive(Debug, Default)]
struct Script {
    verify_failures: HashMap<u16, DeliveryError>,
    send_failures: HashMap<u16, DeliveryError>,
    verify_failure_everywhere: Option<DeliveryError>,
    calls: Vec<MailerCall>,
}

/// Mailer whose per-port outcomes are set up front.
///
/// Every port succeeds unless told otherwise. All calls are recorded.
#[derive(Debug, Clone, Default)]
pub struct ScriptedMailer {
    script: Arc<Mutex<Script>>,
}

impl ScriptedMailer {
    /// A mailer that succeeds on every port.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the connection check on `port`.
    #[must_use]
    pub fn fail_verify(self, port: u16, error: DeliveryError) -> Self {
        if let Ok(mut script) = self.script.lock() {
            script.verify_failures.insert(port, error);
        }
        self
    }

    /// Fail sending on `port`.
    #[must_use]
    pub fn fail_send(self, port: u16, error: DeliveryError) -> Self {
        if let Ok(mut script) = self.script.lock() {
            script.send_failures.insert(port, error);
        }
        self
    }

    /// Fail the connection check on every port.
    #[must_use]
    pub fn fail_every_verify(self, error: DeliveryError) -> Self {
        if let Ok(mut script) = self.script.lock() {
            script.verify_failure_everywhere = Some(error);
        }
        self
    }

    /// Calls made so far, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<MailerCall> {
        self.script.lock().map(|s| s.calls.clone()).unwrap_or_default()
    }

    /// Number of `verify` calls made so far.
    #[must_use]
    pub fn verify_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|call| matches!(call, MailerCall::Verify(_)))
            .count()
    }

    fn record(&self, call: MailerCall) {
        if let Ok(mut script) = self.script.lock() {
            script.calls.push(call);
        }
    }
}

#[async_trait]
impl Mailer for ScriptedMailer {
    async fn verify(&self, port: u16) -> Result<(), DeliveryError> {
        self.record(MailerCall::Verify(port));
        let failure = self.script.lock().ok().and_then(|script| {
            script
                .verify_failures
                .get(&port)
                .or(script.verify_failure_everywhere.as_ref())
                .cloned()
        });
        failure.map_or(Ok(()), Err)
    }

    async fn send(&self, port: u16, email: &ConfirmationEmail) -> Result<(), DeliveryError> {
        self.record(MailerCall::Send { port, to: email.to.clone() });
        let failure = self
            .script
            .lock()
            .ok()
            .and_then(|script| script.send_failures.get(&port).cloned());
        failure.map_or(Ok(()), Err)
    }
}
