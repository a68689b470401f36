//! Confirmation delivery state machine.
//!
//! One [`DeliveryMachine`] per registration walks the candidate ports:
//!
//! ```text
//! NotSent ─Start─▶ Attempting(p) ─Verified─▶ (send on p) ─Delivered─▶ Sent
//!                       │                          │
//!                  VerifyFailed               SendFailed
//!                       └────────▶ next port ◀─────┘
//!                                     │ none left
//!                                     ▼
//!                                  Failed
//! ```
//!
//! Reaching `Sent` or `Failed` writes the outcome back to the record's
//! email-sent flag. A write-back that finds no record is only logged.

use crate::email::ConfirmationEmail;
use crate::error::{DeliveryError, DeliveryErrorKind};
use crate::mailer::Mailer;
use reunion_core::effect::Effect;
use reunion_core::reducer::Reducer;
use reunion_core::store::RegistrationStore;
use reunion_core::types::Registration;
use reunion_core::{SmallVec, smallvec};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

/// Where a delivery stands.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeliveryStatus {
    /// Nothing attempted yet
    NotSent,
    /// Verifying or sending on this port
    Attempting(u16),
    /// Delivered
    Sent,
    /// Every port failed
    Failed,
}

impl DeliveryStatus {
    /// Whether the machine has stopped attempting.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Sent | Self::Failed)
    }
}

/// A failure recorded against one port.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PortFailure {
    /// Port the attempt used
    pub port: u16,
    /// Verify or send
    pub stage: Stage,
    /// Failure category
    pub kind: DeliveryErrorKind,
}

/// Step of an attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
    /// Connection check
    Verify,
    /// Message delivery
    Send,
}

/// State of one registration's delivery.
#[derive(Clone, Debug)]
pub struct DeliveryMachine {
    registration_id: Uuid,
    email: Arc<ConfirmationEmail>,
    ports: Vec<u16>,
    cursor: usize,
    status: DeliveryStatus,
    failures: Vec<PortFailure>,
    recorded: Option<bool>,
}

impl DeliveryMachine {
    /// A fresh machine for `registration` over `ports`, tried in order.
    #[must_use]
    pub fn new(registration: &Registration, ports: Vec<u16>) -> Self {
        Self {
            registration_id: registration.id,
            email: Arc::new(ConfirmationEmail::for_registration(registration)),
            ports,
            cursor: 0,
            status: DeliveryStatus::NotSent,
            failures: Vec::new(),
            recorded: None,
        }
    }

    /// Current status.
    #[must_use]
    pub const fn status(&self) -> DeliveryStatus {
        self.status
    }

    /// Failures seen so far, in attempt order.
    #[must_use]
    pub fn failures(&self) -> &[PortFailure] {
        &self.failures
    }

    /// The flag value written back, once the write-back succeeded.
    #[must_use]
    pub const fn recorded(&self) -> Option<bool> {
        self.recorded
    }

    /// The rendered email.
    #[must_use]
    pub fn email(&self) -> &ConfirmationEmail {
        &self.email
    }

    fn current_port(&self) -> Option<u16> {
        self.ports.get(self.cursor).copied()
    }

    fn is_attempting(&self, port: u16) -> bool {
        self.status == DeliveryStatus::Attempting(port)
    }
}

/// Inputs to the delivery machine.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DeliveryAction {
    /// Begin with the first port
    Start,
    /// The connection check on `port` passed
    Verified {
        /// Port checked
        port: u16,
    },
    /// The connection check on `port` failed
    VerifyFailed {
        /// Port checked
        port: u16,
        /// Why
        error: DeliveryError,
    },
    /// The email went out on `port`
    Delivered {
        /// Port used
        port: u16,
    },
    /// Sending on `port` failed
    SendFailed {
        /// Port used
        port: u16,
        /// Why
        error: DeliveryError,
    },
    /// The email-sent flag was persisted
    OutcomeRecorded {
        /// Value written
        sent: bool,
    },
    /// The email-sent flag could not be persisted
    WriteBackFailed {
        /// Why
        reason: String,
    },
}

/// Dependencies of delivery effects.
#[derive(Clone)]
pub struct DeliveryEnvironment {
    /// Transport used for verify and send
    pub mailer: Arc<dyn Mailer>,
    /// Store receiving the email-sent flag
    pub store: Arc<dyn RegistrationStore>,
}

/// Reducer driving [`DeliveryMachine`].
#[derive(Clone, Copy, Debug, Default)]
pub struct DeliveryReducer;

impl DeliveryReducer {
    fn attempt(state: &mut DeliveryMachine, env: &DeliveryEnvironment) -> Effect<DeliveryAction> {
        match state.current_port() {
            Some(port) => {
                state.status = DeliveryStatus::Attempting(port);
                verify(env, port)
            },
            None => {
                state.status = DeliveryStatus::Failed;
                warn!(
                    registration = %state.registration_id,
                    to = %state.email.to,
                    attempts = state.failures.len(),
                    "Confirmation email failed on every port"
                );
                write_back(env, state.registration_id, false)
            },
        }
    }

    fn fail(
        state: &mut DeliveryMachine,
        env: &DeliveryEnvironment,
        port: u16,
        stage: Stage,
        error: &DeliveryError,
    ) -> Effect<DeliveryAction> {
        if error.kind == DeliveryErrorKind::Auth {
            warn!(
                registration = %state.registration_id,
                port,
                error = %error.message,
                "SMTP authentication rejected; remaining ports will still be tried"
            );
        } else {
            warn!(
                registration = %state.registration_id,
                port,
                ?stage,
                kind = %error.kind,
                error = %error.message,
                "Confirmation email attempt failed"
            );
        }
        state.failures.push(PortFailure { port, stage, kind: error.kind });
        state.cursor += 1;
        Self::attempt(state, env)
    }
}

impl Reducer for DeliveryReducer {
    type State = DeliveryMachine;
    type Action = DeliveryAction;
    type Environment = DeliveryEnvironment;

    fn reduce(
        &self,
        state: &mut DeliveryMachine,
        action: DeliveryAction,
        env: &DeliveryEnvironment,
    ) -> SmallVec<[Effect<DeliveryAction>; 4]> {
        match action {
            DeliveryAction::Start if state.status == DeliveryStatus::NotSent => {
                smallvec![Self::attempt(state, env)]
            },
            DeliveryAction::Verified { port } if state.is_attempting(port) => {
                smallvec![send(env, port, Arc::clone(&state.email))]
            },
            DeliveryAction::VerifyFailed { port, error } if state.is_attempting(port) => {
                smallvec![Self::fail(state, env, port, Stage::Verify, &error)]
            },
            DeliveryAction::Delivered { port } if state.is_attempting(port) => {
                state.status = DeliveryStatus::Sent;
                info!(
                    registration = %state.registration_id,
                    to = %state.email.to,
                    port,
                    "Confirmation email sent"
                );
                smallvec![write_back(env, state.registration_id, true)]
            },
            DeliveryAction::SendFailed { port, error } if state.is_attempting(port) => {
                smallvec![Self::fail(state, env, port, Stage::Send, &error)]
            },
            DeliveryAction::OutcomeRecorded { sent } if state.status.is_terminal() => {
                state.recorded = Some(sent);
                SmallVec::new()
            },
            DeliveryAction::WriteBackFailed { reason } => {
                warn!(
                    registration = %state.registration_id,
                    reason = %reason,
                    "Could not record confirmation outcome"
                );
                SmallVec::new()
            },
            // Stale or out-of-order action
            _ => SmallVec::new(),
        }
    }
}

fn verify(env: &DeliveryEnvironment, port: u16) -> Effect<DeliveryAction> {
    let mailer = Arc::clone(&env.mailer);
    Effect::future(async move {
        Some(match mailer.verify(port).await {
            Ok(()) => DeliveryAction::Verified { port },
            Err(error) => DeliveryAction::VerifyFailed { port, error },
        })
    })
}

fn send(env: &DeliveryEnvironment, port: u16, email: Arc<ConfirmationEmail>) -> Effect<DeliveryAction> {
    let mailer = Arc::clone(&env.mailer);
    Effect::future(async move {
        Some(match mailer.send(port, &email).await {
            Ok(()) => DeliveryAction::Delivered { port },
            Err(error) => DeliveryAction::SendFailed { port, error },
        })
    })
}

fn write_back(env: &DeliveryEnvironment, id: Uuid, sent: bool) -> Effect<DeliveryAction> {
    let store = Arc::clone(&env.store);
    Effect::future(async move {
        Some(match store.set_email_sent(id, sent).await {
            Ok(true) => DeliveryAction::OutcomeRecorded { sent },
            Ok(false) => DeliveryAction::WriteBackFailed {
                reason: "registration no longer exists".to_string(),
            },
            Err(e) => DeliveryAction::WriteBackFailed { reason: e.to_string() },
        })
    })
}
