//! Bounded background dispatch of confirmation emails.
//!
//! Registrations are pushed onto a bounded channel and consumed by a fixed
//! number of workers, each of which runs one [`DeliveryMachine`] at a time.
//! When the channel is full the job is dropped with a warning; the record
//! keeps `isEmailSent = false` and is picked up by the next resend.

use crate::config::MailerConfig;
use crate::delivery::{DeliveryAction, DeliveryEnvironment, DeliveryMachine, DeliveryReducer, DeliveryStatus};
use crate::driver;
use crate::mailer::Mailer;
use reunion_core::notifier::Notifier;
use reunion_core::store::RegistrationStore;
use reunion_core::types::Registration;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Run the full delivery state machine for one registration.
pub async fn deliver(env: &DeliveryEnvironment, ports: &[u16], registration: &Registration) -> DeliveryMachine {
    let mut machine = DeliveryMachine::new(registration, ports.to_vec());
    driver::run(&DeliveryReducer, &mut machine, env, DeliveryAction::Start).await;

    let outcome = match machine.status() {
        DeliveryStatus::Sent => "sent",
        _ => "failed",
    };
    metrics::counter!("reunion_emails_total", "outcome" => outcome).increment(1);
    machine
}

/// Worker pool delivering confirmations in the background.
pub struct NotificationDispatcher {
    sender: Mutex<Option<mpsc::Sender<Registration>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl NotificationDispatcher {
    /// Start `config.workers` workers behind a queue of
    /// `config.queue_capacity` jobs.
    ///
    /// Must be called from within a Tokio runtime.
    #[must_use]
    pub fn spawn(config: &MailerConfig, mailer: Arc<dyn Mailer>, store: Arc<dyn RegistrationStore>) -> Self {
        let (sender, receiver) = mpsc::channel::<Registration>(config.queue_capacity.max(1));
        let receiver = Arc::new(tokio::sync::Mutex::new(receiver));
        let env = DeliveryEnvironment { mailer, store };
        let ports: Arc<[u16]> = config.candidate_ports().into();

        let workers = (0..config.workers.max(1))
            .map(|worker| {
                let receiver = Arc::clone(&receiver);
                let env = env.clone();
                let ports = Arc::clone(&ports);
                tokio::spawn(async move {
                    loop {
                        let job = receiver.lock().await.recv().await;
                        let Some(registration) = job else {
                            break;
                        };
                        debug!(worker, registration_id = %registration.registration_id, "Delivering confirmation");
                        deliver(&env, &ports, &registration).await;
                    }
                    debug!(worker, "Email worker stopped");
                })
            })
            .collect();

        info!(
            workers = config.workers.max(1),
            queue_capacity = config.queue_capacity.max(1),
            "Notification dispatcher started"
        );

        Self {
            sender: Mutex::new(Some(sender)),
            workers: Mutex::new(workers),
        }
    }

    /// Stop accepting jobs and wait up to `timeout` for queued ones to finish.
    ///
    /// Returns `true` when every worker stopped in time.
    pub async fn shutdown(&self, timeout: Duration) -> bool {
        match self.sender.lock() {
            Ok(mut sender) => {
                sender.take();
            },
            Err(_) => return false,
        }

        let workers = match self.workers.lock() {
            Ok(mut workers) => std::mem::take(&mut *workers),
            Err(_) => return false,
        };
        let drained = tokio::time::timeout(timeout, futures::future::join_all(workers)).await;
        if drained.is_err() {
            warn!(?timeout, "Email workers did not drain before the shutdown timeout");
        }
        drained.is_ok()
    }
}

impl Notifier for NotificationDispatcher {
    fn enqueue(&self, registration: Registration) -> bool {
        let Ok(guard) = self.sender.lock() else {
            return false;
        };
        let Some(sender) = guard.as_ref() else {
            debug!("Dispatcher shut down; confirmation not queued");
            return false;
        };

        match sender.try_send(registration) {
            Ok(()) => true,
            Err(TrySendError::Full(registration)) => {
                metrics::counter!("reunion_email_queue_rejections_total").increment(1);
                warn!(
                    registration_id = %registration.registration_id,
                    "Email queue full; confirmation dropped until the next resend"
                );
                false
            },
            Err(TrySendError::Closed(_)) => false,
        }
    }
}
