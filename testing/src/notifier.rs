//! Recording notifier.

use reunion_core::notifier::Notifier;
use reunion_core::types::Registration;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// Notifier that remembers what it was given.
///
/// Accepts everything until [`RecordingNotifier::reject_all`] is called,
/// which simulates a full queue.
#[derive(Debug, Clone, Default)]
pub struct RecordingNotifier {
    queued: Arc<Mutex<Vec<Registration>>>,
    rejecting: Arc<AtomicBool>,
}

impl RecordingNotifier {
    /// Create a notifier that accepts every job.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Refuse every later job.
    pub fn reject_all(&self) {
        self.rejecting.store(true, Ordering::SeqCst);
    }

    /// Registrations accepted so far, in order.
    #[must_use]
    pub fn queued(&self) -> Vec<Registration> {
        self.queued.lock().map(|q| q.clone()).unwrap_or_default()
    }

    /// Registration IDs accepted so far, in order.
    #[must_use]
    pub fn queued_ids(&self) -> Vec<String> {
        self.queued()
            .into_iter()
            .map(|r| r.registration_id.into_inner())
            .collect()
    }
}

impl Notifier for RecordingNotifier {
    fn enqueue(&self, registration: Registration) -> bool {
        if self.rejecting.load(Ordering::SeqCst) {
            return false;
        }
        match self.queued.lock() {
            Ok(mut queued) => {
                queued.push(registration);
                true
            },
            Err(_) => false,
        }
    }
}
