//! Registration operations.
//!
//! [`RegistrationService`] is what the HTTP layer calls. It owns the
//! validation → duplicate check → persist → notify flow and every admin
//! mutation, and is agnostic to which store and notifier it was given.

use crate::environment::Clock;
use crate::error::{RegistryError, Result, ValidationErrors};
use crate::notifier::Notifier;
use crate::pricing::{PricingPolicy, Quote};
use crate::query::{ListQuery, Page};
use crate::stats::RegistrationStats;
use crate::store::{KeyConflict, RegistrationStore};
use crate::types::{Attendees, Batch, Registration, UniqueKeys};
use crate::validation::{validate_payment_update, validate_submission, validate_update};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Outcome of a bulk resend.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResendSummary {
    /// Records found without a delivered confirmation
    pub pending: usize,
    /// Records accepted by the notifier
    pub queued: usize,
}

/// Registration use cases over injected store, notifier and clock.
#[derive(Clone)]
pub struct RegistrationService {
    store: Arc<dyn RegistrationStore>,
    notifier: Arc<dyn Notifier>,
    pricing: PricingPolicy,
    clock: Arc<dyn Clock>,
}

impl RegistrationService {
    /// Create a service.
    #[must_use]
    pub fn new(
        store: Arc<dyn RegistrationStore>,
        notifier: Arc<dyn Notifier>,
        pricing: PricingPolicy,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            notifier,
            pricing,
            clock,
        }
    }

    /// The fee schedule in force.
    #[must_use]
    pub const fn pricing(&self) -> &PricingPolicy {
        &self.pricing
    }

    /// Validate, check for duplicates, persist and queue the confirmation.
    ///
    /// # Errors
    ///
    /// `Validation` for a bad payload, `Conflict` for a taken email, mobile
    /// or transaction ID, `Storage` on backend failure.
    pub async fn register(&self, payload: &Value) -> Result<Registration> {
        let submission = validate_submission(payload, &self.pricing)?;

        if let Some(conflict) = self
            .store
            .find_conflict(submission.unique_keys(), None)
            .await?
        {
            return Err(conflict_error(conflict));
        }

        let registration = self
            .store
            .insert(submission, self.clock.now())
            .await
            .inspect_err(count_conflict)?;

        metrics::counter!("reunion_registrations_total").increment(1);
        info!(
            registration_id = %registration.registration_id,
            batch = %registration.details.batch,
            contribution = registration.contribution_amount,
            "Registration created"
        );

        if !self.notifier.enqueue(registration.clone()) {
            warn!(
                registration_id = %registration.registration_id,
                "Confirmation email not queued; it will go out on the next resend"
            );
        }
        Ok(registration)
    }

    /// Fetch by internal UUID or by registration ID.
    ///
    /// # Errors
    ///
    /// `NotFound` when nothing matches, `Storage` on backend failure.
    pub async fn get(&self, key: &str) -> Result<Registration> {
        let found = match Uuid::parse_str(key) {
            Ok(id) => self.store.get(id).await?,
            Err(_) => {
                self.store
                    .get_by_registration_id(&key.trim().to_ascii_uppercase())
                    .await?
            },
        };
        found.ok_or_else(|| RegistryError::NotFound(key.to_string()))
    }

    /// One page of records.
    ///
    /// # Errors
    ///
    /// `Storage` on backend failure.
    pub async fn list(&self, query: &ListQuery) -> Result<Page<Registration>> {
        self.store.list(query).await
    }

    /// Apply an admin edit.
    ///
    /// # Errors
    ///
    /// `Validation` for a bad edit, `NotFound`, `Conflict` when the edit
    /// takes another record's unique key, `Storage` on backend failure.
    pub async fn update(&self, key: &str, payload: &Value) -> Result<Registration> {
        let patch = validate_update(payload)?;
        let current = self.get(key).await?;
        let checks_payment = patch.touches_payment();

        let mut updated = current.clone();
        updated.apply_patch(patch, self.clock.now());
        if checks_payment && updated.lacks_transaction_id() {
            return Err(missing_transaction_id());
        }

        self.ensure_unique(&updated).await?;
        let stored = self.store.update(&updated).await.inspect_err(count_conflict)?;
        info!(registration_id = %stored.registration_id, "Registration updated");
        Ok(stored)
    }

    /// Delete a record, returning what was removed.
    ///
    /// # Errors
    ///
    /// `NotFound`, or `Storage` on backend failure.
    pub async fn delete(&self, key: &str) -> Result<Registration> {
        let registration = self.get(key).await?;
        if !self.store.delete(registration.id).await? {
            return Err(RegistryError::NotFound(key.to_string()));
        }
        info!(registration_id = %registration.registration_id, "Registration deleted");
        Ok(registration)
    }

    /// Flip the verified flag.
    ///
    /// # Errors
    ///
    /// `NotFound`, or `Storage` on backend failure.
    pub async fn toggle_verified(&self, key: &str) -> Result<Registration> {
        let mut registration = self.get(key).await?;
        registration.toggle_verified(self.clock.now());
        let stored = self.store.update(&registration).await?;
        info!(
            registration_id = %stored.registration_id,
            verified = stored.verified,
            "Verification toggled"
        );
        Ok(stored)
    }

    /// Flip the attendance flag.
    ///
    /// # Errors
    ///
    /// `NotFound`, or `Storage` on backend failure.
    pub async fn toggle_attendance(&self, key: &str) -> Result<Registration> {
        let mut registration = self.get(key).await?;
        registration.toggle_attendance(self.clock.now());
        let stored = self.store.update(&registration).await?;
        info!(
            registration_id = %stored.registration_id,
            attended = stored.attended,
            "Attendance toggled"
        );
        Ok(stored)
    }

    /// Change payment status and/or transaction ID.
    ///
    /// Completing a payment also verifies the record.
    ///
    /// # Errors
    ///
    /// `Validation`, `NotFound`, `Conflict` for a transaction ID used
    /// elsewhere, `Storage` on backend failure.
    pub async fn update_payment(&self, key: &str, payload: &Value) -> Result<Registration> {
        let update = validate_payment_update(payload)?;
        let mut registration = self.get(key).await?;
        let changes_reference = update.transaction_id.is_some();

        registration.apply_payment(update, self.clock.now());
        if changes_reference && registration.lacks_transaction_id() {
            return Err(missing_transaction_id());
        }

        self.ensure_unique(&registration).await?;
        let stored = self
            .store
            .update(&registration)
            .await
            .inspect_err(count_conflict)?;
        info!(
            registration_id = %stored.registration_id,
            payment_status = %stored.payment_status,
            verified = stored.verified,
            "Payment updated"
        );
        Ok(stored)
    }

    /// Look up records by transaction ID, email or registration ID.
    ///
    /// # Errors
    ///
    /// `Validation` for a blank term, `Storage` on backend failure.
    pub async fn search(&self, term: &str) -> Result<Vec<Registration>> {
        let term = term.trim();
        if term.is_empty() {
            return Err(ValidationErrors::single("query", "is required").into());
        }
        self.store.search(term).await
    }

    /// Dashboard statistics.
    ///
    /// # Errors
    ///
    /// `Storage` on backend failure.
    pub async fn stats(&self) -> Result<RegistrationStats> {
        self.store.stats().await
    }

    /// Every record, oldest first, for export.
    ///
    /// # Errors
    ///
    /// `Storage` on backend failure.
    pub async fn export(&self) -> Result<Vec<Registration>> {
        self.store.all().await
    }

    /// Queue a confirmation for every record that has not received one.
    ///
    /// Safe to repeat: records already delivered are skipped, and a record
    /// queued twice is simply delivered and flagged twice.
    ///
    /// # Errors
    ///
    /// `Storage` on backend failure.
    pub async fn resend_unsent(&self) -> Result<ResendSummary> {
        let pending = self.store.unsent().await?;
        let mut summary = ResendSummary {
            pending: pending.len(),
            queued: 0,
        };
        for registration in pending {
            let registration_id = registration.registration_id.clone();
            if self.notifier.enqueue(registration) {
                summary.queued += 1;
            } else {
                debug!(%registration_id, "Resend not queued");
            }
        }
        info!(pending = summary.pending, queued = summary.queued, "Resend of unsent confirmations");
        Ok(summary)
    }

    /// Whether the store is reachable.
    ///
    /// # Errors
    ///
    /// `Storage` when it is not.
    pub async fn health(&self) -> Result<()> {
        self.store.health_check().await
    }

    /// Itemised contribution for a cohort and party.
    #[must_use]
    pub fn quote(&self, batch: Batch, attendees: &Attendees) -> Quote {
        self.pricing.quote(batch, attendees)
    }

    async fn ensure_unique(&self, registration: &Registration) -> Result<()> {
        let keys: UniqueKeys<'_> = registration.unique_keys();
        match self.store.find_conflict(keys, Some(registration.id)).await? {
            Some(conflict) => Err(conflict_error(conflict)),
            None => Ok(()),
        }
    }
}

fn conflict_error(conflict: KeyConflict) -> RegistryError {
    let error = RegistryError::conflict(conflict.field, Some(conflict.existing));
    count_conflict(&error);
    error
}

fn count_conflict(error: &RegistryError) {
    if let RegistryError::Conflict { field, .. } = error {
        metrics::counter!("reunion_conflicts_total", "field" => field.as_str()).increment(1);
        debug!(%field, "Unique key conflict");
    }
}

fn missing_transaction_id() -> RegistryError {
    ValidationErrors::single(
        "paymentTransactionId",
        "is required when contributionAmount is greater than 0",
    )
    .into()
}
