//! In-memory registration store.

use chrono::{DateTime, Utc};
use reunion_core::error::{ConflictField, RegistryError, Result};
use reunion_core::query::{ListQuery, Page};
use reunion_core::registration_id::{ASSIGN_ATTEMPTS, RegistrationId};
use reunion_core::stats::RegistrationStats;
use reunion_core::store::{KeyConflict, RegistrationStore};
use reunion_core::types::{NewRegistration, Registration, UniqueKeys};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use uuid::Uuid;

/// Registration store backed by a `Vec` in insertion order.
///
/// Uniqueness is checked under the same lock as the write, so concurrent
/// inserts behave like a database with unique constraints. Registration
/// numbers come from an atomic counter.
#[derive(Debug, Clone, Default)]
pub struct InMemoryRegistrationStore {
    records: Arc<Mutex<Vec<Registration>>>,
    sequence: Arc<AtomicU64>,
    sequence_unavailable: Arc<AtomicBool>,
}

impl InMemoryRegistrationStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the counter unavailable so inserts use the timestamp fallback.
    pub fn fail_sequence(&self) {
        self.sequence_unavailable.store(true, Ordering::SeqCst);
    }

    /// Bring the counter back after [`fail_sequence`](Self::fail_sequence).
    pub fn restore_sequence(&self) {
        self.sequence_unavailable.store(false, Ordering::SeqCst);
    }

    /// Number of stored records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().map_or(0, |records| records.len())
    }

    /// Whether the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of a record by internal ID.
    #[must_use]
    pub fn snapshot(&self, id: Uuid) -> Option<Registration> {
        self.lock()
            .ok()
            .and_then(|records| records.iter().find(|r| r.id == id).cloned())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Vec<Registration>>> {
        self.records
            .lock()
            .map_err(|_| RegistryError::Storage("Mutex lock failed".to_string()))
    }

    fn draw_id(&self, now: DateTime<Utc>, attempt: u32) -> RegistrationId {
        if self.sequence_unavailable.load(Ordering::SeqCst) {
            RegistrationId::fallback(now, attempt)
        } else {
            RegistrationId::from_sequence(self.sequence.fetch_add(1, Ordering::SeqCst) + 1)
        }
    }

    /// First drawn ID no stored record holds.
    fn unused_id(&self, records: &[Registration], now: DateTime<Utc>) -> Result<RegistrationId> {
        (0..ASSIGN_ATTEMPTS)
            .map(|attempt| self.draw_id(now, attempt))
            .find(|candidate| records.iter().all(|r| r.registration_id != *candidate))
            .ok_or_else(|| RegistryError::Storage("No unused registration ID available".to_string()))
    }
}

fn conflict_in(records: &[Registration], keys: UniqueKeys<'_>, exclude: Option<Uuid>) -> Option<KeyConflict> {
    // Per key across all records: an email hit anywhere wins over a mobile
    // hit on an earlier record.
    [ConflictField::Email, ConflictField::Mobile, ConflictField::TransactionId]
        .into_iter()
        .find_map(|field| {
            records
                .iter()
                .filter(|r| Some(r.id) != exclude)
                .find(|r| r.holds(field, keys))
                .map(|r| KeyConflict { field, existing: r.as_existing() })
        })
}

fn into_error(conflict: KeyConflict) -> RegistryError {
    RegistryError::conflict(conflict.field, Some(conflict.existing))
}

#[async_trait::async_trait]
impl RegistrationStore for InMemoryRegistrationStore {
    async fn insert(&self, registration: NewRegistration, now: DateTime<Utc>) -> Result<Registration> {
        let mut records = self.lock()?;
        if let Some(conflict) = conflict_in(&records, registration.unique_keys(), None) {
            return Err(into_error(conflict));
        }
        let registration_id = self.unused_id(&records, now)?;
        let stored = registration.into_registration(Uuid::new_v4(), registration_id, now);
        records.push(stored.clone());
        Ok(stored)
    }

    async fn get(&self, id: Uuid) -> Result<Option<Registration>> {
        Ok(self.lock()?.iter().find(|r| r.id == id).cloned())
    }

    async fn get_by_registration_id(&self, registration_id: &str) -> Result<Option<Registration>> {
        Ok(self
            .lock()?
            .iter()
            .find(|r| r.registration_id.as_str() == registration_id)
            .cloned())
    }

    async fn update(&self, registration: &Registration) -> Result<Registration> {
        let mut records = self.lock()?;
        if let Some(conflict) = conflict_in(&records, registration.unique_keys(), Some(registration.id)) {
            return Err(into_error(conflict));
        }
        let slot = records
            .iter_mut()
            .find(|r| r.id == registration.id)
            .ok_or_else(|| RegistryError::NotFound(registration.id.to_string()))?;

        let mut updated = registration.clone();
        updated.registration_id = slot.registration_id.clone();
        updated.created_at = slot.created_at;
        *slot = updated.clone();
        Ok(updated)
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        let mut records = self.lock()?;
        let before = records.len();
        records.retain(|r| r.id != id);
        Ok(records.len() < before)
    }

    async fn find_conflict(&self, keys: UniqueKeys<'_>, exclude: Option<Uuid>) -> Result<Option<KeyConflict>> {
        Ok(conflict_in(&self.lock()?, keys, exclude))
    }

    async fn list(&self, query: &ListQuery) -> Result<Page<Registration>> {
        let mut matching: Vec<Registration> = self
            .lock()?
            .iter()
            .filter(|r| query.filter.matches(r))
            .cloned()
            .collect();
        matching.sort_by(|a, b| query.compare(a, b));

        let total = matching.len() as u64;
        let offset = usize::try_from(query.offset()).unwrap_or(usize::MAX);
        let items = matching
            .into_iter()
            .skip(offset)
            .take(query.limit as usize)
            .collect();
        Ok(Page { items, total })
    }

    async fn search(&self, term: &str) -> Result<Vec<Registration>> {
        let email = term.to_lowercase();
        Ok(self
            .lock()?
            .iter()
            .filter(|r| {
                r.payment_transaction_id.as_deref() == Some(term)
                    || r.details.email == email
                    || r.registration_id.as_str().eq_ignore_ascii_case(term)
            })
            .cloned()
            .collect())
    }

    async fn stats(&self) -> Result<RegistrationStats> {
        Ok(RegistrationStats::from_records(self.lock()?.iter()))
    }

    async fn unsent(&self) -> Result<Vec<Registration>> {
        Ok(self
            .lock()?
            .iter()
            .filter(|r| !r.is_email_sent)
            .cloned()
            .collect())
    }

    async fn set_email_sent(&self, id: Uuid, sent: bool) -> Result<bool> {
        let mut records = self.lock()?;
        Ok(match records.iter_mut().find(|r| r.id == id) {
            Some(record) => {
                record.is_email_sent = sent;
                true
            },
            None => false,
        })
    }

    async fn all(&self) -> Result<Vec<Registration>> {
        Ok(self.lock()?.clone())
    }
}
