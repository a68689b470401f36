//! Storage seam for registrations.
//!
//! Implementations:
//! - `reunion_postgres::PostgresRegistrationStore` (production)
//! - `reunion_testing::InMemoryRegistrationStore` (tests)
//!
//! Both enforce email, mobile and transaction-ID uniqueness themselves, so a
//! race between [`RegistrationStore::find_conflict`] and a write still ends in
//! [`RegistryError::Conflict`](crate::error::RegistryError::Conflict) rather
//! than a duplicate.

use crate::error::{ConflictField, ExistingRegistration, Result};
use crate::query::{ListQuery, Page};
use crate::stats::RegistrationStats;
use crate::types::{NewRegistration, Registration, UniqueKeys};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// A unique key already held by another record.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeyConflict {
    /// Which key collided
    pub field: ConflictField,
    /// The record holding it
    pub existing: ExistingRegistration,
}

/// Persistence for registration records.
#[async_trait]
pub trait RegistrationStore: Send + Sync {
    /// Persist a new registration and assign its registration ID.
    ///
    /// # Errors
    ///
    /// Returns `Conflict` when a unique key is taken, `Storage` on backend
    /// failure.
    async fn insert(&self, registration: NewRegistration, now: DateTime<Utc>) -> Result<Registration>;

    /// Load by internal ID.
    ///
    /// # Errors
    ///
    /// Returns `Storage` on backend failure.
    async fn get(&self, id: Uuid) -> Result<Option<Registration>>;

    /// Load by registration ID (`REG00001`).
    ///
    /// # Errors
    ///
    /// Returns `Storage` on backend failure.
    async fn get_by_registration_id(&self, registration_id: &str) -> Result<Option<Registration>>;

    /// Overwrite every mutable column of an existing record.
    ///
    /// The registration ID and creation time are never changed.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` when the record is gone, `Conflict` when a unique
    /// key is taken by another record, `Storage` on backend failure.
    async fn update(&self, registration: &Registration) -> Result<Registration>;

    /// Delete by internal ID. Returns whether a record was removed.
    ///
    /// # Errors
    ///
    /// Returns `Storage` on backend failure.
    async fn delete(&self, id: Uuid) -> Result<bool>;

    /// First record, other than `exclude`, sharing a unique key with `keys`.
    ///
    /// Email is checked before mobile, mobile before transaction ID.
    ///
    /// # Errors
    ///
    /// Returns `Storage` on backend failure.
    async fn find_conflict(&self, keys: UniqueKeys<'_>, exclude: Option<Uuid>) -> Result<Option<KeyConflict>>;

    /// One page of records matching the query's filters, in query order.
    ///
    /// # Errors
    ///
    /// Returns `Storage` on backend failure.
    async fn list(&self, query: &ListQuery) -> Result<Page<Registration>>;

    /// Records whose transaction ID, email or registration ID equals `term`.
    ///
    /// # Errors
    ///
    /// Returns `Storage` on backend failure.
    async fn search(&self, term: &str) -> Result<Vec<Registration>>;

    /// Aggregate statistics over the whole collection.
    ///
    /// # Errors
    ///
    /// Returns `Storage` on backend failure.
    async fn stats(&self) -> Result<RegistrationStats>;

    /// Records whose confirmation email has not been delivered, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `Storage` on backend failure.
    async fn unsent(&self) -> Result<Vec<Registration>>;

    /// Record a delivery outcome. Returns `false` when the record is gone.
    ///
    /// # Errors
    ///
    /// Returns `Storage` on backend failure.
    async fn set_email_sent(&self, id: Uuid, sent: bool) -> Result<bool>;

    /// Every record, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `Storage` on backend failure.
    async fn all(&self) -> Result<Vec<Registration>>;

    /// Whether the backend is reachable.
    ///
    /// # Errors
    ///
    /// Returns `Storage` when it is not.
    async fn health_check(&self) -> Result<()> {
        Ok(())
    }
}
