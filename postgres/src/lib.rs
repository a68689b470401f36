//! `PostgreSQL` registration store for the reunion registration system.
//!
//! This crate implements [`RegistrationStore`](reunion_core::store::RegistrationStore)
//! on a single `registrations` table using sqlx runtime queries:
//!
//! - Registration numbers from the `registration_number_seq` sequence, with
//!   a clock-derived fallback when the sequence cannot be read
//! - Unique constraints on email, mobile and payment transaction ID, mapped
//!   back to conflict errors by constraint name
//! - Filtered, sorted and paged listing built with `QueryBuilder`
//! - Statistics as concurrent aggregate queries
//!
//! # Example
//!
//! ```ignore
//! use reunion_postgres::PostgresRegistrationStore;
//!
//! let store = PostgresRegistrationStore::connect(&database_url, 10, Duration::from_secs(30)).await?;
//! store.migrate().await?;
//! let service = RegistrationService::new(Arc::new(store), notifier, pricing, clock);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod query;
mod row;
mod stats;
mod store;

pub use store::PostgresRegistrationStore;
