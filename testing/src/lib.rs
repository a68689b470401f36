//! # Reunion Testing
//!
//! Test doubles and helpers for the reunion registration system.
//!
//! This crate provides:
//! - [`InMemoryRegistrationStore`]: a store with the same uniqueness and
//!   numbering rules as the database
//! - [`RecordingNotifier`] and [`ScriptedMailer`]: doubles for the email side
//! - [`fixtures`]: valid payloads and records that never collide
//! - [`strategies`]: proptest strategies for domain values
//! - [`ReducerTest`]: Given-When-Then harness for reducers
//!
//! ## Example
//!
//! ```ignore
//! use reunion_testing::{InMemoryRegistrationStore, RecordingNotifier, fixtures, test_clock};
//!
//! #[tokio::test]
//! async fn registers() {
//!     let store = Arc::new(InMemoryRegistrationStore::new());
//!     let notifier = Arc::new(RecordingNotifier::new());
//!     let service = RegistrationService::new(store, notifier, PricingPolicy::default(), Arc::new(test_clock()));
//!
//!     let registration = service.register(&fixtures::submission(1)).await.unwrap();
//!     assert_eq!(registration.registration_id.as_str(), "REG00001");
//! }
//! ```

use chrono::{DateTime, Utc};
use reunion_core::environment::Clock;

pub mod fixtures;
pub mod mailer;
pub mod notifier;
pub mod store;
pub mod strategies;

/// Deterministic environment implementations.
pub mod mocks {
    use super::{Clock, DateTime, Utc};

    /// Fixed clock for deterministic tests
    ///
    /// # Example
    ///
    /// ```
    /// use reunion_testing::mocks::FixedClock;
    /// use reunion_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// assert_eq!(clock.now(), clock.now());
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    ///
    /// # Panics
    ///
    /// This function will panic if the hardcoded timestamp fails to parse,
    /// which should never happen in practice.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(
            DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z")
                .expect("hardcoded timestamp should always parse")
                .with_timezone(&Utc),
        )
    }
}

/// Route `tracing` output through the test harness.
///
/// Safe to call from every test; only the first call installs a subscriber.
/// Honors `RUST_LOG`, defaulting to `debug`.
pub fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("debug"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}

pub use mailer::{MailerCall, ScriptedMailer};
pub use mocks::{FixedClock, test_clock};
pub use notifier::RecordingNotifier;
pub use reducer_test::{ReducerTest, assertions};
pub use store::InMemoryRegistrationStore;
