//! # Reunion Core
//!
//! Domain model and business rules for the alumni reunion registration system.
//!
//! The crate is the functional core of the service: everything here is either
//! pure (validation, pricing, registration IDs, statistics folding) or talks to
//! the outside world only through injected traits ([`store::RegistrationStore`],
//! [`notifier::Notifier`], [`environment::Clock`]).
//!
//! ## Core Concepts
//!
//! - **Registration**: one record per person who submits the form
//! - **Validation**: schema checks that collect every field error at once
//! - **Pricing**: contribution derived from batch cohort and attendee counts
//! - **Registration ID**: human-readable `REG00001` identifiers from an atomic sequence
//! - **Statistics**: read-only aggregates over the whole collection
//! - **Reducer / Effect**: the state-machine abstraction used by background
//!   workflows such as confirmation-email delivery
//!
//! ## Request flow
//!
//! ```text
//! payload ─▶ validate ─▶ duplicate check ─▶ insert (ID assigned) ─▶ response
//!                                                   │
//!                                                   └─▶ notifier.enqueue (background)
//! ```
//!
//! ## Example
//!
//! ```ignore
//! use reunion_core::service::RegistrationService;
//!
//! let service = RegistrationService::new(store, notifier, PricingPolicy::default(), clock);
//! let registration = service.register(&payload).await?;
//! println!("registered as {}", registration.registration_id);
//! ```

pub mod error;
pub mod notifier;
pub mod pricing;
pub mod query;
pub mod registration_id;
pub mod service;
pub mod stats;
pub mod store;
pub mod types;
pub mod validation;

// Re-export commonly used types
pub use chrono::{DateTime, Utc};
pub use error::{RegistryError, Result};
pub use registration_id::RegistrationId;
pub use service::RegistrationService;
pub use smallvec::{SmallVec, smallvec};
pub use types::Registration;

/// Reducer module - state machines driven by actions
///
/// Reducers are pure functions: `(State, Action, Environment) → (State, Effects)`.
/// They hold the decision logic of a workflow and describe its I/O as effects,
/// which keeps every transition testable without a network or database.
pub mod reducer {
    use super::effect::Effect;
    use smallvec::SmallVec;

    /// The Reducer trait - decision logic of a workflow
    ///
    /// # Type Parameters
    ///
    /// - `State`: The state this reducer operates on
    /// - `Action`: The inputs this reducer processes
    /// - `Environment`: The injected dependencies effects may use
    ///
    /// # Example
    ///
    /// ```ignore
    /// impl Reducer for DeliveryReducer {
    ///     type State = DeliveryMachine;
    ///     type Action = DeliveryAction;
    ///     type Environment = DeliveryEnvironment;
    ///
    ///     fn reduce(
    ///         &self,
    ///         state: &mut DeliveryMachine,
    ///         action: DeliveryAction,
    ///         env: &DeliveryEnvironment,
    ///     ) -> SmallVec<[Effect<DeliveryAction>; 4]> {
    ///         match action {
    ///             DeliveryAction::Start => smallvec![verify(env, state.current_port())],
    ///             _ => SmallVec::new(),
    ///         }
    ///     }
    /// }
    /// ```
    pub trait Reducer {
        /// The state type this reducer operates on
        type State;

        /// The action type this reducer processes
        type Action;

        /// The environment type with injected dependencies
        type Environment;

        /// Reduce an action into state changes and effects
        ///
        /// Updates `state` in place and returns descriptions of the side
        /// effects to run next. Effects may feed further actions back in.
        fn reduce(
            &self,
            state: &mut Self::State,
            action: Self::Action,
            env: &Self::Environment,
        ) -> SmallVec<[Effect<Self::Action>; 4]>;
    }
}

/// Effect module - side effect descriptions
///
/// Effects are values returned from reducers, not executions. The caller that
/// owns the reducer decides how and where to run them.
pub mod effect {
    use std::future::Future;
    use std::pin::Pin;

    /// Effect type - describes a side effect to be executed
    ///
    /// # Type Parameters
    ///
    /// - `Action`: The action type that effects can produce (feedback loop)
    pub enum Effect<Action> {
        /// No-op effect
        None,

        /// Arbitrary async computation
        ///
        /// Returns `Option<Action>` - if Some, the action is fed back into the reducer
        Future(Pin<Box<dyn Future<Output = Option<Action>> + Send>>),
    }

    // Future doesn't implement Debug
    impl<Action> std::fmt::Debug for Effect<Action> {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            match self {
                Effect::None => write!(f, "Effect::None"),
                Effect::Future(_) => write!(f, "Effect::Future(<future>)"),
            }
        }
    }

    impl<Action> Effect<Action> {
        /// Wrap an async computation that may produce a follow-up action.
        pub fn future<F>(fut: F) -> Self
        where
            F: Future<Output = Option<Action>> + Send + 'static,
        {
            Effect::Future(Box::pin(fut))
        }

        /// Whether this effect does nothing.
        #[must_use]
        pub const fn is_none(&self) -> bool {
            matches!(self, Effect::None)
        }
    }
}

/// Environment module - dependency injection traits
///
/// External dependencies are abstracted behind traits and injected, so
/// production code and tests differ only in what they pass in.
pub mod environment {
    use chrono::{DateTime, Utc};

    /// Clock trait - abstracts time operations for testability
    ///
    /// # Examples
    ///
    /// ```
    /// use reunion_core::environment::{Clock, SystemClock};
    ///
    /// let clock = SystemClock;
    /// let before = clock.now();
    /// assert!(clock.now() >= before);
    /// ```
    pub trait Clock: Send + Sync {
        /// Get the current time
        fn now(&self) -> DateTime<Utc>;
    }

    /// Wall-clock time.
    #[derive(Debug, Clone, Copy, Default)]
    pub struct SystemClock;

    impl Clock for SystemClock {
        fn now(&self) -> DateTime<Utc> {
            Utc::now()
        }
    }
}
