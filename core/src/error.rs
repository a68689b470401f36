//! Error types for registry operations.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// One field-level validation failure.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FieldError {
    /// JSON path of the offending field, e.g. `guests[2].name`
    pub field: String,
    /// Human-readable message
    pub message: String,
}

/// Every validation failure found in one payload, in discovery order.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors(Vec<FieldError>);

impl ValidationErrors {
    /// An empty collection.
    #[must_use]
    pub const fn new() -> Self {
        Self(Vec::new())
    }

    /// A collection holding a single error.
    pub fn single(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.push(field, message);
        errors
    }

    /// Record a failure.
    pub fn push(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.push(FieldError {
            field: field.into(),
            message: message.into(),
        });
    }

    /// Whether nothing failed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of failures.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// The failures, in discovery order.
    #[must_use]
    pub fn errors(&self) -> &[FieldError] {
        &self.0
    }

    /// Whether any failure is reported against `field`.
    #[must_use]
    pub fn has_field(&self, field: &str) -> bool {
        self.0.iter().any(|error| error.field == field)
    }

    /// `Ok(value)` when empty, otherwise `Err(self)`.
    ///
    /// # Errors
    ///
    /// Returns `self` when at least one failure was recorded.
    pub fn into_result<T>(self, value: T) -> std::result::Result<T, Self> {
        if self.is_empty() { Ok(value) } else { Err(self) }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for error in &self.0 {
            if !first {
                f.write_str("; ")?;
            }
            write!(f, "{}: {}", error.field, error.message)?;
            first = false;
        }
        Ok(())
    }
}

/// Which unique key collided.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum ConflictField {
    /// Email address
    #[serde(rename = "email")]
    Email,
    /// Mobile number
    #[serde(rename = "mobile")]
    Mobile,
    /// Payment transaction ID
    #[serde(rename = "paymentTransactionId")]
    TransactionId,
}

impl ConflictField {
    /// JSON field name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Email => "email",
            Self::Mobile => "mobile",
            Self::TransactionId => "paymentTransactionId",
        }
    }

    /// Message shown to the submitter.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::Email => "A registration with this email already exists",
            Self::Mobile => "A registration with this mobile number already exists",
            Self::TransactionId => "This payment transaction ID has already been used",
        }
    }
}

impl fmt::Display for ConflictField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Minimal details of the record a submission collided with.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExistingRegistration {
    /// Email on file
    pub email: String,
    /// Mobile on file
    pub mobile: String,
    /// When the earlier registration was made
    pub created_at: DateTime<Utc>,
}

/// Errors returned by registry operations.
#[derive(Error, Debug)]
pub enum RegistryError {
    /// Input failed validation
    #[error("validation failed: {0}")]
    Validation(ValidationErrors),

    /// A unique key is already taken
    ///
    /// `existing` is only present for email and mobile collisions; for
    /// transaction IDs, or when a storage constraint fired without the store
    /// being able to load the other record, it is `None`.
    #[error("{field} already registered")]
    Conflict {
        /// Which key collided
        field: ConflictField,
        /// The colliding record, when it may be shown
        existing: Option<ExistingRegistration>,
    },

    /// No record with the given identifier
    #[error("registration not found: {0}")]
    NotFound(String),

    /// The backing store failed
    #[error("storage error: {0}")]
    Storage(String),

    /// Anything else
    #[error("internal error: {0}")]
    Internal(String),
}

impl RegistryError {
    /// Build a conflict, dropping the existing-record details for keys that
    /// must not echo another registrant's data.
    #[must_use]
    pub fn conflict(field: ConflictField, existing: Option<ExistingRegistration>) -> Self {
        let existing = match field {
            ConflictField::Email | ConflictField::Mobile => existing,
            ConflictField::TransactionId => None,
        };
        Self::Conflict { field, existing }
    }
}

impl From<ValidationErrors> for RegistryError {
    fn from(errors: ValidationErrors) -> Self {
        Self::Validation(errors)
    }
}

/// Result type for registry operations.
pub type Result<T> = std::result::Result<T, RegistryError>;

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)] // Test code can use unwrap/expect
mod tests {
    use super::*;

    #[test]
    fn collects_in_order() {
        let mut errors = ValidationErrors::new();
        errors.push("name", "is required");
        errors.push("email", "must be a valid email address");

        assert_eq!(errors.len(), 2);
        assert_eq!(errors.errors()[0].field, "name");
        assert_eq!(
            errors.to_string(),
            "name: is required; email: must be a valid email address"
        );
        assert!(errors.clone().into_result(()).is_err());
        assert!(ValidationErrors::new().into_result(1).is_ok());
    }

    #[test]
    fn into_result_hands_back_the_collected_errors() {
        let mut errors = ValidationErrors::new();
        errors.push("mobile", "must be a 10-digit Indian mobile number");

        let returned: std::result::Result<u8, ValidationErrors> = errors.into_result(7);
        let returned = returned.unwrap_err();
        assert!(returned.has_field("mobile"));
        assert_eq!(ValidationErrors::new().into_result("ok"), Ok("ok"));
    }

    #[test]
    fn transaction_conflicts_hide_existing_record() {
        let existing = ExistingRegistration {
            email: "a@x.com".to_string(),
            mobile: "9876543210".to_string(),
            created_at: Utc::now(),
        };
        let error = RegistryError::conflict(ConflictField::TransactionId, Some(existing));
        assert!(matches!(error, RegistryError::Conflict { existing: None, .. }));
    }
}
