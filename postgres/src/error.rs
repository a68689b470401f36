//! Translating `sqlx` failures into [`RegistryError`].

use reunion_core::error::{ConflictField, RegistryError};

/// Unique constraint on `registration_id`.
pub(crate) const REGISTRATION_ID_CONSTRAINT: &str = "registrations_registration_id_key";

/// Which unique key a constraint protects, by constraint name.
pub(crate) fn conflict_field(constraint: &str) -> Option<ConflictField> {
    match constraint {
        "registrations_email_key" => Some(ConflictField::Email),
        "registrations_mobile_key" => Some(ConflictField::Mobile),
        "registrations_payment_transaction_id_key" => Some(ConflictField::TransactionId),
        _ => None,
    }
}

/// The unique key whose constraint `error` violated, if any.
pub(crate) fn violated_key(error: &sqlx::Error) -> Option<ConflictField> {
    match error {
        sqlx::Error::Database(db) if db.is_unique_violation() => db.constraint().and_then(conflict_field),
        _ => None,
    }
}

/// Whether `error` is a collision on the registration ID column.
pub(crate) fn is_registration_id_taken(error: &sqlx::Error) -> bool {
    match error {
        sqlx::Error::Database(db) => {
            db.is_unique_violation() && db.constraint() == Some(REGISTRATION_ID_CONSTRAINT)
        },
        _ => false,
    }
}

/// Wrap a database failure with what was being attempted.
pub(crate) fn storage(action: &str, error: &sqlx::Error) -> RegistryError {
    RegistryError::Storage(format!("Failed to {action}: {error}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constraint_names_map_to_fields() {
        assert_eq!(conflict_field("registrations_email_key"), Some(ConflictField::Email));
        assert_eq!(conflict_field("registrations_mobile_key"), Some(ConflictField::Mobile));
        assert_eq!(
            conflict_field("registrations_payment_transaction_id_key"),
            Some(ConflictField::TransactionId)
        );
        // Registration ID collisions are retried, never reported as a conflict
        assert_eq!(conflict_field(REGISTRATION_ID_CONSTRAINT), None);
    }

    #[test]
    fn non_database_errors_are_not_conflicts() {
        assert_eq!(violated_key(&sqlx::Error::RowNotFound), None);
        assert!(!is_registration_id_taken(&sqlx::Error::RowNotFound));
        let error = storage("load registration", &sqlx::Error::RowNotFound);
        assert!(error.to_string().contains("Failed to load registration"));
    }
}
