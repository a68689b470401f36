//! Registration payloads and records for tests.
//!
//! Fixture `n` uses email `alum{n}@example.com`, mobile `98{n:08}` and
//! transaction ID `TXN{n}`, so distinct `n` never collide.

use crate::mocks::test_clock;
use reunion_core::environment::Clock;
use reunion_core::pricing::PricingPolicy;
use reunion_core::registration_id::RegistrationId;
use reunion_core::types::Registration;
use reunion_core::validation::validate_submission;
use serde_json::{Value, json};
use uuid::Uuid;

/// Email used by fixture `n`.
#[must_use]
pub fn email(n: u32) -> String {
    format!("alum{n}@example.com")
}

/// Mobile number used by fixture `n`.
#[must_use]
pub fn mobile(n: u32) -> String {
    format!("98{n:08}")
}

/// Transaction ID used by fixture `n`.
#[must_use]
pub fn transaction_id(n: u32) -> String {
    format!("TXN{n}")
}

/// A valid submission: Batch 1, one adult, a paid contribution of 300.
#[must_use]
pub fn submission(n: u32) -> Value {
    json!({
        "name": format!("Alum Number {n}"),
        "email": email(n),
        "mobile": mobile(n),
        "gender": "Female",
        "batch": "Batch 1",
        "rollNumber": format!("R{n}"),
        "foodChoice": "Veg",
        "expectedArrivalTime": "8-11",
        "overnightAccommodation": "No",
        "attendees": {"adults": 1, "children": 0, "infants": 0},
        "contributionAmount": 300,
        "paymentTransactionId": transaction_id(n),
    })
}

/// `submission(n)` with `fields` merged over it; a `null` value removes the key.
#[must_use]
pub fn submission_with(n: u32, fields: &Value) -> Value {
    let mut payload = submission(n);
    if let (Some(target), Some(overrides)) = (payload.as_object_mut(), fields.as_object()) {
        for (key, value) in overrides {
            if value.is_null() {
                target.remove(key);
            } else {
                target.insert(key.clone(), value.clone());
            }
        }
    }
    payload
}

/// A stored record for `submission(n)`, numbered `REG{n:05}` and created at
/// the test clock's time.
///
/// # Panics
///
/// Panics if the fixture payload fails validation.
#[must_use]
#[allow(clippy::expect_used)] // Fixture payload is known to be valid
pub fn registration(n: u32) -> Registration {
    validate_submission(&submission(n), &PricingPolicy::default())
        .expect("fixture submission should validate")
        .into_registration(
            Uuid::new_v4(),
            RegistrationId::from_sequence(u64::from(n)),
            test_clock().now(),
        )
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)] // Test code can use unwrap/expect
mod tests {
    use super::*;

    #[test]
    fn fixtures_are_distinct_and_valid() {
        let first = registration(1);
        let second = registration(2);
        assert_eq!(first.registration_id.as_str(), "REG00001");
        assert_eq!(first.details.mobile, "9800000001");
        assert_ne!(first.details.email, second.details.email);
        assert_eq!(first.payment_transaction_id.as_deref(), Some("TXN1"));
    }

    #[test]
    fn overrides_replace_and_remove_keys() {
        let payload = submission_with(3, &json!({"batch": "Batch 28", "gender": null}));
        assert_eq!(payload["batch"], "Batch 28");
        assert!(payload.get("gender").is_none());
    }
}
