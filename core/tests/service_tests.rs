//! Registration service behaviour against the in-memory store.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)] // Test code can use unwrap/expect/panic

use proptest::prelude::*;
use reunion_core::error::{ConflictField, RegistryError};
use reunion_core::pricing::PricingPolicy;
use reunion_core::query::{ListFilter, ListQuery, SortField, SortOrder};
use reunion_core::store::RegistrationStore;
use reunion_core::types::{Batch, PaymentStatus};
use reunion_core::RegistrationService;
use reunion_testing::{InMemoryRegistrationStore, RecordingNotifier, fixtures, strategies, test_clock};
use serde_json::json;
use std::sync::Arc;

struct Harness {
    service: RegistrationService,
    store: Arc<InMemoryRegistrationStore>,
    notifier: Arc<RecordingNotifier>,
}

fn harness() -> Harness {
    reunion_testing::init_tracing();
    let store = Arc::new(InMemoryRegistrationStore::new());
    let notifier = Arc::new(RecordingNotifier::new());
    let service = RegistrationService::new(
        store.clone(),
        notifier.clone(),
        PricingPolicy::default(),
        Arc::new(test_clock()),
    );
    Harness { service, store, notifier }
}

fn assert_conflict(error: RegistryError, expected: ConflictField) {
    match error {
        RegistryError::Conflict { field, .. } => assert_eq!(field, expected),
        other => panic!("expected {expected} conflict, got {other:?}"),
    }
}

#[tokio::test]
async fn register_assigns_sequential_ids_and_queues_confirmation() {
    let h = harness();

    let first = h.service.register(&fixtures::submission(1)).await.unwrap();
    let second = h.service.register(&fixtures::submission(2)).await.unwrap();

    assert_eq!(first.registration_id.as_str(), "REG00001");
    assert_eq!(second.registration_id.as_str(), "REG00002");
    assert_eq!(first.payment_status, PaymentStatus::Pending);
    assert!(!first.verified);
    assert!(!first.is_email_sent);
    assert_eq!(h.notifier.queued_ids(), vec!["REG00001", "REG00002"]);
}

#[tokio::test]
async fn concurrent_registrations_get_distinct_ids() {
    let h = harness();

    let handles: Vec<_> = (1..=10)
        .map(|n| {
            let service = h.service.clone();
            let payload = fixtures::submission(n);
            tokio::spawn(async move { service.register(&payload).await })
        })
        .collect();

    let mut ids = Vec::new();
    for handle in handles {
        ids.push(handle.await.unwrap().unwrap().registration_id.into_inner());
    }
    ids.sort();
    let expected: Vec<String> = (1..=10).map(|n| format!("REG{n:05}")).collect();
    assert_eq!(ids, expected);
}

#[tokio::test]
async fn sequence_outage_falls_back_to_clock_derived_id() {
    let h = harness();
    h.store.fail_sequence();

    let registration = h.service.register(&fixtures::submission(1)).await.unwrap();

    // 2025-01-01T00:00:00Z is 1_735_689_600_000 ms, which is 0 mod 100_000.
    assert_eq!(registration.registration_id.as_str(), "REG00000");
}

#[tokio::test]
async fn fallback_ids_never_repeat_an_assigned_id() {
    let h = harness();
    let sequenced = h.service.register(&fixtures::submission(1)).await.unwrap();

    h.store.fail_sequence();
    let first_fallback = h.service.register(&fixtures::submission(2)).await.unwrap();
    let second_fallback = h.service.register(&fixtures::submission(3)).await.unwrap();

    assert_eq!(sequenced.registration_id.as_str(), "REG00001");
    assert_eq!(first_fallback.registration_id.as_str(), "REG00000");
    // REG00000 and REG00001 are both taken, so the third draw is used
    assert_eq!(second_fallback.registration_id.as_str(), "REG00002");
}

#[tokio::test]
async fn sequence_skips_numbers_issued_by_the_fallback() {
    let h = harness();
    h.store.fail_sequence();
    let fallback_first = h.service.register(&fixtures::submission(1)).await.unwrap();
    let fallback_second = h.service.register(&fixtures::submission(2)).await.unwrap();
    assert_eq!(fallback_second.registration_id.as_str(), "REG00001");

    h.store.restore_sequence();
    let sequenced = h.service.register(&fixtures::submission(3)).await.unwrap();

    assert_eq!(fallback_first.registration_id.as_str(), "REG00000");
    assert_eq!(sequenced.registration_id.as_str(), "REG00002");
    assert_eq!(h.store.len(), 3);
}

#[tokio::test]
async fn stored_record_round_trips() {
    let h = harness();
    let payload = fixtures::submission_with(
        7,
        &json!({
            "email": "  Mixed.Case@Example.COM ",
            "guests": [{"name": "Ravi", "gender": "Male", "foodChoice": "Non-Veg", "ageCategory": "child"}],
            "volunteer": {"interested": true, "categories": ["Logistics"], "details": "Weekends"}
        }),
    );

    let created = h.service.register(&payload).await.unwrap();
    let by_id = h.service.get(&created.id.to_string()).await.unwrap();
    let by_registration_id = h.service.get("reg00001").await.unwrap();

    assert_eq!(by_id, created);
    assert_eq!(by_registration_id, created);
    assert_eq!(created.details.email, "mixed.case@example.com");
    assert_eq!(created.details.guests.len(), 1);
    assert!(created.details.volunteer.interested);
    assert_eq!(created.total_attendees(), 2);
}

#[tokio::test]
async fn duplicate_email_is_rejected_with_existing_details() {
    let h = harness();
    h.service.register(&fixtures::submission(1)).await.unwrap();

    let duplicate = fixtures::submission_with(2, &json!({"email": "ALUM1@example.com"}));
    let error = h.service.register(&duplicate).await.unwrap_err();

    match error {
        RegistryError::Conflict { field, existing } => {
            assert_eq!(field, ConflictField::Email);
            let existing = existing.expect("email conflicts carry the existing record");
            assert_eq!(existing.email, fixtures::email(1));
            assert_eq!(existing.mobile, fixtures::mobile(1));
        },
        other => panic!("expected conflict, got {other:?}"),
    }
    assert_eq!(h.store.len(), 1);
    assert_eq!(h.notifier.queued().len(), 1);
}

#[tokio::test]
async fn conflicts_are_reported_email_then_mobile_then_transaction() {
    let h = harness();
    h.service.register(&fixtures::submission(1)).await.unwrap();
    h.service.register(&fixtures::submission(2)).await.unwrap();

    // Mobile of record 1, email of record 2: email wins.
    let both = fixtures::submission_with(
        3,
        &json!({"email": fixtures::email(2), "mobile": fixtures::mobile(1)}),
    );
    assert_conflict(h.service.register(&both).await.unwrap_err(), ConflictField::Email);

    let mobile = fixtures::submission_with(3, &json!({"mobile": fixtures::mobile(2)}));
    assert_conflict(h.service.register(&mobile).await.unwrap_err(), ConflictField::Mobile);

    let txn = fixtures::submission_with(3, &json!({"paymentTransactionId": fixtures::transaction_id(1)}));
    match h.service.register(&txn).await.unwrap_err() {
        RegistryError::Conflict { field, existing } => {
            assert_eq!(field, ConflictField::TransactionId);
            assert!(existing.is_none());
        },
        other => panic!("expected conflict, got {other:?}"),
    }
}

#[tokio::test]
async fn free_cohort_needs_no_transaction_id() {
    let h = harness();
    let payload = fixtures::submission_with(
        4,
        &json!({"batch": "Batch 28", "contributionAmount": null, "paymentTransactionId": null}),
    );

    let registration = h.service.register(&payload).await.unwrap();

    assert_eq!(registration.contribution_amount, 0);
    assert!(registration.payment_transaction_id.is_none());
}

#[tokio::test]
async fn invalid_submission_is_not_stored_or_queued() {
    let h = harness();
    let payload = fixtures::submission_with(1, &json!({"email": "nope", "batch": "Batch 31"}));

    let error = h.service.register(&payload).await.unwrap_err();

    let RegistryError::Validation(errors) = error else {
        panic!("expected validation error");
    };
    assert!(errors.has_field("email"));
    assert!(errors.has_field("batch"));
    assert!(h.store.is_empty());
    assert!(h.notifier.queued().is_empty());
}

#[tokio::test]
async fn completing_payment_verifies_and_reverting_keeps_verification() {
    let h = harness();
    let created = h.service.register(&fixtures::submission(1)).await.unwrap();
    let key = created.registration_id.to_string();

    let paid = h
        .service
        .update_payment(&key, &json!({"paymentStatus": "completed"}))
        .await
        .unwrap();
    assert_eq!(paid.payment_status, PaymentStatus::Completed);
    assert!(paid.verified);
    assert!(paid.verified_at.is_some());

    let refunded = h
        .service
        .update_payment(&key, &json!({"paymentStatus": "refunded"}))
        .await
        .unwrap();
    assert_eq!(refunded.payment_status, PaymentStatus::Refunded);
    assert!(refunded.verified);
}

#[tokio::test]
async fn clearing_transaction_id_on_paid_record_is_rejected() {
    let h = harness();
    let created = h.service.register(&fixtures::submission(1)).await.unwrap();

    let error = h
        .service
        .update_payment(created.registration_id.as_str(), &json!({"paymentTransactionId": null}))
        .await
        .unwrap_err();

    let RegistryError::Validation(errors) = error else {
        panic!("expected validation error");
    };
    assert!(errors.has_field("paymentTransactionId"));
    let stored = h.store.snapshot(created.id).unwrap();
    assert_eq!(stored.payment_transaction_id.as_deref(), Some("TXN1"));
}

#[tokio::test]
async fn toggles_flip_and_record_timestamps() {
    let h = harness();
    let created = h.service.register(&fixtures::submission(1)).await.unwrap();
    let key = created.id.to_string();

    let verified = h.service.toggle_verified(&key).await.unwrap();
    assert!(verified.verified);
    assert_eq!(verified.verified_at, Some(test_clock_now()));

    let unverified = h.service.toggle_verified(&key).await.unwrap();
    assert!(!unverified.verified);
    assert!(unverified.verified_at.is_none());

    let present = h.service.toggle_attendance(&key).await.unwrap();
    assert!(present.attended);
    assert!(present.attendance_marked_at.is_some());
}

fn test_clock_now() -> chrono::DateTime<chrono::Utc> {
    use reunion_core::environment::Clock;
    test_clock().now()
}

#[tokio::test]
async fn update_merges_fields_and_keeps_identity() {
    let h = harness();
    let created = h.service.register(&fixtures::submission(1)).await.unwrap();

    let updated = h
        .service
        .update(
            created.registration_id.as_str(),
            &json!({"name": "Renamed Alum", "attendees": {"children": 2}}),
        )
        .await
        .unwrap();

    assert_eq!(updated.id, created.id);
    assert_eq!(updated.registration_id, created.registration_id);
    assert_eq!(updated.created_at, created.created_at);
    assert_eq!(updated.details.name, "Renamed Alum");
    assert_eq!(updated.details.attendees.adults, 1);
    assert_eq!(updated.details.attendees.children, 2);
    assert_eq!(updated.details.email, created.details.email);
}

#[tokio::test]
async fn update_rejects_read_only_fields_and_taken_keys() {
    let h = harness();
    let first = h.service.register(&fixtures::submission(1)).await.unwrap();
    h.service.register(&fixtures::submission(2)).await.unwrap();
    let key = first.id.to_string();

    let error = h
        .service
        .update(&key, &json!({"registrationId": "REG99999"}))
        .await
        .unwrap_err();
    assert!(matches!(error, RegistryError::Validation(ref e) if e.has_field("registrationId")));

    let error = h
        .service
        .update(&key, &json!({"mobile": fixtures::mobile(2)}))
        .await
        .unwrap_err();
    assert_conflict(error, ConflictField::Mobile);

    // Re-saving its own keys is not a conflict.
    h.service
        .update(&key, &json!({"email": fixtures::email(1)}))
        .await
        .unwrap();
}

#[tokio::test]
async fn delete_removes_and_second_delete_is_not_found() {
    let h = harness();
    let created = h.service.register(&fixtures::submission(1)).await.unwrap();

    let deleted = h.service.delete("REG00001").await.unwrap();
    assert_eq!(deleted.id, created.id);
    assert!(h.store.is_empty());

    let error = h.service.delete("REG00001").await.unwrap_err();
    assert!(matches!(error, RegistryError::NotFound(_)));
}

#[tokio::test]
async fn unknown_keys_are_not_found() {
    let h = harness();
    assert!(matches!(
        h.service.get("REG00042").await.unwrap_err(),
        RegistryError::NotFound(_)
    ));
    assert!(matches!(
        h.service.toggle_verified(&uuid::Uuid::new_v4().to_string()).await.unwrap_err(),
        RegistryError::NotFound(_)
    ));
}

#[tokio::test]
async fn resend_queues_only_unsent_records() {
    let h = harness();
    for n in 1..=3 {
        h.service.register(&fixtures::submission(n)).await.unwrap();
    }
    let delivered = h.service.get("REG00002").await.unwrap();
    h.store.set_email_sent(delivered.id, true).await.unwrap();
    let before = h.notifier.queued().len();

    let summary = h.service.resend_unsent().await.unwrap();

    assert_eq!(summary.pending, 2);
    assert_eq!(summary.queued, 2);
    assert_eq!(&h.notifier.queued_ids()[before..], ["REG00001", "REG00003"]);
}

#[tokio::test]
async fn resend_reports_rejected_jobs() {
    let h = harness();
    h.service.register(&fixtures::submission(1)).await.unwrap();
    h.notifier.reject_all();

    let summary = h.service.resend_unsent().await.unwrap();

    assert_eq!(summary.pending, 1);
    assert_eq!(summary.queued, 0);
}

#[tokio::test]
async fn registration_survives_a_full_queue() {
    let h = harness();
    h.notifier.reject_all();

    let registration = h.service.register(&fixtures::submission(1)).await.unwrap();

    assert!(!registration.is_email_sent);
    assert_eq!(h.store.len(), 1);
}

#[tokio::test]
async fn list_filters_sorts_and_pages() {
    let h = harness();
    for n in 1..=5 {
        let batch = if n % 2 == 0 { "Batch 10" } else { "Batch 2" };
        h.service
            .register(&fixtures::submission_with(n, &json!({"batch": batch})))
            .await
            .unwrap();
    }

    let query = ListQuery {
        page: 1,
        limit: 2,
        sort_by: SortField::RegistrationId,
        sort_order: SortOrder::Asc,
        filter: ListFilter {
            batch: Batch::new(2),
            ..ListFilter::default()
        },
    };
    let page = h.service.list(&query).await.unwrap();
    assert_eq!(page.total, 3);
    let ids: Vec<_> = page.items.iter().map(|r| r.registration_id.as_str()).collect();
    assert_eq!(ids, ["REG00001", "REG00003"]);

    let last = h
        .service
        .list(&ListQuery { page: 2, ..query.clone() })
        .await
        .unwrap();
    assert_eq!(last.items.len(), 1);
    assert_eq!(last.items[0].registration_id.as_str(), "REG00005");

    let by_batch = h
        .service
        .list(&ListQuery {
            sort_by: SortField::Batch,
            sort_order: SortOrder::Desc,
            limit: 10,
            filter: ListFilter::default(),
            ..query
        })
        .await
        .unwrap();
    assert_eq!(by_batch.items[0].details.batch, Batch::new(10).unwrap());
}

#[tokio::test]
async fn search_matches_exact_keys_only() {
    let h = harness();
    h.service.register(&fixtures::submission(1)).await.unwrap();
    h.service.register(&fixtures::submission(12)).await.unwrap();

    assert_eq!(h.service.search("TXN1").await.unwrap().len(), 1);
    assert_eq!(h.service.search("ALUM12@EXAMPLE.COM").await.unwrap().len(), 1);
    assert_eq!(h.service.search("reg00002").await.unwrap().len(), 1);
    assert!(h.service.search("TXN").await.unwrap().is_empty());
    assert!(matches!(
        h.service.search("   ").await.unwrap_err(),
        RegistryError::Validation(_)
    ));
}

#[tokio::test]
async fn stats_count_contributions_and_present_headcount() {
    let h = harness();
    let family = fixtures::submission_with(
        1,
        &json!({
            "attendees": {"adults": 2, "children": 1, "infants": 1},
            "guests": [{"name": "Meera", "gender": "Female", "foodChoice": "Veg", "ageCategory": "adult"}],
            "contributionAmount": 700
        }),
    );
    let family = h.service.register(&family).await.unwrap();
    h.service.register(&fixtures::submission(2)).await.unwrap();

    h.service.toggle_verified(&family.id.to_string()).await.unwrap();
    h.service.toggle_attendance(&family.id.to_string()).await.unwrap();

    let stats = h.service.stats().await.unwrap();
    assert_eq!(stats.total_registrations, 2);
    assert_eq!(stats.total_contribution, 1000);
    assert_eq!(stats.verified_contribution, 700);
    assert_eq!(stats.unverified_contribution, 300);
    assert_eq!(stats.verification.verified, 1);
    assert_eq!(stats.payment_status["pending"], 2);
    assert_eq!(stats.payment_status["completed"], 0);
    assert_eq!(stats.batches.len(), 1);
    assert_eq!(stats.batches[0].count, 2);
    assert_eq!(stats.attendees.adults, 3);
    assert_eq!(stats.attendees.guests, 1);
    // Registrant + one more adult + child + infant; the guest is not counted.
    assert_eq!(stats.total_present, 4);
}

#[tokio::test]
async fn empty_stats_are_zero_filled() {
    let h = harness();
    let stats = h.service.stats().await.unwrap();
    assert_eq!(stats.total_registrations, 0);
    assert_eq!(stats.food_choice["Veg"], 0);
    assert_eq!(stats.food_choice["Non-Veg"], 0);
    assert!(stats.batches.is_empty());
}

#[tokio::test]
async fn export_returns_every_record() {
    let h = harness();
    for n in 1..=3 {
        h.service.register(&fixtures::submission(n)).await.unwrap();
    }
    assert_eq!(h.service.export().await.unwrap().len(), 3);
}

proptest! {
    #[test]
    fn total_attendees_counts_party_and_guests(
        attendees in strategies::attendees(),
        guests in strategies::guests(5),
    ) {
        let h = harness();
        let payload = fixtures::submission_with(1, &json!({
            "attendees": {
                "adults": attendees.adults,
                "children": attendees.children,
                "infants": attendees.infants,
            },
            "guests": guests,
        }));

        let registration = tokio_test::block_on(h.service.register(&payload)).unwrap();

        let expected = attendees.adults + attendees.children + attendees.infants + guests.len() as u32;
        prop_assert_eq!(registration.total_attendees(), expected);
        prop_assert_eq!(registration.details.attendees, attendees);
    }
}
