//! Dashboard statistics.
//!
//! Every figure is an independent aggregation over the whole collection.
//! Distributions are zero-filled so that every enum value appears even when
//! no record uses it, and an empty collection yields all zeros.

use crate::types::{Accommodation, ArrivalWindow, Batch, FoodChoice, Labelled, PaymentStatus, Registration};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Count per label.
pub type Distribution = BTreeMap<String, u64>;

/// A distribution with every value of `T` present at zero.
#[must_use]
pub fn zero_filled<T: Labelled>() -> Distribution {
    T::all().into_iter().map(|value| (value.label(), 0)).collect()
}

/// Verified vs. unverified record counts.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationCounts {
    /// Verified records
    pub verified: u64,
    /// Unverified records
    pub unverified: u64,
}

/// Registrations in one cohort.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchCount {
    /// Cohort label
    pub batch: String,
    /// Number of registrations
    pub count: u64,
}

/// Attendee counts summed across every record.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendeeTotals {
    /// Adults
    pub adults: u64,
    /// Children
    pub children: u64,
    /// Infants
    pub infants: u64,
    /// Named guests
    pub guests: u64,
    /// Sum of the above
    pub total: u64,
}

/// The statistics summary.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationStats {
    /// Number of records
    pub total_registrations: u64,
    /// Sum of all contributions
    pub total_contribution: u64,
    /// Sum of contributions on verified records
    pub verified_contribution: u64,
    /// Sum of contributions on unverified records
    pub unverified_contribution: u64,
    /// Records per payment status
    pub payment_status: Distribution,
    /// Verified vs. unverified
    pub verification: VerificationCounts,
    /// Records per cohort, in cohort order; cohorts with no records are omitted
    pub batches: Vec<BatchCount>,
    /// Records per meal preference
    pub food_choice: Distribution,
    /// Records per arrival window
    pub arrival_time: Distribution,
    /// Records per accommodation answer
    pub accommodation: Distribution,
    /// Summed attendee counts
    pub attendees: AttendeeTotals,
    /// Headcount of records marked present
    pub total_present: u64,
}

impl Default for RegistrationStats {
    fn default() -> Self {
        Self {
            total_registrations: 0,
            total_contribution: 0,
            verified_contribution: 0,
            unverified_contribution: 0,
            payment_status: zero_filled::<PaymentStatus>(),
            verification: VerificationCounts::default(),
            batches: Vec::new(),
            food_choice: zero_filled::<FoodChoice>(),
            arrival_time: zero_filled::<ArrivalWindow>(),
            accommodation: zero_filled::<Accommodation>(),
            attendees: AttendeeTotals::default(),
            total_present: 0,
        }
    }
}

impl RegistrationStats {
    /// Fold statistics over records held in memory.
    pub fn from_records<'a, I>(records: I) -> Self
    where
        I: IntoIterator<Item = &'a Registration>,
    {
        let mut stats = Self::default();
        let mut batches: BTreeMap<Batch, u64> = BTreeMap::new();

        for record in records {
            let amount = record.contribution_amount;
            let details = &record.details;

            stats.total_registrations += 1;
            stats.total_contribution = stats.total_contribution.saturating_add(amount);
            if record.verified {
                stats.verification.verified += 1;
                stats.verified_contribution = stats.verified_contribution.saturating_add(amount);
            } else {
                stats.verification.unverified += 1;
                stats.unverified_contribution = stats.unverified_contribution.saturating_add(amount);
            }

            bump(&mut stats.payment_status, record.payment_status.as_str());
            bump(&mut stats.food_choice, details.food_choice.as_str());
            bump(&mut stats.arrival_time, details.expected_arrival_time.as_str());
            bump(&mut stats.accommodation, details.overnight_accommodation.as_str());
            *batches.entry(details.batch).or_default() += 1;

            let attendees = &details.attendees;
            stats.attendees.adults += u64::from(attendees.adults);
            stats.attendees.children += u64::from(attendees.children);
            stats.attendees.infants += u64::from(attendees.infants);
            stats.attendees.guests += details.guests.len() as u64;

            if record.attended {
                stats.total_present += u64::from(record.present_headcount());
            }
        }

        stats.attendees.total = stats.attendees.adults
            + stats.attendees.children
            + stats.attendees.infants
            + stats.attendees.guests;
        stats.batches = batches
            .into_iter()
            .map(|(batch, count)| BatchCount { batch: batch.to_string(), count })
            .collect();
        stats
    }
}

fn bump(distribution: &mut Distribution, label: &str) {
    *distribution.entry(label.to_string()).or_default() += 1;
}
