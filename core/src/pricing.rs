//! Contribution pricing.
//!
//! The registrant is always the first adult. Cohorts on the free list pay
//! nothing for the first adult; everyone else pays the base fee. Additional
//! adults and children are charged per head, infants are free, and named
//! guests are never billed.

use crate::types::{Attendees, Batch};
use serde::Serialize;

/// Fee schedule, fixed at startup.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PricingPolicy {
    /// First-adult fee for paying cohorts
    pub base_fee: u64,
    /// Fee for each adult beyond the first
    pub additional_adult_fee: u64,
    /// Fee for each child
    pub child_fee: u64,
    /// Promotional period: children are free
    pub free_children: bool,
    /// Cohorts whose first adult is free
    pub free_batches: Vec<Batch>,
}

impl Default for PricingPolicy {
    fn default() -> Self {
        Self {
            base_fee: 300,
            additional_adult_fee: 250,
            child_fee: 150,
            free_children: false,
            free_batches: (26..=30).filter_map(Batch::new).collect(),
        }
    }
}

/// Itemised contribution.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    /// Cohort the quote was computed for
    pub batch: Batch,
    /// First-adult charge
    pub first_adult: u64,
    /// Charge for adults beyond the first
    pub additional_adults: u64,
    /// Charge for children
    pub children: u64,
    /// Always zero
    pub infants: u64,
    /// Sum of the above
    pub total: u64,
}

impl PricingPolicy {
    /// Whether the cohort's first adult is free.
    #[must_use]
    pub fn is_free_batch(&self, batch: Batch) -> bool {
        self.free_batches.contains(&batch)
    }

    /// Itemised breakdown for a cohort and party.
    #[must_use]
    pub fn quote(&self, batch: Batch, attendees: &Attendees) -> Quote {
        let first_adult = if self.is_free_batch(batch) { 0 } else { self.base_fee };
        let extra_adults = u64::from(attendees.adults.saturating_sub(1));
        let additional_adults = extra_adults.saturating_mul(self.additional_adult_fee);
        let child_fee = if self.free_children { 0 } else { self.child_fee };
        let children = u64::from(attendees.children).saturating_mul(child_fee);

        Quote {
            batch,
            first_adult,
            additional_adults,
            children,
            infants: 0,
            total: first_adult
                .saturating_add(additional_adults)
                .saturating_add(children),
        }
    }

    /// Total contribution for a cohort and party.
    #[must_use]
    pub fn contribution(&self, batch: Batch, attendees: &Attendees) -> u64 {
        self.quote(batch, attendees).total
    }
}
