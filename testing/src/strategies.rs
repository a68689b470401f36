//! proptest strategies for domain values.

use proptest::prelude::*;
use reunion_core::types::{Attendees, Batch};

/// Any cohort, `Batch 1` to `Batch 30`.
pub fn batch() -> impl Strategy<Value = Batch> {
    (1..=Batch::COUNT).prop_filter_map("batch in range", Batch::new)
}

/// Party sizes inside the accepted bounds.
pub fn attendees() -> impl Strategy<Value = Attendees> {
    (1u32..=20, 0u32..=20, 0u32..=10).prop_map(|(adults, children, infants)| Attendees {
        adults,
        children,
        infants,
    })
}

/// A guest list of up to `max` entries as submission JSON.
pub fn guests(max: usize) -> impl Strategy<Value = Vec<serde_json::Value>> {
    let guest = (
        "[A-Z][a-z]{2,12}",
        prop::sample::select(vec!["Male", "Female", "Other"]),
        prop::sample::select(vec!["Veg", "Non-Veg"]),
        prop::sample::select(vec!["adult", "child", "infant"]),
    )
        .prop_map(|(name, gender, food, age)| {
            serde_json::json!({
                "name": name,
                "gender": gender,
                "foodChoice": food,
                "ageCategory": age,
            })
        });
    prop::collection::vec(guest, 0..=max)
}
