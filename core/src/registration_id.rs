//! Human-readable registration identifiers.
//!
//! IDs look like `REG00042`: a fixed prefix followed by a zero-padded
//! sequence number. Stores hand out sequence numbers from an atomic counter
//! (a Postgres sequence, or an atomic integer in memory); the helpers here
//! only format and parse.
//!
//! Registration IDs are unique in storage. A store that draws an ID already
//! held by another record draws again, up to [`ASSIGN_ATTEMPTS`] times.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Prefix every registration ID starts with.
pub const PREFIX: &str = "REG";

/// Minimum number of digits after the prefix.
pub const WIDTH: usize = 5;

/// Modulus applied to timestamp-derived fallback numbers.
const FALLBACK_MODULUS: i64 = 100_000;

/// How many IDs a store draws for one insert before giving up.
pub const ASSIGN_ATTEMPTS: u32 = 16;

/// A formatted registration ID.
///
/// Ordered by length, then text, so `REG99999` sorts before `REG100000`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RegistrationId(String);

impl RegistrationId {
    /// Format sequence number `n`.
    #[must_use]
    pub fn from_sequence(n: u64) -> Self {
        Self(format!("{PREFIX}{n:0WIDTH$}"))
    }

    /// Wrap a value read back from storage without re-validating it.
    #[must_use]
    pub const fn from_stored(raw: String) -> Self {
        Self(raw)
    }

    /// ID derived from the clock, used when the counter is unavailable.
    ///
    /// `attempt` offsets the number so a store can draw again after a
    /// collision with an existing ID. Not ordered relative to sequence IDs.
    #[must_use]
    pub fn fallback(now: DateTime<Utc>, attempt: u32) -> Self {
        let n = (now.timestamp_millis() + i64::from(attempt)).rem_euclid(FALLBACK_MODULUS);
        Self::from_sequence(n.unsigned_abs())
    }

    /// The numeric suffix, if this ID is well-formed.
    #[must_use]
    pub fn sequence(&self) -> Option<u64> {
        parse_sequence(&self.0)
    }

    /// The ID as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume into the inner string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl Ord for RegistrationId {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.len().cmp(&other.0.len()).then_with(|| self.0.cmp(&other.0))
    }
}

impl PartialOrd for RegistrationId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for RegistrationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for RegistrationId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Extract the sequence number from `REG` followed by at least [`WIDTH`] digits.
#[must_use]
pub fn parse_sequence(raw: &str) -> Option<u64> {
    let digits = raw.strip_prefix(PREFIX)?;
    if digits.len() < WIDTH || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// Next ID after the highest one assigned so far, starting at 1.
///
/// An unparseable `highest` is treated like an empty collection. Used to seed
/// counters from existing data.
#[must_use]
pub fn next_after(highest: Option<&str>) -> RegistrationId {
    let next = highest
        .and_then(parse_sequence)
        .map_or(1, |n| n.saturating_add(1));
    RegistrationId::from_sequence(next)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)] // Test code can use unwrap/expect
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn formats_with_padding() {
        assert_eq!(RegistrationId::from_sequence(1).as_str(), "REG00001");
        assert_eq!(RegistrationId::from_sequence(99_999).as_str(), "REG99999");
        assert_eq!(RegistrationId::from_sequence(123_456).as_str(), "REG123456");
    }

    #[test]
    fn parses_suffix() {
        assert_eq!(parse_sequence("REG00042"), Some(42));
        assert_eq!(parse_sequence("REG123456"), Some(123_456));
        assert_eq!(parse_sequence("REG42"), None);
        assert_eq!(parse_sequence("ABC00042"), None);
        assert_eq!(parse_sequence("REG0004x"), None);
    }

    #[test]
    fn next_after_starts_at_one() {
        assert_eq!(next_after(None).as_str(), "REG00001");
        assert_eq!(next_after(Some("garbage")).as_str(), "REG00001");
        assert_eq!(next_after(Some("REG00041")).as_str(), "REG00042");
    }

    #[test]
    fn fallback_stays_in_range() {
        let now = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let id = RegistrationId::fallback(now, 0);
        let n = id.sequence().unwrap();
        assert!(n < 100_000);
        assert_eq!(id.as_str().len(), PREFIX.len() + WIDTH);
    }

    #[test]
    fn fallback_attempts_draw_distinct_ids() {
        let now = Utc.with_ymd_and_hms(2025, 1, 1, 0, 1, 39).unwrap() + chrono::Duration::milliseconds(999);
        let ids: Vec<_> = (0..ASSIGN_ATTEMPTS).map(|attempt| RegistrationId::fallback(now, attempt)).collect();

        // 99_999 ms past a multiple of the modulus: the next attempt wraps to zero
        assert_eq!(ids[0].as_str(), "REG99999");
        assert_eq!(ids[1].as_str(), "REG00000");
        let mut unique = ids.clone();
        unique.sort();
        unique.dedup();
        assert_eq!(unique.len(), ids.len());
    }

    #[test]
    fn sequence_order_matches_number_order() {
        let ids: Vec<_> = (1..=12).map(RegistrationId::from_sequence).collect();
        assert!(ids.windows(2).all(|w| w[0].sequence() < w[1].sequence()));
        assert!(ids.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn wider_ids_sort_after_narrower_ones() {
        let narrow = RegistrationId::from_sequence(99_999);
        let wide = RegistrationId::from_sequence(100_000);
        assert!(narrow < wide);
        assert!(narrow.as_str() > wide.as_str());

        let mut ids = vec![wide.clone(), RegistrationId::from_sequence(2), narrow.clone()];
        ids.sort();
        assert_eq!(ids, vec![RegistrationId::from_sequence(2), narrow, wide]);
    }
}
