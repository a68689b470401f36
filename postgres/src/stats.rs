//! Statistics computed in SQL.
//!
//! Each figure is its own aggregate query; they run concurrently on the pool.

use crate::error::storage;
use reunion_core::error::Result;
use reunion_core::stats::{AttendeeTotals, BatchCount, Distribution, RegistrationStats, VerificationCounts, zero_filled};
use reunion_core::types::{Accommodation, ArrivalWindow, Batch, FoodChoice, Labelled, PaymentStatus};
use sqlx::PgPool;

#[derive(Debug, Default, sqlx::FromRow)]
struct Totals {
    total_registrations: i64,
    total_contribution: i64,
    verified_contribution: i64,
    unverified_contribution: i64,
    verified: i64,
    adults: i64,
    children: i64,
    infants: i64,
    guests: i64,
    total_present: i64,
}

const TOTALS: &str = r"
    SELECT
        COUNT(*) AS total_registrations,
        COALESCE(SUM(contribution_amount), 0)::BIGINT AS total_contribution,
        COALESCE(SUM(contribution_amount) FILTER (WHERE verified), 0)::BIGINT AS verified_contribution,
        COALESCE(SUM(contribution_amount) FILTER (WHERE NOT verified), 0)::BIGINT AS unverified_contribution,
        COUNT(*) FILTER (WHERE verified) AS verified,
        COALESCE(SUM(adults), 0)::BIGINT AS adults,
        COALESCE(SUM(children), 0)::BIGINT AS children,
        COALESCE(SUM(infants), 0)::BIGINT AS infants,
        COALESCE(SUM(jsonb_array_length(guests)), 0)::BIGINT AS guests,
        COALESCE(
            SUM(1 + GREATEST(adults - 1, 0) + children + infants) FILTER (WHERE attended),
            0
        )::BIGINT AS total_present
    FROM registrations
";

async fn totals(pool: &PgPool) -> Result<Totals> {
    sqlx::query_as::<_, Totals>(TOTALS)
        .fetch_one(pool)
        .await
        .map_err(|e| storage("aggregate totals", &e))
}

/// Per-label counts over one text column, zero-filled for `T`.
async fn distribution<T: Labelled>(pool: &PgPool, column: &'static str) -> Result<Distribution> {
    let sql = format!("SELECT {column}, COUNT(*) FROM registrations GROUP BY {column}");
    let rows: Vec<(String, i64)> = sqlx::query_as(&sql)
        .fetch_all(pool)
        .await
        .map_err(|e| storage(&format!("count by {column}"), &e))?;

    let mut counts = zero_filled::<T>();
    for (label, count) in rows {
        counts.insert(label, unsigned(count));
    }
    Ok(counts)
}

async fn batches(pool: &PgPool) -> Result<Vec<BatchCount>> {
    let rows: Vec<(i16, i64)> = sqlx::query_as("SELECT batch, COUNT(*) FROM registrations GROUP BY batch ORDER BY batch")
        .fetch_all(pool)
        .await
        .map_err(|e| storage("count by batch", &e))?;

    Ok(rows
        .into_iter()
        .filter_map(|(number, count)| {
            let batch = u8::try_from(number).ok().and_then(Batch::new)?;
            Some(BatchCount { batch: batch.to_string(), count: unsigned(count) })
        })
        .collect())
}

fn unsigned(value: i64) -> u64 {
    u64::try_from(value).unwrap_or_default()
}

/// Compute every statistic.
pub(crate) async fn compute(pool: &PgPool) -> Result<RegistrationStats> {
    let (totals, payment_status, food_choice, arrival_time, accommodation, batches) = tokio::try_join!(
        totals(pool),
        distribution::<PaymentStatus>(pool, "payment_status"),
        distribution::<FoodChoice>(pool, "food_choice"),
        distribution::<ArrivalWindow>(pool, "expected_arrival_time"),
        distribution::<Accommodation>(pool, "overnight_accommodation"),
        batches(pool),
    )?;

    Ok(assemble(totals, payment_status, food_choice, arrival_time, accommodation, batches))
}

fn assemble(
    totals: Totals,
    payment_status: Distribution,
    food_choice: Distribution,
    arrival_time: Distribution,
    accommodation: Distribution,
    batches: Vec<BatchCount>,
) -> RegistrationStats {
    let total_registrations = unsigned(totals.total_registrations);
    let verified = unsigned(totals.verified);
    let attendees = AttendeeTotals {
        adults: unsigned(totals.adults),
        children: unsigned(totals.children),
        infants: unsigned(totals.infants),
        guests: unsigned(totals.guests),
        total: unsigned(totals.adults + totals.children + totals.infants + totals.guests),
    };

    RegistrationStats {
        total_registrations,
        total_contribution: unsigned(totals.total_contribution),
        verified_contribution: unsigned(totals.verified_contribution),
        unverified_contribution: unsigned(totals.unverified_contribution),
        payment_status,
        verification: VerificationCounts {
            verified,
            unverified: total_registrations.saturating_sub(verified),
        },
        batches,
        food_choice,
        arrival_time,
        accommodation,
        attendees,
        total_present: unsigned(totals.total_present),
    }
}
