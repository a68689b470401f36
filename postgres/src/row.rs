//! Mapping between `registrations` rows and [`Registration`].

use chrono::{DateTime, Utc};
use reunion_core::error::{RegistryError, Result};
use reunion_core::registration_id::RegistrationId;
use reunion_core::types::{
    Accommodation, ArrivalWindow, Attendees, Batch, FoodChoice, Gender, Guest, Interest, Labelled, PaymentStatus,
    RegistrantDetails, Registration,
};
use sqlx::types::Json;
use uuid::Uuid;

/// Column list shared by every query that loads whole records.
pub(crate) const COLUMNS: &str = "id, registration_id, name, email, mobile, gender, batch, roll_number, \
     food_choice, expected_arrival_time, overnight_accommodation, adults, children, infants, guests, \
     volunteer, committee, sponsor, program_ideas, skills, contribution_amount, payment_status, \
     payment_transaction_id, verified, verified_at, attended, attendance_marked_at, is_email_sent, \
     created_at, updated_at";

/// A raw `registrations` row.
#[derive(Debug, sqlx::FromRow)]
pub(crate) struct RegistrationRow {
    id: Uuid,
    registration_id: String,
    name: String,
    email: String,
    mobile: String,
    gender: Option<String>,
    batch: i16,
    roll_number: String,
    food_choice: String,
    expected_arrival_time: String,
    overnight_accommodation: String,
    adults: i32,
    children: i32,
    infants: i32,
    guests: Json<Vec<Guest>>,
    volunteer: Json<Interest>,
    committee: Json<Interest>,
    sponsor: Json<Interest>,
    program_ideas: String,
    skills: String,
    contribution_amount: i64,
    payment_status: String,
    payment_transaction_id: Option<String>,
    verified: bool,
    verified_at: Option<DateTime<Utc>>,
    attended: bool,
    attendance_marked_at: Option<DateTime<Utc>>,
    is_email_sent: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

fn corrupt(column: &str, value: impl std::fmt::Display) -> RegistryError {
    RegistryError::Storage(format!("Invalid {column} in stored registration: {value}"))
}

fn label<T: Labelled>(column: &str, raw: &str) -> Result<T> {
    T::from_label(raw).ok_or_else(|| corrupt(column, raw))
}

fn count(column: &str, raw: i32) -> Result<u32> {
    u32::try_from(raw).map_err(|_| corrupt(column, raw))
}

impl TryFrom<RegistrationRow> for Registration {
    type Error = RegistryError;

    fn try_from(row: RegistrationRow) -> Result<Self> {
        let batch = u8::try_from(row.batch)
            .ok()
            .and_then(Batch::new)
            .ok_or_else(|| corrupt("batch", row.batch))?;
        let gender = row
            .gender
            .as_deref()
            .map(|raw| label::<Gender>("gender", raw))
            .transpose()?;

        Ok(Self {
            id: row.id,
            registration_id: RegistrationId::from_stored(row.registration_id),
            details: RegistrantDetails {
                name: row.name,
                email: row.email,
                mobile: row.mobile,
                gender,
                batch,
                roll_number: row.roll_number,
                food_choice: label::<FoodChoice>("food_choice", &row.food_choice)?,
                expected_arrival_time: label::<ArrivalWindow>("expected_arrival_time", &row.expected_arrival_time)?,
                overnight_accommodation: label::<Accommodation>(
                    "overnight_accommodation",
                    &row.overnight_accommodation,
                )?,
                attendees: Attendees {
                    adults: count("adults", row.adults)?,
                    children: count("children", row.children)?,
                    infants: count("infants", row.infants)?,
                },
                guests: row.guests.0,
                volunteer: row.volunteer.0,
                committee: row.committee.0,
                sponsor: row.sponsor.0,
                program_ideas: row.program_ideas,
                skills: row.skills,
            },
            contribution_amount: u64::try_from(row.contribution_amount)
                .map_err(|_| corrupt("contribution_amount", row.contribution_amount))?,
            payment_status: label::<PaymentStatus>("payment_status", &row.payment_status)?,
            payment_transaction_id: row.payment_transaction_id,
            verified: row.verified,
            verified_at: row.verified_at,
            attended: row.attended,
            attendance_marked_at: row.attendance_marked_at,
            is_email_sent: row.is_email_sent,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Convert a batch of rows, failing on the first corrupt one.
pub(crate) fn into_registrations(rows: Vec<RegistrationRow>) -> Result<Vec<Registration>> {
    rows.into_iter().map(Registration::try_from).collect()
}

/// Bindable column values of a record.
///
/// Counts and amounts that do not fit the column types are rejected rather
/// than truncated.
pub(crate) struct ColumnValues<'a> {
    pub details: &'a RegistrantDetails,
    pub gender: Option<&'static str>,
    pub batch: i16,
    pub adults: i32,
    pub children: i32,
    pub infants: i32,
    pub contribution_amount: i64,
}

impl<'a> ColumnValues<'a> {
    pub(crate) fn new(details: &'a RegistrantDetails, contribution_amount: u64) -> Result<Self> {
        let too_large = |column: &str| RegistryError::Internal(format!("{column} does not fit its column"));
        let attendees = &details.attendees;
        Ok(Self {
            details,
            gender: details.gender.map(Gender::as_str),
            batch: i16::from(details.batch.number()),
            adults: i32::try_from(attendees.adults).map_err(|_| too_large("adults"))?,
            children: i32::try_from(attendees.children).map_err(|_| too_large("children"))?,
            infants: i32::try_from(attendees.infants).map_err(|_| too_large("infants"))?,
            contribution_amount: i64::try_from(contribution_amount)
                .map_err(|_| too_large("contribution_amount"))?,
        })
    }
}
