//! Domain types for registrations.
//!
//! A [`Registration`] is one person's submission plus the server-managed
//! bookkeeping around it (ID, payment, verification, attendance, email flag).
//! The user-editable part lives in [`RegistrantDetails`] so that create, update
//! and storage code all share one definition of "what the registrant told us".

use crate::error::{ConflictField, ExistingRegistration};
use crate::registration_id::RegistrationId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer, de};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// A closed set of values with a fixed wire label per value.
pub trait Labelled: Sized + Copy + 'static {
    /// Every value, in display order.
    fn all() -> Vec<Self>;

    /// Wire label of this value.
    fn label(self) -> String;

    /// Parse a wire label.
    fn from_label(label: &str) -> Option<Self>;

    /// Comma-separated list of accepted labels, for error messages.
    fn expected() -> String {
        Self::all()
            .into_iter()
            .map(Self::label)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

macro_rules! labelled_enum {
    (
        $(#[$meta:meta])*
        $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident => $label:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum $name {
            $( $(#[$vmeta])* $variant ),+
        }

        impl $name {
            /// Every value, in declaration order.
            pub const ALL: &'static [Self] = &[$(Self::$variant),+];

            /// Wire label.
            #[must_use]
            pub const fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $label),+
                }
            }
        }

        impl Labelled for $name {
            fn all() -> Vec<Self> {
                Self::ALL.to_vec()
            }

            fn label(self) -> String {
                self.as_str().to_string()
            }

            fn from_label(label: &str) -> Option<Self> {
                match label {
                    $($label => Some(Self::$variant),)+
                    _ => None,
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                <Self as Labelled>::from_label(s).ok_or_else(|| {
                    format!("unknown {} `{s}`, expected one of: {}", stringify!($name), <Self as Labelled>::expected())
                })
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(self.as_str())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let raw = String::deserialize(deserializer)?;
                raw.parse().map_err(de::Error::custom)
            }
        }
    };
}

labelled_enum! {
    /// Registrant or guest gender.
    Gender {
        Male => "Male",
        Female => "Female",
        Other => "Other",
    }
}

labelled_enum! {
    /// Meal preference.
    FoodChoice {
        Veg => "Veg",
        NonVeg => "Non-Veg",
    }
}

labelled_enum! {
    /// Expected arrival window on the event day.
    ArrivalWindow {
        /// 8 AM to 11 AM
        Morning => "8-11",
        /// 11 AM to 2 PM
        Midday => "11-2",
        /// 2 PM to 5 PM
        Afternoon => "2-5",
        /// After 5 PM
        Evening => "After 5",
    }
}

labelled_enum! {
    /// Whether overnight accommodation is wanted.
    Accommodation {
        Yes => "Yes",
        No => "No",
    }
}

labelled_enum! {
    /// Age bracket of a guest.
    AgeCategory {
        Adult => "adult",
        Child => "child",
        Infant => "infant",
    }
}

labelled_enum! {
    /// Payment lifecycle of a registration.
    PaymentStatus {
        Pending => "pending",
        Completed => "completed",
        Failed => "failed",
        Refunded => "refunded",
    }
}

/// Graduating cohort, `Batch 1` through [`Batch::COUNT`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Batch(u8);

impl Batch {
    /// Number of cohorts on the fixed list.
    pub const COUNT: u8 = 30;

    /// Build a batch from its number, if it is on the list.
    #[must_use]
    pub const fn new(number: u8) -> Option<Self> {
        if number >= 1 && number <= Self::COUNT {
            Some(Self(number))
        } else {
            None
        }
    }

    /// The cohort number.
    #[must_use]
    pub const fn number(self) -> u8 {
        self.0
    }
}

impl Labelled for Batch {
    fn all() -> Vec<Self> {
        (1..=Self::COUNT).map(Self).collect()
    }

    fn label(self) -> String {
        self.to_string()
    }

    fn from_label(label: &str) -> Option<Self> {
        label
            .strip_prefix("Batch ")
            .filter(|digits| !digits.starts_with('0'))
            .and_then(|digits| digits.parse::<u8>().ok())
            .and_then(Self::new)
    }

    fn expected() -> String {
        format!("Batch 1 to Batch {}", Self::COUNT)
    }
}

impl fmt::Display for Batch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Batch {}", self.0)
    }
}

impl FromStr for Batch {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_label(s).ok_or_else(|| format!("unknown batch `{s}`, expected {}", Self::expected()))
    }
}

impl Serialize for Batch {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Batch {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(de::Error::custom)
    }
}

/// Accompanying people counted on the registration itself.
///
/// `adults` includes the registrant; the registrant is the "first adult" for
/// pricing and headcount purposes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attendees {
    /// Adults, registrant included
    pub adults: u32,
    /// Children
    pub children: u32,
    /// Infants
    pub infants: u32,
}

impl Attendees {
    /// Sum of all three counts.
    #[must_use]
    pub const fn total(&self) -> u32 {
        self.adults + self.children + self.infants
    }
}

/// A named guest on the guest list. Informational only, never billed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Guest {
    /// Guest name
    pub name: String,
    /// Guest gender
    pub gender: Gender,
    /// Meal preference
    pub food_choice: FoodChoice,
    /// Age bracket
    pub age_category: AgeCategory,
}

/// Opt-in block for volunteering, committee work or sponsorship.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Interest {
    /// Whether the registrant opted in
    pub interested: bool,
    /// Selected categories
    pub categories: Vec<String>,
    /// Free-text detail
    pub details: String,
}

/// Everything the registrant supplies about themselves and their party.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrantDetails {
    /// Full name
    pub name: String,
    /// Contact email (lower-cased)
    pub email: String,
    /// 10-digit mobile number
    pub mobile: String,
    /// Gender, when given
    pub gender: Option<Gender>,
    /// Graduating cohort
    pub batch: Batch,
    /// Optional roll number
    pub roll_number: String,
    /// Meal preference
    pub food_choice: FoodChoice,
    /// Arrival window
    pub expected_arrival_time: ArrivalWindow,
    /// Overnight stay
    pub overnight_accommodation: Accommodation,
    /// Accompanying people
    pub attendees: Attendees,
    /// Named guests
    pub guests: Vec<Guest>,
    /// Volunteering interest
    pub volunteer: Interest,
    /// Committee interest
    pub committee: Interest,
    /// Sponsorship interest
    pub sponsor: Interest,
    /// Program ideas
    pub program_ideas: String,
    /// Skills or expertise
    pub skills: String,
}

/// A validated submission ready to be persisted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewRegistration {
    /// Registrant-supplied fields
    pub details: RegistrantDetails,
    /// Contribution, submitted or derived from pricing
    pub contribution_amount: u64,
    /// Payment reference, unique when present
    pub payment_transaction_id: Option<String>,
}

impl NewRegistration {
    /// The keys that must be unique across the collection.
    #[must_use]
    pub fn unique_keys(&self) -> UniqueKeys<'_> {
        UniqueKeys {
            email: &self.details.email,
            mobile: &self.details.mobile,
            transaction_id: self.payment_transaction_id.as_deref(),
        }
    }

    /// Materialise the stored record.
    #[must_use]
    pub fn into_registration(
        self,
        id: Uuid,
        registration_id: RegistrationId,
        now: DateTime<Utc>,
    ) -> Registration {
        Registration {
            id,
            registration_id,
            details: self.details,
            contribution_amount: self.contribution_amount,
            payment_status: PaymentStatus::Pending,
            payment_transaction_id: self.payment_transaction_id,
            verified: false,
            verified_at: None,
            attended: false,
            attendance_marked_at: None,
            is_email_sent: false,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Borrowed view of the three unique keys of a registration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct UniqueKeys<'a> {
    /// Email address
    pub email: &'a str,
    /// Mobile number
    pub mobile: &'a str,
    /// Payment transaction ID, if any
    pub transaction_id: Option<&'a str>,
}

/// A persisted registration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    /// Internal storage key
    pub id: Uuid,
    /// Human-readable sequential ID
    pub registration_id: RegistrationId,
    /// Registrant-supplied fields
    #[serde(flatten)]
    pub details: RegistrantDetails,
    /// Contribution amount
    pub contribution_amount: u64,
    /// Payment status
    pub payment_status: PaymentStatus,
    /// Payment reference
    pub payment_transaction_id: Option<String>,
    /// Verified by an admin or by payment completion
    pub verified: bool,
    /// When verification happened
    pub verified_at: Option<DateTime<Utc>>,
    /// Marked present at the event
    pub attended: bool,
    /// When attendance was last toggled on
    pub attendance_marked_at: Option<DateTime<Utc>>,
    /// Confirmation email delivered
    pub is_email_sent: bool,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Last update time
    pub updated_at: DateTime<Utc>,
}

impl Registration {
    /// Adults, children, infants and named guests.
    #[must_use]
    pub fn total_attendees(&self) -> u32 {
        let guests = u32::try_from(self.details.guests.len()).unwrap_or(u32::MAX);
        self.details.attendees.total().saturating_add(guests)
    }

    /// Headcount this registration contributes when marked present.
    ///
    /// The registrant is the first adult, so only adults beyond the first are
    /// added on top of the registrant. Guests are not counted.
    #[must_use]
    pub const fn present_headcount(&self) -> u32 {
        let attendees = &self.details.attendees;
        1 + attendees.adults.saturating_sub(1) + attendees.children + attendees.infants
    }

    /// The keys that must be unique across the collection.
    #[must_use]
    pub fn unique_keys(&self) -> UniqueKeys<'_> {
        UniqueKeys {
            email: &self.details.email,
            mobile: &self.details.mobile,
            transaction_id: self.payment_transaction_id.as_deref(),
        }
    }

    /// Set the payment status.
    ///
    /// Completing a payment verifies the registration; no other status ever
    /// clears an existing verification.
    pub fn set_payment_status(&mut self, status: PaymentStatus, now: DateTime<Utc>) {
        self.payment_status = status;
        if status == PaymentStatus::Completed && !self.verified {
            self.verified = true;
            self.verified_at = Some(now);
        }
        self.updated_at = now;
    }

    /// Flip the verified flag.
    pub fn toggle_verified(&mut self, now: DateTime<Utc>) {
        self.verified = !self.verified;
        self.verified_at = self.verified.then_some(now);
        self.updated_at = now;
    }

    /// Flip the attendance flag.
    pub fn toggle_attendance(&mut self, now: DateTime<Utc>) {
        self.attended = !self.attended;
        self.attendance_marked_at = self.attended.then_some(now);
        self.updated_at = now;
    }

    /// Minimal details shown to a submitter who collides with this record.
    #[must_use]
    pub fn as_existing(&self) -> ExistingRegistration {
        ExistingRegistration {
            email: self.details.email.clone(),
            mobile: self.details.mobile.clone(),
            created_at: self.created_at,
        }
    }

    /// Apply an admin edit.
    ///
    /// Payment status goes through [`Registration::set_payment_status`] so a
    /// completed payment still verifies the record.
    pub fn apply_patch(&mut self, patch: RegistrationPatch, now: DateTime<Utc>) {
        let details = &mut self.details;
        if let Some(name) = patch.name {
            details.name = name;
        }
        if let Some(email) = patch.email {
            details.email = email;
        }
        if let Some(mobile) = patch.mobile {
            details.mobile = mobile;
        }
        if let Some(gender) = patch.gender {
            details.gender = Some(gender);
        }
        if let Some(batch) = patch.batch {
            details.batch = batch;
        }
        if let Some(roll_number) = patch.roll_number {
            details.roll_number = roll_number;
        }
        if let Some(food_choice) = patch.food_choice {
            details.food_choice = food_choice;
        }
        if let Some(arrival) = patch.expected_arrival_time {
            details.expected_arrival_time = arrival;
        }
        if let Some(accommodation) = patch.overnight_accommodation {
            details.overnight_accommodation = accommodation;
        }
        if let Some(attendees) = patch.attendees {
            attendees.apply(&mut details.attendees);
        }
        if let Some(guests) = patch.guests {
            details.guests = guests;
        }
        if let Some(volunteer) = patch.volunteer {
            details.volunteer = volunteer;
        }
        if let Some(committee) = patch.committee {
            details.committee = committee;
        }
        if let Some(sponsor) = patch.sponsor {
            details.sponsor = sponsor;
        }
        if let Some(program_ideas) = patch.program_ideas {
            details.program_ideas = program_ideas;
        }
        if let Some(skills) = patch.skills {
            details.skills = skills;
        }
        if let Some(amount) = patch.contribution_amount {
            self.contribution_amount = amount;
        }
        if let Some(transaction_id) = patch.payment_transaction_id {
            self.payment_transaction_id = transaction_id;
        }
        if let Some(status) = patch.payment_status {
            self.set_payment_status(status, now);
        }
        self.updated_at = now;
    }

    /// Apply a payment update.
    pub fn apply_payment(&mut self, update: PaymentUpdate, now: DateTime<Utc>) {
        if let Some(transaction_id) = update.transaction_id {
            self.payment_transaction_id = transaction_id;
        }
        if let Some(status) = update.status {
            self.set_payment_status(status, now);
        }
        self.updated_at = now;
    }

    /// Whether a positive contribution is missing its payment reference.
    #[must_use]
    pub const fn lacks_transaction_id(&self) -> bool {
        self.contribution_amount > 0 && self.payment_transaction_id.is_none()
    }

    /// Whether this record already holds `keys`' value for `field`.
    ///
    /// An absent transaction ID never collides.
    #[must_use]
    pub fn holds(&self, field: ConflictField, keys: UniqueKeys<'_>) -> bool {
        match field {
            ConflictField::Email => self.details.email == keys.email,
            ConflictField::Mobile => self.details.mobile == keys.mobile,
            ConflictField::TransactionId => {
                keys.transaction_id.is_some() && self.payment_transaction_id.as_deref() == keys.transaction_id
            },
        }
    }
}

/// Partial attendee counts from an admin edit.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AttendeesPatch {
    /// New adult count
    pub adults: Option<u32>,
    /// New child count
    pub children: Option<u32>,
    /// New infant count
    pub infants: Option<u32>,
}

impl AttendeesPatch {
    fn apply(self, attendees: &mut Attendees) {
        if let Some(adults) = self.adults {
            attendees.adults = adults;
        }
        if let Some(children) = self.children {
            attendees.children = children;
        }
        if let Some(infants) = self.infants {
            attendees.infants = infants;
        }
    }
}

/// A validated admin edit. `None` leaves a field untouched.
///
/// `payment_transaction_id` is doubly optional: `Some(None)` clears it.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RegistrationPatch {
    /// Full name
    pub name: Option<String>,
    /// Email (lower-cased)
    pub email: Option<String>,
    /// Mobile number
    pub mobile: Option<String>,
    /// Gender
    pub gender: Option<Gender>,
    /// Cohort
    pub batch: Option<Batch>,
    /// Roll number
    pub roll_number: Option<String>,
    /// Meal preference
    pub food_choice: Option<FoodChoice>,
    /// Arrival window
    pub expected_arrival_time: Option<ArrivalWindow>,
    /// Overnight stay
    pub overnight_accommodation: Option<Accommodation>,
    /// Attendee counts
    pub attendees: Option<AttendeesPatch>,
    /// Replacement guest list
    pub guests: Option<Vec<Guest>>,
    /// Replacement volunteering block
    pub volunteer: Option<Interest>,
    /// Replacement committee block
    pub committee: Option<Interest>,
    /// Replacement sponsorship block
    pub sponsor: Option<Interest>,
    /// Program ideas
    pub program_ideas: Option<String>,
    /// Skills
    pub skills: Option<String>,
    /// Contribution amount
    pub contribution_amount: Option<u64>,
    /// Payment status
    pub payment_status: Option<PaymentStatus>,
    /// Payment reference; `Some(None)` clears it
    pub payment_transaction_id: Option<Option<String>>,
}

impl RegistrationPatch {
    /// Whether the edit changes nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Whether the edit touches the contribution or its payment reference.
    #[must_use]
    pub const fn touches_payment(&self) -> bool {
        self.contribution_amount.is_some() || self.payment_transaction_id.is_some()
    }
}

/// A validated payment update.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PaymentUpdate {
    /// New status
    pub status: Option<PaymentStatus>,
    /// New reference; `Some(None)` clears it
    pub transaction_id: Option<Option<String>>,
}
