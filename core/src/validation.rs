//! Payload validation.
//!
//! Validators walk a raw JSON payload, normalise what they can (trimming,
//! lower-casing emails, defaults for optional fields) and collect every
//! failure into [`ValidationErrors`] instead of stopping at the first one.

use crate::error::ValidationErrors;
use crate::pricing::PricingPolicy;
use crate::types::{
    Accommodation, AgeCategory, ArrivalWindow, Attendees, AttendeesPatch, Batch, FoodChoice,
    Gender, Guest, Interest, Labelled, NewRegistration, PaymentStatus, PaymentUpdate,
    RegistrantDetails, RegistrationPatch,
};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};

#[allow(clippy::expect_used)] // Static pattern, covered by tests
static EMAIL_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern"));

#[allow(clippy::expect_used)] // Static pattern, covered by tests
static MOBILE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[6-9][0-9]{9}$").expect("mobile pattern"));

/// Field length limits, in characters.
pub mod limits {
    /// Registrant name
    pub const NAME: (usize, usize) = (2, 100);
    /// Email address
    pub const EMAIL: usize = 254;
    /// Roll number
    pub const ROLL_NUMBER: usize = 30;
    /// Guest name
    pub const GUEST_NAME: (usize, usize) = (1, 100);
    /// Interest category
    pub const CATEGORY: usize = 100;
    /// Interest details
    pub const INTEREST_DETAILS: usize = 500;
    /// Program ideas and skills
    pub const FREE_TEXT: usize = 1000;
    /// Payment transaction ID
    pub const TRANSACTION_ID: (usize, usize) = (1, 100);
    /// Per-category attendee count
    pub const ATTENDEES: u32 = 20;
}

/// Party assumed when a submission omits `attendees`: just the registrant.
const DEFAULT_ATTENDEES: Attendees = Attendees { adults: 1, children: 0, infants: 0 };

/// Fields an admin edit may not set.
const READ_ONLY: &[&str] = &["registrationId", "totalAttendees"];

/// Validate a new submission.
///
/// When `contributionAmount` is omitted it is derived from `pricing`. A
/// positive contribution requires a payment transaction ID. Server-managed
/// fields in the payload are ignored.
///
/// # Errors
///
/// Returns every field-level failure found in the payload.
pub fn validate_submission(
    payload: &Value,
    pricing: &PricingPolicy,
) -> Result<NewRegistration, ValidationErrors> {
    let mut errors = ValidationErrors::new();
    let Some(object) = as_object(payload, &mut errors) else {
        return Err(errors);
    };
    let fields = Fields::root(object);

    let name = fields.text(&mut errors, "name", Required::Yes, limits::NAME);
    let email = fields.email(&mut errors, Required::Yes);
    let mobile = fields.mobile(&mut errors, Required::Yes);
    let gender = fields.label::<Gender>(&mut errors, "gender", Required::No);
    let batch = fields.label::<Batch>(&mut errors, "batch", Required::Yes);
    let roll_number = fields.text(&mut errors, "rollNumber", Required::No, (0, limits::ROLL_NUMBER));
    let food_choice = fields.label::<FoodChoice>(&mut errors, "foodChoice", Required::Yes);
    let arrival = fields.label::<ArrivalWindow>(&mut errors, "expectedArrivalTime", Required::Yes);
    let accommodation =
        fields.label::<Accommodation>(&mut errors, "overnightAccommodation", Required::Yes);
    let attendees = fields.attendees(&mut errors).map_or(DEFAULT_ATTENDEES, |counts| Attendees {
        adults: counts.adults.unwrap_or(DEFAULT_ATTENDEES.adults),
        children: counts.children.unwrap_or(0),
        infants: counts.infants.unwrap_or(0),
    });
    let guests = fields.guests(&mut errors).unwrap_or_default();
    let volunteer = fields.interest(&mut errors, "volunteer").unwrap_or_default();
    let committee = fields.interest(&mut errors, "committee").unwrap_or_default();
    let sponsor = fields.interest(&mut errors, "sponsor").unwrap_or_default();
    let program_ideas = fields.text(&mut errors, "programIdeas", Required::No, (0, limits::FREE_TEXT));
    let skills = fields.text(&mut errors, "skills", Required::No, (0, limits::FREE_TEXT));
    let amount = fields.amount(&mut errors);
    let transaction_id = fields.transaction_id(&mut errors).flatten();

    let (Some(name), Some(email), Some(mobile), Some(batch), Some(food_choice), Some(arrival), Some(accommodation)) =
        (name, email, mobile, batch, food_choice, arrival, accommodation)
    else {
        return Err(errors);
    };
    let contribution_amount = amount.unwrap_or_else(|| pricing.contribution(batch, &attendees));

    if contribution_amount > 0 && transaction_id.is_none() && !errors.has_field("paymentTransactionId") {
        errors.push(
            "paymentTransactionId",
            "is required when contributionAmount is greater than 0",
        );
    }

    let registration = NewRegistration {
        details: RegistrantDetails {
            name,
            email,
            mobile,
            gender,
            batch,
            roll_number: roll_number.unwrap_or_default(),
            food_choice,
            expected_arrival_time: arrival,
            overnight_accommodation: accommodation,
            attendees,
            guests,
            volunteer,
            committee,
            sponsor,
            program_ideas: program_ideas.unwrap_or_default(),
            skills: skills.unwrap_or_default(),
        },
        contribution_amount,
        payment_transaction_id: transaction_id,
    };
    errors.into_result(registration)
}

/// Validate an admin edit. Every field is optional; present fields follow the
/// same rules as on submission.
///
/// # Errors
///
/// Returns every field-level failure, including attempts to set read-only
/// fields and an edit that changes nothing.
pub fn validate_update(payload: &Value) -> Result<RegistrationPatch, ValidationErrors> {
    let mut errors = ValidationErrors::new();
    let Some(object) = as_object(payload, &mut errors) else {
        return Err(errors);
    };
    for field in READ_ONLY {
        if object.contains_key(*field) {
            errors.push(*field, "is read-only");
        }
    }
    let fields = Fields::root(object);

    let patch = RegistrationPatch {
        name: fields.text(&mut errors, "name", Required::No, limits::NAME),
        email: fields.email(&mut errors, Required::No),
        mobile: fields.mobile(&mut errors, Required::No),
        gender: fields.label(&mut errors, "gender", Required::No),
        batch: fields.label(&mut errors, "batch", Required::No),
        roll_number: fields.text(&mut errors, "rollNumber", Required::No, (0, limits::ROLL_NUMBER)),
        food_choice: fields.label(&mut errors, "foodChoice", Required::No),
        expected_arrival_time: fields.label(&mut errors, "expectedArrivalTime", Required::No),
        overnight_accommodation: fields.label(&mut errors, "overnightAccommodation", Required::No),
        attendees: fields.attendees(&mut errors),
        guests: fields.guests(&mut errors),
        volunteer: fields.interest(&mut errors, "volunteer"),
        committee: fields.interest(&mut errors, "committee"),
        sponsor: fields.interest(&mut errors, "sponsor"),
        program_ideas: fields.text(&mut errors, "programIdeas", Required::No, (0, limits::FREE_TEXT)),
        skills: fields.text(&mut errors, "skills", Required::No, (0, limits::FREE_TEXT)),
        contribution_amount: fields.amount(&mut errors),
        payment_status: fields.label(&mut errors, "paymentStatus", Required::No),
        payment_transaction_id: fields.transaction_id(&mut errors),
    };

    if errors.is_empty() && patch.is_empty() {
        errors.push("body", "contains no updatable fields");
    }
    errors.into_result(patch)
}

/// Validate a payment update: `paymentStatus` and/or `paymentTransactionId`.
///
/// # Errors
///
/// Returns failures for bad values or when neither field is present.
pub fn validate_payment_update(payload: &Value) -> Result<PaymentUpdate, ValidationErrors> {
    let mut errors = ValidationErrors::new();
    let Some(object) = as_object(payload, &mut errors) else {
        return Err(errors);
    };
    let fields = Fields::root(object);
    let update = PaymentUpdate {
        status: fields.label::<PaymentStatus>(&mut errors, "paymentStatus", Required::No),
        transaction_id: fields.transaction_id(&mut errors),
    };
    if errors.is_empty() && update.status.is_none() && update.transaction_id.is_none() {
        errors.push("paymentStatus", "is required");
    }
    errors.into_result(update)
}

/// Parse an enum label outside of a JSON payload (query strings).
///
/// # Errors
///
/// Returns a single failure naming `field` when the label is unknown.
pub fn parse_label<T: Labelled>(field: &str, raw: &str) -> Result<T, ValidationErrors> {
    T::from_label(raw.trim())
        .ok_or_else(|| ValidationErrors::single(field, format!("must be one of: {}", T::expected())))
}

/// Parse an attendee count outside of a JSON payload (query strings).
///
/// # Errors
///
/// Returns a single failure naming `field` when the value is not an integer
/// between 0 and the per-category limit.
pub fn parse_count(field: &str, raw: &str) -> Result<u32, ValidationErrors> {
    raw.trim()
        .parse::<u32>()
        .ok()
        .filter(|n| *n <= limits::ATTENDEES)
        .ok_or_else(|| ValidationErrors::single(field, count_message()))
}

fn count_message() -> String {
    format!("must be an integer between 0 and {}", limits::ATTENDEES)
}

fn as_object<'a>(payload: &'a Value, errors: &mut ValidationErrors) -> Option<&'a Map<String, Value>> {
    let object = payload.as_object();
    if object.is_none() {
        errors.push("body", "must be a JSON object");
    }
    object
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Required {
    Yes,
    No,
}

/// A JSON object being validated, plus the path prefix used in error names.
struct Fields<'a> {
    object: &'a Map<String, Value>,
    prefix: String,
}

impl<'a> Fields<'a> {
    fn root(object: &'a Map<String, Value>) -> Self {
        Self { object, prefix: String::new() }
    }

    fn nested(object: &'a Map<String, Value>, prefix: String) -> Self {
        Self { object, prefix }
    }

    fn path(&self, key: &str) -> String {
        if self.prefix.is_empty() {
            key.to_string()
        } else {
            format!("{}.{key}", self.prefix)
        }
    }

    /// Value under `key`; `null` counts as absent.
    fn get(&self, key: &str) -> Option<&'a Value> {
        self.object.get(key).filter(|value| !value.is_null())
    }

    fn missing(&self, errors: &mut ValidationErrors, key: &str, required: Required) {
        if required == Required::Yes {
            errors.push(self.path(key), "is required");
        }
    }

    fn string(&self, errors: &mut ValidationErrors, key: &str, required: Required) -> Option<String> {
        match self.get(key) {
            None => {
                self.missing(errors, key, required);
                None
            },
            Some(Value::String(raw)) => Some(raw.trim().to_string()),
            Some(_) => {
                errors.push(self.path(key), "must be a string");
                None
            },
        }
    }

    fn text(
        &self,
        errors: &mut ValidationErrors,
        key: &str,
        required: Required,
        (min, max): (usize, usize),
    ) -> Option<String> {
        let value = self.string(errors, key, required)?;
        let len = value.chars().count();
        if required == Required::Yes && value.is_empty() {
            errors.push(self.path(key), "is required");
            None
        } else if len < min || len > max {
            let message = if min == 0 {
                format!("must be at most {max} characters")
            } else {
                format!("must be between {min} and {max} characters")
            };
            errors.push(self.path(key), message);
            None
        } else {
            Some(value)
        }
    }

    fn email(&self, errors: &mut ValidationErrors, required: Required) -> Option<String> {
        let value = self.string(errors, "email", required)?.to_lowercase();
        if value.is_empty() {
            errors.push("email", "is required");
            None
        } else if value.chars().count() > limits::EMAIL {
            errors.push("email", format!("must be at most {} characters", limits::EMAIL));
            None
        } else if !EMAIL_PATTERN.is_match(&value) {
            errors.push("email", "must be a valid email address");
            None
        } else {
            Some(value)
        }
    }

    fn mobile(&self, errors: &mut ValidationErrors, required: Required) -> Option<String> {
        let value = self.string(errors, "mobile", required)?;
        if MOBILE_PATTERN.is_match(&value) {
            Some(value)
        } else {
            errors.push("mobile", "must be a 10-digit number starting with 6, 7, 8 or 9");
            None
        }
    }

    fn label<T: Labelled>(&self, errors: &mut ValidationErrors, key: &str, required: Required) -> Option<T> {
        let raw = self.string(errors, key, required)?;
        let parsed = T::from_label(&raw);
        if parsed.is_none() {
            errors.push(self.path(key), format!("must be one of: {}", T::expected()));
        }
        parsed
    }

    fn count(&self, errors: &mut ValidationErrors, key: &str) -> Option<u32> {
        let value = self.get(key)?;
        let count = value
            .as_u64()
            .and_then(|n| u32::try_from(n).ok())
            .filter(|n| *n <= limits::ATTENDEES);
        if count.is_none() {
            errors.push(self.path(key), count_message());
        }
        count
    }

    fn boolean(&self, errors: &mut ValidationErrors, key: &str) -> Option<bool> {
        match self.get(key)? {
            Value::Bool(flag) => Some(*flag),
            _ => {
                errors.push(self.path(key), "must be true or false");
                None
            },
        }
    }

    fn object(&self, errors: &mut ValidationErrors, key: &str) -> Option<Fields<'a>> {
        match self.get(key)? {
            Value::Object(object) => Some(Fields::nested(object, self.path(key))),
            _ => {
                errors.push(self.path(key), "must be an object");
                None
            },
        }
    }

    fn array(&self, errors: &mut ValidationErrors, key: &str) -> Option<&'a Vec<Value>> {
        match self.get(key)? {
            Value::Array(items) => Some(items),
            _ => {
                errors.push(self.path(key), "must be an array");
                None
            },
        }
    }

    fn attendees(&self, errors: &mut ValidationErrors) -> Option<AttendeesPatch> {
        let fields = self.object(errors, "attendees")?;
        Some(AttendeesPatch {
            adults: fields.count(errors, "adults"),
            children: fields.count(errors, "children"),
            infants: fields.count(errors, "infants"),
        })
    }

    fn guests(&self, errors: &mut ValidationErrors) -> Option<Vec<Guest>> {
        let items = self.array(errors, "guests")?;
        let mut guests = Vec::with_capacity(items.len());
        for (index, item) in items.iter().enumerate() {
            let path = format!("guests[{index}]");
            let Value::Object(object) = item else {
                errors.push(path, "must be an object");
                continue;
            };
            let fields = Fields::nested(object, path);
            let name = fields.text(errors, "name", Required::Yes, limits::GUEST_NAME);
            let gender = fields.label::<Gender>(errors, "gender", Required::Yes);
            let food_choice = fields.label::<FoodChoice>(errors, "foodChoice", Required::Yes);
            let age_category = fields.label::<AgeCategory>(errors, "ageCategory", Required::Yes);
            if let (Some(name), Some(gender), Some(food_choice), Some(age_category)) =
                (name, gender, food_choice, age_category)
            {
                guests.push(Guest { name, gender, food_choice, age_category });
            }
        }
        Some(guests)
    }

    fn interest(&self, errors: &mut ValidationErrors, key: &str) -> Option<Interest> {
        let fields = self.object(errors, key)?;
        let interested = fields.boolean(errors, "interested").unwrap_or(false);
        let mut categories = Vec::new();
        if let Some(items) = fields.array(errors, "categories") {
            for (index, item) in items.iter().enumerate() {
                let path = format!("{}[{index}]", fields.path("categories"));
                match item {
                    Value::String(raw) if raw.trim().chars().count() <= limits::CATEGORY => {
                        categories.push(raw.trim().to_string());
                    },
                    Value::String(_) => {
                        errors.push(path, format!("must be at most {} characters", limits::CATEGORY));
                    },
                    _ => errors.push(path, "must be a string"),
                }
            }
        }
        let details = fields
            .text(errors, "details", Required::No, (0, limits::INTEREST_DETAILS))
            .unwrap_or_default();
        Some(Interest { interested, categories, details })
    }

    fn amount(&self, errors: &mut ValidationErrors) -> Option<u64> {
        let value = self.get("contributionAmount")?;
        let amount = value.as_u64().or_else(|| {
            value
                .as_f64()
                .filter(|n| *n >= 0.0 && n.fract() == 0.0 && *n <= 9_007_199_254_740_991.0)
                .map(|n| {
                    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)] // Range checked above
                    let whole = n as u64;
                    whole
                })
        });
        if amount.is_none() {
            errors.push("contributionAmount", "must be a non-negative integer");
        }
        amount
    }

    /// `None` when absent, `Some(None)` when explicitly null or blank.
    fn transaction_id(&self, errors: &mut ValidationErrors) -> Option<Option<String>> {
        const KEY: &str = "paymentTransactionId";
        match self.object.get(KEY)? {
            Value::Null => Some(None),
            Value::String(raw) => {
                let value = raw.trim();
                let (_, max) = limits::TRANSACTION_ID;
                if value.is_empty() {
                    Some(None)
                } else if value.chars().count() > max {
                    errors.push(KEY, format!("must be at most {max} characters"));
                    None
                } else {
                    Some(Some(value.to_string()))
                }
            },
            _ => {
                errors.push(KEY, "must be a string");
                None
            },
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)] // Test code can use unwrap/expect
mod tests {
    use super::*;
    use serde_json::json;

    fn base() -> Value {
        json!({
            "name": "Asha Rao",
            "email": "  Asha@Example.COM ",
            "mobile": "9876543210",
            "batch": "Batch 1",
            "foodChoice": "Veg",
            "expectedArrivalTime": "8-11",
            "overnightAccommodation": "No",
            "attendees": {"adults": 1, "children": 0, "infants": 0},
            "contributionAmount": 300,
            "paymentTransactionId": "TXN1"
        })
    }

    #[test]
    fn accepts_minimal_submission() {
        let registration = validate_submission(&base(), &PricingPolicy::default()).unwrap();
        assert_eq!(registration.details.email, "asha@example.com");
        assert_eq!(registration.details.gender, None);
        assert_eq!(registration.details.guests, Vec::new());
        assert!(!registration.details.volunteer.interested);
        assert_eq!(registration.contribution_amount, 300);
        assert_eq!(registration.payment_transaction_id.as_deref(), Some("TXN1"));
    }

    #[test]
    fn collects_every_error() {
        let payload = json!({
            "name": "A",
            "email": "not-an-email",
            "mobile": "12345",
            "batch": "Batch 99",
            "foodChoice": "Vegan",
            "expectedArrivalTime": "noon",
            "attendees": {"adults": 21, "children": -1},
            "guests": [{"name": "", "gender": "Male", "foodChoice": "Veg", "ageCategory": "elder"}],
            "contributionAmount": -5
        });
        let errors = validate_submission(&payload, &PricingPolicy::default()).unwrap_err();

        for field in [
            "name",
            "email",
            "mobile",
            "batch",
            "foodChoice",
            "expectedArrivalTime",
            "overnightAccommodation",
            "attendees.adults",
            "attendees.children",
            "guests[0].name",
            "guests[0].ageCategory",
            "contributionAmount",
        ] {
            assert!(errors.has_field(field), "missing error for {field}: {errors}");
        }
    }

    #[test]
    fn derives_amount_from_pricing() {
        let mut payload = base();
        payload.as_object_mut().unwrap().remove("contributionAmount");
        payload["attendees"] = json!({"adults": 2, "children": 1});

        let registration = validate_submission(&payload, &PricingPolicy::default()).unwrap();
        assert_eq!(registration.contribution_amount, 700);
    }

    #[test]
    fn positive_amount_requires_transaction_id() {
        let mut payload = base();
        payload["paymentTransactionId"] = json!("   ");
        let errors = validate_submission(&payload, &PricingPolicy::default()).unwrap_err();
        assert!(errors.has_field("paymentTransactionId"));

        payload["contributionAmount"] = json!(0);
        let registration = validate_submission(&payload, &PricingPolicy::default()).unwrap();
        assert_eq!(registration.payment_transaction_id, None);
    }

    #[test]
    fn ignores_server_managed_fields() {
        let mut payload = base();
        payload["registrationId"] = json!("REG99999");
        payload["verified"] = json!(true);
        payload["paymentStatus"] = json!("completed");
        assert!(validate_submission(&payload, &PricingPolicy::default()).is_ok());
    }

    #[test]
    fn interest_categories_are_checked() {
        let mut payload = base();
        payload["volunteer"] = json!({
            "interested": true,
            "categories": ["Logistics", 5, "x".repeat(101)],
            "details": "evenings"
        });
        let errors = validate_submission(&payload, &PricingPolicy::default()).unwrap_err();
        assert!(errors.has_field("volunteer.categories[1]"));
        assert!(errors.has_field("volunteer.categories[2]"));
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn rejects_non_object_body() {
        let errors = validate_submission(&json!([1, 2]), &PricingPolicy::default()).unwrap_err();
        assert!(errors.has_field("body"));
    }

    #[test]
    fn update_rejects_read_only_fields() {
        let errors = validate_update(&json!({"registrationId": "REG00002", "totalAttendees": 9})).unwrap_err();
        assert!(errors.has_field("registrationId"));
        assert!(errors.has_field("totalAttendees"));
    }

    #[test]
    fn update_validates_present_fields_only() {
        let patch = validate_update(&json!({"mobile": "7000000000", "paymentTransactionId": null})).unwrap();
        assert_eq!(patch.mobile.as_deref(), Some("7000000000"));
        assert_eq!(patch.payment_transaction_id, Some(None));
        assert_eq!(patch.name, None);

        assert!(validate_update(&json!({})).is_err());
        assert!(validate_update(&json!({"batch": "Batch 0"})).is_err());
    }

    #[test]
    fn payment_update_needs_a_field() {
        assert!(validate_payment_update(&json!({})).is_err());
        assert!(validate_payment_update(&json!({"paymentStatus": "paid"})).is_err());
        let update = validate_payment_update(&json!({"paymentStatus": "completed"})).unwrap();
        assert_eq!(update.status, Some(PaymentStatus::Completed));
    }

    #[test]
    fn query_helpers() {
        assert_eq!(parse_label::<Batch>("batch", "Batch 7").unwrap(), Batch::new(7).unwrap());
        assert!(parse_label::<Batch>("batch", "7").is_err());
        assert_eq!(parse_count("adults", "20").unwrap(), 20);
        assert!(parse_count("adults", "21").is_err());
    }
}
