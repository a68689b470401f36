//! Spreadsheet export of all registrations as CSV.

use anyhow::Context;
use reunion_core::types::{Interest, Registration};

/// Column headers, in output order.
pub const HEADERS: [&str; 30] = [
    "Registration ID",
    "Name",
    "Email",
    "Mobile",
    "Gender",
    "Batch",
    "Roll Number",
    "Food Choice",
    "Expected Arrival",
    "Overnight Accommodation",
    "Adults",
    "Children",
    "Infants",
    "Guests",
    "Total Attendees",
    "Volunteer",
    "Volunteer Details",
    "Committee",
    "Committee Details",
    "Sponsor",
    "Sponsor Details",
    "Program Ideas",
    "Skills",
    "Contribution Amount",
    "Payment Status",
    "Transaction ID",
    "Verified",
    "Attended",
    "Email Sent",
    "Registered At",
];

/// Render `registrations` as CSV, one row each, in the order given.
///
/// # Errors
///
/// Fails only if the CSV writer cannot flush its buffer.
pub fn to_csv(registrations: &[Registration]) -> anyhow::Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(HEADERS).context("writing CSV header")?;
    for registration in registrations {
        writer.write_record(row(registration)).context("writing CSV row")?;
    }
    writer.into_inner().context("flushing CSV export")
}

fn row(r: &Registration) -> Vec<String> {
    let d = &r.details;
    let (volunteer, volunteer_details) = interest(&d.volunteer);
    let (committee, committee_details) = interest(&d.committee);
    let (sponsor, sponsor_details) = interest(&d.sponsor);
    vec![
        r.registration_id.to_string(),
        d.name.clone(),
        d.email.clone(),
        d.mobile.clone(),
        d.gender.map(|g| g.to_string()).unwrap_or_default(),
        d.batch.to_string(),
        d.roll_number.clone(),
        d.food_choice.to_string(),
        d.expected_arrival_time.to_string(),
        d.overnight_accommodation.to_string(),
        d.attendees.adults.to_string(),
        d.attendees.children.to_string(),
        d.attendees.infants.to_string(),
        guest_summary(r),
        r.total_attendees().to_string(),
        volunteer,
        volunteer_details,
        committee,
        committee_details,
        sponsor,
        sponsor_details,
        d.program_ideas.clone(),
        d.skills.clone(),
        r.contribution_amount.to_string(),
        r.payment_status.to_string(),
        r.payment_transaction_id.clone().unwrap_or_default(),
        yes_no(r.verified),
        yes_no(r.attended),
        yes_no(r.is_email_sent),
        r.created_at.to_rfc3339(),
    ]
}

/// `Name (category, meal)` per guest, joined with `; `.
fn guest_summary(r: &Registration) -> String {
    r.details
        .guests
        .iter()
        .map(|g| format!("{} ({}, {})", g.name, g.age_category, g.food_choice))
        .collect::<Vec<_>>()
        .join("; ")
}

fn interest(interest: &Interest) -> (String, String) {
    if !interest.interested {
        return (yes_no(false), String::new());
    }
    let mut details = interest.categories.join(", ");
    if !interest.details.is_empty() {
        if !details.is_empty() {
            details.push_str(": ");
        }
        details.push_str(&interest.details);
    }
    (yes_no(true), details)
}

fn yes_no(flag: bool) -> String {
    if flag { "Yes" } else { "No" }.to_string()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)] // Test code can use unwrap/expect
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use reunion_core::RegistrationId;
    use reunion_core::types::{
        Accommodation, AgeCategory, ArrivalWindow, Attendees, Batch, FoodChoice, Gender, Guest, PaymentStatus,
        RegistrantDetails,
    };
    use uuid::Uuid;

    fn record() -> Registration {
        let created = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        Registration {
            id: Uuid::new_v4(),
            registration_id: RegistrationId::from_sequence(7),
            details: RegistrantDetails {
                name: "Asha, Rao".to_string(),
                email: "asha@example.com".to_string(),
                mobile: "9800000007".to_string(),
                gender: Some(Gender::Female),
                batch: Batch::new(5).unwrap(),
                roll_number: "42".to_string(),
                food_choice: FoodChoice::Veg,
                expected_arrival_time: ArrivalWindow::Morning,
                overnight_accommodation: Accommodation::No,
                attendees: Attendees { adults: 2, children: 1, infants: 0 },
                guests: vec![Guest {
                    name: "Ravi".to_string(),
                    gender: Gender::Male,
                    food_choice: FoodChoice::NonVeg,
                    age_category: AgeCategory::Adult,
                }],
                volunteer: Interest {
                    interested: true,
                    categories: vec!["Logistics".to_string(), "Food".to_string()],
                    details: "weekends".to_string(),
                },
                committee: Interest::default(),
                sponsor: Interest::default(),
                program_ideas: String::new(),
                skills: String::new(),
            },
            contribution_amount: 700,
            payment_status: PaymentStatus::Completed,
            payment_transaction_id: Some("TXN7".to_string()),
            verified: true,
            verified_at: Some(created),
            attended: false,
            attendance_marked_at: None,
            is_email_sent: true,
            created_at: created,
            updated_at: created,
        }
    }

    #[test]
    fn test_header_and_row_align() {
        let bytes = to_csv(&[record()]).unwrap();
        let mut reader = csv::Reader::from_reader(bytes.as_slice());

        let headers = reader.headers().unwrap().clone();
        assert_eq!(headers.len(), HEADERS.len());

        let rows: Vec<csv::StringRecord> = reader.records().map(Result::unwrap).collect();
        assert_eq!(rows.len(), 1);
        let row = &rows[0];
        assert_eq!(row.len(), HEADERS.len());

        let column = |name: &str| {
            let index = HEADERS.iter().position(|h| *h == name).unwrap();
            row.get(index).unwrap().to_string()
        };
        assert_eq!(column("Registration ID"), "REG00007");
        // Embedded comma survives quoting
        assert_eq!(column("Name"), "Asha, Rao");
        assert_eq!(column("Guests"), "Ravi (adult, Non-Veg)");
        assert_eq!(column("Total Attendees"), "4");
        assert_eq!(column("Volunteer Details"), "Logistics, Food: weekends");
        assert_eq!(column("Committee"), "No");
        assert_eq!(column("Transaction ID"), "TXN7");
    }

    #[test]
    fn test_empty_export_has_header_only() {
        let bytes = to_csv(&[]).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert_eq!(text.lines().count(), 1);
        assert!(text.starts_with("Registration ID,Name,"));
    }
}
