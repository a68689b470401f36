//! Confirmation email content.

use reunion_core::types::Registration;
use std::fmt::Write as _;

/// A rendered plain-text confirmation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConfirmationEmail {
    /// Recipient address
    pub to: String,
    /// Recipient name
    pub to_name: String,
    /// Subject line
    pub subject: String,
    /// Plain-text body
    pub body: String,
}

impl ConfirmationEmail {
    /// Render the confirmation for a stored registration.
    #[must_use]
    pub fn for_registration(registration: &Registration) -> Self {
        let details = &registration.details;
        let attendees = &details.attendees;

        let mut body = String::new();
        let _ = writeln!(body, "Dear {},", details.name);
        let _ = writeln!(body);
        let _ = writeln!(body, "Thank you for registering for the alumni reunion.");
        let _ = writeln!(body);
        let _ = writeln!(body, "Registration ID:   {}", registration.registration_id);
        let _ = writeln!(body, "Batch:             {}", details.batch);
        let _ = writeln!(
            body,
            "Attendees:         {} adult(s), {} child(ren), {} infant(s)",
            attendees.adults, attendees.children, attendees.infants
        );
        if !details.guests.is_empty() {
            let _ = writeln!(body, "Guests:            {}", details.guests.len());
        }
        let _ = writeln!(body, "Total attendees:   {}", registration.total_attendees());
        let _ = writeln!(body, "Contribution:      Rs. {}", registration.contribution_amount);
        let _ = writeln!(body, "Payment status:    {}", registration.payment_status);
        if let Some(transaction_id) = &registration.payment_transaction_id {
            let _ = writeln!(body, "Transaction ID:    {transaction_id}");
        }
        let _ = writeln!(body);
        let _ = writeln!(body, "Please keep your registration ID for check-in on the day.");
        let _ = writeln!(body);
        let _ = writeln!(body, "Regards,");
        let _ = write!(body, "Alumni Reunion Committee");

        Self {
            to: details.email.clone(),
            to_name: details.name.clone(),
            subject: format!("Registration confirmed: {}", registration.registration_id),
            body,
        }
    }
}
