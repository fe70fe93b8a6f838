use crate::domain::enrollment::Enrollment;
use crate::domain::user::User;

/// Renders a plain-text maturity certificate for a paid-out enrollment.
///
/// The participant count shown is the enrollment's payout multiplier, which
/// is fixed at 50 regardless of the plan's actual slot count.
pub fn render_certificate(enrollment: &Enrollment, member: &User, plan_name: &str) -> String {
    let mut out = String::new();
    out.push_str("=== CERTIFICATE OF MATURITY ===\n");
    out.push_str(&format!("This certifies that {}\n", member.display_name()));
    out.push_str(&format!("completed the {plan_name} plan.\n"));
    out.push_str(&format!(
        "Enrolled:     {}\n",
        enrollment.enrollment_date.format("%Y-%m-%d")
    ));
    out.push_str(&format!(
        "Matured:      {}\n",
        enrollment.maturity_date.format("%Y-%m-%d")
    ));
    out.push_str(&format!(
        "Contribution: {} {}\n",
        enrollment.contribution_amount,
        enrollment.frequency.as_str()
    ));
    out.push_str(&format!("Participants: {}\n", enrollment.multiplier));
    out.push_str(&format!("Payout:       {}\n", enrollment.payout_amount));
    if let Some(paid) = enrollment.payout_date {
        out.push_str(&format!("Paid out:     {}\n", paid.format("%Y-%m-%d")));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::enrollment::EnrollmentStatus;
    use crate::domain::money::Amount;
    use crate::domain::plan::Frequency;
    use crate::domain::user::Role;
    use chrono::{TimeZone, Utc};
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    #[test]
    fn test_certificate_shows_multiplier_as_participants() {
        let enrolled = Utc.with_ymd_and_hms(2025, 1, 2, 0, 0, 0).unwrap();
        let matured = Utc.with_ymd_and_hms(2025, 2, 6, 0, 0, 0).unwrap();
        let member = User::new("alice@example.com", Role::User, enrolled);
        let amount = Amount::new(dec!(100)).unwrap();
        let enrollment = Enrollment {
            id: Uuid::new_v4(),
            user_id: member.id,
            plan_id: Uuid::new_v4(),
            frequency: Frequency::Daily,
            contribution_amount: amount,
            multiplier: 50,
            enrollment_date: enrolled,
            maturity_date: matured,
            payout_amount: amount * 50,
            status: EnrollmentStatus::Paid,
            payout_date: Some(matured),
            payout_processed_by: Some(Uuid::new_v4()),
            payout_notes: Some("Payout processed".to_string()),
            created_at: enrolled,
            updated_at: matured,
        };

        let text = render_certificate(&enrollment, &member, "Starter");
        assert!(text.contains("Participants: 50"));
        assert!(text.contains("Payout:       5000"));
        assert!(text.contains("Matured:      2025-02-06"));
        assert!(text.contains("Paid out:     2025-02-06"));
    }
}
