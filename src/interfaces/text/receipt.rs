use crate::domain::payment::Payment;
use crate::domain::user::User;

/// Renders a plain-text receipt for a verified payment.
pub fn render_receipt(payment: &Payment, member: &User, plan_name: &str, method_name: &str) -> String {
    let mut out = String::new();
    out.push_str("=== PAYMENT RECEIPT ===\n");
    out.push_str(&format!("Receipt No: {}\n", payment.id));
    out.push_str(&format!(
        "Date:       {}\n",
        payment.payment_date.format("%Y-%m-%d")
    ));
    out.push_str(&format!("Member:     {}\n", member.display_name()));
    out.push_str(&format!("Plan:       {plan_name}\n"));
    out.push_str(&format!("Amount:     {}\n", payment.amount));
    out.push_str(&format!("Method:     {method_name}\n"));
    out.push_str(&format!("Status:     {}\n", payment.status.as_str()));
    if let Some(notes) = &payment.admin_notes {
        out.push_str(&format!("Notes:      {notes}\n"));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::money::Amount;
    use crate::domain::payment::PaymentStatus;
    use crate::domain::user::Role;
    use chrono::{TimeZone, Utc};
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    #[test]
    fn test_receipt_fields() {
        let now = Utc.with_ymd_and_hms(2025, 1, 3, 0, 0, 0).unwrap();
        let mut member = User::new("alice@example.com", Role::User, now);
        member.full_name = Some("Alice P.".to_string());
        let payment = Payment {
            id: Uuid::new_v4(),
            enrollment_id: Uuid::new_v4(),
            user_id: member.id,
            amount: Amount::new(dec!(100)).unwrap(),
            payment_date: now,
            proof_url: "memory://payment-proofs/p.png".to_string(),
            payment_method_id: Uuid::new_v4(),
            status: PaymentStatus::Verified,
            admin_notes: Some("Payment approved".to_string()),
            verified_at: Some(now),
            verified_by: Some(Uuid::new_v4()),
            created_at: now,
            updated_at: now,
        };

        let text = render_receipt(&payment, &member, "Starter", "Bank Transfer");
        assert!(text.contains("Member:     Alice P."));
        assert!(text.contains("Date:       2025-01-03"));
        assert!(text.contains("Plan:       Starter"));
        assert!(text.contains("Status:     VERIFIED"));
        assert!(text.contains("Notes:      Payment approved"));
    }
}
