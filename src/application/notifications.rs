//! In-app notification feed and desktop-style maturity alerts.
//!
//! Both are derived by polling the same entities; nothing here is pushed
//! from the backend. Read tracking is a client-local cache behind the
//! `ReadStateStore` port.

use crate::domain::enrollment::{Enrollment, EnrollmentStatus};
use crate::domain::payment::{Payment, PaymentStatus};
use crate::domain::ports::{
    ClockBox, EnrollmentStoreBox, PaymentStoreBox, PlanStoreBox, ReadStateStoreBox,
};
use crate::domain::rules::days_until_maturity;
use crate::error::Result;
use chrono::{DateTime, TimeDelta, Utc};
use std::collections::HashMap;
use uuid::Uuid;

/// Notifications look back (and ahead) this many days.
pub const FEED_WINDOW_DAYS: i64 = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    Maturity,
    PaymentVerified,
    PaymentRejected,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    /// Stable id derived from the source row, so read state survives
    /// rebuilding the feed.
    pub id: String,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub read: bool,
    pub enrollment_id: Uuid,
    pub payment_id: Option<Uuid>,
}

/// A one-shot alert pushed to the local notifier.
#[derive(Debug, Clone, PartialEq)]
pub struct MaturityAlert {
    pub title: String,
    pub message: String,
    pub enrollment_id: Uuid,
}

fn plan_name<'a>(names: &'a HashMap<Uuid, String>, plan_id: Uuid) -> &'a str {
    names.get(&plan_id).map(String::as_str).unwrap_or("your contribution")
}

/// Builds the feed for one member: active enrollments maturing within the
/// window, plus payments decided within the window. Newest first.
pub fn build_feed(
    enrollments: &[Enrollment],
    plan_names: &HashMap<Uuid, String>,
    decided_payments: &[Payment],
    now: DateTime<Utc>,
) -> Vec<Notification> {
    let mut feed = Vec::new();

    for enrollment in enrollments {
        if enrollment.status != EnrollmentStatus::Active {
            continue;
        }
        let days = days_until_maturity(enrollment.maturity_date, now);
        if !(0..=FEED_WINDOW_DAYS).contains(&days) {
            continue;
        }
        let name = plan_name(plan_names, enrollment.plan_id);
        let (title, message) = if days == 0 {
            (
                "Matured Today!".to_string(),
                format!(
                    "{name} has matured. Expected payout: ${}",
                    enrollment.payout_amount
                ),
            )
        } else {
            (
                format!("Maturing in {days} days"),
                format!(
                    "{name} will mature on {}. Expected payout: ${}",
                    enrollment.maturity_date.format("%Y-%m-%d"),
                    enrollment.payout_amount
                ),
            )
        };
        feed.push(Notification {
            id: format!("maturity-{}", enrollment.id),
            kind: NotificationKind::Maturity,
            title,
            message,
            timestamp: enrollment.maturity_date,
            read: false,
            enrollment_id: enrollment.id,
            payment_id: None,
        });
    }

    for payment in decided_payments {
        let entry = match payment.status {
            PaymentStatus::Verified => Notification {
                id: format!("payment-verified-{}", payment.id),
                kind: NotificationKind::PaymentVerified,
                title: "Payment Verified".to_string(),
                message: format!("Your payment of ${} has been verified!", payment.amount),
                timestamp: payment.updated_at,
                read: false,
                enrollment_id: payment.enrollment_id,
                payment_id: Some(payment.id),
            },
            PaymentStatus::Rejected => Notification {
                id: format!("payment-rejected-{}", payment.id),
                kind: NotificationKind::PaymentRejected,
                title: "Payment Rejected".to_string(),
                message: format!(
                    "Your payment of ${} was rejected. {}",
                    payment.amount,
                    payment.admin_notes.as_deref().unwrap_or("Please contact support.")
                ),
                timestamp: payment.updated_at,
                read: false,
                enrollment_id: payment.enrollment_id,
                payment_id: Some(payment.id),
            },
            PaymentStatus::Pending => continue,
        };
        feed.push(entry);
    }

    feed.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    feed
}

/// Alerts fired at exactly 7, 3, 1 and 0 days before maturity.
pub fn maturity_alerts(
    enrollments: &[Enrollment],
    plan_names: &HashMap<Uuid, String>,
    now: DateTime<Utc>,
) -> Vec<MaturityAlert> {
    let mut alerts = Vec::new();
    for enrollment in enrollments {
        if enrollment.status != EnrollmentStatus::Active {
            continue;
        }
        let name = plan_name(plan_names, enrollment.plan_id);
        let payout = enrollment.payout_amount;
        let (title, message) = match days_until_maturity(enrollment.maturity_date, now) {
            7 => (
                "Maturity Alert - 7 Days".to_string(),
                format!("Your {name} will mature in 7 days! Expected payout: ${payout}"),
            ),
            3 => (
                "Maturity Alert - 3 Days".to_string(),
                format!("Only 3 days until your {name} matures! Get ready for ${payout}"),
            ),
            1 => (
                "Maturity Alert - Tomorrow!".to_string(),
                format!("Your {name} matures tomorrow! Payout: ${payout}"),
            ),
            0 => (
                "Matured Today!".to_string(),
                format!("Your {name} has matured! Request your payout of ${payout}"),
            ),
            _ => continue,
        };
        alerts.push(MaturityAlert {
            title,
            message,
            enrollment_id: enrollment.id,
        });
    }
    alerts
}

/// Read-model over the stores: assembles the feed for a member and layers
/// per-user read state on top.
pub struct NotificationCenter {
    enrollments: EnrollmentStoreBox,
    payments: PaymentStoreBox,
    plans: PlanStoreBox,
    read_state: ReadStateStoreBox,
    clock: ClockBox,
}

impl NotificationCenter {
    pub fn new(
        enrollments: EnrollmentStoreBox,
        payments: PaymentStoreBox,
        plans: PlanStoreBox,
        read_state: ReadStateStoreBox,
        clock: ClockBox,
    ) -> Self {
        Self {
            enrollments,
            payments,
            plans,
            read_state,
            clock,
        }
    }

    pub async fn feed(&self, user_id: Uuid) -> Result<Vec<Notification>> {
        let now = self.clock.now();
        let enrollments = self.enrollments.for_user(user_id).await?;
        let decided = self
            .payments
            .decided_since(user_id, now - TimeDelta::days(FEED_WINDOW_DAYS))
            .await?;

        let mut plan_names = HashMap::new();
        for enrollment in &enrollments {
            if let Some(plan) = self.plans.get(enrollment.plan_id).await? {
                plan_names.insert(plan.id, plan.name);
            }
        }

        let mut feed = build_feed(&enrollments, &plan_names, &decided, now);
        let read_ids = self.read_state.read_ids(user_id).await?;
        for entry in &mut feed {
            entry.read = read_ids.contains(&entry.id);
        }
        Ok(feed)
    }

    pub async fn unread_count(&self, user_id: Uuid) -> Result<usize> {
        Ok(self.feed(user_id).await?.iter().filter(|n| !n.read).count())
    }

    pub async fn mark_read(&self, user_id: Uuid, notification_id: &str) -> Result<()> {
        self.read_state.mark_read(user_id, notification_id).await
    }

    pub async fn mark_all_read(&self, user_id: Uuid) -> Result<()> {
        let ids: Vec<String> = self.feed(user_id).await?.into_iter().map(|n| n.id).collect();
        self.read_state.mark_all_read(user_id, &ids).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::money::Amount;
    use crate::domain::plan::Frequency;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn day(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
    }

    fn enrollment(status: EnrollmentStatus, maturity: DateTime<Utc>) -> Enrollment {
        let amount = Amount::new(dec!(100)).unwrap();
        let now = day(2025, 1, 1);
        Enrollment {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            plan_id: Uuid::new_v4(),
            frequency: Frequency::Daily,
            contribution_amount: amount,
            multiplier: 50,
            enrollment_date: now,
            maturity_date: maturity,
            payout_amount: amount * 50,
            status,
            payout_date: None,
            payout_processed_by: None,
            payout_notes: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_feed_includes_only_enrollments_within_window() {
        let now = day(2025, 2, 1);
        let soon = enrollment(EnrollmentStatus::Active, day(2025, 2, 5));
        let far = enrollment(EnrollmentStatus::Active, day(2025, 3, 20));
        let paid = enrollment(EnrollmentStatus::Paid, day(2025, 2, 3));

        let feed = build_feed(&[soon.clone(), far, paid], &HashMap::new(), &[], now);
        assert_eq!(feed.len(), 1);
        assert_eq!(feed[0].id, format!("maturity-{}", soon.id));
        assert_eq!(feed[0].title, "Maturing in 4 days");
        assert!(feed[0].message.contains("$5000"));
    }

    #[test]
    fn test_feed_matured_today_title() {
        let now = day(2025, 2, 5);
        let today = enrollment(EnrollmentStatus::Active, now);
        let feed = build_feed(&[today], &HashMap::new(), &[], now);
        assert_eq!(feed[0].title, "Matured Today!");
    }

    #[test]
    fn test_feed_uses_plan_names_and_sorts_newest_first() {
        let now = day(2025, 2, 1);
        let a = enrollment(EnrollmentStatus::Active, day(2025, 2, 3));
        let b = enrollment(EnrollmentStatus::Active, day(2025, 2, 6));
        let mut names = HashMap::new();
        names.insert(a.plan_id, "Starter".to_string());

        let feed = build_feed(&[a.clone(), b.clone()], &names, &[], now);
        assert_eq!(feed[0].enrollment_id, b.id);
        assert!(feed[1].message.starts_with("Starter will mature on 2025-02-03"));
    }

    #[test]
    fn test_feed_rejected_payment_carries_admin_note() {
        let now = day(2025, 2, 1);
        let e = enrollment(EnrollmentStatus::Active, day(2025, 6, 1));
        let payment = Payment {
            id: Uuid::new_v4(),
            enrollment_id: e.id,
            user_id: e.user_id,
            amount: Amount::new(dec!(100)).unwrap(),
            payment_date: now,
            proof_url: "memory://payment-proofs/x.png".to_string(),
            payment_method_id: Uuid::new_v4(),
            status: PaymentStatus::Rejected,
            admin_notes: Some("insufficient proof".to_string()),
            verified_at: Some(now),
            verified_by: Some(Uuid::new_v4()),
            created_at: now,
            updated_at: now,
        };

        let feed = build_feed(&[e], &HashMap::new(), &[payment.clone()], now);
        assert_eq!(feed.len(), 1);
        assert_eq!(feed[0].kind, NotificationKind::PaymentRejected);
        assert!(feed[0].message.ends_with("insufficient proof"));
        assert_eq!(feed[0].payment_id, Some(payment.id));
    }

    #[test]
    fn test_alerts_fire_only_at_thresholds() {
        let maturity = day(2025, 2, 8);
        let e = enrollment(EnrollmentStatus::Active, maturity);
        let names = HashMap::new();

        for (now, expect) in [
            (day(2025, 2, 1), Some("Maturity Alert - 7 Days")),
            (day(2025, 2, 2), None), // 6 days out
            (day(2025, 2, 5), Some("Maturity Alert - 3 Days")),
            (day(2025, 2, 7), Some("Maturity Alert - Tomorrow!")),
            (day(2025, 2, 8), Some("Matured Today!")),
            (day(2025, 2, 9), None), // already past
        ] {
            let alerts = maturity_alerts(std::slice::from_ref(&e), &names, now);
            match expect {
                Some(title) => {
                    assert_eq!(alerts.len(), 1, "at {now}");
                    assert_eq!(alerts[0].title, title);
                }
                None => assert!(alerts.is_empty(), "at {now}"),
            }
        }
    }
}
