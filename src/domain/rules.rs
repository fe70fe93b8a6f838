//! Business rules as free functions over explicit values.
//!
//! Every formula the dashboards and workflows need lives here, with no store
//! or clock access, so the same rule is never recomputed inline elsewhere.

use crate::domain::enrollment::EnrollmentStatus;
use crate::domain::money::Amount;
use crate::domain::plan::Frequency;
use crate::domain::settings::MaturitySettings;
use crate::error::{ClubError, Result};
use chrono::{DateTime, Months, TimeDelta, Utc};
use rust_decimal::Decimal;

/// Payout factor applied to the contribution amount of every enrollment.
pub const PAYOUT_MULTIPLIER: u32 = 50;

/// Longest synthetic payment schedule shown to a member.
pub const SCHEDULE_CAP: usize = 20;

/// Days in a contribution interval, rounded up. Matches the ceil-division
/// the views use (rounds toward positive infinity for partial days).
fn ceil_days(delta: TimeDelta) -> i64 {
    // `i64::div_ceil` is unstable (int_roundings); this is its stable equivalent.
    let ms = delta.num_milliseconds();
    let q = ms.div_euclid(86_400_000);
    if ms.rem_euclid(86_400_000) != 0 { q + 1 } else { q }
}

/// When an enrollment made now becomes eligible for payout.
///
/// DAILY enrollments mature after a fixed number of weeks; WEEKLY ones after
/// a number of calendar months (chrono clamps into short months).
pub fn maturity_date(
    enrolled_at: DateTime<Utc>,
    frequency: Frequency,
    settings: &MaturitySettings,
) -> Result<DateTime<Utc>> {
    let matured = match frequency {
        Frequency::Daily => enrolled_at
            .checked_add_signed(TimeDelta::days(i64::from(settings.daily_maturity_weeks) * 7)),
        Frequency::Weekly => enrolled_at.checked_add_months(Months::new(settings.weekly_maturity_months)),
    };
    matured.ok_or_else(|| ClubError::Validation("maturity date out of range".to_string()))
}

pub fn payout_amount(contribution: Amount, multiplier: u32) -> Amount {
    contribution * multiplier
}

/// Payout total an admin sees for a whole plan. Assumes a full pool of
/// [`PAYOUT_MULTIPLIER`] participants, independent of the plan's slot counts.
pub fn expected_plan_payout(contribution: Amount) -> Amount {
    contribution * PAYOUT_MULTIPLIER
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Progress {
    pub total_days: i64,
    pub days_elapsed: i64,
    pub days_remaining: i64,
    pub percent: f64,
    pub matured: bool,
}

/// Time-based progress of an enrollment toward its maturity date.
pub fn progress(
    enrollment_date: DateTime<Utc>,
    maturity_date: DateTime<Utc>,
    status: EnrollmentStatus,
    now: DateTime<Utc>,
) -> Progress {
    let total_days = ceil_days(maturity_date - enrollment_date);
    let days_elapsed = ceil_days(now - enrollment_date);
    let days_remaining = (total_days - days_elapsed).max(0);
    let percent = if total_days <= 0 {
        100.0
    } else {
        (days_elapsed as f64 / total_days as f64 * 100.0).clamp(0.0, 100.0)
    };
    Progress {
        total_days,
        days_elapsed,
        days_remaining,
        percent,
        matured: status == EnrollmentStatus::Matured || now >= maturity_date,
    }
}

/// How many payments should have been made so far.
pub fn expected_payments(frequency: Frequency, enrollment_date: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    let days_since = ceil_days(now - enrollment_date).max(0);
    match frequency {
        Frequency::Daily => days_since,
        Frequency::Weekly => days_since / 7,
    }
}

/// Amount a member should have contributed by now, capped at
/// `payout / multiplier`.
pub fn expected_contribution(
    frequency: Frequency,
    enrollment_date: DateTime<Utc>,
    now: DateTime<Utc>,
    contribution: Amount,
    payout: Amount,
    multiplier: u32,
) -> Decimal {
    let expected = Decimal::from(expected_payments(frequency, enrollment_date, now)) * contribution.value();
    expected.min(payout.value() / Decimal::from(multiplier))
}

/// Due date for the next contribution: one interval past the last verified
/// payment, or past the enrollment date if none has been verified yet.
pub fn next_payment_date(
    frequency: Frequency,
    enrollment_date: DateTime<Utc>,
    last_verified: Option<DateTime<Utc>>,
) -> DateTime<Utc> {
    last_verified.unwrap_or(enrollment_date) + TimeDelta::days(frequency.interval_days())
}

/// Days until the maturity date, negative once it has passed.
pub fn days_until_maturity(maturity_date: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    ceil_days(maturity_date - now)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScheduleSlot {
    pub date: DateTime<Utc>,
    pub amount: Amount,
    pub paid: bool,
}

/// Synthetic payment schedule from enrollment to maturity.
///
/// A slot counts as paid when any verified payment lands within one full
/// interval of the slot date. The tolerance is deliberately a whole interval
/// (nearest match, not exact date), so one payment can satisfy two adjacent
/// slots.
pub fn payment_schedule(
    enrollment_date: DateTime<Utc>,
    maturity_date: DateTime<Utc>,
    frequency: Frequency,
    contribution: Amount,
    verified_dates: &[DateTime<Utc>],
) -> Vec<ScheduleSlot> {
    let interval = TimeDelta::days(frequency.interval_days());
    let mut slots = Vec::new();
    let mut current = enrollment_date;
    while current <= maturity_date && slots.len() < SCHEDULE_CAP {
        let paid = verified_dates.iter().any(|d| (*d - current).abs() < interval);
        slots.push(ScheduleSlot {
            date: current,
            amount: contribution,
            paid,
        });
        current += interval;
    }
    slots
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn day(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
    }

    fn amount(value: Decimal) -> Amount {
        Amount::new(value).unwrap()
    }

    #[test]
    fn test_daily_maturity_is_exact_weeks() {
        let settings = MaturitySettings {
            daily_maturity_weeks: 5,
            weekly_maturity_months: 3,
        };
        let matured = maturity_date(day(2025, 1, 1), Frequency::Daily, &settings).unwrap();
        assert_eq!(matured, day(2025, 2, 5)); // exactly 35 days
    }

    #[test]
    fn test_weekly_maturity_uses_calendar_months() {
        let settings = MaturitySettings::default(); // 3 months
        let matured = maturity_date(day(2025, 1, 15), Frequency::Weekly, &settings).unwrap();
        assert_eq!(matured, day(2025, 4, 15));

        // Clamped into a short month, not 30-day blocks
        let settings = MaturitySettings {
            daily_maturity_weeks: 5,
            weekly_maturity_months: 1,
        };
        let matured = maturity_date(day(2025, 1, 31), Frequency::Weekly, &settings).unwrap();
        assert_eq!(matured, day(2025, 2, 28));
    }

    #[test]
    fn test_payout_amount_is_contribution_times_multiplier() {
        let payout = payout_amount(amount(dec!(100)), PAYOUT_MULTIPLIER);
        assert_eq!(payout.value(), dec!(5000));
        assert_eq!(expected_plan_payout(amount(dec!(20))).value(), dec!(1000));
    }

    #[test]
    fn test_progress_midway() {
        let enrolled = day(2025, 1, 1);
        let matures = day(2025, 2, 5);
        let p = progress(enrolled, matures, EnrollmentStatus::Active, day(2025, 1, 8));
        assert_eq!(p.total_days, 35);
        assert_eq!(p.days_elapsed, 7);
        assert_eq!(p.days_remaining, 28);
        assert_eq!(p.percent, 20.0);
        assert!(!p.matured);
    }

    #[test]
    fn test_progress_is_pure() {
        let enrolled = day(2025, 1, 1);
        let matures = day(2025, 2, 5);
        let now = day(2025, 1, 20);
        let a = progress(enrolled, matures, EnrollmentStatus::Active, now);
        let b = progress(enrolled, matures, EnrollmentStatus::Active, now);
        assert_eq!(a, b);
    }

    #[test]
    fn test_progress_clamps_at_bounds() {
        let enrolled = day(2025, 1, 1);
        let matures = day(2025, 2, 5);

        // Past maturity: remaining floors at zero, percent caps at 100
        let past = progress(enrolled, matures, EnrollmentStatus::Active, day(2025, 6, 1));
        assert_eq!(past.days_remaining, 0);
        assert_eq!(past.percent, 100.0);
        assert!(past.matured);

        // Clock skew before the enrollment date
        let early = progress(enrolled, matures, EnrollmentStatus::Active, day(2024, 12, 1));
        assert_eq!(early.percent, 0.0);
        assert_eq!(early.days_remaining, 35);
    }

    #[test]
    fn test_matured_by_status_overrides_date() {
        let p = progress(
            day(2025, 1, 1),
            day(2025, 2, 5),
            EnrollmentStatus::Matured,
            day(2025, 1, 2),
        );
        assert!(p.matured);
    }

    #[test]
    fn test_expected_payments_by_frequency() {
        let enrolled = day(2025, 1, 1);
        let now = day(2025, 1, 11); // 10 days in
        assert_eq!(expected_payments(Frequency::Daily, enrolled, now), 10);
        assert_eq!(expected_payments(Frequency::Weekly, enrolled, now), 1);
        assert_eq!(expected_payments(Frequency::Daily, enrolled, day(2024, 12, 1)), 0);
    }

    #[test]
    fn test_expected_contribution_caps_at_payout_over_multiplier() {
        let contribution = amount(dec!(100));
        let payout = payout_amount(contribution, 50);
        let enrolled = day(2025, 1, 1);

        // One day in: a single contribution expected
        let expected = expected_contribution(
            Frequency::Daily,
            enrolled,
            day(2025, 1, 2),
            contribution,
            payout,
            50,
        );
        assert_eq!(expected, dec!(100));

        // Far along, the payout/multiplier cap kicks in
        let expected = expected_contribution(
            Frequency::Daily,
            enrolled,
            day(2025, 3, 1),
            contribution,
            payout,
            50,
        );
        assert_eq!(expected, dec!(100));
    }

    #[test]
    fn test_next_payment_date() {
        let enrolled = day(2025, 1, 1);
        assert_eq!(
            next_payment_date(Frequency::Daily, enrolled, None),
            day(2025, 1, 2)
        );
        assert_eq!(
            next_payment_date(Frequency::Weekly, enrolled, Some(day(2025, 1, 8))),
            day(2025, 1, 15)
        );
    }

    #[test]
    fn test_days_until_maturity_rounds_up() {
        let matures = day(2025, 2, 5);
        assert_eq!(days_until_maturity(matures, day(2025, 1, 29)), 7);
        assert_eq!(days_until_maturity(matures, day(2025, 2, 5)), 0);
        assert!(days_until_maturity(matures, day(2025, 2, 10)) < 0);
    }

    #[test]
    fn test_schedule_caps_at_twenty_slots() {
        let slots = payment_schedule(
            day(2025, 1, 1),
            day(2025, 2, 5),
            Frequency::Daily,
            amount(dec!(100)),
            &[],
        );
        assert_eq!(slots.len(), SCHEDULE_CAP);
        assert!(slots.iter().all(|s| !s.paid));
        assert_eq!(slots[0].date, day(2025, 1, 1));
        assert_eq!(slots[1].date, day(2025, 1, 2));
    }

    #[test]
    fn test_schedule_weekly_steps() {
        let slots = payment_schedule(
            day(2025, 1, 1),
            day(2025, 1, 29),
            Frequency::Weekly,
            amount(dec!(100)),
            &[day(2025, 1, 9)],
        );
        assert_eq!(slots.len(), 5);
        // Jan 9 payment is within a week of the Jan 8 slot
        assert!(slots[1].paid);
        assert!(!slots[3].paid);
    }

    #[test]
    fn test_schedule_tolerance_can_double_count() {
        // A payment halfway between two daily slots marks both as paid.
        let noon = Utc.with_ymd_and_hms(2025, 1, 1, 12, 0, 0).unwrap();
        let slots = payment_schedule(
            day(2025, 1, 1),
            day(2025, 1, 3),
            Frequency::Daily,
            amount(dec!(100)),
            &[noon],
        );
        assert!(slots[0].paid);
        assert!(slots[1].paid);
        assert!(!slots[2].paid);
    }
}
