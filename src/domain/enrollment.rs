use crate::domain::money::Amount;
use crate::domain::plan::Frequency;
use crate::error::{ClubError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "UPPERCASE")]
pub enum EnrollmentStatus {
    Active,
    Matured,
    Paid,
    Cancelled,
}

impl EnrollmentStatus {
    /// Status only moves forward: ACTIVE -> MATURED -> PAID, with CANCELLED
    /// as a terminal side exit from ACTIVE.
    pub fn can_transition_to(&self, next: EnrollmentStatus) -> bool {
        use EnrollmentStatus::*;
        matches!(
            (self, next),
            (Active, Matured) | (Active, Paid) | (Active, Cancelled) | (Matured, Paid)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EnrollmentStatus::Active => "ACTIVE",
            EnrollmentStatus::Matured => "MATURED",
            EnrollmentStatus::Paid => "PAID",
            EnrollmentStatus::Cancelled => "CANCELLED",
        }
    }
}

/// A member's commitment to a plan.
///
/// Frequency and contribution amount are snapshots taken at enrollment time;
/// later plan edits do not touch existing enrollments. `payout_amount` is
/// fixed once computed.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Enrollment {
    pub id: Uuid,
    pub user_id: Uuid,
    pub plan_id: Uuid,
    pub frequency: Frequency,
    pub contribution_amount: Amount,
    pub multiplier: u32,
    pub enrollment_date: DateTime<Utc>,
    pub maturity_date: DateTime<Utc>,
    pub payout_amount: Amount,
    pub status: EnrollmentStatus,
    pub payout_date: Option<DateTime<Utc>>,
    pub payout_processed_by: Option<Uuid>,
    pub payout_notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Enrollment {
    /// Maturity is derived, not stored: an enrollment counts as matured once
    /// the status says so or the maturity date has passed.
    pub fn is_matured(&self, now: DateTime<Utc>) -> bool {
        self.status == EnrollmentStatus::Matured || now >= self.maturity_date
    }

    pub fn transition(&mut self, next: EnrollmentStatus, now: DateTime<Utc>) -> Result<()> {
        if !self.status.can_transition_to(next) {
            return Err(ClubError::Validation(format!(
                "enrollment cannot move from {} to {}",
                self.status.as_str(),
                next.as_str()
            )));
        }
        self.status = next;
        self.updated_at = now;
        Ok(())
    }
}
