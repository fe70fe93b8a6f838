use crate::domain::money::Amount;
use crate::error::{ClubError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// How often an enrolled member contributes.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum Frequency {
    #[serde(alias = "daily")]
    Daily,
    #[serde(alias = "weekly")]
    Weekly,
}

impl Frequency {
    /// Length of one contribution interval, in days.
    pub fn interval_days(&self) -> i64 {
        match self {
            Frequency::Daily => 1,
            Frequency::Weekly => 7,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Frequency::Daily => "DAILY",
            Frequency::Weekly => "WEEKLY",
        }
    }
}

/// A contribution tier members can enroll in.
///
/// Plans are deactivated rather than deleted so historical enrollments keep
/// a valid reference.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Plan {
    pub id: Uuid,
    pub name: String,
    pub contribution_amount: Amount,
    pub frequency: Frequency,
    pub total_slots: u32,
    pub available_slots: u32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Plan {
    pub fn new(
        name: impl Into<String>,
        contribution_amount: Amount,
        frequency: Frequency,
        total_slots: u32,
        available_slots: u32,
        now: DateTime<Utc>,
    ) -> Result<Self> {
        if available_slots > total_slots {
            return Err(ClubError::Validation(
                "available slots cannot exceed total slots".to_string(),
            ));
        }
        Ok(Self {
            id: Uuid::new_v4(),
            name: name.into(),
            contribution_amount,
            frequency,
            total_slots,
            available_slots,
            is_active: true,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn has_capacity(&self) -> bool {
        self.available_slots > 0
    }
}
