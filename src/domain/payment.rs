use crate::domain::money::Amount;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "UPPERCASE")]
pub enum PaymentStatus {
    Pending,
    Verified,
    Rejected,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "PENDING",
            PaymentStatus::Verified => "VERIFIED",
            PaymentStatus::Rejected => "REJECTED",
        }
    }
}

/// An admin's verdict on a pending payment.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Decision {
    Verify,
    Reject,
}

/// One submitted contribution, always created with a stored proof reference.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Payment {
    pub id: Uuid,
    pub enrollment_id: Uuid,
    pub user_id: Uuid,
    pub amount: Amount,
    pub payment_date: DateTime<Utc>,
    pub proof_url: String,
    pub payment_method_id: Uuid,
    pub status: PaymentStatus,
    pub admin_notes: Option<String>,
    pub verified_at: Option<DateTime<Utc>>,
    pub verified_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Payment {
    pub fn is_pending(&self) -> bool {
        self.status == PaymentStatus::Pending
    }
}

/// An admin-configured channel members pay through (CashApp, Zelle, BTC...).
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct PaymentMethod {
    pub id: Uuid,
    pub name: String,
    pub account_identifier: String,
    pub instructions: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PaymentMethod {
    pub fn new(
        name: impl Into<String>,
        account_identifier: impl Into<String>,
        instructions: Option<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            account_identifier: account_identifier.into(),
            instructions,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }
}
