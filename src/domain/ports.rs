//! Store ports modelling the hosted persistence gateway, the proof object
//! store and the clock. The application layer only ever sees these traits.

use super::enrollment::Enrollment;
use super::payment::{Payment, PaymentMethod, PaymentStatus};
use super::plan::Plan;
use super::settings::{MaturitySettings, SiteSettings};
use super::user::User;
use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

#[async_trait]
pub trait PlanStore: Send + Sync {
    async fn insert(&self, plan: Plan) -> Result<()>;
    async fn get(&self, id: Uuid) -> Result<Option<Plan>>;
    async fn update(&self, plan: Plan) -> Result<()>;
    /// All plans, cheapest contribution first.
    async fn all(&self) -> Result<Vec<Plan>>;
    /// Active plans only, cheapest contribution first.
    async fn active(&self) -> Result<Vec<Plan>>;
}

#[async_trait]
pub trait EnrollmentStore: Send + Sync {
    async fn insert(&self, enrollment: Enrollment) -> Result<()>;
    async fn get(&self, id: Uuid) -> Result<Option<Enrollment>>;
    async fn update(&self, enrollment: Enrollment) -> Result<()>;
    async fn all(&self) -> Result<Vec<Enrollment>>;
    /// A member's enrollments, newest first.
    async fn for_user(&self, user_id: Uuid) -> Result<Vec<Enrollment>>;
    /// ACTIVE enrollments whose maturity date has passed, oldest maturity
    /// first. Feeds the admin payout queue.
    async fn payable(&self, now: DateTime<Utc>) -> Result<Vec<Enrollment>>;
}

#[async_trait]
pub trait PaymentStore: Send + Sync {
    async fn insert(&self, payment: Payment) -> Result<()>;
    async fn get(&self, id: Uuid) -> Result<Option<Payment>>;
    async fn update(&self, payment: Payment) -> Result<()>;
    /// Payments for one enrollment, newest payment date first.
    async fn for_enrollment(&self, enrollment_id: Uuid) -> Result<Vec<Payment>>;
    async fn for_user(&self, user_id: Uuid) -> Result<Vec<Payment>>;
    /// Payments in one state, newest first. Feeds the admin review tabs.
    async fn with_status(&self, status: PaymentStatus) -> Result<Vec<Payment>>;
    /// A member's payments decided (verified or rejected) since `since`.
    async fn decided_since(&self, user_id: Uuid, since: DateTime<Utc>) -> Result<Vec<Payment>>;
}

#[async_trait]
pub trait PaymentMethodStore: Send + Sync {
    async fn insert(&self, method: PaymentMethod) -> Result<()>;
    async fn get(&self, id: Uuid) -> Result<Option<PaymentMethod>>;
    async fn update(&self, method: PaymentMethod) -> Result<()>;
    async fn all(&self) -> Result<Vec<PaymentMethod>>;
    async fn active(&self) -> Result<Vec<PaymentMethod>>;
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn insert(&self, user: User) -> Result<()>;
    async fn get(&self, id: Uuid) -> Result<Option<User>>;
    async fn update(&self, user: User) -> Result<()>;
    async fn by_email(&self, email: &str) -> Result<Option<User>>;
    async fn all(&self) -> Result<Vec<User>>;
}

#[async_trait]
pub trait SettingsStore: Send + Sync {
    async fn maturity(&self) -> Result<Option<MaturitySettings>>;
    async fn set_maturity(&self, settings: MaturitySettings) -> Result<()>;
    async fn site(&self) -> Result<Option<SiteSettings>>;
    async fn set_site(&self, settings: SiteSettings) -> Result<()>;
}

/// External object storage for payment proof screenshots.
#[async_trait]
pub trait ProofStore: Send + Sync {
    async fn upload(&self, key: &str, bytes: &[u8]) -> Result<()>;
    /// Durable public reference for an uploaded key.
    fn public_url(&self, key: &str) -> String;
}

/// Client-local read tracking for the notification feed.
#[async_trait]
pub trait ReadStateStore: Send + Sync {
    async fn read_ids(&self, user_id: Uuid) -> Result<Vec<String>>;
    async fn mark_read(&self, user_id: Uuid, notification_id: &str) -> Result<()>;
    async fn mark_all_read(&self, user_id: Uuid, notification_ids: &[String]) -> Result<()>;
}

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

pub type PlanStoreBox = Box<dyn PlanStore>;
pub type EnrollmentStoreBox = Box<dyn EnrollmentStore>;
pub type PaymentStoreBox = Box<dyn PaymentStore>;
pub type PaymentMethodStoreBox = Box<dyn PaymentMethodStore>;
pub type UserStoreBox = Box<dyn UserStore>;
pub type SettingsStoreBox = Box<dyn SettingsStore>;
pub type ProofStoreBox = Box<dyn ProofStore>;
pub type ReadStateStoreBox = Box<dyn ReadStateStore>;
pub type ClockBox = Box<dyn Clock>;
