//! Thread-safe in-memory adapters for every store port.
//!
//! Each store is `Clone` and shares state through `Arc<RwLock<..>>`, so the
//! same instance can be boxed behind several ports at once. Used by tests
//! and the batch CLI.

use crate::domain::enrollment::{Enrollment, EnrollmentStatus};
use crate::domain::payment::{Payment, PaymentMethod, PaymentStatus};
use crate::domain::plan::Plan;
use crate::domain::ports::{
    EnrollmentStore, PaymentMethodStore, PaymentStore, PlanStore, ProofStore, ReadStateStore,
    SettingsStore, UserStore,
};
use crate::domain::settings::{MaturitySettings, SiteSettings};
use crate::domain::user::User;
use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Default, Clone)]
pub struct InMemoryPlanStore {
    plans: Arc<RwLock<HashMap<Uuid, Plan>>>,
}

impl InMemoryPlanStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PlanStore for InMemoryPlanStore {
    async fn insert(&self, plan: Plan) -> Result<()> {
        self.plans.write().await.insert(plan.id, plan);
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Plan>> {
        Ok(self.plans.read().await.get(&id).cloned())
    }

    async fn update(&self, plan: Plan) -> Result<()> {
        self.plans.write().await.insert(plan.id, plan);
        Ok(())
    }

    async fn all(&self) -> Result<Vec<Plan>> {
        let mut plans: Vec<Plan> = self.plans.read().await.values().cloned().collect();
        plans.sort_by_key(|p| p.contribution_amount.value());
        Ok(plans)
    }

    async fn active(&self) -> Result<Vec<Plan>> {
        Ok(self.all().await?.into_iter().filter(|p| p.is_active).collect())
    }
}

#[derive(Default, Clone)]
pub struct InMemoryEnrollmentStore {
    enrollments: Arc<RwLock<HashMap<Uuid, Enrollment>>>,
}

impl InMemoryEnrollmentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EnrollmentStore for InMemoryEnrollmentStore {
    async fn insert(&self, enrollment: Enrollment) -> Result<()> {
        self.enrollments
            .write()
            .await
            .insert(enrollment.id, enrollment);
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Enrollment>> {
        Ok(self.enrollments.read().await.get(&id).cloned())
    }

    async fn update(&self, enrollment: Enrollment) -> Result<()> {
        self.enrollments
            .write()
            .await
            .insert(enrollment.id, enrollment);
        Ok(())
    }

    async fn all(&self) -> Result<Vec<Enrollment>> {
        let mut enrollments: Vec<Enrollment> =
            self.enrollments.read().await.values().cloned().collect();
        enrollments.sort_by_key(|e| e.created_at);
        Ok(enrollments)
    }

    async fn for_user(&self, user_id: Uuid) -> Result<Vec<Enrollment>> {
        let mut enrollments: Vec<Enrollment> = self
            .enrollments
            .read()
            .await
            .values()
            .filter(|e| e.user_id == user_id)
            .cloned()
            .collect();
        enrollments.sort_by_key(|e| std::cmp::Reverse(e.created_at));
        Ok(enrollments)
    }

    async fn payable(&self, now: DateTime<Utc>) -> Result<Vec<Enrollment>> {
        let mut enrollments: Vec<Enrollment> = self
            .enrollments
            .read()
            .await
            .values()
            .filter(|e| e.status == EnrollmentStatus::Active && e.maturity_date <= now)
            .cloned()
            .collect();
        enrollments.sort_by_key(|e| e.maturity_date);
        Ok(enrollments)
    }
}

#[derive(Default, Clone)]
pub struct InMemoryPaymentStore {
    payments: Arc<RwLock<HashMap<Uuid, Payment>>>,
}

impl InMemoryPaymentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PaymentStore for InMemoryPaymentStore {
    async fn insert(&self, payment: Payment) -> Result<()> {
        self.payments.write().await.insert(payment.id, payment);
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Payment>> {
        Ok(self.payments.read().await.get(&id).cloned())
    }

    async fn update(&self, payment: Payment) -> Result<()> {
        self.payments.write().await.insert(payment.id, payment);
        Ok(())
    }

    async fn for_enrollment(&self, enrollment_id: Uuid) -> Result<Vec<Payment>> {
        let mut payments: Vec<Payment> = self
            .payments
            .read()
            .await
            .values()
            .filter(|p| p.enrollment_id == enrollment_id)
            .cloned()
            .collect();
        payments.sort_by_key(|p| (std::cmp::Reverse(p.payment_date), p.id));
        Ok(payments)
    }

    async fn for_user(&self, user_id: Uuid) -> Result<Vec<Payment>> {
        let mut payments: Vec<Payment> = self
            .payments
            .read()
            .await
            .values()
            .filter(|p| p.user_id == user_id)
            .cloned()
            .collect();
        payments.sort_by_key(|p| (std::cmp::Reverse(p.payment_date), p.id));
        Ok(payments)
    }

    async fn with_status(&self, status: PaymentStatus) -> Result<Vec<Payment>> {
        let mut payments: Vec<Payment> = self
            .payments
            .read()
            .await
            .values()
            .filter(|p| p.status == status)
            .cloned()
            .collect();
        payments.sort_by_key(|p| (std::cmp::Reverse(p.created_at), p.id));
        Ok(payments)
    }

    async fn decided_since(&self, user_id: Uuid, since: DateTime<Utc>) -> Result<Vec<Payment>> {
        let mut payments: Vec<Payment> = self
            .payments
            .read()
            .await
            .values()
            .filter(|p| {
                p.user_id == user_id && p.status != PaymentStatus::Pending && p.updated_at >= since
            })
            .cloned()
            .collect();
        payments.sort_by_key(|p| (std::cmp::Reverse(p.updated_at), p.id));
        Ok(payments)
    }
}

#[derive(Default, Clone)]
pub struct InMemoryPaymentMethodStore {
    methods: Arc<RwLock<HashMap<Uuid, PaymentMethod>>>,
}

impl InMemoryPaymentMethodStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PaymentMethodStore for InMemoryPaymentMethodStore {
    async fn insert(&self, method: PaymentMethod) -> Result<()> {
        self.methods.write().await.insert(method.id, method);
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<PaymentMethod>> {
        Ok(self.methods.read().await.get(&id).cloned())
    }

    async fn update(&self, method: PaymentMethod) -> Result<()> {
        self.methods.write().await.insert(method.id, method);
        Ok(())
    }

    async fn all(&self) -> Result<Vec<PaymentMethod>> {
        let mut methods: Vec<PaymentMethod> = self.methods.read().await.values().cloned().collect();
        methods.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(methods)
    }

    async fn active(&self) -> Result<Vec<PaymentMethod>> {
        Ok(self.all().await?.into_iter().filter(|m| m.is_active).collect())
    }
}

#[derive(Default, Clone)]
pub struct InMemoryUserStore {
    users: Arc<RwLock<HashMap<Uuid, User>>>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn insert(&self, user: User) -> Result<()> {
        self.users.write().await.insert(user.id, user);
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<User>> {
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn update(&self, user: User) -> Result<()> {
        self.users.write().await.insert(user.id, user);
        Ok(())
    }

    async fn by_email(&self, email: &str) -> Result<Option<User>> {
        Ok(self
            .users
            .read()
            .await
            .values()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn all(&self) -> Result<Vec<User>> {
        let mut users: Vec<User> = self.users.read().await.values().cloned().collect();
        users.sort_by_key(|u| std::cmp::Reverse(u.created_at));
        Ok(users)
    }
}

#[derive(Default, Clone)]
pub struct InMemorySettingsStore {
    maturity: Arc<RwLock<Option<MaturitySettings>>>,
    site: Arc<RwLock<Option<SiteSettings>>>,
}

impl InMemorySettingsStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SettingsStore for InMemorySettingsStore {
    async fn maturity(&self) -> Result<Option<MaturitySettings>> {
        Ok(*self.maturity.read().await)
    }

    async fn set_maturity(&self, settings: MaturitySettings) -> Result<()> {
        *self.maturity.write().await = Some(settings);
        Ok(())
    }

    async fn site(&self) -> Result<Option<SiteSettings>> {
        Ok(self.site.read().await.clone())
    }

    async fn set_site(&self, settings: SiteSettings) -> Result<()> {
        *self.site.write().await = Some(settings);
        Ok(())
    }
}

/// Proof blobs kept in memory, addressed by upload key.
#[derive(Default, Clone)]
pub struct InMemoryProofStore {
    blobs: Arc<RwLock<HashMap<String, Vec<u8>>>>,
}

impl InMemoryProofStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn contains(&self, key: &str) -> bool {
        self.blobs.read().await.contains_key(key)
    }

    pub async fn blob_count(&self) -> usize {
        self.blobs.read().await.len()
    }
}

#[async_trait]
impl ProofStore for InMemoryProofStore {
    async fn upload(&self, key: &str, bytes: &[u8]) -> Result<()> {
        self.blobs
            .write()
            .await
            .insert(key.to_string(), bytes.to_vec());
        Ok(())
    }

    fn public_url(&self, key: &str) -> String {
        format!("memory://payment-proofs/{key}")
    }
}

#[derive(Default, Clone)]
pub struct InMemoryReadStateStore {
    read: Arc<RwLock<HashMap<Uuid, HashSet<String>>>>,
}

impl InMemoryReadStateStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ReadStateStore for InMemoryReadStateStore {
    async fn read_ids(&self, user_id: Uuid) -> Result<Vec<String>> {
        Ok(self
            .read
            .read()
            .await
            .get(&user_id)
            .map(|ids| ids.iter().cloned().collect())
            .unwrap_or_default())
    }

    async fn mark_read(&self, user_id: Uuid, notification_id: &str) -> Result<()> {
        self.read
            .write()
            .await
            .entry(user_id)
            .or_default()
            .insert(notification_id.to_string());
        Ok(())
    }

    async fn mark_all_read(&self, user_id: Uuid, notification_ids: &[String]) -> Result<()> {
        self.read
            .write()
            .await
            .entry(user_id)
            .or_default()
            .extend(notification_ids.iter().cloned());
        Ok(())
    }
}
