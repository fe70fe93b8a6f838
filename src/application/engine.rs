use crate::application::events::{ChangeEvent, EventBus};
use crate::domain::enrollment::{Enrollment, EnrollmentStatus};
use crate::domain::money::Amount;
use crate::domain::payment::{Decision, Payment, PaymentMethod, PaymentStatus};
use crate::domain::plan::{Frequency, Plan};
use crate::domain::ports::{
    ClockBox, EnrollmentStoreBox, PaymentMethodStoreBox, PaymentStoreBox, PlanStoreBox,
    ProofStoreBox, SettingsStoreBox, UserStoreBox,
};
use crate::domain::rules::{self, PAYOUT_MULTIPLIER};
use crate::domain::settings::{MaturitySettings, SiteSettings};
use crate::domain::user::{Role, User};
use crate::error::{ClubError, Result};
use rust_decimal::Decimal;
use uuid::Uuid;

/// The store ports the engine works against.
pub struct Stores {
    pub plans: PlanStoreBox,
    pub enrollments: EnrollmentStoreBox,
    pub payments: PaymentStoreBox,
    pub methods: PaymentMethodStoreBox,
    pub users: UserStoreBox,
    pub settings: SettingsStoreBox,
    pub proofs: ProofStoreBox,
}

/// Entry point for every contribution-club workflow.
///
/// The engine owns boxed store ports and awaits each store operation in
/// order, so a failed step surfaces immediately and nothing after it runs.
/// No operation is retried.
pub struct ContributionEngine {
    stores: Stores,
    clock: ClockBox,
    events: EventBus,
}

/// Aggregates shown on a member's dashboard, always derived by summing.
#[derive(Debug, Clone, PartialEq)]
pub struct DashboardStats {
    pub balance: Decimal,
    pub upcoming_balance: Decimal,
    pub next_maturity_date: Option<chrono::DateTime<chrono::Utc>>,
    pub active_plans: usize,
}

/// One enrollment with its payment history and lazily derived projections.
#[derive(Debug, Clone, PartialEq)]
pub struct EnrollmentDetail {
    pub enrollment: Enrollment,
    pub payments: Vec<Payment>,
    pub total_contributed: Decimal,
    pub pending_amount: Decimal,
    pub expected_contribution: Decimal,
    pub progress: rules::Progress,
    pub next_payment_date: chrono::DateTime<chrono::Utc>,
    pub schedule: Vec<rules::ScheduleSlot>,
}

/// Per-user aggregates for the admin member list.
#[derive(Debug, Clone, PartialEq)]
pub struct UserOverview {
    pub user: User,
    pub enrollment_count: usize,
    pub payment_count: usize,
    pub total_contributed: Decimal,
}

/// One row of the batch-import summary.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct EnrollmentSummary {
    pub user: String,
    pub plan: String,
    pub frequency: Frequency,
    pub contributed: Decimal,
    pub payout: Decimal,
    pub status: EnrollmentStatus,
}

fn require_admin(user: &User) -> Result<()> {
    if user.is_admin() {
        Ok(())
    } else {
        Err(ClubError::Auth("admin access required".to_string()))
    }
}

fn sum_with_status(payments: &[Payment], status: PaymentStatus) -> Decimal {
    payments
        .iter()
        .filter(|p| p.status == status)
        .map(|p| p.amount.value())
        .sum()
}

impl ContributionEngine {
    pub fn new(stores: Stores, clock: ClockBox) -> Self {
        Self {
            stores,
            clock,
            events: EventBus::default(),
        }
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    // ----- enrollment workflow -----

    /// Enrolls a member in a plan, computing the maturity date and payout
    /// from the current maturity settings.
    ///
    /// Capacity is checked but not decremented; two concurrent enrollments
    /// against a plan's last slot both succeed.
    pub async fn enroll(
        &self,
        user_id: Uuid,
        plan_id: Uuid,
        frequency: Frequency,
    ) -> Result<Enrollment> {
        let plan = self
            .stores
            .plans
            .get(plan_id)
            .await?
            .ok_or_else(|| ClubError::NotFound(format!("plan {plan_id}")))?;
        if !plan.is_active {
            return Err(ClubError::Validation("plan is not active".to_string()));
        }
        if !plan.has_capacity() {
            return Err(ClubError::Validation("plan has no available slots".to_string()));
        }

        let settings = self
            .stores
            .settings
            .maturity()
            .await?
            .ok_or_else(|| ClubError::Validation("maturity settings are not configured".to_string()))?;

        let now = self.clock.now();
        let maturity_date = rules::maturity_date(now, frequency, &settings)?;
        let enrollment = Enrollment {
            id: Uuid::new_v4(),
            user_id,
            plan_id,
            frequency,
            contribution_amount: plan.contribution_amount,
            multiplier: PAYOUT_MULTIPLIER,
            enrollment_date: now,
            maturity_date,
            payout_amount: rules::payout_amount(plan.contribution_amount, PAYOUT_MULTIPLIER),
            status: EnrollmentStatus::Active,
            payout_date: None,
            payout_processed_by: None,
            payout_notes: None,
            created_at: now,
            updated_at: now,
        };
        self.stores.enrollments.insert(enrollment.clone()).await?;
        tracing::info!(
            enrollment = %enrollment.id,
            plan = %plan.name,
            frequency = frequency.as_str(),
            "member enrolled"
        );
        self.events
            .publish(ChangeEvent::EnrollmentCreated(enrollment.clone()));
        Ok(enrollment)
    }

    // ----- payment workflow -----

    /// Records a contribution as PENDING after its proof screenshot has been
    /// stored.
    ///
    /// The upload happens first: an upload failure aborts the whole
    /// submission and no payment row exists without a proof reference. If
    /// the insert fails after the upload, the blob is left behind.
    pub async fn submit_payment(
        &self,
        enrollment_id: Uuid,
        amount: Amount,
        proof: &[u8],
        proof_ext: &str,
        method_id: Uuid,
    ) -> Result<Payment> {
        if proof.is_empty() {
            return Err(ClubError::Validation("payment proof is required".to_string()));
        }
        let enrollment = self
            .stores
            .enrollments
            .get(enrollment_id)
            .await?
            .ok_or_else(|| ClubError::NotFound(format!("enrollment {enrollment_id}")))?;
        let method = self
            .stores
            .methods
            .get(method_id)
            .await?
            .ok_or_else(|| ClubError::NotFound(format!("payment method {method_id}")))?;
        if !method.is_active {
            return Err(ClubError::Validation("payment method is not active".to_string()));
        }

        let now = self.clock.now();
        let key = format!(
            "{}/{}.{}",
            enrollment.user_id,
            now.timestamp_millis(),
            proof_ext
        );
        self.stores.proofs.upload(&key, proof).await?;
        let proof_url = self.stores.proofs.public_url(&key);

        let payment = Payment {
            id: Uuid::new_v4(),
            enrollment_id,
            user_id: enrollment.user_id,
            amount,
            payment_date: now,
            proof_url,
            payment_method_id: method_id,
            status: PaymentStatus::Pending,
            admin_notes: None,
            verified_at: None,
            verified_by: None,
            created_at: now,
            updated_at: now,
        };
        self.stores.payments.insert(payment.clone()).await?;
        tracing::info!(payment = %payment.id, enrollment = %enrollment_id, amount = %amount, "payment submitted");
        self.events
            .publish(ChangeEvent::PaymentSubmitted(payment.clone()));
        Ok(payment)
    }

    /// Applies an admin decision to a payment.
    ///
    /// An already-decided payment can be decided again; blocking that needs
    /// a product call, so the engine does not guard for it.
    pub async fn decide_payment(
        &self,
        payment_id: Uuid,
        decision: Decision,
        note: Option<&str>,
        admin: &User,
    ) -> Result<Payment> {
        require_admin(admin)?;
        let mut payment = self
            .stores
            .payments
            .get(payment_id)
            .await?
            .ok_or_else(|| ClubError::NotFound(format!("payment {payment_id}")))?;

        let now = self.clock.now();
        let (status, default_note) = match decision {
            Decision::Verify => (PaymentStatus::Verified, "Payment approved"),
            Decision::Reject => (PaymentStatus::Rejected, "Payment rejected"),
        };
        payment.status = status;
        payment.admin_notes = Some(note.unwrap_or(default_note).to_string());
        payment.verified_at = Some(now);
        payment.verified_by = Some(admin.id);
        payment.updated_at = now;

        self.stores.payments.update(payment.clone()).await?;
        tracing::info!(payment = %payment.id, status = payment.status.as_str(), "payment decided");
        self.events
            .publish(ChangeEvent::PaymentDecided(payment.clone()));
        Ok(payment)
    }

    // ----- payout workflow -----

    /// Marks a matured enrollment as paid out.
    pub async fn process_payout(
        &self,
        enrollment_id: Uuid,
        note: Option<&str>,
        admin: &User,
    ) -> Result<Enrollment> {
        require_admin(admin)?;
        let mut enrollment = self
            .stores
            .enrollments
            .get(enrollment_id)
            .await?
            .ok_or_else(|| ClubError::NotFound(format!("enrollment {enrollment_id}")))?;

        let now = self.clock.now();
        if !enrollment.is_matured(now) {
            return Err(ClubError::Validation(
                "enrollment has not matured yet".to_string(),
            ));
        }
        enrollment.transition(EnrollmentStatus::Paid, now)?;
        enrollment.payout_date = Some(now);
        enrollment.payout_processed_by = Some(admin.id);
        enrollment.payout_notes = Some(note.unwrap_or("Payout processed").to_string());

        self.stores.enrollments.update(enrollment.clone()).await?;
        tracing::info!(enrollment = %enrollment.id, payout = %enrollment.payout_amount, "payout processed");
        self.events
            .publish(ChangeEvent::PayoutProcessed(enrollment.clone()));
        Ok(enrollment)
    }

    /// ACTIVE enrollments past their maturity date, for the payout queue.
    pub async fn payout_queue(&self, admin: &User) -> Result<Vec<Enrollment>> {
        require_admin(admin)?;
        self.stores.enrollments.payable(self.clock.now()).await
    }

    // ----- admin CRUD -----

    pub async fn create_plan(
        &self,
        admin: &User,
        name: &str,
        contribution_amount: Amount,
        frequency: Frequency,
        total_slots: u32,
        available_slots: u32,
    ) -> Result<Plan> {
        require_admin(admin)?;
        let plan = Plan::new(
            name,
            contribution_amount,
            frequency,
            total_slots,
            available_slots,
            self.clock.now(),
        )?;
        self.stores.plans.insert(plan.clone()).await?;
        self.events.publish(ChangeEvent::PlanChanged(plan.clone()));
        Ok(plan)
    }

    /// Edits a plan in place. Existing enrollments keep their snapshots.
    pub async fn update_plan(
        &self,
        admin: &User,
        plan_id: Uuid,
        name: &str,
        contribution_amount: Amount,
        total_slots: u32,
        available_slots: u32,
    ) -> Result<Plan> {
        require_admin(admin)?;
        if available_slots > total_slots {
            return Err(ClubError::Validation(
                "available slots cannot exceed total slots".to_string(),
            ));
        }
        let mut plan = self
            .stores
            .plans
            .get(plan_id)
            .await?
            .ok_or_else(|| ClubError::NotFound(format!("plan {plan_id}")))?;
        plan.name = name.to_string();
        plan.contribution_amount = contribution_amount;
        plan.total_slots = total_slots;
        plan.available_slots = available_slots;
        plan.updated_at = self.clock.now();
        self.stores.plans.update(plan.clone()).await?;
        self.events.publish(ChangeEvent::PlanChanged(plan.clone()));
        Ok(plan)
    }

    pub async fn set_plan_active(&self, admin: &User, plan_id: Uuid, active: bool) -> Result<Plan> {
        require_admin(admin)?;
        let mut plan = self
            .stores
            .plans
            .get(plan_id)
            .await?
            .ok_or_else(|| ClubError::NotFound(format!("plan {plan_id}")))?;
        plan.is_active = active;
        plan.updated_at = self.clock.now();
        self.stores.plans.update(plan.clone()).await?;
        self.events.publish(ChangeEvent::PlanChanged(plan.clone()));
        Ok(plan)
    }

    pub async fn create_payment_method(
        &self,
        admin: &User,
        name: &str,
        account_identifier: &str,
        instructions: Option<String>,
    ) -> Result<PaymentMethod> {
        require_admin(admin)?;
        let method = PaymentMethod::new(name, account_identifier, instructions, self.clock.now());
        self.stores.methods.insert(method.clone()).await?;
        Ok(method)
    }

    pub async fn set_method_active(
        &self,
        admin: &User,
        method_id: Uuid,
        active: bool,
    ) -> Result<PaymentMethod> {
        require_admin(admin)?;
        let mut method = self
            .stores
            .methods
            .get(method_id)
            .await?
            .ok_or_else(|| ClubError::NotFound(format!("payment method {method_id}")))?;
        method.is_active = active;
        method.updated_at = self.clock.now();
        self.stores.methods.update(method.clone()).await?;
        Ok(method)
    }

    pub async fn create_user(&self, email: &str, full_name: Option<String>, role: Role) -> Result<User> {
        if self.stores.users.by_email(email).await?.is_some() {
            return Err(ClubError::Validation(format!("email {email} already registered")));
        }
        let mut user = User::new(email, role, self.clock.now());
        user.full_name = full_name;
        self.stores.users.insert(user.clone()).await?;
        Ok(user)
    }

    pub async fn user_by_email(&self, email: &str) -> Result<Option<User>> {
        self.stores.users.by_email(email).await
    }

    /// Changes another member's role. Admins cannot change their own.
    pub async fn change_role(&self, admin: &User, target_id: Uuid, role: Role) -> Result<User> {
        require_admin(admin)?;
        if admin.id == target_id {
            return Err(ClubError::Validation(
                "admins cannot change their own role".to_string(),
            ));
        }
        let mut target = self
            .stores
            .users
            .get(target_id)
            .await?
            .ok_or_else(|| ClubError::NotFound(format!("user {target_id}")))?;
        target.role = role;
        target.updated_at = self.clock.now();
        self.stores.users.update(target.clone()).await?;
        Ok(target)
    }

    pub async fn update_profile(
        &self,
        user_id: Uuid,
        full_name: Option<String>,
        phone: Option<String>,
    ) -> Result<User> {
        let mut user = self
            .stores
            .users
            .get(user_id)
            .await?
            .ok_or_else(|| ClubError::NotFound(format!("user {user_id}")))?;
        user.full_name = full_name;
        user.phone = phone;
        user.updated_at = self.clock.now();
        self.stores.users.update(user.clone()).await?;
        Ok(user)
    }

    pub async fn update_maturity_settings(
        &self,
        admin: &User,
        settings: MaturitySettings,
    ) -> Result<()> {
        require_admin(admin)?;
        self.stores.settings.set_maturity(settings).await
    }

    pub async fn update_site_settings(&self, admin: &User, mut settings: SiteSettings) -> Result<()> {
        require_admin(admin)?;
        settings.updated_at = self.clock.now();
        self.stores.settings.set_site(settings.clone()).await?;
        self.events.publish(ChangeEvent::SettingsChanged(settings));
        Ok(())
    }

    // ----- read queries -----

    pub async fn payments_for_review(&self, admin: &User, status: PaymentStatus) -> Result<Vec<Payment>> {
        require_admin(admin)?;
        self.stores.payments.with_status(status).await
    }

    pub async fn dashboard_stats(&self, user_id: Uuid) -> Result<DashboardStats> {
        let payments = self.stores.payments.for_user(user_id).await?;
        let enrollments = self.stores.enrollments.for_user(user_id).await?;
        let active: Vec<&Enrollment> = enrollments
            .iter()
            .filter(|e| e.status == EnrollmentStatus::Active)
            .collect();
        Ok(DashboardStats {
            balance: sum_with_status(&payments, PaymentStatus::Verified),
            upcoming_balance: active.iter().map(|e| e.payout_amount.value()).sum(),
            next_maturity_date: active.iter().map(|e| e.maturity_date).min(),
            active_plans: active.len(),
        })
    }

    /// An enrollment with its payments and time-based projections, visible
    /// only to its owner.
    pub async fn enrollment_detail(&self, enrollment_id: Uuid, user_id: Uuid) -> Result<EnrollmentDetail> {
        let enrollment = self
            .stores
            .enrollments
            .get(enrollment_id)
            .await?
            .filter(|e| e.user_id == user_id)
            .ok_or_else(|| ClubError::NotFound(format!("enrollment {enrollment_id}")))?;
        let payments = self.stores.payments.for_enrollment(enrollment_id).await?;

        let now = self.clock.now();
        let verified_dates: Vec<chrono::DateTime<chrono::Utc>> = payments
            .iter()
            .filter(|p| p.status == PaymentStatus::Verified)
            .map(|p| p.payment_date)
            .collect();
        let last_verified = verified_dates.iter().max().copied();
        Ok(EnrollmentDetail {
            total_contributed: sum_with_status(&payments, PaymentStatus::Verified),
            pending_amount: sum_with_status(&payments, PaymentStatus::Pending),
            expected_contribution: rules::expected_contribution(
                enrollment.frequency,
                enrollment.enrollment_date,
                now,
                enrollment.contribution_amount,
                enrollment.payout_amount,
                enrollment.multiplier,
            ),
            progress: rules::progress(
                enrollment.enrollment_date,
                enrollment.maturity_date,
                enrollment.status,
                now,
            ),
            next_payment_date: rules::next_payment_date(
                enrollment.frequency,
                enrollment.enrollment_date,
                last_verified,
            ),
            schedule: rules::payment_schedule(
                enrollment.enrollment_date,
                enrollment.maturity_date,
                enrollment.frequency,
                enrollment.contribution_amount,
                &verified_dates,
            ),
            enrollment,
            payments,
        })
    }

    pub async fn user_overviews(&self, admin: &User) -> Result<Vec<UserOverview>> {
        require_admin(admin)?;
        let users = self.stores.users.all().await?;
        let mut overviews = Vec::with_capacity(users.len());
        for user in users {
            let enrollments = self.stores.enrollments.for_user(user.id).await?;
            let payments = self.stores.payments.for_user(user.id).await?;
            overviews.push(UserOverview {
                enrollment_count: enrollments.len(),
                payment_count: payments.len(),
                total_contributed: sum_with_status(&payments, PaymentStatus::Verified),
                user,
            });
        }
        Ok(overviews)
    }

    /// Final state of every enrollment, sorted by member then plan.
    pub async fn enrollment_summaries(&self) -> Result<Vec<EnrollmentSummary>> {
        let mut summaries = Vec::new();
        for enrollment in self.stores.enrollments.all().await? {
            let user = self
                .stores
                .users
                .get(enrollment.user_id)
                .await?
                .ok_or_else(|| ClubError::NotFound(format!("user {}", enrollment.user_id)))?;
            let plan = self
                .stores
                .plans
                .get(enrollment.plan_id)
                .await?
                .ok_or_else(|| ClubError::NotFound(format!("plan {}", enrollment.plan_id)))?;
            let payments = self.stores.payments.for_enrollment(enrollment.id).await?;
            summaries.push(EnrollmentSummary {
                user: user.display_name().to_string(),
                plan: plan.name,
                frequency: enrollment.frequency,
                contributed: sum_with_status(&payments, PaymentStatus::Verified),
                payout: enrollment.payout_amount.value(),
                status: enrollment.status,
            });
        }
        summaries.sort_by(|a, b| (&a.user, &a.plan).cmp(&(&b.user, &b.plan)));
        Ok(summaries)
    }
}
