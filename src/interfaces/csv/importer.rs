use crate::application::engine::{ContributionEngine, EnrollmentSummary};
use crate::domain::enrollment::EnrollmentStatus;
use crate::domain::money::Amount;
use crate::domain::payment::{Decision, PaymentMethod, PaymentStatus};
use crate::domain::plan::Plan;
use crate::domain::user::{Role, User};
use crate::error::{ClubError, Result};
use crate::infrastructure::clock::ManualClock;
use crate::interfaces::csv::op_reader::{OpReader, OpRecord, OpType};
use crate::interfaces::text;
use chrono::{DateTime, TimeDelta, Utc};
use std::collections::HashMap;
use std::io::Read;
use uuid::Uuid;

const IMPORT_ADMIN_EMAIL: &str = "admin@club.local";

/// Replays an operations CSV through the engine.
///
/// Rows refer to plans, methods and members by name; the importer keeps the
/// name-to-id mapping as it creates them. The `date` column drives the
/// shared clock forward, so maturity arithmetic sees the dates the script
/// describes rather than wall time.
pub struct BatchImporter {
    engine: ContributionEngine,
    clock: ManualClock,
    admin: Option<User>,
    plans: HashMap<String, Plan>,
    methods: HashMap<String, PaymentMethod>,
    users: HashMap<String, User>,
    // (user, plan) -> enrollment; re-enrolling overwrites, last one wins
    enrollments: HashMap<(Uuid, Uuid), Uuid>,
    default_method: Option<Uuid>,
    last_date: Option<DateTime<Utc>>,
}

fn require<'a, T>(field: &'a Option<T>, name: &str) -> Result<&'a T> {
    field
        .as_ref()
        .ok_or_else(|| ClubError::Validation(format!("missing required column '{name}'")))
}

impl BatchImporter {
    pub fn new(engine: ContributionEngine, clock: ManualClock) -> Self {
        Self {
            engine,
            clock,
            admin: None,
            plans: HashMap::new(),
            methods: HashMap::new(),
            users: HashMap::new(),
            enrollments: HashMap::new(),
            default_method: None,
            last_date: None,
        }
    }

    pub fn engine(&self) -> &ContributionEngine {
        &self.engine
    }

    /// Applies every operation in order and returns the final per-enrollment
    /// summary. Rows that fail to parse are skipped with a warning; a row
    /// that parses but cannot be applied aborts the run.
    pub async fn run<R: Read>(&mut self, reader: OpReader<R>) -> Result<Vec<EnrollmentSummary>> {
        for (idx, row) in reader.ops().enumerate() {
            let line = idx + 2; // header is line 1
            match row {
                Err(e) => {
                    tracing::warn!(line, error = %e, "skipping malformed row");
                }
                Ok(row) => {
                    self.apply(&row)
                        .await
                        .map_err(|e| ClubError::Validation(format!("line {line}: {e}")))?;
                }
            }
        }
        self.engine.enrollment_summaries().await
    }

    async fn apply(&mut self, row: &OpRecord) -> Result<()> {
        // A repeated pay row on one date ticks the clock one second forward,
        // so same-day submissions keep a strict order and "latest pending"
        // is deterministic. Other ops stay at midnight.
        if let Some(at) = row.timestamp()? {
            if self.last_date == Some(at) {
                if row.op == OpType::Pay {
                    self.clock.advance(TimeDelta::seconds(1));
                }
            } else {
                self.clock.set(at);
                self.last_date = Some(at);
            }
        }
        match row.op {
            OpType::CreatePlan => self.create_plan(row).await,
            OpType::CreateMethod => self.create_method(row).await,
            OpType::Enroll => self.enroll(row).await,
            OpType::Pay => self.pay(row).await,
            OpType::Verify => self.decide(row, Decision::Verify).await,
            OpType::Reject => self.decide(row, Decision::Reject).await,
            OpType::Payout => self.payout(row).await,
        }
    }

    async fn admin(&mut self) -> Result<User> {
        if let Some(admin) = &self.admin {
            return Ok(admin.clone());
        }
        let admin = self
            .engine
            .create_user(IMPORT_ADMIN_EMAIL, None, Role::Admin)
            .await?;
        self.admin = Some(admin.clone());
        Ok(admin)
    }

    async fn member(&mut self, email: &str) -> Result<User> {
        if let Some(user) = self.users.get(email) {
            return Ok(user.clone());
        }
        let user = self.engine.create_user(email, None, Role::User).await?;
        self.users.insert(email.to_string(), user.clone());
        Ok(user)
    }

    fn plan(&self, name: &str) -> Result<&Plan> {
        self.plans
            .get(name)
            .ok_or_else(|| ClubError::NotFound(format!("plan '{name}'")))
    }

    fn enrollment(&self, user: &User, plan: &Plan) -> Result<Uuid> {
        self.enrollments
            .get(&(user.id, plan.id))
            .copied()
            .ok_or_else(|| {
                ClubError::NotFound(format!(
                    "enrollment of {} in '{}'",
                    user.email, plan.name
                ))
            })
    }

    async fn create_plan(&mut self, row: &OpRecord) -> Result<()> {
        let admin = self.admin().await?;
        let name = require(&row.plan, "plan")?;
        let frequency = *require(&row.frequency, "frequency")?;
        let amount = Amount::new(*require(&row.amount, "amount")?)?;
        let slots = row.slots.unwrap_or(50);
        let plan = self
            .engine
            .create_plan(&admin, name, amount, frequency, slots, slots)
            .await?;
        self.plans.insert(name.clone(), plan);
        Ok(())
    }

    async fn create_method(&mut self, row: &OpRecord) -> Result<()> {
        let admin = self.admin().await?;
        let name = require(&row.method, "method")?;
        let account = row.note.as_deref().unwrap_or("N/A");
        let method = self
            .engine
            .create_payment_method(&admin, name, account, None)
            .await?;
        self.default_method.get_or_insert(method.id);
        self.methods.insert(name.clone(), method);
        Ok(())
    }

    async fn enroll(&mut self, row: &OpRecord) -> Result<()> {
        let user = self.member(require(&row.user, "user")?).await?;
        let plan = self.plan(require(&row.plan, "plan")?)?.clone();
        let frequency = row.frequency.unwrap_or(plan.frequency);
        let enrollment = self.engine.enroll(user.id, plan.id, frequency).await?;
        self.enrollments.insert((user.id, plan.id), enrollment.id);
        Ok(())
    }

    async fn pay(&mut self, row: &OpRecord) -> Result<()> {
        let user = self.member(require(&row.user, "user")?).await?;
        let plan = self.plan(require(&row.plan, "plan")?)?.clone();
        let enrollment_id = self.enrollment(&user, &plan)?;
        let amount = match row.amount {
            Some(value) => Amount::new(value)?,
            None => plan.contribution_amount,
        };
        let method_id = match &row.method {
            Some(name) => {
                self.methods
                    .get(name)
                    .ok_or_else(|| ClubError::NotFound(format!("payment method '{name}'")))?
                    .id
            }
            None => self
                .default_method
                .ok_or_else(|| ClubError::Validation("no payment method created yet".to_string()))?,
        };
        let proof = row.proof.as_deref().unwrap_or("proof");
        self.engine
            .submit_payment(enrollment_id, amount, proof.as_bytes(), "png", method_id)
            .await?;
        Ok(())
    }

    async fn decide(&mut self, row: &OpRecord, decision: Decision) -> Result<()> {
        let admin = self.admin().await?;
        let user = self.member(require(&row.user, "user")?).await?;
        let plan = self.plan(require(&row.plan, "plan")?)?.clone();
        let enrollment_id = self.enrollment(&user, &plan)?;
        // pending list is newest first, so the first match is the latest
        // submission for this enrollment
        let payment = self
            .engine
            .payments_for_review(&admin, PaymentStatus::Pending)
            .await?
            .into_iter()
            .find(|p| p.enrollment_id == enrollment_id)
            .ok_or_else(|| {
                ClubError::NotFound(format!(
                    "pending payment for {} in '{}'",
                    user.email, plan.name
                ))
            })?;
        self.engine
            .decide_payment(payment.id, decision, row.note.as_deref(), &admin)
            .await?;
        Ok(())
    }

    async fn payout(&mut self, row: &OpRecord) -> Result<()> {
        let admin = self.admin().await?;
        let user = self.member(require(&row.user, "user")?).await?;
        let plan = self.plan(require(&row.plan, "plan")?)?.clone();
        let enrollment_id = self.enrollment(&user, &plan)?;
        self.engine
            .process_payout(enrollment_id, row.note.as_deref(), &admin)
            .await?;
        Ok(())
    }

    /// Renders a text receipt for every VERIFIED payment, sorted by member
    /// then payment date.
    pub async fn receipts(&mut self) -> Result<Vec<String>> {
        let admin = self.admin().await?;
        let users_by_id: HashMap<Uuid, &User> =
            self.users.values().map(|u| (u.id, u)).collect();
        let plan_by_enrollment: HashMap<Uuid, &Plan> = self
            .enrollments
            .iter()
            .filter_map(|((_, plan_id), enr_id)| {
                self.plans
                    .values()
                    .find(|p| p.id == *plan_id)
                    .map(|p| (*enr_id, p))
            })
            .collect();
        let method_names: HashMap<Uuid, &str> = self
            .methods
            .values()
            .map(|m| (m.id, m.name.as_str()))
            .collect();

        let mut payments = self
            .engine
            .payments_for_review(&admin, PaymentStatus::Verified)
            .await?;
        payments.sort_by_key(|p| (p.user_id, p.payment_date));

        let mut out = Vec::with_capacity(payments.len());
        for payment in &payments {
            let member = users_by_id
                .get(&payment.user_id)
                .ok_or_else(|| ClubError::NotFound(format!("user {}", payment.user_id)))?;
            let plan = plan_by_enrollment
                .get(&payment.enrollment_id)
                .ok_or_else(|| ClubError::NotFound(format!("enrollment {}", payment.enrollment_id)))?;
            let method = method_names
                .get(&payment.payment_method_id)
                .copied()
                .unwrap_or("unknown");
            out.push(text::render_receipt(payment, member, &plan.name, method));
        }
        Ok(out)
    }

    /// Renders a maturity certificate for every PAID enrollment, sorted by
    /// member then plan.
    pub async fn certificates(&self) -> Result<Vec<String>> {
        let mut keys: Vec<(&String, &User)> = Vec::new();
        for user in self.users.values() {
            for plan_name in self.plans.keys() {
                keys.push((plan_name, user));
            }
        }
        keys.sort_by(|a, b| (&a.1.email, a.0).cmp(&(&b.1.email, b.0)));

        let mut out = Vec::new();
        for (plan_name, user) in keys {
            let plan = self.plan(plan_name)?;
            let Some(enrollment_id) = self.enrollments.get(&(user.id, plan.id)) else {
                continue;
            };
            let detail = self.engine.enrollment_detail(*enrollment_id, user.id).await?;
            if detail.enrollment.status == EnrollmentStatus::Paid {
                out.push(text::render_certificate(&detail.enrollment, user, plan_name));
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::engine::Stores;
    use crate::domain::ports::SettingsStore;
    use crate::domain::settings::MaturitySettings;
    use crate::infrastructure::in_memory::{
        InMemoryEnrollmentStore, InMemoryPaymentMethodStore, InMemoryPaymentStore,
        InMemoryPlanStore, InMemoryProofStore, InMemorySettingsStore, InMemoryUserStore,
    };
    use chrono::{TimeZone, Utc};

    async fn importer() -> BatchImporter {
        let clock = ManualClock::at(Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap());
        let settings = InMemorySettingsStore::new();
        settings
            .set_maturity(MaturitySettings::default())
            .await
            .unwrap();
        let stores = Stores {
            plans: Box::new(InMemoryPlanStore::new()),
            enrollments: Box::new(InMemoryEnrollmentStore::new()),
            payments: Box::new(InMemoryPaymentStore::new()),
            methods: Box::new(InMemoryPaymentMethodStore::new()),
            users: Box::new(InMemoryUserStore::new()),
            settings: Box::new(settings),
            proofs: Box::new(InMemoryProofStore::new()),
        };
        let engine = ContributionEngine::new(stores, Box::new(clock.clone()));
        BatchImporter::new(engine, clock)
    }

    #[tokio::test]
    async fn test_full_cycle_script() {
        let script = "\
op,date,user,plan,frequency,amount,method,proof,slots,note
create-plan,2025-01-01,,Starter,daily,100,,,50,
create-method,2025-01-01,,,,,Bank Transfer,,,ACC-001
enroll,2025-01-02,alice@example.com,Starter,,,,,,
pay,2025-01-03,alice@example.com,Starter,,,Bank Transfer,shot.png,,
verify,2025-01-04,alice@example.com,Starter,,,,,,
payout,2025-02-10,alice@example.com,Starter,,,,,,Early payout
";
        let mut importer = importer().await;
        let summaries = importer.run(OpReader::new(script.as_bytes())).await.unwrap();

        assert_eq!(summaries.len(), 1);
        let row = &summaries[0];
        assert_eq!(row.user, "alice@example.com");
        assert_eq!(row.plan, "Starter");
        assert_eq!(row.contributed, rust_decimal_macros::dec!(100));
        assert_eq!(row.payout, rust_decimal_macros::dec!(5000));
        assert_eq!(row.status, EnrollmentStatus::Paid);

        let certificates = importer.certificates().await.unwrap();
        assert_eq!(certificates.len(), 1);
        assert!(certificates[0].contains("alice@example.com"));

        let receipts = importer.receipts().await.unwrap();
        assert_eq!(receipts.len(), 1);
        assert!(receipts[0].contains("Bank Transfer"));
    }

    #[tokio::test]
    async fn test_payout_before_maturity_fails_with_line() {
        let script = "\
op,date,user,plan,frequency,amount,method,proof,slots,note
create-plan,2025-01-01,,Starter,daily,100,,,50,
enroll,2025-01-02,alice@example.com,Starter,,,,,,
payout,2025-01-10,alice@example.com,Starter,,,,,,
";
        let mut importer = importer().await;
        let err = importer
            .run(OpReader::new(script.as_bytes()))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("line 4"));
        assert!(err.to_string().contains("not matured"));
    }

    #[tokio::test]
    async fn test_same_date_rows_decide_the_latest_submission() {
        // Two submissions on one date: verify must hit the second one.
        let script = "\
op,date,user,plan,frequency,amount,method,proof,slots,note
create-plan,2025-01-01,,Starter,daily,100,,,50,
create-method,2025-01-01,,,,,Bank Transfer,,,ACC-001
enroll,2025-01-02,alice@example.com,Starter,,,,,,
pay,2025-01-03,alice@example.com,Starter,,40,Bank Transfer,first.png,,
pay,2025-01-03,alice@example.com,Starter,,60,Bank Transfer,second.png,,
verify,2025-01-04,alice@example.com,Starter,,,,,,
";
        let mut importer = importer().await;
        let summaries = importer.run(OpReader::new(script.as_bytes())).await.unwrap();

        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].contributed, rust_decimal_macros::dec!(60));
    }

    #[tokio::test]
    async fn test_malformed_rows_are_skipped() {
        let script = "\
op,date,user,plan,frequency,amount,method,proof,slots,note
create-plan,2025-01-01,,Starter,daily,100,,,50,
warp,2025-01-01,,,,,,,,
enroll,2025-01-02,alice@example.com,Starter,,,,,,
";
        let mut importer = importer().await;
        let summaries = importer.run(OpReader::new(script.as_bytes())).await.unwrap();
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].status, EnrollmentStatus::Active);
    }
}
