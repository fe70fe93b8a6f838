//! Fixed-interval maturity poller.
//!
//! Mirrors the client-side refreshers: the feed re-polls every five minutes
//! and maturity alerts are checked hourly. Each tick is an independent
//! read-only query; overlapping ticks are not deduplicated.

use crate::application::notifications::{MaturityAlert, maturity_alerts};
use crate::domain::ports::{ClockBox, EnrollmentStoreBox, PlanStoreBox};
use crate::error::Result;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use uuid::Uuid;

pub const FEED_REFRESH_INTERVAL: Duration = Duration::from_secs(5 * 60);
pub const MATURITY_CHECK_INTERVAL: Duration = Duration::from_secs(60 * 60);

/// Polls one member's active enrollments and pushes due maturity alerts
/// over a channel.
pub struct MaturityWatcher {
    enrollments: EnrollmentStoreBox,
    plans: PlanStoreBox,
    clock: ClockBox,
    user_id: Uuid,
    interval: Duration,
}

impl MaturityWatcher {
    pub fn new(
        enrollments: EnrollmentStoreBox,
        plans: PlanStoreBox,
        clock: ClockBox,
        user_id: Uuid,
    ) -> Self {
        Self {
            enrollments,
            plans,
            clock,
            user_id,
            interval: MATURITY_CHECK_INTERVAL,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// One poll: fetch enrollments and compute the alerts due right now.
    pub async fn check(&self) -> Result<Vec<MaturityAlert>> {
        let enrollments = self.enrollments.for_user(self.user_id).await?;
        let mut plan_names = HashMap::new();
        for enrollment in &enrollments {
            if let Some(plan) = self.plans.get(enrollment.plan_id).await? {
                plan_names.insert(plan.id, plan.name);
            }
        }
        Ok(maturity_alerts(&enrollments, &plan_names, self.clock.now()))
    }

    /// Runs the poll loop until the receiver is dropped. The first check
    /// happens immediately.
    pub fn spawn(self, tx: mpsc::Sender<MaturityAlert>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.interval);
            loop {
                ticker.tick().await;
                match self.check().await {
                    Ok(alerts) => {
                        for alert in alerts {
                            if tx.send(alert).await.is_err() {
                                return;
                            }
                        }
                    }
                    Err(err) => tracing::warn!(error = %err, "maturity check failed"),
                }
            }
        })
    }
}
