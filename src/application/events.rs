use crate::domain::enrollment::Enrollment;
use crate::domain::payment::Payment;
use crate::domain::plan::Plan;
use crate::domain::settings::SiteSettings;
use tokio::sync::broadcast;

/// Typed change feed published after every successful workflow mutation.
///
/// Each event carries the full row as committed; consumers replace their
/// local copy with the payload instead of merging.
#[derive(Debug, Clone)]
pub enum ChangeEvent {
    EnrollmentCreated(Enrollment),
    PaymentSubmitted(Payment),
    PaymentDecided(Payment),
    PayoutProcessed(Enrollment),
    PlanChanged(Plan),
    SettingsChanged(SiteSettings),
}

#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<ChangeEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.tx.subscribe()
    }

    /// Publishing with no live subscribers is not an error.
    pub fn publish(&self, event: ChangeEvent) {
        let _ = self.tx.send(event);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::settings::SiteSettings;
    use chrono::Utc;

    #[tokio::test]
    async fn test_subscribers_receive_published_events() {
        let bus = EventBus::default();
        let mut rx = bus.subscribe();

        bus.publish(ChangeEvent::SettingsChanged(SiteSettings::new(
            "GoPcrg",
            Utc::now(),
        )));

        match rx.recv().await.unwrap() {
            ChangeEvent::SettingsChanged(settings) => assert_eq!(settings.site_name, "GoPcrg"),
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn test_publish_without_subscribers_is_ok() {
        let bus = EventBus::default();
        bus.publish(ChangeEvent::SettingsChanged(SiteSettings::new(
            "GoPcrg",
            Utc::now(),
        )));
    }
}
