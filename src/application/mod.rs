//! Application layer: the `ContributionEngine` workflows, the typed change
//! event bus, the notification feed, and the polling maturity watcher.

pub mod engine;
pub mod events;
pub mod notifications;
pub mod watcher;
