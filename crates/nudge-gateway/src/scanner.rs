use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use nudge_store::ReminderStore;
use nudge_types::events::Notification;
use nudge_types::models::ReminderId;

use crate::registry::SubscriberRegistry;

pub const DEFAULT_SCAN_INTERVAL: Duration = Duration::from_secs(1);

/// Result of broadcasting one due reminder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Triggered {
    pub id: ReminderId,
    pub delivered: usize,
    pub failed: usize,
}

#[derive(Debug, Default)]
pub struct ScanReport {
    pub triggered: Vec<Triggered>,
}

impl ScanReport {
    pub fn is_empty(&self) -> bool {
        self.triggered.is_empty()
    }
}

/// Background task that fires due reminders.
///
/// Each tick takes every due reminder out of the store in one step, then
/// broadcasts them in ascending id order. Reminders are removed before
/// delivery, so a crash mid-cycle loses those notifications rather than
/// sending them twice.
pub struct Scanner {
    store: Arc<ReminderStore>,
    registry: SubscriberRegistry,
    interval: Duration,
}

impl Scanner {
    pub fn new(store: Arc<ReminderStore>, registry: SubscriberRegistry) -> Self {
        Self {
            store,
            registry,
            interval: DEFAULT_SCAN_INTERVAL,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Scan on every tick until `shutdown` is cancelled. A cycle already in
    /// progress finishes first; broadcasts only queue, so it never waits on
    /// a socket.
    pub async fn run(self, shutdown: CancellationToken) {
        let mut interval = tokio::time::interval(self.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!("Scanner started, checking every {:?}", self.interval);

        loop {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                _ = interval.tick() => {}
            }

            let report = self.scan_once(Utc::now()).await;
            if !report.is_empty() {
                debug!("Scan fired {} reminders: {:?}", report.triggered.len(), report.triggered);
            }
        }

        info!("Scanner stopped");
    }

    /// One scan cycle against a single reading of the clock.
    pub async fn scan_once(&self, now: DateTime<Utc>) -> ScanReport {
        let due = self.store.take_due(now);
        let mut report = ScanReport::default();

        for (id, reminder) in due {
            let notification = Notification::for_reminder(id, &reminder);
            let outcome = self.registry.broadcast(&notification.text).await;

            info!(
                "Reminder {} '{}' triggered: {} delivered, {} failed",
                notification.reminder_id,
                reminder.title,
                outcome.delivered(),
                outcome.failed()
            );
            report.triggered.push(Triggered {
                id,
                delivered: outcome.delivered(),
                failed: outcome.failed(),
            });
        }

        report
    }
}
