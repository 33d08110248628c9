//! At-least-once notification outbox.
//!
//! Entries are keyed by `(expense_id, kind)`, so enqueueing the same
//! transition twice is a no-op. Delivery happens outside any event lock.
//! Each key can only be produced by one committed transition, so delivered
//! entries can be compacted away without losing that guarantee.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use eventiq_shared::types::ExpenseId;
use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, info, warn};

use super::types::{Notification, NotificationKind, NotificationSink};

/// Default delivery attempts before an entry is abandoned.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Delivery state of one notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutboxEntry {
    /// The message.
    pub notification: Notification,
    /// Delivery attempts so far.
    pub attempts: u32,
    /// Set once the sink accepted it.
    pub delivered: bool,
    /// Error from the most recent failed attempt.
    pub last_error: Option<String>,
}

/// A delivery that failed during one dispatch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeliveryFailure {
    /// Expense the notification was about.
    pub expense_id: ExpenseId,
    /// Notification kind.
    pub kind: NotificationKind,
    /// Sink error.
    pub error: String,
    /// True once `max_attempts` is reached; the entry will not be retried.
    pub abandoned: bool,
}

/// Outcome of one dispatch pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DispatchReport {
    /// Notifications accepted by the sink.
    pub delivered: usize,
    /// Notifications the sink rejected.
    pub failures: Vec<DeliveryFailure>,
}

/// Notifications waiting to be delivered, per event.
#[derive(Debug)]
pub struct NotificationOutbox {
    entries: Mutex<BTreeMap<(ExpenseId, NotificationKind), OutboxEntry>>,
    max_attempts: u32,
}

impl Default for NotificationOutbox {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ATTEMPTS)
    }
}

impl NotificationOutbox {
    /// Creates an empty outbox. `max_attempts` is at least one.
    #[must_use]
    pub fn new(max_attempts: u32) -> Self {
        Self {
            entries: Mutex::new(BTreeMap::new()),
            max_attempts: max_attempts.max(1),
        }
    }

    /// Queues a notification. Returns false if the same transition was already queued.
    pub fn enqueue(&self, notification: Notification) -> bool {
        let key = (notification.expense_id, notification.kind);
        let mut entries = self.entries.lock();
        if entries.contains_key(&key) {
            return false;
        }
        entries.insert(
            key,
            OutboxEntry {
                notification,
                attempts: 0,
                delivered: false,
                last_error: None,
            },
        );
        true
    }

    /// Delivers every pending entry that still has attempts left.
    ///
    /// The lock is not held while the sink runs, so a slow channel never
    /// blocks enqueueing.
    pub fn dispatch(&self, sink: &dyn NotificationSink) -> DispatchReport {
        let pending: Vec<_> = {
            let entries = self.entries.lock();
            entries
                .iter()
                .filter(|(_, e)| !e.delivered && e.attempts < self.max_attempts)
                .map(|(key, e)| (*key, e.notification.clone()))
                .collect()
        };

        let mut report = DispatchReport::default();
        for (key, notification) in pending {
            let outcome = sink.deliver(&notification);

            let mut entries = self.entries.lock();
            let Some(entry) = entries.get_mut(&key) else {
                continue;
            };
            entry.attempts += 1;

            match outcome {
                Ok(()) => {
                    entry.delivered = true;
                    entry.last_error = None;
                    report.delivered += 1;
                }
                Err(e) => {
                    let abandoned = entry.attempts >= self.max_attempts;
                    warn!(
                        expense_id = %key.0,
                        kind = %key.1,
                        attempts = entry.attempts,
                        abandoned,
                        error = %e,
                        "Notification delivery failed"
                    );
                    entry.last_error = Some(e.to_string());
                    report.failures.push(DeliveryFailure {
                        expense_id: key.0,
                        kind: key.1,
                        error: e.to_string(),
                        abandoned,
                    });
                }
            }
        }

        if report.delivered > 0 {
            info!(
                delivered = report.delivered,
                failed = report.failures.len(),
                "Dispatched notifications"
            );
        }
        report
    }

    /// Drops delivered entries whose transition happened before `cutoff`.
    /// Undelivered and abandoned entries are kept. Returns how many were dropped.
    pub fn compact(&self, cutoff: DateTime<Utc>) -> usize {
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|_, e| !e.delivered || e.notification.occurred_at >= cutoff);
        let dropped = before - entries.len();

        if dropped > 0 {
            debug!(dropped, remaining = entries.len(), "Compacted notification outbox");
        }
        dropped
    }

    /// Notifications not yet delivered, abandoned ones included.
    #[must_use]
    pub fn undelivered(&self) -> Vec<OutboxEntry> {
        self.entries
            .lock()
            .values()
            .filter(|e| !e.delivered)
            .cloned()
            .collect()
    }

    /// Looks up one entry.
    #[must_use]
    pub fn entry(&self, expense_id: ExpenseId, kind: NotificationKind) -> Option<OutboxEntry> {
        self.entries.lock().get(&(expense_id, kind)).cloned()
    }

    /// Number of entries held, delivered ones not yet compacted included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Returns true if the outbox holds nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}
