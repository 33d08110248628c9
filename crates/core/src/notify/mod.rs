//! Post-commit notifications.
//!
//! The ledger never calls out to a notification channel. Committed
//! transitions are queued here and delivered afterwards; a delivery failure
//! is reported and retried, never rolled back into the ledger.

pub mod outbox;
pub mod types;


pub use outbox::{
    DEFAULT_MAX_ATTEMPTS, DeliveryFailure, DispatchReport, NotificationOutbox, OutboxEntry,
};
pub use types::{Notification, NotificationKind, NotificationSink, NotifyError};
