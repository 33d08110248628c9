//! Demo seeder for EventIQ development.
//!
//! Opens a conference budget, runs a handful of vendor expenses through the
//! approval flow, then prints the variance snapshot and forecast as JSON.
//!
//! Usage: cargo run --bin seeder

use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use eventiq_core::approval::{Actor, Role};
use eventiq_core::budget::{AllocationRequest, CategoryAllocation};
use eventiq_core::event::BudgetRegistry;
use eventiq_core::ledger::{ExpenseStatus, ExpenseSubmission};
use eventiq_core::notify::{Notification, NotificationSink, NotifyError};
use eventiq_shared::AppConfig;
use eventiq_shared::types::{EventId, UserId};

/// Demo split; the remaining 10% is contingency.
const CATEGORIES: [(&str, u32); 8] = [
    ("Venue & Technology Infrastructure", 28),
    ("Catering & Refreshments", 20),
    ("Speakers", 14),
    ("Audio Visual", 11),
    ("Marketing", 7),
    ("Staff & Security", 5),
    ("Materials", 3),
    ("Transportation", 2),
];

/// (category, vendor, amount, draw contingency)
const EXPENSES: [(&str, &str, u32, bool); 5] = [
    ("Catering & Refreshments", "Coffee Express", 2500, false),
    ("Audio Visual", "Tech Solutions", 1800, false),
    ("Staff & Security", "Security Plus", 3200, true),
    ("Materials", "Decorative Dreams", 1500, false),
    ("Marketing", "Print Pro", 1200, false),
];

/// Logs notifications instead of delivering them.
struct LogSink;

impl NotificationSink for LogSink {
    fn deliver(&self, notification: &Notification) -> Result<(), NotifyError> {
        info!(
            expense_id = %notification.expense_id,
            kind = %notification.kind,
            category = %notification.category,
            amount = %notification.amount,
            "Notification"
        );
        Ok(())
    }
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "eventiq=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::load()?;
    let registry = BudgetRegistry::from_config(&config)?;

    let organizer = Actor::new(UserId::new(), Role::Organizer);
    let manager = Actor::new(UserId::new(), Role::Manager);
    let start = Utc::now() - Duration::days(3);

    let budget = registry.open(
        EventId::new(),
        AllocationRequest {
            total_amount: Decimal::from(50_000),
            currency: "USD".to_string(),
            categories: CATEGORIES
                .iter()
                .map(|(name, percent)| CategoryAllocation::new(*name, Decimal::from(*percent)))
                .collect(),
            contingency_percent: Decimal::TEN,
            event_start: start,
            event_end: Some(start + Duration::days(14)),
        },
        organizer,
    )?;
    info!(event_id = %budget.event_id(), "Seeded demo event");

    for (category, vendor, amount, draw) in EXPENSES {
        let mut submission = ExpenseSubmission::new(category, Decimal::from(amount), vendor);
        if draw {
            submission = submission.drawing_contingency();
        }

        let mut expense = budget.submit(organizer, submission)?;
        if expense.status == ExpenseStatus::PendingApproval {
            expense = budget.approve(manager, expense.id)?;
        }
        let receipt = format!("rcpt-{}", vendor.to_lowercase().replace(' ', "-"));
        budget.post(organizer, expense.id, receipt)?;
    }

    let report = budget.dispatch_notifications(&LogSink);
    info!(delivered = report.delivered, failed = report.failures.len(), "Notifications dispatched");

    println!("{}", serde_json::to_string_pretty(&budget.snapshot(None)?)?);
    println!("{}", serde_json::to_string_pretty(&budget.forecast(None)?)?);

    Ok(())
}
