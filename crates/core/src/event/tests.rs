//! Tests for event ownership and the registry.

use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use eventiq_shared::AppConfig;
use eventiq_shared::types::{EventId, PageRequest, UserId};
use parking_lot::Mutex;
use rust_decimal_macros::dec;

use super::clock::FixedClock;
use super::registry::BudgetRegistry;
use super::settings::EngineSettings;
use crate::approval::{Actor, ApprovalPolicy, ApprovalThresholds, Role};
use crate::budget::{AllocationRequest, BudgetError, CategoryAllocation, ConfigurationStatus};
use crate::ledger::{ExpenseFilter, ExpenseStatus, ExpenseSubmission};
use crate::notify::{Notification, NotificationKind, NotificationSink, NotifyError};

fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 9, 1, 8, 0, 0).unwrap()
}

fn request() -> AllocationRequest {
    AllocationRequest {
        total_amount: dec!(50000),
        currency: "usd".to_string(),
        categories: vec![
            CategoryAllocation::new("Venue", dec!(30)),
            CategoryAllocation::new("Catering", dec!(20)),
        ],
        contingency_percent: dec!(10),
        event_start: start(),
        event_end: Some(start() + Duration::days(10)),
    }
}

fn registry(clock: Arc<FixedClock>) -> BudgetRegistry {
    let settings = EngineSettings::from_config(&AppConfig::default())
        .unwrap()
        .with_policy(ApprovalPolicy::new(
            ApprovalThresholds::new()
                .with(Role::Volunteer, dec!(100))
                .with(Role::Organizer, dec!(5000))
                .with(Role::Manager, dec!(20000)),
        ));
    BudgetRegistry::new(settings, clock)
}

fn organizer() -> Actor {
    Actor::new(UserId::new(), Role::Organizer)
}

fn manager() -> Actor {
    Actor::new(UserId::new(), Role::Manager)
}

#[derive(Default)]
struct RecordingSink {
    kinds: Mutex<Vec<NotificationKind>>,
}

impl NotificationSink for RecordingSink {
    fn deliver(&self, notification: &Notification) -> Result<(), NotifyError> {
        self.kinds.lock().push(notification.kind);
        Ok(())
    }
}

#[test]
fn test_open_get_and_duplicate() {
    let registry = registry(Arc::new(FixedClock::new(start())));
    let event_id = EventId::new();

    let budget = registry.open(event_id, request(), organizer()).unwrap();
    assert_eq!(budget.event_id(), event_id);
    assert_eq!(registry.len(), 1);
    assert_eq!(registry.event_ids(), vec![event_id]);

    assert!(matches!(
        registry.open(event_id, request(), organizer()),
        Err(BudgetError::EventAlreadyExists(id)) if id == event_id
    ));
    assert!(registry.get(event_id).is_ok());

    let missing = EventId::new();
    assert!(matches!(registry.get(missing), Err(BudgetError::EventNotFound(id)) if id == missing));
}

#[test]
fn test_open_requires_organizer() {
    let registry = registry(Arc::new(FixedClock::new(start())));

    let result = registry.open(
        EventId::new(),
        request(),
        Actor::new(UserId::new(), Role::Volunteer),
    );
    assert_eq!(
        result.err(),
        Some(BudgetError::InsufficientRole {
            role: Role::Volunteer,
            required: Role::Organizer,
        })
    );
    assert!(registry.is_empty());
}

#[test]
fn test_full_expense_lifecycle_with_notifications() {
    let clock = Arc::new(FixedClock::new(start()));
    let registry = registry(Arc::clone(&clock));
    let budget = registry.open(EventId::new(), request(), organizer()).unwrap();

    let pending = budget
        .submit(organizer(), ExpenseSubmission::new("Catering", dec!(9000), "Feast Co"))
        .unwrap();
    assert_eq!(pending.status, ExpenseStatus::PendingApproval);

    clock.advance(Duration::hours(3));
    let approved = budget.approve(manager(), pending.id).unwrap();
    assert_eq!(approved.decided_at, Some(start() + Duration::hours(3)));

    clock.advance(Duration::days(1));
    let posted = budget.post(organizer(), pending.id, "rcpt-42").unwrap();
    assert_eq!(posted.status, ExpenseStatus::Posted);

    let sink = RecordingSink::default();
    let report = budget.dispatch_notifications(&sink);
    assert_eq!(report.delivered, 3);
    let mut kinds = sink.kinds.lock().clone();
    kinds.sort();
    assert_eq!(
        kinds,
        vec![
            NotificationKind::ApprovalRequested,
            NotificationKind::Approved,
            NotificationKind::Posted,
        ]
    );

    let snapshot = budget.snapshot(Some("Catering")).unwrap();
    assert_eq!(snapshot.categories[0].posted_amount, dec!(9000));
    assert_eq!(snapshot.categories[0].remaining, dec!(1000));
}

#[test]
fn test_failed_operation_enqueues_nothing() {
    let registry = registry(Arc::new(FixedClock::new(start())));
    let budget = registry.open(EventId::new(), request(), organizer()).unwrap();

    let result = budget.submit(
        organizer(),
        ExpenseSubmission::new("Catering", dec!(10001), "Feast Co"),
    );
    assert!(matches!(result, Err(BudgetError::ExceedsAvailable { .. })));
    assert!(budget.outbox().is_empty());
    assert!(budget.view().unwrap().ledger.is_empty());
}

#[test]
fn test_revise_and_archive_through_registry() {
    let registry = registry(Arc::new(FixedClock::new(start())));
    let event_id = EventId::new();
    let budget = registry.open(event_id, request(), organizer()).unwrap();

    budget
        .submit(organizer(), ExpenseSubmission::new("Venue", dec!(4000), "Hall"))
        .unwrap();

    let locked = budget.revise(organizer(), vec![CategoryAllocation::new("Catering", dec!(40))]);
    assert!(matches!(locked, Err(BudgetError::AllocationLocked(_))));

    let revised = budget
        .revise(
            organizer(),
            vec![
                CategoryAllocation::new("Venue", dec!(20)),
                CategoryAllocation::new("Catering", dec!(40)),
            ],
        )
        .unwrap();
    assert_eq!(revised.revision, 1);
    assert_eq!(budget.configuration().unwrap().allocated_amount("Catering").unwrap(), dec!(20000));

    let archived = registry.archive(event_id, organizer()).unwrap();
    assert_eq!(archived.status, ConfigurationStatus::Archived);

    let result = budget.submit(organizer(), ExpenseSubmission::new("Venue", dec!(10), "Hall"));
    assert_eq!(result.unwrap_err(), BudgetError::ConfigurationArchived);
    // still readable
    assert!(budget.snapshot(None).is_ok());
}

#[test]
fn test_policy_update_applies_to_new_submissions_only() {
    let registry = registry(Arc::new(FixedClock::new(start())));
    let budget = registry.open(EventId::new(), request(), organizer()).unwrap();

    let before = budget
        .submit(organizer(), ExpenseSubmission::new("Venue", dec!(3000), "Hall"))
        .unwrap();
    assert_eq!(before.status, ExpenseStatus::Approved);

    budget
        .update_policy(
            organizer(),
            ApprovalPolicy::new(ApprovalThresholds::new().with(Role::Organizer, dec!(1000))),
        )
        .unwrap();

    let after = budget
        .submit(organizer(), ExpenseSubmission::new("Venue", dec!(3000), "Stage"))
        .unwrap();
    assert_eq!(after.status, ExpenseStatus::PendingApproval);
    assert_eq!(budget.expense(before.id).unwrap().status, ExpenseStatus::Approved);
}

#[test]
fn test_forecast_defaults_to_clock() {
    let clock = Arc::new(FixedClock::new(start()));
    let registry = registry(Arc::clone(&clock));
    let budget = registry.open(EventId::new(), request(), organizer()).unwrap();

    let report = budget.forecast(None).unwrap();
    assert!(report.low_confidence);
    assert_eq!(report.as_of, start());

    clock.advance(Duration::days(4));
    let report = budget.forecast(None).unwrap();
    assert!(!report.low_confidence);
    assert_eq!(report.elapsed_days, dec!(4));
}

#[test]
fn test_draft_flow_and_listing() {
    let registry = registry(Arc::new(FixedClock::new(start())));
    let budget = registry.open(EventId::new(), request(), organizer()).unwrap();
    let drafter = organizer();

    let draft = budget
        .create_draft(drafter, ExpenseSubmission::new("Venue", dec!(200), "Chairs"))
        .unwrap();
    assert_eq!(draft.status, ExpenseStatus::Draft);
    assert!(budget.outbox().is_empty());

    let submitted = budget.submit_draft(drafter, draft.id).unwrap();
    assert_eq!(submitted.status, ExpenseStatus::Approved);

    let page = budget
        .list_expenses(
            &ExpenseFilter {
                submitted_by: Some(drafter.user_id),
                ..ExpenseFilter::default()
            },
            PageRequest::default(),
        )
        .unwrap();
    assert_eq!(page.meta.total, 1);
    assert_eq!(page.data[0].id, draft.id);
}

#[test]
fn test_someone_elses_draft_needs_a_manager() {
    let registry = registry(Arc::new(FixedClock::new(start())));
    let budget = registry.open(EventId::new(), request(), organizer()).unwrap();
    let drafter = organizer();

    let draft = budget
        .create_draft(drafter, ExpenseSubmission::new("Venue", dec!(200), "Chairs"))
        .unwrap();

    let result = budget.submit_draft(organizer(), draft.id);
    assert!(matches!(
        result,
        Err(BudgetError::InsufficientRole {
            required: Role::Manager,
            ..
        })
    ));
    assert!(budget.outbox().is_empty());

    let submitted = budget.submit_draft(manager(), draft.id).unwrap();
    assert_eq!(submitted.submitted_by, drafter.user_id);
}

#[test]
fn test_revision_hands_contingency_back() {
    let registry = registry(Arc::new(FixedClock::new(start())));
    let budget = registry.open(EventId::new(), request(), organizer()).unwrap();

    budget
        .submit(manager(), ExpenseSubmission::new("Catering", dec!(10000), "Feast Co"))
        .unwrap();
    let extra = budget
        .submit(
            organizer(),
            ExpenseSubmission::new("Catering", dec!(1000), "Bar").drawing_contingency(),
        )
        .unwrap();
    assert_eq!(extra.contingency_draw, dec!(1000));
    assert_eq!(
        budget.snapshot(None).unwrap().summary.contingency_remaining,
        dec!(4000)
    );

    budget
        .revise(
            organizer(),
            vec![
                CategoryAllocation::new("Venue", dec!(30)),
                CategoryAllocation::new("Catering", dec!(25)),
            ],
        )
        .unwrap();

    assert_eq!(budget.expense(extra.id).unwrap().contingency_draw, dec!(0));
    let snapshot = budget.snapshot(Some("Catering")).unwrap();
    assert_eq!(snapshot.categories[0].contingency_drawn, dec!(0));
    assert_eq!(snapshot.categories[0].remaining, dec!(1500));
    assert_eq!(snapshot.summary.contingency_remaining, dec!(5000));
}

#[test]
fn test_dispatch_compacts_old_deliveries() {
    let clock = Arc::new(FixedClock::new(start()));
    let registry = registry(Arc::clone(&clock));
    let budget = registry.open(EventId::new(), request(), organizer()).unwrap();

    budget
        .submit(organizer(), ExpenseSubmission::new("Catering", dec!(9000), "Feast Co"))
        .unwrap();
    let sink = RecordingSink::default();
    assert_eq!(budget.dispatch_notifications(&sink).delivered, 1);
    assert_eq!(budget.outbox().len(), 1);

    clock.advance(Duration::days(2));
    assert_eq!(budget.dispatch_notifications(&sink).delivered, 0);
    assert!(budget.outbox().is_empty());
    assert_eq!(sink.kinds.lock().len(), 1);
}
