//! Exclusive owner of one event's budget state.
//!
//! Configuration, ledger and approval policy live behind a single
//! `parking_lot::RwLock`. Mutations take the write lock with a bounded wait,
//! so the capacity check and the status transition are one atomic step.
//! Reads take the read lock just long enough to clone a [`LedgerView`] and
//! compute outside it.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use eventiq_shared::types::{EventId, ExpenseId, PageRequest, PageResponse};
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, info, warn};

use super::clock::Clock;
use super::settings::EngineSettings;
use crate::approval::{Actor, ApprovalPolicy};
use crate::budget::{
    AllocationRequest, BudgetConfiguration, BudgetError, BudgetService, CategoryAllocation,
};
use crate::forecast::{ForecastEngine, ForecastReport};
use crate::ledger::{ExpenseFilter, ExpenseLedger, ExpenseRecord, ExpenseSubmission};
use crate::notify::{DispatchReport, Notification, NotificationOutbox, NotificationSink};
use crate::variance::{VarianceAnalyzer, VarianceSnapshot};

#[derive(Debug, Clone)]
struct BudgetState {
    config: BudgetConfiguration,
    ledger: ExpenseLedger,
    policy: ApprovalPolicy,
}

/// Consistent point-in-time copy of an event's budget state.
#[derive(Debug, Clone)]
pub struct LedgerView {
    /// Configuration at the time of the read.
    pub config: BudgetConfiguration,
    /// Ledger at the time of the read.
    pub ledger: ExpenseLedger,
    /// Approval policy at the time of the read.
    pub policy: ApprovalPolicy,
}

/// One event's budget, ledger and notification outbox.
pub struct EventBudget {
    event_id: EventId,
    state: RwLock<BudgetState>,
    outbox: NotificationOutbox,
    clock: Arc<dyn Clock>,
    lock_timeout: Duration,
    notification_retention: chrono::Duration,
    variance: VarianceAnalyzer,
    forecast: ForecastEngine,
}

impl EventBudget {
    /// Create the budget for an event.
    ///
    /// # Errors
    ///
    /// - `InsufficientRole` below organizer
    /// - `InvalidAllocation` for a malformed request
    pub fn create(
        event_id: EventId,
        request: AllocationRequest,
        actor: Actor,
        settings: &EngineSettings,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, BudgetError> {
        ApprovalPolicy::authorize_configuration(actor.role)?;
        let config = BudgetService::create(event_id, request, actor.user_id, clock.now())?;

        info!(
            event_id = %event_id,
            total = %config.total_amount,
            currency = %config.currency,
            categories = config.categories.len(),
            contingency_percent = %config.contingency_percent,
            "Budget created"
        );

        Ok(Self {
            event_id,
            state: RwLock::new(BudgetState {
                config,
                ledger: ExpenseLedger::new(),
                policy: settings.policy.clone(),
            }),
            outbox: NotificationOutbox::new(settings.notification_attempts),
            clock,
            lock_timeout: settings.lock_timeout,
            notification_retention: settings.notification_retention,
            variance: settings.variance,
            forecast: settings.forecast,
        })
    }

    /// Event this budget belongs to.
    #[must_use]
    pub fn event_id(&self) -> EventId {
        self.event_id
    }

    /// Replace every category allocation atomically.
    ///
    /// # Errors
    ///
    /// `InsufficientRole`, `BudgetLocked`, and everything `BudgetService::revise` returns.
    pub fn revise(
        &self,
        actor: Actor,
        categories: Vec<CategoryAllocation>,
    ) -> Result<BudgetConfiguration, BudgetError> {
        ApprovalPolicy::authorize_configuration(actor.role)?;
        let now = self.clock.now();
        let mut guard = self.write()?;
        let state = &mut *guard;

        let usage = state.ledger.category_usage();
        let revised = BudgetService::revise(&state.config, categories, &usage, now)
            .inspect_err(|e| self.rejected("revise", e))?;
        state.config = revised.clone();
        // a larger allocation may cover what was drawn from the pool
        state.ledger.rebalance_contingency(&state.config);

        info!(
            event_id = %self.event_id,
            revision = revised.revision,
            categories = revised.categories.len(),
            "Budget revised"
        );
        Ok(revised)
    }

    /// Archive the budget. It stays readable.
    ///
    /// # Errors
    ///
    /// `InsufficientRole`, `BudgetLocked`, `ConfigurationArchived`.
    pub fn archive(&self, actor: Actor) -> Result<BudgetConfiguration, BudgetError> {
        ApprovalPolicy::authorize_configuration(actor.role)?;
        let now = self.clock.now();
        let mut state = self.write()?;

        let archived = BudgetService::archive(&state.config, now)?;
        state.config = archived.clone();

        info!(event_id = %self.event_id, "Budget archived");
        Ok(archived)
    }

    /// Replace the approval policy for future submissions. Decided and pending
    /// expenses keep the requirement recorded at submission.
    ///
    /// # Errors
    ///
    /// `InsufficientRole`, `BudgetLocked`, `ConfigurationArchived`.
    pub fn update_policy(&self, actor: Actor, policy: ApprovalPolicy) -> Result<(), BudgetError> {
        ApprovalPolicy::authorize_configuration(actor.role)?;
        let mut state = self.write()?;
        state.config.ensure_active()?;
        state.policy = policy;

        info!(event_id = %self.event_id, "Approval policy updated");
        Ok(())
    }

    /// Submit an expense; see [`ExpenseLedger::submit`].
    ///
    /// # Errors
    ///
    /// `BudgetLocked` plus everything the ledger returns.
    pub fn submit(
        &self,
        actor: Actor,
        submission: ExpenseSubmission,
    ) -> Result<ExpenseRecord, BudgetError> {
        self.mutate("submit", actor, |state, now| {
            state
                .ledger
                .submit(&state.config, &state.policy, actor, submission, now)
                .cloned()
        })
    }

    /// Record a draft; see [`ExpenseLedger::create_draft`].
    ///
    /// # Errors
    ///
    /// `BudgetLocked` plus everything the ledger returns.
    pub fn create_draft(
        &self,
        actor: Actor,
        submission: ExpenseSubmission,
    ) -> Result<ExpenseRecord, BudgetError> {
        self.mutate("create_draft", actor, |state, now| {
            state
                .ledger
                .create_draft(&state.config, actor, submission, now)
                .cloned()
        })
    }

    /// Submit a draft; see [`ExpenseLedger::submit_draft`].
    ///
    /// # Errors
    ///
    /// `BudgetLocked` plus everything the ledger returns.
    pub fn submit_draft(&self, actor: Actor, id: ExpenseId) -> Result<ExpenseRecord, BudgetError> {
        self.mutate("submit_draft", actor, |state, now| {
            state
                .ledger
                .submit_draft(&state.config, &state.policy, actor, id, now)
                .cloned()
        })
    }

    /// Approve a pending expense; see [`ExpenseLedger::approve`].
    ///
    /// # Errors
    ///
    /// `BudgetLocked` plus everything the ledger returns.
    pub fn approve(&self, actor: Actor, id: ExpenseId) -> Result<ExpenseRecord, BudgetError> {
        self.mutate("approve", actor, |state, now| {
            state
                .ledger
                .approve(&state.config, &state.policy, actor, id, now)
                .cloned()
        })
    }

    /// Reject a pending expense; see [`ExpenseLedger::reject`].
    ///
    /// # Errors
    ///
    /// `BudgetLocked` plus everything the ledger returns.
    pub fn reject(
        &self,
        actor: Actor,
        id: ExpenseId,
        reason: impl Into<String>,
    ) -> Result<ExpenseRecord, BudgetError> {
        let reason = reason.into();
        self.mutate("reject", actor, |state, now| {
            state
                .ledger
                .reject(&state.config, &state.policy, actor, id, reason, now)
                .cloned()
        })
    }

    /// Post an approved expense; see [`ExpenseLedger::post`].
    ///
    /// # Errors
    ///
    /// `BudgetLocked` plus everything the ledger returns.
    pub fn post(
        &self,
        actor: Actor,
        id: ExpenseId,
        receipt_ref: impl Into<String>,
    ) -> Result<ExpenseRecord, BudgetError> {
        let receipt_ref = receipt_ref.into();
        self.mutate("post", actor, |state, now| {
            state
                .ledger
                .post(&state.config, actor, id, receipt_ref, now)
                .cloned()
        })
    }

    /// Point-in-time copy of the whole state.
    ///
    /// # Errors
    ///
    /// Returns `BudgetError::BudgetLocked` if a writer holds the lock too long.
    pub fn view(&self) -> Result<LedgerView, BudgetError> {
        let state = self.read()?;
        Ok(LedgerView {
            config: state.config.clone(),
            ledger: state.ledger.clone(),
            policy: state.policy.clone(),
        })
    }

    /// Current configuration.
    ///
    /// # Errors
    ///
    /// Returns `BudgetError::BudgetLocked` on lock timeout.
    pub fn configuration(&self) -> Result<BudgetConfiguration, BudgetError> {
        Ok(self.read()?.config.clone())
    }

    /// Variance for one category or all of them.
    ///
    /// # Errors
    ///
    /// `BudgetLocked`, `UnknownCategory`.
    pub fn snapshot(&self, category: Option<&str>) -> Result<VarianceSnapshot, BudgetError> {
        let view = self.view()?;
        self.variance.snapshot(&view.config, &view.ledger, category)
    }

    /// Spend forecast as of `as_of`, or now.
    ///
    /// # Errors
    ///
    /// `BudgetLocked`, `IndeterminateForecast`.
    pub fn forecast(&self, as_of: Option<DateTime<Utc>>) -> Result<ForecastReport, BudgetError> {
        let as_of = as_of.unwrap_or_else(|| self.clock.now());
        let view = self.view()?;
        self.forecast.project(&view.config, &view.ledger, as_of)
    }

    /// One expense.
    ///
    /// # Errors
    ///
    /// `BudgetLocked`, `ExpenseNotFound`.
    pub fn expense(&self, id: ExpenseId) -> Result<ExpenseRecord, BudgetError> {
        self.read()?.ledger.get(id).cloned()
    }

    /// Filtered page of expenses.
    ///
    /// # Errors
    ///
    /// Returns `BudgetError::BudgetLocked` on lock timeout.
    pub fn list_expenses(
        &self,
        filter: &ExpenseFilter,
        page: PageRequest,
    ) -> Result<PageResponse<ExpenseRecord>, BudgetError> {
        Ok(self.read()?.ledger.list(filter, page))
    }

    /// Deliver queued notifications, then drop delivered ones older than the
    /// retention period. Runs without the event lock.
    pub fn dispatch_notifications(&self, sink: &dyn NotificationSink) -> DispatchReport {
        let report = self.outbox.dispatch(sink);
        self.outbox.compact(self.clock.now() - self.notification_retention);
        report
    }

    /// The notification outbox.
    #[must_use]
    pub fn outbox(&self) -> &NotificationOutbox {
        &self.outbox
    }

    fn mutate<F>(
        &self,
        operation: &'static str,
        actor: Actor,
        f: F,
    ) -> Result<ExpenseRecord, BudgetError>
    where
        F: FnOnce(&mut BudgetState, DateTime<Utc>) -> Result<ExpenseRecord, BudgetError>,
    {
        let now = self.clock.now();
        let record = {
            let mut state = self.write()?;
            f(&mut *state, now).inspect_err(|e| self.rejected(operation, e))?
        };

        info!(
            event_id = %self.event_id,
            expense_id = %record.id,
            operation,
            category = %record.category_name,
            amount = %record.amount,
            status = %record.status,
            contingency_draw = %record.contingency_draw,
            actor = %actor.user_id,
            "Expense transition committed"
        );

        if let Some(notification) =
            Notification::for_record(self.event_id, &record, actor.user_id, now)
        {
            self.outbox.enqueue(notification);
        }
        Ok(record)
    }

    fn rejected(&self, operation: &'static str, error: &BudgetError) {
        match error {
            BudgetError::ExceedsAvailable {
                category,
                requested,
                available,
            } => warn!(
                event_id = %self.event_id,
                operation,
                category = %category,
                requested = %requested,
                available = %available,
                "Capacity check rejected expense"
            ),
            _ => debug!(
                event_id = %self.event_id,
                operation,
                error_code = error.error_code(),
                "Operation rejected"
            ),
        }
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, BudgetState>, BudgetError> {
        self.state.try_write_for(self.lock_timeout).ok_or_else(|| {
            warn!(
                event_id = %self.event_id,
                waited_ms = self.waited_ms(),
                "Budget write lock timed out"
            );
            BudgetError::BudgetLocked {
                waited_ms: self.waited_ms(),
            }
        })
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, BudgetState>, BudgetError> {
        self.state.try_read_for(self.lock_timeout).ok_or_else(|| {
            warn!(
                event_id = %self.event_id,
                waited_ms = self.waited_ms(),
                "Budget read lock timed out"
            );
            BudgetError::BudgetLocked {
                waited_ms: self.waited_ms(),
            }
        })
    }

    fn waited_ms(&self) -> u64 {
        u64::try_from(self.lock_timeout.as_millis()).unwrap_or(u64::MAX)
    }
}
