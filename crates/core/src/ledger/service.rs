//! The authoritative expense ledger for one event.
//!
//! Every mutation validates fully before touching a record, so a failed call
//! leaves the ledger exactly as it was. Callers serialize mutations per event;
//! see [`crate::event::EventBudget`].

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use eventiq_shared::types::{ExpenseId, PageRequest, PageResponse};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::capacity::Headroom;
use super::types::{ExpenseFilter, ExpenseRecord, ExpenseStatus, ExpenseSubmission};
use super::workflow::ExpenseWorkflow;
use crate::approval::{Actor, ApprovalPolicy, Role};
use crate::budget::{BudgetConfiguration, BudgetError, CategoryUsage, category_key};

/// Append-only list of expense records with an id index.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(from = "StoredLedger")]
pub struct ExpenseLedger {
    records: Vec<ExpenseRecord>,
    #[serde(skip)]
    index: HashMap<ExpenseId, usize>,
}

/// Serialized form; the index is rebuilt on load.
#[derive(Deserialize)]
struct StoredLedger {
    records: Vec<ExpenseRecord>,
}

impl From<StoredLedger> for ExpenseLedger {
    fn from(stored: StoredLedger) -> Self {
        let index = stored
            .records
            .iter()
            .enumerate()
            .map(|(i, r)| (r.id, i))
            .collect();
        Self {
            records: stored.records,
            index,
        }
    }
}

impl ExpenseLedger {
    /// Creates an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record and submit an expense in one step.
    ///
    /// The initial status comes from the approval policy: `Approved` within the
    /// submitter's threshold, `PendingApproval` otherwise. Both reserve capacity.
    ///
    /// # Errors
    ///
    /// - `ConfigurationArchived` if the budget is archived
    /// - `InvalidAmount` if the amount is not positive
    /// - `UnknownCategory` if the category is not configured
    /// - `UnknownRole` if the submitter's role has no threshold
    /// - `ExceedsAvailable` if the category (and pool, when requested) cannot cover it
    pub fn submit(
        &mut self,
        config: &BudgetConfiguration,
        policy: &ApprovalPolicy,
        actor: Actor,
        submission: ExpenseSubmission,
        now: DateTime<Utc>,
    ) -> Result<&ExpenseRecord, BudgetError> {
        let mut record = Self::draft_record(config, actor, submission, now)?;
        self.submit_record(config, policy, &mut record, now)?;
        Ok(self.push(record))
    }

    /// Record a draft. Drafts reserve nothing and are not yet seen by the policy.
    ///
    /// # Errors
    ///
    /// Same shape errors as [`Self::submit`], without the capacity check.
    pub fn create_draft(
        &mut self,
        config: &BudgetConfiguration,
        actor: Actor,
        submission: ExpenseSubmission,
        now: DateTime<Utc>,
    ) -> Result<&ExpenseRecord, BudgetError> {
        let record = Self::draft_record(config, actor, submission, now)?;
        Ok(self.push(record))
    }

    /// Submit an existing draft.
    ///
    /// Only the drafter or a manager may submit it. The policy is evaluated for
    /// the role the draft was recorded with.
    ///
    /// # Errors
    ///
    /// - `ExpenseNotFound` if the id is unknown
    /// - `InsufficientRole` if someone below manager submits another user's draft
    /// - `InvalidTransition` unless the expense is a draft
    /// - everything [`Self::submit`] can fail with
    pub fn submit_draft(
        &mut self,
        config: &BudgetConfiguration,
        policy: &ApprovalPolicy,
        actor: Actor,
        id: ExpenseId,
        now: DateTime<Utc>,
    ) -> Result<&ExpenseRecord, BudgetError> {
        let position = self.position(id)?;
        if actor.user_id != self.records[position].submitted_by && actor.role < Role::Manager {
            return Err(BudgetError::InsufficientRole {
                role: actor.role,
                required: Role::Manager,
            });
        }

        let mut record = self.records[position].clone();
        // category may have been renamed or dropped by a revision since drafting
        record.category_name = config
            .category(&record.category_name)
            .map(|c| c.name.clone())
            .ok_or_else(|| BudgetError::UnknownCategory(record.category_name.clone()))?;

        self.submit_record(config, policy, &mut record, now)?;
        self.records[position] = record;
        Ok(&self.records[position])
    }

    /// Approve a pending expense.
    ///
    /// # Errors
    ///
    /// - `ConfigurationArchived`, `ExpenseNotFound`
    /// - `InvalidTransition` unless pending
    /// - `InsufficientRole` if the actor may not decide this amount
    pub fn approve(
        &mut self,
        config: &BudgetConfiguration,
        policy: &ApprovalPolicy,
        actor: Actor,
        id: ExpenseId,
        now: DateTime<Utc>,
    ) -> Result<&ExpenseRecord, BudgetError> {
        config.ensure_active()?;
        let position = self.position(id)?;
        let record = &self.records[position];

        let action = ExpenseWorkflow::approve(record.status, actor.user_id, now)?;
        policy.authorize_decision(actor.role, record.amount)?;

        action.apply(&mut self.records[position]);
        Ok(&self.records[position])
    }

    /// Reject a pending expense, releasing its capacity.
    ///
    /// Contingency held by later expenses in the same category is handed back
    /// to the pool as far as the freed allocation covers it.
    ///
    /// # Errors
    ///
    /// - `ConfigurationArchived`, `ExpenseNotFound`
    /// - `InvalidTransition` unless pending
    /// - `RejectionReasonRequired` for a blank reason
    /// - `InsufficientRole` if the actor may not decide this amount
    pub fn reject(
        &mut self,
        config: &BudgetConfiguration,
        policy: &ApprovalPolicy,
        actor: Actor,
        id: ExpenseId,
        reason: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Result<&ExpenseRecord, BudgetError> {
        config.ensure_active()?;
        let position = self.position(id)?;
        let record = &self.records[position];

        let action = ExpenseWorkflow::reject(record.status, actor.user_id, reason.into(), now)?;
        policy.authorize_decision(actor.role, record.amount)?;

        action.apply(&mut self.records[position]);
        self.rebalance_contingency(config);
        Ok(&self.records[position])
    }

    /// Confirm payment of an approved expense.
    ///
    /// # Errors
    ///
    /// - `ConfigurationArchived`, `ExpenseNotFound`
    /// - `InvalidTransition` unless approved
    /// - `ReceiptRequired` for a blank receipt reference
    pub fn post(
        &mut self,
        config: &BudgetConfiguration,
        actor: Actor,
        id: ExpenseId,
        receipt_ref: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Result<&ExpenseRecord, BudgetError> {
        config.ensure_active()?;
        let position = self.position(id)?;

        let action = ExpenseWorkflow::post(
            self.records[position].status,
            actor.user_id,
            receipt_ref.into(),
            now,
        )?;

        action.apply(&mut self.records[position]);
        Ok(&self.records[position])
    }

    /// Look up one expense.
    ///
    /// # Errors
    ///
    /// Returns `BudgetError::ExpenseNotFound` if the id is unknown.
    pub fn get(&self, id: ExpenseId) -> Result<&ExpenseRecord, BudgetError> {
        self.position(id).map(|p| &self.records[p])
    }

    /// Filtered page of expenses, in submission order.
    #[must_use]
    pub fn list(&self, filter: &ExpenseFilter, page: PageRequest) -> PageResponse<ExpenseRecord> {
        let matching: Vec<_> = self
            .records
            .iter()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect();
        page.paginate(matching)
    }

    /// All records, in submission order.
    #[must_use]
    pub fn records(&self) -> &[ExpenseRecord] {
        &self.records
    }

    /// Number of records, drafts and rejections included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns true if nothing was ever recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Commitments per category, keyed by [`category_key`].
    #[must_use]
    pub fn category_usage(&self) -> BTreeMap<String, CategoryUsage> {
        let mut usage: BTreeMap<String, CategoryUsage> = BTreeMap::new();
        for record in self.records.iter().filter(|r| r.status.reserves_capacity()) {
            let entry = usage.entry(category_key(&record.category_name)).or_default();
            entry.live_count += 1;
            entry.reserved += record.amount;
            entry.contingency_drawn += record.contingency_draw;
            if record.status == ExpenseStatus::Posted {
                entry.posted_count += 1;
            }
        }
        usage
    }

    /// Commitments for one category.
    #[must_use]
    pub fn usage_for(&self, category: &str) -> CategoryUsage {
        self.category_usage()
            .remove(&category_key(category))
            .unwrap_or_default()
    }

    /// Contingency currently held by live expenses across all categories.
    #[must_use]
    pub fn contingency_drawn(&self) -> Decimal {
        self.records
            .iter()
            .filter(|r| r.status.reserves_capacity())
            .map(|r| r.contingency_draw)
            .sum()
    }

    /// Reassigns contingency draws so each category holds exactly its
    /// shortfall, `max(0, reserved - allocated)`.
    ///
    /// The shortfall is charged to the most recent live expenses that asked
    /// for contingency. Called after anything that frees or grows a category's
    /// own room (a rejection or a revision); draws never grow here.
    pub fn rebalance_contingency(&mut self, config: &BudgetConfiguration) {
        let usage = self.category_usage();
        let mut shortfall: HashMap<String, Decimal> = config
            .categories
            .iter()
            .map(|allocation| {
                let key = category_key(&allocation.name);
                let reserved = usage.get(&key).map_or(Decimal::ZERO, |u| u.reserved);
                let short = (reserved - config.allocation_amount(allocation)).max(Decimal::ZERO);
                (key, short)
            })
            .collect();

        for record in self
            .records
            .iter_mut()
            .rev()
            .filter(|r| r.status.reserves_capacity())
        {
            let left = shortfall.get_mut(&category_key(&record.category_name));
            record.contingency_draw = match left {
                Some(left) if record.draw_contingency_requested => {
                    let draw = record.amount.min(*left);
                    *left -= draw;
                    draw
                }
                _ => Decimal::ZERO,
            };
        }
    }

    fn draft_record(
        config: &BudgetConfiguration,
        actor: Actor,
        submission: ExpenseSubmission,
        now: DateTime<Utc>,
    ) -> Result<ExpenseRecord, BudgetError> {
        config.ensure_active()?;

        if submission.amount <= Decimal::ZERO {
            return Err(BudgetError::InvalidAmount(submission.amount));
        }

        let category = config.category(&submission.category_name).ok_or_else(|| {
            BudgetError::UnknownCategory(submission.category_name.trim().to_string())
        })?;

        Ok(ExpenseRecord {
            id: ExpenseId::new(),
            category_name: category.name.clone(),
            amount: submission.amount,
            vendor_ref: submission.vendor_ref,
            receipt_ref: submission.receipt_ref,
            description: submission.description,
            submitted_by: actor.user_id,
            submitter_role: actor.role,
            created_at: now,
            submitted_at: None,
            status: ExpenseStatus::Draft,
            draw_contingency_requested: submission.draw_contingency,
            required_approval: None,
            contingency_draw: Decimal::ZERO,
            approved_by: None,
            rejected_by: None,
            decided_at: None,
            rejection_reason: None,
            posted_by: None,
            posted_at: None,
        })
    }

    /// Capacity check and status assignment for a draft record. Pure until it
    /// succeeds; the caller stores the record afterwards.
    fn submit_record(
        &self,
        config: &BudgetConfiguration,
        policy: &ApprovalPolicy,
        record: &mut ExpenseRecord,
        now: DateTime<Utc>,
    ) -> Result<(), BudgetError> {
        config.ensure_active()?;

        let required = policy.required_approval(record.submitter_role, record.amount)?;
        let action = ExpenseWorkflow::submit(record.status, required, record.submitted_by, now)?;

        let headroom = Headroom::of(
            config,
            &record.category_name,
            &self.usage_for(&record.category_name),
            self.contingency_drawn(),
        )?;
        let draw = headroom.plan(
            &record.category_name,
            record.amount,
            record.draw_contingency_requested,
        )?;

        record.contingency_draw = draw;
        action.apply(record);
        Ok(())
    }

    fn push(&mut self, record: ExpenseRecord) -> &ExpenseRecord {
        let position = self.records.len();
        self.index.insert(record.id, position);
        self.records.push(record);
        &self.records[position]
    }

    fn position(&self, id: ExpenseId) -> Result<usize, BudgetError> {
        self.index
            .get(&id)
            .copied()
            .ok_or(BudgetError::ExpenseNotFound(id))
    }
}
