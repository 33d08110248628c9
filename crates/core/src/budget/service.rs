//! Budget configuration validation and lifecycle.

use std::collections::{BTreeMap, HashSet};
use std::str::FromStr;

use chrono::{DateTime, Utc};
use eventiq_shared::types::{Currency, EventId, UserId};
use rust_decimal::Decimal;

use super::error::BudgetError;
use super::types::{
    AllocationRequest, BudgetConfiguration, CategoryAllocation, CategoryUsage,
    ConfigurationStatus, category_key,
};

/// Stateless service for creating, revising and archiving configurations.
///
/// Nothing here is partially applied: each call either returns a complete
/// new configuration or an error, leaving the input untouched.
pub struct BudgetService;

impl BudgetService {
    /// Validate an allocation request and build the configuration.
    ///
    /// # Errors
    ///
    /// Returns `BudgetError::InvalidAllocation` if the total is not positive or too
    /// large to take percentages of, the currency is unknown, any percentage is
    /// negative or above 100, category names are empty or duplicated, percentages
    /// plus contingency exceed 100, or the event ends before it starts.
    pub fn create(
        event_id: EventId,
        request: AllocationRequest,
        created_by: UserId,
        now: DateTime<Utc>,
    ) -> Result<BudgetConfiguration, BudgetError> {
        if request.total_amount <= Decimal::ZERO {
            return Err(BudgetError::InvalidAllocation(format!(
                "total amount must be positive, got {}",
                request.total_amount
            )));
        }
        // every derived amount is total * percent / 100 with percent <= 100
        if request.total_amount.checked_mul(Decimal::ONE_HUNDRED).is_none() {
            return Err(BudgetError::InvalidAllocation(format!(
                "total amount {} is too large",
                request.total_amount
            )));
        }

        let currency =
            Currency::from_str(&request.currency).map_err(BudgetError::InvalidAllocation)?;
        Self::validate_percent("contingency", request.contingency_percent)?;
        let categories =
            Self::validate_categories(request.categories, request.contingency_percent)?;

        if let Some(end) = request.event_end
            && end <= request.event_start
        {
            return Err(BudgetError::InvalidAllocation(format!(
                "event end {end} must be after event start {}",
                request.event_start
            )));
        }

        Ok(BudgetConfiguration {
            event_id,
            total_amount: request.total_amount,
            currency,
            contingency_percent: request.contingency_percent,
            categories,
            event_start: request.event_start,
            event_end: request.event_end,
            status: ConfigurationStatus::Active,
            revision: 0,
            created_by,
            created_at: now,
            updated_at: now,
        })
    }

    /// Replace every category allocation at once.
    ///
    /// `usage` is keyed by [`category_key`] and describes what the ledger has
    /// already committed per category.
    ///
    /// # Errors
    ///
    /// - `ConfigurationArchived` if the configuration is archived
    /// - `AllocationLocked` if the event has ended, if a category with live or posted
    ///   expenses is dropped, or if a category's new allocation plus its contingency
    ///   draw no longer covers what it has reserved
    /// - `InvalidAllocation` for the same shape errors as `create`
    pub fn revise(
        current: &BudgetConfiguration,
        new_categories: Vec<CategoryAllocation>,
        usage: &BTreeMap<String, CategoryUsage>,
        now: DateTime<Utc>,
    ) -> Result<BudgetConfiguration, BudgetError> {
        current.ensure_active()?;

        if let Some(end) = current.event_end
            && now >= end
        {
            return Err(BudgetError::AllocationLocked(format!(
                "event ended at {end}; allocations can no longer be revised"
            )));
        }

        let categories = Self::validate_categories(new_categories, current.contingency_percent)?;

        let mut revised = current.clone();
        revised.categories = categories;

        for (key, used) in usage {
            if used.live_count == 0 {
                continue;
            }

            let Some(category) = revised.categories.iter().find(|c| category_key(&c.name) == *key)
            else {
                let kind = if used.posted_count > 0 { "posted" } else { "live" };
                return Err(BudgetError::AllocationLocked(format!(
                    "category {key} has {kind} expenses and cannot be removed"
                )));
            };

            let allocated = revised.allocated_amount(&category.name)?;
            if allocated + used.contingency_drawn < used.reserved {
                return Err(BudgetError::AllocationLocked(format!(
                    "category {} already has {} committed, new allocation {allocated} is too small",
                    category.name, used.reserved
                )));
            }
        }

        revised.revision += 1;
        revised.updated_at = now;
        Ok(revised)
    }

    /// Archive a configuration. Archived budgets stay readable but reject mutations.
    ///
    /// # Errors
    ///
    /// Returns `BudgetError::ConfigurationArchived` if already archived.
    pub fn archive(
        current: &BudgetConfiguration,
        now: DateTime<Utc>,
    ) -> Result<BudgetConfiguration, BudgetError> {
        current.ensure_active()?;

        let mut archived = current.clone();
        archived.status = ConfigurationStatus::Archived;
        archived.updated_at = now;
        Ok(archived)
    }

    /// Normalize and validate a category list against a contingency percent.
    ///
    /// # Errors
    ///
    /// Returns `BudgetError::InvalidAllocation` on empty or duplicate names,
    /// out-of-range percentages, or a total above 100.
    pub fn validate_categories(
        categories: Vec<CategoryAllocation>,
        contingency_percent: Decimal,
    ) -> Result<Vec<CategoryAllocation>, BudgetError> {
        let mut seen = HashSet::with_capacity(categories.len());
        let mut normalized = Vec::with_capacity(categories.len());
        let mut total = contingency_percent;

        for category in categories {
            let name = category.name.trim().to_string();
            if name.is_empty() {
                return Err(BudgetError::InvalidAllocation(
                    "category name cannot be empty".to_string(),
                ));
            }
            if !seen.insert(category_key(&name)) {
                return Err(BudgetError::InvalidAllocation(format!(
                    "duplicate category name: {name}"
                )));
            }
            Self::validate_percent(&name, category.allocated_percent)?;

            total += category.allocated_percent;
            normalized.push(CategoryAllocation {
                name,
                allocated_percent: category.allocated_percent,
            });
        }

        if total > Decimal::ONE_HUNDRED {
            return Err(BudgetError::InvalidAllocation(format!(
                "categories plus contingency total {total}%, must not exceed 100%"
            )));
        }

        Ok(normalized)
    }

    fn validate_percent(label: &str, percent: Decimal) -> Result<(), BudgetError> {
        if percent < Decimal::ZERO || percent > Decimal::ONE_HUNDRED {
            return Err(BudgetError::InvalidAllocation(format!(
                "{label} percent must be between 0 and 100, got {percent}"
            )));
        }
        Ok(())
    }
}
