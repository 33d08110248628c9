//! Registry of event budgets.

use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use eventiq_shared::AppConfig;
use eventiq_shared::types::EventId;

use super::budget::EventBudget;
use super::clock::{Clock, SystemClock};
use super::settings::EngineSettings;
use crate::approval::Actor;
use crate::budget::{AllocationRequest, BudgetConfiguration, BudgetError};

/// Maps each event to its exclusive budget owner.
///
/// Events are independent: work on one never waits on another's lock.
pub struct BudgetRegistry {
    events: DashMap<EventId, Arc<EventBudget>>,
    settings: EngineSettings,
    clock: Arc<dyn Clock>,
}

impl BudgetRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new(settings: EngineSettings, clock: Arc<dyn Clock>) -> Self {
        Self {
            events: DashMap::new(),
            settings,
            clock,
        }
    }

    /// Creates an empty registry on the wall clock from configuration.
    ///
    /// # Errors
    ///
    /// Propagates settings errors.
    pub fn from_config(config: &AppConfig) -> Result<Self, BudgetError> {
        Ok(Self::new(
            EngineSettings::from_config(config)?,
            Arc::new(SystemClock),
        ))
    }

    /// Create the budget for a new event.
    ///
    /// # Errors
    ///
    /// - `EventAlreadyExists` if the event already has a budget
    /// - everything [`EventBudget::create`] returns
    pub fn open(
        &self,
        event_id: EventId,
        request: AllocationRequest,
        actor: Actor,
    ) -> Result<Arc<EventBudget>, BudgetError> {
        match self.events.entry(event_id) {
            Entry::Occupied(_) => Err(BudgetError::EventAlreadyExists(event_id)),
            Entry::Vacant(slot) => {
                let budget = Arc::new(EventBudget::create(
                    event_id,
                    request,
                    actor,
                    &self.settings,
                    Arc::clone(&self.clock),
                )?);
                slot.insert(Arc::clone(&budget));
                Ok(budget)
            }
        }
    }

    /// Look up an event's budget.
    ///
    /// # Errors
    ///
    /// Returns `BudgetError::EventNotFound` if the event has no budget.
    pub fn get(&self, event_id: EventId) -> Result<Arc<EventBudget>, BudgetError> {
        self.events
            .get(&event_id)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or(BudgetError::EventNotFound(event_id))
    }

    /// Archive an event's budget. Archived budgets stay registered and readable.
    ///
    /// # Errors
    ///
    /// `EventNotFound` plus everything [`EventBudget::archive`] returns.
    pub fn archive(
        &self,
        event_id: EventId,
        actor: Actor,
    ) -> Result<BudgetConfiguration, BudgetError> {
        self.get(event_id)?.archive(actor)
    }

    /// Registered event ids, sorted.
    #[must_use]
    pub fn event_ids(&self) -> Vec<EventId> {
        let mut ids: Vec<_> = self.events.iter().map(|entry| *entry.key()).collect();
        ids.sort();
        ids
    }

    /// Number of registered events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Returns true if no event is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}
