//! In-memory append-only ledger.
//!
//! Intended for tests/dev. Not optimized for performance; the relational
//! deployment replaces this behind the same trait with an events table
//! indexed on `(inventory_item_id, event_ts)`.

use std::collections::HashSet;
use std::sync::RwLock;

use chrono::Utc;

use tapledger_core::{DomainError, DomainResult, EventId, SalesLineId};
use tapledger_ledger::{
    ConsumptionEvent, EventFilter, LedgerStore, LedgerView, NewEvent,
};

/// Append-only in-memory event log.
#[derive(Debug, Default)]
pub struct InMemoryLedgerStore {
    events: RwLock<Vec<ConsumptionEvent>>,
}

impl InMemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LedgerStore for InMemoryLedgerStore {
    fn append_batch(&self, events: Vec<NewEvent>) -> DomainResult<Vec<ConsumptionEvent>> {
        // Validate the whole batch before any write: all or nothing.
        for event in &events {
            event.validate()?;
        }

        let mut log = self
            .events
            .write()
            .map_err(|_| DomainError::conflict("ledger lock poisoned"))?;

        let recorded_at = Utc::now();
        let mut committed = Vec::with_capacity(events.len());
        for event in events {
            let stored = ConsumptionEvent::from_new(event, EventId::new(), recorded_at);
            log.push(stored.clone());
            committed.push(stored);
        }
        Ok(committed)
    }

    fn get(&self, event_id: EventId) -> DomainResult<Option<ConsumptionEvent>> {
        let log = self
            .events
            .read()
            .map_err(|_| DomainError::conflict("ledger lock poisoned"))?;
        Ok(log.iter().find(|e| e.id == event_id).cloned())
    }

    fn find_by_sales_line(
        &self,
        sales_line_id: SalesLineId,
    ) -> DomainResult<Vec<ConsumptionEvent>> {
        let log = self
            .events
            .read()
            .map_err(|_| DomainError::conflict("ledger lock poisoned"))?;
        Ok(log
            .iter()
            .filter(|e| e.sales_line_id == Some(sales_line_id))
            .cloned()
            .collect())
    }

    fn find_reversal(&self, original: EventId) -> DomainResult<Option<ConsumptionEvent>> {
        let log = self
            .events
            .read()
            .map_err(|_| DomainError::conflict("ledger lock poisoned"))?;
        Ok(log
            .iter()
            .find(|e| e.reversal_of_event_id == Some(original))
            .cloned())
    }

    fn list(&self, filter: &EventFilter) -> DomainResult<Vec<ConsumptionEvent>> {
        let log = self
            .events
            .read()
            .map_err(|_| DomainError::conflict("ledger lock poisoned"))?;

        // The corrected view drops reversal pairs: the reversal rows and the
        // originals they negate.
        let reversed: HashSet<EventId> = match filter.view {
            LedgerView::Full => HashSet::new(),
            LedgerView::Corrected => log
                .iter()
                .filter_map(|e| e.reversal_of_event_id)
                .collect(),
        };

        let mut matched: Vec<ConsumptionEvent> = log
            .iter()
            .filter(|e| filter.matches(e))
            .filter(|e| match filter.view {
                LedgerView::Full => true,
                LedgerView::Corrected => !e.is_reversal() && !reversed.contains(&e.id),
            })
            .cloned()
            .collect();

        // Stable: append order breaks event_ts ties.
        matched.sort_by_key(|e| e.event_ts);
        Ok(matched)
    }
}
