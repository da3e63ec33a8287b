//! Append-only ledger store contract.
//!
//! Appending is the only mutation; there is no update or delete. On-hand and
//! every report re-derive from sums over the log; no component maintains a
//! separate running total that could drift.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use tapledger_core::{DomainError, DomainResult, EventId, InventoryItemId, LocationId, SalesLineId};

use crate::event::{ConsumptionEvent, EventType, NewEvent};

/// Inclusive time range over `event_ts`.
///
/// Both bounds optional; `as_of(t)` is the canonical "everything through t"
/// window used for theoretical on-hand.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct TimeWindow {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

impl TimeWindow {
    pub fn all() -> Self {
        Self::default()
    }

    /// Upper bound only: every event with `event_ts <= as_of`.
    pub fn as_of(as_of: DateTime<Utc>) -> Self {
        Self {
            from: None,
            to: Some(as_of),
        }
    }

    pub fn between(from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        Self {
            from: Some(from),
            to: Some(to),
        }
    }

    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        if let Some(from) = self.from {
            if ts < from {
                return false;
            }
        }
        if let Some(to) = self.to {
            if ts > to {
                return false;
            }
        }
        true
    }
}

/// Which correction view a listing reflects.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum LedgerView {
    /// Every event, reversals included. On-hand sums use this: the sign
    /// convention makes the full history self-correcting.
    #[default]
    Full,
    /// Excludes reversal events and the originals they negate, leaving only
    /// the currently-standing records.
    Corrected,
}

/// Listing filter: by item or location, optionally narrowed by type/window.
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    pub location_id: Option<LocationId>,
    pub item_id: Option<InventoryItemId>,
    pub event_types: Option<Vec<EventType>>,
    pub window: TimeWindow,
    pub view: LedgerView,
}

impl EventFilter {
    pub fn for_item(item_id: InventoryItemId) -> Self {
        Self {
            item_id: Some(item_id),
            ..Self::default()
        }
    }

    pub fn for_location(location_id: LocationId) -> Self {
        Self {
            location_id: Some(location_id),
            ..Self::default()
        }
    }

    pub fn with_types(mut self, types: impl IntoIterator<Item = EventType>) -> Self {
        self.event_types = Some(types.into_iter().collect());
        self
    }

    pub fn with_window(mut self, window: TimeWindow) -> Self {
        self.window = window;
        self
    }

    pub fn corrected(mut self) -> Self {
        self.view = LedgerView::Corrected;
        self
    }

    /// Scalar predicates only; the correction view needs cross-event state
    /// and is applied by the store.
    pub fn matches(&self, event: &ConsumptionEvent) -> bool {
        if let Some(location_id) = self.location_id {
            if event.location_id != location_id {
                return false;
            }
        }
        if let Some(item_id) = self.item_id {
            if event.inventory_item_id != item_id {
                return false;
            }
        }
        if let Some(types) = &self.event_types {
            if !types.contains(&event.event_type) {
                return false;
            }
        }
        self.window.contains(event.event_ts)
    }
}

/// Durable, append-only storage of consumption events.
///
/// Implementations must:
/// - validate every event before any write (`NewEvent::validate`)
/// - make `append_batch` atomic: all events commit or none do
/// - return listings ordered by `event_ts` (ties broken by append order)
/// - never expose an update or delete operation
pub trait LedgerStore: Send + Sync {
    /// Append a single event.
    fn append(&self, event: NewEvent) -> DomainResult<ConsumptionEvent> {
        self.append_batch(vec![event])?
            .pop()
            .ok_or_else(|| DomainError::conflict("append_batch committed no events"))
    }

    /// Append several events as one all-or-nothing unit. Used by corrections
    /// (reversal + replacement), recipe fan-out, and session close.
    fn append_batch(&self, events: Vec<NewEvent>) -> DomainResult<Vec<ConsumptionEvent>>;

    fn get(&self, event_id: EventId) -> DomainResult<Option<ConsumptionEvent>>;

    /// Events referencing an upstream sales line (idempotency probe).
    fn find_by_sales_line(&self, sales_line_id: SalesLineId)
    -> DomainResult<Vec<ConsumptionEvent>>;

    /// The reversal event pointing at `original`, if one exists.
    fn find_reversal(&self, original: EventId) -> DomainResult<Option<ConsumptionEvent>>;

    fn list(&self, filter: &EventFilter) -> DomainResult<Vec<ConsumptionEvent>>;

    /// Canonical theoretical on-hand computation: the sum of every event's
    /// delta inside the window, regardless of type or reversal status.
    fn sum_deltas(&self, item_id: InventoryItemId, window: TimeWindow) -> DomainResult<Decimal> {
        let filter = EventFilter::for_item(item_id).with_window(window);
        Ok(self
            .list(&filter)?
            .iter()
            .map(|e| e.quantity_delta)
            .sum())
    }

    /// Sum restricted to one event type (variance and usage reporting).
    fn sum_deltas_by_type(
        &self,
        item_id: InventoryItemId,
        event_type: EventType,
        window: TimeWindow,
    ) -> DomainResult<Decimal> {
        let filter = EventFilter::for_item(item_id)
            .with_types([event_type])
            .with_window(window);
        Ok(self
            .list(&filter)?
            .iter()
            .map(|e| e.quantity_delta)
            .sum())
    }
}

impl<S> LedgerStore for std::sync::Arc<S>
where
    S: LedgerStore + ?Sized,
{
    fn append(&self, event: NewEvent) -> DomainResult<ConsumptionEvent> {
        (**self).append(event)
    }

    fn append_batch(&self, events: Vec<NewEvent>) -> DomainResult<Vec<ConsumptionEvent>> {
        (**self).append_batch(events)
    }

    fn get(&self, event_id: EventId) -> DomainResult<Option<ConsumptionEvent>> {
        (**self).get(event_id)
    }

    fn find_by_sales_line(
        &self,
        sales_line_id: SalesLineId,
    ) -> DomainResult<Vec<ConsumptionEvent>> {
        (**self).find_by_sales_line(sales_line_id)
    }

    fn find_reversal(&self, original: EventId) -> DomainResult<Option<ConsumptionEvent>> {
        (**self).find_reversal(original)
    }

    fn list(&self, filter: &EventFilter) -> DomainResult<Vec<ConsumptionEvent>> {
        (**self).list(filter)
    }

    fn sum_deltas(&self, item_id: InventoryItemId, window: TimeWindow) -> DomainResult<Decimal> {
        (**self).sum_deltas(item_id, window)
    }

    fn sum_deltas_by_type(
        &self,
        item_id: InventoryItemId,
        event_type: EventType,
        window: TimeWindow,
    ) -> DomainResult<Decimal> {
        (**self).sum_deltas_by_type(item_id, event_type, window)
    }
}
