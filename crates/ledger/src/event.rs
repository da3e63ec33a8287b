//! The consumption ledger row.
//!
//! Every quantity change to an inventory item is one signed event. Summing
//! deltas over time yields on-hand; corrections append new events instead of
//! mutating history.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use tapledger_core::{
    DomainError, DomainResult, EventId, InventoryItemId, LocationId, SalesLineId, Uom,
};

/// Kind of inventory movement a ledger event records.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    PosSale,
    TapFlow,
    Receiving,
    Transfer,
    InventoryCountAdjustment,
    ManualAdjustment,
}

impl EventType {
    /// Sales-driven depletion types, the forecasting input.
    pub fn is_depletion(&self) -> bool {
        matches!(self, EventType::PosSale | EventType::TapFlow)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::PosSale => "pos_sale",
            EventType::TapFlow => "tap_flow",
            EventType::Receiving => "receiving",
            EventType::Transfer => "transfer",
            EventType::InventoryCountAdjustment => "inventory_count_adjustment",
            EventType::ManualAdjustment => "manual_adjustment",
        }
    }
}

impl core::fmt::Display for EventType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Upstream system an event originated from.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceSystem {
    Toast,
    Square,
    Lightspeed,
    Clover,
    Manual,
    Other,
}

/// How much trust to place in a recorded quantity.
///
/// `Theoretical` marks sales-derived depletion (nobody measured the pour);
/// `Measured` marks physical counts; `Estimated` marks corrections and other
/// human judgement calls.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceLevel {
    Theoretical,
    Measured,
    Estimated,
}

/// Operator-supplied explanation for a count variance.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VarianceReason {
    WasteFoam,
    Comp,
    StaffDrink,
    Theft,
    Breakage,
    LineCleaning,
    Transfer,
    /// Fixed reason applied by day-end auto-close.
    SessionExpired,
    Unknown,
}

/// An event ready to be appended (not yet assigned an id).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewEvent {
    pub location_id: LocationId,
    pub inventory_item_id: InventoryItemId,
    pub event_type: EventType,
    pub source_system: SourceSystem,
    /// Business timestamp. May differ from write time; all aggregation keys
    /// on this.
    pub event_ts: DateTime<Utc>,
    /// Signed quantity in the item's base UOM. Negative = depletion.
    pub quantity_delta: Decimal,
    pub uom: Uom,
    pub confidence_level: ConfidenceLevel,
    pub variance_reason: Option<VarianceReason>,
    pub notes: Option<String>,
    /// Link to the originating sales line; doubles as the depletion
    /// idempotency key.
    pub sales_line_id: Option<SalesLineId>,
    pub receipt_id: Option<String>,
    /// Set only on reversal events, pointing at the event being negated.
    pub reversal_of_event_id: Option<EventId>,
}

impl NewEvent {
    pub fn new(
        location_id: LocationId,
        inventory_item_id: InventoryItemId,
        event_type: EventType,
        quantity_delta: Decimal,
        uom: Uom,
        event_ts: DateTime<Utc>,
        confidence_level: ConfidenceLevel,
    ) -> Self {
        Self {
            location_id,
            inventory_item_id,
            event_type,
            source_system: SourceSystem::Manual,
            event_ts,
            quantity_delta,
            uom,
            confidence_level,
            variance_reason: None,
            notes: None,
            sales_line_id: None,
            receipt_id: None,
            reversal_of_event_id: None,
        }
    }

    pub fn with_source(mut self, source_system: SourceSystem) -> Self {
        self.source_system = source_system;
        self
    }

    pub fn with_variance_reason(mut self, reason: VarianceReason) -> Self {
        self.variance_reason = Some(reason);
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    pub fn with_sales_line(mut self, sales_line_id: SalesLineId) -> Self {
        self.sales_line_id = Some(sales_line_id);
        self
    }

    pub fn with_receipt(mut self, receipt_id: impl Into<String>) -> Self {
        self.receipt_id = Some(receipt_id.into());
        self
    }

    pub fn reversing(mut self, original_event_id: EventId) -> Self {
        self.reversal_of_event_id = Some(original_event_id);
        self
    }

    /// Reject malformed events before any write reaches the ledger.
    pub fn validate(&self) -> DomainResult<()> {
        if self.quantity_delta.is_zero() {
            return Err(DomainError::validation(
                "quantity_delta must be non-zero (zero movements are not recorded)",
            ));
        }
        Ok(())
    }
}

/// A committed ledger row. Immutable once written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsumptionEvent {
    pub id: EventId,
    pub location_id: LocationId,
    pub inventory_item_id: InventoryItemId,
    pub event_type: EventType,
    pub source_system: SourceSystem,
    pub event_ts: DateTime<Utc>,
    pub quantity_delta: Decimal,
    pub uom: Uom,
    pub confidence_level: ConfidenceLevel,
    pub variance_reason: Option<VarianceReason>,
    pub notes: Option<String>,
    pub sales_line_id: Option<SalesLineId>,
    pub receipt_id: Option<String>,
    pub reversal_of_event_id: Option<EventId>,
    /// Write timestamp. Never used for aggregation.
    pub recorded_at: DateTime<Utc>,
}

impl ConsumptionEvent {
    /// True when this event negates another event's delta.
    pub fn is_reversal(&self) -> bool {
        self.reversal_of_event_id.is_some()
    }

    /// Materialize a draft into a committed row. Stores call this while
    /// assigning ids; nothing else should.
    pub fn from_new(event: NewEvent, id: EventId, recorded_at: DateTime<Utc>) -> Self {
        Self {
            id,
            location_id: event.location_id,
            inventory_item_id: event.inventory_item_id,
            event_type: event.event_type,
            source_system: event.source_system,
            event_ts: event.event_ts,
            quantity_delta: event.quantity_delta,
            uom: event.uom,
            confidence_level: event.confidence_level,
            variance_reason: event.variance_reason,
            notes: event.notes,
            sales_line_id: event.sales_line_id,
            receipt_id: event.receipt_id,
            reversal_of_event_id: event.reversal_of_event_id,
            recorded_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn draft(delta: Decimal) -> NewEvent {
        NewEvent::new(
            LocationId::new(),
            InventoryItemId::new(),
            EventType::ManualAdjustment,
            delta,
            Uom::Units,
            Utc::now(),
            ConfidenceLevel::Estimated,
        )
    }

    #[test]
    fn zero_delta_is_rejected() {
        let err = draft(Decimal::ZERO).validate().unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn signed_deltas_are_valid() {
        assert!(draft(dec!(-1.5)).validate().is_ok());
        assert!(draft(dec!(24)).validate().is_ok());
    }

    #[test]
    fn depletion_types() {
        assert!(EventType::PosSale.is_depletion());
        assert!(EventType::TapFlow.is_depletion());
        assert!(!EventType::Receiving.is_depletion());
        assert!(!EventType::InventoryCountAdjustment.is_depletion());
    }

    #[test]
    fn event_type_serializes_snake_case() {
        let json = serde_json::to_string(&EventType::InventoryCountAdjustment).unwrap();
        assert_eq!(json, "\"inventory_count_adjustment\"");
    }
}
