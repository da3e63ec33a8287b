//! Reversal + replacement correction protocol.
//!
//! History is never rewritten. Correcting an event appends two new rows in
//! one atomic batch: a reversal carrying the negated original delta, and a
//! replacement carrying the corrected value. Any window spanning both nets
//! out to the corrected quantity.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use tapledger_core::{DomainError, DomainResult, EventId, Uom};

use crate::event::{ConfidenceLevel, NewEvent, SourceSystem};
use crate::store::LedgerStore;

/// Ids of the two events a correction appends.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorrectionOutcome {
    pub reversal_id: EventId,
    pub replacement_id: EventId,
}

/// Correct a previously recorded event.
///
/// Fails `NotFound` if the original does not exist, `PreconditionFailed` if
/// it has already been reversed or is itself a reversal. Both writes commit
/// atomically; a reversal without its replacement never reaches the ledger.
pub fn correct_event<L: LedgerStore>(
    store: &L,
    original_event_id: EventId,
    new_quantity_delta: Decimal,
    new_uom: Uom,
    reason: &str,
    now: DateTime<Utc>,
) -> DomainResult<CorrectionOutcome> {
    let original = store
        .get(original_event_id)?
        .ok_or_else(|| DomainError::not_found(format!("event {original_event_id}")))?;

    if original.is_reversal() {
        return Err(DomainError::precondition(format!(
            "event {original_event_id} is itself a reversal; correct the replacement instead"
        )));
    }
    if let Some(existing) = store.find_reversal(original_event_id)? {
        return Err(DomainError::precondition(format!(
            "event {original_event_id} was already reversed by {}",
            existing.id
        )));
    }
    if new_quantity_delta.is_zero() {
        return Err(DomainError::validation(
            "corrected quantity_delta must be non-zero",
        ));
    }

    let reversal = NewEvent::new(
        original.location_id,
        original.inventory_item_id,
        original.event_type,
        -original.quantity_delta,
        original.uom,
        now,
        ConfidenceLevel::Estimated,
    )
    .with_source(SourceSystem::Manual)
    .with_notes(format!("correction reversal: {reason}"))
    .reversing(original.id);

    let replacement = NewEvent::new(
        original.location_id,
        original.inventory_item_id,
        original.event_type,
        new_quantity_delta,
        new_uom,
        now,
        ConfidenceLevel::Estimated,
    )
    .with_source(SourceSystem::Manual)
    .with_notes(format!("correction replacement: {reason}"));

    let committed = store.append_batch(vec![reversal, replacement])?;

    tracing::info!(
        original = %original_event_id,
        reversal = %committed[0].id,
        replacement = %committed[1].id,
        "corrected ledger event"
    );

    Ok(CorrectionOutcome {
        reversal_id: committed[0].id,
        replacement_id: committed[1].id,
    })
}
