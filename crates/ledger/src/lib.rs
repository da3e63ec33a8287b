//! `tapledger-ledger` — the append-only consumption ledger.
//!
//! Owns the `ConsumptionEvent` lifecycle exclusively: no other component may
//! fabricate on-hand state by any means other than reading this ledger.

pub mod correction;
pub mod event;
pub mod store;

pub use correction::{CorrectionOutcome, correct_event};
pub use event::{
    ConfidenceLevel, ConsumptionEvent, EventType, NewEvent, SourceSystem, VarianceReason,
};
pub use store::{EventFilter, LedgerStore, LedgerView, TimeWindow};
