//! Canonical sales/flow records.
//!
//! POS import and tap flow meters are external; the processor only consumes
//! records already parsed into this shape.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use tapledger_core::{DomainResult, LocationId, SalesLineId};
use tapledger_ledger::SourceSystem;

/// Whether a record came from the register or a flow meter.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    Sale,
    TapFlow,
}

/// One canonical sales/flow record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SalesLine {
    pub id: SalesLineId,
    pub location_id: LocationId,
    pub source_system: SourceSystem,
    pub kind: RecordKind,
    /// The POS system's own item identifier, resolved through mappings.
    pub pos_item_id: String,
    pub pos_item_name: String,
    /// Servings sold (or raw flow quantity for meter records).
    pub quantity: Decimal,
    pub sold_at: DateTime<Utc>,
    pub receipt_id: Option<String>,
    pub is_voided: bool,
    pub is_refunded: bool,
}

impl SalesLine {
    /// Voided/refunded records never deplete inventory.
    pub fn is_cancelled(&self) -> bool {
        self.is_voided || self.is_refunded
    }
}

/// Supplies the records for a depletion run. Half-open window on `sold_at`:
/// `from <= sold_at < to`.
pub trait SalesLineSource: Send + Sync {
    fn lines_in_window(
        &self,
        location_id: LocationId,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> DomainResult<Vec<SalesLine>>;
}

impl<S> SalesLineSource for std::sync::Arc<S>
where
    S: SalesLineSource + ?Sized,
{
    fn lines_in_window(
        &self,
        location_id: LocationId,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> DomainResult<Vec<SalesLine>> {
        (**self).lines_in_window(location_id, from, to)
    }
}
