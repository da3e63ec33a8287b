//! Par-level configuration and reorder suggestions.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use chrono::{DateTime, Utc};
use tapledger_core::{
    DomainResult, InventoryItemId, ItemCatalog, LocationId, ParLevelId, Uom, VendorId,
};
use tapledger_ledger::{LedgerStore, TimeWindow};

/// Unit the par figures are expressed in.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParUom {
    /// The item's base UOM.
    NativeUnit,
    /// Whole packages (cases, kegs); converted via the item's `pack_size`.
    Package,
}

/// Target stocking configuration per (item, vendor, location).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParLevel {
    pub id: ParLevelId,
    pub inventory_item_id: InventoryItemId,
    pub vendor_id: Option<VendorId>,
    pub location_id: LocationId,
    pub par_level: Decimal,
    /// Reorder trigger level; stockout projection is unconstrained without it.
    pub min_level: Option<Decimal>,
    /// Fixed order size; falls back to topping up to par when unset.
    pub reorder_qty: Option<Decimal>,
    pub par_uom: ParUom,
    pub lead_time_days: u32,
    pub safety_stock_days: u32,
    /// Soft delete: inactive rows are kept while referenced, never removed.
    pub active: bool,
}

/// Par-level storage, unique on (item, vendor, location).
pub trait ParLevelStore: Send + Sync {
    /// Insert or replace the row for the same (item, vendor, location) key.
    fn upsert(&self, par: ParLevel) -> DomainResult<ParLevelId>;

    /// The active par for an item at a location (first by vendor when several
    /// vendors carry the item).
    fn for_item(
        &self,
        item_id: InventoryItemId,
        location_id: LocationId,
    ) -> DomainResult<Option<ParLevel>>;

    fn active_for_location(&self, location_id: LocationId) -> DomainResult<Vec<ParLevel>>;

    /// Soft delete (clears `active`).
    fn deactivate(&self, par_id: ParLevelId) -> DomainResult<()>;
}

impl<P> ParLevelStore for std::sync::Arc<P>
where
    P: ParLevelStore + ?Sized,
{
    fn upsert(&self, par: ParLevel) -> DomainResult<ParLevelId> {
        (**self).upsert(par)
    }

    fn for_item(
        &self,
        item_id: InventoryItemId,
        location_id: LocationId,
    ) -> DomainResult<Option<ParLevel>> {
        (**self).for_item(item_id, location_id)
    }

    fn active_for_location(&self, location_id: LocationId) -> DomainResult<Vec<ParLevel>> {
        (**self).active_for_location(location_id)
    }

    fn deactivate(&self, par_id: ParLevelId) -> DomainResult<()> {
        (**self).deactivate(par_id)
    }
}

/// One par-dashboard row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReorderSuggestion {
    pub item_id: InventoryItemId,
    pub item_name: String,
    /// Current level converted into the par's UOM.
    pub current_level: Decimal,
    pub par_level: Decimal,
    pub par_uom: ParUom,
    pub below_par: bool,
    pub suggested_qty: Decimal,
    pub uom: Uom,
}

/// Convert a base-UOM level into the par's UOM.
pub fn level_in_par_uom(level: Decimal, par_uom: ParUom, pack_size: Option<Decimal>) -> Decimal {
    match par_uom {
        ParUom::NativeUnit => level,
        ParUom::Package => match pack_size {
            Some(size) if !size.is_zero() => level / size,
            // Unknown pack size: treat the package as one base unit rather
            // than failing the dashboard.
            _ => level,
        },
    }
}

/// Suggested order quantity against a par target.
pub fn suggest_reorder_qty(
    current_level: Decimal,
    par_level: Decimal,
    reorder_qty: Option<Decimal>,
) -> Decimal {
    if current_level >= par_level {
        return Decimal::ZERO;
    }
    reorder_qty.unwrap_or_else(|| (par_level - current_level).max(Decimal::ZERO))
}

/// Build reorder suggestions for every active par at a location.
pub fn reorder_suggestions(
    ledger: &dyn LedgerStore,
    catalog: &dyn ItemCatalog,
    pars: &dyn ParLevelStore,
    location_id: LocationId,
    now: DateTime<Utc>,
) -> DomainResult<Vec<ReorderSuggestion>> {
    let mut suggestions = Vec::new();

    for par in pars.active_for_location(location_id)? {
        let info = catalog.get(par.inventory_item_id)?;
        let (name, pack_size, uom) = match &info {
            Some(i) => (i.name.clone(), i.pack_size, i.base_uom),
            None => (par.inventory_item_id.to_string(), None, Uom::Units),
        };

        let base_level = ledger.sum_deltas(par.inventory_item_id, TimeWindow::as_of(now))?;
        let current_level = level_in_par_uom(base_level, par.par_uom, pack_size);
        let below_par = current_level < par.par_level;

        suggestions.push(ReorderSuggestion {
            item_id: par.inventory_item_id,
            item_name: name,
            current_level,
            par_level: par.par_level,
            par_uom: par.par_uom,
            below_par,
            suggested_qty: suggest_reorder_qty(current_level, par.par_level, par.reorder_qty),
            uom,
        });
    }

    Ok(suggestions)
}
