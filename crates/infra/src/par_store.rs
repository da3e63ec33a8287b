//! In-memory par-level storage.

use std::sync::RwLock;

use tapledger_core::{DomainError, DomainResult, InventoryItemId, LocationId, ParLevelId};
use tapledger_forecast::{ParLevel, ParLevelStore};

/// In-memory par-level store (tests/dev), unique on (item, vendor, location).
#[derive(Debug, Default)]
pub struct InMemoryParLevelStore {
    rows: RwLock<Vec<ParLevel>>,
}

impl InMemoryParLevelStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ParLevelStore for InMemoryParLevelStore {
    fn upsert(&self, par: ParLevel) -> DomainResult<ParLevelId> {
        let mut rows = self
            .rows
            .write()
            .map_err(|_| DomainError::conflict("par lock poisoned"))?;

        if let Some(existing) = rows.iter_mut().find(|r| {
            r.inventory_item_id == par.inventory_item_id
                && r.vendor_id == par.vendor_id
                && r.location_id == par.location_id
        }) {
            // The configuration key survives replacement; only values change.
            let id = existing.id;
            *existing = ParLevel { id, ..par };
            return Ok(id);
        }

        let id = par.id;
        rows.push(par);
        Ok(id)
    }

    fn for_item(
        &self,
        item_id: InventoryItemId,
        location_id: LocationId,
    ) -> DomainResult<Option<ParLevel>> {
        let rows = self
            .rows
            .read()
            .map_err(|_| DomainError::conflict("par lock poisoned"))?;
        let mut matches: Vec<&ParLevel> = rows
            .iter()
            .filter(|r| r.active && r.inventory_item_id == item_id && r.location_id == location_id)
            .collect();
        matches.sort_by_key(|r| r.vendor_id);
        Ok(matches.first().map(|r| (*r).clone()))
    }

    fn active_for_location(&self, location_id: LocationId) -> DomainResult<Vec<ParLevel>> {
        let rows = self
            .rows
            .read()
            .map_err(|_| DomainError::conflict("par lock poisoned"))?;
        let mut matches: Vec<ParLevel> = rows
            .iter()
            .filter(|r| r.active && r.location_id == location_id)
            .cloned()
            .collect();
        matches.sort_by_key(|r| (r.inventory_item_id, r.vendor_id));
        Ok(matches)
    }

    fn deactivate(&self, par_id: ParLevelId) -> DomainResult<()> {
        let mut rows = self
            .rows
            .write()
            .map_err(|_| DomainError::conflict("par lock poisoned"))?;
        let row = rows
            .iter_mut()
            .find(|r| r.id == par_id)
            .ok_or_else(|| DomainError::not_found(format!("par level {par_id}")))?;
        row.active = false;
        Ok(())
    }
}
