//! In-memory item catalog and effective-dated price book.

use std::collections::HashMap;
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use tapledger_core::{
    DomainError, DomainResult, InventoryItemId, ItemCatalog, ItemInfo, LocationId, PriceResolver,
};

/// In-memory item catalog (tests/dev).
#[derive(Debug, Default)]
pub struct InMemoryItemCatalog {
    items: RwLock<HashMap<InventoryItemId, ItemInfo>>,
}

impl InMemoryItemCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, info: ItemInfo) {
        if let Ok(mut items) = self.items.write() {
            items.insert(info.id, info);
        }
    }
}

impl ItemCatalog for InMemoryItemCatalog {
    fn get(&self, item_id: InventoryItemId) -> DomainResult<Option<ItemInfo>> {
        let items = self
            .items
            .read()
            .map_err(|_| DomainError::conflict("catalog lock poisoned"))?;
        Ok(items.get(&item_id).cloned())
    }

    fn active_for_location(&self, location_id: LocationId) -> DomainResult<Vec<ItemInfo>> {
        let items = self
            .items
            .read()
            .map_err(|_| DomainError::conflict("catalog lock poisoned"))?;
        let mut active: Vec<ItemInfo> = items
            .values()
            .filter(|i| i.active && i.location_id == location_id)
            .cloned()
            .collect();
        active.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
        Ok(active)
    }
}

#[derive(Debug, Clone)]
struct PriceEntry {
    unit_cost: Decimal,
    effective_from: DateTime<Utc>,
    effective_to: Option<DateTime<Utc>>,
}

/// Effective-dated unit costs (tests/dev).
#[derive(Debug, Default)]
pub struct InMemoryPriceBook {
    prices: RwLock<HashMap<InventoryItemId, Vec<PriceEntry>>>,
}

impl InMemoryPriceBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_price(
        &self,
        item_id: InventoryItemId,
        unit_cost: Decimal,
        effective_from: DateTime<Utc>,
        effective_to: Option<DateTime<Utc>>,
    ) {
        if let Ok(mut prices) = self.prices.write() {
            prices.entry(item_id).or_default().push(PriceEntry {
                unit_cost,
                effective_from,
                effective_to,
            });
        }
    }
}

impl PriceResolver for InMemoryPriceBook {
    fn unit_cost(&self, item_id: InventoryItemId, as_of: DateTime<Utc>) -> Option<Decimal> {
        let prices = self.prices.read().ok()?;
        let history = prices.get(&item_id)?;

        // Most recent price effective at as_of wins.
        history
            .iter()
            .filter(|p| {
                p.effective_from <= as_of
                    && p.effective_to.map(|to| to > as_of).unwrap_or(true)
            })
            .max_by_key(|p| p.effective_from)
            .map(|p| p.unit_cost)
    }
}
