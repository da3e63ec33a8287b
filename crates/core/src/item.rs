//! Inventory-item catalog interface.
//!
//! Item management (creation, barcodes, typing) is an external concern; the
//! core only needs to resolve metadata for items it sees in the ledger.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::DomainResult;
use crate::id::{InventoryItemId, LocationId};
use crate::uom::Uom;

/// Resolved inventory-item metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemInfo {
    pub id: InventoryItemId,
    pub location_id: LocationId,
    pub name: String,
    /// Base unit of measure: every ledger delta for this item is in this UOM.
    pub base_uom: Uom,
    /// Base units per package (e.g. 24 for a case), when the item is packaged.
    pub pack_size: Option<Decimal>,
    pub active: bool,
}

/// Read-only catalog lookup, implemented by the item-management collaborator.
pub trait ItemCatalog: Send + Sync {
    fn get(&self, item_id: InventoryItemId) -> DomainResult<Option<ItemInfo>>;

    /// All active items at a location.
    fn active_for_location(&self, location_id: LocationId) -> DomainResult<Vec<ItemInfo>>;

    /// Resolve an item's display name; falls back to the raw id for items the
    /// catalog no longer knows (reports degrade, they do not fail).
    fn display_name(&self, item_id: InventoryItemId) -> String {
        match self.get(item_id) {
            Ok(Some(info)) => info.name,
            _ => item_id.to_string(),
        }
    }
}

impl<C> ItemCatalog for std::sync::Arc<C>
where
    C: ItemCatalog + ?Sized,
{
    fn get(&self, item_id: InventoryItemId) -> DomainResult<Option<ItemInfo>> {
        (**self).get(item_id)
    }

    fn active_for_location(&self, location_id: LocationId) -> DomainResult<Vec<ItemInfo>> {
        (**self).active_for_location(location_id)
    }
}
