//! Effective-dated unit-cost lookup.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::id::InventoryItemId;

/// Resolves the unit cost of an item as of a point in time.
///
/// Backed by an effective-dated price history maintained by purchasing (out
/// of scope here). A missing price yields `None`; report code surfaces null
/// cost fields rather than failing.
pub trait PriceResolver: Send + Sync {
    fn unit_cost(&self, item_id: InventoryItemId, as_of: DateTime<Utc>) -> Option<Decimal>;
}

impl<P> PriceResolver for std::sync::Arc<P>
where
    P: PriceResolver + ?Sized,
{
    fn unit_cost(&self, item_id: InventoryItemId, as_of: DateTime<Utc>) -> Option<Decimal> {
        (**self).unit_cost(item_id, as_of)
    }
}
