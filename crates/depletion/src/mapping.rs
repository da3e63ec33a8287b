//! POS-item-to-inventory mappings.
//!
//! Mapping maintenance (fuzzy-match suggestion, effective dating, recipes)
//! lives upstream. The union is resolved once at this boundary; downstream
//! ledger code only ever sees flat `(item, quantity, uom)` components.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use tapledger_core::{DomainResult, InventoryItemId, LocationId, Uom};
use tapledger_ledger::SourceSystem;

/// One ingredient of a recipe-mode mapping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecipeIngredient {
    pub item_id: InventoryItemId,
    /// Base-UOM quantity consumed per serving sold.
    pub quantity_per_serving: Decimal,
    pub uom: Uom,
}

/// Closed union of mapping shapes, each carrying exactly what it needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum MappingMode {
    /// Bottles, cans, cases: one unit depleted per unit sold.
    PackagedUnit { item_id: InventoryItemId },
    /// Draft pour attributed through the tap line; oz-per-pour already
    /// resolved from the pour profile.
    DraftByTap {
        item_id: InventoryItemId,
        oz_per_pour: Decimal,
    },
    /// Draft pour attributed to the product directly (less accurate).
    DraftByProduct {
        item_id: InventoryItemId,
        oz_per_pour: Decimal,
    },
    /// Cocktail/recipe: fans out into one component per ingredient.
    Recipe { ingredients: Vec<RecipeIngredient> },
}

/// A resolved, active mapping effective at the queried timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemMapping {
    pub mode: MappingMode,
}

/// Flat depletion instruction handed to the ledger.
#[derive(Debug, Clone, PartialEq)]
pub struct DepletionComponent {
    pub item_id: InventoryItemId,
    /// Positive quantity consumed; the engine negates it on append.
    pub quantity: Decimal,
    pub uom: Uom,
}

impl ItemMapping {
    /// Resolve the union into flat components for `sold_quantity` servings.
    pub fn components(&self, sold_quantity: Decimal) -> Vec<DepletionComponent> {
        match &self.mode {
            MappingMode::PackagedUnit { item_id } => vec![DepletionComponent {
                item_id: *item_id,
                quantity: sold_quantity,
                uom: Uom::Units,
            }],
            MappingMode::DraftByTap { item_id, oz_per_pour }
            | MappingMode::DraftByProduct { item_id, oz_per_pour } => vec![DepletionComponent {
                item_id: *item_id,
                quantity: sold_quantity * *oz_per_pour,
                uom: Uom::Oz,
            }],
            MappingMode::Recipe { ingredients } => ingredients
                .iter()
                .map(|ing| DepletionComponent {
                    item_id: ing.item_id,
                    quantity: sold_quantity * ing.quantity_per_serving,
                    uom: ing.uom,
                })
                .collect(),
        }
    }
}

/// Effective-dated mapping lookup.
///
/// Returns the active mapping whose effective range covers `as_of`, or `None`
/// when the POS item is unmapped (unmapped is a skip, not a failure).
pub trait MappingResolver: Send + Sync {
    fn resolve(
        &self,
        location_id: LocationId,
        source_system: SourceSystem,
        pos_item_id: &str,
        as_of: DateTime<Utc>,
    ) -> DomainResult<Option<ItemMapping>>;
}

impl<M> MappingResolver for std::sync::Arc<M>
where
    M: MappingResolver + ?Sized,
{
    fn resolve(
        &self,
        location_id: LocationId,
        source_system: SourceSystem,
        pos_item_id: &str,
        as_of: DateTime<Utc>,
    ) -> DomainResult<Option<ItemMapping>> {
        (**self).resolve(location_id, source_system, pos_item_id, as_of)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn packaged_unit_depletes_one_per_serving() {
        let item_id = InventoryItemId::new();
        let mapping = ItemMapping {
            mode: MappingMode::PackagedUnit { item_id },
        };
        let components = mapping.components(dec!(3));
        assert_eq!(components.len(), 1);
        assert_eq!(components[0].item_id, item_id);
        assert_eq!(components[0].quantity, dec!(3));
        assert_eq!(components[0].uom, Uom::Units);
    }

    #[test]
    fn draft_scales_by_pour_profile() {
        let item_id = InventoryItemId::new();
        let mapping = ItemMapping {
            mode: MappingMode::DraftByTap {
                item_id,
                oz_per_pour: dec!(16),
            },
        };
        let components = mapping.components(dec!(2));
        assert_eq!(components[0].quantity, dec!(32));
        assert_eq!(components[0].uom, Uom::Oz);
    }

    #[test]
    fn recipe_fans_out_per_ingredient() {
        let gin = InventoryItemId::new();
        let vermouth = InventoryItemId::new();
        let mapping = ItemMapping {
            mode: MappingMode::Recipe {
                ingredients: vec![
                    RecipeIngredient {
                        item_id: gin,
                        quantity_per_serving: dec!(2.5),
                        uom: Uom::Oz,
                    },
                    RecipeIngredient {
                        item_id: vermouth,
                        quantity_per_serving: dec!(0.5),
                        uom: Uom::Oz,
                    },
                ],
            },
        };
        let components = mapping.components(dec!(2));
        assert_eq!(components.len(), 2);
        assert_eq!(components[0].quantity, dec!(5.0));
        assert_eq!(components[1].quantity, dec!(1.0));
    }
}
