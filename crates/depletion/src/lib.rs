//! `tapledger-depletion` — sales-to-consumption processing.

pub mod engine;
pub mod mapping;
pub mod sales;

pub use engine::{DepletionEngine, DepletionStats};
pub use mapping::{
    DepletionComponent, ItemMapping, MappingMode, MappingResolver, RecipeIngredient,
};
pub use sales::{RecordKind, SalesLine, SalesLineSource};
