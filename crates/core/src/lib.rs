//! `tapledger-core` — domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns).

pub mod error;
pub mod id;
pub mod item;
pub mod price;
pub mod uom;

pub use error::{DomainError, DomainResult};
pub use id::{
    EventId, InventoryItemId, LocationId, ParLevelId, SalesLineId, SessionId, SessionLineId,
    SubAreaId, UserId, VendorId,
};
pub use item::{ItemCatalog, ItemInfo};
pub use price::PriceResolver;
pub use uom::Uom;
