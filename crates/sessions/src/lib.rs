//! `tapledger-sessions` — physical-count sessions and reconciliation.

pub mod reconcile;
pub mod session;
pub mod store;

pub use reconcile::{
    AdjustmentDetail, CloseSummary, ItemVariance, ReconcileEngine, ReconcilePolicy,
    variance_percent,
};
pub use session::{ActualValue, InventorySession, SessionLine};
pub use store::SessionStore;
