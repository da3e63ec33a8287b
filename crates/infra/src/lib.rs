//! `tapledger-infra` — in-memory implementations of the core's storage and
//! collaborator contracts, used by tests and dev wiring. Relational/RPC
//! deployments supply their own implementations behind the same traits.

pub mod catalog;
pub mod ledger_store;
pub mod mappings;
pub mod par_store;
pub mod session_store;

#[cfg(test)]
mod integration_tests;

pub use catalog::{InMemoryItemCatalog, InMemoryPriceBook};
pub use ledger_store::InMemoryLedgerStore;
pub use mappings::{InMemoryMappingResolver, InMemorySalesLines, MappingRow};
pub use par_store::InMemoryParLevelStore;
pub use session_store::InMemorySessionStore;
