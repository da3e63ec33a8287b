//! `tapledger-service` — composition of the core engines behind the public
//! operation contracts.

pub mod services;

pub use services::{AppendEventRequest, CoreServices};

/// Re-exported so embedding binaries initialize logging the same way.
pub use tapledger_observability::init as init_observability;
