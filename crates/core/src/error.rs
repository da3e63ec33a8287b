//! Domain error model.

use thiserror::Error;

use crate::id::InventoryItemId;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// Keep this focused on deterministic, business/domain failures (validation,
/// preconditions, missing data). Infrastructure concerns belong elsewhere.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A value failed validation (e.g. negative count, zero delta).
    #[error("validation failed: {0}")]
    Validation(String),

    /// A referenced session/event/item does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The operation's precondition does not hold (already-closed session,
    /// already-reversed event). Carries the blocking detail.
    #[error("precondition failed: {0}")]
    PreconditionFailed(String),

    /// Session close is blocked pending variance reasons.
    ///
    /// Not a system failure: a structured "needs input" outcome. The caller
    /// resubmits the close with reasons for the listed items. Nothing is
    /// committed when this is returned.
    #[error("variance reasons required for {} item(s)", requires_reasons.len())]
    ReconciliationIncomplete { requires_reasons: Vec<InventoryItemId> },

    /// A conflict occurred (e.g. concurrent close attempt lost the race).
    #[error("conflict: {0}")]
    Conflict(String),

    /// An identifier was invalid (e.g. parse failure).
    #[error("invalid identifier: {0}")]
    InvalidId(String),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn precondition(msg: impl Into<String>) -> Self {
        Self::PreconditionFailed(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn requires_reasons(items: Vec<InventoryItemId>) -> Self {
        Self::ReconciliationIncomplete {
            requires_reasons: items,
        }
    }
}
