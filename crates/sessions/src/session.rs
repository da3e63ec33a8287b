//! Physical-count sessions.
//!
//! Workflow:
//! 1. Open session (`started_ts` set)
//! 2. Append count lines while open
//! 3. Close exactly once (`ended_ts` set, adjustment events created)

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use tapledger_core::{
    DomainError, DomainResult, InventoryItemId, LocationId, SessionId, SessionLineId, SubAreaId,
    UserId,
};

/// A bounded counting exercise for one location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventorySession {
    pub id: SessionId,
    pub location_id: LocationId,
    pub started_ts: DateTime<Utc>,
    /// `None` while open. Set exactly once.
    pub ended_ts: Option<DateTime<Utc>>,
    pub created_by: Option<UserId>,
    /// `None` on system closes (force-close, day-end expiry).
    pub closed_by: Option<UserId>,
}

impl InventorySession {
    pub fn open(location_id: LocationId, created_by: Option<UserId>, now: DateTime<Utc>) -> Self {
        Self {
            id: SessionId::new(),
            location_id,
            started_ts: now,
            ended_ts: None,
            created_by,
            closed_by: None,
        }
    }

    pub fn is_closed(&self) -> bool {
        self.ended_ts.is_some()
    }
}

/// Exactly one actual-value representation per count line.
///
/// Weight- and volume-based values arrive already converted to the item's
/// base UOM by the scale/bottle-template integration upstream.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActualValue {
    /// Discrete unit count (bottles, cans, cases broken into units).
    Units(Decimal),
    /// Scale reading for weight-tracked items.
    GrossWeightGrams(Decimal),
    /// Volume derived upstream (e.g. keg percent-remaining, bottle scale).
    DerivedVolumeOz(Decimal),
}

impl ActualValue {
    /// The counted quantity in the item's base UOM.
    pub fn quantity(&self) -> Decimal {
        match self {
            ActualValue::Units(q) | ActualValue::GrossWeightGrams(q) | ActualValue::DerivedVolumeOz(q) => {
                *q
            }
        }
    }

    /// Counts can be zero (an empty shelf is a real observation) but never
    /// negative.
    pub fn validate(&self) -> DomainResult<()> {
        if self.quantity() < Decimal::ZERO {
            return Err(DomainError::validation(
                "counted value cannot be negative",
            ));
        }
        Ok(())
    }
}

/// One item count within a session. Multiple lines for the same item are
/// additive on close (e.g. a partial case plus a weighed remainder).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionLine {
    pub id: SessionLineId,
    pub session_id: SessionId,
    pub inventory_item_id: InventoryItemId,
    pub actual: ActualValue,
    pub sub_area_id: Option<SubAreaId>,
    pub counted_by: Option<UserId>,
    pub recorded_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn negative_counts_are_rejected() {
        let err = ActualValue::Units(dec!(-1)).validate().unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn zero_count_is_a_valid_observation() {
        assert!(ActualValue::Units(Decimal::ZERO).validate().is_ok());
    }

    #[test]
    fn session_open_close_state() {
        let mut session = InventorySession::open(LocationId::new(), None, Utc::now());
        assert!(!session.is_closed());
        session.ended_ts = Some(Utc::now());
        assert!(session.is_closed());
    }
}
