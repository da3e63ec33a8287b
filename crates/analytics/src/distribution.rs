//! Adjustment-magnitude heatmap and reason-code distribution.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use chrono::{Datelike, Timelike};
use tapledger_core::{DomainResult, LocationId};
use tapledger_ledger::{EventFilter, EventType, LedgerStore, TimeWindow, VarianceReason};

/// Day-of-week × hour grid of summed |adjustment delta|.
///
/// Rows are Monday-first (`weekday.num_days_from_monday()`), columns are the
/// 24 hours of `event_ts`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdjustmentHeatmap {
    pub cells: Vec<Vec<Decimal>>,
}

impl AdjustmentHeatmap {
    fn empty() -> Self {
        Self {
            cells: vec![vec![Decimal::ZERO; 24]; 7],
        }
    }

    pub fn magnitude(&self, weekday: usize, hour: usize) -> Decimal {
        self.cells[weekday][hour]
    }
}

/// Share of one reason code across adjustments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReasonShare {
    /// `None` groups adjustments recorded without a reason (below-threshold
    /// variances).
    pub reason: Option<VarianceReason>,
    pub count: u64,
    pub total_quantity: Decimal,
}

/// When and how large count corrections are, by day-of-week and hour.
pub fn adjustment_heatmap(
    ledger: &dyn LedgerStore,
    location_id: LocationId,
    window: TimeWindow,
) -> DomainResult<AdjustmentHeatmap> {
    let filter = EventFilter::for_location(location_id)
        .with_types([EventType::InventoryCountAdjustment])
        .with_window(window);

    let mut heatmap = AdjustmentHeatmap::empty();
    for event in ledger.list(&filter)? {
        let weekday = event.event_ts.weekday().num_days_from_monday() as usize;
        let hour = event.event_ts.hour() as usize;
        heatmap.cells[weekday][hour] += event.quantity_delta.abs();
    }
    Ok(heatmap)
}

/// Reason-code distribution over adjustments, most frequent first.
pub fn reason_distribution(
    ledger: &dyn LedgerStore,
    location_id: LocationId,
    window: TimeWindow,
) -> DomainResult<Vec<ReasonShare>> {
    let filter = EventFilter::for_location(location_id)
        .with_types([EventType::InventoryCountAdjustment])
        .with_window(window);

    let mut by_reason: std::collections::BTreeMap<Option<VarianceReason>, (u64, Decimal)> =
        std::collections::BTreeMap::new();
    for event in ledger.list(&filter)? {
        let entry = by_reason
            .entry(event.variance_reason)
            .or_insert((0, Decimal::ZERO));
        entry.0 += 1;
        entry.1 += event.quantity_delta.abs();
    }

    let mut shares: Vec<ReasonShare> = by_reason
        .into_iter()
        .map(|(reason, (count, total_quantity))| ReasonShare {
            reason,
            count,
            total_quantity,
        })
        .collect();
    shares.sort_by(|a, b| b.count.cmp(&a.count));
    Ok(shares)
}
