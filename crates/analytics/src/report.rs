//! Windowed variance report with cost impact.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use tapledger_core::{DomainResult, InventoryItemId, ItemCatalog, LocationId, PriceResolver, Uom};
use tapledger_ledger::{EventType, LedgerStore, TimeWindow};
use tapledger_sessions::variance_percent;

/// One item row of the report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VarianceReportItem {
    pub item_id: InventoryItemId,
    pub item_name: String,
    /// Magnitude of sales-driven depletion in the window.
    pub theoretical: Decimal,
    /// Magnitude after count adjustments.
    pub actual: Decimal,
    pub variance: Decimal,
    pub variance_percent: Decimal,
    pub uom: Uom,
    /// Null when no price history covers the window (the report degrades, it
    /// does not fail).
    pub unit_cost: Option<Decimal>,
    pub value_impact: Option<Decimal>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VarianceReport {
    pub location_id: LocationId,
    pub from_date: DateTime<Utc>,
    pub to_date: DateTime<Utc>,
    pub items: Vec<VarianceReportItem>,
    pub total_variance_value: Decimal,
}

/// Build the variance report for every active item at a location.
///
/// Theoretical usage sums both depletion event types; adjustments are the
/// count corrections landed in the same window.
pub fn variance_report(
    ledger: &dyn LedgerStore,
    catalog: &dyn ItemCatalog,
    prices: &dyn PriceResolver,
    location_id: LocationId,
    from_date: DateTime<Utc>,
    to_date: DateTime<Utc>,
) -> DomainResult<VarianceReport> {
    let window = TimeWindow::between(from_date, to_date);
    let mut items = Vec::new();
    let mut total_variance_value = Decimal::ZERO;

    for info in catalog.active_for_location(location_id)? {
        let theoretical = ledger.sum_deltas_by_type(info.id, EventType::PosSale, window)?
            + ledger.sum_deltas_by_type(info.id, EventType::TapFlow, window)?;
        let adjustments =
            ledger.sum_deltas_by_type(info.id, EventType::InventoryCountAdjustment, window)?;

        let actual = theoretical + adjustments;
        let variance = actual - theoretical;

        let unit_cost = prices.unit_cost(info.id, to_date);
        let value_impact = unit_cost.map(|cost| variance * cost);
        if let Some(impact) = value_impact {
            total_variance_value += impact.abs();
        }

        items.push(VarianceReportItem {
            item_id: info.id,
            item_name: info.name,
            theoretical: theoretical.abs(),
            actual: actual.abs(),
            variance,
            variance_percent: variance_percent(variance, theoretical),
            uom: info.base_uom,
            unit_cost,
            value_impact,
        });
    }

    Ok(VarianceReport {
        location_id,
        from_date,
        to_date,
        items,
        total_variance_value,
    })
}
