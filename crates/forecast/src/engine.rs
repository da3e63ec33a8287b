//! Stockout and reorder projection per item.

use chrono::{DateTime, Days, NaiveDate, Utc};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};

use tapledger_core::{DomainResult, InventoryItemId, ItemCatalog, LocationId, PriceResolver};
use tapledger_ledger::{EventFilter, EventType, LedgerStore, TimeWindow};

use crate::par::ParLevelStore;
use crate::usage::{DailyUsage, ForecastDay, TRAILING_DAYS, UsageHistory};

/// Trust in a forecast, driven by count recency and observed activity.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ForecastConfidence {
    High,
    Medium,
    Low,
}

/// Forecast summary for one item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemForecast {
    pub item_id: InventoryItemId,
    pub item_name: String,
    /// Ledger-derived predicted level right now (last count folded in as
    /// adjustment events, plus movement since).
    pub current_level: Decimal,
    pub forecast_daily_usage: Decimal,
    /// Days until the projected level reaches zero; `None` when usage never
    /// crosses within the horizon and no flat fallback applies.
    pub days_to_stockout: Option<i64>,
    pub reorder_by_date: Option<NaiveDate>,
    pub needs_reorder_soon: bool,
    /// Cost of the 30-day projected usage; null without price history.
    pub projected_cost: Option<Decimal>,
    pub confidence: ForecastConfidence,
}

/// Drill-down for one item: what the forecast saw and what it projects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastDetail {
    pub item_id: InventoryItemId,
    pub historical: Vec<DailyUsage>,
    pub forecast: Vec<ForecastDay>,
    /// Monday-first seasonality ratios.
    pub dow_pattern: Vec<Decimal>,
}

/// Walk a projection until the level first reaches zero.
///
/// Returns the 1-based day index, `Some(0)` when the level is already
/// depleted, or the flat `ceil(level / daily)` fallback when the projection
/// never crosses inside the horizon but usage is non-zero.
pub fn days_to_stockout(
    current_level: Decimal,
    projection: &[ForecastDay],
    daily_usage: Decimal,
) -> Option<i64> {
    if current_level <= Decimal::ZERO {
        return Some(0);
    }

    let mut level = current_level;
    for (idx, day) in projection.iter().enumerate() {
        level -= day.quantity;
        if level <= Decimal::ZERO {
            return Some(idx as i64 + 1);
        }
    }

    if daily_usage > Decimal::ZERO {
        (current_level / daily_usage).ceil().to_i64()
    } else {
        None
    }
}

/// First projected day the level drops below `min_level`, as a 1-based index.
fn first_day_below(
    current_level: Decimal,
    projection: &[ForecastDay],
    min_level: Decimal,
) -> Option<usize> {
    let mut level = current_level;
    for (idx, day) in projection.iter().enumerate() {
        level -= day.quantity;
        if level < min_level {
            return Some(idx + 1);
        }
    }
    None
}

pub struct ForecastEngine<'a> {
    ledger: &'a dyn LedgerStore,
    catalog: &'a dyn ItemCatalog,
    pars: &'a dyn ParLevelStore,
    prices: &'a dyn PriceResolver,
}

impl<'a> ForecastEngine<'a> {
    pub fn new(
        ledger: &'a dyn LedgerStore,
        catalog: &'a dyn ItemCatalog,
        pars: &'a dyn ParLevelStore,
        prices: &'a dyn PriceResolver,
    ) -> Self {
        Self {
            ledger,
            catalog,
            pars,
            prices,
        }
    }

    /// Forecast every active item at a location.
    pub fn forecast_location(
        &self,
        location_id: LocationId,
        now: DateTime<Utc>,
    ) -> DomainResult<Vec<ItemForecast>> {
        let mut forecasts = Vec::new();
        for info in self.catalog.active_for_location(location_id)? {
            forecasts.push(self.forecast_item(location_id, info.id, &info.name, now)?);
        }
        Ok(forecasts)
    }

    /// Historical/projected series for one item's drill-down view.
    pub fn item_detail(
        &self,
        item_id: InventoryItemId,
        now: DateTime<Utc>,
    ) -> DomainResult<ForecastDetail> {
        let today = now.date_naive();
        let history = self.usage_history(item_id, now)?;
        Ok(ForecastDetail {
            item_id,
            dow_pattern: history.dow_ratios().to_vec(),
            forecast: history.project(today),
            historical: history.days().to_vec(),
        })
    }

    fn usage_history(
        &self,
        item_id: InventoryItemId,
        now: DateTime<Utc>,
    ) -> DomainResult<UsageHistory> {
        let today = now.date_naive();
        let window_start = today - Days::new(TRAILING_DAYS as u64 - 1);
        let from = window_start.and_time(chrono::NaiveTime::MIN).and_utc();

        let filter = EventFilter::for_item(item_id)
            .with_types([EventType::PosSale, EventType::TapFlow])
            .with_window(TimeWindow::between(from, now));
        let events = self.ledger.list(&filter)?;
        Ok(UsageHistory::from_events(&events, today))
    }

    fn forecast_item(
        &self,
        location_id: LocationId,
        item_id: InventoryItemId,
        item_name: &str,
        now: DateTime<Utc>,
    ) -> DomainResult<ItemForecast> {
        let today = now.date_naive();
        let history = self.usage_history(item_id, now)?;
        let daily = history.forecast_daily_usage();
        let projection = history.project(today);

        let current_level = self.ledger.sum_deltas(item_id, TimeWindow::as_of(now))?;
        let stockout = days_to_stockout(current_level, &projection, daily);

        let par = self.pars.for_item(item_id, location_id)?;
        let (reorder_by_date, needs_reorder_soon) = match &par {
            Some(par) => match par.min_level {
                Some(min_level) => {
                    // May land in the past: that reads as "order now, you
                    // are already late".
                    let lead = par.lead_time_days as u64;
                    let reorder_by = first_day_below(current_level, &projection, min_level)
                        .map(|day| today + Days::new(day as u64) - Days::new(lead));

                    // Will we already be under min by the time an order
                    // placed today lands?
                    let lead_span = (par.lead_time_days as usize).min(projection.len());
                    let level_after_lead = current_level
                        - projection[..lead_span]
                            .iter()
                            .map(|d| d.quantity)
                            .sum::<Decimal>();
                    (reorder_by, level_after_lead < min_level)
                }
                None => (None, false),
            },
            None => (None, false),
        };

        let projected_usage: Decimal = projection.iter().map(|d| d.quantity).sum();
        let projected_cost = self
            .prices
            .unit_cost(item_id, now)
            .map(|cost| cost * projected_usage);

        let confidence = self.confidence(item_id, current_level, now)?;

        Ok(ItemForecast {
            item_id,
            item_name: item_name.to_string(),
            current_level,
            forecast_daily_usage: daily,
            days_to_stockout: stockout,
            reorder_by_date,
            needs_reorder_soon,
            projected_cost,
            confidence,
        })
    }

    /// Count-recency based labeling. A negative predicted level means the
    /// ledger disagrees with reality badly enough that recency cannot save
    /// the forecast.
    fn confidence(
        &self,
        item_id: InventoryItemId,
        current_level: Decimal,
        now: DateTime<Utc>,
    ) -> DomainResult<ForecastConfidence> {
        if current_level < Decimal::ZERO {
            return Ok(ForecastConfidence::Low);
        }

        let counts = self.ledger.list(
            &EventFilter::for_item(item_id)
                .with_types([EventType::InventoryCountAdjustment])
                .with_window(TimeWindow::as_of(now)),
        )?;
        let Some(last_count_ts) = counts.iter().map(|e| e.event_ts).max() else {
            return Ok(ForecastConfidence::Low);
        };

        let age_days = (now - last_count_ts).num_days();
        let since_count = TimeWindow::between(last_count_ts, now);

        if age_days <= 3 {
            let depletion_since = !self
                .ledger
                .list(
                    &EventFilter::for_item(item_id)
                        .with_types([EventType::PosSale, EventType::TapFlow])
                        .with_window(since_count),
                )?
                .is_empty();
            if depletion_since {
                return Ok(ForecastConfidence::High);
            }
        }
        if age_days <= 7 {
            return Ok(ForecastConfidence::Medium);
        }
        if age_days <= 14 {
            let receiving_since = !self
                .ledger
                .list(
                    &EventFilter::for_item(item_id)
                        .with_types([EventType::Receiving])
                        .with_window(since_count),
                )?
                .is_empty();
            if receiving_since {
                return Ok(ForecastConfidence::Medium);
            }
        }
        Ok(ForecastConfidence::Low)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    fn projection(quantities: &[Decimal]) -> Vec<ForecastDay> {
        let start = NaiveDate::from_ymd_opt(2026, 3, 3).unwrap();
        quantities
            .iter()
            .enumerate()
            .map(|(idx, q)| ForecastDay {
                date: start + Days::new(idx as u64),
                quantity: *q,
            })
            .collect()
    }

    #[test]
    fn stockout_is_one_based_day_index() {
        let proj = projection(&[dec!(4), dec!(4), dec!(4)]);
        assert_eq!(days_to_stockout(dec!(10), &proj, dec!(4)), Some(3));
    }

    #[test]
    fn depleted_level_means_day_zero() {
        let proj = projection(&[dec!(1)]);
        assert_eq!(days_to_stockout(dec!(0), &proj, dec!(1)), Some(0));
        assert_eq!(days_to_stockout(dec!(-2), &proj, dec!(1)), Some(0));
    }

    #[test]
    fn flat_fallback_when_horizon_never_crosses() {
        // 30 days at 1/day against 100 on hand: ceil(100 / 1) = 100.
        let proj = projection(&vec![dec!(1); 30]);
        assert_eq!(days_to_stockout(dec!(100), &proj, dec!(1)), Some(100));
    }

    #[test]
    fn no_usage_means_no_stockout() {
        let proj = projection(&vec![Decimal::ZERO; 30]);
        assert_eq!(days_to_stockout(dec!(10), &proj, Decimal::ZERO), None);
    }

    #[test]
    fn first_day_below_min_level() {
        let proj = projection(&[dec!(2), dec!(2), dec!(2), dec!(2)]);
        // 10 -> 8 -> 6 -> 4 -> 2; drops below 5 on day 3
        assert_eq!(first_day_below(dec!(10), &proj, dec!(5)), Some(3));
        assert_eq!(first_day_below(dec!(10), &proj, dec!(1)), None);
    }

    proptest! {
        /// Increasing usage (all else equal) never pushes stockout later.
        #[test]
        fn stockout_is_monotonic_in_usage(
            level in 1u32..500,
            base in 1u32..20,
            bump in 1u32..20,
        ) {
            let level = Decimal::from(level);
            let base = Decimal::from(base);
            let bumped = base + Decimal::from(bump);

            let slow = projection(&vec![base; 30]);
            let fast = projection(&vec![bumped; 30]);

            let d_slow = days_to_stockout(level, &slow, base);
            let d_fast = days_to_stockout(level, &fast, bumped);

            // Positive flat usage always yields a day via walk or fallback.
            prop_assert!(d_fast.unwrap() <= d_slow.unwrap());
        }
    }
}
