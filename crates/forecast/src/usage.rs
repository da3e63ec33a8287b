//! Historical usage aggregation and the seasonal daily-usage forecast.
//!
//! The forecast baseline is a fixed-weight blend of the last 8 weekly usage
//! totals, shaped per weekday by each weekday's share of the overall average.

use chrono::{Datelike, Days, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use tapledger_ledger::ConsumptionEvent;

/// Days of history the forecast looks back over (8 whole weeks).
pub const TRAILING_DAYS: usize = 56;

/// Days projected forward.
pub const FORECAST_DAYS: usize = 30;

/// Recency weights for the 8 trailing weekly totals, most recent week first.
pub fn week_weights() -> [Decimal; 8] {
    [
        Decimal::new(30, 2),
        Decimal::new(25, 2),
        Decimal::new(20, 2),
        Decimal::new(15, 2),
        Decimal::new(4, 2),
        Decimal::new(3, 2),
        Decimal::new(2, 2),
        Decimal::new(1, 2),
    ]
}

/// Usage observed on one day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyUsage {
    pub date: NaiveDate,
    pub quantity: Decimal,
}

/// Forecast for one future day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastDay {
    pub date: NaiveDate,
    pub quantity: Decimal,
}

/// Exactly [`TRAILING_DAYS`] of per-day usage ending at `today`, ascending.
/// Days without depletion hold zero.
#[derive(Debug, Clone, PartialEq)]
pub struct UsageHistory {
    days: Vec<DailyUsage>,
}

impl UsageHistory {
    /// Bucket depletion events by business day. Deltas are negative on
    /// depletion; usage is their magnitude.
    pub fn from_events(events: &[ConsumptionEvent], today: NaiveDate) -> Self {
        let start = today - Days::new(TRAILING_DAYS as u64 - 1);
        let mut days: Vec<DailyUsage> = (0..TRAILING_DAYS)
            .map(|offset| DailyUsage {
                date: start + Days::new(offset as u64),
                quantity: Decimal::ZERO,
            })
            .collect();

        for event in events {
            let date = event.event_ts.date_naive();
            if date < start || date > today {
                continue;
            }
            let idx = (date - start).num_days() as usize;
            days[idx].quantity += event.quantity_delta.abs();
        }

        Self { days }
    }

    pub fn days(&self) -> &[DailyUsage] {
        &self.days
    }

    /// The 8 trailing weekly totals, most recent week first.
    pub fn weekly_totals(&self) -> [Decimal; 8] {
        let mut totals = [Decimal::ZERO; 8];
        for (week, total) in totals.iter_mut().enumerate() {
            let end = TRAILING_DAYS - week * 7;
            *total = self.days[end - 7..end]
                .iter()
                .map(|d| d.quantity)
                .sum();
        }
        totals
    }

    /// Weighted-average forecast of daily usage.
    ///
    /// Weeks without any usage drop out and the fixed weights renormalize
    /// over the weight-sum actually used. With fewer than two weeks of
    /// signal, falls back to a flat average over the days that have data.
    pub fn forecast_daily_usage(&self) -> Decimal {
        let totals = self.weekly_totals();
        let weights = week_weights();

        let with_usage: Vec<usize> = (0..totals.len())
            .filter(|i| totals[*i] > Decimal::ZERO)
            .collect();

        if with_usage.len() < 2 {
            let observed: Vec<Decimal> = self
                .days
                .iter()
                .filter(|d| d.quantity > Decimal::ZERO)
                .map(|d| d.quantity)
                .collect();
            if observed.is_empty() {
                return Decimal::ZERO;
            }
            return observed.iter().sum::<Decimal>() / Decimal::from(observed.len() as u64);
        }

        let weight_sum: Decimal = with_usage.iter().map(|i| weights[*i]).sum();
        let weighted: Decimal = with_usage.iter().map(|i| weights[*i] * totals[*i]).sum();
        weighted / weight_sum / Decimal::from(7)
    }

    /// Per-weekday seasonality ratios, Monday-first.
    ///
    /// Each weekday's average (zero-filled days dilute it) divided by the
    /// overall daily average. Flat 1.0 when there is no usage at all.
    pub fn dow_ratios(&self) -> [Decimal; 7] {
        let total: Decimal = self.days.iter().map(|d| d.quantity).sum();
        if total.is_zero() {
            return [Decimal::ONE; 7];
        }
        let overall_avg = total / Decimal::from(TRAILING_DAYS as u64);

        let mut sums = [Decimal::ZERO; 7];
        let mut counts = [Decimal::ZERO; 7];
        for day in &self.days {
            let dow = day.date.weekday().num_days_from_monday() as usize;
            sums[dow] += day.quantity;
            counts[dow] += Decimal::ONE;
        }

        let mut ratios = [Decimal::ONE; 7];
        for dow in 0..7 {
            if !counts[dow].is_zero() {
                ratios[dow] = (sums[dow] / counts[dow]) / overall_avg;
            }
        }
        ratios
    }

    /// Project the next [`FORECAST_DAYS`] starting the day after `today`.
    pub fn project(&self, today: NaiveDate) -> Vec<ForecastDay> {
        let daily = self.forecast_daily_usage();
        let ratios = self.dow_ratios();

        (1..=FORECAST_DAYS as u64)
            .map(|offset| {
                let date = today + Days::new(offset);
                let dow = date.weekday().num_days_from_monday() as usize;
                ForecastDay {
                    date,
                    quantity: daily * ratios[dow],
                }
            })
            .collect()
    }
}
