//! `tapledger-forecast` — demand forecasting and reorder planning.

pub mod engine;
pub mod par;
pub mod usage;

pub use engine::{
    ForecastConfidence, ForecastDetail, ForecastEngine, ItemForecast, days_to_stockout,
};
pub use par::{
    ParLevel, ParLevelStore, ParUom, ReorderSuggestion, level_in_par_uom, reorder_suggestions,
    suggest_reorder_qty,
};
pub use usage::{DailyUsage, FORECAST_DAYS, ForecastDay, TRAILING_DAYS, UsageHistory, week_weights};
