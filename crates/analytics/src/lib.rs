//! `tapledger-analytics` — derived, non-persisted read models over the
//! ledger and session history. Nothing here writes back.

pub mod distribution;
pub mod patterns;
pub mod report;
pub mod staff;

pub use distribution::{AdjustmentHeatmap, ReasonShare, adjustment_heatmap, reason_distribution};
pub use patterns::{
    Trend, VariancePatternItem, analyze_variance_patterns, classify_trend, is_shrinkage_suspect,
};
pub use report::{VarianceReport, VarianceReportItem, variance_report};
pub use staff::{StaffAccuracy, staff_accuracy};
