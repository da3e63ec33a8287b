//! Cross-session variance pattern detection.
//!
//! Sign convention throughout: more negative variance = more loss.

use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use tapledger_core::{DomainResult, InventoryItemId, ItemCatalog, LocationId};
use tapledger_ledger::{LedgerStore, TimeWindow};
use tapledger_sessions::SessionStore;

/// Direction a variance series is heading.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    Improving,
    Stable,
    Worsening,
}

/// One item's behavior across recent sessions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariancePatternItem {
    pub item_id: InventoryItemId,
    pub item_name: String,
    /// Sessions the item was counted in.
    pub appearances: usize,
    pub mean_variance: Decimal,
    /// Chronological per-session variances.
    pub variances: Vec<Decimal>,
    pub trend: Trend,
    pub is_shrinkage_suspect: bool,
}

fn mean(series: &[Decimal]) -> Decimal {
    if series.is_empty() {
        return Decimal::ZERO;
    }
    series.iter().sum::<Decimal>() / Decimal::from(series.len() as u64)
}

/// Compare the two halves of a chronological series.
///
/// Second-half mean minus first-half mean beyond ±0.5 tips the label; a
/// higher value reads as improving (variances are negative when stock is
/// missing).
pub fn classify_trend(series: &[Decimal]) -> Trend {
    if series.len() < 2 {
        return Trend::Stable;
    }
    let mid = series.len() / 2;
    let shift = mean(&series[mid..]) - mean(&series[..mid]);
    let band = Decimal::new(5, 1);

    if shift > band {
        Trend::Improving
    } else if shift < -band {
        Trend::Worsening
    } else {
        Trend::Stable
    }
}

/// Persistent-loss flag: enough observations, net loss on average, and loss
/// in over half of them.
pub fn is_shrinkage_suspect(series: &[Decimal]) -> bool {
    if series.len() < 3 {
        return false;
    }
    let negatives = series.iter().filter(|v| **v < Decimal::ZERO).count();
    mean(series) < Decimal::ZERO && negatives * 2 > series.len()
}

/// Analyze variance patterns over the last `session_count` closed sessions.
///
/// Needs at least two closed sessions to say anything; returns empty below
/// that. Per item per session a single variance value is retained: the
/// session's **last** line for the item wins on duplicates (unlike close,
/// which sums lines; the pattern view wants the final say of the counter).
/// Results sort ascending by mean variance, worst loss first.
pub fn analyze_variance_patterns(
    ledger: &dyn LedgerStore,
    sessions: &dyn SessionStore,
    catalog: &dyn ItemCatalog,
    location_id: LocationId,
    session_count: usize,
) -> DomainResult<Vec<VariancePatternItem>> {
    let recent = sessions.recent_closed(location_id, session_count)?;
    if recent.len() < 2 {
        return Ok(Vec::new());
    }

    // item -> chronological variances across the sessions it appears in
    let mut series_by_item: HashMap<InventoryItemId, Vec<Decimal>> = HashMap::new();

    for session in &recent {
        let mut counted_by_item: HashMap<InventoryItemId, Decimal> = HashMap::new();
        for line in sessions.lines(session.id)? {
            // Last line wins: later entries overwrite.
            counted_by_item.insert(line.inventory_item_id, line.actual.quantity());
        }

        for (item_id, counted) in counted_by_item {
            let theoretical =
                ledger.sum_deltas(item_id, TimeWindow::as_of(session.started_ts))?;
            series_by_item
                .entry(item_id)
                .or_default()
                .push(counted - theoretical);
        }
    }

    let mut items: Vec<VariancePatternItem> = series_by_item
        .into_iter()
        .map(|(item_id, variances)| VariancePatternItem {
            item_id,
            item_name: catalog.display_name(item_id),
            appearances: variances.len(),
            mean_variance: mean(&variances),
            trend: classify_trend(&variances),
            is_shrinkage_suspect: is_shrinkage_suspect(&variances),
            variances,
        })
        .collect();

    items.sort_by(|a, b| {
        a.mean_variance
            .cmp(&b.mean_variance)
            .then_with(|| a.item_id.cmp(&b.item_id))
    });
    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn trend_improving_when_second_half_rises() {
        let series = vec![dec!(-4), dec!(-5), dec!(-1), dec!(0)];
        assert_eq!(classify_trend(&series), Trend::Improving);
    }

    #[test]
    fn trend_worsening_when_loss_grows() {
        let series = vec![dec!(-1), dec!(0), dec!(-4), dec!(-5)];
        assert_eq!(classify_trend(&series), Trend::Worsening);
    }

    #[test]
    fn trend_stable_within_band() {
        let series = vec![dec!(-2), dec!(-3), dec!(-1), dec!(-4)];
        // halves mean -2.5 each, shift 0
        assert_eq!(classify_trend(&series), Trend::Stable);
    }

    #[test]
    fn trend_of_short_series_is_stable() {
        assert_eq!(classify_trend(&[dec!(-2)]), Trend::Stable);
        assert_eq!(classify_trend(&[]), Trend::Stable);
    }

    #[test]
    fn odd_length_splits_at_midpoint() {
        // mid = 2: first [-6, -6], second [0, 0, 0]; shift +6
        let series = vec![dec!(-6), dec!(-6), dec!(0), dec!(0), dec!(0)];
        assert_eq!(classify_trend(&series), Trend::Improving);
    }

    #[test]
    fn shrinkage_requires_three_appearances() {
        assert!(!is_shrinkage_suspect(&[dec!(-2), dec!(-3)]));
    }

    #[test]
    fn shrinkage_scenario_all_negative() {
        let series = vec![dec!(-2), dec!(-3), dec!(-1), dec!(-4)];
        assert!(is_shrinkage_suspect(&series));
        assert_eq!(classify_trend(&series), Trend::Stable);
    }

    #[test]
    fn shrinkage_needs_majority_of_losses() {
        // mean negative, but only half the observations are losses
        let series = vec![dec!(-10), dec!(-10), dec!(1), dec!(1)];
        assert!(!is_shrinkage_suspect(&series));
    }

    #[test]
    fn shrinkage_needs_negative_mean() {
        let series = vec![dec!(-1), dec!(-1), dec!(-1), dec!(10)];
        assert!(!is_shrinkage_suspect(&series));
    }
}
