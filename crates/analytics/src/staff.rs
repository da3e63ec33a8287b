//! Per-staff counting accuracy.

use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use tapledger_core::{DomainResult, InventoryItemId, LocationId, UserId};
use tapledger_ledger::{LedgerStore, TimeWindow};
use tapledger_sessions::SessionStore;

use crate::patterns::{Trend, classify_trend};

/// Accuracy score for one counter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StaffAccuracy {
    pub user_id: UserId,
    pub lines_counted: u64,
    pub lines_with_variance: u64,
    /// `1 - lines_with_variance / lines_counted`.
    pub accuracy: Decimal,
    pub trend: Trend,
}

/// Score each counter over the last `session_count` closed sessions.
///
/// A line "has variance" when its item's reconciled variance in that session
/// is non-zero. The trend applies the shared midpoint rule to each staff
/// member's per-session variance-rate series, negated so that a falling rate
/// reads as improving.
pub fn staff_accuracy(
    ledger: &dyn LedgerStore,
    sessions: &dyn SessionStore,
    location_id: LocationId,
    session_count: usize,
) -> DomainResult<Vec<StaffAccuracy>> {
    let recent = sessions.recent_closed(location_id, session_count)?;

    struct Tally {
        counted: u64,
        with_variance: u64,
        session_rates: Vec<Decimal>,
    }
    let mut by_staff: HashMap<UserId, Tally> = HashMap::new();

    for session in &recent {
        let lines = sessions.lines(session.id)?;

        // Per-item variance for this session (last line wins, as in pattern
        // detection).
        let mut counted_by_item: HashMap<InventoryItemId, Decimal> = HashMap::new();
        for line in &lines {
            counted_by_item.insert(line.inventory_item_id, line.actual.quantity());
        }
        let mut item_has_variance: HashMap<InventoryItemId, bool> = HashMap::new();
        for (item_id, counted) in &counted_by_item {
            let theoretical =
                ledger.sum_deltas(*item_id, TimeWindow::as_of(session.started_ts))?;
            item_has_variance.insert(*item_id, *counted != theoretical);
        }

        let mut session_counts: HashMap<UserId, (u64, u64)> = HashMap::new();
        for line in &lines {
            let Some(user_id) = line.counted_by else {
                continue;
            };
            let entry = session_counts.entry(user_id).or_insert((0, 0));
            entry.0 += 1;
            if item_has_variance
                .get(&line.inventory_item_id)
                .copied()
                .unwrap_or(false)
            {
                entry.1 += 1;
            }
        }

        for (user_id, (counted, with_variance)) in session_counts {
            let tally = by_staff.entry(user_id).or_insert(Tally {
                counted: 0,
                with_variance: 0,
                session_rates: Vec::new(),
            });
            tally.counted += counted;
            tally.with_variance += with_variance;
            tally
                .session_rates
                .push(Decimal::from(with_variance) / Decimal::from(counted));
        }
    }

    let mut scores: Vec<StaffAccuracy> = by_staff
        .into_iter()
        .map(|(user_id, tally)| {
            let accuracy = Decimal::ONE
                - Decimal::from(tally.with_variance) / Decimal::from(tally.counted.max(1));
            // Lower variance rate is better; negate so the shared rule's
            // "higher = improving" reads correctly.
            let negated: Vec<Decimal> = tally.session_rates.iter().map(|r| -*r).collect();
            StaffAccuracy {
                user_id,
                lines_counted: tally.counted,
                lines_with_variance: tally.with_variance,
                accuracy,
                trend: classify_trend(&negated),
            }
        })
        .collect();

    scores.sort_by(|a, b| {
        a.accuracy
            .cmp(&b.accuracy)
            .then_with(|| a.user_id.cmp(&b.user_id))
    });
    Ok(scores)
}
