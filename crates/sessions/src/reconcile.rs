//! Session close: physical counts reconciled against the ledger.
//!
//! Theoretical on-hand is anchored at **session start**: the count is a
//! snapshot taken during the session window, so depletion recorded after the
//! session opened must not contaminate the comparison.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use tapledger_core::{
    DomainError, DomainResult, InventoryItemId, ItemCatalog, LocationId, SessionId, SessionLineId,
    SubAreaId, Uom, UserId,
};
use tapledger_ledger::{
    ConfidenceLevel, EventType, LedgerStore, NewEvent, SourceSystem, TimeWindow, VarianceReason,
};

use crate::session::{ActualValue, InventorySession, SessionLine};
use crate::store::SessionStore;

/// Reconciliation tunables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcilePolicy {
    /// Absolute variance above which an operator reason is required
    /// (whenever theoretical stock is non-zero).
    pub variance_threshold: Decimal,
}

impl Default for ReconcilePolicy {
    fn default() -> Self {
        Self {
            variance_threshold: Decimal::from(5),
        }
    }
}

/// Per-item variance figures, shared by preview and close.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemVariance {
    pub item_id: InventoryItemId,
    pub item_name: String,
    pub actual: Decimal,
    pub theoretical: Decimal,
    pub variance: Decimal,
    pub variance_percent: Decimal,
}

/// One adjustment emitted by a close.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdjustmentDetail {
    pub item_id: InventoryItemId,
    pub item_name: String,
    pub variance: Decimal,
    pub variance_percent: Decimal,
    pub reason: Option<VarianceReason>,
}

/// Result of a successful close.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CloseSummary {
    pub session_id: SessionId,
    pub adjustments_created: u64,
    /// Sum of absolute variances across all counted items.
    pub total_variance: Decimal,
    pub adjustments: Vec<AdjustmentDetail>,
}

/// Drives the open → closed lifecycle and emits adjustment events.
pub struct ReconcileEngine<'a> {
    ledger: &'a dyn LedgerStore,
    sessions: &'a dyn SessionStore,
    catalog: &'a dyn ItemCatalog,
    policy: ReconcilePolicy,
}

impl<'a> ReconcileEngine<'a> {
    pub fn new(
        ledger: &'a dyn LedgerStore,
        sessions: &'a dyn SessionStore,
        catalog: &'a dyn ItemCatalog,
        policy: ReconcilePolicy,
    ) -> Self {
        Self {
            ledger,
            sessions,
            catalog,
            policy,
        }
    }

    /// Open a session for a location.
    ///
    /// At most one session may be open per location: a still-open session is
    /// force-closed here without reconciliation (no adjustments, no reason
    /// gate), matching the day-end expiry behavior's bookkeeping.
    pub fn open_session(
        &self,
        location_id: LocationId,
        created_by: Option<UserId>,
        now: DateTime<Utc>,
    ) -> DomainResult<InventorySession> {
        if let Some(stale) = self.sessions.find_open_for_location(location_id)? {
            tracing::warn!(
                session = %stale.id,
                %location_id,
                "force-closing stale open session without reconciliation"
            );
            self.sessions.close(stale.id, now, None)?;
        }

        let session = InventorySession::open(location_id, created_by, now);
        self.sessions.insert(session.clone())?;
        tracing::info!(session = %session.id, %location_id, "opened count session");
        Ok(session)
    }

    /// Append one count line to an open session.
    pub fn add_line(
        &self,
        session_id: SessionId,
        item_id: InventoryItemId,
        actual: ActualValue,
        sub_area_id: Option<SubAreaId>,
        counted_by: Option<UserId>,
        now: DateTime<Utc>,
    ) -> DomainResult<SessionLineId> {
        actual.validate()?;
        let session = self.require_open(session_id)?;

        let line = SessionLine {
            id: SessionLineId::new(),
            session_id: session.id,
            inventory_item_id: item_id,
            actual,
            sub_area_id,
            counted_by,
            recorded_at: now,
        };
        let line_id = line.id;
        self.sessions.add_line(line)?;
        Ok(line_id)
    }

    /// Read-only variance preview: aggregation + theoretical + variance,
    /// without writing events or enforcing the reason threshold.
    pub fn preview_close(&self, session_id: SessionId) -> DomainResult<Vec<ItemVariance>> {
        let session = self.require_open(session_id)?;
        self.compute_variances(&session)
    }

    /// Close a session, emitting one adjustment event per non-zero variance.
    ///
    /// Items whose absolute variance exceeds the policy threshold (against
    /// non-zero theoretical stock) must carry a reason in `reasons`;
    /// otherwise the whole close fails with `ReconciliationIncomplete` and
    /// nothing is committed.
    pub fn close_session(
        &self,
        session_id: SessionId,
        reasons: &HashMap<InventoryItemId, VarianceReason>,
        closed_by: Option<UserId>,
        now: DateTime<Utc>,
    ) -> DomainResult<CloseSummary> {
        let session = self.require_open(session_id)?;
        let variances = self.compute_variances(&session)?;

        let requires_reasons: Vec<InventoryItemId> = variances
            .iter()
            .filter(|v| {
                !v.theoretical.is_zero()
                    && v.variance.abs() > self.policy.variance_threshold
                    && !reasons.contains_key(&v.item_id)
            })
            .map(|v| v.item_id)
            .collect();

        if !requires_reasons.is_empty() {
            return Err(DomainError::requires_reasons(requires_reasons));
        }

        self.commit_close(&session, &variances, |item_id| reasons.get(&item_id).copied(), closed_by, now)
    }

    /// Day-end expiry: close with the fixed `session_expired` reason on every
    /// item, skipping the reason gate entirely. `closed_by` stays `None` to
    /// mark a system close.
    pub fn auto_close_session(
        &self,
        session_id: SessionId,
        now: DateTime<Utc>,
    ) -> DomainResult<CloseSummary> {
        let session = self.require_open(session_id)?;
        let variances = self.compute_variances(&session)?;
        self.commit_close(
            &session,
            &variances,
            |_| Some(VarianceReason::SessionExpired),
            None,
            now,
        )
    }

    fn require_open(&self, session_id: SessionId) -> DomainResult<InventorySession> {
        let session = self
            .sessions
            .get(session_id)?
            .ok_or_else(|| DomainError::not_found(format!("session {session_id}")))?;
        if session.is_closed() {
            return Err(DomainError::precondition(format!(
                "session {session_id} already closed"
            )));
        }
        Ok(session)
    }

    /// Steps 1–3 of the close protocol: aggregate lines by item (additive
    /// across duplicate lines), derive theoretical on-hand at session start,
    /// subtract.
    fn compute_variances(&self, session: &InventorySession) -> DomainResult<Vec<ItemVariance>> {
        let lines = self.sessions.lines(session.id)?;

        let mut actual_by_item: BTreeMap<InventoryItemId, Decimal> = BTreeMap::new();
        for line in &lines {
            *actual_by_item
                .entry(line.inventory_item_id)
                .or_insert(Decimal::ZERO) += line.actual.quantity();
        }

        let mut variances = Vec::with_capacity(actual_by_item.len());
        for (item_id, actual) in actual_by_item {
            let theoretical = self
                .ledger
                .sum_deltas(item_id, TimeWindow::as_of(session.started_ts))?;
            let variance = actual - theoretical;
            variances.push(ItemVariance {
                item_id,
                item_name: self.catalog.display_name(item_id),
                actual,
                theoretical,
                variance,
                variance_percent: variance_percent(variance, theoretical),
            });
        }
        Ok(variances)
    }

    /// Steps 5–6: write adjustments and flip the session closed.
    ///
    /// The close transition runs first: it is the store's serialization
    /// point, so a concurrent close loses there before any event lands. In a
    /// relational deployment both writes share one transaction.
    fn commit_close(
        &self,
        session: &InventorySession,
        variances: &[ItemVariance],
        reason_for: impl Fn(InventoryItemId) -> Option<VarianceReason>,
        closed_by: Option<UserId>,
        now: DateTime<Utc>,
    ) -> DomainResult<CloseSummary> {
        let mut events = Vec::new();
        let mut adjustments = Vec::new();
        let mut total_variance = Decimal::ZERO;

        for v in variances {
            total_variance += v.variance.abs();
            if v.variance.is_zero() {
                continue;
            }

            let reason = reason_for(v.item_id);
            let uom = self
                .catalog
                .get(v.item_id)?
                .map(|info| info.base_uom)
                .unwrap_or(Uom::Units);

            let mut event = NewEvent::new(
                session.location_id,
                v.item_id,
                EventType::InventoryCountAdjustment,
                v.variance,
                uom,
                now,
                ConfidenceLevel::Measured,
            )
            .with_source(SourceSystem::Manual)
            .with_notes(format!("session {} adjustment", session.id));
            if let Some(reason) = reason {
                event = event.with_variance_reason(reason);
            }
            events.push(event);

            adjustments.push(AdjustmentDetail {
                item_id: v.item_id,
                item_name: v.item_name.clone(),
                variance: v.variance,
                variance_percent: v.variance_percent,
                reason,
            });
        }

        self.sessions.close(session.id, now, closed_by)?;
        let adjustments_created = self.ledger.append_batch(events)?.len() as u64;

        tracing::info!(
            session = %session.id,
            adjustments_created,
            %total_variance,
            "closed count session"
        );

        Ok(CloseSummary {
            session_id: session.id,
            adjustments_created,
            total_variance,
            adjustments,
        })
    }
}

/// Variance relative to theoretical stock, in percent. Zero theoretical
/// yields zero (no meaningful base).
pub fn variance_percent(variance: Decimal, theoretical: Decimal) -> Decimal {
    if theoretical.is_zero() {
        Decimal::ZERO
    } else {
        variance / theoretical.abs() * Decimal::from(100)
    }
}
