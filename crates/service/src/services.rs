//! `CoreServices` — the operation surface the out-of-scope transport layer
//! (HTTP/RPC) calls into. One method per public operation contract; each
//! executes as a single logical unit of work against the stores.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use tapledger_analytics::{
    AdjustmentHeatmap, ReasonShare, StaffAccuracy, VariancePatternItem, VarianceReport,
};
use tapledger_core::{
    DomainResult, EventId, InventoryItemId, ItemCatalog, LocationId, ParLevelId, PriceResolver,
    SessionId, SessionLineId, SubAreaId, Uom, UserId,
};
use tapledger_depletion::{DepletionEngine, DepletionStats, MappingResolver, SalesLineSource};
use tapledger_forecast::{
    ForecastDetail, ForecastEngine, ItemForecast, ParLevel, ParLevelStore, ReorderSuggestion,
};
use tapledger_ledger::{
    ConfidenceLevel, CorrectionOutcome, EventType, LedgerStore, NewEvent, SourceSystem, TimeWindow,
    VarianceReason, correct_event,
};
use tapledger_sessions::{
    ActualValue, CloseSummary, ItemVariance, ReconcileEngine, ReconcilePolicy, SessionStore,
};

/// How many closed sessions analytics look back over by default.
const DEFAULT_SESSION_LOOKBACK: usize = 10;

/// Payload for `append_event`, used by receiving, transfers and manual
/// adjustments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppendEventRequest {
    pub location_id: LocationId,
    pub inventory_item_id: InventoryItemId,
    pub event_type: EventType,
    pub quantity_delta: Decimal,
    pub uom: Uom,
    pub event_ts: DateTime<Utc>,
    pub confidence_level: ConfidenceLevel,
    pub notes: Option<String>,
}

/// The assembled core: stores plus the collaborators supplied by external
/// surfaces (item management, pricing, POS import, mapping maintenance).
pub struct CoreServices {
    ledger: Arc<dyn LedgerStore>,
    sessions: Arc<dyn SessionStore>,
    pars: Arc<dyn ParLevelStore>,
    catalog: Arc<dyn ItemCatalog>,
    prices: Arc<dyn PriceResolver>,
    mappings: Arc<dyn MappingResolver>,
    sales: Arc<dyn SalesLineSource>,
    policy: ReconcilePolicy,
}

impl CoreServices {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        ledger: Arc<dyn LedgerStore>,
        sessions: Arc<dyn SessionStore>,
        pars: Arc<dyn ParLevelStore>,
        catalog: Arc<dyn ItemCatalog>,
        prices: Arc<dyn PriceResolver>,
        mappings: Arc<dyn MappingResolver>,
        sales: Arc<dyn SalesLineSource>,
    ) -> Self {
        Self {
            ledger,
            sessions,
            pars,
            catalog,
            prices,
            mappings,
            sales,
            policy: ReconcilePolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: ReconcilePolicy) -> Self {
        self.policy = policy;
        self
    }

    fn reconcile_engine(&self) -> ReconcileEngine<'_> {
        ReconcileEngine::new(
            self.ledger.as_ref(),
            self.sessions.as_ref(),
            self.catalog.as_ref(),
            self.policy.clone(),
        )
    }

    fn forecast_engine(&self) -> ForecastEngine<'_> {
        ForecastEngine::new(
            self.ledger.as_ref(),
            self.catalog.as_ref(),
            self.pars.as_ref(),
            self.prices.as_ref(),
        )
    }

    // ---- ledger ----

    /// Record a quantity movement directly (receiving, transfer, manual
    /// adjustment).
    pub fn append_event(&self, request: AppendEventRequest) -> DomainResult<EventId> {
        let mut event = NewEvent::new(
            request.location_id,
            request.inventory_item_id,
            request.event_type,
            request.quantity_delta,
            request.uom,
            request.event_ts,
            request.confidence_level,
        )
        .with_source(SourceSystem::Manual);
        if let Some(notes) = request.notes {
            event = event.with_notes(notes);
        }

        let stored = self.ledger.append(event)?;
        tracing::info!(
            event = %stored.id,
            item = %stored.inventory_item_id,
            delta = %stored.quantity_delta,
            kind = %stored.event_type,
            "appended ledger event"
        );
        Ok(stored.id)
    }

    /// Reverse-and-replace a previously recorded event.
    pub fn correct_event(
        &self,
        original_event_id: EventId,
        new_quantity_delta: Decimal,
        new_uom: Uom,
        reason: &str,
    ) -> DomainResult<CorrectionOutcome> {
        correct_event(
            &self.ledger,
            original_event_id,
            new_quantity_delta,
            new_uom,
            reason,
            Utc::now(),
        )
    }

    /// Theoretical on-hand for one item right now.
    pub fn on_hand(&self, item_id: InventoryItemId) -> DomainResult<Decimal> {
        self.ledger.sum_deltas(item_id, TimeWindow::as_of(Utc::now()))
    }

    // ---- depletion ----

    /// Process the sales/flow records of a window into consumption events.
    pub fn run_depletion(
        &self,
        location_id: LocationId,
        from_ts: DateTime<Utc>,
        to_ts: DateTime<Utc>,
        deadline: Option<DateTime<Utc>>,
    ) -> DomainResult<DepletionStats> {
        DepletionEngine::new(
            self.ledger.as_ref(),
            self.sales.as_ref(),
            self.mappings.as_ref(),
        )
        .run(location_id, from_ts, to_ts, deadline)
    }

    // ---- sessions ----

    pub fn open_session(
        &self,
        location_id: LocationId,
        created_by: Option<UserId>,
    ) -> DomainResult<SessionId> {
        Ok(self
            .reconcile_engine()
            .open_session(location_id, created_by, Utc::now())?
            .id)
    }

    pub fn add_session_line(
        &self,
        session_id: SessionId,
        item_id: InventoryItemId,
        actual: ActualValue,
        sub_area_id: Option<SubAreaId>,
        counted_by: Option<UserId>,
    ) -> DomainResult<SessionLineId> {
        self.reconcile_engine()
            .add_line(session_id, item_id, actual, sub_area_id, counted_by, Utc::now())
    }

    pub fn preview_close(&self, session_id: SessionId) -> DomainResult<Vec<ItemVariance>> {
        self.reconcile_engine().preview_close(session_id)
    }

    /// Close a session; fails with `ReconciliationIncomplete` when items over
    /// the variance threshold lack reasons.
    pub fn close_session(
        &self,
        session_id: SessionId,
        reasons: &HashMap<InventoryItemId, VarianceReason>,
        closed_by: Option<UserId>,
    ) -> DomainResult<CloseSummary> {
        self.reconcile_engine()
            .close_session(session_id, reasons, closed_by, Utc::now())
    }

    /// Day-end expiry close with the fixed `session_expired` reason.
    pub fn auto_close_session(&self, session_id: SessionId) -> DomainResult<CloseSummary> {
        self.reconcile_engine()
            .auto_close_session(session_id, Utc::now())
    }

    // ---- analytics ----

    pub fn variance_report(
        &self,
        location_id: LocationId,
        from_date: DateTime<Utc>,
        to_date: DateTime<Utc>,
    ) -> DomainResult<VarianceReport> {
        tapledger_analytics::variance_report(
            self.ledger.as_ref(),
            self.catalog.as_ref(),
            self.prices.as_ref(),
            location_id,
            from_date,
            to_date,
        )
    }

    pub fn analyze_variance_patterns(
        &self,
        location_id: LocationId,
        session_count: Option<usize>,
    ) -> DomainResult<Vec<VariancePatternItem>> {
        tapledger_analytics::analyze_variance_patterns(
            self.ledger.as_ref(),
            self.sessions.as_ref(),
            self.catalog.as_ref(),
            location_id,
            session_count.unwrap_or(DEFAULT_SESSION_LOOKBACK),
        )
    }

    pub fn adjustment_heatmap(
        &self,
        location_id: LocationId,
        from_date: DateTime<Utc>,
        to_date: DateTime<Utc>,
    ) -> DomainResult<AdjustmentHeatmap> {
        tapledger_analytics::adjustment_heatmap(
            self.ledger.as_ref(),
            location_id,
            TimeWindow::between(from_date, to_date),
        )
    }

    pub fn reason_distribution(
        &self,
        location_id: LocationId,
        from_date: DateTime<Utc>,
        to_date: DateTime<Utc>,
    ) -> DomainResult<Vec<ReasonShare>> {
        tapledger_analytics::reason_distribution(
            self.ledger.as_ref(),
            location_id,
            TimeWindow::between(from_date, to_date),
        )
    }

    pub fn staff_accuracy(
        &self,
        location_id: LocationId,
        session_count: Option<usize>,
    ) -> DomainResult<Vec<StaffAccuracy>> {
        tapledger_analytics::staff_accuracy(
            self.ledger.as_ref(),
            self.sessions.as_ref(),
            location_id,
            session_count.unwrap_or(DEFAULT_SESSION_LOOKBACK),
        )
    }

    // ---- forecasting / reorder ----

    pub fn forecast(&self, location_id: LocationId) -> DomainResult<Vec<ItemForecast>> {
        self.forecast_engine().forecast_location(location_id, Utc::now())
    }

    pub fn forecast_item_detail(&self, item_id: InventoryItemId) -> DomainResult<ForecastDetail> {
        self.forecast_engine().item_detail(item_id, Utc::now())
    }

    pub fn reorder_suggestions(
        &self,
        location_id: LocationId,
    ) -> DomainResult<Vec<ReorderSuggestion>> {
        tapledger_forecast::reorder_suggestions(
            self.ledger.as_ref(),
            self.catalog.as_ref(),
            self.pars.as_ref(),
            location_id,
            Utc::now(),
        )
    }

    pub fn set_par_level(&self, par: ParLevel) -> DomainResult<ParLevelId> {
        self.pars.upsert(par)
    }

    pub fn deactivate_par_level(&self, par_id: ParLevelId) -> DomainResult<()> {
        self.pars.deactivate(par_id)
    }
}
