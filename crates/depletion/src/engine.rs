//! Converts canonical sales/flow records into ledger events.
//!
//! Key principles, unchanged from the ledger's contract:
//! 1. POS-agnostic: only consumes canonical `SalesLine` records
//! 2. Idempotent: safe to re-run over the same window
//! 3. Immutable: creates events, never updates them
//! 4. Auditable: every event links back to its source record

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tapledger_core::{DomainResult, LocationId};
use tapledger_ledger::{ConfidenceLevel, EventType, LedgerStore, NewEvent};

use crate::mapping::MappingResolver;
use crate::sales::{RecordKind, SalesLine, SalesLineSource};

/// Outcome counts for one depletion run.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepletionStats {
    /// Records examined (excludes ones already processed).
    pub processed: u64,
    /// Ledger events created.
    pub created: u64,
    /// Records with no active mapping at their timestamp (skipped, not failed).
    pub unmapped: u64,
    /// Records that already had ledger events (idempotency hits).
    pub skipped: u64,
}

/// Batch processor for a location + time window.
pub struct DepletionEngine<'a> {
    ledger: &'a dyn LedgerStore,
    sales: &'a dyn SalesLineSource,
    mappings: &'a dyn MappingResolver,
}

impl<'a> DepletionEngine<'a> {
    pub fn new(
        ledger: &'a dyn LedgerStore,
        sales: &'a dyn SalesLineSource,
        mappings: &'a dyn MappingResolver,
    ) -> Self {
        Self {
            ledger,
            sales,
            mappings,
        }
    }

    /// Process every record in `[from_ts, to_ts)`.
    ///
    /// `deadline` is checked between records; on expiry the partial stats are
    /// returned. Already-written events are fine to leave behind: re-running
    /// the window skips them via the sales-line idempotency key.
    pub fn run(
        &self,
        location_id: LocationId,
        from_ts: DateTime<Utc>,
        to_ts: DateTime<Utc>,
        deadline: Option<DateTime<Utc>>,
    ) -> DomainResult<DepletionStats> {
        tracing::info!(%location_id, %from_ts, %to_ts, "processing sales window");

        let lines = self.sales.lines_in_window(location_id, from_ts, to_ts)?;
        let mut stats = DepletionStats::default();

        for line in &lines {
            if let Some(deadline) = deadline {
                if Utc::now() >= deadline {
                    tracing::warn!(
                        %location_id,
                        ?stats,
                        "deadline reached, returning partial depletion progress"
                    );
                    break;
                }
            }

            if !self.ledger.find_by_sales_line(line.id)?.is_empty() {
                stats.skipped += 1;
                continue;
            }

            stats.processed += 1;

            if line.is_cancelled() {
                tracing::debug!(sales_line = %line.id, "voided/refunded record, no depletion");
                continue;
            }

            let mapping = self.mappings.resolve(
                location_id,
                line.source_system,
                &line.pos_item_id,
                line.sold_at,
            )?;

            let Some(mapping) = mapping else {
                tracing::debug!(pos_item = %line.pos_item_id, "no active mapping");
                stats.unmapped += 1;
                continue;
            };

            stats.created += self.deplete(line, &mapping)?;
        }

        tracing::info!(%location_id, ?stats, "depletion complete");
        Ok(stats)
    }

    /// Emit the ledger events for one record. Recipe mappings fan out into
    /// several events; the batch commits atomically so a record is either
    /// fully depleted or untouched.
    fn deplete(
        &self,
        line: &SalesLine,
        mapping: &crate::mapping::ItemMapping,
    ) -> DomainResult<u64> {
        let event_type = match line.kind {
            RecordKind::Sale => EventType::PosSale,
            RecordKind::TapFlow => EventType::TapFlow,
        };

        let events: Vec<NewEvent> = mapping
            .components(line.quantity)
            .into_iter()
            .map(|component| {
                let mut event = NewEvent::new(
                    line.location_id,
                    component.item_id,
                    event_type,
                    -component.quantity,
                    component.uom,
                    line.sold_at,
                    ConfidenceLevel::Theoretical,
                )
                .with_source(line.source_system)
                .with_sales_line(line.id)
                .with_notes(format!("POS sale: {}", line.pos_item_name));
                if let Some(receipt_id) = &line.receipt_id {
                    event = event.with_receipt(receipt_id.clone());
                }
                event
            })
            .collect();

        let created = self.ledger.append_batch(events)?.len() as u64;
        tracing::debug!(sales_line = %line.id, created, "depleted record");
        Ok(created)
    }
}
