//! In-memory mapping resolver and sales-line source.

use std::sync::RwLock;

use chrono::{DateTime, Utc};

use tapledger_core::{DomainError, DomainResult, LocationId};
use tapledger_depletion::{ItemMapping, MappingResolver, SalesLine, SalesLineSource};
use tapledger_ledger::SourceSystem;

/// One versioned mapping row.
#[derive(Debug, Clone)]
pub struct MappingRow {
    pub location_id: LocationId,
    pub source_system: SourceSystem,
    pub pos_item_id: String,
    pub mapping: ItemMapping,
    pub active: bool,
    pub effective_from: DateTime<Utc>,
    pub effective_to: Option<DateTime<Utc>>,
}

/// In-memory effective-dated mapping table (tests/dev).
#[derive(Debug, Default)]
pub struct InMemoryMappingResolver {
    rows: RwLock<Vec<MappingRow>>,
}

impl InMemoryMappingResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, row: MappingRow) {
        if let Ok(mut rows) = self.rows.write() {
            rows.push(row);
        }
    }
}

impl MappingResolver for InMemoryMappingResolver {
    fn resolve(
        &self,
        location_id: LocationId,
        source_system: SourceSystem,
        pos_item_id: &str,
        as_of: DateTime<Utc>,
    ) -> DomainResult<Option<ItemMapping>> {
        let rows = self
            .rows
            .read()
            .map_err(|_| DomainError::conflict("mapping lock poisoned"))?;
        Ok(rows
            .iter()
            .find(|r| {
                r.active
                    && r.location_id == location_id
                    && r.source_system == source_system
                    && r.pos_item_id == pos_item_id
                    && r.effective_from <= as_of
                    && r.effective_to.map(|to| to > as_of).unwrap_or(true)
            })
            .map(|r| r.mapping.clone()))
    }
}

/// In-memory canonical sales-line feed (tests/dev).
#[derive(Debug, Default)]
pub struct InMemorySalesLines {
    lines: RwLock<Vec<SalesLine>>,
}

impl InMemorySalesLines {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, line: SalesLine) {
        if let Ok(mut lines) = self.lines.write() {
            lines.push(line);
        }
    }
}

impl SalesLineSource for InMemorySalesLines {
    fn lines_in_window(
        &self,
        location_id: LocationId,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> DomainResult<Vec<SalesLine>> {
        let lines = self
            .lines
            .read()
            .map_err(|_| DomainError::conflict("sales lock poisoned"))?;
        let mut matched: Vec<SalesLine> = lines
            .iter()
            .filter(|l| l.location_id == location_id && l.sold_at >= from && l.sold_at < to)
            .cloned()
            .collect();
        matched.sort_by_key(|l| l.sold_at);
        Ok(matched)
    }
}
