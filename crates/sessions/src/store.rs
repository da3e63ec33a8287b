//! Session persistence contract.

use chrono::{DateTime, Utc};

use tapledger_core::{DomainResult, LocationId, SessionId, UserId};

use crate::session::{InventorySession, SessionLine};

/// Storage for sessions and their count lines.
///
/// Implementations must:
/// - enforce at most one open session per location on `insert`
/// - reject `add_line` against a closed or missing session
/// - make `close` an atomic open→closed transition that happens exactly
///   once; concurrent closes are serialized and the loser surfaces
///   `PreconditionFailed` (close is non-idempotent: re-running would
///   double-count adjustments)
pub trait SessionStore: Send + Sync {
    fn insert(&self, session: InventorySession) -> DomainResult<()>;

    fn get(&self, session_id: SessionId) -> DomainResult<Option<InventorySession>>;

    fn find_open_for_location(
        &self,
        location_id: LocationId,
    ) -> DomainResult<Option<InventorySession>>;

    fn add_line(&self, line: SessionLine) -> DomainResult<()>;

    /// Lines in append order.
    fn lines(&self, session_id: SessionId) -> DomainResult<Vec<SessionLine>>;

    fn close(
        &self,
        session_id: SessionId,
        ended_ts: DateTime<Utc>,
        closed_by: Option<UserId>,
    ) -> DomainResult<()>;

    /// The last `limit` closed sessions for a location, chronologically
    /// ascending by `started_ts`.
    fn recent_closed(
        &self,
        location_id: LocationId,
        limit: usize,
    ) -> DomainResult<Vec<InventorySession>>;
}

impl<S> SessionStore for std::sync::Arc<S>
where
    S: SessionStore + ?Sized,
{
    fn insert(&self, session: InventorySession) -> DomainResult<()> {
        (**self).insert(session)
    }

    fn get(&self, session_id: SessionId) -> DomainResult<Option<InventorySession>> {
        (**self).get(session_id)
    }

    fn find_open_for_location(
        &self,
        location_id: LocationId,
    ) -> DomainResult<Option<InventorySession>> {
        (**self).find_open_for_location(location_id)
    }

    fn add_line(&self, line: SessionLine) -> DomainResult<()> {
        (**self).add_line(line)
    }

    fn lines(&self, session_id: SessionId) -> DomainResult<Vec<SessionLine>> {
        (**self).lines(session_id)
    }

    fn close(
        &self,
        session_id: SessionId,
        ended_ts: DateTime<Utc>,
        closed_by: Option<UserId>,
    ) -> DomainResult<()> {
        (**self).close(session_id, ended_ts, closed_by)
    }

    fn recent_closed(
        &self,
        location_id: LocationId,
        limit: usize,
    ) -> DomainResult<Vec<InventorySession>> {
        (**self).recent_closed(location_id, limit)
    }
}
