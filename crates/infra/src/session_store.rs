//! In-memory session storage.
//!
//! A single lock guards sessions and their lines, which makes the
//! open→closed transition the serialization point concurrent closes race on.

use std::collections::HashMap;
use std::sync::RwLock;

use chrono::{DateTime, Utc};

use tapledger_core::{DomainError, DomainResult, LocationId, SessionId, UserId};
use tapledger_sessions::{InventorySession, SessionLine, SessionStore};

#[derive(Debug, Default)]
struct Inner {
    sessions: HashMap<SessionId, InventorySession>,
    lines: HashMap<SessionId, Vec<SessionLine>>,
}

/// In-memory session store (tests/dev).
#[derive(Debug, Default)]
pub struct InMemorySessionStore {
    inner: RwLock<Inner>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> DomainResult<std::sync::RwLockReadGuard<'_, Inner>> {
        self.inner
            .read()
            .map_err(|_| DomainError::conflict("session lock poisoned"))
    }

    fn write(&self) -> DomainResult<std::sync::RwLockWriteGuard<'_, Inner>> {
        self.inner
            .write()
            .map_err(|_| DomainError::conflict("session lock poisoned"))
    }
}

impl SessionStore for InMemorySessionStore {
    fn insert(&self, session: InventorySession) -> DomainResult<()> {
        let mut inner = self.write()?;
        if !session.is_closed() {
            if let Some(open) = inner
                .sessions
                .values()
                .find(|s| s.location_id == session.location_id && !s.is_closed())
            {
                return Err(DomainError::precondition(format!(
                    "location {} already has open session {}",
                    session.location_id, open.id
                )));
            }
        }
        inner.sessions.insert(session.id, session);
        Ok(())
    }

    fn get(&self, session_id: SessionId) -> DomainResult<Option<InventorySession>> {
        Ok(self.read()?.sessions.get(&session_id).cloned())
    }

    fn find_open_for_location(
        &self,
        location_id: LocationId,
    ) -> DomainResult<Option<InventorySession>> {
        Ok(self
            .read()?
            .sessions
            .values()
            .find(|s| s.location_id == location_id && !s.is_closed())
            .cloned())
    }

    fn add_line(&self, line: SessionLine) -> DomainResult<()> {
        let mut inner = self.write()?;
        let session = inner
            .sessions
            .get(&line.session_id)
            .ok_or_else(|| DomainError::not_found(format!("session {}", line.session_id)))?;
        if session.is_closed() {
            return Err(DomainError::precondition(format!(
                "session {} already closed",
                line.session_id
            )));
        }
        inner.lines.entry(line.session_id).or_default().push(line);
        Ok(())
    }

    fn lines(&self, session_id: SessionId) -> DomainResult<Vec<SessionLine>> {
        Ok(self
            .read()?
            .lines
            .get(&session_id)
            .cloned()
            .unwrap_or_default())
    }

    fn close(
        &self,
        session_id: SessionId,
        ended_ts: DateTime<Utc>,
        closed_by: Option<UserId>,
    ) -> DomainResult<()> {
        let mut inner = self.write()?;
        let session = inner
            .sessions
            .get_mut(&session_id)
            .ok_or_else(|| DomainError::not_found(format!("session {session_id}")))?;
        if session.is_closed() {
            return Err(DomainError::precondition(format!(
                "session {session_id} already closed"
            )));
        }
        session.ended_ts = Some(ended_ts);
        session.closed_by = closed_by;
        Ok(())
    }

    fn recent_closed(
        &self,
        location_id: LocationId,
        limit: usize,
    ) -> DomainResult<Vec<InventorySession>> {
        let inner = self.read()?;
        let mut closed: Vec<InventorySession> = inner
            .sessions
            .values()
            .filter(|s| s.location_id == location_id && s.is_closed())
            .cloned()
            .collect();
        closed.sort_by_key(|s| s.started_ts);
        let skip = closed.len().saturating_sub(limit);
        Ok(closed.split_off(skip))
    }
}
