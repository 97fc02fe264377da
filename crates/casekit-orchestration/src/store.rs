//! Persistence contract for session and casefile records.
//!
//! The stores are external collaborators: durable, existence-checkable, with
//! no transactional guarantee beyond single-record atomicity. Overlapping
//! writes to the same record are last-writer-wins — the orchestrator adds no
//! locking of its own. [`InMemoryStore`] is the default runtime store and the
//! one every test uses.

use std::collections::HashMap;
use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::RwLock;
use uuid::Uuid;

/// A user session record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub session_id: Uuid,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
    pub last_activity_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub closed_at: Option<DateTime<Utc>>,
}

impl SessionRecord {
    /// Open a fresh session for a user.
    pub fn open(user_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            session_id: Uuid::new_v4(),
            user_id: user_id.into(),
            created_at: now,
            last_activity_at: now,
            closed_at: None,
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed_at.is_some()
    }

    /// Closed, or idle past the policy timeout.
    pub fn is_expired(&self, idle_timeout_secs: u64, now: DateTime<Utc>) -> bool {
        if self.is_closed() {
            return true;
        }
        let idle_for = now - self.last_activity_at;
        idle_for > Duration::seconds(idle_timeout_secs as i64)
    }

    /// Record activity.
    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.last_activity_at = now;
    }

    /// Close the session.
    pub fn close(&mut self, now: DateTime<Utc>) {
        self.closed_at = Some(now);
    }
}

/// A casefile record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CasefileRecord {
    pub casefile_id: Uuid,
    pub owner_id: String,
    pub title: String,
    pub description: String,
    /// Lifecycle status: `open`, `active`, or `closed`.
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CasefileRecord {
    /// Open a new casefile owned by a user.
    pub fn open(owner_id: impl Into<String>, title: impl Into<String>, description: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            casefile_id: Uuid::new_v4(),
            owner_id: owner_id.into(),
            title: title.into(),
            description: description.into(),
            status: "open".to_string(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// Store failures. `NotFound` is reserved for callers that require presence;
/// the `get_*` methods signal absence with `Ok(None)`.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StoreError {
    #[error("record not found: {0}")]
    NotFound(String),
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Session persistence contract.
#[async_trait]
pub trait SessionStore: Send + Sync + fmt::Debug {
    async fn get_session(&self, session_id: Uuid) -> Result<Option<SessionRecord>, StoreError>;
    async fn put_session(&self, session: SessionRecord) -> Result<(), StoreError>;
}

/// Casefile persistence contract.
#[async_trait]
pub trait CasefileStore: Send + Sync + fmt::Debug {
    async fn get_casefile(&self, casefile_id: Uuid) -> Result<Option<CasefileRecord>, StoreError>;
    async fn put_casefile(&self, casefile: CasefileRecord) -> Result<(), StoreError>;
}

/// In-memory store backing the default runtime and the test suites.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    sessions: RwLock<HashMap<Uuid, SessionRecord>>,
    casefiles: RwLock<HashMap<Uuid, CasefileRecord>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for InMemoryStore {
    async fn get_session(&self, session_id: Uuid) -> Result<Option<SessionRecord>, StoreError> {
        Ok(self.sessions.read().await.get(&session_id).cloned())
    }

    async fn put_session(&self, session: SessionRecord) -> Result<(), StoreError> {
        self.sessions
            .write()
            .await
            .insert(session.session_id, session);
        Ok(())
    }
}

#[async_trait]
impl CasefileStore for InMemoryStore {
    async fn get_casefile(&self, casefile_id: Uuid) -> Result<Option<CasefileRecord>, StoreError> {
        Ok(self.casefiles.read().await.get(&casefile_id).cloned())
    }

    async fn put_casefile(&self, casefile: CasefileRecord) -> Result<(), StoreError> {
        self.casefiles
            .write()
            .await
            .insert(casefile.casefile_id, casefile);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_expiry() {
        let mut session = SessionRecord::open("analyst-7");
        let now = Utc::now();
        assert!(!session.is_expired(1800, now));

        session.last_activity_at = now - Duration::seconds(3600);
        assert!(session.is_expired(1800, now));

        session.touch(now);
        assert!(!session.is_expired(1800, now));

        session.close(now);
        assert!(session.is_closed());
        assert!(session.is_expired(1800, now));
    }

    #[tokio::test]
    async fn test_in_memory_session_round_trip() {
        let store = InMemoryStore::new();
        let session = SessionRecord::open("analyst-7");
        let id = session.session_id;

        assert_eq!(store.get_session(id).await.unwrap(), None);
        store.put_session(session.clone()).await.unwrap();
        assert_eq!(store.get_session(id).await.unwrap(), Some(session));
    }

    #[tokio::test]
    async fn test_in_memory_casefile_last_writer_wins() {
        let store = InMemoryStore::new();
        let mut casefile = CasefileRecord::open("analyst-7", "Investigation X", "");
        let id = casefile.casefile_id;
        store.put_casefile(casefile.clone()).await.unwrap();

        casefile.status = "active".to_string();
        store.put_casefile(casefile).await.unwrap();

        let stored = store.get_casefile(id).await.unwrap().unwrap();
        assert_eq!(stored.status, "active");
    }
}
