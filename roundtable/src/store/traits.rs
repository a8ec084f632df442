//! The `Store` trait: persisted session state.
//!
//! Grounded on the teacher's `state/store.rs` operation shapes
//! (typed put/get wrappers per logical collection) but backed by a
//! plain file tree rather than RocksDB column families, matching the
//! literal layout SPEC_FULL.md §6 requires: each record individually
//! retrievable and atomically written.

use async_trait::async_trait;
use thiserror::Error;

use crate::model::{ConvergenceReport, DocumentVersion, Review, Session, SessionId};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("session not found: {0}")]
    SessionNotFound(SessionId),

    #[error("version {version} not found for session {session_id}")]
    VersionNotFound { session_id: SessionId, version: u32 },

    #[error("session already exists: {0}")]
    AlreadyExists(SessionId),

    #[error("version {attempted} is not the next version for session {session_id} (expected {expected})")]
    NonSequentialVersion {
        session_id: SessionId,
        expected: u32,
        attempted: u32,
    },
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Persisted state for refinement sessions. Every method is
/// independently atomic with respect to the artifact it touches —
/// writing version 3 cannot corrupt version 2, and a crash mid-write
/// never leaves a partially-written file visible to readers.
#[async_trait]
pub trait Store: Send + Sync {
    async fn create_session(&self, session: &Session) -> StoreResult<()>;
    async fn save_session(&self, session: &Session) -> StoreResult<()>;
    async fn get_session(&self, id: SessionId) -> StoreResult<Session>;
    async fn list_sessions(&self) -> StoreResult<Vec<SessionId>>;
    async fn delete_session(&self, id: SessionId) -> StoreResult<()>;

    async fn put_version(&self, id: SessionId, version: &DocumentVersion) -> StoreResult<()>;
    async fn get_version(&self, id: SessionId, version: u32) -> StoreResult<DocumentVersion>;

    async fn put_reviews(&self, id: SessionId, version: u32, reviews: &[Review]) -> StoreResult<()>;
    async fn get_reviews(&self, id: SessionId, version: u32) -> StoreResult<Vec<Review>>;

    async fn put_report(&self, id: SessionId, report: &ConvergenceReport) -> StoreResult<()>;
    async fn get_report(&self, id: SessionId) -> StoreResult<Option<ConvergenceReport>>;
}
