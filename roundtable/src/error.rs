//! Top-level error taxonomy for the roundtable engine.

use thiserror::Error;

use crate::llm::LlmError;
use crate::store::StoreError;

/// The seven-category error taxonomy a session can surface.
#[derive(Debug, Error)]
pub enum RoundtableError {
    #[error("invalid input: {0}")]
    InputValidation(String),

    #[error("transient LLM failure: {0}")]
    TransientLlm(#[source] LlmError),

    #[error("fatal LLM failure: {0}")]
    FatalLlm(#[source] LlmError),

    #[error("malformed review from participant {participant}: {reason}")]
    MalformedReview { participant: String, reason: String },

    #[error("reviews/participants mismatch: {0}")]
    ReviewParticipantMismatch(String),

    #[error("store write failed: {0}")]
    StoreWriteFailure(#[from] StoreError),

    #[error("meta-planner failed: {0}")]
    PlannerFailure(String),

    #[error("session cancelled")]
    CancelRequested,

    #[error("conflicting operation: {0}")]
    Conflict(String),

    #[error("session not found: {0}")]
    NotFound(String),
}

impl RoundtableError {
    /// Map a `StoreError` arising from a read path: not-found is its
    /// own category (§6/§7), distinct from a write failure, so
    /// `SessionNotFound`/`VersionNotFound` become `NotFound` here
    /// rather than falling through to `StoreWriteFailure`.
    pub(crate) fn from_store_read(err: StoreError) -> Self {
        match err {
            StoreError::SessionNotFound(id) => RoundtableError::NotFound(id.to_string()),
            StoreError::VersionNotFound { session_id, version } => {
                RoundtableError::NotFound(format!("session {session_id} version {version}"))
            }
            other => RoundtableError::StoreWriteFailure(other),
        }
    }
}

pub type RoundtableResult<T> = Result<T, RoundtableError>;
