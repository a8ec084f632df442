//! The eleven event kinds a session emits, in the order the driver can
//! produce them. Grounded on the teacher's `EnsembleEvent`
//! (`events/types.rs`): a single tagged enum with per-variant
//! accessor methods rather than a trait-object event hierarchy.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{SessionId, SeverityCounts, StoppedBy, TokenCounts};

/// Severity of a [`RoundtableEvent::Log`] line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RoundtableEvent {
    SessionCreated {
        session_id: SessionId,
        title: Option<String>,
        max_iterations: u32,
        num_participants: usize,
        domain_hint: Option<String>,
        timestamp: DateTime<Utc>,
    },
    /// The meta-planner is generating (or has been given) the role set.
    RoundtableGenerating {
        session_id: SessionId,
        message: String,
        num_participants: usize,
        timestamp: DateTime<Utc>,
    },
    RoundtableGenerated {
        session_id: SessionId,
        participants: Vec<String>,
        moderator_focus: String,
        timestamp: DateTime<Utc>,
    },
    IterationStart {
        session_id: SessionId,
        iteration: u32,
        max_iterations: u32,
        timestamp: DateTime<Utc>,
    },
    CriticReviewStart {
        session_id: SessionId,
        iteration: u32,
        participant_id: String,
        timestamp: DateTime<Utc>,
    },
    CriticReviewComplete {
        session_id: SessionId,
        iteration: u32,
        participant_id: String,
        issues_count: usize,
        counts_by_severity: SeverityCounts,
        top_issues: Vec<String>,
        tokens: TokenCounts,
        timestamp: DateTime<Utc>,
    },
    ConvergenceCheck {
        session_id: SessionId,
        iteration: u32,
        delta: f64,
        issue_counts: SeverityCounts,
        converged: bool,
        reason: String,
        timestamp: DateTime<Utc>,
    },
    ModeratorStart {
        session_id: SessionId,
        iteration: u32,
        timestamp: DateTime<Utc>,
    },
    ModeratorComplete {
        session_id: SessionId,
        iteration: u32,
        resulting_version: u32,
        tokens: TokenCounts,
        timestamp: DateTime<Utc>,
    },
    RefinementComplete {
        session_id: SessionId,
        total_iterations: u32,
        final_version: u32,
        converged: bool,
        stopped_by: Option<StoppedBy>,
        timestamp: DateTime<Utc>,
    },
    Log {
        session_id: Option<SessionId>,
        level: LogLevel,
        source: String,
        message: String,
        timestamp: DateTime<Utc>,
    },
}

impl RoundtableEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            RoundtableEvent::SessionCreated { .. } => "session_created",
            RoundtableEvent::RoundtableGenerating { .. } => "roundtable_generating",
            RoundtableEvent::RoundtableGenerated { .. } => "roundtable_generated",
            RoundtableEvent::IterationStart { .. } => "iteration_start",
            RoundtableEvent::CriticReviewStart { .. } => "critic_review_start",
            RoundtableEvent::CriticReviewComplete { .. } => "critic_review_complete",
            RoundtableEvent::ConvergenceCheck { .. } => "convergence_check",
            RoundtableEvent::ModeratorStart { .. } => "moderator_start",
            RoundtableEvent::ModeratorComplete { .. } => "moderator_complete",
            RoundtableEvent::RefinementComplete { .. } => "refinement_complete",
            RoundtableEvent::Log { .. } => "log",
        }
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            RoundtableEvent::SessionCreated { timestamp, .. }
            | RoundtableEvent::RoundtableGenerating { timestamp, .. }
            | RoundtableEvent::RoundtableGenerated { timestamp, .. }
            | RoundtableEvent::IterationStart { timestamp, .. }
            | RoundtableEvent::CriticReviewStart { timestamp, .. }
            | RoundtableEvent::CriticReviewComplete { timestamp, .. }
            | RoundtableEvent::ConvergenceCheck { timestamp, .. }
            | RoundtableEvent::ModeratorStart { timestamp, .. }
            | RoundtableEvent::ModeratorComplete { timestamp, .. }
            | RoundtableEvent::RefinementComplete { timestamp, .. }
            | RoundtableEvent::Log { timestamp, .. } => *timestamp,
        }
    }

    pub fn session_id(&self) -> Option<SessionId> {
        match self {
            RoundtableEvent::SessionCreated { session_id, .. }
            | RoundtableEvent::RoundtableGenerating { session_id, .. }
            | RoundtableEvent::RoundtableGenerated { session_id, .. }
            | RoundtableEvent::IterationStart { session_id, .. }
            | RoundtableEvent::CriticReviewStart { session_id, .. }
            | RoundtableEvent::CriticReviewComplete { session_id, .. }
            | RoundtableEvent::ConvergenceCheck { session_id, .. }
            | RoundtableEvent::ModeratorStart { session_id, .. }
            | RoundtableEvent::ModeratorComplete { session_id, .. }
            | RoundtableEvent::RefinementComplete { session_id, .. } => Some(*session_id),
            RoundtableEvent::Log { session_id, .. } => *session_id,
        }
    }

    pub fn log(session_id: Option<SessionId>, level: LogLevel, source: impl Into<String>, message: impl Into<String>) -> Self {
        RoundtableEvent::Log {
            session_id,
            level,
            source: source.into(),
            message: message.into(),
            timestamp: Utc::now(),
        }
    }
}
