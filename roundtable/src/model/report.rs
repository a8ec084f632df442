use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{SessionId, SeverityCounts, TokenCounts};

/// Why a session stopped iterating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoppedBy {
    /// A caller-supplied custom predicate fired.
    CustomPredicate,
    /// No High-severity issues remained in the latest round of reviews.
    NoHighIssues,
    /// `max_iterations` was reached.
    MaxIterations,
    /// The delta between consecutive versions fell below the threshold.
    DeltaThreshold,
    /// The session was cancelled mid-run.
    Cancelled,
}

/// A trimmed-down copy of an `IterationRecord` for the report's history:
/// everything except the raw `Review`s, which the report's
/// `total_issues_identified`/`final_issue_count` fields already
/// summarize and which callers can still fetch per-version from the
/// store if they need the verbatim text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IterationSummary {
    pub iteration: u32,
    pub input_version: u32,
    pub output_version: Option<u32>,
    pub issue_counts: SeverityCounts,
    pub delta: f64,
    pub stopped: bool,
    pub reason: String,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
}

/// Final summary of a completed (or stopped) session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConvergenceReport {
    pub session_id: SessionId,
    pub title: Option<String>,
    pub initial_version: u32,
    pub final_version: u32,
    pub total_iterations: u32,
    /// True for every `stopped_by` except a predicate/cap hit that
    /// still left High-severity issues outstanding — i.e. the document
    /// actually reached a quiet state rather than merely running out of
    /// budget or being cancelled.
    pub converged: bool,
    pub convergence_reason: String,
    pub stopped_by: StoppedBy,
    pub total_issues_identified: usize,
    pub final_issue_count: SeverityCounts,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub history: Vec<IterationSummary>,
    /// Token totals keyed by participant name, plus `"moderator"` and
    /// `"meta_planner"` when those agents reported usage.
    pub token_totals: HashMap<String, TokenCounts>,
    pub participants: Vec<String>,
    /// Name of the delta metric implementation in use.
    pub delta_metric: String,
    pub final_delta: f64,
}

impl ConvergenceReport {
    pub fn total_tokens(&self) -> TokenCounts {
        self.token_totals.values().fold(TokenCounts::default(), |acc, t| acc + *t)
    }
}

impl StoppedBy {
    /// Whether this stop reason represents the document actually
    /// settling, as opposed to running out of budget, being cut off by
    /// a predicate before settling, or being cancelled.
    pub fn is_convergence(self) -> bool {
        matches!(self, StoppedBy::NoHighIssues | StoppedBy::DeltaThreshold)
    }
}
