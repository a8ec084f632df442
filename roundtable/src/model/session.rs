use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{ConvergenceReport, DocumentVersion, IterationRecord, Participant, TokenCounts};

/// Newtype wrapper around a session identifier, mirroring the teacher's
/// `SessionId`/`TaskId` convention with a thin type for stronger typing
/// at call sites.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for SessionId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// Lifecycle state of a session, independent of the driver's internal
/// state machine (see `runtime::state_machine`) — this is the
/// caller-visible status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Pending,
    Planning,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl SessionStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            SessionStatus::Completed | SessionStatus::Failed | SessionStatus::Cancelled
        )
    }
}

/// The full persisted state of a refinement session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: SessionId,
    pub status: SessionStatus,
    pub participants: Vec<Participant>,
    /// Short title the meta-planner was given for this session's
    /// moderator, e.g. "resolve High issues while preserving the
    /// document's existing voice". Empty until planning completes.
    #[serde(default)]
    pub moderator_focus: String,
    /// Tokens the meta-planner itself consumed producing
    /// `participants`/`moderator_focus`. Zero when `role_specs` were
    /// supplied explicitly and the planner never ran.
    #[serde(default)]
    pub planner_tokens: TokenCounts,
    /// The `max_iterations` this (or the most recent `continue`) run
    /// was configured with — needed by `status()` independent of
    /// whether the driver is still running.
    #[serde(default)]
    pub max_iterations: u32,
    pub versions: Vec<DocumentVersion>,
    pub iterations: Vec<IterationRecord>,
    pub report: Option<ConvergenceReport>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Session {
    pub fn new(id: SessionId, initial_version: DocumentVersion, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            status: SessionStatus::Pending,
            participants: Vec::new(),
            moderator_focus: String::new(),
            planner_tokens: TokenCounts::default(),
            max_iterations: 0,
            versions: vec![initial_version],
            iterations: Vec::new(),
            report: None,
            created_at,
            updated_at: created_at,
        }
    }

    pub fn latest_version(&self) -> &DocumentVersion {
        self.versions.last().expect("session always has >=1 version")
    }

    /// Total tokens consumed per contributor across the whole session:
    /// one entry per reviewer participant name, plus `"moderator"` and
    /// `"meta_planner"` when those agents reported non-zero usage.
    pub fn token_totals_by_participant(&self) -> HashMap<String, TokenCounts> {
        let mut totals: HashMap<String, TokenCounts> = HashMap::new();
        for iteration in &self.iterations {
            for review in &iteration.reviews {
                *totals.entry(review.participant_id.clone()).or_default() += review.token_counts;
            }
            if iteration.moderator_tokens.total() > 0 {
                *totals.entry("moderator".to_string()).or_default() += iteration.moderator_tokens;
            }
        }
        if self.planner_tokens.total() > 0 {
            *totals.entry("meta_planner".to_string()).or_default() += self.planner_tokens;
        }
        totals
    }

    /// Sum of every reviewer's `token_counts` across the whole session,
    /// excluding moderator and meta-planner usage — see `total_tokens`
    /// for the full P7 accounting.
    pub fn total_reviewer_tokens(&self) -> TokenCounts {
        self.iterations
            .iter()
            .fold(TokenCounts::default(), |acc, it| acc + it.reviewer_tokens())
    }

    /// Sum of reviewer + moderator + meta-planner token usage across
    /// the whole session (spec §8 P7).
    pub fn total_tokens(&self) -> TokenCounts {
        self.token_totals_by_participant()
            .into_values()
            .fold(TokenCounts::default(), |acc, t| acc + t)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{DocumentVersion, Review};

    fn review(participant_id: &str, prompt: u64, completion: u64) -> Review {
        Review {
            participant_id: participant_id.into(),
            issues: vec![],
            summary: "ok".into(),
            approved: true,
            token_counts: TokenCounts::new(prompt, completion),
            timestamp: Utc::now(),
        }
    }

    fn iteration(reviews: Vec<Review>, moderator_tokens: TokenCounts) -> IterationRecord {
        let now = Utc::now();
        IterationRecord {
            iteration: 1,
            input_version: 1,
            reviews,
            output_version: Some(2),
            delta: 0.0,
            convergence_reason: String::new(),
            moderator_tokens,
            started_at: now,
            finished_at: now,
        }
    }

    #[test]
    fn sums_tokens_per_participant_across_iterations() {
        let now = Utc::now();
        let mut session = Session::new(SessionId::new(), DocumentVersion::initial("draft", now), now);
        session.iterations.push(iteration(
            vec![review("r1", 10, 5), review("r2", 20, 5)],
            TokenCounts::default(),
        ));
        session.iterations.push(iteration(vec![review("r1", 3, 2)], TokenCounts::default()));

        let totals = session.token_totals_by_participant();
        assert_eq!(totals["r1"].total(), 20);
        assert_eq!(totals["r2"].total(), 25);
        assert_eq!(session.total_reviewer_tokens().total(), 45);
    }

    #[test]
    fn total_tokens_includes_moderator_and_planner() {
        let now = Utc::now();
        let mut session = Session::new(SessionId::new(), DocumentVersion::initial("draft", now), now);
        session.planner_tokens = TokenCounts::new(50, 10);
        session.iterations.push(iteration(vec![review("r1", 10, 5)], TokenCounts::new(7, 3)));

        let totals = session.token_totals_by_participant();
        assert_eq!(totals["moderator"].total(), 10);
        assert_eq!(totals["meta_planner"].total(), 60);
        assert_eq!(session.total_tokens().total(), 15 + 10 + 60);
    }
}
