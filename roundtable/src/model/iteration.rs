use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Review, TokenCounts};

/// The outcome of a single refinement iteration: the reviews collected
/// against the input version, the convergence measurement taken
/// against the previous pair of versions, and — only if the loop
/// decided to continue — the version the moderator produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IterationRecord {
    pub iteration: u32,
    /// Version this iteration's reviews were collected against.
    pub input_version: u32,
    pub reviews: Vec<Review>,
    /// Version produced by the moderator at the end of this iteration.
    /// `None` when convergence stopped the loop before the moderator
    /// ran — per spec, a stopped iteration is never moderated.
    pub output_version: Option<u32>,
    /// Delta between `input_version` and the version before it.
    /// Always `0.0` on iteration 1 (spec open question 2): there is no
    /// prior version to compare against yet.
    pub delta: f64,
    /// Why the convergence engine decided to stop or continue after
    /// this iteration's reviews were in.
    #[serde(default)]
    pub convergence_reason: String,
    /// Tokens the moderator consumed producing `output_version`. Zero
    /// when the iteration stopped before the moderator ran.
    #[serde(default)]
    pub moderator_tokens: TokenCounts,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl IterationRecord {
    pub fn any_high_severity_issue(&self) -> bool {
        self.reviews.iter().any(|r| r.has_high_severity_issues())
    }

    pub fn high_severity_count(&self) -> usize {
        self.reviews.iter().map(|r| r.high_severity_count()).sum()
    }

    pub fn medium_severity_count(&self) -> usize {
        self.reviews
            .iter()
            .flat_map(|r| &r.issues)
            .filter(|i| i.severity == crate::model::Severity::Medium)
            .count()
    }

    pub fn low_severity_count(&self) -> usize {
        self.reviews
            .iter()
            .flat_map(|r| &r.issues)
            .filter(|i| i.severity == crate::model::Severity::Low)
            .count()
    }

    pub fn issue_counts(&self) -> super::SeverityCounts {
        super::count_severities(self.reviews.iter().flat_map(|r| &r.issues).map(|i| i.severity))
    }

    /// Token usage from this iteration's reviewer fan-out only (the
    /// moderator's share is tracked separately in `moderator_tokens`).
    pub fn reviewer_tokens(&self) -> TokenCounts {
        self.reviews.iter().fold(TokenCounts::default(), |acc, r| acc + r.token_counts)
    }

    pub fn to_summary(&self, stopped: bool) -> super::IterationSummary {
        super::IterationSummary {
            iteration: self.iteration,
            input_version: self.input_version,
            output_version: self.output_version,
            issue_counts: self.issue_counts(),
            delta: self.delta,
            stopped,
            reason: self.convergence_reason.clone(),
            started_at: self.started_at,
            ended_at: self.finished_at,
        }
    }
}
