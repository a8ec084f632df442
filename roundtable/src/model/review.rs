use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Severity;

/// Token accounting for a single LLM exchange (spec §3's
/// `token_counts{prompt, completion, total}`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenCounts {
    pub prompt: u64,
    pub completion: u64,
}

impl TokenCounts {
    pub fn new(prompt: u64, completion: u64) -> Self {
        Self { prompt, completion }
    }

    pub fn total(&self) -> u64 {
        self.prompt + self.completion
    }
}

impl std::ops::Add for TokenCounts {
    type Output = TokenCounts;

    fn add(self, rhs: Self) -> Self::Output {
        TokenCounts {
            prompt: self.prompt + rhs.prompt,
            completion: self.completion + rhs.completion,
        }
    }
}

impl std::ops::AddAssign for TokenCounts {
    fn add_assign(&mut self, rhs: Self) {
        self.prompt += rhs.prompt;
        self.completion += rhs.completion;
    }
}

impl From<crate::llm::TokenUsage> for TokenCounts {
    fn from(usage: crate::llm::TokenUsage) -> Self {
        Self {
            prompt: usage.prompt_tokens,
            completion: usage.completion_tokens,
        }
    }
}

/// A single critique raised against a document version by a reviewer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Issue {
    pub severity: Severity,
    /// Short tag grouping related issues (e.g. "security", "clarity").
    /// Defaults to `"general"` when a reviewer's raw response doesn't
    /// supply one.
    #[serde(default = "Issue::default_category")]
    pub category: String,
    pub summary: String,
    /// Free-form location hint (section heading, line range, etc.).
    pub location: Option<String>,
    pub suggestion: Option<String>,
    /// The reviewer that raised this issue. Must always equal the
    /// `participant_id` of the `Review` it belongs to — callers that
    /// build an `Issue` standalone (tests, stubs) are responsible for
    /// setting this themselves; `parse_review_response` sets it for
    /// every issue it parses.
    #[serde(default)]
    pub reviewer_name: String,
}

impl Issue {
    pub fn new(severity: Severity, summary: impl Into<String>) -> Self {
        Self {
            severity,
            category: Self::default_category(),
            summary: summary.into(),
            location: None,
            suggestion: None,
            reviewer_name: String::new(),
        }
    }

    fn default_category() -> String {
        "general".to_string()
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    pub fn with_reviewer_name(mut self, reviewer_name: impl Into<String>) -> Self {
        self.reviewer_name = reviewer_name.into();
        self
    }
}

/// One reviewer's structured critique of a single document version.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Review {
    pub participant_id: String,
    pub issues: Vec<Issue>,
    /// The reviewer's overall assessment in free text.
    pub summary: String,
    /// True when the reviewer judges the document ready as-is.
    pub approved: bool,
    /// Tokens consumed producing this review, including any salvage
    /// retry. Defaults to zero for callers (tests, stubs) that don't
    /// track it.
    #[serde(default)]
    pub token_counts: TokenCounts,
    /// When this review was produced (spec §3).
    pub timestamp: DateTime<Utc>,
}

impl Review {
    pub fn has_high_severity_issues(&self) -> bool {
        self.issues.iter().any(|i| i.severity.is_high())
    }

    pub fn high_severity_count(&self) -> usize {
        self.issues.iter().filter(|i| i.severity.is_high()).count()
    }

    pub fn counts_by_severity(&self) -> super::SeverityCounts {
        super::count_severities(self.issues.iter().map(|i| i.severity))
    }

    /// Every issue this review raised was tagged with this review's own
    /// `participant_id` as `reviewer_name` — the invariant spec §3
    /// requires of `Issue::reviewer_name`.
    pub fn issues_are_self_attributed(&self) -> bool {
        self.issues.iter().all(|i| i.reviewer_name == self.participant_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn review_with(severities: &[Severity]) -> Review {
        Review {
            participant_id: "r1".into(),
            issues: severities
                .iter()
                .map(|s| Issue::new(*s, "issue").with_reviewer_name("r1"))
                .collect(),
            summary: "ok".into(),
            approved: severities.is_empty(),
            token_counts: TokenCounts::default(),
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn detects_high_severity_issues() {
        let review = review_with(&[Severity::Low, Severity::High]);
        assert!(review.has_high_severity_issues());
        assert_eq!(review.high_severity_count(), 1);
    }

    #[test]
    fn no_high_severity_when_absent() {
        let review = review_with(&[Severity::Low, Severity::Medium]);
        assert!(!review.has_high_severity_issues());
        assert_eq!(review.high_severity_count(), 0);
    }

    #[test]
    fn every_issue_is_attributed_to_its_reviewer() {
        let review = review_with(&[Severity::Low, Severity::High]);
        assert!(review.issues_are_self_attributed());
    }

    #[test]
    fn detects_misattributed_issue() {
        let mut review = review_with(&[Severity::High]);
        review.issues[0].reviewer_name = "someone-else".into();
        assert!(!review.issues_are_self_attributed());
    }

    #[test]
    fn counts_by_severity_matches_issue_list() {
        let review = review_with(&[Severity::High, Severity::High, Severity::Low]);
        let counts = review.counts_by_severity();
        assert_eq!(counts.high, 2);
        assert_eq!(counts.low, 1);
        assert_eq!(counts.medium, 0);
    }
}
