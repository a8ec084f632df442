//! Reviewer agent contract.
//!
//! Grounded on the teacher's `agents/reviewer.rs` (`ReviewResult::parse`)
//! for the shape of "call an agent, parse its structured response" and
//! on `router/circuit_breaker.rs` for the bounded-retry idiom — here
//! bounded to exactly one extra attempt, per the one-salvage-then-fatal
//! parse policy.

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::RoundtableError;
use crate::model::{Issue, Review, RoleSpec, TokenCounts};

/// A single reviewer *worker*: a model binding, not a role. The driver
/// supplies the `RoleSpec` to review under on every call, so the same
/// worker pool can be round-robined against whatever role set a
/// session's meta-planner produced — a worker has no fixed identity of
/// its own beyond the model it talks to. One implementation per LLM
/// provider lives in `llm-agents`; tests in this crate use
/// deterministic stubs.
#[async_trait]
pub trait ReviewerAgent: Send + Sync {
    /// Produce a structured critique of `document` under the given
    /// role. Implementations are expected to request a JSON payload
    /// from the underlying model and parse it with
    /// [`parse_review_response`], retrying at most once on a malformed
    /// response before surfacing `MalformedReview`. The returned
    /// `Review::participant_id` must equal `role.name`.
    async fn review(&self, document: &str, role: &RoleSpec) -> Result<Review, RoundtableError>;
}

/// Wire shape a reviewer's structured JSON response is expected to take.
#[derive(Debug, Deserialize)]
pub struct RawReview {
    pub issues: Vec<RawIssue>,
    pub summary: String,
    pub approved: bool,
}

#[derive(Debug, Deserialize)]
pub struct RawIssue {
    pub severity: String,
    #[serde(default = "default_category")]
    pub category: String,
    pub summary: String,
    pub location: Option<String>,
    pub suggestion: Option<String>,
}

fn default_category() -> String {
    "general".to_string()
}

/// Parse a reviewer's raw text response into a [`Review`]. Returns an
/// error (never panics) on malformed JSON or an unrecognized severity
/// string, so the caller can decide whether to salvage-retry. Every
/// parsed `Issue` is tagged with `participant_id` as its
/// `reviewer_name`, satisfying the "every Issue.reviewer_name equals
/// Review.reviewer_name" invariant by construction.
pub fn parse_review_response(
    participant_id: &str,
    raw: &str,
    token_counts: TokenCounts,
) -> Result<Review, String> {
    let parsed: RawReview = serde_json::from_str(raw).map_err(|e| e.to_string())?;
    let issues = parsed
        .issues
        .into_iter()
        .map(|i| {
            let severity = match i.severity.to_ascii_lowercase().as_str() {
                "low" => crate::model::Severity::Low,
                "medium" => crate::model::Severity::Medium,
                "high" => crate::model::Severity::High,
                other => return Err(format!("unrecognized severity: {other}")),
            };
            Ok(Issue {
                severity,
                category: i.category,
                summary: i.summary,
                location: i.location,
                suggestion: i.suggestion,
                reviewer_name: participant_id.to_string(),
            })
        })
        .collect::<Result<Vec<_>, String>>()?;

    Ok(Review {
        participant_id: participant_id.to_string(),
        issues,
        summary: parsed.summary,
        approved: parsed.approved,
        token_counts,
        timestamp: chrono::Utc::now(),
    })
}

/// Apply the one-salvage-then-fatal parse policy: try `raw`, and if
/// that fails, try `salvage` (e.g. a re-prompted response asking the
/// model to fix its own JSON). A second failure is fatal.
pub fn parse_with_one_salvage(
    participant_id: &str,
    raw: &str,
    salvage: Option<&str>,
    token_counts: TokenCounts,
) -> Result<Review, RoundtableError> {
    match parse_review_response(participant_id, raw, token_counts) {
        Ok(review) => Ok(review),
        Err(first_err) => match salvage {
            Some(salvage_raw) => parse_review_response(participant_id, salvage_raw, token_counts).map_err(|second_err| {
                RoundtableError::MalformedReview {
                    participant: participant_id.to_string(),
                    reason: format!("first attempt: {first_err}; salvage attempt: {second_err}"),
                }
            }),
            None => Err(RoundtableError::MalformedReview {
                participant: participant_id.to_string(),
                reason: first_err,
            }),
        },
    }
}
