//! Moderator agent contract.
//!
//! Grounded on `agents/manager.rs`'s role of synthesizing multiple
//! inputs into one output, adapted here to synthesize a set of
//! `Review`s plus the current document into the next `DocumentVersion`.

use async_trait::async_trait;

use crate::error::RoundtableError;
use crate::model::{Review, TokenCounts};

/// The moderator's output: the next document version's content plus
/// the tokens spent producing it, so the driver can fold moderator
/// usage into the session's token accounting (spec §8 P7).
#[derive(Debug, Clone)]
pub struct ModeratorOutput {
    pub content: String,
    pub token_counts: TokenCounts,
}

impl ModeratorOutput {
    pub fn new(content: impl Into<String>, token_counts: TokenCounts) -> Self {
        Self {
            content: content.into(),
            token_counts,
        }
    }
}

/// Synthesizes the current document and a round of reviews into a new
/// document version. Exactly one moderator runs per iteration, after
/// all reviewers have returned (or failed fatally).
#[async_trait]
pub trait ModeratorAgent: Send + Sync {
    /// Produce the next document version's content and the tokens it
    /// cost to produce. `moderator_focus` is the meta-planner's
    /// synthesis directive for this session; `goal` is the session's
    /// optional top-level objective, when the caller supplied one
    /// (spec §4.3's `(current_document, reviews_for_current_version,
    /// moderator_focus, goal?)` contract).
    async fn moderate(
        &self,
        document: &str,
        reviews: &[Review],
        moderator_focus: &str,
        goal: Option<&str>,
    ) -> Result<ModeratorOutput, RoundtableError>;
}
