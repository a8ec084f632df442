//! LLM-backed reviewer agent.
//!
//! Grounded on the teacher's `agents/reviewer.rs` (`build_reviewer`,
//! `ReviewResult::parse`): a blind, tool-less agent that sees only the
//! document and returns structured feedback — no conversation history,
//! no access to other reviewers' output.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::warn;

use roundtable::agents::{parse_review_response, parse_with_one_salvage, ReviewerAgent};
use roundtable::error::RoundtableError;
use roundtable::llm::{LlmClient, LlmError};
use roundtable::model::{Review, RoleSpec, TokenCounts};

use crate::prompts;

fn classify(err: LlmError) -> RoundtableError {
    if err.is_transient() {
        RoundtableError::TransientLlm(err)
    } else {
        RoundtableError::FatalLlm(err)
    }
}

/// One worker in the reviewer pool: a model binding only, no fixed
/// role. The driver hands it a `RoleSpec` on every call and round-robins
/// the pool against whatever role set the session's meta-planner
/// produced.
pub struct LlmReviewer {
    client: Arc<dyn LlmClient>,
}

impl LlmReviewer {
    pub fn new(client: Arc<dyn LlmClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ReviewerAgent for LlmReviewer {
    async fn review(&self, document: &str, role: &RoleSpec) -> Result<Review, RoundtableError> {
        let preamble = prompts::reviewer_preamble(role);
        let first = self.client.complete(&preamble, document).await.map_err(classify)?;
        let first_tokens: TokenCounts = first.usage.into();

        if let Ok(review) = parse_review_response(&role.name, &first.text, first_tokens) {
            return Ok(review);
        }

        warn!(
            participant = %role.name,
            "reviewer response was not valid JSON, retrying once with a salvage prompt"
        );
        let salvage_prompt = format!("Your previous response was:\n\n{}\n\n{}", first.text, prompts::SALVAGE_INSTRUCTIONS);
        let salvage = self.client.complete(&preamble, &salvage_prompt).await.ok();
        let total_tokens = first_tokens
            + salvage
                .as_ref()
                .map(|c| TokenCounts::from(c.usage))
                .unwrap_or_default();
        let review = parse_with_one_salvage(
            &role.name,
            &first.text,
            salvage.as_ref().map(|c| c.text.as_str()),
            total_tokens,
        )?;
        warn!(participant = %role.name, "reviewer response salvaged on retry");
        Ok(review)
    }
}
