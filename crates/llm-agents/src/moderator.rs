//! LLM-backed moderator agent.
//!
//! Grounded on `agents/manager.rs`'s role as the synthesizer of several
//! inputs into one output, adapted here to synthesize a document and a
//! round of reviews into the next document version.

use std::sync::Arc;

use async_trait::async_trait;

use roundtable::agents::{ModeratorAgent, ModeratorOutput};
use roundtable::error::RoundtableError;
use roundtable::llm::{LlmClient, LlmError};
use roundtable::model::{Review, TokenCounts};

use crate::prompts;

fn classify(err: LlmError) -> RoundtableError {
    if err.is_transient() {
        RoundtableError::TransientLlm(err)
    } else {
        RoundtableError::FatalLlm(err)
    }
}

pub struct LlmModerator {
    client: Arc<dyn LlmClient>,
}

impl LlmModerator {
    pub fn new(client: Arc<dyn LlmClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ModeratorAgent for LlmModerator {
    async fn moderate(
        &self,
        document: &str,
        reviews: &[Review],
        moderator_focus: &str,
        goal: Option<&str>,
    ) -> Result<ModeratorOutput, RoundtableError> {
        let prompt = prompts::moderator_prompt(document, reviews, moderator_focus, goal);
        let completion = self.client.complete(prompts::MODERATOR_PREAMBLE, &prompt).await.map_err(classify)?;
        let token_counts: TokenCounts = completion.usage.into();
        Ok(ModeratorOutput::new(completion.text, token_counts))
    }
}
