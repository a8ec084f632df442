//! `rig-core`-backed [`LlmClient`](roundtable::llm::LlmClient).
//!
//! Grounded on the teacher's `agents/reviewer.rs`/`agents/manager.rs`
//! `client.agent(model)....build()` construction idiom. The retry/
//! backoff loop is grounded on `router/circuit_breaker.rs`'s
//! `record_rate_limit` doubling-cooldown idiom, applied per-call here
//! rather than per-model-circuit since this crate builds one
//! `LlmClient` per reviewer/moderator/planner rather than routing
//! across a shared pool of endpoints.

use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use rig::client::CompletionClient;
use rig::completion::Prompt;
use rig::providers::openai;

use roundtable::llm::{Completion, LlmClient, LlmError, TokenUsage};

/// Base delay before the first retry. Doubles each attempt, capped at
/// [`MAX_BACKOFF`] — the same doubling-then-cap shape as the teacher's
/// rate-limit cooldown, just applied to this call's own retry loop.
const BASE_BACKOFF: Duration = Duration::from_millis(500);
const MAX_BACKOFF: Duration = Duration::from_secs(8);

/// One model, reachable through one OpenAI-compatible endpoint.
///
/// Holds the endpoint client behind an `Arc` rather than cloning it per
/// agent — the teacher's builders (`agents/reviewer.rs::build_reviewer`
/// et al.) take the client by reference for the same reason, since
/// nothing in this pack shows `openai::CompletionsClient` being cloned.
pub struct RigLlmClient {
    client: Arc<openai::CompletionsClient>,
    model: String,
    max_retries: u32,
}

impl RigLlmClient {
    pub fn new(client: Arc<openai::CompletionsClient>, model: impl Into<String>, max_retries: u32) -> Self {
        Self {
            client,
            model: model.into(),
            max_retries,
        }
    }
}

/// Classify a `rig` prompt failure into the taxonomy the rest of the
/// engine reasons about. `rig`'s error type doesn't expose a stable,
/// matchable "this was a 429" variant across providers, so this
/// classifies on the rendered message — the same pragmatic approach
/// the teacher's `check_endpoint_with_model` uses when deciding whether
/// an unreachable endpoint is worth a warning.
fn classify(err: &rig::completion::PromptError) -> LlmError {
    let message = err.to_string();
    let lower = message.to_ascii_lowercase();
    if lower.contains("timed out") || lower.contains("timeout") {
        LlmError::Timeout
    } else if lower.contains("rate limit") || lower.contains("429") || lower.contains("too many requests") {
        LlmError::RateLimited { retry_after_secs: 2 }
    } else if lower.contains("unauthorized") || lower.contains("forbidden") || lower.contains("401") || lower.contains("403") {
        LlmError::Auth(message)
    } else {
        LlmError::Provider(message)
    }
}

/// Small time-based jitter so several concurrent reviewers retrying at
/// once don't all wake up on the same tick.
fn jitter_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| u64::from(d.subsec_millis()) % 250)
        .unwrap_or(0)
}

fn backoff_for(attempt: u32) -> Duration {
    let doubled = BASE_BACKOFF.as_millis() as u64 * 2u64.saturating_pow(attempt);
    Duration::from_millis(doubled.min(MAX_BACKOFF.as_millis() as u64) + jitter_millis())
}

#[async_trait]
impl LlmClient for RigLlmClient {
    async fn complete(&self, preamble: &str, prompt: &str) -> Result<Completion, LlmError> {
        let agent = self.client.agent(&self.model).preamble(preamble).temperature(0.2).build();

        let mut attempt = 0;
        loop {
            match agent.prompt(prompt).await {
                Ok(text) => {
                    return Ok(Completion {
                        text,
                        // `Prompt::prompt` is the high-level convenience call and
                        // doesn't surface token accounting; a real usage count
                        // would require dropping to `rig`'s lower-level
                        // `CompletionModel::completion` API instead.
                        usage: TokenUsage::default(),
                    });
                }
                Err(err) => {
                    let classified = classify(&err);
                    if !classified.is_transient() || attempt >= self.max_retries {
                        return Err(classified);
                    }
                    tokio::time::sleep(backoff_for(attempt)).await;
                    attempt += 1;
                }
            }
        }
    }
}
