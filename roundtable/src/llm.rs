//! The external LLM capability boundary.
//!
//! Grounded on the teacher's `CouncilMember` async-trait (`council/mod.rs`):
//! a small capability trait implemented once per provider, with the
//! concrete wiring (HTTP client, prompt templates, retry policy) living
//! outside this crate in `llm-agents`.

use async_trait::async_trait;
use thiserror::Error;

/// Errors an `LlmClient` call can surface. The driver maps these onto
/// the `TransientLLM`/`FatalLLM` categories of `RoundtableError`.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("request timed out")]
    Timeout,

    #[error("rate limited, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("provider returned an error: {0}")]
    Provider(String),

    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("response could not be parsed: {0}")]
    Parse(String),
}

impl LlmError {
    /// Whether this error category is worth retrying automatically.
    pub fn is_transient(&self) -> bool {
        matches!(self, LlmError::Timeout | LlmError::RateLimited { .. })
    }
}

/// Token accounting for a single completion call.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokenUsage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
}

impl TokenUsage {
    pub fn total(&self) -> u64 {
        self.prompt_tokens + self.completion_tokens
    }
}

/// A single completion call result.
#[derive(Debug, Clone)]
pub struct Completion {
    pub text: String,
    pub usage: TokenUsage,
}

/// The capability every reviewer/moderator/meta-planner agent is built
/// on top of: send a system preamble plus a user prompt, get text back.
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, preamble: &str, prompt: &str) -> Result<Completion, LlmError>;
}
