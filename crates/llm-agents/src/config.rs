//! LLM endpoint configuration for the production reviewer/moderator/
//! planner agents.
//!
//! Mirrors the teacher's `SwarmConfig` env-var-driven default idiom
//! (`config.rs`'s `SwarmConfig::default`), trimmed to the single
//! OpenAI-compatible endpoint this crate's agents need: one round-robin
//! model pool rather than per-tier endpoints, since a refinement round
//! doesn't route by task complexity the way the original coding swarm
//! did.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use rig::client::CompletionClient;
use rig::providers::openai;

fn env_string(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_u32(key: &str, default: u32) -> u32 {
    std::env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

/// Endpoint + model pool configuration for the LLM-backed agents.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub base_url: String,
    pub api_key: String,
    /// Reviewer models, round-robin assigned across participants.
    pub reviewer_models: Vec<String>,
    /// Model the moderator synthesizes with.
    pub moderator_model: String,
    /// Model the meta-planner uses to infer a role set.
    pub planner_model: String,
    /// Attempts (beyond the first) the `LlmClient` wrapper retries a
    /// transient failure before giving up.
    pub max_retries: u32,
    pub request_timeout: Duration,
}

impl AgentConfig {
    pub fn from_env() -> Self {
        let mut reviewer_models: Vec<String> = env_string("ROUNDTABLE_LLM_MODELS", "gpt-4o-mini")
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        if reviewer_models.is_empty() {
            reviewer_models.push("gpt-4o-mini".to_string());
        }

        let moderator_model = std::env::var("ROUNDTABLE_LLM_MODERATOR_MODEL").unwrap_or_else(|_| reviewer_models[0].clone());
        let planner_model = std::env::var("ROUNDTABLE_LLM_PLANNER_MODEL").unwrap_or_else(|_| reviewer_models[0].clone());

        Self {
            base_url: env_string("ROUNDTABLE_LLM_BASE_URL", "https://api.openai.com/v1"),
            api_key: env_string("ROUNDTABLE_LLM_API_KEY", "not-needed"),
            reviewer_models,
            moderator_model,
            planner_model,
            max_retries: env_u32("ROUNDTABLE_LLM_MAX_RETRIES", 3),
            request_timeout: Duration::from_secs(env_u32("ROUNDTABLE_LLM_TIMEOUT_SECS", 60) as u64),
        }
    }

    /// Build the shared OpenAI-compatible completions client this
    /// config's models are served from, wrapped in an `Arc` so every
    /// reviewer/moderator/planner agent can hold it without cloning
    /// the underlying HTTP client.
    pub fn build_client(&self) -> Result<Arc<openai::CompletionsClient>> {
        let client = openai::CompletionsClient::builder()
            .api_key(&self.api_key)
            .base_url(&self.base_url)
            .build()
            .context("failed to build the OpenAI-compatible completions client")?;
        Ok(Arc::new(client))
    }
}
