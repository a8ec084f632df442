//! LLM-backed meta-planner.
//!
//! Grounded on the teacher's `CouncilRole` static-metadata idiom
//! (`council/mod.rs`) for the fallback templates it reaches for, and on
//! `agents/manager.rs`'s agent-construction style for the LLM call
//! itself. Per `roundtable::agents::MetaPlanner`'s contract, a failure
//! here is always caught and replaced with a built-in preset rather
//! than propagated — the planner step must never itself be fatal.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::warn;

use roundtable::agents::{builtin_preset, generic_template, MetaPlanner, PlanOutput};
use roundtable::error::RoundtableError;
use roundtable::llm::LlmClient;
use roundtable::model::{RoleSpec, TokenCounts};

use crate::prompts;

#[derive(Debug, Deserialize)]
struct RawPlan {
    moderator_focus: String,
    roles: Vec<RawRoleSpec>,
}

#[derive(Debug, Deserialize)]
struct RawRoleSpec {
    name: String,
    role: String,
    expertise: String,
    perspective: String,
    system_prompt: String,
}

pub struct LlmMetaPlanner {
    client: Arc<dyn LlmClient>,
}

impl LlmMetaPlanner {
    pub fn new(client: Arc<dyn LlmClient>) -> Self {
        Self { client }
    }
}

fn fallback(domain_hint: Option<&str>, num_participants: usize) -> PlanOutput {
    let role_specs = domain_hint.and_then(builtin_preset).unwrap_or_else(|| generic_template(num_participants));
    PlanOutput::fallback(role_specs)
}

/// Enforce per-session name uniqueness (spec §4.4): a duplicate name
/// from the model gets a deterministic "A", "B", … suffix on each
/// repeat beyond the first, rather than being rejected outright.
fn dedupe_names(mut role_specs: Vec<RoleSpec>) -> Vec<RoleSpec> {
    let mut seen: std::collections::HashMap<String, usize> = std::collections::HashMap::new();
    for spec in &mut role_specs {
        let count = seen.entry(spec.name.clone()).or_insert(0);
        if *count > 0 {
            let suffix = (b'A' + (*count - 1) as u8) as char;
            spec.name = format!("{}-{suffix}", spec.name);
        }
        *count += 1;
    }
    role_specs
}

#[async_trait]
impl MetaPlanner for LlmMetaPlanner {
    async fn plan(&self, document: &str, domain_hint: Option<&str>, num_participants: usize) -> Result<PlanOutput, RoundtableError> {
        let prompt = prompts::planner_prompt(document, domain_hint, num_participants);
        match self.client.complete(prompts::PLANNER_PREAMBLE, &prompt).await {
            Ok(completion) => {
                let token_counts: TokenCounts = completion.usage.into();
                match serde_json::from_str::<RawPlan>(&completion.text) {
                    Ok(raw) => {
                        let role_specs: Vec<RoleSpec> = dedupe_names(
                            raw.roles
                                .into_iter()
                                .take(num_participants)
                                .map(|r| RoleSpec::new(r.name, r.role, r.expertise, r.perspective, r.system_prompt))
                                .collect(),
                        );
                        if role_specs.is_empty() {
                            warn!("meta-planner returned an empty role set, falling back to a built-in template");
                            Ok(fallback(domain_hint, num_participants))
                        } else {
                            Ok(PlanOutput {
                                role_specs,
                                moderator_focus: raw.moderator_focus,
                                token_counts,
                            })
                        }
                    }
                    Err(e) => {
                        warn!(error = %e, "meta-planner response was not valid JSON, falling back to a built-in template");
                        Ok(fallback(domain_hint, num_participants))
                    }
                }
            }
            Err(e) => {
                warn!(error = %e, "meta-planner call failed, falling back to a built-in template");
                Ok(fallback(domain_hint, num_participants))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use roundtable::llm::{Completion, LlmError};

    use super::*;

    fn spec(name: &str) -> RoleSpec {
        RoleSpec::new(name, "Reviewer", "general", "general", "preamble")
    }

    #[test]
    fn dedupe_names_leaves_unique_names_alone() {
        let specs = dedupe_names(vec![spec("critic"), spec("clarity")]);
        assert_eq!(specs[0].name, "critic");
        assert_eq!(specs[1].name, "clarity");
    }

    #[test]
    fn dedupe_names_suffixes_repeats_deterministically() {
        let specs = dedupe_names(vec![spec("critic"), spec("critic"), spec("critic")]);
        assert_eq!(specs[0].name, "critic");
        assert_eq!(specs[1].name, "critic-A");
        assert_eq!(specs[2].name, "critic-B");
    }

    struct ScriptedClient {
        response: &'static str,
    }

    #[async_trait]
    impl LlmClient for ScriptedClient {
        async fn complete(&self, _preamble: &str, _prompt: &str) -> Result<Completion, LlmError> {
            Ok(Completion {
                text: self.response.to_string(),
                usage: Default::default(),
            })
        }
    }

    #[tokio::test]
    async fn plan_dedupes_names_the_llm_returned_as_duplicates() {
        let response = r#"{"moderator_focus":"resolve conflicts","roles":[
            {"name":"critic","role":"Critic","expertise":"x","perspective":"y","system_prompt":"z"},
            {"name":"critic","role":"Critic","expertise":"x","perspective":"y","system_prompt":"z"}
        ]}"#;
        let planner = LlmMetaPlanner::new(Arc::new(ScriptedClient { response }));
        let plan = planner.plan("doc", None, 2).await.unwrap();
        assert_eq!(plan.role_specs[0].name, "critic");
        assert_eq!(plan.role_specs[1].name, "critic-A");
    }
}
