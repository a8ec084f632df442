//! Meta-planner agent contract and the built-in preset library.
//!
//! Grounded on the teacher's `CouncilRole` enum (`council/mod.rs`),
//! which pairs a role with static metadata (`model_name()`,
//! `description()`); the presets here play the same part as a
//! zero-I/O fallback the planner step can never fail to produce.

use async_trait::async_trait;

use crate::error::RoundtableError;
use crate::model::{RoleSpec, TokenCounts};

/// The default moderator focus used whenever a concrete `MetaPlanner`
/// falls back to a built-in preset or the generic template rather than
/// inferring one from the document.
pub const DEFAULT_MODERATOR_FOCUS: &str =
    "resolve every High-severity issue, address Medium issues where it clearly improves the document, and preserve the author's intent and voice";

/// What a meta-planning pass produces: the role set, the focus the
/// moderator should apply when synthesizing reviews, and the tokens
/// spent producing both (spec §8 P7).
#[derive(Debug, Clone)]
pub struct PlanOutput {
    pub role_specs: Vec<RoleSpec>,
    pub moderator_focus: String,
    pub token_counts: TokenCounts,
}

impl PlanOutput {
    pub fn fallback(role_specs: Vec<RoleSpec>) -> Self {
        Self {
            role_specs,
            moderator_focus: DEFAULT_MODERATOR_FOCUS.to_string(),
            token_counts: TokenCounts::default(),
        }
    }
}

/// Produces a set of reviewer role specs for a document, either by
/// inferring them from the document + an optional domain hint, or by
/// falling back to a built-in preset on failure.
#[async_trait]
pub trait MetaPlanner: Send + Sync {
    /// Infer `num_participants` role specs (plus a moderator focus) for
    /// `document`. Implementations that call out to an LLM should catch
    /// their own failures and fall back to [`builtin_preset`] rather
    /// than propagating a `PlannerFailure` whenever a reasonable
    /// generic template exists.
    async fn plan(
        &self,
        document: &str,
        domain_hint: Option<&str>,
        num_participants: usize,
    ) -> Result<PlanOutput, RoundtableError>;
}

/// Look up a built-in preset by name (case-insensitive). Returns `None`
/// for an unrecognized hint, in which case callers should fall back to
/// [`generic_template`].
pub fn builtin_preset(name: &str) -> Option<Vec<RoleSpec>> {
    match name.to_ascii_lowercase().as_str() {
        "prd" => Some(vec![
            RoleSpec::new(
                "completeness",
                "Completeness Reviewer",
                "requirements analysis and edge-case discovery",
                "missing requirements, unstated assumptions, unhandled edge cases",
                "You are a product reviewer focused on completeness. Find gaps, not style.",
            ),
            RoleSpec::new(
                "feasibility",
                "Feasibility Reviewer",
                "engineering estimation and delivery risk",
                "technical feasibility, scope realism, timeline risk",
                "You are an engineering reviewer judging whether this PRD is buildable as written.",
            ),
            RoleSpec::new(
                "clarity",
                "Clarity Reviewer",
                "technical editing",
                "ambiguity, contradictions, inconsistent terminology",
                "You are an editorial reviewer focused on clarity and internal consistency.",
            ),
        ]),
        "code-review" => Some(vec![
            RoleSpec::new(
                "correctness",
                "Correctness Reviewer",
                "software correctness and testing",
                "logic errors, edge cases, off-by-one and boundary conditions",
                "You are a correctness-focused code reviewer.",
            ),
            RoleSpec::new(
                "security",
                "Security Reviewer",
                "application security",
                "injection, auth bypass, unsafe input handling",
                "You are a security-focused code reviewer.",
            ),
            RoleSpec::new(
                "maintainability",
                "Maintainability Reviewer",
                "software design and readability",
                "naming, structure, test coverage, documentation",
                "You are a maintainability-focused code reviewer.",
            ),
        ]),
        "architecture" => Some(vec![
            RoleSpec::new(
                "scalability",
                "Scalability Reviewer",
                "distributed systems capacity planning",
                "bottlenecks, single points of failure, capacity limits",
                "You are an architecture reviewer focused on scalability.",
            ),
            RoleSpec::new(
                "operability",
                "Operability Reviewer",
                "production operations and incident response",
                "observability gaps, failure modes, rollback and migration risk",
                "You are an architecture reviewer focused on operability.",
            ),
            RoleSpec::new(
                "simplicity",
                "Simplicity Reviewer",
                "software architecture",
                "unnecessary complexity, premature abstraction, coupling",
                "You are an architecture reviewer focused on simplicity.",
            ),
        ]),
        "business-strategy" => Some(vec![
            RoleSpec::new(
                "market",
                "Market Reviewer",
                "competitive strategy and market analysis",
                "competitive positioning, market sizing assumptions",
                "You are a strategy reviewer focused on market fit.",
            ),
            RoleSpec::new(
                "financial",
                "Financial Reviewer",
                "corporate finance",
                "unit economics, cost assumptions, revenue model risk",
                "You are a strategy reviewer focused on financial soundness.",
            ),
            RoleSpec::new(
                "execution",
                "Execution Reviewer",
                "program and delivery management",
                "resourcing, sequencing, dependency risk",
                "You are a strategy reviewer focused on executability.",
            ),
        ]),
        _ => None,
    }
}

/// Three-participant generic template used when no domain hint matches
/// a built-in preset and the meta-planner call itself failed. Has zero
/// I/O dependency and therefore cannot itself fail.
pub fn generic_template(num_participants: usize) -> Vec<RoleSpec> {
    let base = vec![
        RoleSpec::new(
            "critic",
            "Critic",
            "general critical analysis",
            "weaknesses, gaps, and unsupported claims",
            "You are a generalist reviewer looking for weaknesses and gaps.",
        ),
        RoleSpec::new(
            "clarity",
            "Clarity Reviewer",
            "technical editing",
            "ambiguity and inconsistency",
            "You are a generalist reviewer focused on clarity and consistency.",
        ),
        RoleSpec::new(
            "completeness",
            "Completeness Reviewer",
            "requirements analysis",
            "missing pieces and unaddressed edge cases",
            "You are a generalist reviewer focused on completeness.",
        ),
    ];
    if num_participants <= base.len() {
        base.into_iter().take(num_participants.max(1)).collect()
    } else {
        // Repeat the generic roles round-robin to reach the requested count,
        // suffixing the name so it stays unique within the session.
        (0..num_participants)
            .map(|i| {
                let template = &base[i % base.len()];
                let mut spec = RoleSpec::new(
                    format!("{}-{}", template.name, i / base.len() + 1),
                    template.role.clone(),
                    template.expertise.clone(),
                    template.perspective.clone(),
                    template.system_prompt.clone(),
                );
                spec.model_id = template.model_id.clone();
                spec
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_presets_cover_documented_names() {
        for name in ["prd", "code-review", "architecture", "business-strategy"] {
            assert!(builtin_preset(name).is_some(), "missing preset: {name}");
        }
    }

    #[test]
    fn unknown_hint_has_no_preset() {
        assert!(builtin_preset("underwater-basket-weaving").is_none());
    }

    #[test]
    fn generic_template_never_empty() {
        assert!(!generic_template(1).is_empty());
        assert_eq!(generic_template(3).len(), 3);
    }

    #[test]
    fn generic_template_expands_beyond_base_set() {
        let specs = generic_template(5);
        assert_eq!(specs.len(), 5);
    }

    #[test]
    fn preset_roles_have_distinct_expertise() {
        let specs = builtin_preset("code-review").unwrap();
        let expertises: std::collections::HashSet<_> = specs.iter().map(|s| &s.expertise).collect();
        assert_eq!(expertises.len(), specs.len());
    }
}
