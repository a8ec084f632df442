//! Session configuration.
//!
//! Mirrors the env-var-driven defaults style used throughout the
//! ambient config layer this crate was grown from: anything with a
//! sane default reads an override from the environment, anything that
//! must be supplied correctly by the caller is hard-validated instead.

use std::time::Duration;

use crate::error::{RoundtableError, RoundtableResult};
use crate::model::RoleSpec;

/// Minimum number of reviewer participants a session may configure.
pub const MIN_PARTICIPANTS: usize = 1;
/// Maximum number of reviewer participants a session may configure.
pub const MAX_PARTICIPANTS: usize = 12;
/// Lower bound on `max_iterations`.
pub const MIN_MAX_ITERATIONS: u32 = 1;

fn env_f64(key: &str, default: f64) -> f64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_u32(key: &str, default: u32) -> u32 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Full configuration for a roundtable refinement session.
#[derive(Debug, Clone)]
pub struct Config {
    /// The document to refine.
    pub document: String,
    /// Human-readable title carried onto every `DocumentVersion` and
    /// into the final `ConvergenceReport`.
    pub title: Option<String>,
    /// Document kind (e.g. "prd", "code-review") carried the same way.
    pub document_type: Option<String>,
    /// Optional top-level objective for the refinement, passed to the
    /// moderator alongside `moderator_focus` on every synthesis call
    /// (spec §4.3).
    pub goal: Option<String>,
    /// Domain hint passed to the meta-planner (e.g. "prd", "code-review").
    /// `None` asks the planner to infer a role set from the document.
    pub domain_hint: Option<String>,
    /// Explicit role specs. When set, the meta-planner step is skipped.
    pub role_specs: Option<Vec<RoleSpec>>,
    /// Number of reviewer participants to request from the planner when
    /// `role_specs` is `None`.
    pub num_participants: usize,
    /// Hard ceiling on refinement iterations.
    pub max_iterations: u32,
    /// Stop immediately once no High-severity issues remain.
    pub stop_on_no_high_issues: bool,
    /// Delta below which the document is considered stable.
    pub delta_threshold: f64,
    /// When true, suppresses every stop rule except `max_iterations`
    /// itself, forcing the loop to exhaust its budget.
    pub force_max_iterations: bool,
    /// Per-subscriber event channel capacity.
    pub event_channel_capacity: usize,
    /// Wall-clock budget per reviewer call before treating it as transient.
    pub reviewer_timeout: Duration,
}

impl Config {
    /// Construct a config with environment-overridable defaults, then
    /// validate the caller-supplied fields.
    pub fn new(document: impl Into<String>, max_iterations: u32) -> RoundtableResult<Self> {
        let cfg = Self {
            document: document.into(),
            title: None,
            document_type: None,
            goal: None,
            domain_hint: None,
            role_specs: None,
            num_participants: env_u32("ROUNDTABLE_NUM_PARTICIPANTS", 3) as usize,
            max_iterations,
            stop_on_no_high_issues: env_bool("ROUNDTABLE_STOP_ON_NO_HIGH", true),
            delta_threshold: env_f64("ROUNDTABLE_DELTA_THRESHOLD", 0.02),
            force_max_iterations: env_bool("ROUNDTABLE_FORCE_MAX_ITERATIONS", false),
            event_channel_capacity: env_u32("ROUNDTABLE_EVENT_CAPACITY", 256) as usize,
            reviewer_timeout: Duration::from_secs(env_u32("ROUNDTABLE_REVIEWER_TIMEOUT_SECS", 60) as u64),
        };
        cfg.validate()
    }

    fn validate(self) -> RoundtableResult<Self> {
        if self.document.trim().is_empty() {
            return Err(RoundtableError::InputValidation(
                "document must not be empty".into(),
            ));
        }
        if self.max_iterations < MIN_MAX_ITERATIONS {
            return Err(RoundtableError::InputValidation(format!(
                "max_iterations must be >= {MIN_MAX_ITERATIONS}"
            )));
        }
        let participants = self
            .role_specs
            .as_ref()
            .map(|r| r.len())
            .unwrap_or(self.num_participants);
        if !(MIN_PARTICIPANTS..=MAX_PARTICIPANTS).contains(&participants) {
            return Err(RoundtableError::InputValidation(format!(
                "participant count {participants} out of range [{MIN_PARTICIPANTS}, {MAX_PARTICIPANTS}]"
            )));
        }
        if !(0.0..=1.0).contains(&self.delta_threshold) {
            return Err(RoundtableError::InputValidation(
                "delta_threshold must be in [0, 1]".into(),
            ));
        }
        Ok(self)
    }

    pub fn with_role_specs(mut self, specs: Vec<RoleSpec>) -> RoundtableResult<Self> {
        self.role_specs = Some(specs);
        self.validate()
    }

    pub fn with_domain_hint(mut self, hint: impl Into<String>) -> Self {
        self.domain_hint = Some(hint.into());
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_document_type(mut self, document_type: impl Into<String>) -> Self {
        self.document_type = Some(document_type.into());
        self
    }

    pub fn with_goal(mut self, goal: impl Into<String>) -> Self {
        self.goal = Some(goal.into());
        self
    }

    pub fn with_force_max_iterations(mut self, force: bool) -> Self {
        self.force_max_iterations = force;
        self
    }
}
