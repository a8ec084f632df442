//! Pure convergence decision engine.
//!
//! Grounded on the ordered-check pattern in the teacher's guardrail
//! engine: each rule is evaluated in a fixed order and the first one
//! that fires wins. The engine itself holds no state — it is a plain
//! function over a config and the iteration history so far, matching
//! the teacher's `ConsensusProtocol`/`GuardrailEngine` pure-evaluator
//! shape.

use crate::model::{IterationRecord, StoppedBy};

use super::delta::DELTA_METRIC_NAME;

/// A caller-supplied early-stop predicate, evaluated against the
/// iteration history so far.
pub type CustomPredicate = Box<dyn Fn(&[IterationRecord]) -> bool + Send + Sync>;

/// The inputs the engine needs beyond the iteration history itself.
pub struct ConvergenceConfig<'a> {
    pub max_iterations: u32,
    pub stop_on_no_high_issues: bool,
    pub delta_threshold: f64,
    /// When set, suppresses every other stop rule until the iteration
    /// cap itself is hit — see spec §4.1 rule 1.
    pub force_max_iterations: bool,
    pub custom_predicate: Option<&'a CustomPredicate>,
}

/// Result of evaluating the six ordered rules against the current
/// iteration history, per spec §4.1's `StopDecision{should_stop,
/// reason, stopped_by}` contract.
#[derive(Debug, Clone, PartialEq)]
pub struct StopDecision {
    pub should_stop: bool,
    pub reason: String,
    /// `None` exactly when `should_stop` is false.
    pub stopped_by: Option<StoppedBy>,
}

impl StopDecision {
    fn continue_with(reason: impl Into<String>) -> Self {
        Self {
            should_stop: false,
            reason: reason.into(),
            stopped_by: None,
        }
    }

    fn stop(stopped_by: StoppedBy, reason: impl Into<String>) -> Self {
        Self {
            should_stop: true,
            reason: reason.into(),
            stopped_by: Some(stopped_by),
        }
    }
}

/// Evaluate the ordered stop rules. Called after every iteration's
/// reviews + moderator pass have been recorded.
///
/// Rule order (first match wins), per spec §4.1:
/// 1. force_max_iterations — if set and the cap hasn't been hit yet,
///    every other rule below is suppressed for this iteration. This is
///    the only rule that can make the engine continue past a condition
///    that would otherwise stop it.
/// 2. custom predicate.
/// 3. no_high_issues — the session is configured to stop as soon as
///    the latest round of reviews carries no High-severity issues.
/// 4. max_iterations — the configured ceiling was reached. The reason
///    string always names the cap, and additionally reports the
///    remaining High-severity count when it's nonzero.
/// 5. delta_threshold — consecutive versions have stabilized. Never
///    evaluated before two iteration records exist, so iteration 1 can
///    never trigger it.
/// 6. continue.
pub fn decide(config: &ConvergenceConfig<'_>, iterations: &[IterationRecord]) -> StopDecision {
    let completed = iterations.len() as u32;

    if config.force_max_iterations && completed < config.max_iterations {
        return StopDecision::continue_with("force_max_iterations is set and the cap has not been reached yet");
    }

    if let Some(predicate) = config.custom_predicate {
        if predicate(iterations) {
            return StopDecision::stop(StoppedBy::CustomPredicate, "a custom stop predicate fired");
        }
    }

    if config.stop_on_no_high_issues {
        if let Some(latest) = iterations.last() {
            if !latest.any_high_severity_issue() {
                return StopDecision::stop(
                    StoppedBy::NoHighIssues,
                    "the latest round of reviews raised no high-severity issues",
                );
            }
        }
    }

    if completed >= config.max_iterations {
        let remaining_high = iterations.last().map(|i| i.high_severity_count()).unwrap_or(0);
        let reason = if remaining_high > 0 {
            format!(
                "max_iterations ({}) was reached with {remaining_high} high-severity issue(s) still outstanding",
                config.max_iterations
            )
        } else {
            format!("max_iterations ({}) was reached", config.max_iterations)
        };
        return StopDecision::stop(StoppedBy::MaxIterations, reason);
    }

    if iterations.len() >= 2 {
        if let Some(latest) = iterations.last() {
            if latest.delta < config.delta_threshold {
                return StopDecision::stop(
                    StoppedBy::DeltaThreshold,
                    format!(
                        "delta {:.4} fell below the threshold {:.4}",
                        latest.delta, config.delta_threshold
                    ),
                );
            }
        }
    }

    StopDecision::continue_with("no stop rule fired")
}

pub fn delta_metric_name() -> &'static str {
    DELTA_METRIC_NAME
}
