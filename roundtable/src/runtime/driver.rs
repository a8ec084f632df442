//! The iteration loop: plan once, then alternate reviewer fan-out and
//! moderator synthesis until the convergence engine says to stop.
//!
//! Grounded on the teacher's `DebateOrchestrator` (`debate/orchestrator.rs`):
//! a driver owning a state machine, driving a bounded loop of
//! submit/evaluate rounds and recording a terminal outcome.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::Utc;
use futures::future::join_all;
use tracing::{error, info, warn};

use crate::agents::{generic_template, MetaPlanner, ModeratorAgent, PlanOutput, ReviewerAgent};
use crate::config::Config;
use crate::convergence::{self, ConvergenceConfig};
use crate::error::{RoundtableError, RoundtableResult};
use crate::events::{RoundtableEvent, SharedEventBus};
use crate::model::{
    ConvergenceReport, DocumentVersion, IterationRecord, Participant, Review, Session, SessionId, SessionStatus,
};
use crate::store::Store;

use super::state_machine::{DriverState, DriverStateMachine};

/// Cooperative cancellation handle, checked at the barriers between
/// reviewer fan-in, moderator synthesis, and the next iteration.
#[derive(Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Everything the driver needs to run one session, beyond the
/// `Config` itself.
///
/// `reviewers` is a role-agnostic worker pool, not one slot per
/// session participant: the driver round-robins each session's
/// `Participant`s across however many workers are configured, so the
/// meta-planner's role set — not the pool's size — determines who
/// gets reviewed by whom.
pub struct DriverDeps {
    pub store: Arc<dyn Store>,
    pub bus: SharedEventBus,
    pub reviewers: Vec<Arc<dyn ReviewerAgent>>,
    pub moderator: Arc<dyn ModeratorAgent>,
    pub planner: Arc<dyn MetaPlanner>,
    pub cancel: CancelToken,
}

/// Run a brand-new session to completion (or until cancelled / a fatal
/// error). Returns the final `Session` with its `report` populated.
pub async fn run_session(id: SessionId, config: Config, deps: DriverDeps) -> RoundtableResult<Session> {
    let mut sm = DriverStateMachine::new();
    let now = Utc::now();
    let mut initial_version = DocumentVersion::initial(config.document.clone(), now);
    if let Some(title) = &config.title {
        initial_version = initial_version.with_title(title.clone());
    }
    if let Some(document_type) = &config.document_type {
        initial_version = initial_version.with_document_type(document_type.clone());
    }
    let mut session = Session::new(id, initial_version, now);
    session.max_iterations = config.max_iterations;

    let requested_participants = config.role_specs.as_ref().map(|r| r.len()).unwrap_or(config.num_participants);
    deps.bus.publish(RoundtableEvent::SessionCreated {
        session_id: id,
        title: config.title.clone(),
        max_iterations: config.max_iterations,
        num_participants: requested_participants,
        domain_hint: config.domain_hint.clone(),
        timestamp: now,
    });

    sm.transition(DriverState::Planning).expect("Pending -> Planning is always legal");
    session.status = SessionStatus::Planning;
    deps.bus.publish(RoundtableEvent::RoundtableGenerating {
        session_id: id,
        message: "meta-planner generating reviewer roles".to_string(),
        num_participants: requested_participants,
        timestamp: Utc::now(),
    });

    let plan = plan_participants(&config, deps.planner.as_ref()).await?;
    session.participants = plan.participants;
    session.moderator_focus = plan.moderator_focus;
    session.planner_tokens = plan.token_counts;

    deps.bus.publish(RoundtableEvent::RoundtableGenerated {
        session_id: id,
        participants: session.participants.iter().map(|p| p.id.clone()).collect(),
        moderator_focus: session.moderator_focus.clone(),
        timestamp: Utc::now(),
    });

    deps.store.create_session(&session).await?;

    sm.transition(DriverState::Running).expect("Planning -> Running is always legal");
    session.status = SessionStatus::Running;

    let outcome = run_iterations(&mut session, &config, &deps, &mut sm).await;

    match outcome {
        Ok(()) => {
            session.updated_at = Utc::now();
            deps.store.save_session(&session).await?;
            info!(session_id = %id, "session finished");
            Ok(session)
        }
        Err(err) => {
            if sm.current() != DriverState::Cancelled {
                let _ = sm.transition(DriverState::Failed);
                session.status = SessionStatus::Failed;
            }
            session.updated_at = Utc::now();
            let _ = deps.store.save_session(&session).await;
            error!(session_id = %id, error = %err, "session failed");
            Err(err)
        }
    }
}

/// Resume a session previously stopped by `MaxIterations`, running up
/// to `extra_iterations` additional rounds under (otherwise) the same
/// config.
pub async fn continue_session(
    mut session: Session,
    mut config: Config,
    extra_iterations: u32,
    deps: DriverDeps,
) -> RoundtableResult<Session> {
    match session.report.as_ref().map(|r| r.stopped_by) {
        Some(crate::model::StoppedBy::MaxIterations) => {}
        Some(other) => {
            return Err(RoundtableError::Conflict(format!(
                "cannot continue a session stopped by {other:?}"
            )))
        }
        None => return Err(RoundtableError::Conflict("session has not stopped yet".into())),
    }
    // Spec §4.6: continuation additionally requires the final iteration
    // to have left outstanding High-severity issues — a max-iterations
    // stop with none (e.g. under `force_max_iterations`) has nothing
    // left for another round to resolve.
    let last_high_count = session.iterations.last().map(|it| it.high_severity_count()).unwrap_or(0);
    if last_high_count == 0 {
        return Err(RoundtableError::Conflict(
            "cannot continue: last iteration has no outstanding High-severity issues".into(),
        ));
    }

    config.max_iterations = session.iterations.len() as u32 + extra_iterations;
    session.max_iterations = config.max_iterations;
    session.report = None;
    session.status = SessionStatus::Running;

    let mut sm = DriverStateMachine::new();
    sm.transition(DriverState::Planning).unwrap();
    sm.transition(DriverState::Running).unwrap();

    match run_iterations(&mut session, &config, &deps, &mut sm).await {
        Ok(()) => {
            session.updated_at = Utc::now();
            deps.store.save_session(&session).await?;
            Ok(session)
        }
        Err(err) => {
            session.status = SessionStatus::Failed;
            session.updated_at = Utc::now();
            let _ = deps.store.save_session(&session).await;
            Err(err)
        }
    }
}

/// `plan_participants`'s result, with role specs already bound into
/// the session's stable `Participant` identities.
struct ResolvedPlan {
    participants: Vec<Participant>,
    moderator_focus: String,
    token_counts: crate::model::TokenCounts,
}

fn resolve_plan(plan: PlanOutput) -> ResolvedPlan {
    ResolvedPlan {
        participants: plan.role_specs.into_iter().map(Participant::from_role).collect(),
        moderator_focus: plan.moderator_focus,
        token_counts: plan.token_counts,
    }
}

async fn plan_participants(config: &Config, planner: &dyn MetaPlanner) -> RoundtableResult<ResolvedPlan> {
    if let Some(specs) = &config.role_specs {
        return Ok(resolve_plan(PlanOutput {
            role_specs: specs.clone(),
            moderator_focus: crate::agents::DEFAULT_MODERATOR_FOCUS.to_string(),
            token_counts: Default::default(),
        }));
    }

    let plan = match planner
        .plan(&config.document, config.domain_hint.as_deref(), config.num_participants)
        .await
    {
        Ok(plan) if !plan.role_specs.is_empty() => plan,
        Ok(_) => PlanOutput::fallback(fallback_role_specs(config)),
        Err(err) => {
            warn!(error = %err, "meta-planner failed, falling back to built-in template");
            PlanOutput::fallback(fallback_role_specs(config))
        }
    };

    Ok(resolve_plan(plan))
}

fn fallback_role_specs(config: &Config) -> Vec<crate::model::RoleSpec> {
    config
        .domain_hint
        .as_deref()
        .and_then(crate::agents::builtin_preset)
        .unwrap_or_else(|| generic_template(config.num_participants))
}

async fn run_iterations(
    session: &mut Session,
    config: &Config,
    deps: &DriverDeps,
    sm: &mut DriverStateMachine,
) -> RoundtableResult<()> {
    loop {
        if deps.cancel.is_cancelled() {
            sm.transition(DriverState::Cancelled).ok();
            session.status = SessionStatus::Cancelled;
            session.report = Some(build_report(
                session,
                crate::model::StoppedBy::Cancelled,
                "the session was cancelled".to_string(),
                session.iterations.last().map(|i| i.delta).unwrap_or(0.0),
            ));
            return Err(RoundtableError::CancelRequested);
        }

        let iteration_no = session.iterations.len() as u32 + 1;
        let started_at = Utc::now();
        deps.bus.publish(RoundtableEvent::IterationStart {
            session_id: session.id,
            iteration: iteration_no,
            max_iterations: config.max_iterations,
            timestamp: started_at,
        });

        let input_version = session.latest_version().version;
        let document = session.latest_version().content.clone();

        // Delta measures how much the *previous* moderator pass changed
        // the document (input_version vs. the version before it) — it
        // is known before this iteration's reviewers or moderator run,
        // which is what lets the convergence decision below happen
        // ahead of the (possibly skipped) moderator step.
        let delta = if session.versions.len() < 2 {
            0.0
        } else {
            let prev = &session.versions[session.versions.len() - 2];
            let cur = &session.versions[session.versions.len() - 1];
            convergence::delta(&prev.content, &cur.content)
        };

        let reviews = fan_out_reviewers(session.id, iteration_no, &document, &session.participants, deps).await?;
        check_reviews_match_participants(&reviews, &session.participants)?;
        deps.store.put_reviews(session.id, input_version, &reviews).await?;

        let mut record = IterationRecord {
            iteration: iteration_no,
            input_version,
            reviews,
            output_version: None,
            delta,
            convergence_reason: String::new(),
            moderator_tokens: Default::default(),
            started_at,
            finished_at: started_at,
        };

        // Build the tentative history (current record included) the
        // engine needs; it only reads `reviews`/`delta`/count, never
        // `output_version`, so this is safe to evaluate before the
        // moderator has run.
        let mut tentative_history = session.iterations.clone();
        tentative_history.push(record.clone());

        let decision = convergence::decide(
            &ConvergenceConfig {
                max_iterations: config.max_iterations,
                stop_on_no_high_issues: config.stop_on_no_high_issues,
                delta_threshold: config.delta_threshold,
                force_max_iterations: config.force_max_iterations,
                custom_predicate: None,
            },
            &tentative_history,
        );
        record.convergence_reason = decision.reason.clone();

        deps.bus.publish(RoundtableEvent::ConvergenceCheck {
            session_id: session.id,
            iteration: iteration_no,
            delta,
            issue_counts: record.issue_counts(),
            converged: decision.should_stop,
            reason: decision.reason.clone(),
            timestamp: Utc::now(),
        });

        if decision.should_stop {
            let stopped_by = decision.stopped_by.expect("should_stop implies stopped_by is set");
            record.finished_at = Utc::now();
            session.iterations.push(record);
            session.updated_at = session.iterations.last().unwrap().finished_at;

            sm.transition(DriverState::Completed).expect("Running -> Completed is always legal");
            session.status = SessionStatus::Completed;
            let report = build_report(session, stopped_by, decision.reason, delta);
            deps.store.put_report(session.id, &report).await?;
            session.report = Some(report.clone());
            deps.store.save_session(session).await?;
            deps.bus.publish(RoundtableEvent::RefinementComplete {
                session_id: session.id,
                total_iterations: session.iterations.len() as u32,
                final_version: report.final_version,
                converged: report.converged,
                stopped_by: Some(stopped_by),
                timestamp: Utc::now(),
            });
            return Ok(());
        }

        deps.bus.publish(RoundtableEvent::ModeratorStart {
            session_id: session.id,
            iteration: iteration_no,
            timestamp: Utc::now(),
        });
        let moderator_output = deps
            .moderator
            .moderate(&document, &record.reviews, &session.moderator_focus, config.goal.as_deref())
            .await?;
        let next_version = session.latest_version().next(moderator_output.content, Utc::now());
        deps.store.put_version(session.id, &next_version).await?;
        deps.bus.publish(RoundtableEvent::ModeratorComplete {
            session_id: session.id,
            iteration: iteration_no,
            resulting_version: next_version.version,
            tokens: moderator_output.token_counts,
            timestamp: Utc::now(),
        });

        record.output_version = Some(next_version.version);
        record.moderator_tokens = moderator_output.token_counts;
        record.finished_at = Utc::now();
        session.versions.push(next_version);
        session.iterations.push(record);
        session.updated_at = session.iterations.last().unwrap().finished_at;

        deps.store.save_session(session).await?;

        sm.transition(DriverState::Running).expect("Running -> Running is always legal");
    }
}

fn build_report(session: &Session, stopped_by: crate::model::StoppedBy, reason: String, final_delta: f64) -> ConvergenceReport {
    let total_issues_identified: usize = session
        .iterations
        .iter()
        .flat_map(|it| &it.reviews)
        .map(|r| r.issues.len())
        .sum();
    let history = session
        .iterations
        .iter()
        .map(|it| it.to_summary(it.iteration == session.iterations.len() as u32))
        .collect();

    ConvergenceReport {
        session_id: session.id,
        title: session.versions.first().and_then(|v| v.title.clone()),
        initial_version: session.versions.first().map(|v| v.version).unwrap_or(1),
        final_version: session.latest_version().version,
        total_iterations: session.iterations.len() as u32,
        converged: stopped_by.is_convergence(),
        convergence_reason: reason,
        stopped_by,
        total_issues_identified,
        final_issue_count: session.iterations.last().map(|it| it.issue_counts()).unwrap_or_default(),
        started_at: session.created_at,
        ended_at: Utc::now(),
        history,
        token_totals: session.token_totals_by_participant(),
        participants: session.participants.iter().map(|p| p.id.clone()).collect(),
        delta_metric: convergence::delta_metric_name().to_string(),
        final_delta,
    }
}

/// Spec §3's mandatory invariant: the set of participant ids a round
/// of reviews is attributed to must exactly match the session's
/// planned participants, both in count and by name. A mismatch means
/// a reviewer worker failed to honor the role it was handed (or the
/// worker pool round-robin skipped someone) and the iteration's
/// results cannot be trusted — this aborts the session rather than
/// silently recording a partial or misattributed round.
fn check_reviews_match_participants(reviews: &[Review], participants: &[Participant]) -> RoundtableResult<()> {
    if reviews.len() != participants.len() {
        return Err(RoundtableError::ReviewParticipantMismatch(format!(
            "expected {} reviews (one per participant), got {}",
            participants.len(),
            reviews.len()
        )));
    }
    let mut expected: Vec<&str> = participants.iter().map(|p| p.id.as_str()).collect();
    let mut actual: Vec<&str> = reviews.iter().map(|r| r.participant_id.as_str()).collect();
    expected.sort_unstable();
    actual.sort_unstable();
    if expected != actual {
        return Err(RoundtableError::ReviewParticipantMismatch(format!(
            "review participant ids {actual:?} do not match session participants {expected:?}"
        )));
    }
    Ok(())
}

/// Rank a review's issues worst-first (High, then Medium, then Low)
/// and return up to `limit` summaries, for the event bus's
/// `top_issues` field.
fn top_issue_summaries(review: &Review, limit: usize) -> Vec<String> {
    let mut issues: Vec<_> = review.issues.iter().collect();
    issues.sort_by(|a, b| b.severity.cmp(&a.severity));
    issues.into_iter().take(limit).map(|i| i.summary.clone()).collect()
}

async fn fan_out_reviewers(
    session_id: SessionId,
    iteration: u32,
    document: &str,
    participants: &[Participant],
    deps: &DriverDeps,
) -> RoundtableResult<Vec<Review>> {
    if deps.reviewers.is_empty() {
        return Err(RoundtableError::InputValidation("no reviewer workers configured".into()));
    }

    let futures = participants.iter().enumerate().map(|(i, participant)| {
        let bus = deps.bus.clone();
        let worker = deps.reviewers[i % deps.reviewers.len()].clone();
        async move {
            bus.publish(RoundtableEvent::CriticReviewStart {
                session_id,
                iteration,
                participant_id: participant.id.clone(),
                timestamp: Utc::now(),
            });
            let result = worker.review(document, &participant.role).await;
            if let Ok(review) = &result {
                bus.publish(RoundtableEvent::CriticReviewComplete {
                    session_id,
                    iteration,
                    participant_id: participant.id.clone(),
                    issues_count: review.issues.len(),
                    counts_by_severity: review.counts_by_severity(),
                    top_issues: top_issue_summaries(review, 3),
                    tokens: review.token_counts,
                    timestamp: Utc::now(),
                });
            }
            result
        }
    });

    join_all(futures).await.into_iter().collect()
}
