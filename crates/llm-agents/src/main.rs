//! CLI binary: drives one roundtable refinement session end to end
//! against the production `rig-core`-backed agents and prints its
//! event stream and final report to stdout.
//!
//! This binary exists for demonstration purposes only — a real caller
//! is expected to embed `roundtable::RoundtableEngine` behind its own
//! HTTP/RPC surface rather than shell out to this CLI. Grounded on the
//! teacher's `main.rs` (`SwarmConfig::default` + one top-level run
//! loop), replaced here with `clap`-parsed flags driving a single
//! session instead of an open-ended coding swarm.

use std::io::Read as _;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use roundtable::agents::ReviewerAgent;
use roundtable::entry::RoundtableEngine;
use roundtable::events::RoundtableEvent;
use roundtable::runtime::AgentSet;
use roundtable::store::FsStore;
use roundtable::Config;

use llm_agents::cli::Args;
use llm_agents::config::AgentConfig;
use llm_agents::llm_client::RigLlmClient;
use llm_agents::model_pool::ModelPool;
use llm_agents::moderator::LlmModerator;
use llm_agents::planner::LlmMetaPlanner;
use llm_agents::reviewer::LlmReviewer;

fn read_document(args: &Args) -> Result<String> {
    match &args.document {
        Some(path) => Ok(std::fs::read_to_string(path)?),
        None => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            Ok(buf)
        }
    }
}

fn print_event(event: &RoundtableEvent) {
    match event {
        RoundtableEvent::SessionCreated { session_id, .. } => {
            println!("[session {session_id}] created");
        }
        RoundtableEvent::RoundtableGenerating { .. } => {
            println!("planning reviewer roles...");
        }
        RoundtableEvent::RoundtableGenerated { participants, moderator_focus, .. } => {
            println!("roundtable generated: {} participant(s) — {participants:?}", participants.len());
            println!("  moderator focus: {moderator_focus}");
        }
        RoundtableEvent::IterationStart { iteration, max_iterations, .. } => {
            println!("--- iteration {iteration}/{max_iterations} ---");
        }
        RoundtableEvent::CriticReviewStart { participant_id, .. } => {
            println!("  {participant_id}: reviewing...");
        }
        RoundtableEvent::CriticReviewComplete {
            participant_id,
            issues_count,
            counts_by_severity,
            ..
        } => {
            println!("  {participant_id}: done ({issues_count} issue(s), {} high-severity)", counts_by_severity.high);
        }
        RoundtableEvent::ModeratorStart { .. } => {
            println!("  moderator: synthesizing next version...");
        }
        RoundtableEvent::ModeratorComplete { resulting_version, .. } => {
            println!("  moderator: produced version {resulting_version}");
        }
        RoundtableEvent::ConvergenceCheck { delta, converged, reason, .. } => {
            println!("  convergence: delta={delta:.4} converged={converged} ({reason})");
        }
        RoundtableEvent::RefinementComplete {
            total_iterations, converged, ..
        } => {
            println!("=== refinement complete after {total_iterations} iteration(s), converged={converged} ===");
        }
        RoundtableEvent::Log { level, message, .. } => {
            println!("  [{level:?}] {message}");
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let document = read_document(&args)?;

    let agent_config = AgentConfig::from_env();
    let client = agent_config.build_client()?;
    let pool = ModelPool::new(agent_config.reviewer_models.clone());

    // Each worker is a model binding only; the driver supplies the role
    // a worker reviews under on every call, round-robining this pool
    // against whatever role set the session's meta-planner produces.
    let reviewers: Vec<Arc<dyn ReviewerAgent>> = pool
        .assign(args.participants)
        .into_iter()
        .map(|model| {
            let llm = Arc::new(RigLlmClient::new(client.clone(), model, agent_config.max_retries));
            Arc::new(LlmReviewer::new(llm)) as Arc<dyn ReviewerAgent>
        })
        .collect();

    let moderator_llm = Arc::new(RigLlmClient::new(client.clone(), agent_config.moderator_model.clone(), agent_config.max_retries));
    let planner_llm = Arc::new(RigLlmClient::new(client.clone(), agent_config.planner_model.clone(), agent_config.max_retries));

    let agents = AgentSet {
        reviewers,
        moderator: Arc::new(LlmModerator::new(moderator_llm)),
        planner: Arc::new(LlmMetaPlanner::new(planner_llm)),
    };

    info!(
        participants = args.participants,
        moderator_model = %agent_config.moderator_model,
        store_dir = %args.store_dir.display(),
        "roundtable CLI starting"
    );

    let store = Arc::new(FsStore::new(args.store_dir.clone()));
    let engine = RoundtableEngine::new(store, agents);

    let mut config = Config::new(document, args.max_iterations)?.with_force_max_iterations(args.force_max_iterations);
    config.delta_threshold = args.delta_threshold;
    config.num_participants = args.participants;
    if let Some(domain) = &args.domain {
        config = config.with_domain_hint(domain.clone());
    }

    let handle = engine.start(config).await?;
    info!(session_id = %handle.id(), "session started");

    let mut subscription = handle.subscribe();
    let events_task = tokio::spawn(async move {
        while let Some(event) = subscription.recv().await {
            print_event(&event);
        }
    });

    let session = handle.join().await?;
    events_task.abort();

    if let Some(report) = &session.report {
        println!();
        println!("stopped_by:        {:?} ({})", report.stopped_by, report.convergence_reason);
        println!("converged:         {}", report.converged);
        println!("total_iterations:  {}", report.total_iterations);
        println!("final_version:     {}", report.final_version);
        println!("final_delta:       {:.4}", report.final_delta);
        println!("issues identified: {}", report.total_issues_identified);
    }
    println!();
    println!("{}", session.latest_version().content);

    Ok(())
}
