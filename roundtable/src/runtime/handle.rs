//! The public, caller-facing session API.
//!
//! This is the "hosting service" boundary SPEC_FULL.md §6 describes:
//! a plain async Rust API a caller (HTTP layer, CLI, test) wraps
//! however it likes. Grounded on the operation surface of the
//! teacher's `DebateOrchestrator` (`start`/`next_action`/`submit_*`/
//! `outcome`), adapted to the spec's `start`/`status`/`continue`/
//! `delete` + artifact retrieval + event subscription contract.

use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::agents::{MetaPlanner, ModeratorAgent, ReviewerAgent};
use crate::config::Config;
use crate::error::{RoundtableError, RoundtableResult};
use crate::events::{EventFilter, FilteredReceiver, SharedEventBus, Subscription};
use crate::model::{ConvergenceReport, DocumentVersion, Review, Session, SessionId, SessionStatus};
use crate::store::Store;

use super::driver::{self, CancelToken, DriverDeps};

/// The caller-facing status snapshot spec §4.6/§6 describe: the bare
/// lifecycle enum plus the progress/outcome fields a caller needs to
/// render a session without a second round-trip for the report.
#[derive(Debug, Clone)]
pub struct SessionStatusView {
    pub status: SessionStatus,
    pub current_iteration: u32,
    pub max_iterations: u32,
    /// The latest committed document version, or `None` for a session
    /// that just started Planning and has not produced one yet.
    pub final_version: Option<u32>,
}

/// The set of agents a session runs with, bundled so a `continue`
/// call can rebuild `DriverDeps` without the caller re-supplying them.
#[derive(Clone)]
pub struct AgentSet {
    pub reviewers: Vec<Arc<dyn ReviewerAgent>>,
    pub moderator: Arc<dyn ModeratorAgent>,
    pub planner: Arc<dyn MetaPlanner>,
}

pub struct RoundtableHandle {
    id: SessionId,
    store: Arc<dyn Store>,
    bus: SharedEventBus,
    cancel: CancelToken,
    agents: AgentSet,
    task: Mutex<Option<JoinHandle<RoundtableResult<Session>>>>,
}

impl RoundtableHandle {
    pub(crate) fn spawn(
        id: SessionId,
        config: Config,
        store: Arc<dyn Store>,
        bus: SharedEventBus,
        agents: AgentSet,
    ) -> Arc<Self> {
        let cancel = CancelToken::new();
        let deps = DriverDeps {
            store: store.clone(),
            bus: bus.clone(),
            reviewers: agents.reviewers.clone(),
            moderator: agents.moderator.clone(),
            planner: agents.planner.clone(),
            cancel: cancel.clone(),
        };
        let task = tokio::spawn(driver::run_session(id, config, deps));
        Arc::new(Self {
            id,
            store,
            bus,
            cancel,
            agents,
            task: Mutex::new(Some(task)),
        })
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Current status, read from the store (reflects the latest
    /// iteration the driver has committed, not just an in-memory flag).
    /// `final_version` is the report's final version once the session
    /// has stopped, or the latest committed version while still running.
    pub async fn status(&self) -> RoundtableResult<SessionStatusView> {
        let session = self.store.get_session(self.id).await.map_err(RoundtableError::from_store_read)?;
        Ok(SessionStatusView {
            status: session.status,
            current_iteration: session.iterations.len() as u32,
            max_iterations: session.max_iterations,
            final_version: session
                .report
                .as_ref()
                .map(|r| r.final_version)
                .or_else(|| session.versions.last().map(|v| v.version)),
        })
    }

    pub async fn get_version(&self, version: u32) -> RoundtableResult<DocumentVersion> {
        self.store.get_version(self.id, version).await.map_err(RoundtableError::from_store_read)
    }

    pub async fn get_reviews(&self, version: u32) -> RoundtableResult<Vec<Review>> {
        self.store.get_reviews(self.id, version).await.map_err(RoundtableError::from_store_read)
    }

    pub async fn get_report(&self) -> RoundtableResult<Option<ConvergenceReport>> {
        self.store.get_report(self.id).await.map_err(RoundtableError::from_store_read)
    }

    pub async fn get_session(&self) -> RoundtableResult<Session> {
        self.store.get_session(self.id).await.map_err(RoundtableError::from_store_read)
    }

    pub fn subscribe(&self) -> Subscription {
        self.bus.subscribe()
    }

    pub fn subscribe_filtered(&self, filter: EventFilter) -> FilteredReceiver {
        use crate::events::EventBusExt;
        self.bus.subscribe_filtered(filter)
    }

    /// Request cancellation. Cooperative: the driver observes this at
    /// the next barrier, it does not interrupt an in-flight call.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Wait for the driver task to finish and return the final session.
    pub async fn join(&self) -> RoundtableResult<Session> {
        let mut guard = self.task.lock().await;
        match guard.take() {
            Some(task) => task.await.map_err(|e| RoundtableError::Conflict(e.to_string()))?,
            None => self.get_session().await,
        }
    }

    /// Resume a session stopped by `MaxIterations`, running
    /// `extra_iterations` more rounds. Spawns a new driver task;
    /// `join`/`status`/artifact reads transparently pick up the resumed
    /// run since they always read through the store.
    pub async fn continue_session(self: &Arc<Self>, extra_iterations: u32, config: Config) -> RoundtableResult<()> {
        {
            let guard = self.task.lock().await;
            if guard.is_some() {
                return Err(RoundtableError::Conflict("session is still running".into()));
            }
        }
        let session = self.get_session().await?;
        let cancel = CancelToken::new();
        let deps = DriverDeps {
            store: self.store.clone(),
            bus: self.bus.clone(),
            reviewers: self.agents.reviewers.clone(),
            moderator: self.agents.moderator.clone(),
            planner: self.agents.planner.clone(),
            cancel: cancel.clone(),
        };
        let task = tokio::spawn(driver::continue_session(session, config, extra_iterations, deps));
        *self.task.lock().await = Some(task);
        Ok(())
    }

    /// Remove a session and all its artifacts. Spec §4.6: only legal
    /// once the session has reached a terminal status; deleting a
    /// still-running session would race the driver's own writes.
    pub async fn delete(&self) -> RoundtableResult<()> {
        let session = self.store.get_session(self.id).await.map_err(RoundtableError::from_store_read)?;
        if !session.status.is_terminal() {
            return Err(RoundtableError::Conflict(format!(
                "cannot delete session in non-terminal status {:?}",
                session.status
            )));
        }
        Ok(self.store.delete_session(self.id).await?)
    }
}
