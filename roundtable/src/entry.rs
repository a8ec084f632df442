//! The public entry point: construct an engine once (bound to a store
//! and a set of agents), then `start` as many sessions as you like.

use std::sync::Arc;

use crate::config::Config;
use crate::error::{RoundtableError, RoundtableResult};
use crate::events::EventBus;
use crate::model::SessionId;
use crate::runtime::{AgentSet, RoundtableHandle, SessionRegistry};
use crate::store::Store;

/// Minimal listing entry for a persisted session, independent of
/// whether a live `RoundtableHandle` for it still exists in this
/// process (spec §6's `list_sessions()`).
pub struct SessionMetadata {
    pub id: SessionId,
    pub status: crate::model::SessionStatus,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

pub struct RoundtableEngine {
    store: Arc<dyn Store>,
    agents: AgentSet,
    registry: Arc<SessionRegistry>,
}

impl RoundtableEngine {
    pub fn new(store: Arc<dyn Store>, agents: AgentSet) -> Self {
        Self {
            store,
            agents,
            registry: Arc::new(SessionRegistry::new()),
        }
    }

    /// Start a new refinement session and return its handle
    /// immediately; the driver runs in the background.
    pub async fn start(&self, config: Config) -> RoundtableResult<Arc<RoundtableHandle>> {
        let id = SessionId::new();
        let bus = EventBus::new(config.event_channel_capacity).shared();
        let handle = RoundtableHandle::spawn(id, config, self.store.clone(), bus, self.agents.clone());
        self.registry.insert(handle.clone()).await;
        Ok(handle)
    }

    pub async fn get(&self, id: SessionId) -> Option<Arc<RoundtableHandle>> {
        self.registry.get(id).await
    }

    pub async fn list(&self) -> Vec<SessionId> {
        self.registry.list().await
    }

    pub async fn forget(&self, id: SessionId) -> Option<Arc<RoundtableHandle>> {
        self.registry.remove(id).await
    }

    /// Durable listing, newest-first, independent of which sessions
    /// still have a live handle in this process (spec §6
    /// `list_sessions()`).
    pub async fn list_sessions(&self) -> RoundtableResult<Vec<SessionMetadata>> {
        let ids = self.store.list_sessions().await.map_err(RoundtableError::from_store_read)?;
        let mut out = Vec::with_capacity(ids.len());
        for id in ids {
            let session = self.store.get_session(id).await.map_err(RoundtableError::from_store_read)?;
            out.push(SessionMetadata {
                id: session.id,
                status: session.status,
                created_at: session.created_at,
            });
        }
        Ok(out)
    }

    /// Delete a session's persisted artifacts. Requires a live handle
    /// (§4.6's precondition — terminal status — is enforced by
    /// `RoundtableHandle::delete`); also drops the handle from this
    /// process's registry.
    pub async fn delete(&self, id: SessionId) -> RoundtableResult<()> {
        match self.registry.get(id).await {
            Some(handle) => {
                handle.delete().await?;
                self.registry.remove(id).await;
                Ok(())
            }
            None => Err(RoundtableError::NotFound(id.to_string())),
        }
    }
}
