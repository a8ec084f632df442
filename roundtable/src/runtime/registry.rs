//! Per-process registry of live session handles.
//!
//! Grounded on the teacher's `SharedEventBus`/`SharedStateStore`
//! `Arc`-wrapper convention: a plain `Arc<RwLock<HashMap<..>>>` rather
//! than an actor or supervisor tree, since session lifetimes here are
//! just tracked `tokio::spawn`ed tasks.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::model::SessionId;

use super::handle::RoundtableHandle;

#[derive(Default)]
pub struct SessionRegistry {
    handles: RwLock<HashMap<SessionId, Arc<RoundtableHandle>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, handle: Arc<RoundtableHandle>) {
        self.handles.write().await.insert(handle.id(), handle);
    }

    pub async fn get(&self, id: SessionId) -> Option<Arc<RoundtableHandle>> {
        self.handles.read().await.get(&id).cloned()
    }

    pub async fn remove(&self, id: SessionId) -> Option<Arc<RoundtableHandle>> {
        self.handles.write().await.remove(&id)
    }

    pub async fn list(&self) -> Vec<SessionId> {
        self.handles.read().await.keys().copied().collect()
    }
}
