use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::{Context, error::Result, flow::Flow};

/// Persistent state of one wizard run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaseSession {
    pub id: String,
    pub flow_id: String,
    pub current_step_id: String,
    /// Steps already passed through, most recent last. Popped by back
    /// navigation.
    #[serde(default)]
    pub history: Vec<String>,
    #[serde(default)]
    pub status_message: Option<String>,
    /// Set once the flow reaches `Complete`; a finished session cannot be
    /// executed again.
    #[serde(default)]
    pub completed: bool,
    pub context: Context,
}

impl CaseSession {
    pub fn new_from_step(id: String, step_id: &str) -> Self {
        Self {
            id,
            flow_id: "default".to_string(),
            current_step_id: step_id.to_string(),
            history: Vec::new(),
            status_message: None,
            completed: false,
            context: Context::new(),
        }
    }
}

/// Storage for flow definitions.
#[async_trait]
pub trait FlowStore: Send + Sync {
    async fn save(&self, id: String, flow: Arc<Flow>) -> Result<()>;
    async fn get(&self, id: &str) -> Result<Option<Arc<Flow>>>;
    async fn delete(&self, id: &str) -> Result<()>;
}

/// Storage for wizard sessions.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn save(&self, session: CaseSession) -> Result<()>;
    async fn get(&self, id: &str) -> Result<Option<CaseSession>>;
    async fn delete(&self, id: &str) -> Result<()>;
}

#[derive(Default)]
pub struct InMemoryFlowStore {
    flows: Arc<DashMap<String, Arc<Flow>>>,
}

impl InMemoryFlowStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl FlowStore for InMemoryFlowStore {
    async fn save(&self, id: String, flow: Arc<Flow>) -> Result<()> {
        self.flows.insert(id, flow);
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<Arc<Flow>>> {
        Ok(self.flows.get(id).map(|entry| entry.clone()))
    }

    async fn delete(&self, id: &str) -> Result<()> {
        self.flows.remove(id);
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemorySessionStore {
    sessions: Arc<DashMap<String, CaseSession>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn save(&self, session: CaseSession) -> Result<()> {
        self.sessions.insert(session.id.clone(), session);
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<CaseSession>> {
        Ok(self.sessions.get(id).map(|entry| entry.clone()))
    }

    async fn delete(&self, id: &str) -> Result<()> {
        self.sessions.remove(id);
        Ok(())
    }
}
