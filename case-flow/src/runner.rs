//! `FlowRunner` wraps the common load → execute one step → save pattern so an
//! HTTP handler can drive a wizard with a single call per request. Callers
//! that need custom persistence (batching, inspection of the intermediate
//! session) can use [`Flow::execute_session`] directly; the two are fully
//! interchangeable.

use std::sync::Arc;

use crate::{
    error::{FlowError, Result},
    flow::{ExecutionOutcome, Flow},
    session::SessionStore,
};

#[derive(Clone)]
pub struct FlowRunner {
    flow: Arc<Flow>,
    store: Arc<dyn SessionStore>,
}

impl FlowRunner {
    pub fn new(flow: Arc<Flow>, store: Arc<dyn SessionStore>) -> Self {
        Self { flow, store }
    }

    /// Execute exactly one step for `session_id` and persist the updated
    /// session, so the next call resumes where this one left off.
    pub async fn run(&self, session_id: &str) -> Result<ExecutionOutcome> {
        let mut session = self
            .store
            .get(session_id)
            .await?
            .ok_or_else(|| FlowError::SessionNotFound(session_id.to_string()))?;

        let outcome = self.flow.execute_session(&mut session).await?;

        self.store.save(session).await?;

        Ok(outcome)
    }
}
