use std::sync::{Arc, Mutex};

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    context::Context,
    error::{FlowError, Result},
    session::CaseSession,
    step::{Step, StepAction, StepResult},
};

/// Predicate deciding whether a conditional edge applies.
pub type EdgeCondition = Arc<dyn Fn(&Context) -> bool + Send + Sync>;

/// Directed edge between two steps.
#[derive(Clone)]
pub struct Edge {
    pub from: String,
    pub to: String,
    pub condition: Option<EdgeCondition>,
}

/// A wizard definition: steps plus the edges connecting them.
pub struct Flow {
    pub id: String,
    steps: DashMap<String, Arc<dyn Step>>,
    edges: Mutex<Vec<Edge>>,
    start_step_id: Mutex<Option<String>>,
}

impl Flow {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            steps: DashMap::new(),
            edges: Mutex::new(Vec::new()),
            start_step_id: Mutex::new(None),
        }
    }

    /// Add a step. The first step added becomes the start step.
    pub fn add_step(&self, step: Arc<dyn Step>) -> &Self {
        let step_id = step.id().to_string();
        let is_first = self.steps.is_empty();
        self.steps.insert(step_id.clone(), step);
        if is_first {
            *self.start_step_id.lock().unwrap() = Some(step_id);
        }
        self
    }

    pub fn set_start_step(&self, step_id: impl Into<String>) -> &Self {
        let step_id = step_id.into();
        if self.steps.contains_key(&step_id) {
            *self.start_step_id.lock().unwrap() = Some(step_id);
        }
        self
    }

    pub fn add_edge(&self, from: impl Into<String>, to: impl Into<String>) -> &Self {
        self.edges.lock().unwrap().push(Edge {
            from: from.into(),
            to: to.into(),
            condition: None,
        });
        self
    }

    pub fn add_conditional_edge<F>(
        &self,
        from: impl Into<String>,
        to: impl Into<String>,
        condition: F,
    ) -> &Self
    where
        F: Fn(&Context) -> bool + Send + Sync + 'static,
    {
        self.edges.lock().unwrap().push(Edge {
            from: from.into(),
            to: to.into(),
            condition: Some(Arc::new(condition)),
        });
        self
    }

    /// Run exactly the session's current step, then apply its action to the
    /// session state. `AdvanceAndRun` chains into the next step with the same
    /// context, so a computed step (e.g. a quote) can run without an extra
    /// submission from the client.
    pub async fn execute_session(&self, session: &mut CaseSession) -> Result<ExecutionOutcome> {
        if session.completed {
            return Err(FlowError::SessionCompleted(session.id.clone()));
        }

        let result = self
            .run_single_step(&session.current_step_id, session.context.clone())
            .await?;

        session.status_message = result.status_message.clone();

        match &result.next {
            StepAction::Advance => {
                if let Some(next_id) = self.next_step(&result.step_id, &session.context) {
                    session.history.push(result.step_id.clone());
                    session.current_step_id = next_id;
                }
                Ok(ExecutionOutcome {
                    response: result.response,
                    status: ExecutionStatus::AwaitingInput,
                })
            }
            StepAction::AdvanceAndRun => {
                if let Some(next_id) = self.next_step(&result.step_id, &session.context) {
                    session.history.push(result.step_id.clone());
                    session.current_step_id = next_id;
                    Box::pin(self.execute_session(session)).await
                } else {
                    Ok(ExecutionOutcome {
                        response: result.response,
                        status: ExecutionStatus::AwaitingInput,
                    })
                }
            }
            StepAction::Stay => Ok(ExecutionOutcome {
                response: result.response,
                status: ExecutionStatus::AwaitingInput,
            }),
            StepAction::Back => {
                // No-op at the start step: there is nothing to go back to.
                if let Some(previous_id) = session.history.pop() {
                    session.current_step_id = previous_id;
                }
                Ok(ExecutionOutcome {
                    response: result.response,
                    status: ExecutionStatus::AwaitingInput,
                })
            }
            StepAction::Jump(target_id) => {
                if self.steps.contains_key(target_id) {
                    session.history.push(result.step_id.clone());
                    session.current_step_id = target_id.clone();
                    Ok(ExecutionOutcome {
                        response: result.response,
                        status: ExecutionStatus::AwaitingInput,
                    })
                } else {
                    Err(FlowError::StepNotFound(target_id.clone()))
                }
            }
            StepAction::Complete => {
                session.completed = true;
                debug!(session_id = %session.id, flow_id = %self.id, "flow completed");
                Ok(ExecutionOutcome {
                    response: result.response,
                    status: ExecutionStatus::Completed,
                })
            }
        }
    }

    async fn run_single_step(&self, step_id: &str, context: Context) -> Result<StepResult> {
        let step = self
            .steps
            .get(step_id)
            .ok_or_else(|| FlowError::StepNotFound(step_id.to_string()))?;

        debug!(step_id, flow_id = %self.id, "executing step");
        let mut result = step.run(context).await?;
        result.step_id = step_id.to_string();
        Ok(result)
    }

    /// First matching edge wins: conditional edges are evaluated against the
    /// context in insertion order, an unconditional edge acts as the default.
    pub fn next_step(&self, current_step_id: &str, context: &Context) -> Option<String> {
        let edges = self.edges.lock().unwrap();
        for edge in edges.iter() {
            if edge.from == current_step_id {
                match &edge.condition {
                    Some(condition) if condition(context) => return Some(edge.to.clone()),
                    Some(_) => continue,
                    None => return Some(edge.to.clone()),
                }
            }
        }
        None
    }

    pub fn start_step_id(&self) -> Option<String> {
        self.start_step_id.lock().unwrap().clone()
    }

    pub fn get_step(&self, step_id: &str) -> Option<Arc<dyn Step>> {
        self.steps.get(step_id).map(|entry| entry.clone())
    }
}

/// Builder for assembling flows.
pub struct FlowBuilder {
    flow: Flow,
}

impl FlowBuilder {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            flow: Flow::new(id),
        }
    }

    pub fn add_step(self, step: Arc<dyn Step>) -> Self {
        self.flow.add_step(step);
        self
    }

    pub fn add_edge(self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.flow.add_edge(from, to);
        self
    }

    pub fn add_conditional_edge<F>(
        self,
        from: impl Into<String>,
        to: impl Into<String>,
        condition: F,
    ) -> Self
    where
        F: Fn(&Context) -> bool + Send + Sync + 'static,
    {
        self.flow.add_conditional_edge(from, to, condition);
        self
    }

    pub fn set_start_step(self, step_id: impl Into<String>) -> Self {
        self.flow.set_start_step(step_id);
        self
    }

    pub fn build(self) -> Flow {
        self.flow
    }
}

/// What a caller learns from driving one step of a session.
#[derive(Debug, Clone)]
pub struct ExecutionOutcome {
    pub response: Option<String>,
    pub status: ExecutionStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExecutionStatus {
    /// The wizard is waiting for the next form submission.
    AwaitingInput,
    /// The wizard has run to completion.
    Completed,
}
