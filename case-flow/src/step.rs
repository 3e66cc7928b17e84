use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{context::Context, error::Result};

/// Outcome of running a single wizard step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepResult {
    /// Message to surface to the user (validation error, prompt, summary).
    pub response: Option<String>,
    /// What the flow should do next.
    pub next: StepAction,
    /// Short progress description kept on the session.
    pub status_message: Option<String>,
    /// Set by the flow after execution to the id of the step that produced
    /// this result.
    #[serde(default)]
    pub step_id: String,
}

impl StepResult {
    pub fn new(response: Option<String>, next: StepAction) -> Self {
        Self {
            response,
            next,
            status_message: None,
            step_id: String::new(),
        }
    }

    pub fn with_status(
        response: Option<String>,
        next: StepAction,
        status_message: impl Into<String>,
    ) -> Self {
        Self {
            response,
            next,
            status_message: Some(status_message.into()),
            step_id: String::new(),
        }
    }
}

/// Where the flow goes after a step completes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum StepAction {
    /// Move to the next step and wait for the next submission.
    Advance,
    /// Move to the next step and run it immediately with the same context.
    AdvanceAndRun,
    /// Stay on the current step (validation failed, or more input needed).
    Stay,
    /// Return to the previously visited step.
    Back,
    /// Jump to a specific step by id.
    Jump(String),
    /// The wizard is finished.
    Complete,
}

/// A single screen of a multi-step wizard. Implementations read the submitted
/// fields from the context, validate them, and store typed results back.
#[async_trait]
pub trait Step: Send + Sync {
    /// Unique identifier for this step within a flow.
    fn id(&self) -> &str {
        std::any::type_name::<Self>()
    }

    async fn run(&self, context: Context) -> Result<StepResult>;
}
