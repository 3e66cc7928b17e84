pub mod context;
pub mod error;
pub mod flow;
pub mod runner;
pub mod session;
pub mod step;

// Re-export commonly used types
pub use context::Context;
pub use error::{FlowError, Result};
pub use flow::{ExecutionOutcome, ExecutionStatus, Flow, FlowBuilder};
pub use runner::FlowRunner;
pub use session::{
    CaseSession, FlowStore, InMemoryFlowStore, InMemorySessionStore, SessionStore,
};
pub use step::{Step, StepAction, StepResult};
