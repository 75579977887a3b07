use std::future::Future;

use futures::future::BoxFuture;

use crate::error::Result;
use crate::types::{AgentOutcome, Checkpoint, WorkflowState};

/// Agent: one named step of a workflow.
///
/// The executor hands the agent its own copy of the state. The agent must
/// not keep it after returning. Any error it raises aborts the run.
pub trait Agent: Send + Sync + 'static {
    fn run(&self, state: WorkflowState) -> BoxFuture<'_, Result<AgentOutcome>>;
}

impl<F, Fut> Agent for F
where
    F: Fn(WorkflowState) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<AgentOutcome>> + Send + 'static,
{
    fn run(&self, state: WorkflowState) -> BoxFuture<'_, Result<AgentOutcome>> {
        Box::pin(self(state))
    }
}

/// Checkpoint backend: persistence boundary for serialized states.
///
/// Saves append to the thread's log and are visible to the next read on
/// that thread. Implementations must never expose a half-written entry.
pub trait CheckpointBackend: Send + Sync + 'static {
    /// Append a blob to a thread, returning the new checkpoint.
    fn save(&self, thread_id: &str, serialized_state: String) -> Result<Checkpoint>;

    /// Exact lookup; `None` if the thread or id is absent.
    fn load(&self, thread_id: &str, checkpoint_id: &str) -> Result<Option<Checkpoint>>;

    /// Last checkpoint appended to a thread.
    fn latest(&self, thread_id: &str) -> Result<Option<Checkpoint>>;

    /// All checkpoints of a thread in save order.
    fn list(&self, thread_id: &str) -> Result<Vec<Checkpoint>>;

    /// Ids of every thread with at least one checkpoint.
    fn threads(&self) -> Result<Vec<String>>;

    /// Drop a thread and all its checkpoints. Returns true if it existed.
    fn delete_thread(&self, thread_id: &str) -> Result<bool>;
}
