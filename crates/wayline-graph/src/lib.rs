//! Workflow execution engine: agents over a shared state, one step at a time.
//!
//! A workflow is a fixed set of named [`Agent`](wayline_core::traits::Agent)s.
//! The [`GraphExecutor`] starts at one of them and follows the `nextAgent`
//! route each agent writes into the [`WorkflowState`](wayline_core::types::WorkflowState),
//! until the route ends, the iteration cap is hit, or a human pause suspends
//! the run. With a thread id, every step is checkpointed into the
//! [`CheckpointStore`] so a run can be resumed or receive human feedback
//! later. [`routing`] provides wrappers that take routing decisions away
//! from individual agents.

pub mod checkpoint;
pub mod executor;
pub mod routing;
mod stream;

pub use checkpoint::{CheckpointStore, InMemoryBackend};
pub use executor::{
    GraphExecutor, GraphExecutorBuilder, HumanFeedback, InvokeOptions, RunReport, Termination,
};
pub use routing::{ConditionalRouter, CycleBreaker, ParallelFanOut};
