//! Routing strategies: wrappers that inject routing decisions around agents.
//!
//! Each strategy produces ordinary [`Agent`](wayline_core::traits::Agent)s,
//! so wrapped agents are registered with the executor builder like any
//! other:
//!
//! - [`ConditionalRouter`]: a central pure function picks the next agent
//!   after every wrapped agent, overriding what the agent chose.
//! - [`CycleBreaker`]: tracks the execution path in state metadata and ends
//!   the workflow when a transition signature repeats.
//! - [`ParallelFanOut`]: runs the agents listed under `parallelTargets`
//!   concurrently against clones of the state and merges their messages.

pub mod conditional;
pub mod cycle;
pub mod parallel;

pub use conditional::{ConditionalRouter, Routed};
pub use cycle::{
    execution_path, CycleBreaker, CycleGuarded, DEFAULT_SIGNATURE_WINDOW, EXECUTION_PATH_KEY,
};
pub use parallel::{ParallelFanOut, PARALLEL_TARGETS_KEY};
