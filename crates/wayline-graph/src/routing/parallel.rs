use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use futures::future::{join_all, BoxFuture};
use tracing::{debug, info, warn};

use wayline_core::error::{Result, WaylineError};
use wayline_core::traits::Agent;
use wayline_core::types::{AgentOutcome, Route, WorkflowState};

/// Metadata key listing the branch agents to run concurrently.
pub const PARALLEL_TARGETS_KEY: &str = "parallelTargets";

/// Fan-out/fan-in over a fixed set of branch agents.
///
/// Registered as one agent. When run, it reads the branch names listed under
/// `parallelTargets`, runs each against its own clone of the state, and
/// joins them. The merged state is the input plus, from each branch in
/// target order, every message whose content is not already present.
/// Content equality is the only dedup rule, so two distinct messages with
/// the same text collapse into one. Branch metadata and routes are dropped;
/// the target list is cleared and the route set to [`then`](Self::then).
///
/// The first branch error fails the whole fan-out.
pub struct ParallelFanOut {
    branches: HashMap<String, Arc<dyn Agent>>,
    then: Route,
}

impl Default for ParallelFanOut {
    fn default() -> Self {
        Self {
            branches: HashMap::new(),
            then: Route::End,
        }
    }
}

impl ParallelFanOut {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn branch(mut self, name: impl Into<String>, agent: impl Agent) -> Self {
        self.branches.insert(name.into(), Arc::new(agent));
        self
    }

    pub fn shared_branch(mut self, name: impl Into<String>, agent: Arc<dyn Agent>) -> Self {
        self.branches.insert(name.into(), agent);
        self
    }

    /// Route to take after the join (default: end the workflow).
    pub fn then(mut self, route: impl Into<Route>) -> Self {
        self.then = route.into();
        self
    }

    fn targets(state: &WorkflowState) -> Vec<String> {
        let Some(value) = state.metadata(PARALLEL_TARGETS_KEY) else {
            return Vec::new();
        };
        match value.as_array() {
            Some(entries) => entries
                .iter()
                .filter_map(|v| match v.as_str() {
                    Some(name) => Some(name.to_string()),
                    None => {
                        warn!(entry = %v, "Ignoring non-string parallel target");
                        None
                    }
                })
                .collect(),
            None => {
                warn!(value = %value, "parallelTargets is not a list, ignoring");
                Vec::new()
            }
        }
    }
}

/// Append branch messages whose content is new to `merged`.
fn merge_messages(merged: &mut WorkflowState, branch: &WorkflowState) -> usize {
    let mut known: HashSet<String> = merged
        .messages()
        .iter()
        .map(|m| m.content.clone())
        .collect();

    let mut added = 0;
    for message in branch.messages() {
        if known.insert(message.content.clone()) {
            merged.add_message(message.clone());
            added += 1;
        }
    }
    added
}

impl Agent for ParallelFanOut {
    fn run(&self, state: WorkflowState) -> BoxFuture<'_, Result<AgentOutcome>> {
        Box::pin(async move {
            let targets = Self::targets(&state);

            let mut branches = Vec::with_capacity(targets.len());
            for name in &targets {
                let agent = self
                    .branches
                    .get(name)
                    .ok_or_else(|| WaylineError::AgentNotFound(name.clone()))?;
                branches.push(agent.clone());
            }

            info!(branches = targets.len(), "Fanning out");
            let runs = branches.iter().map(|agent| {
                let input = state.clone();
                async move { agent.run(input.clone()).await.map(|o| o.into_state(input)) }
            });
            let results = join_all(runs).await;

            let mut merged = state;
            for (name, result) in targets.iter().zip(results) {
                let branch = result?;
                let added = merge_messages(&mut merged, &branch);
                debug!(branch = %name, added, "Branch merged");
            }

            merged.remove_metadata(PARALLEL_TARGETS_KEY);
            merged.set_next_agent(self.then.clone());
            Ok(AgentOutcome::Updated(merged))
        })
    }
}
