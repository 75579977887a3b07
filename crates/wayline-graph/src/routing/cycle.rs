use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use futures::future::BoxFuture;
use tracing::{debug, warn};

use wayline_core::error::{Result, WaylineError};
use wayline_core::traits::Agent;
use wayline_core::types::{AgentOutcome, Message, Route, WorkflowState};

/// Metadata key holding the ordered list of agents visited in a run.
pub const EXECUTION_PATH_KEY: &str = "executionPath";

/// Path entries that make up a signature by default: the last transition.
pub const DEFAULT_SIGNATURE_WINDOW: usize = 2;

/// Ends a workflow once a path signature repeats.
///
/// Before a guarded agent runs, its name is appended to the `executionPath`
/// metadata and the trailing window of that path becomes the signature.
/// A signature already seen ends the workflow with a system message instead
/// of running the agent again.
///
/// Seen signatures live in the breaker, not in the state. Clones share the
/// same set, and reusing a breaker across independent runs carries their
/// signatures over; build one breaker per logical run when runs must not
/// affect each other, or call [`reset`](Self::reset) between them.
#[derive(Clone)]
pub struct CycleBreaker {
    seen: Arc<Mutex<HashSet<String>>>,
    window: Option<usize>,
}

impl Default for CycleBreaker {
    fn default() -> Self {
        Self {
            seen: Arc::default(),
            window: Some(DEFAULT_SIGNATURE_WINDOW),
        }
    }
}

impl CycleBreaker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use the last `window` path entries as the signature (minimum 1).
    pub fn with_window(mut self, window: usize) -> Self {
        self.window = Some(window.max(1));
        self
    }

    /// Use the whole visited path as the signature.
    ///
    /// A full path only grows within one run, so this mode catches repeats
    /// across runs sharing the breaker, never a loop inside a single run.
    pub fn full_path(mut self) -> Self {
        self.window = None;
        self
    }

    pub fn wrap(&self, name: impl Into<String>, agent: impl Agent) -> CycleGuarded {
        self.wrap_shared(name, Arc::new(agent))
    }

    pub fn wrap_shared(&self, name: impl Into<String>, agent: Arc<dyn Agent>) -> CycleGuarded {
        CycleGuarded {
            name: name.into(),
            inner: agent,
            breaker: self.clone(),
        }
    }

    /// Forget every recorded signature.
    pub fn reset(&self) -> Result<()> {
        self.lock()?.clear();
        Ok(())
    }

    /// Number of distinct signatures recorded so far.
    pub fn seen_count(&self) -> Result<usize> {
        Ok(self.lock()?.len())
    }

    fn signature(&self, path: &[String]) -> String {
        let start = match self.window {
            Some(window) => path.len().saturating_sub(window),
            None => 0,
        };
        path[start..].join("->")
    }

    /// Record a signature; false if it was already known.
    fn record(&self, signature: &str) -> Result<bool> {
        Ok(self.lock()?.insert(signature.to_string()))
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashSet<String>>> {
        self.seen
            .lock()
            .map_err(|e| WaylineError::Routing(format!("cycle breaker lock poisoned: {}", e)))
    }
}

/// Agents visited so far, read from state metadata.
pub fn execution_path(state: &WorkflowState) -> Vec<String> {
    state
        .metadata(EXECUTION_PATH_KEY)
        .and_then(|v| v.as_array())
        .map(|entries| {
            entries
                .iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

/// An agent guarded by a [`CycleBreaker`].
pub struct CycleGuarded {
    name: String,
    inner: Arc<dyn Agent>,
    breaker: CycleBreaker,
}

impl Agent for CycleGuarded {
    fn run(&self, mut state: WorkflowState) -> BoxFuture<'_, Result<AgentOutcome>> {
        Box::pin(async move {
            let mut path = execution_path(&state);
            path.push(self.name.clone());
            let signature = self.breaker.signature(&path);

            if !self.breaker.record(&signature)? {
                warn!(agent = %self.name, signature = %signature, "Cycle detected, ending workflow");
                state.add_message(Message::system(format!(
                    "Cycle detected before '{}' (path {}); ending workflow",
                    self.name, signature
                )));
                state.set_next_agent(Route::End);
                return Ok(AgentOutcome::Updated(state));
            }

            debug!(agent = %self.name, signature = %signature, "Path recorded");
            state.set_metadata(EXECUTION_PATH_KEY, serde_json::json!(path));
            let stamped = state.clone();
            let mut next = self.inner.run(state).await?.into_state(stamped);

            // Agents that rebuild metadata from scratch would lose the path.
            if next.metadata(EXECUTION_PATH_KEY).is_none() {
                next.set_metadata(EXECUTION_PATH_KEY, serde_json::json!(path));
            }
            Ok(AgentOutcome::Updated(next))
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use wayline_core::types::Role;
    use wayline_test_utils::*;

    async fn step(agent: &CycleGuarded, state: WorkflowState) -> WorkflowState {
        agent.run(state.clone()).await.unwrap().into_state(state)
    }

    #[tokio::test]
    async fn test_path_recorded() {
        let breaker = CycleBreaker::new();
        let a = breaker.wrap("a", reply_agent("from a", Some("b")));
        let b = breaker.wrap("b", reply_agent("from b", None));

        let state = step(&a, user_state("go")).await;
        let state = step(&b, state).await;

        assert_eq!(execution_path(&state), vec!["a", "b"]);
        assert_eq!(breaker.seen_count().unwrap(), 2);
    }

    #[tokio::test]
    async fn test_repeated_transition_ends_without_calling_agent() {
        let calls = Arc::new(AtomicUsize::new(0));
        let breaker = CycleBreaker::new();
        let a = breaker.wrap("a", counting_agent(calls.clone(), Some("b")));
        let b = breaker.wrap("b", passthrough_agent());

        let mut state = WorkflowState::new();
        for _ in 0..4 {
            state = step(&a, state).await;
            state = step(&b, state).await;
            if state.next_agent().is_end() {
                break;
            }
        }

        // a, a->b, b->a are new; the second a->b repeats.
        assert!(state.next_agent().is_end());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        let last = state.last_message().unwrap();
        assert_eq!(last.role, Role::System);
        assert!(last.content.contains("Cycle detected"));
    }

    #[tokio::test]
    async fn test_breaker_shared_across_runs() {
        let breaker = CycleBreaker::new();
        let a = breaker.wrap("a", reply_agent("first run", None));

        let first = step(&a, user_state("run 1")).await;
        assert_eq!(first.last_message().unwrap().content, "first run");

        // A fresh run on the same breaker starts with a known signature.
        let second = step(&a, user_state("run 2")).await;
        assert!(second.last_message().unwrap().content.contains("Cycle detected"));

        breaker.reset().unwrap();
        let third = step(&a, user_state("run 3")).await;
        assert_eq!(third.last_message().unwrap().content, "first run");
    }

    #[tokio::test]
    async fn test_full_path_never_repeats_within_run() {
        let breaker = CycleBreaker::new().full_path();
        let a = breaker.wrap("a", passthrough_agent());

        let mut state = WorkflowState::new();
        for _ in 0..5 {
            state = step(&a, state).await;
        }
        assert!(state.messages().is_empty());
        assert_eq!(execution_path(&state).len(), 5);
    }

    #[tokio::test]
    async fn test_path_restored_when_agent_drops_metadata() {
        let breaker = CycleBreaker::new();
        let fresh = breaker.wrap("fresh", |_state: WorkflowState| async {
            updated(WorkflowState::new())
        });

        let state = step(&fresh, WorkflowState::new()).await;
        assert_eq!(execution_path(&state), vec!["fresh"]);
    }

    #[test]
    fn test_signature_window() {
        let path: Vec<String> = ["a", "b", "c"].iter().map(|s| s.to_string()).collect();
        assert_eq!(CycleBreaker::new().signature(&path), "b->c");
        assert_eq!(CycleBreaker::new().with_window(0).signature(&path), "c");
        assert_eq!(CycleBreaker::new().full_path().signature(&path), "a->b->c");
    }

    #[test]
    fn test_poisoned_lock_is_routing_error() {
        let breaker = CycleBreaker::new();
        let seen = breaker.seen.clone();
        let _ = std::thread::spawn(move || {
            let _guard = seen.lock().unwrap();
            panic!("panic while holding the signature set");
        })
        .join();

        let err = breaker.seen_count().unwrap_err();
        assert!(matches!(err, WaylineError::Routing(ref msg) if msg.contains("poisoned")));
        assert!(matches!(breaker.reset(), Err(WaylineError::Routing(_))));
    }
}
