use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info, warn};

use wayline_core::config::ExecutorConfig;
use wayline_core::error::{Result, WaylineError};
use wayline_core::event::{EventBus, StreamEvent};
use wayline_core::traits::Agent;
use wayline_core::types::{AgentOutcome, Route, WorkflowState};

use crate::checkpoint::CheckpointStore;

/// Per-call options for [`GraphExecutor::invoke`] and friends.
#[derive(Debug, Clone)]
pub struct InvokeOptions {
    /// Thread to checkpoint onto.
    pub thread_id: Option<String>,
    /// Persist a checkpoint after every step (needs `thread_id`).
    pub checkpoint: bool,
    /// Suspend at human-pause points instead of skipping them.
    pub wait_for_human: bool,
    /// Per-agent timeout; falls back to the executor's configured default.
    pub timeout: Option<Duration>,
}

impl Default for InvokeOptions {
    fn default() -> Self {
        Self {
            thread_id: None,
            checkpoint: true,
            wait_for_human: true,
            timeout: None,
        }
    }
}

impl InvokeOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn thread(mut self, thread_id: impl Into<String>) -> Self {
        self.thread_id = Some(thread_id.into());
        self
    }

    pub fn checkpoint(mut self, enabled: bool) -> Self {
        self.checkpoint = enabled;
        self
    }

    pub fn wait_for_human(mut self, wait: bool) -> Self {
        self.wait_for_human = wait;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Why a run stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// The route reached `End`.
    Completed,
    /// `max_iterations` agent calls were made. Not an error.
    IterationLimit,
    /// Execution paused for a human decision.
    Suspended,
}

/// Result of a run, with enough detail to tell the stop conditions apart.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub state: WorkflowState,
    /// Agent invocations made during this call.
    pub iterations: usize,
    pub termination: Termination,
}

/// A human decision on a suspended workflow.
#[derive(Debug, Clone, Default)]
pub struct HumanFeedback {
    pub approved: bool,
    pub message: Option<String>,
}

impl HumanFeedback {
    pub fn approve() -> Self {
        Self {
            approved: true,
            message: None,
        }
    }

    pub fn reject() -> Self {
        Self {
            approved: false,
            message: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

/// Position of a run between agent calls.
pub(crate) struct Cursor {
    pub state: WorkflowState,
    pub current: Route,
    pub iterations: usize,
}

/// What the loop does next.
pub(crate) enum Step {
    Invoke(String),
    Stop(Termination),
}

/// Runs agents over a shared [`WorkflowState`], following its route.
///
/// The agent set is fixed at construction. Each step invokes the agent
/// named by the current route under a timeout, replaces the state with the
/// agent's result, optionally checkpoints, and follows the new route until
/// it ends, the iteration cap is hit, or a human pause suspends the run.
pub struct GraphExecutor {
    agents: HashMap<String, Arc<dyn Agent>>,
    store: CheckpointStore,
    config: ExecutorConfig,
    event_bus: Option<Arc<EventBus>>,
}

impl GraphExecutor {
    pub fn builder() -> GraphExecutorBuilder {
        GraphExecutorBuilder::default()
    }

    pub fn checkpoints(&self) -> &CheckpointStore {
        &self.store
    }

    /// Run to completion or suspension and return the final state.
    ///
    /// The caller's state is cloned first and never mutated.
    pub async fn invoke(
        &self,
        initial: &WorkflowState,
        start_agent: &str,
        options: InvokeOptions,
    ) -> Result<WorkflowState> {
        Ok(self.run(initial, start_agent, options).await?.state)
    }

    /// Like [`invoke`](Self::invoke), but also reports how the run stopped.
    pub async fn run(
        &self,
        initial: &WorkflowState,
        start_agent: &str,
        options: InvokeOptions,
    ) -> Result<RunReport> {
        self.run_from(initial.clone(), Route::from(start_agent), options)
            .await
    }

    pub(crate) async fn run_from(
        &self,
        state: WorkflowState,
        start: Route,
        options: InvokeOptions,
    ) -> Result<RunReport> {
        info!(
            start = %start,
            thread_id = options.thread_id.as_deref().unwrap_or("-"),
            "Starting workflow run"
        );

        let timeout = self.timeout_for(&options);
        let mut cursor = Cursor {
            state,
            current: start,
            iterations: 0,
        };

        let termination = loop {
            let agent = match self.next_step(&mut cursor, &options) {
                Step::Invoke(agent) => agent,
                Step::Stop(termination) => break termination,
            };

            self.publish(StreamEvent::agent_start(&agent));
            let step = match self.invoke_agent(&agent, &mut cursor.state, timeout).await {
                Ok(()) => self.finish_step(&mut cursor, &options),
                Err(e) => Err(e),
            };
            if let Err(e) = step {
                self.publish(StreamEvent::error(Some(agent.as_str()), &e));
                return Err(e);
            }
            self.publish(StreamEvent::agent_complete(&cursor.current));
        };

        info!(
            iterations = cursor.iterations,
            termination = ?termination,
            "Workflow run finished"
        );
        self.publish(StreamEvent::complete(cursor.state.clone()));

        Ok(RunReport {
            state: cursor.state,
            iterations: cursor.iterations,
            termination,
        })
    }

    /// Resume a thread from one of its checkpoints.
    ///
    /// Starts at `force_agent` when given, otherwise at the checkpoint's
    /// own route. Checkpointing stays on for the thread.
    pub async fn resume_from_checkpoint(
        &self,
        thread_id: &str,
        checkpoint_id: &str,
        force_agent: Option<&str>,
    ) -> Result<WorkflowState> {
        let state = self.load_required(thread_id, checkpoint_id)?;

        let start = match force_agent {
            Some(agent) => Route::from(agent),
            None => state.next_agent().clone(),
        };
        if start.is_end() {
            return Err(WaylineError::NoResumableAgent {
                thread_id: thread_id.to_string(),
                checkpoint_id: checkpoint_id.to_string(),
            });
        }

        info!(thread_id, checkpoint_id, start = %start, "Resuming from checkpoint");
        let options = InvokeOptions::new().thread(thread_id).checkpoint(true);
        Ok(self.run_from(state, start, options).await?.state)
    }

    /// Apply a human decision to a suspended checkpoint.
    ///
    /// The decided state is saved as a new checkpoint. If it routes to an
    /// agent, execution continues there; otherwise it is returned as is.
    pub async fn submit_human_feedback(
        &self,
        thread_id: &str,
        checkpoint_id: &str,
        feedback: HumanFeedback,
    ) -> Result<WorkflowState> {
        let mut state = self.load_required(thread_id, checkpoint_id)?;

        state.approve(feedback.approved, feedback.message.as_deref());
        let saved = self.store.save_checkpoint(thread_id, &state)?;
        info!(
            thread_id,
            checkpoint_id = %saved,
            approved = feedback.approved,
            approvals = state.approval_count(),
            "Human feedback recorded"
        );

        match state.next_agent().clone() {
            Route::Agent(agent) => {
                let options = InvokeOptions::new().thread(thread_id);
                Ok(self
                    .run_from(state, Route::Agent(agent), options)
                    .await?
                    .state)
            }
            Route::Human | Route::End => Ok(state),
        }
    }

    fn load_required(&self, thread_id: &str, checkpoint_id: &str) -> Result<WorkflowState> {
        self.store
            .load_checkpoint(thread_id, checkpoint_id)?
            .ok_or_else(|| WaylineError::CheckpointNotFound {
                thread_id: thread_id.to_string(),
                checkpoint_id: checkpoint_id.to_string(),
            })
    }

    pub(crate) fn timeout_for(&self, options: &InvokeOptions) -> Duration {
        options
            .timeout
            .unwrap_or_else(|| self.config.agent_timeout())
    }

    /// Decide the next agent to call, or why the run stops.
    ///
    /// A pause for a human wins over the iteration cap, so an agent that
    /// asks for approval on its last allowed step still suspends.
    pub(crate) fn next_step(&self, cursor: &mut Cursor, options: &InvokeOptions) -> Step {
        loop {
            if cursor.current.is_end() {
                return Step::Stop(Termination::Completed);
            }
            if cursor.state.is_waiting_for_approval()
                && self.config.human_in_loop
                && options.wait_for_human
            {
                debug!("Approval pending, suspending workflow");
                return Step::Stop(Termination::Suspended);
            }

            match &cursor.current {
                Route::Human if options.wait_for_human => {
                    debug!("Human pause reached, suspending workflow");
                    return Step::Stop(Termination::Suspended);
                }
                Route::Human => {
                    // Not waiting: hop over the pause without spending an iteration.
                    let next = cursor.state.next_agent().clone();
                    if next.is_human() {
                        warn!("State routes back to the human pause, suspending workflow");
                        return Step::Stop(Termination::Suspended);
                    }
                    debug!(next = %next, "Skipping human pause");
                    cursor.current = next;
                }
                Route::Agent(_) if cursor.iterations >= self.config.max_iterations => {
                    warn!(
                        max_iterations = self.config.max_iterations,
                        next = %cursor.current,
                        "Iteration limit reached, stopping workflow"
                    );
                    return Step::Stop(Termination::IterationLimit);
                }
                Route::Agent(name) => return Step::Invoke(name.clone()),
                Route::End => return Step::Stop(Termination::Completed),
            }
        }
    }

    /// Call one agent under `timeout` and apply its outcome to `state`.
    pub(crate) async fn invoke_agent(
        &self,
        name: &str,
        state: &mut WorkflowState,
        timeout: Duration,
    ) -> Result<()> {
        let agent = self
            .agents
            .get(name)
            .ok_or_else(|| WaylineError::AgentNotFound(name.to_string()))?;

        debug!(agent = %name, "Invoking agent");
        match tokio::time::timeout(timeout, agent.run(state.clone())).await {
            Ok(Ok(AgentOutcome::Updated(next))) => {
                *state = next;
                Ok(())
            }
            Ok(Ok(AgentOutcome::Unchanged)) => {
                debug!(agent = %name, "Agent left state unchanged");
                Ok(())
            }
            Ok(Err(e)) => {
                error!(agent = %name, error = %e, "Agent failed");
                Err(e)
            }
            Err(_) => {
                let timeout_ms = timeout.as_millis() as u64;
                error!(agent = %name, timeout_ms, "Agent timed out");
                Err(WaylineError::AgentTimeout {
                    agent: name.to_string(),
                    timeout_ms,
                })
            }
        }
    }

    /// Advance the cursor after an agent call and checkpoint if asked to.
    pub(crate) fn finish_step(&self, cursor: &mut Cursor, options: &InvokeOptions) -> Result<()> {
        cursor.current = cursor.state.next_agent().clone();
        if options.checkpoint {
            if let Some(thread_id) = options.thread_id.as_deref() {
                self.store.save_checkpoint(thread_id, &cursor.state)?;
            }
        }
        cursor.iterations += 1;
        Ok(())
    }

    pub(crate) fn publish(&self, event: StreamEvent) {
        if let Some(bus) = &self.event_bus {
            bus.publish(event);
        }
    }
}

/// Builds a [`GraphExecutor`] from an explicit agent set.
#[derive(Default)]
pub struct GraphExecutorBuilder {
    agents: HashMap<String, Arc<dyn Agent>>,
    store: Option<CheckpointStore>,
    config: ExecutorConfig,
    event_bus: Option<Arc<EventBus>>,
}

impl GraphExecutorBuilder {
    /// Register an agent under `name`, replacing any previous one.
    pub fn agent(mut self, name: impl Into<String>, agent: impl Agent) -> Self {
        self.agents.insert(name.into(), Arc::new(agent));
        self
    }

    /// Register an already-shared agent.
    pub fn shared_agent(mut self, name: impl Into<String>, agent: Arc<dyn Agent>) -> Self {
        self.agents.insert(name.into(), agent);
        self
    }

    /// Register several shared agents at once.
    pub fn agents(mut self, agents: impl IntoIterator<Item = (String, Arc<dyn Agent>)>) -> Self {
        self.agents.extend(agents);
        self
    }

    pub fn config(mut self, config: ExecutorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn max_iterations(mut self, max_iterations: usize) -> Self {
        self.config.max_iterations = max_iterations;
        self
    }

    pub fn agent_timeout(mut self, timeout: Duration) -> Self {
        self.config.agent_timeout_ms = timeout.as_millis() as u64;
        self
    }

    pub fn human_in_loop(mut self, enabled: bool) -> Self {
        self.config.human_in_loop = enabled;
        self
    }

    pub fn checkpoint_store(mut self, store: CheckpointStore) -> Self {
        self.store = Some(store);
        self
    }

    pub fn event_bus(mut self, bus: Arc<EventBus>) -> Self {
        self.event_bus = Some(bus);
        self
    }

    pub fn build(self) -> GraphExecutor {
        GraphExecutor {
            agents: self.agents,
            store: self.store.unwrap_or_default(),
            config: self.config,
            event_bus: self.event_bus,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wayline_core::event::StreamEventKind;
    use wayline_core::types::Message;
    use wayline_test_utils::*;

    #[tokio::test]
    async fn test_unknown_agent() {
        let executor = GraphExecutor::builder().build();
        let err = executor
            .invoke(&WorkflowState::new(), "ghost", InvokeOptions::new())
            .await
            .unwrap_err();
        assert!(matches!(err, WaylineError::AgentNotFound(ref name) if name == "ghost"));
    }

    #[tokio::test]
    async fn test_caller_state_not_mutated() {
        let executor = GraphExecutor::builder()
            .agent("a", reply_agent("from a", None))
            .build();
        let initial = user_state("hi");
        let result = executor
            .invoke(&initial, "a", InvokeOptions::new())
            .await
            .unwrap();

        assert_eq!(initial.messages().len(), 1);
        assert_eq!(result.messages().len(), 2);
    }

    #[tokio::test]
    async fn test_unchanged_follows_existing_route() {
        let calls = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let executor = GraphExecutor::builder()
            .agent("noop", passthrough_agent())
            .agent("target", counting_agent(calls.clone(), None))
            .build();

        let mut initial = user_state("hi");
        initial.set_next_agent("target");
        let report = executor
            .run(&initial, "noop", InvokeOptions::new())
            .await
            .unwrap();

        assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 1);
        assert_eq!(report.iterations, 2);
        assert_eq!(report.termination, Termination::Completed);
    }

    #[tokio::test]
    async fn test_agent_error_propagates_unchanged() {
        let executor = GraphExecutor::builder()
            .agent("broken", failing_agent("broken", "disk full"))
            .build();
        let err = executor
            .invoke(&WorkflowState::new(), "broken", InvokeOptions::new())
            .await
            .unwrap_err();
        match err {
            WaylineError::AgentExecution { agent, message } => {
                assert_eq!(agent, "broken");
                assert_eq!(message, "disk full");
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[tokio::test]
    async fn test_checkpoint_per_step() {
        let executor = GraphExecutor::builder()
            .agent("a", reply_agent("one", Some("b")))
            .agent("b", reply_agent("two", None))
            .build();

        executor
            .invoke(&user_state("go"), "a", InvokeOptions::new().thread("t1"))
            .await
            .unwrap();

        let checkpoints = executor.checkpoints().get_checkpoints("t1").unwrap();
        assert_eq!(checkpoints.len(), 2);
        let last = checkpoints[1].state().unwrap();
        assert_eq!(last.messages().len(), 3);
    }

    #[tokio::test]
    async fn test_no_checkpoint_without_thread_or_flag() {
        let executor = GraphExecutor::builder()
            .agent("a", reply_agent("one", None))
            .build();

        executor
            .invoke(&user_state("go"), "a", InvokeOptions::new())
            .await
            .unwrap();
        executor
            .invoke(
                &user_state("go"),
                "a",
                InvokeOptions::new().thread("t2").checkpoint(false),
            )
            .await
            .unwrap();

        assert!(executor.checkpoints().list_threads().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_human_pause_skipped_when_not_waiting() {
        let executor = GraphExecutor::builder()
            .agent("final", reply_agent("done", None))
            .build();

        let mut initial = user_state("go");
        initial.set_next_agent("final");
        let report = executor
            .run(
                &initial,
                wayline_core::types::HUMAN_SENTINEL,
                InvokeOptions::new().wait_for_human(false),
            )
            .await
            .unwrap();

        assert_eq!(report.termination, Termination::Completed);
        assert_eq!(report.iterations, 1);
        assert_eq!(report.state.last_message().unwrap().content, "done");
    }

    #[tokio::test]
    async fn test_human_pause_loop_guard() {
        let executor = GraphExecutor::builder()
            .agent("asker", approval_agent("please review"))
            .build();

        let report = executor
            .run(
                &user_state("go"),
                "asker",
                InvokeOptions::new().wait_for_human(false),
            )
            .await
            .unwrap();

        assert_eq!(report.termination, Termination::Suspended);
        assert_eq!(report.iterations, 1);
    }

    #[tokio::test]
    async fn test_pending_approval_ignored_when_hitl_disabled() {
        let calls = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let executor = GraphExecutor::builder()
            .agent("next", counting_agent(calls.clone(), None))
            .human_in_loop(false)
            .build();

        let mut initial = user_state("go");
        initial.request_approval();
        let report = executor
            .run(&initial, "next", InvokeOptions::new())
            .await
            .unwrap();

        assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 1);
        assert_eq!(report.termination, Termination::Completed);
    }

    #[tokio::test]
    async fn test_approval_on_last_iteration_suspends() {
        let executor = GraphExecutor::builder()
            .agent("asker", approval_agent("final draft"))
            .max_iterations(1)
            .build();

        let report = executor
            .run(&user_state("go"), "asker", InvokeOptions::new())
            .await
            .unwrap();

        assert_eq!(report.termination, Termination::Suspended);
        assert_eq!(report.iterations, 1);
        assert!(report.state.is_waiting_for_approval());
    }

    #[tokio::test]
    async fn test_human_route_on_last_iteration_suspends() {
        let executor = GraphExecutor::builder()
            .agent(
                "handoff",
                reply_agent("over to you", Some(wayline_core::types::HUMAN_SENTINEL)),
            )
            .max_iterations(1)
            .build();

        let report = executor
            .run(&user_state("go"), "handoff", InvokeOptions::new())
            .await
            .unwrap();

        assert_eq!(report.termination, Termination::Suspended);
        assert!(!report.state.is_waiting_for_approval());
    }

    #[tokio::test]
    async fn test_shared_agent_under_two_names() {
        let calls = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let shared: Arc<dyn Agent> = Arc::new(counting_agent(calls.clone(), Some("second")));
        let executor = GraphExecutor::builder()
            .shared_agent("first", shared.clone())
            .shared_agent("second", shared)
            .max_iterations(3)
            .build();

        let report = executor
            .run(&user_state("go"), "first", InvokeOptions::new())
            .await
            .unwrap();

        // "second" keeps routing to itself, so the cap ends the run.
        assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 3);
        assert_eq!(report.termination, Termination::IterationLimit);
    }

    #[tokio::test]
    async fn test_resume_with_forced_agent() {
        let executor = GraphExecutor::builder()
            .agent("a", reply_agent("first", None))
            .agent("b", reply_agent("second", None))
            .build();

        executor
            .invoke(&user_state("go"), "a", InvokeOptions::new().thread("t"))
            .await
            .unwrap();
        let cp = executor.checkpoints().latest_checkpoint("t").unwrap().unwrap();

        let resumed = executor
            .resume_from_checkpoint("t", &cp.id, Some("b"))
            .await
            .unwrap();
        assert_eq!(resumed.messages().len(), 3);
        assert_eq!(resumed.last_message().unwrap().content, "second");
        assert_eq!(executor.checkpoints().get_checkpoints("t").unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_resume_uses_checkpoint_route() {
        let executor = GraphExecutor::builder()
            .agent("a", reply_agent("first", Some("b")))
            .agent("b", reply_agent("second", None))
            .max_iterations(1)
            .build();

        let report = executor
            .run(&user_state("go"), "a", InvokeOptions::new().thread("t"))
            .await
            .unwrap();
        assert_eq!(report.termination, Termination::IterationLimit);

        let cp = executor.checkpoints().latest_checkpoint("t").unwrap().unwrap();
        let resumed = executor.resume_from_checkpoint("t", &cp.id, None).await.unwrap();
        assert_eq!(resumed.last_message().unwrap().content, "second");
        assert!(resumed.next_agent().is_end());
    }

    #[tokio::test]
    async fn test_resume_errors() {
        let executor = GraphExecutor::builder()
            .agent("a", reply_agent("first", None))
            .build();

        let err = executor
            .resume_from_checkpoint("missing", "cp_x", None)
            .await
            .unwrap_err();
        assert!(matches!(err, WaylineError::CheckpointNotFound { .. }));

        executor
            .invoke(&user_state("go"), "a", InvokeOptions::new().thread("t"))
            .await
            .unwrap();
        let cp = executor.checkpoints().latest_checkpoint("t").unwrap().unwrap();
        let err = executor
            .resume_from_checkpoint("t", &cp.id, None)
            .await
            .unwrap_err();
        assert!(matches!(err, WaylineError::NoResumableAgent { .. }));
    }

    #[tokio::test]
    async fn test_feedback_missing_checkpoint() {
        let executor = GraphExecutor::builder().build();
        let err = executor
            .submit_human_feedback("t", "cp_x", HumanFeedback::approve())
            .await
            .unwrap_err();
        assert!(matches!(err, WaylineError::CheckpointNotFound { .. }));
    }

    #[tokio::test]
    async fn test_rejection_below_cap_stays_paused() {
        let executor = GraphExecutor::builder()
            .agent("asker", approval_agent("draft ready"))
            .build();

        executor
            .invoke(&user_state("go"), "asker", InvokeOptions::new().thread("t"))
            .await
            .unwrap();
        let cp = executor.checkpoints().latest_checkpoint("t").unwrap().unwrap();

        let state = executor
            .submit_human_feedback(
                "t",
                &cp.id,
                HumanFeedback::reject().with_message("add benchmarks"),
            )
            .await
            .unwrap();

        assert!(!state.is_waiting_for_approval());
        assert!(state.next_agent().is_human());
        assert_eq!(state.last_message().unwrap().content, "add benchmarks");

        // The old checkpoint is untouched; the decision is a new one.
        let checkpoints = executor.checkpoints().get_checkpoints("t").unwrap();
        assert_eq!(checkpoints.len(), 2);
        assert!(checkpoints[0].state().unwrap().is_waiting_for_approval());
    }

    #[tokio::test]
    async fn test_feedback_continues_when_routed_to_agent() {
        let executor = GraphExecutor::builder()
            .agent("reviser", reply_agent("revised", None))
            .build();

        let mut drafted = user_state("go");
        drafted.add_message(Message::assistant("draft"));
        drafted.set_next_agent("reviser");
        let id = executor.checkpoints().save_checkpoint("t", &drafted).unwrap();

        let state = executor
            .submit_human_feedback("t", &id, HumanFeedback::reject())
            .await
            .unwrap();
        assert_eq!(state.last_message().unwrap().content, "revised");
        assert!(state.next_agent().is_end());
    }

    #[tokio::test]
    async fn test_event_bus_receives_lifecycle() {
        let bus = Arc::new(EventBus::default());
        let mut rx = bus.subscribe();
        let executor = GraphExecutor::builder()
            .agent("a", reply_agent("one", None))
            .event_bus(bus.clone())
            .build();

        executor
            .invoke(&user_state("go"), "a", InvokeOptions::new())
            .await
            .unwrap();

        let kinds: Vec<StreamEventKind> = std::iter::from_fn(|| rx.try_recv().ok())
            .map(|e| e.kind)
            .collect();
        assert_eq!(
            kinds,
            vec![
                StreamEventKind::AgentStart,
                StreamEventKind::AgentComplete,
                StreamEventKind::Complete,
            ]
        );
    }
}
