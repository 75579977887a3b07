//! Scripted agents and fixtures shared by the Wayline test suites.
//!
//! Every agent here is deterministic; none of them talk to a model.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use wayline_core::error::{Result, WaylineError};
use wayline_core::traits::Agent;
use wayline_core::types::{AgentOutcome, Message, Route, WorkflowState};

/// Wrap a state as an `Updated` outcome.
pub fn updated(state: WorkflowState) -> Result<AgentOutcome> {
    Ok(AgentOutcome::Updated(state))
}

/// A fresh state holding one user message.
pub fn user_state(text: &str) -> WorkflowState {
    let mut state = WorkflowState::new();
    state.add_message(Message::user(text));
    state
}

fn route(next: Option<&str>) -> Route {
    next.map(str::to_string).into()
}

/// Appends one assistant message and routes to `next`.
pub fn reply_agent(text: impl Into<String>, next: Option<&str>) -> impl Agent {
    let text = text.into();
    let next = route(next);
    move |mut state: WorkflowState| {
        let text = text.clone();
        let next = next.clone();
        async move {
            state.add_message(Message::assistant(text));
            state.set_next_agent(next);
            updated(state)
        }
    }
}

/// Appends several assistant messages in order and routes to `next`.
pub fn multi_reply_agent(texts: &[&str], next: Option<&str>) -> impl Agent {
    let texts: Vec<String> = texts.iter().map(|t| t.to_string()).collect();
    let next = route(next);
    move |mut state: WorkflowState| {
        let texts = texts.clone();
        let next = next.clone();
        async move {
            for text in texts {
                state.add_message(Message::assistant(text));
            }
            state.set_next_agent(next);
            updated(state)
        }
    }
}

/// Increments the integer at metadata `key` and routes to `next`.
pub fn counter_agent(key: &str, next: Option<&str>) -> impl Agent {
    let key = key.to_string();
    let next = route(next);
    move |mut state: WorkflowState| {
        let key = key.clone();
        let next = next.clone();
        async move {
            let count = state.metadata(&key).and_then(|v| v.as_u64()).unwrap_or(0);
            state.set_metadata(key, serde_json::json!(count + 1));
            state.set_next_agent(next);
            updated(state)
        }
    }
}

/// Sleeps for `delay`, then ends the workflow.
pub fn sleeping_agent(delay: Duration) -> impl Agent {
    move |mut state: WorkflowState| async move {
        tokio::time::sleep(delay).await;
        state.set_next_agent(Route::End);
        updated(state)
    }
}

/// Appends a message and suspends for human approval.
pub fn approval_agent(text: impl Into<String>) -> impl Agent {
    let text = text.into();
    move |mut state: WorkflowState| {
        let text = text.clone();
        async move {
            state.add_message(Message::assistant(text));
            state.request_approval();
            updated(state)
        }
    }
}

/// Always fails with `AgentExecution`.
pub fn failing_agent(name: &str, message: &str) -> impl Agent {
    let name = name.to_string();
    let message = message.to_string();
    move |_state: WorkflowState| {
        let err = WaylineError::agent(name.clone(), message.clone());
        async move { Err::<AgentOutcome, _>(err) }
    }
}

/// Returns `Unchanged`, leaving routing to the prior state.
pub fn passthrough_agent() -> impl Agent {
    |_state: WorkflowState| async { Ok::<_, WaylineError>(AgentOutcome::Unchanged) }
}

/// Counts its invocations in `calls`, then routes to `next`.
pub fn counting_agent(calls: Arc<AtomicUsize>, next: Option<&str>) -> impl Agent {
    let next = route(next);
    move |mut state: WorkflowState| {
        let calls = calls.clone();
        let next = next.clone();
        async move {
            calls.fetch_add(1, Ordering::SeqCst);
            state.set_next_agent(next);
            updated(state)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_reply_agent() {
        let agent = reply_agent("hi", Some("writer"));
        let outcome = agent.run(user_state("hello")).await.unwrap();
        match outcome {
            AgentOutcome::Updated(state) => {
                assert_eq!(state.messages().len(), 2);
                assert_eq!(state.next_agent(), &Route::agent("writer"));
            }
            AgentOutcome::Unchanged => panic!("expected Updated"),
        }
    }

    #[tokio::test]
    async fn test_failing_agent() {
        let agent = failing_agent("broken", "boom");
        let err = agent.run(WorkflowState::new()).await.unwrap_err();
        assert!(matches!(err, WaylineError::AgentExecution { .. }));
    }
}
