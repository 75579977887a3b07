//! Deterministic review workflow driven by the CLI.
//!
//! researcher -> writer -> critic -> reviewer. The critic fans out to a
//! style pass and a fact check in parallel; the reviewer pauses for a human
//! decision. A rejection sends the draft back to the writer together with
//! the reviewer's note.

use std::sync::Arc;

use serde_json::json;

use wayline_core::config::ExecutorConfig;
use wayline_core::error::Result;
use wayline_core::event::EventBus;
use wayline_core::types::{AgentOutcome, Message, Role, WorkflowState};
use wayline_graph::routing::PARALLEL_TARGETS_KEY;
use wayline_graph::{GraphExecutor, ParallelFanOut};

pub const START_AGENT: &str = "researcher";
pub const REVISION_AGENT: &str = "writer";

const TOPIC_KEY: &str = "topic";
const DRAFTS_KEY: &str = "drafts";

/// Initial state for a topic.
pub fn initial_state(topic: &str, config: &ExecutorConfig) -> WorkflowState {
    let mut state = WorkflowState::new().with_max_approvals(config.max_approvals);
    state.add_message(Message::user(topic));
    state
}

pub fn build_executor(config: &ExecutorConfig, bus: Arc<EventBus>) -> GraphExecutor {
    let critic = ParallelFanOut::new()
        .branch("style", style_review)
        .branch("facts", fact_check)
        .then("reviewer");

    GraphExecutor::builder()
        .config(config.clone())
        .event_bus(bus)
        .agent(START_AGENT, researcher)
        .agent(REVISION_AGENT, writer)
        .agent("critic", critic)
        .agent("reviewer", reviewer)
        .build()
}

fn topic(state: &WorkflowState) -> String {
    if let Some(topic) = state.metadata_str(TOPIC_KEY) {
        return topic.to_string();
    }
    state
        .messages()
        .iter()
        .find(|m| m.role == Role::User)
        .map(|m| m.content.clone())
        .unwrap_or_else(|| "an untitled topic".into())
}

fn draft_number(state: &WorkflowState) -> u64 {
    state
        .metadata(DRAFTS_KEY)
        .and_then(|v| v.as_u64())
        .unwrap_or(0)
}

async fn researcher(mut state: WorkflowState) -> Result<AgentOutcome> {
    let topic = topic(&state);
    state.add_message(Message::assistant(format!(
        "Research notes on {}: background, prior work, open questions.",
        topic
    )));
    state.set_metadata(TOPIC_KEY, json!(topic));
    state.set_next_agent(REVISION_AGENT);
    Ok(state.into())
}

async fn writer(mut state: WorkflowState) -> Result<AgentOutcome> {
    let draft = draft_number(&state) + 1;
    let topic = topic(&state);

    // Reviewer notes arrive as the latest user message.
    let note = state
        .last_message()
        .filter(|m| m.role == Role::User && draft > 1)
        .map(|m| m.content.clone());
    let text = match note {
        Some(note) => format!("Draft {} on {}, revised for: {}", draft, topic, note),
        None => format!("Draft {} on {}.", draft, topic),
    };

    state.add_message(Message::assistant(text));
    state.set_metadata(DRAFTS_KEY, json!(draft));
    state.set_metadata(PARALLEL_TARGETS_KEY, json!(["style", "facts"]));
    state.set_next_agent("critic");
    Ok(state.into())
}

async fn style_review(mut state: WorkflowState) -> Result<AgentOutcome> {
    let draft = draft_number(&state);
    state.add_message(Message::assistant(format!(
        "Style: draft {} reads clearly.",
        draft
    )));
    Ok(state.into())
}

async fn fact_check(mut state: WorkflowState) -> Result<AgentOutcome> {
    let draft = draft_number(&state);
    state.add_message(Message::assistant(format!(
        "Facts: claims in draft {} match the research notes.",
        draft
    )));
    Ok(state.into())
}

async fn reviewer(mut state: WorkflowState) -> Result<AgentOutcome> {
    let draft = draft_number(&state);
    state.add_message(Message::assistant(format!(
        "Draft {} is ready for human review.",
        draft
    )));
    state.request_approval();
    Ok(state.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use wayline_graph::{HumanFeedback, InvokeOptions};

    fn executor() -> GraphExecutor {
        build_executor(&ExecutorConfig::default(), Arc::new(EventBus::default()))
    }

    #[tokio::test]
    async fn test_runs_to_review() {
        let executor = executor();
        let initial = initial_state("borrow checking", &ExecutorConfig::default());
        let state = executor
            .invoke(&initial, START_AGENT, InvokeOptions::new().thread("demo"))
            .await
            .unwrap();

        assert!(state.is_waiting_for_approval());
        let contents: Vec<&str> = state.messages().iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents.len(), 6);
        assert!(contents[1].starts_with("Research notes on borrow checking"));
        assert_eq!(contents[2], "Draft 1 on borrow checking.");
        assert_eq!(contents[5], "Draft 1 is ready for human review.");
    }

    #[tokio::test]
    async fn test_rejection_revises_draft() {
        let executor = executor();
        let initial = initial_state("lifetimes", &ExecutorConfig::default());
        executor
            .invoke(&initial, START_AGENT, InvokeOptions::new().thread("demo"))
            .await
            .unwrap();

        let cp = executor.checkpoints().latest_checkpoint("demo").unwrap().unwrap();
        let rejected = executor
            .submit_human_feedback(
                "demo",
                &cp.id,
                HumanFeedback::reject().with_message("add an example"),
            )
            .await
            .unwrap();
        assert!(rejected.next_agent().is_human());

        let cp = executor.checkpoints().latest_checkpoint("demo").unwrap().unwrap();
        let revised = executor
            .resume_from_checkpoint("demo", &cp.id, Some(REVISION_AGENT))
            .await
            .unwrap();

        assert!(revised.is_waiting_for_approval());
        assert!(revised
            .messages()
            .iter()
            .any(|m| m.content == "Draft 2 on lifetimes, revised for: add an example"));
    }
}
