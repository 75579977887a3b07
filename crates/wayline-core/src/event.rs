use serde::{Deserialize, Serialize};

use crate::types::{now_millis, Message, Route, WorkflowState};

/// Kind of lifecycle event emitted while a workflow runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamEventKind {
    AgentStart,
    AgentComplete,
    Message,
    Error,
    Complete,
}

/// One event of a workflow stream, in the `{type, agentName?, message?,
/// error?, timestamp}` wire shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamEvent {
    #[serde(rename = "type")]
    pub kind: StreamEventKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<Message>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub timestamp: i64,
    /// Final state, only on `complete`. Never serialized.
    #[serde(skip)]
    pub state: Option<Box<WorkflowState>>,
}

impl StreamEvent {
    fn new(kind: StreamEventKind) -> Self {
        Self {
            kind,
            agent_name: None,
            message: None,
            error: None,
            timestamp: now_millis(),
            state: None,
        }
    }

    pub fn agent_start(agent: &str) -> Self {
        Self {
            agent_name: Some(agent.to_string()),
            ..Self::new(StreamEventKind::AgentStart)
        }
    }

    /// Carries the name of the agent routed to next (absent at the end).
    pub fn agent_complete(next: &Route) -> Self {
        Self {
            agent_name: next.clone().into(),
            ..Self::new(StreamEventKind::AgentComplete)
        }
    }

    pub fn message(agent: &str, message: Message) -> Self {
        Self {
            agent_name: Some(agent.to_string()),
            message: Some(message),
            ..Self::new(StreamEventKind::Message)
        }
    }

    pub fn error(agent: Option<&str>, error: impl std::fmt::Display) -> Self {
        Self {
            agent_name: agent.map(str::to_string),
            error: Some(error.to_string()),
            ..Self::new(StreamEventKind::Error)
        }
    }

    pub fn complete(state: WorkflowState) -> Self {
        Self {
            state: Some(Box::new(state)),
            ..Self::new(StreamEventKind::Complete)
        }
    }
}

/// Broadcasts workflow events to every subscriber.
///
/// Slow subscribers lag and lose the oldest events; publishing never waits.
pub struct EventBus {
    tx: tokio::sync::broadcast::Sender<StreamEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = tokio::sync::broadcast::channel(capacity);
        Self { tx }
    }

    pub fn publish(&self, event: StreamEvent) {
        // No subscribers is fine
        let _ = self.tx.send(event);
    }

    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<StreamEvent> {
        self.tx.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}
