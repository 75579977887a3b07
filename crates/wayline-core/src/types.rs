use std::collections::HashMap;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::error::{Result, WaylineError};

/// Schema version written into every serialized state.
pub const STATE_VERSION: u32 = 1;

/// Reserved `nextAgent` value meaning "suspend until a human decides".
pub const HUMAN_SENTINEL: &str = "__human__";

/// Approval cap applied to fresh states.
pub const DEFAULT_MAX_APPROVALS: u32 = 3;

/// Current wall-clock time in epoch milliseconds.
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Role in a conversation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

/// A single message in the workflow history.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    pub role: Role,
    pub content: String,
    #[serde(default = "now_millis")]
    pub timestamp: i64,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: now_millis(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    /// Override the creation timestamp.
    pub fn at(mut self, timestamp: i64) -> Self {
        self.timestamp = timestamp;
        self
    }
}

/// Where execution goes after the current agent.
///
/// On the wire this is a plain string, the reserved [`HUMAN_SENTINEL`],
/// or `null` for [`Route::End`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "Option<String>", into = "Option<String>")]
pub enum Route {
    /// Invoke the named agent next.
    Agent(String),
    /// Suspend for human input.
    Human,
    /// Terminate the workflow.
    #[default]
    End,
}

impl Route {
    pub fn agent(name: impl Into<String>) -> Self {
        Self::Agent(name.into())
    }

    pub fn is_end(&self) -> bool {
        matches!(self, Self::End)
    }

    pub fn is_human(&self) -> bool {
        matches!(self, Self::Human)
    }
}

impl From<Option<String>> for Route {
    fn from(value: Option<String>) -> Self {
        match value {
            None => Self::End,
            Some(s) if s == HUMAN_SENTINEL => Self::Human,
            Some(s) => Self::Agent(s),
        }
    }
}

impl From<Route> for Option<String> {
    fn from(route: Route) -> Self {
        match route {
            Route::Agent(name) => Some(name),
            Route::Human => Some(HUMAN_SENTINEL.to_string()),
            Route::End => None,
        }
    }
}

impl From<&str> for Route {
    fn from(value: &str) -> Self {
        Self::from(Some(value.to_string()))
    }
}

impl From<String> for Route {
    fn from(value: String) -> Self {
        Self::from(Some(value))
    }
}

impl std::fmt::Display for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Agent(name) => write!(f, "{}", name),
            Self::Human => write!(f, "{}", HUMAN_SENTINEL),
            Self::End => write!(f, "<end>"),
        }
    }
}

/// The unit of data passed between agents and persisted in checkpoints.
///
/// `Clone` is a deep copy: the clone shares no mutable structure with the
/// original, so an executor run never mutates the caller's handle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WorkflowState {
    version: u32,
    messages: Vec<Message>,
    next_agent: Route,
    metadata: HashMap<String, serde_json::Value>,
    pending_approval: bool,
    approval_count: u32,
    max_approvals: u32,
}

impl Default for WorkflowState {
    fn default() -> Self {
        Self {
            version: STATE_VERSION,
            messages: Vec::new(),
            next_agent: Route::End,
            metadata: HashMap::new(),
            pending_approval: false,
            approval_count: 0,
            max_approvals: DEFAULT_MAX_APPROVALS,
        }
    }
}

impl WorkflowState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the approval cap.
    pub fn with_max_approvals(mut self, max_approvals: u32) -> Self {
        self.max_approvals = max_approvals;
        self
    }

    /// Append a message. History is never reordered or truncated.
    pub fn add_message(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn last_message(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn next_agent(&self) -> &Route {
        &self.next_agent
    }

    pub fn set_next_agent(&mut self, route: impl Into<Route>) {
        self.next_agent = route.into();
    }

    pub fn metadata(&self, key: &str) -> Option<&serde_json::Value> {
        self.metadata.get(key)
    }

    /// Get a metadata value as a string, if it's a string.
    pub fn metadata_str(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).and_then(|v| v.as_str())
    }

    pub fn set_metadata(&mut self, key: impl Into<String>, value: serde_json::Value) {
        self.metadata.insert(key.into(), value);
    }

    pub fn remove_metadata(&mut self, key: &str) -> Option<serde_json::Value> {
        self.metadata.remove(key)
    }

    pub fn metadata_map(&self) -> &HashMap<String, serde_json::Value> {
        &self.metadata
    }

    /// Suspend for a human decision.
    pub fn request_approval(&mut self) {
        self.pending_approval = true;
        self.next_agent = Route::Human;
    }

    pub fn is_waiting_for_approval(&self) -> bool {
        self.pending_approval
    }

    /// Resolve a pending approval.
    ///
    /// Approval, or reaching `max_approvals`, ends the workflow. A rejection
    /// below the cap leaves `next_agent` untouched so the calling workflow
    /// can route it.
    pub fn approve(&mut self, approved: bool, feedback: Option<&str>) {
        self.approval_count += 1;
        if let Some(text) = feedback {
            self.messages.push(Message::user(text));
        }
        self.pending_approval = false;
        if approved || self.approval_count >= self.max_approvals {
            self.next_agent = Route::End;
        }
    }

    pub fn approval_count(&self) -> u32 {
        self.approval_count
    }

    pub fn max_approvals(&self) -> u32 {
        self.max_approvals
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    /// Serialize to the flat JSON wire format.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parse the JSON wire format.
    ///
    /// Missing fields take their defaults and unknown fields are ignored.
    /// A version newer than [`STATE_VERSION`] is rejected; older ones are
    /// upgraded in place. A pending approval always routes to the human
    /// pause, whatever `nextAgent` says.
    pub fn from_json(blob: &str) -> Result<Self> {
        let mut state: Self = serde_json::from_str(blob)?;
        if state.version > STATE_VERSION {
            return Err(WaylineError::UnsupportedVersion(state.version));
        }
        if state.version < STATE_VERSION {
            debug!(from = state.version, to = STATE_VERSION, "Upgrading state schema");
            state.version = STATE_VERSION;
        }
        if state.pending_approval && !state.next_agent.is_human() {
            debug!(next = %state.next_agent, "Pending approval, routing to human pause");
            state.next_agent = Route::Human;
        }
        Ok(state)
    }
}

/// What an agent hands back to the executor.
#[derive(Debug, Clone)]
pub enum AgentOutcome {
    /// Keep the prior state and follow its existing route.
    Unchanged,
    /// Replace the state.
    Updated(WorkflowState),
}

impl AgentOutcome {
    /// The state to continue with, given the state the agent was handed.
    pub fn into_state(self, prior: WorkflowState) -> WorkflowState {
        match self {
            Self::Unchanged => prior,
            Self::Updated(state) => state,
        }
    }
}

impl From<WorkflowState> for AgentOutcome {
    fn from(state: WorkflowState) -> Self {
        Self::Updated(state)
    }
}

/// An immutable snapshot of workflow state on a thread.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Checkpoint {
    pub id: String,
    pub thread_id: String,
    pub timestamp: i64,
    pub serialized_state: String,
}

impl Checkpoint {
    /// Create a checkpoint with a fresh id.
    ///
    /// The id combines the timestamp with a random UUID, so saves within
    /// the same millisecond on one thread still get distinct ids.
    pub fn new(thread_id: impl Into<String>, serialized_state: String) -> Self {
        let timestamp = now_millis();
        Self {
            id: format!("cp_{}_{}", timestamp, Uuid::new_v4().simple()),
            thread_id: thread_id.into(),
            timestamp,
            serialized_state,
        }
    }

    /// Decode the stored state.
    pub fn state(&self) -> Result<WorkflowState> {
        WorkflowState::from_json(&self.serialized_state)
    }
}
