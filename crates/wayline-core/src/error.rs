use thiserror::Error;

#[derive(Debug, Error)]
pub enum WaylineError {
    // Agent errors
    #[error("Agent not found: {0}")]
    AgentNotFound(String),

    #[error("Agent timeout after {timeout_ms}ms: {agent}")]
    AgentTimeout { agent: String, timeout_ms: u64 },

    #[error("Agent execution failed: {agent}: {message}")]
    AgentExecution { agent: String, message: String },

    // Checkpoint errors
    #[error("Checkpoint not found: {checkpoint_id} (thread {thread_id})")]
    CheckpointNotFound {
        thread_id: String,
        checkpoint_id: String,
    },

    #[error("Checkpoint {checkpoint_id} (thread {thread_id}) has no agent to resume")]
    NoResumableAgent {
        thread_id: String,
        checkpoint_id: String,
    },

    #[error("Checkpoint storage error: {0}")]
    Checkpoint(String),

    #[error("Unsupported state version {0}")]
    UnsupportedVersion(u32),

    // Routing errors
    #[error("Routing error: {0}")]
    Routing(String),

    // Config errors
    #[error("Config error: {0}")]
    Config(String),

    #[error("Config file not found: {0}")]
    ConfigNotFound(String),

    // I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // JSON errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl WaylineError {
    /// Convenience constructor for agents reporting their own failure.
    pub fn agent(agent: impl Into<String>, message: impl Into<String>) -> Self {
        Self::AgentExecution {
            agent: agent.into(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, WaylineError>;
