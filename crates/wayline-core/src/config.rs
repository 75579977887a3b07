use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, WaylineError};

/// Top-level Wayline configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WaylineConfig {
    #[serde(default)]
    pub executor: ExecutorConfig,
    #[serde(default)]
    pub checkpoint: CheckpointConfig,
}

/// Limits and switches for the graph executor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutorConfig {
    /// Agent invocations allowed per run before a forced stop.
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,
    /// Per-agent timeout unless a call overrides it.
    #[serde(default = "default_agent_timeout_ms")]
    pub agent_timeout_ms: u64,
    /// Honor pending approvals by suspending the run.
    #[serde(default = "default_human_in_loop")]
    pub human_in_loop: bool,
    /// Approval cap given to states created by the CLI.
    #[serde(default = "default_max_approvals")]
    pub max_approvals: u32,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
            agent_timeout_ms: default_agent_timeout_ms(),
            human_in_loop: default_human_in_loop(),
            max_approvals: default_max_approvals(),
        }
    }
}

impl ExecutorConfig {
    pub fn agent_timeout(&self) -> Duration {
        Duration::from_millis(self.agent_timeout_ms)
    }
}

fn default_max_iterations() -> usize { 10 }
fn default_agent_timeout_ms() -> u64 { 30_000 }
fn default_human_in_loop() -> bool { true }
fn default_max_approvals() -> u32 { crate::types::DEFAULT_MAX_APPROVALS }

/// Checkpointing configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckpointConfig {
    /// Persist a checkpoint after every agent step when a thread id is given.
    #[serde(default = "default_checkpoint_enabled")]
    pub enabled: bool,
}

impl Default for CheckpointConfig {
    fn default() -> Self {
        Self {
            enabled: default_checkpoint_enabled(),
        }
    }
}

fn default_checkpoint_enabled() -> bool { true }

impl WaylineConfig {
    /// Load config from a TOML file, with env var expansion.
    ///
    /// A missing file is `ConfigNotFound`; any other read failure is `Io`.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => {
                WaylineError::ConfigNotFound(path.display().to_string())
            }
            _ => WaylineError::Io(e),
        })?;

        // Expand ${ENV_VAR} references
        let expanded = expand_env_vars(&content);

        let config = Self::parse(&expanded)?;
        debug!(path = %path.display(), "Config loaded");
        Ok(config)
    }

    pub fn parse(content: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(content).map_err(|e| WaylineError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.executor.max_iterations == 0 {
            return Err(WaylineError::Config(
                "executor.max_iterations must be at least 1".into(),
            ));
        }
        if self.executor.agent_timeout_ms == 0 {
            return Err(WaylineError::Config(
                "executor.agent_timeout_ms must be positive".into(),
            ));
        }
        Ok(())
    }
}

/// Expand `${ENV_VAR}` patterns in a string.
fn expand_env_vars(input: &str) -> String {
    let mut result = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '$' && chars.peek() == Some(&'{') {
            chars.next(); // consume '{'
            let mut var_name = String::new();
            for c in chars.by_ref() {
                if c == '}' {
                    break;
                }
                var_name.push(c);
            }
            match std::env::var(&var_name) {
                Ok(val) => result.push_str(&val),
                Err(_) => {
                    // Keep original if env var not set
                    result.push_str(&format!("${{{}}}", var_name));
                }
            }
        } else {
            result.push(c);
        }
    }
    result
}
