pub mod config;
pub mod error;
pub mod event;
pub mod traits;
pub mod types;

pub use config::{CheckpointConfig, ExecutorConfig, WaylineConfig};
pub use error::{Result, WaylineError};
pub use event::{EventBus, StreamEvent, StreamEventKind};
pub use traits::{Agent, CheckpointBackend};
pub use types::*;
