use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

use tracing::debug;

use wayline_core::error::{Result, WaylineError};
use wayline_core::traits::CheckpointBackend;
use wayline_core::types::{Checkpoint, WorkflowState};

fn poisoned(e: impl std::fmt::Display) -> WaylineError {
    WaylineError::Checkpoint(format!("checkpoint lock poisoned: {}", e))
}

/// Unbounded in-process checkpoint log.
///
/// The outer map is only write-locked to create or drop a thread; appends
/// and reads share the read lock and then take the thread's own mutex, so
/// different threads never wait on each other.
#[derive(Default)]
pub struct InMemoryBackend {
    threads: RwLock<HashMap<String, Mutex<Vec<Checkpoint>>>>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_thread<T>(
        &self,
        thread_id: &str,
        f: impl FnOnce(&[Checkpoint]) -> T,
    ) -> Result<Option<T>> {
        let threads = self.threads.read().map_err(poisoned)?;
        match threads.get(thread_id) {
            Some(log) => {
                let log = log.lock().map_err(poisoned)?;
                Ok(Some(f(log.as_slice())))
            }
            None => Ok(None),
        }
    }
}

impl CheckpointBackend for InMemoryBackend {
    fn save(&self, thread_id: &str, serialized_state: String) -> Result<Checkpoint> {
        let checkpoint = Checkpoint::new(thread_id, serialized_state);

        {
            let threads = self.threads.read().map_err(poisoned)?;
            if let Some(log) = threads.get(thread_id) {
                log.lock().map_err(poisoned)?.push(checkpoint.clone());
                return Ok(checkpoint);
            }
        }

        // First checkpoint for this thread
        let mut threads = self.threads.write().map_err(poisoned)?;
        threads
            .entry(thread_id.to_string())
            .or_default()
            .lock()
            .map_err(poisoned)?
            .push(checkpoint.clone());
        Ok(checkpoint)
    }

    fn load(&self, thread_id: &str, checkpoint_id: &str) -> Result<Option<Checkpoint>> {
        Ok(self
            .with_thread(thread_id, |log| {
                log.iter().find(|cp| cp.id == checkpoint_id).cloned()
            })?
            .flatten())
    }

    fn latest(&self, thread_id: &str) -> Result<Option<Checkpoint>> {
        Ok(self
            .with_thread(thread_id, |log| log.last().cloned())?
            .flatten())
    }

    fn list(&self, thread_id: &str) -> Result<Vec<Checkpoint>> {
        Ok(self
            .with_thread(thread_id, |log| log.to_vec())?
            .unwrap_or_default())
    }

    fn threads(&self) -> Result<Vec<String>> {
        let threads = self.threads.read().map_err(poisoned)?;
        let mut ids: Vec<String> = threads.keys().cloned().collect();
        ids.sort();
        Ok(ids)
    }

    fn delete_thread(&self, thread_id: &str) -> Result<bool> {
        let mut threads = self.threads.write().map_err(poisoned)?;
        Ok(threads.remove(thread_id).is_some())
    }
}

/// Per-thread checkpoint log of workflow states.
///
/// Serializes states on the way in and decodes them on the way out; the
/// backend only ever sees opaque blobs.
#[derive(Clone)]
pub struct CheckpointStore {
    backend: Arc<dyn CheckpointBackend>,
}

impl CheckpointStore {
    pub fn new(backend: Arc<dyn CheckpointBackend>) -> Self {
        Self { backend }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemoryBackend::new()))
    }

    /// Snapshot a state onto a thread, returning the checkpoint id.
    pub fn save_checkpoint(&self, thread_id: &str, state: &WorkflowState) -> Result<String> {
        let blob = state.to_json()?;
        let checkpoint = self.backend.save(thread_id, blob)?;
        debug!(thread_id, checkpoint_id = %checkpoint.id, "Checkpoint saved");
        Ok(checkpoint.id)
    }

    pub fn load_checkpoint(
        &self,
        thread_id: &str,
        checkpoint_id: &str,
    ) -> Result<Option<WorkflowState>> {
        self.backend
            .load(thread_id, checkpoint_id)?
            .map(|cp| cp.state())
            .transpose()
    }

    pub fn load_latest_checkpoint(&self, thread_id: &str) -> Result<Option<WorkflowState>> {
        self.backend.latest(thread_id)?.map(|cp| cp.state()).transpose()
    }

    /// Latest checkpoint record, id included.
    pub fn latest_checkpoint(&self, thread_id: &str) -> Result<Option<Checkpoint>> {
        self.backend.latest(thread_id)
    }

    pub fn get_checkpoints(&self, thread_id: &str) -> Result<Vec<Checkpoint>> {
        self.backend.list(thread_id)
    }

    pub fn list_threads(&self) -> Result<Vec<String>> {
        self.backend.threads()
    }

    pub fn delete_thread(&self, thread_id: &str) -> Result<bool> {
        let deleted = self.backend.delete_thread(thread_id)?;
        if deleted {
            debug!(thread_id, "Thread deleted");
        }
        Ok(deleted)
    }
}

impl Default for CheckpointStore {
    fn default() -> Self {
        Self::in_memory()
    }
}
