//! Persistence of in-progress pipeline state

pub mod file;

pub use file::ControlFileStore;

use crate::core::state::PipelineState;
use anyhow::Result;

/// Backend holding the durable state of one pipeline instance
///
/// Presence of stored state means a run is in progress; absence means the
/// pipeline was never started or already finished/aborted. The store holds
/// the serialized form, so every save/load passes through the state codec.
#[async_trait::async_trait]
pub trait StateStore: Send + Sync {
    /// Check whether stored state is present, without decoding it
    async fn exists(&self) -> Result<bool>;

    /// Load the stored state; `None` when absent
    async fn load(&self) -> Result<Option<PipelineState>>;

    /// Replace the stored state, fully or not at all
    async fn save(&self, state: &PipelineState) -> Result<()>;

    /// Remove the stored state; removing absent state is not an error
    async fn remove(&self) -> Result<()>;

    /// Human-readable location for error messages
    fn location(&self) -> String;
}

/// In-memory store for tests and ephemeral use
///
/// Keeps the serialized encoding rather than the struct, so round-trip
/// behavior matches the control file exactly.
pub struct InMemoryStateStore {
    raw: tokio::sync::RwLock<Option<String>>,
}

impl InMemoryStateStore {
    pub fn new() -> Self {
        Self {
            raw: tokio::sync::RwLock::new(None),
        }
    }
}

impl Default for InMemoryStateStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl StateStore for InMemoryStateStore {
    async fn exists(&self) -> Result<bool> {
        Ok(self.raw.read().await.is_some())
    }

    async fn load(&self) -> Result<Option<PipelineState>> {
        match self.raw.read().await.as_deref() {
            Some(raw) => Ok(Some(PipelineState::unserialize(raw)?)),
            None => Ok(None),
        }
    }

    async fn save(&self, state: &PipelineState) -> Result<()> {
        *self.raw.write().await = Some(state.serialize());
        Ok(())
    }

    async fn remove(&self) -> Result<()> {
        *self.raw.write().await = None;
        Ok(())
    }

    fn location(&self) -> String {
        "<memory>".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_in_memory_round_trip() {
        let store = InMemoryStateStore::new();
        assert!(!store.exists().await.unwrap());
        assert!(store.load().await.unwrap().is_none());

        let mut state = PipelineState::new("release", vec!["tag".to_string()]);
        state.meta.insert("version", "2.0.0");
        store.save(&state).await.unwrap();

        assert!(store.exists().await.unwrap());
        assert_eq!(store.load().await.unwrap().unwrap(), state);

        store.remove().await.unwrap();
        assert!(!store.exists().await.unwrap());
        // Removing again is fine
        store.remove().await.unwrap();
    }
}
