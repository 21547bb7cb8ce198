//! In-memory blob store for testing

use std::sync::Arc;
use tokio::sync::Mutex;

use crate::core::error::{StorageError, StorageResult};
use crate::storage::BlobStore;

/// Internal state for the in-memory store
#[derive(Debug, Default)]
struct MemoryState {
    artifact: Option<Vec<u8>>,
    unavailable: bool,
    writes: usize,
}

/// In-memory blob store
///
/// Clones share the same artifact, so a test can keep a handle after moving
/// the store into a `CredentialStore`.
#[derive(Debug, Clone, Default)]
pub struct MemoryBlobStore {
    inner: Arc<Mutex<MemoryState>>,
}

impl MemoryBlobStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-loaded with an artifact
    pub fn with_contents(data: impl Into<Vec<u8>>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(MemoryState {
                artifact: Some(data.into()),
                ..Default::default()
            })),
        }
    }

    /// Configure the store to fail every operation
    pub async fn set_unavailable(&self, unavailable: bool) {
        self.inner.lock().await.unavailable = unavailable;
    }

    /// Current artifact contents
    pub async fn contents(&self) -> Option<Vec<u8>> {
        self.inner.lock().await.artifact.clone()
    }

    /// Number of successful writes so far
    pub async fn write_count(&self) -> usize {
        self.inner.lock().await.writes
    }
}

fn not_ready() -> StorageError {
    StorageError::NotReady("memory store marked unavailable".into())
}

impl BlobStore for MemoryBlobStore {
    async fn read(&self) -> StorageResult<Option<Vec<u8>>> {
        let state = self.inner.lock().await;
        if state.unavailable {
            return Err(not_ready());
        }
        Ok(state.artifact.clone())
    }

    async fn write(&self, data: &[u8]) -> StorageResult<()> {
        let mut state = self.inner.lock().await;
        if state.unavailable {
            return Err(not_ready());
        }
        state.artifact = Some(data.to_vec());
        state.writes += 1;
        Ok(())
    }

    async fn remove(&self) -> StorageResult<()> {
        let mut state = self.inner.lock().await;
        if state.unavailable {
            return Err(not_ready());
        }
        state.artifact = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_store_shares_state_between_clones() {
        let store = MemoryBlobStore::new();
        let handle = store.clone();

        store.write(b"abc").await.unwrap();
        assert_eq!(handle.contents().await, Some(b"abc".to_vec()));
        assert_eq!(handle.write_count().await, 1);
    }

    #[tokio::test]
    async fn test_memory_store_unavailable() {
        let store = MemoryBlobStore::with_contents(b"abc".to_vec());
        store.set_unavailable(true).await;

        assert!(store.read().await.is_err());
        assert!(store.write(b"x").await.is_err());
        assert!(store.remove().await.is_err());

        store.set_unavailable(false).await;
        assert_eq!(store.read().await.unwrap(), Some(b"abc".to_vec()));
    }
}
