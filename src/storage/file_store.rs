//! Filesystem-backed blob store

use std::path::{Path, PathBuf};
use tokio::{fs, io::AsyncWriteExt};
use tracing::debug;

use crate::{
    core::error::{StorageError, StorageResult},
    storage::BlobStore,
};

/// Default artifact name inside the state directory
pub const DEFAULT_ARTIFACT_NAME: &str = "wifi_config.json";

/// Stores the artifact as a single file, replaced via write-then-rename
#[derive(Debug, Clone)]
pub struct FileBlobStore {
    path: PathBuf,
    staging_path: PathBuf,
}

impl FileBlobStore {
    /// Open the store, creating the parent directory if needed
    pub async fn open(path: impl Into<PathBuf>) -> StorageResult<Self> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await.map_err(|e| {
                StorageError::NotReady(format!("cannot create {}: {}", parent.display(), e))
            })?;
        }

        let mut staging = path.clone().into_os_string();
        staging.push(".tmp");

        Ok(Self {
            path,
            staging_path: PathBuf::from(staging),
        })
    }

    /// Path of the artifact
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl BlobStore for FileBlobStore {
    async fn read(&self) -> StorageResult<Option<Vec<u8>>> {
        match fs::read(&self.path).await {
            Ok(data) => {
                debug!("Read {} bytes from {}", data.len(), self.path.display());
                Ok(Some(data))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn write(&self, data: &[u8]) -> StorageResult<()> {
        let mut file = fs::File::create(&self.staging_path).await?;
        file.write_all(data).await?;
        file.sync_all().await?;
        drop(file);

        fs::rename(&self.staging_path, &self.path).await?;
        debug!("Wrote {} bytes to {}", data.len(), self.path.display());
        Ok(())
    }

    async fn remove(&self) -> StorageResult<()> {
        match fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
