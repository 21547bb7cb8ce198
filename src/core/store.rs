//! Persistent credential store

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{debug, info, warn};

use crate::{
    core::{
        error::{ServiceError, ServiceResult},
        types::NetworkCredential,
    },
    storage::BlobStore,
};

/// Largest artifact accepted by `load`
pub const MAX_ARTIFACT_SIZE: usize = 2048;

/// On-disk layout of the credential artifact
#[derive(Debug, Default, Serialize, Deserialize)]
struct StoredNetworks {
    networks: Vec<NetworkCredential>,
}

/// Ordered list of saved networks backed by a durable blob
pub struct CredentialStore<S: BlobStore> {
    blob: S,
    capacity: usize,
    networks: Vec<NetworkCredential>,
}

impl<S: BlobStore> CredentialStore<S> {
    /// Create an empty store; call `load` to read persisted networks
    pub fn new(blob: S, capacity: usize) -> Self {
        Self {
            blob,
            capacity,
            networks: Vec::with_capacity(capacity),
        }
    }

    /// Reload the list from durable storage
    ///
    /// A missing artifact yields an empty list. A malformed, oversized or
    /// inconsistent artifact empties the in-memory list and returns
    /// `StorageCorrupt`; it is never partially applied.
    pub async fn load(&mut self) -> ServiceResult<&[NetworkCredential]> {
        self.networks.clear();

        let Some(data) = self.blob.read().await? else {
            debug!("No stored networks");
            return Ok(&self.networks);
        };

        self.networks = self.decode(&data)?;
        info!("Loaded {} stored network(s)", self.networks.len());
        Ok(&self.networks)
    }

    fn decode(&self, data: &[u8]) -> ServiceResult<Vec<NetworkCredential>> {
        if data.len() > MAX_ARTIFACT_SIZE {
            return Err(ServiceError::StorageCorrupt(format!(
                "artifact is {} bytes, limit is {}",
                data.len(),
                MAX_ARTIFACT_SIZE
            )));
        }

        let stored: StoredNetworks = serde_json::from_slice(data)?;
        if stored.networks.len() > self.capacity {
            return Err(ServiceError::StorageCorrupt(format!(
                "{} networks stored, capacity is {}",
                stored.networks.len(),
                self.capacity
            )));
        }

        let mut seen = HashSet::new();
        for network in &stored.networks {
            if !network.is_valid() {
                return Err(ServiceError::StorageCorrupt(
                    "entry with empty or oversized field".into(),
                ));
            }
            if !seen.insert(network.name.as_str()) {
                return Err(ServiceError::StorageCorrupt(format!(
                    "duplicate network {}",
                    network.name
                )));
            }
        }

        Ok(stored.networks)
    }

    /// Insert or update a network and flush the whole list
    ///
    /// Both fields are truncated to their byte limits. An existing entry
    /// with the same name gets the new passphrase and is re-enabled.
    pub async fn save(&mut self, name: &str, passphrase: &str) -> ServiceResult<()> {
        if name.is_empty() {
            return Err(ServiceError::InvalidArgument("network name is empty"));
        }

        let credential = NetworkCredential::new(name, passphrase);
        let previous = self.networks.clone();
        let full = self.networks.len() >= self.capacity;

        match self
            .networks
            .iter_mut()
            .find(|n| n.name == credential.name)
        {
            Some(existing) => {
                existing.passphrase = credential.passphrase;
                existing.enabled = true;
            }
            None if full => {
                return Err(ServiceError::CapacityExceeded {
                    capacity: self.capacity,
                });
            }
            None => self.networks.push(credential),
        }

        if let Err(e) = self.flush().await {
            warn!("Failed to persist networks: {}", e);
            self.networks = previous;
            return Err(e);
        }

        debug!(network = %name, "Network saved");
        Ok(())
    }

    async fn flush(&self) -> ServiceResult<()> {
        let document = serde_json::to_vec(&StoredNetworks {
            networks: self.networks.clone(),
        })
        .map_err(|e| ServiceError::StorageUnavailable(e.to_string()))?;
        self.blob.write(&document).await?;
        Ok(())
    }

    /// Remove every network and the durable artifact
    ///
    /// The in-memory list is kept if the artifact cannot be removed.
    pub async fn clear(&mut self) -> ServiceResult<()> {
        self.blob.remove().await?;
        self.networks.clear();
        info!("Stored networks cleared");
        Ok(())
    }

    pub fn count(&self) -> usize {
        self.networks.len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn iter(&self) -> impl Iterator<Item = &NetworkCredential> {
        self.networks.iter()
    }

    pub fn find(&self, name: &str) -> Option<&NetworkCredential> {
        self.networks.iter().find(|n| n.name == name)
    }

    /// First entry autoconnect may use
    pub fn first_enabled(&self) -> Option<&NetworkCredential> {
        self.networks.iter().find(|n| n.enabled)
    }
}
