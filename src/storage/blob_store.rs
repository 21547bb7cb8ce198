//! Durable blob store trait definition

use trait_variant::make;

use crate::core::error::StorageResult;

/// Abstraction over the durable medium holding the credential artifact
///
/// The store manages exactly one named artifact. Implementations must make
/// `write` atomic from the reader's point of view: a subsequent `read` sees
/// either the previous artifact or the new one, never a mix.
#[make(Send)]
pub trait BlobStore: Sync + 'static {
    /// Read the whole artifact
    ///
    /// Returns `Ok(None)` if no artifact has been written yet.
    async fn read(&self) -> StorageResult<Option<Vec<u8>>>;

    /// Replace the whole artifact
    async fn write(&self, data: &[u8]) -> StorageResult<()>;

    /// Remove the artifact; removing a missing artifact succeeds
    async fn remove(&self) -> StorageResult<()>;
}
