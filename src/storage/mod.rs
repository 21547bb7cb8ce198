//! Durable storage abstraction layer

pub mod blob_store;
pub mod file_store;
pub mod memory_store;

pub use blob_store::BlobStore;
pub use file_store::{DEFAULT_ARTIFACT_NAME, FileBlobStore};
pub use memory_store::MemoryBlobStore;
