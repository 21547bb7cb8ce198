//! Error types for the WiFi provisioning service

use thiserror::Error;

use super::types::LinkStatus;

/// Result type for station interface operations
pub type StationResult<T> = Result<T, StationError>;

/// Result type for peripheral link operations
pub type LinkResult<T> = Result<T, LinkError>;

/// Result type for durable storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Result type for service operations
pub type ServiceResult<T> = Result<T, ServiceError>;

/// Errors raised by the station network interface
#[derive(Error, Debug, Clone)]
pub enum StationError {
    #[error("Station interface unavailable: {0}")]
    InterfaceUnavailable(String),

    #[error("Join request failed: {0}")]
    JoinFailed(String),

    #[error("wpa_supplicant error: {0}")]
    WpaSupplicantError(String),
}

/// Errors raised by the radio peripheral collaborator
#[derive(Error, Debug, Clone)]
pub enum LinkError {
    #[error("BLE error: {0}")]
    Ble(String),

    #[error("Peer not connected: {0}")]
    PeerNotConnected(String),

    #[error("Event channel closed")]
    ChannelClosed,
}

impl From<bluer::Error> for LinkError {
    fn from(e: bluer::Error) -> Self {
        LinkError::Ble(e.to_string())
    }
}

/// Errors raised by the durable storage medium
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage not ready: {0}")]
    NotReady(String),
}

/// Errors related to core provisioning operations
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(&'static str),

    #[error("Credential store full ({capacity} networks)")]
    CapacityExceeded { capacity: usize },

    #[error("Connection attempt already in progress")]
    Busy,

    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("Stored credentials corrupt: {0}")]
    StorageCorrupt(String),

    #[error("Connection attempt timed out")]
    Timeout,

    #[error("Network join failed with status {0:?}")]
    JoinFailed(LinkStatus),

    #[error("Link lost")]
    LinkLost,

    #[error("Station error: {0}")]
    Station(#[from] StationError),

    #[error("Peripheral error: {0}")]
    Link(#[from] LinkError),
}

impl From<StorageError> for ServiceError {
    fn from(e: StorageError) -> Self {
        ServiceError::StorageUnavailable(e.to_string())
    }
}

impl From<serde_json::Error> for ServiceError {
    fn from(e: serde_json::Error) -> Self {
        ServiceError::StorageCorrupt(e.to_string())
    }
}
