//! WiFi Provisioning Service
//!
//! Receives WiFi credentials from a paired companion device over a BLE
//! attribute service, persists them and joins the network through
//! wpa_supplicant. The radio stack, the station interface and the durable
//! store are injected behind traits so the orchestrator runs against
//! in-memory fakes as well.

pub mod backend;
pub mod config;
pub mod core;
pub mod protocol;
pub mod storage;
pub mod transport;

pub use core::{
    error::{LinkError, ServiceError, StationError, StorageError},
    provisioner::Provisioner,
    types::{LinkStatus, NetworkCredential, ProvisioningConfig, ProvisioningState},
};
