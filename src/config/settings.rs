//! Runtime settings

use std::{path::PathBuf, time::Duration};

use crate::{
    config::{
        CliArgs,
        cli::{IoCapabilityArg, SecurityArg},
    },
    core::types::{IoCapability, ProvisioningConfig, SecurityLevel},
};

/// Runtime configuration settings
#[derive(Debug, Clone)]
pub struct Settings {
    pub interface: String,
    pub store_path: PathBuf,
    pub tick_interval: Duration,
    pub autoconnect: bool,
    pub provisioning: ProvisioningConfig,
}

impl From<SecurityArg> for SecurityLevel {
    fn from(arg: SecurityArg) -> Self {
        match arg {
            SecurityArg::Low => SecurityLevel::Low,
            SecurityArg::Medium => SecurityLevel::Medium,
            SecurityArg::High => SecurityLevel::High,
        }
    }
}

impl From<IoCapabilityArg> for IoCapability {
    fn from(arg: IoCapabilityArg) -> Self {
        match arg {
            IoCapabilityArg::DisplayOnly => IoCapability::DisplayOnly,
            IoCapabilityArg::DisplayYesNo => IoCapability::DisplayYesNo,
            IoCapabilityArg::KeyboardOnly => IoCapability::KeyboardOnly,
            IoCapabilityArg::NoInputNoOutput => IoCapability::NoInputNoOutput,
            IoCapabilityArg::KeyboardDisplay => IoCapability::KeyboardDisplay,
        }
    }
}

impl From<CliArgs> for Settings {
    fn from(args: CliArgs) -> Self {
        Settings {
            interface: args.interface,
            store_path: PathBuf::from(args.store_path),
            // A zero interval would make tokio::time::interval panic
            tick_interval: Duration::from_millis(args.tick_ms.max(1)),
            autoconnect: !args.no_autoconnect,
            provisioning: ProvisioningConfig {
                device_name: args.device_name,
                security: args.security.into(),
                io_capability: args.io_capability.into(),
                capacity: args.capacity,
                connect_timeout: Duration::from_secs(args.connect_timeout_secs),
                allow_provisioning_when_connected: args.allow_provisioning_when_connected,
            },
        }
    }
}
