//! Domain types for WiFi provisioning

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Maximum network name length in bytes (IEEE 802.11 SSID)
pub const MAX_NAME_LEN: usize = 32;

/// Maximum passphrase length in bytes (WPA2)
pub const MAX_PASSPHRASE_LEN: usize = 64;

/// Default number of networks the credential store can hold
pub const DEFAULT_CAPACITY: usize = 5;

/// Default deadline for a single join attempt
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(15);

/// A saved WiFi network
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NetworkCredential {
    /// Network name (SSID), never empty
    #[serde(rename = "ssid")]
    pub name: String,
    /// Passphrase, empty for open networks
    #[serde(rename = "password", default)]
    pub passphrase: String,
    /// Whether autoconnect may pick this entry
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
}

fn enabled_by_default() -> bool {
    true
}

impl NetworkCredential {
    /// Create an enabled credential, truncating both fields to their limits
    pub fn new(name: &str, passphrase: &str) -> Self {
        Self {
            name: truncate_str(name, MAX_NAME_LEN).to_owned(),
            passphrase: truncate_str(passphrase, MAX_PASSPHRASE_LEN).to_owned(),
            enabled: true,
        }
    }

    /// Whether both fields are within their byte limits and the name is set
    pub fn is_valid(&self) -> bool {
        !self.name.is_empty()
            && self.name.len() <= MAX_NAME_LEN
            && self.passphrase.len() <= MAX_PASSPHRASE_LEN
    }
}

/// Truncate a string to at most `max` bytes without splitting a character
pub fn truncate_str(value: &str, max: usize) -> &str {
    if value.len() <= max {
        return value;
    }
    let mut end = max;
    while !value.is_char_boundary(end) {
        end -= 1;
    }
    &value[..end]
}

/// Decode raw attribute bytes into a string of at most `max` bytes
///
/// Bytes beyond `max` are dropped. A character cut in half by the limit is
/// dropped entirely; other invalid UTF-8 is replaced lossily.
pub fn bounded_string(bytes: &[u8], max: usize) -> String {
    let bytes = &bytes[..bytes.len().min(max)];
    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_owned(),
        Err(e) if e.error_len().is_none() => {
            String::from_utf8_lossy(&bytes[..e.valid_up_to()]).into_owned()
        }
        Err(_) => {
            let decoded = String::from_utf8_lossy(bytes);
            truncate_str(&decoded, max).to_owned()
        }
    }
}

/// Provisioning state machine states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum ProvisioningState {
    Idle = 0,
    Started = 1,
    Complete = 2,
    Failed = 3,
    Connecting = 4,
    Connected = 5,
}

impl TryFrom<u8> for ProvisioningState {
    type Error = ();

    fn try_from(value: u8) -> Result<Self, <Self as TryFrom<u8>>::Error> {
        match value {
            0 => Ok(ProvisioningState::Idle),
            1 => Ok(ProvisioningState::Started),
            2 => Ok(ProvisioningState::Complete),
            3 => Ok(ProvisioningState::Failed),
            4 => Ok(ProvisioningState::Connecting),
            5 => Ok(ProvisioningState::Connected),
            _ => Err(()),
        }
    }
}

impl From<ProvisioningState> for u8 {
    fn from(state: ProvisioningState) -> Self {
        state as u8
    }
}

/// Station interface status, sampled once per tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkStatus {
    /// No sample taken yet or interface not present
    Unavailable,
    Idle,
    Connecting,
    Connected,
    ConnectFailed,
    NoSsidAvailable,
    ConnectionLost,
    Disconnected,
}

impl LinkStatus {
    /// Explicit failure reported by the interface
    pub fn is_failure(self) -> bool {
        matches!(self, LinkStatus::ConnectFailed | LinkStatus::NoSsidAvailable)
    }

    /// Association dropped or never established
    pub fn is_drop(self) -> bool {
        matches!(self, LinkStatus::Disconnected | LinkStatus::ConnectionLost)
    }

    /// Nothing to tear down before a new join
    pub fn is_settled(self) -> bool {
        matches!(self, LinkStatus::Disconnected | LinkStatus::Idle)
    }
}

/// Opaque reference to the linked radio peer (its address)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PeerId(String);

impl PeerId {
    pub fn new(address: impl Into<String>) -> Self {
        Self(address.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for PeerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Required protection for attribute access
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SecurityLevel {
    /// No encryption required
    Low,
    /// Encrypted link required
    Medium,
    /// Encrypted and authenticated (MITM-protected) link required
    #[default]
    High,
}

/// Pairing interaction capability of the device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IoCapability {
    DisplayOnly,
    #[default]
    DisplayYesNo,
    KeyboardOnly,
    NoInputNoOutput,
    KeyboardDisplay,
}

/// Pairing progress reported by the pairing subsystem
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PairingEvent {
    Started,
    Complete,
    Failed,
}

/// Orchestrator options
#[derive(Debug, Clone)]
pub struct ProvisioningConfig {
    /// Advertised device name
    pub device_name: String,
    pub security: SecurityLevel,
    pub io_capability: IoCapability,
    /// Maximum number of stored networks
    pub capacity: usize,
    pub connect_timeout: Duration,
    /// Only logged; see `Provisioner::allow_provisioning_when_connected`
    pub allow_provisioning_when_connected: bool,
}

impl Default for ProvisioningConfig {
    fn default() -> Self {
        Self {
            device_name: "PicoW".to_string(),
            security: SecurityLevel::default(),
            io_capability: IoCapability::default(),
            capacity: DEFAULT_CAPACITY,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            allow_provisioning_when_connected: false,
        }
    }
}
