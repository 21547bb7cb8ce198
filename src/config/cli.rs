//! Command-line argument parsing

use clap::{Parser, ValueEnum};

/// Attribute protection level
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecurityArg {
    Low,
    Medium,
    High,
}

/// Pairing I/O capability
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum IoCapabilityArg {
    DisplayOnly,
    DisplayYesNo,
    KeyboardOnly,
    NoInputNoOutput,
    KeyboardDisplay,
}

#[derive(Parser, Debug, Clone)]
#[clap(name = "wifi-provisioning", version, author)]
#[clap(about = "WiFi provisioning service over a paired BLE link")]
pub struct CliArgs {
    /// Wireless network interface name
    #[clap(short, long, default_value = "wlan0")]
    pub interface: String,

    /// Advertised BLE device name
    #[clap(short = 'n', long, default_value = "PicoW")]
    pub device_name: String,

    /// Security required to access the provisioning attributes
    #[clap(long, value_enum, default_value_t = SecurityArg::High)]
    pub security: SecurityArg,

    /// Pairing I/O capability
    #[clap(long, value_enum, default_value_t = IoCapabilityArg::DisplayYesNo)]
    pub io_capability: IoCapabilityArg,

    /// Path of the stored network list
    #[clap(long, default_value = "/var/lib/wifi-provisioning/wifi_config.json")]
    pub store_path: String,

    /// Maximum number of stored networks
    #[clap(long, default_value = "5")]
    pub capacity: usize,

    /// Seconds to wait for a network join
    #[clap(long, default_value = "15")]
    pub connect_timeout_secs: u64,

    /// Control loop interval in milliseconds
    #[clap(long, default_value = "20")]
    pub tick_ms: u64,

    /// Accept provisioning while already connected (only logged)
    #[clap(long)]
    pub allow_provisioning_when_connected: bool,

    /// Do not join a stored network at startup
    #[clap(long)]
    pub no_autoconnect: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let args = CliArgs::parse_from(["wifi-provisioning"]);

        assert_eq!(args.interface, "wlan0");
        assert_eq!(args.device_name, "PicoW");
        assert_eq!(args.security, SecurityArg::High);
        assert_eq!(args.io_capability, IoCapabilityArg::DisplayYesNo);
        assert_eq!(args.capacity, 5);
        assert_eq!(args.connect_timeout_secs, 15);
        assert_eq!(args.tick_ms, 20);
        assert!(!args.allow_provisioning_when_connected);
        assert!(!args.no_autoconnect);
    }

    #[test]
    fn test_value_enums() {
        let args = CliArgs::parse_from([
            "wifi-provisioning",
            "--security",
            "medium",
            "--io-capability",
            "no-input-no-output",
            "-n",
            "Kitchen",
        ]);

        assert_eq!(args.security, SecurityArg::Medium);
        assert_eq!(args.io_capability, IoCapabilityArg::NoInputNoOutput);
        assert_eq!(args.device_name, "Kitchen");
        assert!(CliArgs::try_parse_from(["wifi-provisioning", "--security", "max"]).is_err());
    }
}
