//! Station interface trait definition

use trait_variant::make;

use crate::core::error::StationResult;
use crate::core::types::LinkStatus;

/// Abstraction over the station-mode network interface (typically wpa_supplicant)
///
/// Every method returns promptly. A join request only starts the attempt;
/// its outcome is observed later by polling `status`.
#[make(Send)]
pub trait StationInterface: Sync + 'static {
    /// Start joining a network
    ///
    /// # Arguments
    /// * `name` - Network name (up to 32 bytes UTF-8)
    /// * `passphrase` - WPA passphrase, empty for an open network
    async fn begin(&self, name: &str, passphrase: &str) -> StationResult<()>;

    /// Leave the current network or abort a pending join
    async fn disconnect(&self) -> StationResult<()>;

    /// Current interface status
    async fn status(&self) -> StationResult<LinkStatus>;

    /// Signal strength of the current association in dBm
    async fn rssi(&self) -> StationResult<i32>;
}
