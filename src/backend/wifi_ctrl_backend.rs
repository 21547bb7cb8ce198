//! wifi-ctrl backend implementation

use std::sync::Arc;
use tokio::sync::{Mutex, broadcast};
use tracing::{debug, error, info, warn};
use wifi_ctrl::sta::{Broadcast, BroadcastReceiver, RequestClient, WifiSetup};

use crate::{
    backend::StationInterface,
    core::{
        error::{StationError, StationResult},
        types::LinkStatus,
    },
};

/// Station status reported by broadcasts rather than by `STATUS`
#[derive(Debug, Default)]
struct EventLatch {
    associated: bool,
    status: Option<LinkStatus>,
}

pub struct WifiCtrlBackend {
    interface: String,
    client: RequestClient,
    latch: Arc<Mutex<EventLatch>>,
}

impl WifiCtrlBackend {
    pub async fn new(interface: String) -> StationResult<Self> {
        let path = format!("/var/run/wpa_supplicant/{}", interface);
        let mut setup =
            WifiSetup::new().map_err(|e| StationError::WpaSupplicantError(e.to_string()))?;
        setup.set_socket_path(path);

        let client = setup.get_request_client();
        let broadcast_receiver = setup.get_broadcast_receiver();
        let station = setup.complete();

        // Spawn the station runtime
        tokio::spawn(async move {
            if let Err(e) = station.run().await {
                error!("WifiStation runtime error: {}", e);
            }
        });

        let latch = Arc::new(Mutex::new(EventLatch::default()));
        tokio::spawn(Self::watch_broadcasts(broadcast_receiver, latch.clone()));

        info!("Station interface {} ready", interface);
        Ok(Self {
            interface,
            client,
            latch,
        })
    }

    /// Record failures that `STATUS` alone cannot tell apart from idling
    async fn watch_broadcasts(mut receiver: BroadcastReceiver, latch: Arc<Mutex<EventLatch>>) {
        loop {
            match receiver.recv().await {
                Ok(event) => {
                    debug!("Received broadcast event: {:?}", event);
                    let mut latch = latch.lock().await;
                    match event {
                        Broadcast::Connected => {
                            latch.associated = true;
                            latch.status = None;
                        }
                        Broadcast::WrongPsk => {
                            latch.status = Some(LinkStatus::ConnectFailed);
                        }
                        Broadcast::NetworkNotFound => {
                            latch.status = Some(LinkStatus::NoSsidAvailable);
                        }
                        Broadcast::Disconnected if latch.associated => {
                            latch.associated = false;
                            latch.status = Some(LinkStatus::ConnectionLost);
                        }
                        _ => {}
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!("Broadcast receiver lagged, skipped {} events", skipped);
                }
                Err(broadcast::error::RecvError::Closed) => {
                    warn!("Broadcast channel closed");
                    return;
                }
            }
        }
    }

    async fn request<T, E: std::fmt::Display>(
        what: &str,
        result: impl Future<Output = Result<T, E>>,
    ) -> StationResult<T> {
        result
            .await
            .map_err(|e| StationError::WpaSupplicantError(format!("{} failed: {}", what, e)))
    }
}

/// Map a `wpa_state` value onto the polled link status
fn link_status_from_wpa_state(wpa_state: &str) -> LinkStatus {
    match wpa_state {
        "COMPLETED" => LinkStatus::Connected,
        "SCANNING" | "AUTHENTICATING" | "ASSOCIATING" | "ASSOCIATED" | "4WAY_HANDSHAKE"
        | "GROUP_HANDSHAKE" => LinkStatus::Connecting,
        "DISCONNECTED" => LinkStatus::Disconnected,
        "INACTIVE" => LinkStatus::Idle,
        _ => LinkStatus::Unavailable,
    }
}

/// Extract `RSSI=` from a `SIGNAL_POLL` reply
fn parse_signal_poll(reply: &str) -> Option<i32> {
    reply
        .lines()
        .find_map(|line| line.trim().strip_prefix("RSSI="))
        .and_then(|value| value.parse().ok())
}

impl StationInterface for WifiCtrlBackend {
    async fn begin(&self, name: &str, passphrase: &str) -> StationResult<()> {
        debug!(network = %name, "Joining network on {}", self.interface);

        *self.latch.lock().await = EventLatch::default();

        let network_id = Self::request("ADD_NETWORK", self.client.add_network()).await?;

        // wifi-ctrl handles quoting internally via conf_escape
        Self::request(
            "SET_NETWORK ssid",
            self.client.set_network_ssid(network_id, name.to_string()),
        )
        .await?;

        if passphrase.is_empty() {
            Self::request(
                "SET_NETWORK key_mgmt",
                self.client
                    .send_custom(format!("SET_NETWORK {} key_mgmt NONE", network_id)),
            )
            .await?;
        } else {
            Self::request(
                "SET_NETWORK psk",
                self.client
                    .set_network_psk(network_id, passphrase.to_string()),
            )
            .await?;
        }

        // Enables the network and disables all others
        Self::request("SELECT_NETWORK", self.client.select_network(network_id)).await?;

        debug!("Join initiated");
        Ok(())
    }

    async fn disconnect(&self) -> StationResult<()> {
        debug!("Disconnecting");
        Self::request(
            "DISCONNECT",
            self.client.send_custom("DISCONNECT".to_string()),
        )
        .await?;

        let mut latch = self.latch.lock().await;
        latch.associated = false;
        latch.status = None;
        Ok(())
    }

    async fn status(&self) -> StationResult<LinkStatus> {
        if let Some(status) = self.latch.lock().await.status {
            return Ok(status);
        }

        let status = Self::request("STATUS", self.client.get_status()).await?;
        let wpa_state = status
            .get("wpa_state")
            .map(|s| s.as_str())
            .unwrap_or("UNKNOWN");

        Ok(link_status_from_wpa_state(wpa_state))
    }

    async fn rssi(&self) -> StationResult<i32> {
        let reply = Self::request(
            "SIGNAL_POLL",
            self.client.send_custom("SIGNAL_POLL".to_string()),
        )
        .await?;

        parse_signal_poll(&reply).ok_or_else(|| {
            StationError::InterfaceUnavailable(format!("no signal on {}", self.interface))
        })
    }
}
