//! BLE adapter management

use bluer::{
    Adapter, AdapterEvent, Address, DeviceEvent, DeviceProperty, Session,
    adv::{Advertisement, AdvertisementHandle, Type as AdvertisementType},
    agent::AgentHandle,
    gatt::local::ApplicationHandle,
};
use futures::StreamExt;
use std::collections::HashSet;
use tokio::{
    sync::{Mutex, RwLock, mpsc},
    task::JoinHandle,
};
use tracing::{debug, info, warn};

use crate::{
    core::{
        error::{LinkError, LinkResult},
        types::{PairingEvent, PeerId, ProvisioningConfig},
    },
    protocol::{AttributeId, PROVISIONING_SERVICE_UUID},
    transport::ble::{
        PeripheralLink, RadioEvent,
        agent::{ConfirmationSlot, build_agent},
        gatt::{GattServer, NotifierSlot},
    },
};

/// Handles that keep the registered service alive
#[derive(Default)]
struct Registration {
    application: Option<ApplicationHandle>,
    agent: Option<AgentHandle>,
    watcher: Option<JoinHandle<()>>,
}

/// BlueZ-backed peripheral
pub struct BleAdapter {
    session: Session,
    adapter: Adapter,
    events: mpsc::UnboundedSender<RadioEvent>,
    device_name: RwLock<String>,
    registration: Mutex<Registration>,
    advertisement: Mutex<Option<AdvertisementHandle>>,
    notifier: NotifierSlot,
    confirmation: ConfirmationSlot,
}

impl BleAdapter {
    /// Open the default adapter; peer activity is sent to `events`
    pub async fn new(events: mpsc::UnboundedSender<RadioEvent>) -> LinkResult<Self> {
        let session = Session::new().await?;
        let adapter = session.default_adapter().await?;

        info!("Using BLE adapter: {}", adapter.name());
        adapter.set_powered(true).await?;

        Ok(Self {
            session,
            adapter,
            events,
            device_name: RwLock::new(String::new()),
            registration: Mutex::new(Registration::default()),
            advertisement: Mutex::new(None),
            notifier: NotifierSlot::default(),
            confirmation: ConfirmationSlot::default(),
        })
    }

    fn device(&self, peer: &PeerId) -> LinkResult<bluer::Device> {
        let address: Address = peer
            .as_str()
            .parse()
            .map_err(|_| LinkError::PeerNotConnected(peer.to_string()))?;
        Ok(self.adapter.device(address)?)
    }
}

/// Translate device connection changes into radio events
async fn watch_devices(adapter: Adapter, events: mpsc::UnboundedSender<RadioEvent>) {
    let mut adapter_events = match adapter.events().await {
        Ok(stream) => stream,
        Err(e) => {
            warn!("Cannot watch adapter events: {}", e);
            return;
        }
    };

    let mut watched = HashSet::new();
    let known = adapter.device_addresses().await.unwrap_or_default();
    for address in known {
        if watched.insert(address) {
            tokio::spawn(watch_device(adapter.clone(), address, events.clone()));
        }
    }

    info!("BLE event loop started");

    while let Some(event) = adapter_events.next().await {
        match event {
            AdapterEvent::DeviceAdded(address) => {
                if watched.insert(address) {
                    debug!("Device added: {}", address);
                    tokio::spawn(watch_device(adapter.clone(), address, events.clone()));
                }
            }
            AdapterEvent::DeviceRemoved(address) => {
                debug!("Device removed: {}", address);
                watched.remove(&address);
            }
            AdapterEvent::PropertyChanged(_) => {}
        }
        if events.is_closed() {
            break;
        }
    }

    warn!("BLE event loop ended");
}

/// Forward connection and pairing property changes of one device
///
/// Only `Connected` and `Paired` changes are observable here; a failed
/// connection attempt leaves no trace on the device object.
async fn watch_device(
    adapter: Adapter,
    address: Address,
    events: mpsc::UnboundedSender<RadioEvent>,
) {
    let peer = PeerId::new(address.to_string());
    let device = match adapter.device(address) {
        Ok(device) => device,
        Err(e) => {
            warn!("Cannot watch device {}: {}", address, e);
            return;
        }
    };

    if device.is_connected().await.unwrap_or(false) {
        let _ = events.send(RadioEvent::PeerConnected(peer.clone()));
    }

    let Ok(mut device_events) = device.events().await else {
        return;
    };

    while let Some(event) = device_events.next().await {
        let event = match event {
            DeviceEvent::PropertyChanged(DeviceProperty::Connected(true)) => {
                RadioEvent::PeerConnected(peer.clone())
            }
            DeviceEvent::PropertyChanged(DeviceProperty::Connected(false)) => {
                RadioEvent::PeerDisconnected(peer.clone())
            }
            DeviceEvent::PropertyChanged(DeviceProperty::Paired(true)) => {
                RadioEvent::Pairing(PairingEvent::Complete)
            }
            _ => continue,
        };
        if events.send(event).is_err() {
            break;
        }
    }
}

impl PeripheralLink for BleAdapter {
    async fn register(&self, config: &ProvisioningConfig) -> LinkResult<()> {
        info!("Registering provisioning service as '{}'", config.device_name);

        self.adapter.set_alias(config.device_name.clone()).await?;
        self.adapter.set_pairable(true).await?;
        *self.device_name.write().await = config.device_name.clone();

        let gatt = GattServer::new(self.events.clone(), self.notifier.clone(), config.security);
        let application = self
            .adapter
            .serve_gatt_application(gatt.build_application())
            .await?;

        let agent = build_agent(
            config.io_capability,
            self.events.clone(),
            self.confirmation.clone(),
        );
        let agent = self.session.register_agent(agent).await?;

        let mut registration = self.registration.lock().await;
        if let Some(watcher) = registration.watcher.take() {
            watcher.abort();
        }
        registration.application = Some(application);
        registration.agent = Some(agent);
        registration.watcher = Some(tokio::spawn(watch_devices(
            self.adapter.clone(),
            self.events.clone(),
        )));

        info!("GATT application registered");
        Ok(())
    }

    async fn start_advertising(&self) -> LinkResult<()> {
        let mut advertisement = self.advertisement.lock().await;
        if advertisement.is_some() {
            return Ok(());
        }

        let local_name = self.device_name.read().await.clone();
        let handle = self
            .adapter
            .advertise(Advertisement {
                advertisement_type: AdvertisementType::Peripheral,
                service_uuids: [PROVISIONING_SERVICE_UUID].into_iter().collect(),
                discoverable: Some(true),
                local_name: Some(local_name),
                ..Default::default()
            })
            .await?;

        *advertisement = Some(handle);
        debug!("Advertising started");
        Ok(())
    }

    async fn stop_advertising(&self) -> LinkResult<()> {
        // Dropping the handle unregisters the advertisement
        if self.advertisement.lock().await.take().is_some() {
            debug!("Advertising stopped");
        }
        Ok(())
    }

    async fn disconnect(&self, peer: &PeerId) -> LinkResult<()> {
        debug!("Disconnecting peer {}", peer);
        self.device(peer)?.disconnect().await?;
        Ok(())
    }

    async fn notify(&self, attribute: AttributeId, value: Vec<u8>) -> LinkResult<()> {
        if attribute != AttributeId::PairingStatus {
            return Ok(());
        }

        let mut slot = self.notifier.lock().await;
        let Some(notifier) = slot.as_mut() else {
            return Ok(());
        };
        if notifier.is_stopped() {
            *slot = None;
            return Ok(());
        }

        notifier
            .notify(value)
            .await
            .map_err(|e| LinkError::Ble(e.to_string()))
    }

    async fn is_secured(&self, peer: &PeerId) -> bool {
        let Ok(device) = self.device(peer) else {
            return false;
        };
        device.is_connected().await.unwrap_or(false) && device.is_paired().await.unwrap_or(false)
    }

    async fn confirm_pairing(&self, accept: bool) -> LinkResult<()> {
        match self.confirmation.lock().await.take() {
            Some(answer) => answer.send(accept).map_err(|_| LinkError::ChannelClosed),
            None => {
                warn!("No numeric comparison pending");
                Ok(())
            }
        }
    }
}
