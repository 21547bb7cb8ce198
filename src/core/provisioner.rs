//! Provisioning orchestrator
//!
//! Owns the provisioning state machine and sequences the three event
//! sources (radio link, attribute traffic, station status) through a single
//! cooperative `tick`. Every collaborator request issued from here returns
//! promptly; outcomes are observed on later ticks.

use std::{collections::VecDeque, sync::Arc};
use tokio::{sync::mpsc, time::Instant};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    backend::StationInterface,
    core::{
        connector::{ConnectionManager, Outcome},
        error::{ServiceError, ServiceResult},
        store::CredentialStore,
        types::{
            LinkStatus, NetworkCredential, PairingEvent, PeerId, ProvisioningConfig,
            ProvisioningState,
        },
    },
    protocol::{
        AttributeHandler, AttributeId, Command, ReadOutcome, SubscriptionChange, WriteOutcome,
        pairing_value,
    },
    storage::BlobStore,
    transport::ble::{PeripheralLink, RadioEvent},
};

pub type StatusCallback = Box<dyn FnMut(ProvisioningState) + Send>;
pub type LinkStateCallback = Box<dyn FnMut(bool) + Send>;
pub type NetworkStatusCallback = Box<dyn FnMut(LinkStatus) + Send>;
pub type PasskeyCallback = Box<dyn FnMut(u32) + Send>;

/// Work for the pairing status attribute, delivered in order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum QueuedPush {
    Value(u8),
    /// Drop the subscription of a peer that went away
    EndSubscription,
}

#[derive(Default)]
struct Callbacks {
    status: Option<StatusCallback>,
    link_state: Option<LinkStateCallback>,
    network_status: Option<NetworkStatusCallback>,
    passkey_display: Option<PasskeyCallback>,
    numeric_comparison: Option<PasskeyCallback>,
}

pub struct Provisioner<P, W, S>
where
    P: PeripheralLink,
    W: StationInterface,
    S: BlobStore,
{
    config: ProvisioningConfig,
    peripheral: Arc<P>,
    store: CredentialStore<S>,
    connector: ConnectionManager<W>,
    attributes: AttributeHandler,
    events: mpsc::UnboundedReceiver<RadioEvent>,
    state: ProvisioningState,
    peer: Option<PeerId>,
    /// Last sample handed to the network status callback
    reported_status: LinkStatus,
    /// Last sample used for unsolicited drop detection
    observed_status: LinkStatus,
    pending_notifications: VecDeque<QueuedPush>,
    pending_link_changes: VecDeque<bool>,
    callbacks: Callbacks,
    last_failure: Option<ServiceError>,
}

impl<P, W, S> Provisioner<P, W, S>
where
    P: PeripheralLink,
    W: StationInterface,
    S: BlobStore,
{
    pub fn new(
        config: ProvisioningConfig,
        peripheral: Arc<P>,
        station: Arc<W>,
        blob: S,
        events: mpsc::UnboundedReceiver<RadioEvent>,
    ) -> Self {
        Self {
            store: CredentialStore::new(blob, config.capacity),
            connector: ConnectionManager::new(station, config.connect_timeout),
            config,
            peripheral,
            attributes: AttributeHandler::new(),
            events,
            state: ProvisioningState::Idle,
            peer: None,
            reported_status: LinkStatus::Unavailable,
            observed_status: LinkStatus::Unavailable,
            pending_notifications: VecDeque::new(),
            pending_link_changes: VecDeque::new(),
            callbacks: Callbacks::default(),
            last_failure: None,
        }
    }

    /// Load stored networks, publish the service and start advertising
    ///
    /// A corrupt credential artifact is logged and the store starts empty;
    /// an unreachable store or a failed registration is an error.
    pub async fn initialize(&mut self) -> ServiceResult<()> {
        match self.store.load().await {
            Ok(networks) => debug!("{} network(s) available", networks.len()),
            Err(ServiceError::StorageCorrupt(reason)) => {
                warn!("Discarding corrupt credential store: {}", reason)
            }
            Err(e) => return Err(e),
        }

        self.peripheral.register(&self.config).await?;
        self.update_pairing_status(false);
        self.peripheral.start_advertising().await?;

        info!(
            device_name = %self.config.device_name,
            security = ?self.config.security,
            io_capability = ?self.config.io_capability,
            "Provisioning service initialized"
        );
        Ok(())
    }

    /// Run one cooperative step
    pub async fn tick(&mut self) {
        while let Ok(event) = self.events.try_recv() {
            self.handle_event(event).await;
        }

        self.deliver_notifications().await;
        self.poll_station().await;

        while let Some(linked) = self.pending_link_changes.pop_front() {
            if let Some(callback) = self.callbacks.link_state.as_mut() {
                callback(linked);
            }
        }
    }

    pub async fn handle_event(&mut self, event: RadioEvent) {
        match event {
            RadioEvent::PeerConnected(peer) => self.on_peer_connected(peer),
            RadioEvent::PeerConnectFailed => {
                warn!("Peer connection failed");
                self.peer = None;
                self.pending_link_changes.push_back(false);
            }
            RadioEvent::PeerDisconnected(peer) => self.on_peer_disconnected(peer),
            RadioEvent::AttributeWrite { attribute, data } => {
                self.write_attribute(&attribute, &data).await;
            }
            RadioEvent::AttributeRead { attribute, reply } => {
                let outcome = self.read_attribute(&attribute).await;
                if reply.send(outcome).is_err() {
                    debug!("Read requester went away");
                }
            }
            RadioEvent::DescriptorWrite { attribute, data } => {
                if self.attributes.write_descriptor(&attribute, &data)
                    == Some(SubscriptionChange::Enabled)
                {
                    let paired = self.is_paired().await;
                    self.update_pairing_status(paired);
                }
            }
            RadioEvent::Pairing(PairingEvent::Started) => debug!("Pairing started"),
            RadioEvent::Pairing(PairingEvent::Complete) => {
                info!("Pairing complete");
                self.update_pairing_status(true);
            }
            RadioEvent::Pairing(PairingEvent::Failed) => {
                warn!("Pairing failed");
                self.update_pairing_status(false);
            }
            RadioEvent::PasskeyDisplay(passkey) => {
                debug!("Passkey display requested");
                if let Some(callback) = self.callbacks.passkey_display.as_mut() {
                    callback(passkey);
                }
            }
            RadioEvent::NumericComparison(passkey) => {
                debug!("Numeric comparison requested");
                if let Some(callback) = self.callbacks.numeric_comparison.as_mut() {
                    callback(passkey);
                }
            }
        }
    }

    fn on_peer_connected(&mut self, peer: PeerId) {
        info!(%peer, "Peer linked");
        self.peer = Some(peer);
        self.pending_link_changes.push_back(true);

        match self.state {
            ProvisioningState::Idle => self.set_state(ProvisioningState::Started),
            ProvisioningState::Connected if !self.config.allow_provisioning_when_connected => {
                info!("Peer linked while connected; provisioning while connected is disabled");
            }
            _ => {}
        }
    }

    fn on_peer_disconnected(&mut self, peer: PeerId) {
        info!(%peer, "Peer link lost");
        self.peer = None;
        self.update_pairing_status(false);
        self.pending_notifications.push_back(QueuedPush::EndSubscription);
        self.pending_link_changes.push_back(false);

        if self.state == ProvisioningState::Started {
            self.set_state(ProvisioningState::Idle);
        }
    }

    /// Apply an attribute write as if it came from the radio
    pub async fn write_attribute(&mut self, attribute: &Uuid, data: &[u8]) -> WriteOutcome {
        let outcome = self.attributes.write(attribute, data);
        match outcome {
            WriteOutcome::Command(command) => self.dispatch(command).await,
            WriteOutcome::NotPermitted => warn!(%attribute, "Write to read-only attribute"),
            WriteOutcome::NotHandled => debug!(%attribute, "Write to foreign attribute"),
            WriteOutcome::Staged | WriteOutcome::Ignored => {}
        }
        outcome
    }

    /// Answer an attribute read as if it came from the radio
    pub async fn read_attribute(&self, attribute: &Uuid) -> ReadOutcome {
        let paired = if AttributeId::from_uuid(attribute) == Some(AttributeId::PairingStatus) {
            self.is_paired().await
        } else {
            false
        };
        self.attributes.read(attribute, paired)
    }

    async fn dispatch(&mut self, command: Command) {
        match command {
            Command::SaveNetwork => match self.attributes.take_pending() {
                Some(pending) => {
                    if let Err(e) = self.store.save(&pending.name, &pending.passphrase).await {
                        warn!("Save command failed: {}", e);
                    }
                }
                None => debug!("Save command without staged network"),
            },
            Command::Connect => match self.attributes.take_pending() {
                Some(pending) => {
                    if let Err(e) = self.connect(&pending.name, &pending.passphrase).await {
                        warn!("Connect command failed: {}", e);
                    }
                }
                None => {
                    if !self.connect_to_stored().await {
                        debug!("Connect command without staged network left state unchanged");
                    }
                }
            },
            Command::ClearNetworks => {
                self.clear().await;
            }
            Command::Disconnect => {
                if let Err(e) = self.connector.station().disconnect().await {
                    warn!("Station disconnect failed: {}", e);
                }
                self.connector.cancel();
                self.set_state(ProvisioningState::Idle);
            }
            Command::GetStatus | Command::StartScan | Command::GetScanResults => {
                debug!(?command, "Command accepted without action");
            }
        }
    }

    async fn deliver_notifications(&mut self) {
        while let Some(push) = self.pending_notifications.pop_front() {
            let value = match push {
                QueuedPush::Value(value) => value,
                QueuedPush::EndSubscription => {
                    self.attributes.reset_subscription();
                    continue;
                }
            };
            if !self.attributes.is_subscribed() {
                continue;
            }
            if let Err(e) = self
                .peripheral
                .notify(AttributeId::PairingStatus, vec![value])
                .await
            {
                warn!("Pairing status notification failed: {}", e);
            }
        }
    }

    async fn poll_station(&mut self) {
        let status = match self.connector.station().status().await {
            Ok(status) => status,
            Err(e) => {
                debug!("Station status unavailable: {}", e);
                LinkStatus::Unavailable
            }
        };

        if status != self.reported_status {
            self.reported_status = status;
            if let Some(callback) = self.callbacks.network_status.as_mut() {
                callback(status);
            }
        }

        match self.connector.poll(status, Instant::now()).await {
            Some(Outcome::Connected) => self.set_state(ProvisioningState::Connected),
            Some(Outcome::Failed(reason)) => {
                self.last_failure = Some(ServiceError::JoinFailed(reason));
                self.set_state(ProvisioningState::Failed);
            }
            Some(Outcome::TimedOut) => {
                self.last_failure = Some(ServiceError::Timeout);
                self.set_state(ProvisioningState::Failed);
            }
            Some(Outcome::Pending) | None => {}
        }

        if status != self.observed_status {
            self.observed_status = status;
            if status.is_drop()
                && matches!(
                    self.state,
                    ProvisioningState::Connected | ProvisioningState::Complete
                )
            {
                info!(?status, "Network link dropped");
                self.last_failure = Some(ServiceError::LinkLost);
                self.set_state(ProvisioningState::Idle);
            }
        }
    }

    fn set_state(&mut self, state: ProvisioningState) {
        if state == self.state {
            return;
        }
        info!(from = ?self.state, to = ?state, "Provisioning state changed");
        self.state = state;
        if let Some(callback) = self.callbacks.status.as_mut() {
            callback(state);
        }
    }

    async fn is_paired(&self) -> bool {
        match &self.peer {
            Some(peer) => self.peripheral.is_secured(peer).await,
            None => false,
        }
    }

    /// Persist a network without connecting to it
    pub async fn save(&mut self, name: &str, passphrase: &str) -> ServiceResult<()> {
        self.store.save(name, passphrase).await
    }

    /// Start joining a network
    ///
    /// Stops advertising and drops the radio peer so the radio does not
    /// contend with the join. Completion is reported through the status
    /// callback on a later tick.
    pub async fn connect(&mut self, name: &str, passphrase: &str) -> ServiceResult<()> {
        if name.is_empty() {
            return Err(ServiceError::InvalidArgument("network name is empty"));
        }
        if self.connector.is_pending() {
            return Err(ServiceError::Busy);
        }

        self.set_state(ProvisioningState::Connecting);

        if let Err(e) = self.peripheral.stop_advertising().await {
            warn!("Failed to stop advertising: {}", e);
        }
        if let Some(peer) = &self.peer
            && let Err(e) = self.peripheral.disconnect(peer).await
        {
            warn!(%peer, "Failed to disconnect peer: {}", e);
        }

        if let Err(e) = self.connector.begin(name, passphrase).await {
            warn!(network = %name, "Join request rejected: {}", e);
            if let ServiceError::Station(cause) = &e {
                self.last_failure = Some(ServiceError::Station(cause.clone()));
            }
            self.set_state(ProvisioningState::Failed);
            return Err(e);
        }
        Ok(())
    }

    /// Connect to the first enabled stored network
    ///
    /// Returns `false` without side effects while a join is in progress or
    /// already established, or when no enabled network is stored.
    pub async fn connect_to_stored(&mut self) -> bool {
        if matches!(
            self.state,
            ProvisioningState::Connecting | ProvisioningState::Connected
        ) {
            return false;
        }
        let Some(network) = self.store.first_enabled().cloned() else {
            debug!("No stored network to connect to");
            return false;
        };
        self.connect(&network.name, &network.passphrase)
            .await
            .is_ok()
    }

    /// Forget every stored network; the current connection is untouched
    pub async fn clear(&mut self) -> bool {
        match self.store.clear().await {
            Ok(()) => true,
            Err(e) => {
                warn!("Failed to clear stored networks: {}", e);
                false
            }
        }
    }

    /// Confirm that the freshly joined network works
    pub fn mark_complete(&mut self) -> bool {
        if self.state != ProvisioningState::Connected {
            return false;
        }
        self.set_state(ProvisioningState::Complete);
        true
    }

    /// Queue a pairing status push for subscribed peers
    pub fn update_pairing_status(&mut self, paired: bool) {
        self.pending_notifications.push_back(QueuedPush::Value(pairing_value(paired)));
    }

    /// Answer the numeric comparison shown through the registered callback
    pub async fn accept_numeric_comparison(&self, accept: bool) -> ServiceResult<()> {
        info!(accept, "Numeric comparison answered");
        self.peripheral.confirm_pairing(accept).await?;
        Ok(())
    }

    pub fn allow_provisioning_when_connected(&mut self, allow: bool) {
        self.config.allow_provisioning_when_connected = allow;
    }

    pub async fn rssi(&self) -> ServiceResult<i32> {
        Ok(self.connector.station().rssi().await?)
    }

    pub fn network_count(&self) -> usize {
        self.store.count()
    }

    pub fn networks(&self) -> impl Iterator<Item = &NetworkCredential> {
        self.store.iter()
    }

    pub fn state(&self) -> ProvisioningState {
        self.state
    }

    pub fn peer(&self) -> Option<&PeerId> {
        self.peer.as_ref()
    }

    /// Why the last attempt failed or the last connection was lost
    pub fn last_failure(&self) -> Option<&ServiceError> {
        self.last_failure.as_ref()
    }

    pub fn on_status_change(&mut self, callback: impl FnMut(ProvisioningState) + Send + 'static) {
        self.callbacks.status = Some(Box::new(callback));
    }

    pub fn on_link_state(&mut self, callback: impl FnMut(bool) + Send + 'static) {
        self.callbacks.link_state = Some(Box::new(callback));
    }

    pub fn on_network_status(&mut self, callback: impl FnMut(LinkStatus) + Send + 'static) {
        self.callbacks.network_status = Some(Box::new(callback));
    }

    pub fn on_passkey_display(&mut self, callback: impl FnMut(u32) + Send + 'static) {
        self.callbacks.passkey_display = Some(Box::new(callback));
    }

    pub fn on_numeric_comparison(&mut self, callback: impl FnMut(u32) + Send + 'static) {
        self.callbacks.numeric_comparison = Some(Box::new(callback));
    }
}
