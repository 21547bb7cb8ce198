//! Radio peripheral trait definition and event types

use tokio::sync::oneshot;
use trait_variant::make;
use uuid::Uuid;

use crate::{
    core::{
        error::LinkResult,
        types::{PairingEvent, PeerId, ProvisioningConfig},
    },
    protocol::{AttributeId, ReadOutcome},
};

/// Event raised by the radio stack, consumed once per tick
#[derive(Debug)]
pub enum RadioEvent {
    PeerConnected(PeerId),
    /// The radio reported a failed connection attempt
    ///
    /// BlueZ exposes no property for failed inbound connections, so
    /// `BleAdapter` never raises this; links that see connection errors
    /// (and the test fakes) do.
    PeerConnectFailed,
    PeerDisconnected(PeerId),
    AttributeWrite {
        attribute: Uuid,
        data: Vec<u8>,
    },
    /// Read request; the value is sent back through `reply`
    AttributeRead {
        attribute: Uuid,
        reply: oneshot::Sender<ReadOutcome>,
    },
    /// Client configuration descriptor write for `attribute`
    DescriptorWrite {
        attribute: Uuid,
        data: Vec<u8>,
    },
    Pairing(PairingEvent),
    PasskeyDisplay(u32),
    NumericComparison(u32),
}

/// Abstraction over the BLE peripheral stack
///
/// Implementations deliver everything the peer does as `RadioEvent`s on the
/// channel handed to them at construction; this trait covers the requests
/// flowing the other way.
#[make(Send)]
pub trait PeripheralLink: Sync + 'static {
    /// Publish the provisioning service with the configured name and security
    async fn register(&self, config: &ProvisioningConfig) -> LinkResult<()>;

    async fn start_advertising(&self) -> LinkResult<()>;

    async fn stop_advertising(&self) -> LinkResult<()>;

    async fn disconnect(&self, peer: &PeerId) -> LinkResult<()>;

    /// Push a value to subscribed peers
    async fn notify(&self, attribute: AttributeId, value: Vec<u8>) -> LinkResult<()>;

    /// Whether the link to `peer` is currently paired and encrypted
    async fn is_secured(&self, peer: &PeerId) -> bool;

    /// Answer the pending numeric comparison
    async fn confirm_pairing(&self, accept: bool) -> LinkResult<()>;
}
