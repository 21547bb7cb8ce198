//! Mock radio peripheral for testing

use std::sync::Arc;
use tokio::sync::Mutex;

use crate::{
    core::{
        error::{LinkError, LinkResult},
        types::{PeerId, ProvisioningConfig},
    },
    protocol::AttributeId,
    transport::ble::PeripheralLink,
};

/// Internal state for the mock peripheral
#[derive(Debug, Clone, Default)]
struct MockState {
    should_fail_register: bool,
    registered_name: Option<String>,
    advertising: bool,
    stop_advertising_calls: usize,
    disconnects: Vec<PeerId>,
    notifications: Vec<(AttributeId, Vec<u8>)>,
    secured: bool,
    confirmations: Vec<bool>,
}

/// Mock peripheral recording every request made by the orchestrator
#[derive(Debug, Clone, Default)]
pub struct MockPeripheral {
    inner: Arc<Mutex<MockState>>,
}

impl MockPeripheral {
    pub fn new() -> Self {
        Self::default()
    }

    /// Configure mock to fail service registration
    pub async fn set_register_failure(&self, should_fail: bool) {
        self.inner.lock().await.should_fail_register = should_fail;
    }

    /// Configure the answer of `is_secured`
    pub async fn set_secured(&self, secured: bool) {
        self.inner.lock().await.secured = secured;
    }

    pub async fn registered_name(&self) -> Option<String> {
        self.inner.lock().await.registered_name.clone()
    }

    pub async fn is_advertising(&self) -> bool {
        self.inner.lock().await.advertising
    }

    pub async fn stop_advertising_calls(&self) -> usize {
        self.inner.lock().await.stop_advertising_calls
    }

    pub async fn disconnects(&self) -> Vec<PeerId> {
        self.inner.lock().await.disconnects.clone()
    }

    /// Values pushed so far, oldest first
    pub async fn notifications(&self) -> Vec<(AttributeId, Vec<u8>)> {
        self.inner.lock().await.notifications.clone()
    }

    pub async fn confirmations(&self) -> Vec<bool> {
        self.inner.lock().await.confirmations.clone()
    }
}

impl PeripheralLink for MockPeripheral {
    async fn register(&self, config: &ProvisioningConfig) -> LinkResult<()> {
        let mut state = self.inner.lock().await;
        if state.should_fail_register {
            return Err(LinkError::Ble("Mock register failure".into()));
        }
        state.registered_name = Some(config.device_name.clone());
        Ok(())
    }

    async fn start_advertising(&self) -> LinkResult<()> {
        self.inner.lock().await.advertising = true;
        Ok(())
    }

    async fn stop_advertising(&self) -> LinkResult<()> {
        let mut state = self.inner.lock().await;
        state.advertising = false;
        state.stop_advertising_calls += 1;
        Ok(())
    }

    async fn disconnect(&self, peer: &PeerId) -> LinkResult<()> {
        self.inner.lock().await.disconnects.push(peer.clone());
        Ok(())
    }

    async fn notify(&self, attribute: AttributeId, value: Vec<u8>) -> LinkResult<()> {
        self.inner
            .lock()
            .await
            .notifications
            .push((attribute, value));
        Ok(())
    }

    async fn is_secured(&self, _peer: &PeerId) -> bool {
        self.inner.lock().await.secured
    }

    async fn confirm_pairing(&self, accept: bool) -> LinkResult<()> {
        self.inner.lock().await.confirmations.push(accept);
        Ok(())
    }
}
