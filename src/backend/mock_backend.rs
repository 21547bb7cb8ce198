//! Mock station interface for testing

use std::sync::Arc;
use tokio::sync::Mutex;

use crate::backend::StationInterface;
use crate::core::error::{StationError, StationResult};
use crate::core::types::LinkStatus;

/// Internal state for the mock backend
#[derive(Debug, Clone)]
struct MockState {
    status: LinkStatus,
    should_fail_begin: bool,
    begin_calls: Vec<(String, String)>,
    disconnect_calls: usize,
    rssi: i32,
}

/// Mock station interface for testing
///
/// Join requests never resolve on their own; tests drive the outcome
/// through `set_status`.
#[derive(Debug, Clone)]
pub struct MockWifiBackend {
    inner: Arc<Mutex<MockState>>,
}

impl MockWifiBackend {
    /// Create a new mock backend reporting `Idle`
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(MockState {
                status: LinkStatus::Idle,
                should_fail_begin: false,
                begin_calls: vec![],
                disconnect_calls: 0,
                rssi: -60,
            })),
        }
    }

    /// Simulate the interface reporting a new status
    pub async fn set_status(&self, status: LinkStatus) {
        self.inner.lock().await.status = status;
    }

    /// Configure mock to reject join requests
    pub async fn set_begin_failure(&self, should_fail: bool) {
        self.inner.lock().await.should_fail_begin = should_fail;
    }

    pub async fn set_rssi(&self, rssi: i32) {
        self.inner.lock().await.rssi = rssi;
    }

    /// Join requests received so far as (name, passphrase)
    pub async fn begin_calls(&self) -> Vec<(String, String)> {
        self.inner.lock().await.begin_calls.clone()
    }

    pub async fn disconnect_calls(&self) -> usize {
        self.inner.lock().await.disconnect_calls
    }
}

impl Default for MockWifiBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl StationInterface for MockWifiBackend {
    async fn begin(&self, name: &str, passphrase: &str) -> StationResult<()> {
        let mut state = self.inner.lock().await;
        if state.should_fail_begin {
            return Err(StationError::JoinFailed("Mock join failure".into()));
        }
        state
            .begin_calls
            .push((name.to_string(), passphrase.to_string()));
        state.status = LinkStatus::Connecting;
        Ok(())
    }

    async fn disconnect(&self) -> StationResult<()> {
        let mut state = self.inner.lock().await;
        state.disconnect_calls += 1;
        state.status = LinkStatus::Disconnected;
        Ok(())
    }

    async fn status(&self) -> StationResult<LinkStatus> {
        Ok(self.inner.lock().await.status)
    }

    async fn rssi(&self) -> StationResult<i32> {
        let state = self.inner.lock().await;
        if state.status != LinkStatus::Connected {
            return Err(StationError::InterfaceUnavailable("not associated".into()));
        }
        Ok(state.rssi)
    }
}
