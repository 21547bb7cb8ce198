//! Single in-flight network join attempt with a deadline

use std::{sync::Arc, time::Duration};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::{
    backend::StationInterface,
    core::{
        error::{ServiceError, ServiceResult},
        types::LinkStatus,
    },
};

/// Resolution of an outstanding attempt as seen by one poll
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Pending,
    Connected,
    Failed(LinkStatus),
    TimedOut,
}

#[derive(Debug)]
struct Attempt {
    network: String,
    deadline: Instant,
}

/// Issues join requests to the station interface and tracks their deadline
pub struct ConnectionManager<W: StationInterface> {
    station: Arc<W>,
    timeout: Duration,
    attempt: Option<Attempt>,
}

impl<W: StationInterface> ConnectionManager<W> {
    pub fn new(station: Arc<W>, timeout: Duration) -> Self {
        Self {
            station,
            timeout,
            attempt: None,
        }
    }

    /// Start joining `name`; returns as soon as the request is issued
    pub async fn begin(&mut self, name: &str, passphrase: &str) -> ServiceResult<()> {
        if name.is_empty() {
            return Err(ServiceError::InvalidArgument("network name is empty"));
        }
        if self.attempt.is_some() {
            return Err(ServiceError::Busy);
        }

        match self.station.status().await {
            Ok(status) if status.is_settled() => {}
            Ok(status) => {
                debug!(?status, "Leaving current network before join");
                if let Err(e) = self.station.disconnect().await {
                    warn!("Disconnect before join failed: {}", e);
                }
            }
            Err(e) => warn!("Station status unavailable before join: {}", e),
        }

        self.station.begin(name, passphrase).await?;

        info!(network = %name, timeout = ?self.timeout, "Join attempt started");
        self.attempt = Some(Attempt {
            network: name.to_string(),
            deadline: Instant::now() + self.timeout,
        });
        Ok(())
    }

    /// Check the outstanding attempt against the latest station sample
    ///
    /// Returns `None` if no attempt is outstanding. Any outcome other than
    /// `Pending` ends the attempt; a timeout also aborts it on the station.
    pub async fn poll(&mut self, status: LinkStatus, now: Instant) -> Option<Outcome> {
        let attempt = self.attempt.as_ref()?;

        let outcome = if status == LinkStatus::Connected {
            Outcome::Connected
        } else if status.is_failure() {
            Outcome::Failed(status)
        } else if now >= attempt.deadline {
            Outcome::TimedOut
        } else {
            return Some(Outcome::Pending);
        };

        match outcome {
            Outcome::Connected => info!(network = %attempt.network, "Joined network"),
            Outcome::TimedOut => {
                warn!(network = %attempt.network, "Join attempt timed out");
                if let Err(e) = self.station.disconnect().await {
                    warn!("Failed to abort stalled join: {}", e);
                }
            }
            _ => warn!(network = %attempt.network, ?status, "Join attempt failed"),
        }

        self.attempt = None;
        Some(outcome)
    }

    /// Forget the outstanding attempt without touching the station
    pub fn cancel(&mut self) {
        if let Some(attempt) = self.attempt.take() {
            debug!(network = %attempt.network, "Join attempt cancelled");
        }
    }

    pub fn is_pending(&self) -> bool {
        self.attempt.is_some()
    }

    pub fn station(&self) -> &Arc<W> {
        &self.station
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MockWifiBackend;
    use pretty_assertions::assert_eq;
    use tokio_test::assert_ok;

    fn manager(backend: &Arc<MockWifiBackend>) -> ConnectionManager<MockWifiBackend> {
        ConnectionManager::new(backend.clone(), Duration::from_secs(15))
    }

    #[tokio::test]
    async fn test_begin_issues_join_request() {
        let backend = Arc::new(MockWifiBackend::new());
        let mut connector = manager(&backend);

        assert_ok!(connector.begin("Home", "secret123").await);

        assert!(connector.is_pending());
        assert_eq!(
            backend.begin_calls().await,
            vec![("Home".to_string(), "secret123".to_string())]
        );
        assert_eq!(backend.disconnect_calls().await, 0);
    }

    #[tokio::test]
    async fn test_begin_rejects_empty_name() {
        let backend = Arc::new(MockWifiBackend::new());
        let mut connector = manager(&backend);

        let result = connector.begin("", "pw").await;
        assert!(matches!(result, Err(ServiceError::InvalidArgument(_))));
        assert!(!connector.is_pending());
        assert!(backend.begin_calls().await.is_empty());
    }

    #[tokio::test]
    async fn test_begin_rejects_second_attempt() {
        let backend = Arc::new(MockWifiBackend::new());
        let mut connector = manager(&backend);
        assert_ok!(connector.begin("Home", "secret123").await);

        let result = connector.begin("Office", "work").await;
        assert!(matches!(result, Err(ServiceError::Busy)));
        assert_eq!(backend.begin_calls().await.len(), 1);
    }

    #[tokio::test]
    async fn test_begin_disconnects_active_association() {
        let backend = Arc::new(MockWifiBackend::new());
        backend.set_status(LinkStatus::Connected).await;
        let mut connector = manager(&backend);

        assert_ok!(connector.begin("Home", "secret123").await);
        assert_eq!(backend.disconnect_calls().await, 1);
    }

    #[tokio::test]
    async fn test_begin_station_rejection_leaves_no_attempt() {
        let backend = Arc::new(MockWifiBackend::new());
        backend.set_begin_failure(true).await;
        let mut connector = manager(&backend);

        let result = connector.begin("Home", "secret123").await;
        assert!(matches!(result, Err(ServiceError::Station(_))));
        assert!(!connector.is_pending());
    }

    #[tokio::test]
    async fn test_poll_without_attempt() {
        let backend = Arc::new(MockWifiBackend::new());
        let mut connector = manager(&backend);

        assert_eq!(
            connector.poll(LinkStatus::Connected, Instant::now()).await,
            None
        );
    }

    #[tokio::test]
    async fn test_poll_outcomes() {
        let backend = Arc::new(MockWifiBackend::new());
        let mut connector = manager(&backend);

        assert_ok!(connector.begin("Home", "secret123").await);
        let now = Instant::now();
        assert_eq!(
            connector.poll(LinkStatus::Connecting, now).await,
            Some(Outcome::Pending)
        );
        assert_eq!(
            connector.poll(LinkStatus::Connected, now).await,
            Some(Outcome::Connected)
        );
        assert!(!connector.is_pending());

        assert_ok!(connector.begin("Home", "wrong").await);
        assert_eq!(
            connector.poll(LinkStatus::ConnectFailed, Instant::now()).await,
            Some(Outcome::Failed(LinkStatus::ConnectFailed))
        );

        assert_ok!(connector.begin("Nowhere", "").await);
        assert_eq!(
            connector
                .poll(LinkStatus::NoSsidAvailable, Instant::now())
                .await,
            Some(Outcome::Failed(LinkStatus::NoSsidAvailable))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_times_out_at_deadline() {
        let backend = Arc::new(MockWifiBackend::new());
        let mut connector = manager(&backend);
        assert_ok!(connector.begin("Home", "secret123").await);

        tokio::time::advance(Duration::from_secs(14)).await;
        assert_eq!(
            connector.poll(LinkStatus::Connecting, Instant::now()).await,
            Some(Outcome::Pending)
        );

        tokio::time::advance(Duration::from_secs(1)).await;
        assert_eq!(
            connector.poll(LinkStatus::Connecting, Instant::now()).await,
            Some(Outcome::TimedOut)
        );
        assert_eq!(backend.disconnect_calls().await, 1);
        assert!(!connector.is_pending());

        // Resolved attempts do not fire again
        assert_eq!(
            connector.poll(LinkStatus::Connecting, Instant::now()).await,
            None
        );
        assert_eq!(backend.disconnect_calls().await, 1);
    }

    #[tokio::test]
    async fn test_cancel_allows_new_attempt() {
        let backend = Arc::new(MockWifiBackend::new());
        let mut connector = manager(&backend);
        assert_ok!(connector.begin("Home", "secret123").await);

        connector.cancel();
        assert!(!connector.is_pending());
        assert_ok!(connector.begin("Office", "work").await);
    }
}
