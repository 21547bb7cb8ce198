//! GATT application for the provisioning service

use bluer::gatt::local::{
    Application, Characteristic, CharacteristicNotifier, CharacteristicNotify,
    CharacteristicNotifyMethod, CharacteristicRead, CharacteristicWrite,
    CharacteristicWriteMethod, ReqError, Service,
};
use std::{sync::Arc, time::Duration};
use tokio::sync::{Mutex, mpsc, oneshot};
use tracing::{debug, warn};

use crate::{
    core::types::SecurityLevel,
    protocol::{
        AttributeId, CCCD_NOTIFY_DISABLED, CCCD_NOTIFY_ENABLED, PROVISIONING_SERVICE_UUID,
        ReadOutcome,
    },
    transport::ble::RadioEvent,
};

/// Interval at which an active subscription is checked for termination
const SUBSCRIPTION_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Notification sink of the subscribed peer, if any
pub type NotifierSlot = Arc<Mutex<Option<CharacteristicNotifier>>>;

/// Encryption flags applied to every readable or writable characteristic
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct AccessFlags {
    encrypt: bool,
    authenticated: bool,
}

impl From<SecurityLevel> for AccessFlags {
    fn from(level: SecurityLevel) -> Self {
        match level {
            SecurityLevel::Low => Self {
                encrypt: false,
                authenticated: false,
            },
            SecurityLevel::Medium => Self {
                encrypt: true,
                authenticated: false,
            },
            SecurityLevel::High => Self {
                encrypt: false,
                authenticated: true,
            },
        }
    }
}

/// Map the orchestrator's read answer onto a GATT response
fn read_response(
    outcome: Result<ReadOutcome, oneshot::error::RecvError>,
) -> Result<Vec<u8>, ReqError> {
    match outcome {
        Ok(ReadOutcome::Value(value)) => Ok(value),
        Ok(ReadOutcome::NotPermitted) => Err(ReqError::NotPermitted),
        Ok(ReadOutcome::NotHandled) => Err(ReqError::NotSupported),
        Err(_) => Err(ReqError::Failed),
    }
}

/// Builds the provisioning GATT application
///
/// Callbacks only forward requests as `RadioEvent`s; reads wait for the
/// orchestrator to answer during its next tick.
pub struct GattServer {
    events: mpsc::UnboundedSender<RadioEvent>,
    notifier: NotifierSlot,
    flags: AccessFlags,
}

impl GattServer {
    pub fn new(
        events: mpsc::UnboundedSender<RadioEvent>,
        notifier: NotifierSlot,
        security: SecurityLevel,
    ) -> Self {
        Self {
            events,
            notifier,
            flags: security.into(),
        }
    }

    pub fn build_application(&self) -> Application {
        Application {
            services: vec![Service {
                uuid: PROVISIONING_SERVICE_UUID,
                primary: true,
                characteristics: vec![
                    Characteristic {
                        uuid: AttributeId::NetworkName.uuid(),
                        read: Some(self.read(AttributeId::NetworkName)),
                        write: Some(self.write(AttributeId::NetworkName)),
                        ..Default::default()
                    },
                    Characteristic {
                        uuid: AttributeId::Passphrase.uuid(),
                        write: Some(self.write(AttributeId::Passphrase)),
                        ..Default::default()
                    },
                    Characteristic {
                        uuid: AttributeId::Command.uuid(),
                        write: Some(self.write(AttributeId::Command)),
                        ..Default::default()
                    },
                    Characteristic {
                        uuid: AttributeId::PairingStatus.uuid(),
                        read: Some(self.read(AttributeId::PairingStatus)),
                        notify: Some(self.notify()),
                        ..Default::default()
                    },
                ],
                ..Default::default()
            }],
            ..Default::default()
        }
    }

    fn read(&self, attribute: AttributeId) -> CharacteristicRead {
        let events = self.events.clone();
        CharacteristicRead {
            read: true,
            encrypt_read: self.flags.encrypt,
            encrypt_authenticated_read: self.flags.authenticated,
            fun: Box::new(move |_req| {
                let events = events.clone();
                Box::pin(async move {
                    let (reply, answer) = oneshot::channel();
                    events
                        .send(RadioEvent::AttributeRead {
                            attribute: attribute.uuid(),
                            reply,
                        })
                        .map_err(|_| ReqError::Failed)?;
                    read_response(answer.await)
                })
            }),
            ..Default::default()
        }
    }

    fn write(&self, attribute: AttributeId) -> CharacteristicWrite {
        let events = self.events.clone();
        CharacteristicWrite {
            write: true,
            write_without_response: false,
            encrypt_write: self.flags.encrypt,
            encrypt_authenticated_write: self.flags.authenticated,
            method: CharacteristicWriteMethod::Fun(Box::new(move |new_value, _req| {
                let events = events.clone();
                Box::pin(async move {
                    debug!(?attribute, "Write received ({} bytes)", new_value.len());
                    events
                        .send(RadioEvent::AttributeWrite {
                            attribute: attribute.uuid(),
                            data: new_value,
                        })
                        .map_err(|_| ReqError::Failed)
                })
            })),
            ..Default::default()
        }
    }

    fn notify(&self) -> CharacteristicNotify {
        let events = self.events.clone();
        let slot = self.notifier.clone();
        CharacteristicNotify {
            notify: true,
            method: CharacteristicNotifyMethod::Fun(Box::new(move |notifier| {
                let events = events.clone();
                let slot = slot.clone();
                Box::pin(async move { watch_subscription(events, slot, notifier).await })
            })),
            ..Default::default()
        }
    }
}

/// Forward a subscription as descriptor writes for its whole lifetime
async fn watch_subscription(
    events: mpsc::UnboundedSender<RadioEvent>,
    slot: NotifierSlot,
    notifier: CharacteristicNotifier,
) {
    let attribute = AttributeId::PairingStatus.uuid();
    *slot.lock().await = Some(notifier);

    if events
        .send(RadioEvent::DescriptorWrite {
            attribute,
            data: CCCD_NOTIFY_ENABLED.to_vec(),
        })
        .is_err()
    {
        warn!("Event channel closed, dropping subscription");
        return;
    }

    loop {
        tokio::time::sleep(SUBSCRIPTION_POLL_INTERVAL).await;
        let mut current = slot.lock().await;
        match current.as_ref() {
            Some(notifier) if !notifier.is_stopped() => continue,
            _ => {
                *current = None;
                break;
            }
        }
    }

    let _ = events.send(RadioEvent::DescriptorWrite {
        attribute,
        data: CCCD_NOTIFY_DISABLED.to_vec(),
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_access_flags_per_security_level() {
        assert_eq!(
            AccessFlags::from(SecurityLevel::Low),
            AccessFlags {
                encrypt: false,
                authenticated: false
            }
        );
        assert!(AccessFlags::from(SecurityLevel::Medium).encrypt);
        assert!(AccessFlags::from(SecurityLevel::High).authenticated);
    }

    #[test]
    fn test_read_response_mapping() {
        assert_eq!(
            read_response(Ok(ReadOutcome::Value(vec![1]))).unwrap(),
            vec![1]
        );
        assert!(matches!(
            read_response(Ok(ReadOutcome::NotPermitted)),
            Err(ReqError::NotPermitted)
        ));
        assert!(matches!(
            read_response(Ok(ReadOutcome::NotHandled)),
            Err(ReqError::NotSupported)
        ));
    }

    #[tokio::test]
    async fn test_read_response_dropped_reply() {
        let (reply, answer) = oneshot::channel::<ReadOutcome>();
        drop(reply);
        assert!(matches!(read_response(answer.await), Err(ReqError::Failed)));
    }

    #[test]
    fn test_application_layout() {
        let (events, _rx) = mpsc::unbounded_channel();
        let server = GattServer::new(events, NotifierSlot::default(), SecurityLevel::High);
        let app = server.build_application();

        assert_eq!(app.services.len(), 1);
        let service = &app.services[0];
        assert_eq!(service.uuid, PROVISIONING_SERVICE_UUID);
        assert_eq!(service.characteristics.len(), 4);

        let passphrase = &service.characteristics[1];
        assert!(passphrase.read.is_none());
        assert!(
            passphrase
                .write
                .as_ref()
                .is_some_and(|w| w.encrypt_authenticated_write)
        );

        let status = &service.characteristics[3];
        assert!(status.write.is_none());
        assert!(status.notify.is_some());
    }
}
