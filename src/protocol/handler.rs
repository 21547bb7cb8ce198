//! Attribute read/write decoding
//!
//! The handler turns raw attribute traffic into staged credentials,
//! commands and subscription changes. It holds no policy; the
//! orchestrator decides what a command does.

use tracing::{debug, warn};
use uuid::Uuid;

use crate::core::types::bounded_string;

use super::{
    attribute::{AttributeId, CCCD_NOTIFY_DISABLED, CCCD_NOTIFY_ENABLED},
    command::Command,
};

/// Result of an attribute write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// Value stored in the pending credential
    Staged,
    /// Command to be dispatched by the orchestrator
    Command(Command),
    /// Accepted and dropped (empty or unknown command)
    Ignored,
    NotPermitted,
    /// Attribute belongs to another service
    NotHandled,
}

/// Result of an attribute read
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadOutcome {
    /// Attribute value, possibly zero-length
    Value(Vec<u8>),
    NotPermitted,
    NotHandled,
}

/// Notification subscription change on the pairing status attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionChange {
    Enabled,
    Disabled,
}

/// Most recently written name and passphrase
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PendingCredential {
    pub name: String,
    pub passphrase: String,
}

#[derive(Debug, Default)]
pub struct AttributeHandler {
    pending: PendingCredential,
    subscribed: bool,
}

impl AttributeHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn write(&mut self, uuid: &Uuid, data: &[u8]) -> WriteOutcome {
        let Some(attribute) = AttributeId::from_uuid(uuid) else {
            return WriteOutcome::NotHandled;
        };

        match attribute {
            AttributeId::NetworkName => {
                self.pending.name = bounded_string(data, attribute.max_len());
                debug!(network = %self.pending.name, "Network name staged");
                WriteOutcome::Staged
            }
            AttributeId::Passphrase => {
                self.pending.passphrase = bounded_string(data, attribute.max_len());
                debug!("Passphrase staged ({} bytes)", self.pending.passphrase.len());
                WriteOutcome::Staged
            }
            AttributeId::Command => {
                let Some(&code) = data.first() else {
                    return WriteOutcome::Ignored;
                };
                match Command::try_from(code) {
                    Ok(command) => {
                        debug!(?command, "Command received");
                        WriteOutcome::Command(command)
                    }
                    Err(code) => {
                        warn!("Unknown command byte 0x{:02x}", code);
                        WriteOutcome::Ignored
                    }
                }
            }
            AttributeId::PairingStatus => WriteOutcome::NotPermitted,
        }
    }

    /// Read an attribute; `paired` is the freshly queried link security
    pub fn read(&self, uuid: &Uuid, paired: bool) -> ReadOutcome {
        match AttributeId::from_uuid(uuid) {
            Some(AttributeId::NetworkName) => {
                ReadOutcome::Value(self.pending.name.as_bytes().to_vec())
            }
            Some(AttributeId::PairingStatus) => ReadOutcome::Value(vec![pairing_value(paired)]),
            Some(AttributeId::Passphrase | AttributeId::Command) => ReadOutcome::NotPermitted,
            None => ReadOutcome::NotHandled,
        }
    }

    /// Decode a client configuration descriptor write
    pub fn write_descriptor(&mut self, uuid: &Uuid, data: &[u8]) -> Option<SubscriptionChange> {
        if AttributeId::from_uuid(uuid) != Some(AttributeId::PairingStatus) {
            return None;
        }

        let change = if data == CCCD_NOTIFY_ENABLED {
            SubscriptionChange::Enabled
        } else if data == CCCD_NOTIFY_DISABLED {
            SubscriptionChange::Disabled
        } else {
            warn!("Unsupported descriptor value {:?}", data);
            return None;
        };

        self.subscribed = change == SubscriptionChange::Enabled;
        debug!(?change, "Pairing status subscription changed");
        Some(change)
    }

    pub fn is_subscribed(&self) -> bool {
        self.subscribed
    }

    /// Forget the subscription of a peer that is gone
    pub fn reset_subscription(&mut self) {
        self.subscribed = false;
    }

    pub fn pending(&self) -> &PendingCredential {
        &self.pending
    }

    /// Take the staged credential if a name has been staged
    pub fn take_pending(&mut self) -> Option<PendingCredential> {
        if self.pending.name.is_empty() {
            return None;
        }
        Some(std::mem::take(&mut self.pending))
    }
}

/// Wire value of the pairing status attribute
pub fn pairing_value(paired: bool) -> u8 {
    u8::from(paired)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::attribute::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_stage_and_echo_network_name() {
        let mut handler = AttributeHandler::new();

        assert_eq!(
            handler.write(&NETWORK_NAME_CHAR_UUID, b"Home"),
            WriteOutcome::Staged
        );
        assert_eq!(
            handler.write(&PASSPHRASE_CHAR_UUID, b"secret123"),
            WriteOutcome::Staged
        );

        assert_eq!(
            handler.read(&NETWORK_NAME_CHAR_UUID, false),
            ReadOutcome::Value(b"Home".to_vec())
        );
        assert_eq!(handler.pending().passphrase, "secret123");
    }

    #[test]
    fn test_oversized_writes_are_truncated() {
        let mut handler = AttributeHandler::new();
        handler.write(&NETWORK_NAME_CHAR_UUID, &[b'N'; 40]);
        handler.write(&PASSPHRASE_CHAR_UUID, &[b'P'; 100]);

        assert_eq!(handler.pending().name.len(), 32);
        assert_eq!(handler.pending().passphrase.len(), 64);
    }

    #[test]
    fn test_empty_name_read_is_a_value() {
        let handler = AttributeHandler::new();
        assert_eq!(
            handler.read(&NETWORK_NAME_CHAR_UUID, false),
            ReadOutcome::Value(vec![])
        );
        assert_eq!(
            handler.read(&PROVISIONING_SERVICE_UUID, false),
            ReadOutcome::NotHandled
        );
    }

    #[test]
    fn test_write_only_attributes_are_not_readable() {
        let handler = AttributeHandler::new();
        assert_eq!(
            handler.read(&PASSPHRASE_CHAR_UUID, true),
            ReadOutcome::NotPermitted
        );
        assert_eq!(
            handler.read(&COMMAND_CHAR_UUID, true),
            ReadOutcome::NotPermitted
        );
    }

    #[test]
    fn test_pairing_status_read() {
        let mut handler = AttributeHandler::new();
        assert_eq!(
            handler.read(&PAIRING_STATUS_CHAR_UUID, true),
            ReadOutcome::Value(vec![0x01])
        );
        assert_eq!(
            handler.read(&PAIRING_STATUS_CHAR_UUID, false),
            ReadOutcome::Value(vec![0x00])
        );
        assert_eq!(
            handler.write(&PAIRING_STATUS_CHAR_UUID, &[1]),
            WriteOutcome::NotPermitted
        );
    }

    #[test]
    fn test_command_decoding() {
        let mut handler = AttributeHandler::new();

        assert_eq!(
            handler.write(&COMMAND_CHAR_UUID, &[0x02]),
            WriteOutcome::Command(Command::Connect)
        );
        // Only the first byte counts
        assert_eq!(
            handler.write(&COMMAND_CHAR_UUID, &[0x03, 0xff]),
            WriteOutcome::Command(Command::ClearNetworks)
        );
        assert_eq!(handler.write(&COMMAND_CHAR_UUID, &[]), WriteOutcome::Ignored);
        assert_eq!(
            handler.write(&COMMAND_CHAR_UUID, &[0x42]),
            WriteOutcome::Ignored
        );
    }

    #[test]
    fn test_unknown_attribute_not_handled() {
        let mut handler = AttributeHandler::new();
        assert_eq!(
            handler.write(&Uuid::nil(), b"data"),
            WriteOutcome::NotHandled
        );
        assert_eq!(handler.pending(), &PendingCredential::default());
    }

    #[test]
    fn test_subscription_descriptor() {
        let mut handler = AttributeHandler::new();

        assert_eq!(
            handler.write_descriptor(&PAIRING_STATUS_CHAR_UUID, &CCCD_NOTIFY_ENABLED),
            Some(SubscriptionChange::Enabled)
        );
        assert!(handler.is_subscribed());

        assert_eq!(
            handler.write_descriptor(&PAIRING_STATUS_CHAR_UUID, &[0x02, 0x00]),
            None
        );
        assert!(handler.is_subscribed());

        assert_eq!(
            handler.write_descriptor(&NETWORK_NAME_CHAR_UUID, &CCCD_NOTIFY_DISABLED),
            None
        );
        assert!(handler.is_subscribed());

        assert_eq!(
            handler.write_descriptor(&PAIRING_STATUS_CHAR_UUID, &CCCD_NOTIFY_DISABLED),
            Some(SubscriptionChange::Disabled)
        );
        assert!(!handler.is_subscribed());
    }

    #[test]
    fn test_reset_subscription() {
        let mut handler = AttributeHandler::new();
        handler.write_descriptor(&PAIRING_STATUS_CHAR_UUID, &CCCD_NOTIFY_ENABLED);

        handler.reset_subscription();
        assert!(!handler.is_subscribed());
    }

    #[test]
    fn test_take_pending_requires_name() {
        let mut handler = AttributeHandler::new();
        handler.write(&PASSPHRASE_CHAR_UUID, b"secret123");
        assert_eq!(handler.take_pending(), None);

        handler.write(&NETWORK_NAME_CHAR_UUID, b"Home");
        let pending = handler.take_pending().unwrap();
        assert_eq!(pending.name, "Home");
        assert_eq!(pending.passphrase, "secret123");
        assert_eq!(handler.pending(), &PendingCredential::default());
    }
}
