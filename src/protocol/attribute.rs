//! Provisioning service attribute identifiers

use uuid::Uuid;

/// Provisioning service UUID
pub const PROVISIONING_SERVICE_UUID: Uuid = Uuid::from_u128(0x5a67d678_6361_4f32_8396_54c6926c8fa1);

/// Network name characteristic (read/write, up to 32 bytes)
pub const NETWORK_NAME_CHAR_UUID: Uuid = Uuid::from_u128(0x5a67d678_6361_4f32_8396_54c6926c8fa2);

/// Passphrase characteristic (write-only, up to 64 bytes)
pub const PASSPHRASE_CHAR_UUID: Uuid = Uuid::from_u128(0x5a67d678_6361_4f32_8396_54c6926c8fa3);

/// Command characteristic (write-only, 1 byte)
pub const COMMAND_CHAR_UUID: Uuid = Uuid::from_u128(0x5a67d678_6361_4f32_8396_54c6926c8fa4);

/// Pairing status characteristic (read/notify, 1 byte)
pub const PAIRING_STATUS_CHAR_UUID: Uuid =
    Uuid::from_u128(0x5a67d678_6361_4f32_8396_54c6926c8fa5);

/// Client characteristic configuration value enabling notifications
pub const CCCD_NOTIFY_ENABLED: [u8; 2] = [0x01, 0x00];

/// Client characteristic configuration value disabling notifications
pub const CCCD_NOTIFY_DISABLED: [u8; 2] = [0x00, 0x00];

/// Logical attributes owned by the provisioning service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttributeId {
    NetworkName,
    Passphrase,
    Command,
    PairingStatus,
}

impl AttributeId {
    pub const ALL: [AttributeId; 4] = [
        AttributeId::NetworkName,
        AttributeId::Passphrase,
        AttributeId::Command,
        AttributeId::PairingStatus,
    ];

    /// Resolve a characteristic UUID, `None` if another service owns it
    pub fn from_uuid(uuid: &Uuid) -> Option<Self> {
        Self::ALL.into_iter().find(|id| id.uuid() == *uuid)
    }

    pub fn uuid(self) -> Uuid {
        match self {
            AttributeId::NetworkName => NETWORK_NAME_CHAR_UUID,
            AttributeId::Passphrase => PASSPHRASE_CHAR_UUID,
            AttributeId::Command => COMMAND_CHAR_UUID,
            AttributeId::PairingStatus => PAIRING_STATUS_CHAR_UUID,
        }
    }

    /// Largest accepted write; longer writes are truncated
    pub fn max_len(self) -> usize {
        match self {
            AttributeId::NetworkName => crate::core::types::MAX_NAME_LEN,
            AttributeId::Passphrase => crate::core::types::MAX_PASSPHRASE_LEN,
            AttributeId::Command | AttributeId::PairingStatus => 1,
        }
    }
}
