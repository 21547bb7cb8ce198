//! Bluetooth Low Energy transport layer

pub mod adapter;
pub mod agent;
pub mod gatt;
pub mod mock_peripheral;
pub mod peripheral;

pub use {
    adapter::BleAdapter,
    gatt::GattServer,
    mock_peripheral::MockPeripheral,
    peripheral::{PeripheralLink, RadioEvent},
};
