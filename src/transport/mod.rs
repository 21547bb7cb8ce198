//! Radio transport layer

pub mod ble;
