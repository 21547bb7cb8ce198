//! Provisioning attribute protocol

pub mod attribute;
pub mod command;
pub mod handler;

pub use attribute::*;
pub use command::Command;
pub use handler::{
    AttributeHandler, PendingCredential, ReadOutcome, SubscriptionChange, WriteOutcome,
    pairing_value,
};
