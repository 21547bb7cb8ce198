//! Core business logic module

pub mod connector;
pub mod error;
pub mod provisioner;
pub mod store;
pub mod types;
