//! cm-provision: cluster operations against a Cloudera-Manager-style API
//!
//! The [`adapter::ClouderaAdapter`] turns lifecycle intents into manager
//! API calls and waits on the commands they return. The manager itself is
//! reached through the [`api::ManagerApi`] seam; platform specifics come
//! from a [`platform::PlatformUtils`] strategy.

pub mod adapter;
pub mod api;
pub mod command;
pub mod config;
pub mod credentials;
pub mod error;
pub mod logging;
pub mod platform;
pub mod poll;
pub mod progress;
pub mod roles;

pub use adapter::ClouderaAdapter;
pub use config::AdapterConfig;
pub use error::{ProvisionError, Result};
