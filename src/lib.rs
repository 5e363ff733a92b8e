//! SD/SDHC/SDXC card protocol engine.
//!
//! The engine speaks the SD command/response/data protocol on top of any host
//! controller implementing [`SdHostOps`]. It owns no hardware and no global
//! state: the host is held by [`SdHost`] and the negotiated card state lives
//! in a caller-owned [`SdCard`].
#![cfg_attr(not(test), no_std)]

extern crate alloc;

pub mod card;
pub mod common;
pub mod config;
pub mod constants;
pub mod err;
pub mod host;
pub mod mci_core;
pub mod tools;

pub use card::{CardState, SdCard, SdVersion, Voltage};
pub use common::commands::{Command, DataBuffer, DataFormat, DataTransfer, ResponseType};
pub use config::SdConfig;
pub use err::{SdError, SdResult};
pub use host::{BusWidth, HostCapability, HostError, HostResult, SdHostOps};
pub use mci_core::SdHost;
