//! Protocol engine bound to one host controller.
//!
//! The methods of [`SdHost`] are split by concern: `transfer` sends single
//! commands and app commands, `cmd` wraps each SD command and records its
//! result in the [`SdCard`](crate::SdCard), `init` runs card detection and the
//! switch to normal operation, `ext` negotiates bus width and CMD6 functions,
//! and `block` moves data.

mod block;
mod cmd;
mod ext;
mod init;
mod transfer;

use log::{error, info};

use crate::{
    config::SdConfig,
    err::{SdError, SdResult},
    host::{HostError, SdHostOps},
};

pub struct SdHost<T: SdHostOps> {
    host_ops: T,
    config: SdConfig,
}

impl<T: SdHostOps> SdHost<T> {
    /// Register a host. A host that cannot move a single block is rejected.
    pub fn new(host_ops: T, config: SdConfig) -> SdResult<Self> {
        if host_ops.max_block_count() == 0 {
            error!("host reports a zero block count per transaction");
            return Err(SdError::HostFault(HostError::Misconfigured));
        }
        if config.block_size() == 0 {
            error!("configured block size is zero");
            return Err(SdError::HostFault(HostError::Misconfigured));
        }

        info!(
            "SD host registered: caps {:?}, max {} blocks per transfer",
            host_ops.capability(),
            host_ops.max_block_count()
        );
        Ok(SdHost { host_ops, config })
    }

    pub fn host_ops(&self) -> &T {
        &self.host_ops
    }

    pub fn host_ops_mut(&mut self) -> &mut T {
        &mut self.host_ops
    }

    pub fn config(&self) -> &SdConfig {
        &self.config
    }

    pub fn into_inner(self) -> T {
        self.host_ops
    }
}
