use core::time::Duration;

use crate::constants::SD_DEFAULT_BLOCK_SIZE;

/// Tunables of the protocol engine.
#[derive(Debug, PartialEq, Clone)]
pub struct SdConfig {
    init_clock_hz: u32,
    init_clocks: u32,
    operating_clock_hz: u32,
    high_speed_clock_hz: u32,
    block_size: u32,
    app_cmd_retries: u32,
    app_cmd_retry_delay: Duration,
    busy_poll_limit: u32,
    busy_poll_delay: Duration,
    status_poll_limit: u32,
    transfer_retries: u32,
}

impl Default for SdConfig {
    fn default() -> Self {
        Self {
            init_clock_hz: 400_000,
            init_clocks: 74,
            operating_clock_hz: 25_000_000,
            high_speed_clock_hz: 50_000_000,
            block_size: SD_DEFAULT_BLOCK_SIZE,
            app_cmd_retries: 100,
            app_cmd_retry_delay: Duration::from_micros(100),
            busy_poll_limit: 10_000,
            busy_poll_delay: Duration::from_micros(100),
            status_poll_limit: 1000,
            transfer_retries: 1,
        }
    }
}

impl SdConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_init_clock(mut self, hz: u32, clocks: u32) -> Self {
        self.init_clock_hz = hz;
        self.init_clocks = clocks;
        self
    }

    pub fn with_operating_clock(mut self, hz: u32) -> Self {
        self.operating_clock_hz = hz;
        self
    }

    pub fn with_high_speed_clock(mut self, hz: u32) -> Self {
        self.high_speed_clock_hz = hz;
        self
    }

    pub fn with_block_size(mut self, block_size: u32) -> Self {
        self.block_size = block_size;
        self
    }

    /// Bound and spacing of the CMD55+ACMD41 ready loop.
    pub fn with_app_cmd_retry(mut self, retries: u32, delay: Duration) -> Self {
        self.app_cmd_retries = retries;
        self.app_cmd_retry_delay = delay;
        self
    }

    pub fn with_busy_poll(mut self, limit: u32, delay: Duration) -> Self {
        self.busy_poll_limit = limit;
        self.busy_poll_delay = delay;
        self
    }

    pub fn with_status_poll_limit(mut self, limit: u32) -> Self {
        self.status_poll_limit = limit;
        self
    }

    pub fn with_transfer_retries(mut self, retries: u32) -> Self {
        self.transfer_retries = retries;
        self
    }

    pub fn init_clock_hz(&self) -> u32 {
        self.init_clock_hz
    }

    pub fn init_clocks(&self) -> u32 {
        self.init_clocks
    }

    pub fn operating_clock_hz(&self) -> u32 {
        self.operating_clock_hz
    }

    pub fn high_speed_clock_hz(&self) -> u32 {
        self.high_speed_clock_hz
    }

    pub fn block_size(&self) -> u32 {
        self.block_size
    }

    pub fn app_cmd_retries(&self) -> u32 {
        self.app_cmd_retries
    }

    pub fn app_cmd_retry_delay(&self) -> Duration {
        self.app_cmd_retry_delay
    }

    pub fn busy_poll_limit(&self) -> u32 {
        self.busy_poll_limit
    }

    pub fn busy_poll_delay(&self) -> Duration {
        self.busy_poll_delay
    }

    pub fn status_poll_limit(&self) -> u32 {
        self.status_poll_limit
    }

    pub fn transfer_retries(&self) -> u32 {
        self.transfer_retries
    }
}
