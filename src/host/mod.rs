use core::fmt::Display;
use core::time::Duration;

use bitflags::bitflags;

use crate::card::Voltage;
use crate::common::commands::{Command, DataTransfer};

/// Raw I/O failure reported by a host controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostError {
    CommandTimeout,
    CommandCrc,
    DataTimeout,
    DataCrc,
    Misconfigured,
    Hardware,
}

impl Display for HostError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            HostError::CommandTimeout => write!(f, "Command timed out"),
            HostError::CommandCrc => write!(f, "Command CRC error"),
            HostError::DataTimeout => write!(f, "Data timed out"),
            HostError::DataCrc => write!(f, "Data CRC error"),
            HostError::Misconfigured => write!(f, "Host misconfigured"),
            HostError::Hardware => write!(f, "Host hardware error"),
        }
    }
}

pub type HostResult<T = ()> = Result<T, HostError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusWidth {
    Width1 = 1,
    Width4 = 4,
    Width8 = 8,
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct HostCapability: u32 {
        const VOLTAGE_1V8 = 1 << 0;
        const BUS_WIDTH_4BIT = 1 << 1;
        const BUS_WIDTH_8BIT = 1 << 2;
        const AUTO_CMD12 = 1 << 3;
        const HIGH_SPEED = 1 << 4;
    }
}

/// Host controller seen from the protocol layer.
///
/// Every call blocks until the hardware operation completes or the host's own
/// timeout fires; the engine never touches registers directly.
pub trait SdHostOps {
    fn is_insert(&self) -> bool;

    fn set_bus_width(&mut self, width: BusWidth);

    fn set_clock_frequency(&mut self, hz: u32);

    /// Drive `clock_count` clocks with no card selected.
    fn card_active(&mut self, clock_count: u32) -> bool;

    fn send_command(&mut self, cmd: &Command) -> HostResult;

    /// Fill `cmd.response` with the response of the last command.
    fn receive_response(&mut self, cmd: &mut Command);

    fn send_data(&mut self, xfer: &DataTransfer<'_>) -> HostResult;

    fn receive_data(&mut self, xfer: &mut DataTransfer<'_>) -> HostResult;

    fn setup_dma(&mut self, _xfer: &DataTransfer<'_>) {}

    fn switch_voltage(&mut self, target: Voltage) -> HostResult;

    /// Transport framing; the default inserts CRC7 and the end bit.
    fn add_head_tail(&mut self, cmd: &mut Command) {
        cmd.crc = cmd.frame_crc();
    }

    /// DAT0 held low by the card.
    fn card_busy(&self) -> bool {
        false
    }

    fn sleep(&mut self, duration: Duration);

    fn capability(&self) -> HostCapability;

    fn max_block_count(&self) -> u32;
}
