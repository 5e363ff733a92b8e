use bitflags::bitflags;

use crate::constants::SD_SWITCH_STATUS_LEN;

bitflags! {
    /// Card status carried by R1/R1b responses.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct CardStatus: u32 {
        const OUT_OF_RANGE = 1 << 31;
        const ADDRESS_ERROR = 1 << 30;
        const BLOCK_LEN_ERROR = 1 << 29;
        const ERASE_SEQ_ERROR = 1 << 28;
        const ERASE_PARAM = 1 << 27;
        const WP_VIOLATION = 1 << 26;
        const CARD_IS_LOCKED = 1 << 25;
        const LOCK_UNLOCK_FAILED = 1 << 24;
        const COM_CRC_ERROR = 1 << 23;
        const ILLEGAL_COMMAND = 1 << 22;
        const CARD_ECC_FAILED = 1 << 21;
        const CC_ERROR = 1 << 20;
        const ERROR = 1 << 19;
        const CSD_OVERWRITE = 1 << 16;
        const WP_ERASE_SKIP = 1 << 15;
        const CARD_ECC_DISABLED = 1 << 14;
        const ERASE_RESET = 1 << 13;
        const CURRENT_STATE = 0xf << 9;
        const READY_FOR_DATA = 1 << 8;
        const FX_EVENT = 1 << 6;
        const APP_CMD = 1 << 5;
        const AKE_SEQ_ERROR = 1 << 3;

        const ALL_ERROR_FLAG = Self::OUT_OF_RANGE.bits()
            | Self::ADDRESS_ERROR.bits()
            | Self::BLOCK_LEN_ERROR.bits()
            | Self::ERASE_SEQ_ERROR.bits()
            | Self::ERASE_PARAM.bits()
            | Self::WP_VIOLATION.bits()
            | Self::LOCK_UNLOCK_FAILED.bits()
            | Self::COM_CRC_ERROR.bits()
            | Self::ILLEGAL_COMMAND.bits()
            | Self::CARD_ECC_FAILED.bits()
            | Self::CC_ERROR.bits()
            | Self::ERROR.bits()
            | Self::CSD_OVERWRITE.bits()
            | Self::WP_ERASE_SKIP.bits()
            | Self::AKE_SEQ_ERROR.bits();
    }
}

/// CURRENT_STATE field of the card status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CurrentState {
    Idle,
    Ready,
    Identification,
    StandBy,
    Transfer,
    SendingData,
    ReceiveData,
    Programming,
    Disconnect,
    Reserved(u8),
}

impl From<u8> for CurrentState {
    fn from(value: u8) -> Self {
        match value {
            0 => CurrentState::Idle,
            1 => CurrentState::Ready,
            2 => CurrentState::Identification,
            3 => CurrentState::StandBy,
            4 => CurrentState::Transfer,
            5 => CurrentState::SendingData,
            6 => CurrentState::ReceiveData,
            7 => CurrentState::Programming,
            8 => CurrentState::Disconnect,
            other => CurrentState::Reserved(other),
        }
    }
}

impl CardStatus {
    pub fn errors(&self) -> CardStatus {
        self.intersection(CardStatus::ALL_ERROR_FLAG)
    }

    pub fn has_error(&self) -> bool {
        !self.errors().is_empty()
    }

    pub fn current_state(&self) -> CurrentState {
        CurrentState::from(((self.bits() >> 9) & 0xf) as u8)
    }

    pub fn ready_for_data(&self) -> bool {
        self.contains(CardStatus::READY_FOR_DATA)
    }

    pub fn app_cmd_enabled(&self) -> bool {
        self.contains(CardStatus::APP_CMD)
    }
}

/// The 512-bit status block returned by CMD6.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SwitchStatus {
    /// Maximum current consumption in mA for the selected functions.
    pub max_current: u16,
    /// Supported-function masks, `[0]` is group 1.
    pub support: [u16; 6],
    /// Selected (or selectable) function per group, 0xF on failure.
    pub selection: [u8; 6],
    pub structure_version: u8,
}

impl SwitchStatus {
    pub fn decode(raw: &[u8; SD_SWITCH_STATUS_LEN]) -> Self {
        let mut status = SwitchStatus {
            max_current: u16::from_be_bytes([raw[0], raw[1]]),
            structure_version: raw[17],
            ..Default::default()
        };
        // bytes 2..14 hold groups 6 down to 1
        for group in 0..6 {
            let offset = 12 - group * 2;
            status.support[group] = u16::from_be_bytes([raw[offset], raw[offset + 1]]);
        }
        // bytes 14..17 hold one nibble per group, group 6 first
        for group in 0..6 {
            let byte = raw[16 - group / 2];
            status.selection[group] = if group % 2 == 0 {
                byte & 0xf
            } else {
                byte >> 4
            };
        }
        status
    }

    pub fn supports(&self, group: u8, function: u8) -> bool {
        let Some(mask) = self.support.get(usize::from(group).wrapping_sub(1)) else {
            return false;
        };
        function < 16 && mask & (1 << function) != 0
    }

    pub fn selected(&self, group: u8) -> Option<u8> {
        self.selection
            .get(usize::from(group).wrapping_sub(1))
            .copied()
    }
}
