// Command indexes
pub const SD_GO_IDLE_STATE: u8 = 0;
pub const SD_ALL_SEND_CID: u8 = 2;
pub const SD_SEND_RELATIVE_ADDR: u8 = 3;
pub const SD_SWITCH_FUNC: u8 = 6;
pub const SD_SELECT_CARD: u8 = 7;
pub const SD_SEND_IF_COND: u8 = 8;
pub const SD_SEND_CSD: u8 = 9;
pub const SD_VOLTAGE_SWITCH: u8 = 11;
pub const SD_STOP_TRANSMISSION: u8 = 12;
pub const SD_SEND_STATUS: u8 = 13;
pub const SD_SET_BLOCKLEN: u8 = 16;
pub const SD_READ_SINGLE_BLOCK: u8 = 17;
pub const SD_READ_MULTIPLE_BLOCK: u8 = 18;
pub const SD_WRITE_BLOCK: u8 = 24;
pub const SD_WRITE_MULTIPLE_BLOCK: u8 = 25;
pub const SD_ERASE_WR_BLK_START: u8 = 32;
pub const SD_ERASE_WR_BLK_END: u8 = 33;
pub const SD_ERASE: u8 = 38;
pub const SD_APP_CMD: u8 = 55;

// Application commands, valid only after CMD55
pub const SD_APP_SET_BUS_WIDTH: u8 = 6;
pub const SD_APP_SEND_OP_COND: u8 = 41;
pub const SD_APP_SET_CLR_CARD_DETECT: u8 = 42;
pub const SD_APP_SEND_SCR: u8 = 51;

/// Start bit clear, transmission bit set.
pub const SD_CMD_START_TRANSMIT: u8 = 0x40;
pub const SD_CMD_INDEX_MASK: u8 = 0x3f;

// CMD8
pub const SD_IF_COND_VHS_27_36: u32 = 0x100;
pub const SD_IF_COND_CHECK_PATTERN: u32 = 0xaa;
pub const SD_IF_COND_ARG: u32 = SD_IF_COND_VHS_27_36 | SD_IF_COND_CHECK_PATTERN;
pub const SD_IF_COND_ECHO_MASK: u32 = 0xfff;

// OCR
pub const OCR_VDD_27_36: u32 = 0x00ff_8000;
pub const OCR_S18: u32 = 1 << 24;
pub const OCR_HCS: u32 = 1 << 30;
pub const OCR_BUSY: u32 = 1 << 31;

// R6
pub const R6_RCA_SHIFT: u32 = 16;
pub const R6_COM_CRC_ERROR: u32 = 1 << 15;
pub const R6_ILLEGAL_COMMAND: u32 = 1 << 14;
pub const R6_ERROR: u32 = 1 << 13;
pub const R6_ERROR_MASK: u32 = R6_COM_CRC_ERROR | R6_ILLEGAL_COMMAND | R6_ERROR;

// ACMD6 bus width codes
pub const SD_BUS_WIDTH_CODE_1BIT: u32 = 0;
pub const SD_BUS_WIDTH_CODE_4BIT: u32 = 2;

// SCR SD_BUS_WIDTHS bits
pub const SCR_BUS_WIDTH_1BIT: u8 = 1 << 0;
pub const SCR_BUS_WIDTH_4BIT: u8 = 1 << 2;

// CMD6
pub const SD_SWITCH_MODE_CHECK: u32 = 0;
pub const SD_SWITCH_MODE_SET: u32 = 1;
pub const SD_SWITCH_STATUS_LEN: usize = 64;
pub const SD_SWITCH_FUNCTION_FAILED: u8 = 0xf;

pub const SD_GROUP_ACCESS_MODE: u8 = 1;
pub const SD_GROUP_COMMAND_SYSTEM: u8 = 2;
pub const SD_GROUP_DRIVER_STRENGTH: u8 = 3;
pub const SD_GROUP_CURRENT_LIMIT: u8 = 4;

pub const SD_ACCESS_MODE_DEFAULT: u8 = 0;
pub const SD_ACCESS_MODE_HIGH_SPEED: u8 = 1;
pub const SD_DRIVER_STRENGTH_TYPE_B: u8 = 0;
pub const SD_CURRENT_LIMIT_200MA: u8 = 0;

pub const SD_SCR_LEN: usize = 8;
pub const SD_DEFAULT_BLOCK_SIZE: u32 = 512;

pub const CSD_STRUCTURE_V1: u8 = 0;
pub const CSD_STRUCTURE_V2: u8 = 1;
