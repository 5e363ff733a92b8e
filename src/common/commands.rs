use crate::card::status::CardStatus;
use crate::constants::*;
use crate::tools::crc7_frame;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseType {
    None,
    R1,
    /// R1 followed by busy signalling on DAT0.
    R1b,
    R2,
    R3,
    R6,
    R7,
}

impl ResponseType {
    pub fn carries_card_status(&self) -> bool {
        matches!(self, ResponseType::R1 | ResponseType::R1b)
    }

    /// Response length on the CMD line in bits.
    pub fn length(&self) -> u8 {
        match self {
            ResponseType::None => 0,
            ResponseType::R2 => 136,
            _ => 48,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataDirection {
    Read,
    Write,
}

/// Shape of the data phase accompanying a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataFormat {
    pub block_size: u32,
    pub block_count: u32,
    pub direction: DataDirection,
    /// False for raw register reads such as SCR, where only a byte count applies.
    pub uses_block_protocol: bool,
}

impl DataFormat {
    pub fn blocks(block_size: u32, block_count: u32, direction: DataDirection) -> Self {
        Self {
            block_size,
            block_count,
            direction,
            uses_block_protocol: true,
        }
    }

    pub fn raw_read(len: usize) -> Self {
        Self {
            block_size: len as u32,
            block_count: 1,
            direction: DataDirection::Read,
            uses_block_protocol: false,
        }
    }

    pub fn len(&self) -> usize {
        self.block_size as usize * self.block_count as usize
    }
}

pub enum DataBuffer<'a> {
    Read(&'a mut [u8]),
    Write(&'a [u8]),
}

impl DataBuffer<'_> {
    pub fn len(&self) -> usize {
        match self {
            DataBuffer::Read(buf) => buf.len(),
            DataBuffer::Write(buf) => buf.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn direction(&self) -> DataDirection {
        match self {
            DataBuffer::Read(_) => DataDirection::Read,
            DataBuffer::Write(_) => DataDirection::Write,
        }
    }
}

/// A data phase: its format plus the caller's buffer, borrowed for one call.
pub struct DataTransfer<'a> {
    pub format: DataFormat,
    pub buffer: DataBuffer<'a>,
}

impl<'a> DataTransfer<'a> {
    pub fn read(format: DataFormat, buffer: &'a mut [u8]) -> Self {
        debug_assert_eq!(format.direction, DataDirection::Read);
        Self {
            format,
            buffer: DataBuffer::Read(buffer),
        }
    }

    pub fn write(format: DataFormat, buffer: &'a [u8]) -> Self {
        debug_assert_eq!(format.direction, DataDirection::Write);
        Self {
            format,
            buffer: DataBuffer::Write(buffer),
        }
    }

    /// Bytes moved by this transfer.
    pub fn len(&self) -> usize {
        self.format.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn read_buffer(&mut self) -> Option<&mut [u8]> {
        match &mut self.buffer {
            DataBuffer::Read(buf) => Some(&mut buf[..]),
            DataBuffer::Write(_) => None,
        }
    }

    pub fn write_buffer(&self) -> Option<&[u8]> {
        match &self.buffer {
            DataBuffer::Read(_) => None,
            DataBuffer::Write(buf) => Some(buf),
        }
    }
}

/// One bus transaction. Built fresh for every transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    /// Command index with the start/transmission bits set.
    pub index: u8,
    pub argument: u32,
    pub response_type: ResponseType,
    /// Response as four big-endian words; `response[0]` holds R1/R3/R6/R7
    /// and bits [127:96] of R2.
    pub response: [u32; 4],
    /// CRC7 in bits [7:1], end bit in bit 0.
    pub crc: u8,
    pub data: Option<DataFormat>,
}

impl Command {
    pub fn new(opcode: u8, argument: u32, response_type: ResponseType) -> Self {
        let mut cmd = Self {
            index: SD_CMD_START_TRANSMIT | (opcode & SD_CMD_INDEX_MASK),
            argument,
            response_type,
            response: [0; 4],
            crc: 0,
            data: None,
        };
        cmd.crc = cmd.frame_crc();
        cmd
    }

    pub fn with_data(mut self, format: DataFormat) -> Self {
        self.data = Some(format);
        self
    }

    pub fn opcode(&self) -> u8 {
        self.index & SD_CMD_INDEX_MASK
    }

    /// The five bytes covered by the CRC.
    pub fn frame(&self) -> [u8; 5] {
        let arg = self.argument.to_be_bytes();
        [self.index, arg[0], arg[1], arg[2], arg[3]]
    }

    pub fn frame_crc(&self) -> u8 {
        crc7_frame(&self.frame())
    }

    pub fn card_status(&self) -> CardStatus {
        CardStatus::from_bits_retain(self.response[0])
    }

    // CMD0
    pub fn go_idle() -> Self {
        Self::new(SD_GO_IDLE_STATE, 0, ResponseType::None)
    }

    // CMD2
    pub fn all_send_cid() -> Self {
        Self::new(SD_ALL_SEND_CID, 0, ResponseType::R2)
    }

    // CMD3
    pub fn send_relative_addr() -> Self {
        Self::new(SD_SEND_RELATIVE_ADDR, 0, ResponseType::R6)
    }

    // CMD6, answered with a 512-bit status block; `group` is clamped to 1..=6
    pub fn switch_func(mode: u32, group: u8, function: u8) -> Self {
        let shift = (u32::from(group.clamp(1, 6)) - 1) * 4;
        let mut argument = (mode << 31) | 0x00ff_ffff;
        argument &= !(0xf << shift);
        argument |= u32::from(function & 0xf) << shift;
        Self::new(SD_SWITCH_FUNC, argument, ResponseType::R1)
            .with_data(DataFormat::raw_read(SD_SWITCH_STATUS_LEN))
    }

    // CMD7
    pub fn select_card(rca: u16) -> Self {
        Self::new(SD_SELECT_CARD, u32::from(rca) << 16, ResponseType::R1)
    }

    // CMD7 with RCA 0, no card answers
    pub fn deselect_card() -> Self {
        Self::new(SD_SELECT_CARD, 0, ResponseType::None)
    }

    // CMD8
    pub fn send_if_cond() -> Self {
        Self::new(SD_SEND_IF_COND, SD_IF_COND_ARG, ResponseType::R7)
    }

    // CMD9
    pub fn send_csd(rca: u16) -> Self {
        Self::new(SD_SEND_CSD, u32::from(rca) << 16, ResponseType::R2)
    }

    // CMD11
    pub fn voltage_switch() -> Self {
        Self::new(SD_VOLTAGE_SWITCH, 0, ResponseType::R1)
    }

    // CMD12
    pub fn stop_transmission() -> Self {
        Self::new(SD_STOP_TRANSMISSION, 0, ResponseType::R1b)
    }

    // CMD13
    pub fn send_status(rca: u16) -> Self {
        Self::new(SD_SEND_STATUS, u32::from(rca) << 16, ResponseType::R1)
    }

    // CMD16
    pub fn set_block_len(block_len: u32) -> Self {
        Self::new(SD_SET_BLOCKLEN, block_len, ResponseType::R1)
    }

    // CMD17 / CMD18
    pub fn read_blocks(address: u32, block_size: u32, block_count: u32) -> Self {
        let opcode = if block_count == 1 {
            SD_READ_SINGLE_BLOCK
        } else {
            SD_READ_MULTIPLE_BLOCK
        };
        Self::new(opcode, address, ResponseType::R1).with_data(DataFormat::blocks(
            block_size,
            block_count,
            DataDirection::Read,
        ))
    }

    // CMD24 / CMD25
    pub fn write_blocks(address: u32, block_size: u32, block_count: u32) -> Self {
        let opcode = if block_count == 1 {
            SD_WRITE_BLOCK
        } else {
            SD_WRITE_MULTIPLE_BLOCK
        };
        Self::new(opcode, address, ResponseType::R1).with_data(DataFormat::blocks(
            block_size,
            block_count,
            DataDirection::Write,
        ))
    }

    // CMD32
    pub fn erase_start(address: u32) -> Self {
        Self::new(SD_ERASE_WR_BLK_START, address, ResponseType::R1)
    }

    // CMD33
    pub fn erase_end(address: u32) -> Self {
        Self::new(SD_ERASE_WR_BLK_END, address, ResponseType::R1)
    }

    // CMD38
    pub fn erase() -> Self {
        Self::new(SD_ERASE, 0, ResponseType::R1b)
    }

    // CMD55
    pub fn app_cmd(rca: u16) -> Self {
        Self::new(SD_APP_CMD, u32::from(rca) << 16, ResponseType::R1)
    }

    // ACMD6
    pub fn app_set_bus_width(width_code: u32) -> Self {
        Self::new(SD_APP_SET_BUS_WIDTH, width_code, ResponseType::R1)
    }

    // ACMD41
    pub fn app_send_op_cond(ocr: u32) -> Self {
        Self::new(SD_APP_SEND_OP_COND, ocr, ResponseType::R3)
    }

    // ACMD42, argument 0 disconnects the DAT3 pull-up
    pub fn app_set_clr_card_detect(connect: bool) -> Self {
        Self::new(SD_APP_SET_CLR_CARD_DETECT, connect as u32, ResponseType::R1)
    }

    // ACMD51
    pub fn app_send_scr() -> Self {
        Self::new(SD_APP_SEND_SCR, 0, ResponseType::R1).with_data(DataFormat::raw_read(SD_SCR_LEN))
    }
}
