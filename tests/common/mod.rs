#![allow(dead_code)]

use std::cell::Cell;
use std::collections::BTreeMap;
use std::time::Duration;

use sdmmc_proto::{
    BusWidth, Command, DataBuffer, DataTransfer, HostCapability, HostError, HostResult, SdCard,
    SdConfig, SdHost, SdHostOps, Voltage, card::status::CardStatus, constants::*,
};

pub const SDHC_CID: [u32; 4] = [0x0353_4453, 0x5530_3247, 0x8012_34ab, 0xcd00_dbb1];
pub const SDHC_CSD: [u32; 4] = [0x400e_0032, 0x5b59_0000, 0x1010_7f80, 0x0a40_008b];
pub const SDSC_CSD: [u32; 4] = [0x0026_0032, 0x5f59_83c8, 0xaddb_cfff, 0xd240_40a5];
/// SD 3.0, bus widths 1 and 4.
pub const SCR_V3: [u8; 8] = [0x02, 0xb5, 0x80, 0x03, 0, 0, 0, 0];
/// SD 3.0, 1-bit bus only.
pub const SCR_1BIT: [u8; 8] = [0x02, 0xb1, 0x80, 0x03, 0, 0, 0, 0];

pub const RCA: u16 = 0x1234;
const BLOCK: usize = 512;

const STATE_IDLE: u32 = 0;
const STATE_READY: u32 = 1;
const STATE_IDENT: u32 = 2;
const STATE_STBY: u32 = 3;
const STATE_TRAN: u32 = 4;
const STATE_PRG: u32 = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    /// Opcode and argument as seen on the CMD line.
    Cmd(u8, u32),
    /// Data phase of the last command: opcode, block count, write.
    Data(u8, u32, bool),
    Clock(u32),
    Width(BusWidth),
    Signal(Voltage),
}

/// A single SD card behind an ideal host controller.
pub struct SimHost {
    pub inserted: bool,
    pub caps: HostCapability,
    pub max_blocks: u32,
    pub high_capacity: bool,
    pub answers_cmd8: bool,
    pub accepts_1v8: bool,
    pub high_speed: bool,
    pub cid: [u32; 4],
    pub csd: [u32; 4],
    pub scr: [u8; 8],
    /// ACMD41 reports power-up complete from this attempt on; `None` never.
    pub ready_after: Option<u32>,
    /// Opcodes whose command phase times out.
    pub fail_commands: Vec<u8>,
    /// Block data phases to fail with a CRC error before succeeding.
    pub data_failures: u32,
    /// CMD13 polls that report the programming state.
    pub programming_polls: u32,
    /// Programming polls armed by every block write.
    pub programming_after_write: u32,
    /// DAT0 busy polls armed by every R1b command.
    pub busy_after_r1b: u32,
    /// CMD55 is answered but APP_CMD stays clear.
    pub app_cmd_disabled: bool,
    /// The host cannot move its rails to 1.8 V.
    pub fail_voltage_switch: bool,
    /// R1 error bits ORed into the response of one opcode.
    pub status_errors: Option<(u8, u32)>,
    /// CMD6 function group (numbered from 1) that offers no function.
    pub unsupported_group: Option<u8>,

    pub events: Vec<Event>,
    pub sleeps: u32,
    pub storage: BTreeMap<u32, Vec<u8>>,

    state: u32,
    app: bool,
    op_cond_attempts: u32,
    last: Option<(u8, u32, bool)>,
    response: [u32; 4],
    busy: Cell<u32>,
}

impl SimHost {
    pub fn sdhc() -> Self {
        SimHost {
            inserted: true,
            caps: HostCapability::VOLTAGE_1V8
                | HostCapability::BUS_WIDTH_4BIT
                | HostCapability::HIGH_SPEED,
            max_blocks: 128,
            high_capacity: true,
            answers_cmd8: true,
            accepts_1v8: true,
            high_speed: true,
            cid: SDHC_CID,
            csd: SDHC_CSD,
            scr: SCR_V3,
            ready_after: Some(3),
            fail_commands: Vec::new(),
            data_failures: 0,
            programming_polls: 0,
            programming_after_write: 0,
            busy_after_r1b: 0,
            app_cmd_disabled: false,
            fail_voltage_switch: false,
            status_errors: None,
            unsupported_group: None,
            events: Vec::new(),
            sleeps: 0,
            storage: BTreeMap::new(),
            state: STATE_IDLE,
            app: false,
            op_cond_attempts: 0,
            last: None,
            response: [0; 4],
            busy: Cell::new(0),
        }
    }

    pub fn sdsc() -> Self {
        SimHost {
            caps: HostCapability::BUS_WIDTH_4BIT | HostCapability::HIGH_SPEED,
            high_capacity: false,
            accepts_1v8: false,
            csd: SDSC_CSD,
            ..SimHost::sdhc()
        }
    }

    pub fn commands(&self) -> Vec<(u8, u32)> {
        self.events
            .iter()
            .filter_map(|event| match event {
                Event::Cmd(opcode, arg) => Some((*opcode, *arg)),
                _ => None,
            })
            .collect()
    }

    pub fn opcodes(&self) -> Vec<u8> {
        self.commands().into_iter().map(|(opcode, _)| opcode).collect()
    }

    pub fn count(&self, opcode: u8) -> usize {
        self.opcodes().into_iter().filter(|op| *op == opcode).count()
    }

    pub fn clear(&mut self) {
        self.events.clear();
        self.sleeps = 0;
    }

    pub fn fill(&mut self, block: u32, byte: u8) {
        self.storage.insert(block, vec![byte; BLOCK]);
    }

    fn status(&self) -> u32 {
        let mut status = CardStatus::from_bits_retain(self.state << 9);
        status |= CardStatus::READY_FOR_DATA;
        if self.app {
            status |= CardStatus::APP_CMD;
        }
        status.bits()
    }

    fn block_index(&self, address: u32) -> u32 {
        if self.high_capacity {
            address
        } else {
            address / BLOCK as u32
        }
    }

    fn switch_status(&self, argument: u32) -> [u8; SD_SWITCH_STATUS_LEN] {
        let mut support = [0x0001u16; 6];
        if self.high_speed {
            support[0] |= 1 << SD_ACCESS_MODE_HIGH_SPEED;
        }
        if let Some(group) = self.unsupported_group {
            support[usize::from(group) - 1] = 0;
        }

        let mut raw = [0u8; SD_SWITCH_STATUS_LEN];
        raw[0..2].copy_from_slice(&100u16.to_be_bytes());
        for (group, mask) in support.iter().enumerate() {
            let offset = 12 - group * 2;
            raw[offset..offset + 2].copy_from_slice(&mask.to_be_bytes());
        }

        for group in 0..6 {
            let requested = ((argument >> (group * 4)) & 0xf) as u8;
            let selection = if requested == 0xf {
                0
            } else if support[group] & (1 << requested) != 0 {
                requested
            } else {
                0xf
            };
            let byte = 16 - group / 2;
            if group % 2 == 0 {
                raw[byte] |= selection;
            } else {
                raw[byte] |= selection << 4;
            }
        }
        raw[17] = 1;
        raw
    }
}

impl SdHostOps for SimHost {
    fn is_insert(&self) -> bool {
        self.inserted
    }

    fn set_bus_width(&mut self, width: BusWidth) {
        self.events.push(Event::Width(width));
    }

    fn set_clock_frequency(&mut self, hz: u32) {
        self.events.push(Event::Clock(hz));
    }

    fn card_active(&mut self, _clock_count: u32) -> bool {
        self.inserted
    }

    fn send_command(&mut self, cmd: &Command) -> HostResult {
        assert_eq!(cmd.crc, cmd.frame_crc(), "CMD{} framed without CRC", cmd.opcode());

        let opcode = cmd.opcode();
        let arg = cmd.argument;
        let app = self.app;
        self.events.push(Event::Cmd(opcode, arg));
        self.last = Some((opcode, arg, app));
        self.app = false;

        if self.fail_commands.contains(&opcode) {
            return Err(HostError::CommandTimeout);
        }

        let mut response = [0u32; 4];
        match (app, opcode) {
            (_, SD_APP_CMD) => {
                self.app = !self.app_cmd_disabled;
                response[0] = self.status();
            }
            (true, SD_APP_SEND_OP_COND) => {
                self.op_cond_attempts += 1;
                let mut ocr = OCR_VDD_27_36;
                if self
                    .ready_after
                    .is_some_and(|after| self.op_cond_attempts >= after)
                {
                    ocr |= OCR_BUSY;
                    if self.high_capacity && arg & OCR_HCS != 0 {
                        ocr |= OCR_HCS;
                    }
                    if self.accepts_1v8 && arg & OCR_S18 != 0 {
                        ocr |= OCR_S18;
                    }
                    self.state = STATE_READY;
                }
                response[0] = ocr;
            }
            (true, _) => response[0] = self.status(),
            (false, SD_GO_IDLE_STATE) => {
                self.state = STATE_IDLE;
                self.op_cond_attempts = 0;
            }
            (false, SD_SEND_IF_COND) => {
                if !self.answers_cmd8 {
                    return Err(HostError::CommandTimeout);
                }
                response[0] = arg & 0xfff;
            }
            (false, SD_ALL_SEND_CID) => {
                self.state = STATE_IDENT;
                response = self.cid;
            }
            (false, SD_SEND_RELATIVE_ADDR) => {
                self.state = STATE_STBY;
                response[0] = (u32::from(RCA) << 16) | (STATE_IDENT << 9) | 0x100;
            }
            (false, SD_SEND_CSD) => {
                assert_eq!(arg >> 16, u32::from(RCA));
                response = self.csd;
            }
            (false, SD_SELECT_CARD) => {
                if arg == 0 {
                    self.state = STATE_STBY;
                } else {
                    assert_eq!(arg >> 16, u32::from(RCA));
                    response[0] = self.status();
                    self.state = STATE_TRAN;
                }
            }
            (false, SD_SEND_STATUS) => {
                if self.programming_polls > 0 {
                    self.programming_polls -= 1;
                    response[0] = STATE_PRG << 9;
                } else {
                    response[0] = self.status();
                }
            }
            (false, SD_STOP_TRANSMISSION) | (false, SD_ERASE) => {
                response[0] = self.status();
                self.busy.set(self.busy_after_r1b);
                if opcode == SD_ERASE {
                    let commands = self.commands();
                    let last_arg = |wanted: u8| {
                        commands
                            .iter()
                            .rev()
                            .find(|(opcode, _)| *opcode == wanted)
                            .map(|(_, arg)| *arg)
                    };
                    let start = last_arg(SD_ERASE_WR_BLK_START);
                    let end = last_arg(SD_ERASE_WR_BLK_END);
                    if let (Some(start), Some(end)) = (start, end) {
                        let (start, end) = (self.block_index(start), self.block_index(end));
                        for block in start..=end {
                            self.storage.remove(&block);
                        }
                    }
                }
            }
            _ => response[0] = self.status(),
        }
        if let Some((_, bits)) = self.status_errors.filter(|(op, _)| *op == opcode) {
            response[0] |= bits;
        }
        self.response = response;
        Ok(())
    }

    fn receive_response(&mut self, cmd: &mut Command) {
        cmd.response = self.response;
    }

    fn send_data(&mut self, xfer: &DataTransfer<'_>) -> HostResult {
        let Some((opcode, arg, _)) = self.last else {
            return Err(HostError::Misconfigured);
        };
        self.events
            .push(Event::Data(opcode, xfer.format.block_count, true));
        if self.data_failures > 0 {
            self.data_failures -= 1;
            return Err(HostError::DataCrc);
        }

        let Some(data) = xfer.write_buffer() else {
            return Err(HostError::Misconfigured);
        };
        assert_eq!(data.len(), xfer.len());
        let first = self.block_index(arg);
        for (i, chunk) in data.chunks(BLOCK).enumerate() {
            self.storage.insert(first + i as u32, chunk.to_vec());
        }
        self.programming_polls = self.programming_after_write;
        Ok(())
    }

    fn receive_data(&mut self, xfer: &mut DataTransfer<'_>) -> HostResult {
        let Some((opcode, arg, app)) = self.last else {
            return Err(HostError::Misconfigured);
        };
        self.events
            .push(Event::Data(opcode, xfer.format.block_count, false));

        let payload: Vec<u8> = match (app, opcode) {
            (true, SD_APP_SEND_SCR) => self.scr.to_vec(),
            (false, SD_SWITCH_FUNC) => self.switch_status(arg).to_vec(),
            (false, SD_READ_SINGLE_BLOCK) | (false, SD_READ_MULTIPLE_BLOCK) => {
                if self.data_failures > 0 {
                    self.data_failures -= 1;
                    return Err(HostError::DataCrc);
                }
                let first = self.block_index(arg);
                (0..xfer.format.block_count)
                    .flat_map(|i| {
                        self.storage
                            .get(&(first + i))
                            .cloned()
                            .unwrap_or_else(|| vec![0; BLOCK])
                    })
                    .collect()
            }
            _ => return Err(HostError::Misconfigured),
        };

        let len = xfer.len();
        let Some(buf) = xfer.read_buffer() else {
            return Err(HostError::Misconfigured);
        };
        buf[..len].copy_from_slice(&payload[..len]);
        Ok(())
    }

    fn switch_voltage(&mut self, target: Voltage) -> HostResult {
        if self.fail_voltage_switch {
            return Err(HostError::Hardware);
        }
        self.events.push(Event::Signal(target));
        Ok(())
    }

    fn card_busy(&self) -> bool {
        let polls = self.busy.get();
        if polls > 0 {
            self.busy.set(polls - 1);
            true
        } else {
            false
        }
    }

    fn sleep(&mut self, _duration: Duration) {
        self.sleeps += 1;
    }

    fn capability(&self) -> HostCapability {
        self.caps
    }

    fn max_block_count(&self) -> u32 {
        self.max_blocks
    }
}

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn engine(host: SimHost) -> SdHost<SimHost> {
    engine_with(host, SdConfig::default())
}

pub fn engine_with(host: SimHost, config: SdConfig) -> SdHost<SimHost> {
    init_logger();
    match SdHost::new(host, config) {
        Ok(engine) => engine,
        Err(err) => panic!("host rejected: {err}"),
    }
}

/// Detect and bring the card to the transfer state, then clear the event log.
pub fn ready_card(host: SimHost) -> (SdHost<SimHost>, SdCard) {
    let mut sd = engine(host);
    let mut card = SdCard::new();
    sd.detect(&mut card).unwrap();
    sd.to_normal(&mut card).unwrap();
    sd.host_ops_mut().clear();
    (sd, card)
}

pub fn pattern(blocks: usize, seed: u8) -> Vec<u8> {
    (0..blocks * BLOCK)
        .map(|i| (i / BLOCK) as u8 ^ seed ^ (i as u8))
        .collect()
}

pub fn read_into(sd: &mut SdHost<SimHost>, card: &SdCard, start: u32, count: u32) -> Vec<u8> {
    let mut buf = vec![0u8; count as usize * BLOCK];
    sd.rw_blocks(card, DataBuffer::Read(&mut buf), start, count)
        .unwrap();
    buf
}
