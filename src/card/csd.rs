use bitflags::bitflags;

use crate::constants::{CSD_STRUCTURE_V1, SD_DEFAULT_BLOCK_SIZE};
use crate::tools::{extract_bits, left_aligned};

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SdCsd {
    pub csd_structure: u8,
    pub data_read_access_time1: u8,
    pub data_read_access_time2: u8,
    pub transfer_speed: u8,
    pub card_command_classes: u16,
    pub read_block_length: u8,
    pub flags: CsdFlags,
    /// C_SIZE: 12 bits on structure 0, 22 bits on structure 1.
    pub device_size: u32,
    pub read_current_vdd_min: u8,
    pub read_current_vdd_max: u8,
    pub write_current_vdd_min: u8,
    pub write_current_vdd_max: u8,
    pub device_size_multiplier: u8,
    pub erase_sector_size: u8,
    pub write_protect_group_size: u8,
    pub write_speed_factor: u8,
    pub write_block_length: u8,
    pub file_format: u8,
}

bitflags! {
    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
    pub struct CsdFlags: u16 {
        const READ_BLOCK_PARTIAL = 1 << 0; /* Partial blocks for read allowed [79:79] */
        const WRITE_BLOCK_MISALIGN = 1 << 1; /* Write block misalignment [78:78] */
        const READ_BLOCK_MISALIGN = 1 << 2; /* Read block misalignment [77:77] */
        const DSR_IMPLEMENTED = 1 << 3; /* DSR implemented [76:76] */
        const ERASE_BLOCK_ENABLED = 1 << 4; /* Erase single block enabled [46:46] */
        const WRITE_PROTECT_GROUP_ENABLED = 1 << 5; /* Write protect group enabled [31:31] */
        const WRITE_BLOCK_PARTIAL = 1 << 6; /* Partial blocks for write allowed [21:21] */
        const FILE_FORMAT_GROUP = 1 << 7; /* File format group [15:15] */
        const COPY = 1 << 8; /* Copy flag [14:14] */
        const PERMANENT_WRITE_PROTECT = 1 << 9; /* Permanent write protection [13:13] */
        const TEMPORARY_WRITE_PROTECT = 1 << 10; /* Temporary write protection [12:12] */
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct SdCardCmdClass: u16 {
        const BASIC = 1 << 0;
        const BLOCK_READ = 1 << 2;
        const BLOCK_WRITE = 1 << 4;
        const ERASE = 1 << 5;
        const WRITE_PROTECT = 1 << 6;
        const LOCK_CARD = 1 << 7;
        const APPLICATION_SPECIFIC = 1 << 8;
        const INPUT_OUTPUT_MODE = 1 << 9;
        const SWITCH = 1 << 10;
    }
}

const FLAG_BITS: [(usize, CsdFlags); 11] = [
    (79, CsdFlags::READ_BLOCK_PARTIAL),
    (78, CsdFlags::WRITE_BLOCK_MISALIGN),
    (77, CsdFlags::READ_BLOCK_MISALIGN),
    (76, CsdFlags::DSR_IMPLEMENTED),
    (46, CsdFlags::ERASE_BLOCK_ENABLED),
    (31, CsdFlags::WRITE_PROTECT_GROUP_ENABLED),
    (21, CsdFlags::WRITE_BLOCK_PARTIAL),
    (15, CsdFlags::FILE_FORMAT_GROUP),
    (14, CsdFlags::COPY),
    (13, CsdFlags::PERMANENT_WRITE_PROTECT),
    (12, CsdFlags::TEMPORARY_WRITE_PROTECT),
];

// TRAN_SPEED time value, in tenths
const TRAN_SPEED_MULT: [u32; 16] = [0, 10, 12, 13, 15, 20, 25, 30, 35, 40, 45, 50, 55, 60, 70, 80];
// TRAN_SPEED unit, in bit/s
const TRAN_SPEED_UNIT: [u32; 4] = [100_000, 1_000_000, 10_000_000, 100_000_000];

impl SdCsd {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode the CSD from an R2 response, `words[0]` = bits [127:96].
    pub fn decode(words: &[u32]) -> Self {
        let words: [u32; 4] = left_aligned(words);
        let words = &words[..];
        let mut csd = SdCsd {
            csd_structure: extract_bits(words, 126, 2) as u8,
            data_read_access_time1: extract_bits(words, 112, 8) as u8,
            data_read_access_time2: extract_bits(words, 104, 8) as u8,
            transfer_speed: extract_bits(words, 96, 8) as u8,
            card_command_classes: extract_bits(words, 84, 12) as u16,
            read_block_length: extract_bits(words, 80, 4) as u8,
            erase_sector_size: extract_bits(words, 39, 7) as u8,
            write_protect_group_size: extract_bits(words, 32, 7) as u8,
            write_speed_factor: extract_bits(words, 26, 3) as u8,
            write_block_length: extract_bits(words, 22, 4) as u8,
            file_format: extract_bits(words, 10, 2) as u8,
            ..Default::default()
        };

        for (bit, flag) in FLAG_BITS {
            if extract_bits(words, bit, 1) != 0 {
                csd.flags |= flag;
            }
        }

        if csd.csd_structure == CSD_STRUCTURE_V1 {
            csd.device_size = extract_bits(words, 62, 12);
            csd.read_current_vdd_min = extract_bits(words, 59, 3) as u8;
            csd.read_current_vdd_max = extract_bits(words, 56, 3) as u8;
            csd.write_current_vdd_min = extract_bits(words, 53, 3) as u8;
            csd.write_current_vdd_max = extract_bits(words, 50, 3) as u8;
            csd.device_size_multiplier = extract_bits(words, 47, 3) as u8;
        } else {
            csd.device_size = extract_bits(words, 48, 22);
        }

        csd
    }

    /// Block-addressed (SDHC/SDXC) rather than byte-addressed.
    pub fn is_high_capacity(&self) -> bool {
        self.csd_structure != CSD_STRUCTURE_V1
    }

    /// Returns `(block_size, block_count)`.
    ///
    /// Standard-capacity cards with READ_BL_LEN above 512 bytes are re-expressed
    /// in 512-byte blocks.
    pub fn geometry(&self) -> (u32, u32) {
        let (block_size, block_count) = if self.is_high_capacity() {
            (
                SD_DEFAULT_BLOCK_SIZE as u64,
                (self.device_size as u64 + 1) * 1024,
            )
        } else {
            let block_size = 1u64 << self.read_block_length;
            let block_count =
                (self.device_size as u64 + 1) << (self.device_size_multiplier as u64 + 2);
            if block_size > SD_DEFAULT_BLOCK_SIZE as u64 {
                (
                    SD_DEFAULT_BLOCK_SIZE as u64,
                    block_count * block_size / SD_DEFAULT_BLOCK_SIZE as u64,
                )
            } else {
                (block_size, block_count)
            }
        };
        (
            block_size as u32,
            u32::try_from(block_count).unwrap_or(u32::MAX),
        )
    }

    pub fn command_classes(&self) -> SdCardCmdClass {
        SdCardCmdClass::from_bits_truncate(self.card_command_classes)
    }

    pub fn is_write_protected(&self) -> bool {
        self.flags
            .intersects(CsdFlags::PERMANENT_WRITE_PROTECT | CsdFlags::TEMPORARY_WRITE_PROTECT)
    }

    /// Maximum bus clock advertised by TRAN_SPEED, 0 for a reserved rate unit.
    pub fn max_transfer_rate_hz(&self) -> u32 {
        let Some(&unit) = TRAN_SPEED_UNIT.get(usize::from(self.transfer_speed & 0x7)) else {
            return 0;
        };
        let mult = TRAN_SPEED_MULT[usize::from((self.transfer_speed >> 3) & 0xf)];
        unit / 10 * mult
    }
}
