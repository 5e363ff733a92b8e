use bitflags::bitflags;

use super::SdVersion;
use crate::constants::{SCR_BUS_WIDTH_1BIT, SCR_BUS_WIDTH_4BIT};
use crate::tools::{extract_bits, left_aligned};

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SdScr {
    // SCR Structure [63:60]
    pub scr_structure: u8,
    // SD memory card specification version [59:56]
    pub sd_specification: u8,
    pub flags: ScrFlags,
    // Security specification supported [54:52]
    pub sd_security: u8,
    // Data bus widths supported [51:48]
    pub sd_bus_widths: u8,
    // Extended security support [46:43]
    pub extended_security: u8,
    // Command support bits [33:32] 33-support CMD23, 32-support cmd20
    pub command_support: u8,
    // Reserved for manufacturer usage [31:0]
    pub reserved_for_manufacturer: u32,
}

bitflags! {
    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
    pub struct ScrFlags: u16 {
        const DATA_STATUS_AFTER_ERASE = 1 << 0; /* Data status after erases [55:55] */
        const SD_SPECIFICATION3 = 1 << 1; /* SD specification 3.00 or higher [47:47] */
    }
}

impl SdScr {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode the SCR from two big-endian words, `words[0]` = bits [63:32].
    pub fn decode(words: &[u32]) -> Self {
        let words: [u32; 2] = left_aligned(words);
        let words = &words[..];
        let mut flags = ScrFlags::empty();
        if extract_bits(words, 55, 1) != 0 {
            flags |= ScrFlags::DATA_STATUS_AFTER_ERASE;
        }
        if extract_bits(words, 47, 1) != 0 {
            flags |= ScrFlags::SD_SPECIFICATION3;
        }

        SdScr {
            scr_structure: extract_bits(words, 60, 4) as u8,
            sd_specification: extract_bits(words, 56, 4) as u8,
            flags,
            sd_security: extract_bits(words, 52, 3) as u8,
            sd_bus_widths: extract_bits(words, 48, 4) as u8,
            extended_security: extract_bits(words, 43, 4) as u8,
            command_support: extract_bits(words, 32, 2) as u8,
            reserved_for_manufacturer: extract_bits(words, 0, 32),
        }
    }

    pub fn supports_bus_width_1(&self) -> bool {
        self.sd_bus_widths & SCR_BUS_WIDTH_1BIT != 0
    }

    pub fn supports_bus_width_4(&self) -> bool {
        self.sd_bus_widths & SCR_BUS_WIDTH_4BIT != 0
    }

    pub fn supports_cmd23(&self) -> bool {
        self.command_support & 0x2 != 0
    }

    pub fn version(&self) -> SdVersion {
        match self.sd_specification {
            0 => SdVersion::V1_0,
            1 => SdVersion::V1_1,
            _ if self.flags.contains(ScrFlags::SD_SPECIFICATION3) => SdVersion::V3_0,
            _ => SdVersion::V2_0,
        }
    }
}
