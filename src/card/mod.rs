pub mod cid;
pub mod csd;
pub mod scr;
pub mod status;

use cid::SdCid;
use csd::SdCsd;
use log::debug;
use scr::SdScr;

use crate::constants::SD_DEFAULT_BLOCK_SIZE;
use crate::host::BusWidth;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Voltage {
    V3_3,
    V1_8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SdVersion {
    V1_0,
    V1_1,
    V2_0,
    V3_0,
}

/// Protocol progress of a card. Only moves forward, except the explicit
/// rollback to `StandBy` and a fresh detect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum CardState {
    PoweredOff,
    Idle,
    /// OCR known.
    Ready,
    /// CID and RCA known.
    Identified,
    StandBy,
    Transfer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusTiming {
    Default,
    HighSpeed,
}

/// Negotiated state of one attached card.
#[derive(Debug, Clone)]
pub struct SdCard {
    ocr: u32,
    cid: SdCid,
    csd: SdCsd,
    scr: SdScr,
    relative_address: u16,
    voltage: Voltage,
    version: SdVersion,
    block_size: u32,
    block_count: u32,
    capacity_bytes: u64,
    bus_width: BusWidth,
    timing: BusTiming,
    state: CardState,
}

impl Default for SdCard {
    fn default() -> Self {
        Self::new()
    }
}

impl SdCard {
    pub fn new() -> Self {
        SdCard {
            ocr: 0,
            cid: SdCid::new(),
            csd: SdCsd::new(),
            scr: SdScr::new(),
            relative_address: 0,
            voltage: Voltage::V3_3,
            version: SdVersion::V1_0,
            block_size: SD_DEFAULT_BLOCK_SIZE,
            block_count: 0,
            capacity_bytes: 0,
            bus_width: BusWidth::Width1,
            timing: BusTiming::Default,
            state: CardState::PoweredOff,
        }
    }

    pub fn ocr(&self) -> u32 {
        self.ocr
    }

    pub fn cid(&self) -> &SdCid {
        &self.cid
    }

    pub fn csd(&self) -> &SdCsd {
        &self.csd
    }

    pub fn scr(&self) -> &SdScr {
        &self.scr
    }

    pub fn relative_address(&self) -> u16 {
        self.relative_address
    }

    pub fn voltage(&self) -> Voltage {
        self.voltage
    }

    pub fn version(&self) -> SdVersion {
        self.version
    }

    pub fn block_size(&self) -> u32 {
        self.block_size
    }

    pub fn block_count(&self) -> u32 {
        self.block_count
    }

    pub fn capacity_bytes(&self) -> u64 {
        self.capacity_bytes
    }

    pub fn bus_width(&self) -> BusWidth {
        self.bus_width
    }

    pub fn timing(&self) -> BusTiming {
        self.timing
    }

    pub fn state(&self) -> CardState {
        self.state
    }

    /// Block-addressed card (CSD structure 1 and above).
    pub fn is_high_capacity(&self) -> bool {
        self.csd.is_high_capacity()
    }

    pub fn is_write_protected(&self) -> bool {
        self.csd.is_write_protected()
    }

    /// Command argument addressing `block`: a block index on SDHC/SDXC, a byte
    /// offset on SDSC.
    pub fn block_address(&self, block: u32) -> u32 {
        if self.is_high_capacity() {
            block
        } else {
            block.wrapping_mul(self.block_size)
        }
    }

    pub(crate) fn reset(&mut self) {
        *self = SdCard::new();
        self.state = CardState::Idle;
    }

    pub(crate) fn set_ocr(&mut self, ocr: u32) {
        self.ocr = ocr;
    }

    pub(crate) fn set_cid(&mut self, words: &[u32]) {
        self.cid = SdCid::decode(words);
        debug!("CID: {:?}", self.cid);
    }

    /// Decode the CSD and recompute geometry and capacity together.
    pub(crate) fn set_csd(&mut self, words: &[u32]) {
        self.csd = SdCsd::decode(words);
        let (block_size, block_count) = self.csd.geometry();
        self.block_size = block_size;
        self.block_count = block_count;
        self.capacity_bytes = u64::from(block_count) * u64::from(block_size);
        debug!(
            "CSD: structure {}, {} blocks of {} bytes",
            self.csd.csd_structure, block_count, block_size
        );
    }

    pub(crate) fn set_scr(&mut self, words: &[u32]) {
        self.scr = SdScr::decode(words);
        self.version = self.scr.version();
        debug!("SCR: {:?}", self.scr);
    }

    pub(crate) fn set_relative_address(&mut self, rca: u16) {
        self.relative_address = rca;
    }

    pub(crate) fn set_voltage(&mut self, voltage: Voltage) {
        self.voltage = voltage;
    }

    pub(crate) fn set_version(&mut self, version: SdVersion) {
        self.version = version;
    }

    pub(crate) fn set_bus_width(&mut self, width: BusWidth) {
        self.bus_width = width;
    }

    pub(crate) fn set_timing(&mut self, timing: BusTiming) {
        self.timing = timing;
    }

    pub(crate) fn advance(&mut self, state: CardState) {
        debug_assert!(state >= self.state, "{:?} -> {:?}", self.state, state);
        self.state = state;
    }

    /// Deselected after a failed bring-up; nothing negotiated on the bus is kept.
    pub(crate) fn rollback_to_standby(&mut self) {
        self.state = CardState::StandBy;
        self.timing = BusTiming::Default;
    }

    /// Re-express the capacity in blocks of `block_size` bytes.
    pub(crate) fn set_block_len(&mut self, block_size: u32) {
        if block_size == 0 || block_size == self.block_size {
            return;
        }
        self.block_size = block_size;
        self.block_count = u32::try_from(self.capacity_bytes / u64::from(block_size))
            .unwrap_or(u32::MAX);
        self.capacity_bytes = u64::from(self.block_count) * u64::from(block_size);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SDSC_CSD: [u32; 4] = [0x0026_0032, 0x5f59_83c8, 0xaddb_cfff, 0xd240_40a5];
    const SDHC_CSD: [u32; 4] = [0x400e_0032, 0x5b59_0000, 0x1010_7f80, 0x0a40_008b];

    #[test]
    fn byte_addressing_on_standard_capacity() {
        let mut card = SdCard::new();
        card.set_csd(&SDSC_CSD);
        assert!(!card.is_high_capacity());
        assert_eq!(card.block_address(10), 5120);
    }

    #[test]
    fn block_addressing_on_high_capacity() {
        let mut card = SdCard::new();
        card.set_csd(&SDHC_CSD);
        assert!(card.is_high_capacity());
        assert_eq!(card.block_address(10), 10);
    }

    #[test]
    fn capacity_tracks_csd() {
        let mut card = SdCard::new();
        card.set_csd(&SDHC_CSD);
        assert_eq!(card.capacity_bytes(), (0x1010 + 1) * 1024 * 512);
        assert_eq!(
            card.capacity_bytes(),
            u64::from(card.block_count()) * u64::from(card.block_size())
        );

        card.set_csd(&SDSC_CSD);
        assert_eq!(card.block_count(), 1_984_000);
        assert_eq!(card.capacity_bytes(), 1_015_808_000);
    }

    #[test]
    fn block_len_keeps_capacity_consistent() {
        let mut card = SdCard::new();
        card.set_csd(&SDSC_CSD);
        card.set_block_len(1024);
        assert_eq!(card.block_size(), 1024);
        assert_eq!(card.block_count(), 992_000);
        assert_eq!(card.capacity_bytes(), 1_015_808_000);
        assert_eq!(card.block_address(3), 3072);
    }

    #[test]
    fn rollback_drops_high_speed_timing() {
        let mut card = SdCard::new();
        card.advance(CardState::StandBy);
        card.set_timing(BusTiming::HighSpeed);
        card.rollback_to_standby();
        assert_eq!(card.state(), CardState::StandBy);
        assert_eq!(card.timing(), BusTiming::Default);
    }

    #[test]
    fn reset_returns_to_idle() {
        let mut card = SdCard::new();
        card.set_relative_address(0x1234);
        card.advance(CardState::Transfer);
        card.reset();
        assert_eq!(card.state(), CardState::Idle);
        assert_eq!(card.relative_address(), 0);
    }
}
