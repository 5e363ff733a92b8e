use alloc::vec::Vec;

use log::{debug, info, warn};

use crate::{
    card::{
        CardState, SdCard, Voltage,
        status::{CardStatus, SwitchStatus},
    },
    common::commands::{Command, DataFormat, DataTransfer},
    constants::*,
    err::{SdError, SdResult},
    host::SdHostOps,
    mci_core::SdHost,
    tools::be_words,
};

// Zeroed scratch buffer for register reads over the data lines.
fn scratch(len: usize) -> SdResult<Vec<u8>> {
    let mut buf = Vec::new();
    buf.try_reserve_exact(len).map_err(|_| SdError::NoMemory)?;
    buf.resize(len, 0);
    Ok(buf)
}

// R6 packs status bits 23, 22, 19 and 12:0 into its low half.
fn r6_card_status(response: u32) -> CardStatus {
    let bits = (response & 0x1fff) | ((response & 0xc000) << 8) | ((response & 0x2000) << 6);
    CardStatus::from_bits_retain(bits)
}

impl<T: SdHostOps> SdHost<T> {
    // CMD0
    pub(crate) fn go_idle(&mut self) -> SdResult {
        self.execute(Command::go_idle())?;
        Ok(())
    }

    // CMD8, fails with ChecksumOrPatternMismatch if the echo differs
    pub(crate) fn send_if_cond(&mut self) -> SdResult {
        let cmd = self.execute(Command::send_if_cond())?;
        let echo = cmd.response[0] & SD_IF_COND_ECHO_MASK;
        if echo != SD_IF_COND_ARG {
            debug!("CMD8 echo {:#x}, expected {:#x}", echo, SD_IF_COND_ARG);
            return Err(SdError::ChecksumOrPatternMismatch);
        }
        Ok(())
    }

    // ACMD41 until the card reports power-up complete
    pub(crate) fn send_op_cond(&mut self, card: &mut SdCard, request: u32) -> SdResult<u32> {
        let cmd = self.execute_app_until(
            || Command::app_send_op_cond(request),
            0,
            |cmd| cmd.response[0] & OCR_BUSY != 0,
        )?;
        let ocr = cmd.response[0];
        card.set_ocr(ocr);
        card.advance(CardState::Ready);
        info!("card OCR {:#010x}", ocr);
        Ok(ocr)
    }

    // CMD11, then the host rails move to 1.8 V
    pub(crate) fn voltage_switch(&mut self, card: &mut SdCard) -> SdResult {
        self.execute(Command::voltage_switch())?;
        self.host_ops.switch_voltage(Voltage::V1_8)?;
        card.set_voltage(Voltage::V1_8);
        Ok(())
    }

    // CMD2
    pub(crate) fn all_send_cid(&mut self, card: &mut SdCard) -> SdResult {
        let cmd = self.execute(Command::all_send_cid())?;
        card.set_cid(&cmd.response);
        Ok(())
    }

    // CMD3
    pub(crate) fn send_relative_addr(&mut self, card: &mut SdCard) -> SdResult {
        let cmd = self.execute(Command::send_relative_addr())?;
        let response = cmd.response[0];

        if response & R6_ERROR_MASK != 0 {
            return Err(SdError::CardError(r6_card_status(response)));
        }

        let rca = (response >> R6_RCA_SHIFT) as u16;
        if rca == 0 {
            warn!("card published RCA 0");
            return Err(SdError::NotReady);
        }

        card.set_relative_address(rca);
        debug!("card RCA {:#06x}", rca);
        Ok(())
    }

    // CMD9
    pub(crate) fn send_csd(&mut self, card: &mut SdCard) -> SdResult {
        let cmd = self.execute(Command::send_csd(card.relative_address()))?;
        card.set_csd(&cmd.response);
        Ok(())
    }

    // CMD7
    pub(crate) fn select_card(&mut self, card: &SdCard) -> SdResult {
        self.execute(Command::select_card(card.relative_address()))?;
        Ok(())
    }

    /// CMD7 with RCA 0: park every card in stand-by.
    pub fn deselect(&mut self) -> SdResult {
        self.execute(Command::deselect_card())?;
        Ok(())
    }

    // ACMD42, disconnect the DAT3 pull-up for data transfer
    pub(crate) fn set_clr_card_detect(&mut self, card: &SdCard) -> SdResult {
        self.execute_app(
            Command::app_set_clr_card_detect(false),
            card.relative_address(),
        )?;
        Ok(())
    }

    // ACMD51
    pub(crate) fn send_scr(&mut self, card: &mut SdCard) -> SdResult {
        let mut raw = scratch(SD_SCR_LEN)?;
        let mut xfer = DataTransfer::read(DataFormat::raw_read(SD_SCR_LEN), &mut raw);
        self.execute_app_with_data(Command::app_send_scr(), card.relative_address(), &mut xfer)?;

        let words: [u32; 2] = be_words(&raw);
        card.set_scr(&words);
        Ok(())
    }

    // ACMD6
    pub(crate) fn app_set_bus_width(&mut self, card: &SdCard, width_code: u32) -> SdResult {
        self.execute_app(
            Command::app_set_bus_width(width_code),
            card.relative_address(),
        )?;
        Ok(())
    }

    // CMD6, returns the decoded status block
    pub(crate) fn switch_func(
        &mut self,
        mode: u32,
        group: u8,
        function: u8,
    ) -> SdResult<SwitchStatus> {
        let mut raw = scratch(SD_SWITCH_STATUS_LEN)?;
        let mut xfer = DataTransfer::read(DataFormat::raw_read(SD_SWITCH_STATUS_LEN), &mut raw);
        self.execute_with_data(Command::switch_func(mode, group, function), &mut xfer)?;

        let mut block = [0u8; SD_SWITCH_STATUS_LEN];
        block.copy_from_slice(&raw);
        Ok(SwitchStatus::decode(&block))
    }

    // CMD16
    pub(crate) fn set_block_len(&mut self, block_len: u32) -> SdResult {
        self.execute(Command::set_block_len(block_len))?;
        Ok(())
    }

    /// CMD13: current card status.
    pub fn card_status(&mut self, card: &SdCard) -> SdResult<CardStatus> {
        let cmd = self.execute(Command::send_status(card.relative_address()))?;
        Ok(cmd.card_status())
    }

    // CMD12
    pub(crate) fn stop_transmission(&mut self) -> SdResult {
        self.execute(Command::stop_transmission())?;
        Ok(())
    }
}
