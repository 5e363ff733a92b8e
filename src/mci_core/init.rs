use log::{error, info, warn};

use crate::{
    card::{CardState, SdCard, SdVersion},
    constants::*,
    err::{SdError, SdResult},
    host::{BusWidth, HostCapability, SdHostOps},
    mci_core::SdHost,
};

impl<T: SdHostOps> SdHost<T> {
    /// Power-up identification: CMD0, CMD8, ACMD41, optional CMD11, CMD2, CMD3.
    ///
    /// `card` is reset first. On success it holds the OCR, CID and RCA and is
    /// in the `Identified` state. Any failure leaves the card unusable until
    /// the next detect from power-on.
    pub fn detect(&mut self, card: &mut SdCard) -> SdResult {
        info!("SD card detect started");

        if !self.host_ops.is_insert() {
            error!("no card inserted");
            return Err(SdError::NotReady);
        }

        card.reset();

        self.host_ops.set_bus_width(BusWidth::Width1);
        self.host_ops.set_clock_frequency(self.config.init_clock_hz());
        if !self.host_ops.card_active(self.config.init_clocks()) {
            error!("card did not accept initialization clocks");
            return Err(SdError::NotReady);
        }

        // CMD0: Put card into idle state
        self.go_idle()?;

        // CMD8: SD 2.0+ cards answer with the echoed pattern
        let sd_v2 = match self.send_if_cond() {
            Ok(()) => true,
            Err(err) => {
                warn!("CMD8 failed ({}), continuing as SD 1.x", err);
                self.go_idle()?;
                false
            }
        };
        card.set_version(if sd_v2 {
            SdVersion::V2_0
        } else {
            SdVersion::V1_0
        });

        let host_1v8 = self.host_ops.capability().contains(HostCapability::VOLTAGE_1V8);
        let mut request = OCR_VDD_27_36;
        if sd_v2 {
            request |= OCR_HCS;
        }
        if host_1v8 {
            request |= OCR_S18;
        }

        // ACMD41: wait for power-up to complete
        let ocr = self.send_op_cond(card, request)?;

        if host_1v8 && ocr & OCR_S18 != 0 {
            info!("switching signalling to 1.8V");
            if let Err(err) = self.voltage_switch(card) {
                error!("voltage switch failed: {}", err);
                return Err(err);
            }
        }

        // CMD2: Request CID
        self.all_send_cid(card)?;

        // CMD3: Publish RCA
        self.send_relative_addr(card)?;

        card.advance(CardState::Identified);
        info!(
            "SD card identified: {} RCA {:#06x} {:?}",
            card.cid().product_name(),
            card.relative_address(),
            card.voltage()
        );
        Ok(())
    }

    /// Bring an identified card to the transfer state.
    ///
    /// Once the card is selected any failure deselects it again with CMD7(0)
    /// before the error is returned, leaving it in `StandBy`.
    pub fn to_normal(&mut self, card: &mut SdCard) -> SdResult {
        if card.state() != CardState::Identified {
            error!("to_normal on a card in state {:?}", card.state());
            return Err(SdError::NotReady);
        }

        // CMD9: Read CSD
        self.send_csd(card)?;
        card.advance(CardState::StandBy);

        let hz = self.config.operating_clock_hz();
        self.host_ops.set_clock_frequency(hz);

        // CMD7: Select the card
        self.select_card(card)?;

        if let Err(err) = self.configure_selected(card) {
            warn!("card configuration failed ({}), deselecting", err);
            if let Err(deselect_err) = self.deselect() {
                error!("deselect after failure also failed: {}", deselect_err);
            }
            card.rollback_to_standby();
            return Err(err);
        }

        card.advance(CardState::Transfer);
        info!(
            "SD card ready: {:?} {} blocks of {} bytes, {:?} bus, {:?} timing",
            card.version(),
            card.block_count(),
            card.block_size(),
            card.bus_width(),
            card.timing()
        );
        Ok(())
    }

    // Steps run while the card is selected; any error triggers the rollback.
    fn configure_selected(&mut self, card: &mut SdCard) -> SdResult {
        // ACMD42: Disconnect DAT3 pull-up
        self.set_clr_card_detect(card)?;

        // ACMD51: Read SCR
        self.send_scr(card)?;

        self.select_bus_width(card)?;
        self.select_functions(card)?;

        // CMD16: Fix the block length
        let block_size = self.config.block_size();
        if card.is_high_capacity() && block_size != SD_DEFAULT_BLOCK_SIZE {
            error!("block-addressed cards only take {} byte blocks", SD_DEFAULT_BLOCK_SIZE);
            return Err(SdError::NotSupported);
        }
        self.set_block_len(block_size)?;
        card.set_block_len(block_size);
        Ok(())
    }
}
