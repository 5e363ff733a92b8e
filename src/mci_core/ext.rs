use log::{debug, error, info};

use crate::{
    card::{BusTiming, SdCard, SdVersion, csd::SdCardCmdClass},
    constants::*,
    err::{SdError, SdResult},
    host::{BusWidth, HostCapability, SdHostOps},
    mci_core::SdHost,
};

impl<T: SdHostOps> SdHost<T> {
    /// Move card and host to the 4-bit data bus.
    ///
    /// Both sides must support it; staying on a 1-bit bus is not an option.
    pub(crate) fn select_bus_width(&mut self, card: &mut SdCard) -> SdResult {
        let host_4bit = self
            .host_ops
            .capability()
            .contains(HostCapability::BUS_WIDTH_4BIT);
        let card_4bit = card.scr().supports_bus_width_4();

        if !(host_4bit && card_4bit) {
            error!(
                "4-bit bus unavailable (host {}, card {})",
                host_4bit, card_4bit
            );
            return Err(SdError::NotSupported);
        }

        // ACMD6: Switch the card first, then the host
        self.app_set_bus_width(card, SD_BUS_WIDTH_CODE_4BIT)?;
        self.host_ops.set_bus_width(BusWidth::Width4);
        card.set_bus_width(BusWidth::Width4);
        debug!("bus width set to 4");
        Ok(())
    }

    /// CMD6 selections: High-Speed access mode, default driver strength and
    /// default current limit.
    ///
    /// Timing and clock change only once all three are selected, so a failure
    /// leaves the host at the default-speed clock.
    pub(crate) fn select_functions(&mut self, card: &mut SdCard) -> SdResult {
        if card.version() < SdVersion::V1_1
            || !card.csd().command_classes().contains(SdCardCmdClass::SWITCH)
        {
            error!("card does not implement CMD6");
            return Err(SdError::NotSupported);
        }

        self.switch_function(SD_GROUP_ACCESS_MODE, SD_ACCESS_MODE_HIGH_SPEED)?;
        self.switch_function(SD_GROUP_DRIVER_STRENGTH, SD_DRIVER_STRENGTH_TYPE_B)?;
        self.switch_function(SD_GROUP_CURRENT_LIMIT, SD_CURRENT_LIMIT_200MA)?;

        card.set_timing(BusTiming::HighSpeed);
        let caps = self.host_ops.capability();
        if caps.contains(HostCapability::HIGH_SPEED) {
            let hz = self.config.high_speed_clock_hz();
            self.host_ops.set_clock_frequency(hz);
        }
        info!("card switched to high speed");
        Ok(())
    }

    /// Check that `function` of `group` is available, then select it and
    /// verify the card reports it as selected.
    pub(crate) fn switch_function(&mut self, group: u8, function: u8) -> SdResult {
        let status = self.switch_func(SD_SWITCH_MODE_CHECK, group, function)?;
        if !status.supports(group, function) || status.selected(group) != Some(function) {
            debug!(
                "group {} function {} not offered, support {:#06x}",
                group,
                function,
                status.support[usize::from(group) - 1]
            );
            return Err(SdError::NotSupported);
        }

        let status = self.switch_func(SD_SWITCH_MODE_SET, group, function)?;
        if status.selected(group) != Some(function) {
            debug!(
                "group {} reports function {:?} after selecting {}",
                group,
                status.selected(group),
                function
            );
            return Err(SdError::NotSupported);
        }
        Ok(())
    }
}
