use log::{error, trace, warn};

use crate::{
    card::{SdCard, status::CurrentState},
    common::commands::{Command, DataBuffer, DataDirection, DataFormat, DataTransfer},
    err::{SdError, SdResult},
    host::{HostCapability, SdHostOps},
    mci_core::SdHost,
};

impl<T: SdHostOps> SdHost<T> {
    /// Read blocks from the card in one transaction
    /// Parameters:
    /// - card: Card in the transfer state
    /// - buffer: Receives `count * block_size` bytes
    /// - start_block: First logical block
    /// - count: Number of blocks, at most the host's per-transaction limit
    pub fn read_blocks(
        &mut self,
        card: &SdCard,
        buffer: &mut [u8],
        start_block: u32,
        count: u32,
    ) -> SdResult {
        let len = self.check_request(card, buffer.len(), start_block, count)?;
        self.check_transaction_size(count)?;
        self.check_ready(card)?;

        let block_size = card.block_size();
        let address = card.block_address(start_block);
        let format = DataFormat::blocks(block_size, count, DataDirection::Read);
        let buffer = &mut buffer[..len];

        trace!("Reading {} blocks starting at address: {:#x}", count, address);

        let mut attempt = 0;
        loop {
            let cmd = Command::read_blocks(address, block_size, count);
            let mut xfer = DataTransfer::read(format, &mut *buffer);
            match self.execute_with_data(cmd, &mut xfer) {
                Ok(_) => break,
                Err(err) if attempt < self.config.transfer_retries() => {
                    attempt += 1;
                    warn!("read of block {} failed ({}), retrying", start_block, err);
                    self.abort_multi_block(count);
                }
                Err(err) => {
                    error!("read of block {} failed: {}", start_block, err);
                    return Err(SdError::ReadFailed);
                }
            }
        }

        self.finish_multi_block(count)
    }

    /// Write blocks to the card in one transaction
    /// Parameters:
    /// - card: Card in the transfer state
    /// - buffer: Holds `count * block_size` bytes
    /// - start_block: First logical block
    /// - count: Number of blocks, at most the host's per-transaction limit
    pub fn write_blocks(
        &mut self,
        card: &SdCard,
        buffer: &[u8],
        start_block: u32,
        count: u32,
    ) -> SdResult {
        let len = self.check_request(card, buffer.len(), start_block, count)?;
        self.check_transaction_size(count)?;
        if card.is_write_protected() {
            error!("card is write protected");
            return Err(SdError::NotSupported);
        }
        self.check_ready(card)?;

        let block_size = card.block_size();
        let address = card.block_address(start_block);
        let format = DataFormat::blocks(block_size, count, DataDirection::Write);
        let buffer = &buffer[..len];

        trace!("Writing {} blocks starting at address: {:#x}", count, address);

        let mut attempt = 0;
        loop {
            let cmd = Command::write_blocks(address, block_size, count);
            let mut xfer = DataTransfer::write(format, buffer);
            match self.execute_with_data(cmd, &mut xfer) {
                Ok(_) => break,
                Err(err) if attempt < self.config.transfer_retries() => {
                    attempt += 1;
                    warn!("write of block {} failed ({}), retrying", start_block, err);
                    self.abort_multi_block(count);
                }
                Err(err) => {
                    error!("write of block {} failed: {}", start_block, err);
                    return Err(SdError::WriteFailed);
                }
            }
        }

        self.finish_multi_block(count)?;
        self.wait_ready(card)
    }

    /// Erase `count` blocks from `start_block`: CMD32, CMD33, CMD38.
    pub fn erase_blocks(&mut self, card: &SdCard, start_block: u32, count: u32) -> SdResult {
        self.check_range(card, start_block, count)?;
        if card.is_write_protected() {
            error!("card is write protected");
            return Err(SdError::NotSupported);
        }
        self.check_ready(card)?;

        let start = card.block_address(start_block);
        let end = card.block_address(start_block + (count - 1));
        trace!("Erasing {:#x}..={:#x}", start, end);

        self.execute(Command::erase_start(start))
            .map_err(|err| erase_failed("CMD32", err))?;
        self.execute(Command::erase_end(end))
            .map_err(|err| erase_failed("CMD33", err))?;
        self.execute(Command::erase()).map_err(|err| match err {
            SdError::Timeout => SdError::Timeout,
            err => erase_failed("CMD38", err),
        })?;

        self.wait_ready(card)
    }

    /// Read or write any number of blocks, split into transactions no larger
    /// than the host's block count limit.
    ///
    /// Stops at the first failing chunk; chunks already moved stay moved.
    pub fn rw_blocks(
        &mut self,
        card: &SdCard,
        buffer: DataBuffer<'_>,
        start_block: u32,
        count: u32,
    ) -> SdResult {
        self.check_request(card, buffer.len(), start_block, count)?;

        let block_size = card.block_size() as usize;
        let max_count = self.host_ops.max_block_count();
        let mut block = start_block;
        let mut remaining = count;
        let mut offset = 0;

        match buffer {
            DataBuffer::Read(buf) => {
                while remaining > 0 {
                    let chunk = remaining.min(max_count);
                    let len = chunk as usize * block_size;
                    self.read_blocks(card, &mut buf[offset..offset + len], block, chunk)?;
                    offset += len;
                    block += chunk;
                    remaining -= chunk;
                }
            }
            DataBuffer::Write(buf) => {
                while remaining > 0 {
                    let chunk = remaining.min(max_count);
                    let len = chunk as usize * block_size;
                    self.write_blocks(card, &buf[offset..offset + len], block, chunk)?;
                    offset += len;
                    block += chunk;
                    remaining -= chunk;
                }
            }
        }
        Ok(())
    }

    /// Erase any number of blocks in chunks of the host's block count limit.
    pub fn format_blocks(&mut self, card: &SdCard, start_block: u32, count: u32) -> SdResult {
        self.check_range(card, start_block, count)?;

        let max_count = self.host_ops.max_block_count();
        let mut block = start_block;
        let mut remaining = count;
        while remaining > 0 {
            let chunk = remaining.min(max_count);
            self.erase_blocks(card, block, chunk)?;
            block += chunk;
            remaining -= chunk;
        }
        Ok(())
    }

    // Reject empty, out-of-range or undersized requests. Returns the byte length.
    fn check_request(
        &self,
        card: &SdCard,
        buffer_len: usize,
        start_block: u32,
        count: u32,
    ) -> SdResult<usize> {
        self.check_range(card, start_block, count)?;
        let len = count as usize * card.block_size() as usize;
        if buffer_len < len {
            error!("buffer holds {} bytes, request needs {}", buffer_len, len);
            return Err(SdError::NullArgument);
        }
        Ok(len)
    }

    fn check_range(&self, card: &SdCard, start_block: u32, count: u32) -> SdResult {
        if count == 0 {
            return Err(SdError::NullArgument);
        }
        let end = u64::from(start_block) + u64::from(count);
        if end > u64::from(card.block_count()) {
            error!(
                "blocks {}..{} beyond card end {}",
                start_block,
                end,
                card.block_count()
            );
            return Err(SdError::NullArgument);
        }
        Ok(())
    }

    fn check_transaction_size(&self, count: u32) -> SdResult {
        let max_count = self.host_ops.max_block_count();
        if count > max_count {
            error!("{} blocks exceed the host limit of {}", count, max_count);
            return Err(SdError::NullArgument);
        }
        Ok(())
    }

    // CMD13 before touching the data lines.
    fn check_ready(&mut self, card: &SdCard) -> SdResult {
        let status = self.card_status(card)?;
        if status.current_state() == CurrentState::Programming {
            return Err(SdError::Busy);
        }
        if !status.ready_for_data() {
            return Err(SdError::NotReady);
        }
        Ok(())
    }

    // CMD13 until programming has finished.
    fn wait_ready(&mut self, card: &SdCard) -> SdResult {
        let delay = self.config.busy_poll_delay();
        for _ in 0..self.config.status_poll_limit() {
            let status = self.card_status(card)?;
            if status.ready_for_data() && status.current_state() != CurrentState::Programming {
                return Ok(());
            }
            self.host_ops.sleep(delay);
        }
        Err(SdError::Timeout)
    }

    // Return the card to the transfer state before a multi-block command is
    // reissued. The retry reports its own outcome.
    fn abort_multi_block(&mut self, count: u32) {
        if let Err(err) = self.finish_multi_block(count) {
            warn!("stop before retry failed: {}", err);
        }
    }

    // CMD12 after a multi-block transfer unless the host sends it itself.
    fn finish_multi_block(&mut self, count: u32) -> SdResult {
        if count <= 1
            || self
                .host_ops
                .capability()
                .contains(HostCapability::AUTO_CMD12)
        {
            return Ok(());
        }

        self.stop_transmission().map_err(|err| {
            error!("stop transmission failed: {}", err);
            match err {
                SdError::Timeout => SdError::Timeout,
                _ => SdError::StopFailed,
            }
        })
    }
}

fn erase_failed(step: &str, err: SdError) -> SdError {
    error!("{} failed: {}", step, err);
    SdError::EraseFailed
}
