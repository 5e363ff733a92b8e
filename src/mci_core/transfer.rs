use log::{debug, trace};

use crate::{
    common::commands::{Command, DataDirection, DataTransfer, ResponseType},
    err::{SdError, SdResult},
    host::SdHostOps,
    mci_core::SdHost,
};

impl<T: SdHostOps> SdHost<T> {
    // Frame, send and collect the response of one command.
    fn issue(&mut self, cmd: &mut Command) -> SdResult {
        self.host_ops.add_head_tail(cmd);
        debug!(
            "CMD{} arg {:#010x} resp {:?}",
            cmd.opcode(),
            cmd.argument,
            cmd.response_type
        );

        self.host_ops.send_command(cmd)?;

        if cmd.response_type != ResponseType::None {
            self.host_ops.receive_response(cmd);
            trace!(
                "CMD{} response {:#010x} {:#010x} {:#010x} {:#010x}",
                cmd.opcode(),
                cmd.response[0],
                cmd.response[1],
                cmd.response[2],
                cmd.response[3]
            );
        }

        if cmd.response_type.carries_card_status() {
            let status = cmd.card_status();
            if status.has_error() {
                debug!("CMD{} card status errors {:?}", cmd.opcode(), status.errors());
                return Err(SdError::CardError(status));
            }
        }

        Ok(())
    }

    /// Send one command and return it with its response filled in.
    ///
    /// R1/R1b error bits fail with `CardError`; host I/O errors pass through
    /// unchanged as `HostFault`. An R1b command additionally waits for the
    /// card to release DAT0.
    pub fn execute(&mut self, mut cmd: Command) -> SdResult<Command> {
        self.issue(&mut cmd)?;
        if cmd.response_type == ResponseType::R1b {
            self.wait_while_busy()?;
        }
        Ok(cmd)
    }

    /// Send a command that carries a data phase.
    ///
    /// The transfer descriptor is handed to the host before the command goes
    /// out, then the data phase runs in the direction of the buffer.
    pub fn execute_with_data(
        &mut self,
        mut cmd: Command,
        xfer: &mut DataTransfer<'_>,
    ) -> SdResult<Command> {
        cmd.data = Some(xfer.format);
        self.host_ops.setup_dma(xfer);
        self.issue(&mut cmd)?;

        trace!(
            "CMD{} data phase {:?} {}x{}",
            cmd.opcode(),
            xfer.format.direction,
            xfer.format.block_count,
            xfer.format.block_size
        );
        match xfer.format.direction {
            DataDirection::Read => self.host_ops.receive_data(xfer)?,
            DataDirection::Write => self.host_ops.send_data(xfer)?,
        }

        if cmd.response_type == ResponseType::R1b {
            self.wait_while_busy()?;
        }
        Ok(cmd)
    }

    /// CMD55: the next command is an application command.
    pub fn app_command(&mut self, rca: u16) -> SdResult {
        let cmd = self.execute(Command::app_cmd(rca))?;
        if !cmd.card_status().app_cmd_enabled() {
            debug!("CMD55 accepted but APP_CMD not set");
            return Err(SdError::NotSupported);
        }
        Ok(())
    }

    pub fn execute_app(&mut self, cmd: Command, rca: u16) -> SdResult<Command> {
        self.app_command(rca)?;
        self.execute(cmd)
    }

    pub fn execute_app_with_data(
        &mut self,
        cmd: Command,
        rca: u16,
        xfer: &mut DataTransfer<'_>,
    ) -> SdResult<Command> {
        self.app_command(rca)?;
        self.execute_with_data(cmd, xfer)
    }

    /// Repeat the whole CMD55 + ACMD pair until `ready` accepts the response.
    ///
    /// Bounded by the configured app command retry count, sleeping the
    /// configured delay between attempts. Hard failures of either command end
    /// the loop at once.
    pub fn execute_app_until<B, R>(&mut self, build: B, rca: u16, ready: R) -> SdResult<Command>
    where
        B: Fn() -> Command,
        R: Fn(&Command) -> bool,
    {
        let retries = self.config.app_cmd_retries();
        let delay = self.config.app_cmd_retry_delay();

        for attempt in 1..=retries {
            let cmd = self.execute_app(build(), rca)?;
            if ready(&cmd) {
                trace!("ACMD{} ready after {} attempts", cmd.opcode(), attempt);
                return Ok(cmd);
            }
            if attempt < retries {
                self.host_ops.sleep(delay);
            }
        }

        debug!("app command not ready after {} attempts", retries);
        Err(SdError::Timeout)
    }

    /// Poll the host's busy line after an R1b response.
    pub(crate) fn wait_while_busy(&mut self) -> SdResult {
        let limit = self.config.busy_poll_limit();
        let delay = self.config.busy_poll_delay();

        let mut polls = 0;
        while self.host_ops.card_busy() {
            if polls >= limit {
                debug!("card still busy after {} polls", limit);
                return Err(SdError::Timeout);
            }
            polls += 1;
            self.host_ops.sleep(delay);
        }
        Ok(())
    }
}
