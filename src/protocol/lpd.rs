//! LPD print job interception.
//!
//! The LPD protocol is defined in RFC 1179. Only the "receive a printer job"
//! command is interpreted: its data file sub-commands are concatenated into the
//! stored job, control files are logged and every other top-level command is
//! ignored.

use async_trait::async_trait;
use log::{debug, error, info, warn};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt};

use super::engine::{JobContext, JobOutcome, ProtocolEngine};
use crate::configuration::types::Port;
use crate::error_handling::types::ProtocolError;

pub const LPD_OP_JOB: u8 = 0x02;

pub const LPD_OP_JOB_ABORT: u8 = 0x01;
pub const LPD_OP_JOB_CTRL: u8 = 0x02;
pub const LPD_OP_JOB_DATA: u8 = 0x03;

/// Parse phase of an [`LpdEngine`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LpdPhase {
    AwaitTopCommand,
    JobOpen,
    SubcommandLoop,
    JobComplete,
    JobAborted,
    Ignored,
}

/// One opcode byte followed by its whitespace-separated argument line.
#[derive(Debug)]
struct Command {
    opcode: u8,
    args: Vec<Vec<u8>>,
}

impl Command {
    fn arg(&self, index: usize) -> String {
        self.args
            .get(index)
            .map(|a| String::from_utf8_lossy(a).into_owned())
            .unwrap_or_default()
    }

    fn count(&self) -> Result<u64, ProtocolError> {
        let raw = self.args.first().map(Vec::as_slice).unwrap_or_default();
        let malformed = || ProtocolError::MalformedCount(String::from_utf8_lossy(raw).into_owned());
        if raw.is_empty() || !raw.iter().all(u8::is_ascii_digit) {
            return Err(malformed());
        }
        std::str::from_utf8(raw)
            .ok()
            .and_then(|s| s.parse().ok())
            .ok_or_else(malformed)
    }
}

/// Sub-command whose body is being read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingSubcommand {
    pub opcode: u8,
    pub count: u64,
}

/// RFC 1179 job reconstruction state machine.
#[derive(Debug)]
pub struct LpdEngine {
    phase: LpdPhase,
    output: Vec<u8>,
    pending: Option<PendingSubcommand>,
}

impl Default for LpdEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl LpdEngine {
    pub fn new() -> Self {
        Self {
            phase: LpdPhase::AwaitTopCommand,
            output: Vec::new(),
            pending: None,
        }
    }

    pub fn boxed() -> Box<dyn ProtocolEngine> {
        Box::new(Self::new())
    }

    /// The well-known `printer` service.
    pub fn default_port() -> Port {
        Port::Service("printer".to_string())
    }

    pub fn phase(&self) -> LpdPhase {
        self.phase
    }

    pub fn pending(&self) -> Option<PendingSubcommand> {
        self.pending
    }

    async fn read_command(
        reader: &mut (dyn AsyncBufRead + Unpin + Send),
    ) -> Result<Option<Command>, ProtocolError> {
        let mut opcode = [0u8; 1];
        if reader.read(&mut opcode).await? == 0 {
            return Ok(None);
        }
        let mut line = Vec::new();
        reader.read_until(b'\n', &mut line).await?;
        if line.last() != Some(&b'\n') {
            return Err(ProtocolError::Truncated("command line"));
        }
        let args = line
            .split(u8::is_ascii_whitespace)
            .filter(|a| !a.is_empty())
            .map(<[u8]>::to_vec)
            .collect();
        Ok(Some(Command {
            opcode: opcode[0],
            args,
        }))
    }

    async fn run_job(
        &mut self,
        reader: &mut (dyn AsyncBufRead + Unpin + Send),
        ctx: &JobContext<'_>,
    ) -> Result<JobOutcome, ProtocolError> {
        self.output.clear();
        self.phase = LpdPhase::SubcommandLoop;
        loop {
            let Some(command) = Self::read_command(reader).await? else {
                let digest = ctx.storage.store(&self.output)?;
                self.output.clear();
                self.phase = LpdPhase::JobComplete;
                return Ok(JobOutcome::Completed(digest));
            };
            if command.opcode == LPD_OP_JOB_ABORT {
                info!("[{}] cancelled", ctx.session);
                self.output.clear();
                self.phase = LpdPhase::JobAborted;
                return Ok(JobOutcome::Aborted);
            }

            let pending = PendingSubcommand {
                opcode: command.opcode,
                count: command.count()?,
            };
            self.pending = Some(pending);
            match pending.opcode {
                LPD_OP_JOB_DATA => {
                    debug!(
                        "[{}] data file {} ({} bytes)",
                        ctx.session,
                        command.arg(1),
                        pending.count
                    );
                    let before = self.output.len();
                    (&mut *reader)
                        .take(pending.count)
                        .read_to_end(&mut self.output)
                        .await?;
                    if ((self.output.len() - before) as u64) < pending.count {
                        return Err(ProtocolError::Truncated("data file"));
                    }
                }
                LPD_OP_JOB_CTRL => {
                    let mut control = Vec::new();
                    (&mut *reader)
                        .take(pending.count)
                        .read_to_end(&mut control)
                        .await?;
                    if (control.len() as u64) < pending.count {
                        return Err(ProtocolError::Truncated("control file"));
                    }
                    debug!(
                        "[{}] control file: {}",
                        ctx.session,
                        String::from_utf8_lossy(&control)
                    );
                }
                opcode => {
                    let skipped = tokio::io::copy(
                        &mut (&mut *reader).take(pending.count),
                        &mut tokio::io::sink(),
                    )
                    .await?;
                    if skipped < pending.count {
                        return Err(ProtocolError::Truncated("sub-command body"));
                    }
                    error!("[{}] unrecognised opcode {}", ctx.session, opcode);
                }
            }

            let mut terminator = [0u8; 1];
            if reader.read(&mut terminator).await? == 0 {
                return Err(ProtocolError::Truncated("sub-command terminator"));
            }
            if terminator[0] != 0 {
                warn!(
                    "[{}] sub-command terminated by {:#04x} instead of NUL",
                    ctx.session, terminator[0]
                );
            }
            self.pending = None;
        }
    }
}

#[async_trait]
impl ProtocolEngine for LpdEngine {
    async fn intercept(
        &mut self,
        reader: &mut (dyn AsyncBufRead + Unpin + Send),
        ctx: &JobContext<'_>,
    ) -> Result<JobOutcome, ProtocolError> {
        self.phase = LpdPhase::AwaitTopCommand;
        self.pending = None;

        let Some(command) = Self::read_command(reader).await? else {
            debug!("[{}] no command received", ctx.session);
            return Ok(JobOutcome::Idle);
        };
        if command.opcode != LPD_OP_JOB {
            info!("[{}] ignoring non-job opcode {}", ctx.session, command.opcode);
            self.phase = LpdPhase::Ignored;
            return Ok(JobOutcome::Ignored {
                opcode: command.opcode,
            });
        }

        info!("[{}] receiving job for queue {:?}", ctx.session, command.arg(0));
        self.phase = LpdPhase::JobOpen;
        let outcome = self.run_job(reader, ctx).await;
        if outcome.is_err() {
            self.output.clear();
        }
        outcome
    }
}
