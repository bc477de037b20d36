use async_trait::async_trait;
use tokio::io::AsyncBufRead;

use crate::error_handling::types::ProtocolError;
use crate::storage::{Digest, Storage};

/// Per-session environment handed to an engine.
pub struct JobContext<'a> {
    /// Diagnostic session name, used as log prefix.
    pub session: &'a str,
    pub storage: &'a dyn Storage,
}

/// How an engine finished with its stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    /// The stream ended before any command was seen.
    Idle,
    /// The first command did not open a job.
    Ignored { opcode: u8 },
    /// A job completed and its payload was stored.
    Completed(Digest),
    /// The client cancelled the job; nothing was stored.
    Aborted,
}

/// Wire-protocol parser reconstructing job boundaries.
///
/// `intercept` may return before the stream is exhausted; the caller keeps
/// draining the reader afterwards.
#[async_trait]
pub trait ProtocolEngine: Send {
    async fn intercept(
        &mut self,
        reader: &mut (dyn AsyncBufRead + Unpin + Send),
        ctx: &JobContext<'_>,
    ) -> Result<JobOutcome, ProtocolError>;
}
