use bytes::Bytes;
use tokio::sync::{mpsc, oneshot};

use smb_core::SMBResult;
use smb_core::error::SMBError;

use crate::protocol::header::SMBSyncHeader;

/// Lifecycle of one outstanding request. A request completes exactly
/// once: terminally, or it is retired as `Reconnected` and a fresh
/// request takes its place after re-establishment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SMBRequestState {
    Built,
    Sent,
    Completed,
    Reconnected,
    Cancelled,
}

/// Terminal delivery for one message id.
#[derive(Debug)]
pub enum SMBRequestOutcome {
    Completed { header: SMBSyncHeader, body: Bytes },
    /// The SMB1 probe was answered with an SMB1 message: the server does
    /// not speak the modern family.
    LegacyReply,
    /// Transport reset while in flight; rebuild from typed arguments and
    /// resend after re-establishment.
    Reconnected,
}

/// Where the I/O driver delivers a matched reply. Simple calls park on a
/// oneshot; pipelined windows share one channel, tagged per slot.
pub(crate) enum SMBCompleter {
    Oneshot(oneshot::Sender<SMBRequestOutcome>),
    Window {
        tx: mpsc::UnboundedSender<(u64, SMBRequestOutcome)>,
        tag: u64,
    },
}

impl SMBCompleter {
    pub(crate) fn complete(self, outcome: SMBRequestOutcome) {
        match self {
            Self::Oneshot(tx) => {
                let _ = tx.send(outcome);
            }
            Self::Window { tx, tag } => {
                let _ = tx.send((tag, outcome));
            }
        }
    }
}

/// Handle a simple caller holds while its request is in flight.
#[derive(Debug)]
pub struct SMBOutstandingRequest {
    message_id: u64,
    state: SMBRequestState,
    receiver: oneshot::Receiver<SMBRequestOutcome>,
}

impl SMBOutstandingRequest {
    pub(crate) fn new(message_id: u64, receiver: oneshot::Receiver<SMBRequestOutcome>) -> Self {
        Self {
            message_id,
            state: SMBRequestState::Built,
            receiver,
        }
    }

    pub fn message_id(&self) -> u64 {
        self.message_id
    }

    pub fn state(&self) -> SMBRequestState {
        self.state
    }

    pub(crate) fn mark_sent(&mut self) {
        self.state = SMBRequestState::Sent;
    }

    /// Wait for the one terminal delivery. A dropped completer means the
    /// request was cancelled and its slot already reclaimed.
    pub async fn outcome(mut self) -> SMBResult<SMBRequestOutcome> {
        match (&mut self.receiver).await {
            Ok(outcome) => {
                self.state = match outcome {
                    SMBRequestOutcome::Completed { .. } | SMBRequestOutcome::LegacyReply => {
                        SMBRequestState::Completed
                    }
                    SMBRequestOutcome::Reconnected => SMBRequestState::Reconnected,
                };
                Ok(outcome)
            }
            Err(_closed) => {
                self.state = SMBRequestState::Cancelled;
                Err(SMBError::Cancelled)
            }
        }
    }
}
