use std::error::Error;
use std::fmt::{Display, Formatter};
use std::io;

use crate::nt_status::NTStatus;

/// Error surface of the protocol engine.
///
/// `MalformedReply` and `BufferOverrun` abort only the message that produced
/// them; `Disconnected` means transparent reconnection was attempted and
/// exhausted; `OutOfCredits` is transient and retried inside the crate.
#[derive(Debug)]
pub enum SMBError {
    ProtocolMismatch(SMBProtocolMismatchError),
    ServerSigningConflict,
    AuthRejected(String),
    MalformedReply(String),
    BufferOverrun(SMBBufferOverrunError),
    Disconnected(String),
    ShareUnavailable(String),
    AccessDenied(String),
    SharingViolation(String),
    Cancelled,
    OutOfCredits(SMBOutOfCreditsError),
    PayloadTooSmall(SMBPayloadTooSmallError),
    PreconditionFailed(String),
    ServerError(SMBServerError),
    IOError(SMBIOError),
}

impl SMBError {
    pub fn protocol_mismatch<T: Into<u16>>(offered: Vec<u16>, selected: T) -> Self {
        Self::ProtocolMismatch(SMBProtocolMismatchError {
            offered,
            selected: selected.into(),
        })
    }

    pub fn auth_rejected<T: Into<String>>(message: T) -> Self {
        Self::AuthRejected(message.into())
    }

    pub fn malformed_reply<T: Into<String>>(message: T) -> Self {
        Self::MalformedReply(message.into())
    }

    pub fn buffer_overrun<T: Into<usize>, U: Into<usize>>(cursor: T, bound: U) -> Self {
        Self::BufferOverrun(SMBBufferOverrunError {
            cursor: cursor.into(),
            bound: bound.into(),
        })
    }

    pub fn disconnected<T: Into<String>>(message: T) -> Self {
        Self::Disconnected(message.into())
    }

    pub fn out_of_credits<T: Into<u16>, U: Into<u16>>(wanted: T, available: U) -> Self {
        Self::OutOfCredits(SMBOutOfCreditsError {
            wanted: wanted.into(),
            available: available.into(),
        })
    }

    pub fn payload_too_small<T: Into<usize>, U: Into<usize>>(expected: T, actual: U) -> Self {
        Self::PayloadTooSmall((expected, actual).into())
    }

    pub fn precondition_failed<T: Into<String>>(message: T) -> Self {
        Self::PreconditionFailed(message.into())
    }

    pub fn server_error<T: Into<u32>>(status: T, command: &'static str) -> Self {
        Self::ServerError(SMBServerError {
            status: status.into(),
            command,
        })
    }

    pub fn io_error<T: Into<io::Error>>(error: T) -> Self {
        Self::IOError(SMBIOError {
            error: error.into(),
        })
    }

    /// Whether the error aborts only the offending message. Header-level
    /// malformation is fatal to the whole session and reported separately.
    pub fn is_message_local(&self) -> bool {
        matches!(self, Self::MalformedReply(_) | Self::BufferOverrun(_))
    }

    /// Transient errors are retried inside the engine and never surfaced.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::OutOfCredits(_))
    }
}

#[derive(Debug)]
pub struct SMBProtocolMismatchError {
    offered: Vec<u16>,
    selected: u16,
}

impl Display for SMBProtocolMismatchError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "server selected dialect {:#06x} outside the offered set {:?}",
            self.selected, self.offered
        )
    }
}

#[derive(Debug)]
pub struct SMBBufferOverrunError {
    cursor: usize,
    bound: usize,
}

impl Display for SMBBufferOverrunError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "reply cursor {} outside buffer bound {}",
            self.cursor, self.bound
        )
    }
}

#[derive(Debug)]
pub struct SMBOutOfCreditsError {
    wanted: u16,
    available: u16,
}

impl Display for SMBOutOfCreditsError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "request wants {} credits, {} available",
            self.wanted, self.available
        )
    }
}

#[derive(Debug)]
pub struct SMBPayloadTooSmallError {
    expected: usize,
    actual: usize,
}

impl<T: Into<usize>, U: Into<usize>> From<(T, U)> for SMBPayloadTooSmallError {
    fn from(value: (T, U)) -> Self {
        Self {
            expected: value.0.into(),
            actual: value.1.into(),
        }
    }
}

impl Display for SMBPayloadTooSmallError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "payload requires {} bytes, got {}",
            self.expected, self.actual
        )
    }
}

#[derive(Debug)]
pub struct SMBServerError {
    status: u32,
    command: &'static str,
}

impl SMBServerError {
    pub fn status(&self) -> u32 {
        self.status
    }

    pub fn nt_status(&self) -> Option<NTStatus> {
        NTStatus::try_from(self.status).ok()
    }

    pub fn command(&self) -> &'static str {
        self.command
    }
}

impl Display for SMBServerError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "server failed {} with status {:#010x}",
            self.command, self.status
        )
    }
}

#[derive(Debug)]
pub struct SMBIOError {
    error: io::Error,
}

impl Display for SMBIOError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "I/O operation failed with error: {}", self.error)
    }
}

impl Display for SMBError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            SMBError::ProtocolMismatch(x) => write!(f, "Protocol mismatch: {}", x),
            SMBError::ServerSigningConflict => {
                write!(f, "Client requires signing but the server does not support it")
            }
            SMBError::AuthRejected(x) => write!(f, "Authentication rejected: {}", x),
            SMBError::MalformedReply(x) => write!(f, "Malformed reply: {}", x),
            SMBError::BufferOverrun(x) => write!(f, "Malformed reply: {}", x),
            SMBError::Disconnected(x) => write!(f, "Disconnected: {}", x),
            SMBError::ShareUnavailable(x) => write!(f, "Share unavailable: {}", x),
            SMBError::AccessDenied(x) => write!(f, "Access denied: {}", x),
            SMBError::SharingViolation(x) => write!(f, "Sharing violation: {}", x),
            SMBError::Cancelled => write!(f, "Request cancelled"),
            SMBError::OutOfCredits(x) => write!(f, "Out of credits: {}", x),
            SMBError::PayloadTooSmall(x) => write!(f, "Payload too small: {}", x),
            SMBError::PreconditionFailed(x) => {
                write!(f, "Operation failed with unmet precondition: {}", x)
            }
            SMBError::ServerError(x) => write!(f, "Server error: {}", x),
            SMBError::IOError(x) => write!(f, "{}", x),
        }
    }
}

impl Error for SMBError {}
