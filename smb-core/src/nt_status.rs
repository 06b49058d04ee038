use num_enum::TryFromPrimitive;
use serde::{Deserialize, Serialize};

use crate::error::SMBError;

/// NT status codes the engine branches on. Replies carry the raw `u32`;
/// anything outside this set stays raw and surfaces as `ServerError`.
#[repr(u32)]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TryFromPrimitive, Copy)]
pub enum NTStatus {
    StatusSuccess = 0x0,
    StatusPending = 0x103,
    NotifyEnumDir = 0x10C,
    SecIContinueNeeded = 0x00090312,
    BufferOverflow = 0x80000005,
    NoMoreFiles = 0x80000006,
    InvalidParameter = 0xC000000D,
    EndOfFile = 0xC0000011,
    MoreProcessingRequired = 0xC0000016,
    AccessDenied = 0xC0000022,
    ObjectNameNotFound = 0xC0000034,
    SharingViolation = 0xC0000043,
    StatusLogonFailure = 0xC000006D,
    InsufficientResources = 0xC000009A,
    StatusNotSupported = 0xC00000BB,
    NetworkNameDeleted = 0xC00000C9,
    BadNetworkName = 0xC00000CC,
    RequestNotAccepted = 0xC00000D0,
    StatusCancelled = 0xC0000120,
    FileClosed = 0xC0000128,
    UserSessionDeleted = 0xC0000203,
    NetworkSessionExpired = 0xC000035C,
}

impl NTStatus {
    pub fn is_success(&self) -> bool {
        *self == NTStatus::StatusSuccess
    }

    /// Severity bits 31..30: 0b11 is error, 0b10 warning, 0b00 success.
    pub fn severity_is_error(raw: u32) -> bool {
        raw >> 30 == 0b11
    }

    pub fn severity_is_warning(raw: u32) -> bool {
        raw >> 30 == 0b10
    }

    /// 1:1 business-error translation for status codes with a dedicated
    /// variant in the crate error surface. Codes without one map to
    /// `ServerError` at the call site.
    pub fn to_business_error(raw: u32, command: &'static str) -> Option<SMBError> {
        match NTStatus::try_from(raw).ok()? {
            NTStatus::AccessDenied => Some(SMBError::AccessDenied(command.to_string())),
            NTStatus::SharingViolation => Some(SMBError::SharingViolation(command.to_string())),
            NTStatus::BadNetworkName => Some(SMBError::ShareUnavailable(command.to_string())),
            NTStatus::StatusLogonFailure | NTStatus::RequestNotAccepted => {
                Some(SMBError::auth_rejected(command))
            }
            NTStatus::StatusCancelled => Some(SMBError::Cancelled),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_classification() {
        assert!(NTStatus::severity_is_error(NTStatus::AccessDenied as u32));
        assert!(NTStatus::severity_is_warning(NTStatus::BufferOverflow as u32));
        assert!(!NTStatus::severity_is_error(NTStatus::StatusPending as u32));
        assert!(!NTStatus::severity_is_warning(NTStatus::StatusSuccess as u32));
    }

    #[test]
    fn business_translation() {
        let err = NTStatus::to_business_error(NTStatus::SharingViolation as u32, "create");
        assert!(matches!(err, Some(SMBError::SharingViolation(_))));
        assert!(NTStatus::to_business_error(NTStatus::EndOfFile as u32, "read").is_none());
    }
}
