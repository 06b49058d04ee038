use num_enum::{IntoPrimitive, TryFromPrimitive};
use serde::{Deserialize, Serialize};

use smb_core::{SMBByteSize, SMBFromBytes, SMBParseResult, SMBToBytes};
use smb_core::error::SMBError;

#[repr(u16)]
#[derive(
    Debug, Eq, PartialEq, Hash, TryFromPrimitive, IntoPrimitive, Serialize, Deserialize, Clone, Copy,
)]
pub enum SMBCommandCode {
    Negotiate = 0x0,
    SessionSetup,
    LogOff,
    TreeConnect,
    TreeDisconnect,
    Create,
    Close,
    Flush,
    Read,
    Write,
    Lock,
    IOCTL,
    Cancel,
    Echo,
    QueryDirectory,
    ChangeNotify,
    QueryInfo,
    SetInfo,
    OplockBreak,
}

impl SMBCommandCode {
    pub fn name(&self) -> &'static str {
        match self {
            SMBCommandCode::Negotiate => "negotiate",
            SMBCommandCode::SessionSetup => "session_setup",
            SMBCommandCode::LogOff => "logoff",
            SMBCommandCode::TreeConnect => "tree_connect",
            SMBCommandCode::TreeDisconnect => "tree_disconnect",
            SMBCommandCode::Create => "create",
            SMBCommandCode::Close => "close",
            SMBCommandCode::Flush => "flush",
            SMBCommandCode::Read => "read",
            SMBCommandCode::Write => "write",
            SMBCommandCode::Lock => "lock",
            SMBCommandCode::IOCTL => "ioctl",
            SMBCommandCode::Cancel => "cancel",
            SMBCommandCode::Echo => "echo",
            SMBCommandCode::QueryDirectory => "query_directory",
            SMBCommandCode::ChangeNotify => "change_notify",
            SMBCommandCode::QueryInfo => "query_info",
            SMBCommandCode::SetInfo => "set_info",
            SMBCommandCode::OplockBreak => "oplock_break",
        }
    }
}

impl SMBByteSize for SMBCommandCode {
    fn smb_byte_size(&self) -> usize {
        std::mem::size_of::<u16>()
    }
}

impl SMBFromBytes for SMBCommandCode {
    fn smb_from_bytes(input: &[u8]) -> SMBParseResult<&[u8], Self> {
        let (remaining, raw) = u16::smb_from_bytes(input)?;
        let code = Self::try_from_primitive(raw)
            .map_err(|_e| SMBError::malformed_reply(format!("unknown command code {:#06x}", raw)))?;
        Ok((remaining, code))
    }
}

impl SMBToBytes for SMBCommandCode {
    fn smb_to_bytes(&self) -> Vec<u8> {
        (*self as u16).smb_to_bytes()
    }
}

/// SMB1 command codes the client still emits: only the negotiate probe used
/// for the two-step dialect handshake against legacy-first deployments.
#[repr(u8)]
#[derive(Debug, Eq, PartialEq, TryFromPrimitive, IntoPrimitive, Serialize, Deserialize, Clone, Copy)]
pub enum LegacySMBCommandCode {
    Negotiate = 0x72,
}
