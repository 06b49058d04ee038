use serde::{Deserialize, Serialize};

use smb_core::{SMBByteSize, SMBResult, SMBToBytes};
use smb_core::error::SMBError;

use crate::byte_helper::{bytes_at, u16_at};
use crate::protocol::body::cancel::SMBCancelRequest;
use crate::protocol::body::change_notify::SMBChangeNotifyRequest;
use crate::protocol::body::close::SMBCloseRequest;
use crate::protocol::body::create::SMBCreateRequest;
use crate::protocol::body::echo::SMBEchoRequest;
use crate::protocol::body::flush::SMBFlushRequest;
use crate::protocol::body::ioctl::SMBIoctlRequest;
use crate::protocol::body::lock::SMBLockRequest;
use crate::protocol::body::logoff::SMBLogoffRequest;
use crate::protocol::body::negotiate::{LegacySMBNegotiateRequest, SMBNegotiateRequest};
use crate::protocol::body::oplock_break::SMBLeaseBreakAck;
use crate::protocol::body::query_directory::SMBQueryDirectoryRequest;
use crate::protocol::body::query_info::SMBQueryInfoRequest;
use crate::protocol::body::read::SMBReadRequest;
use crate::protocol::body::session_setup::SMBSessionSetupRequest;
use crate::protocol::body::set_info::SMBSetInfoRequest;
use crate::protocol::body::tree_connect::{SMBTreeConnectRequest, SMBTreeDisconnectRequest};
use crate::protocol::body::write::SMBWriteRequest;
use crate::protocol::header::{SMB2_HEADER_SIZE, SMBCommandCode};

const CREDIT_GRANULE: u32 = 65536;

/// Validate the leading structure-size field of a reply body before any
/// other byte is consumed. A mismatch poisons only this message.
pub(crate) fn expect_structure_size(input: &[u8], expected: u16, reply: &'static str) -> SMBResult<()> {
    let declared = u16_at(input, 0)?;
    if declared != expected {
        return Err(SMBError::malformed_reply(format!(
            "{} structure size {} != {}",
            reply, declared, expected
        )));
    }
    Ok(())
}

/// Resolve a wire offset (measured from the header start) into the body
/// slice, bounds-checked. Offsets inside the header are hostile.
pub(crate) fn slice_from_header_offset(
    body: &[u8],
    offset: usize,
    length: usize,
) -> SMBResult<&[u8]> {
    if length == 0 {
        return Ok(&body[0..0]);
    }
    let relative = offset
        .checked_sub(SMB2_HEADER_SIZE)
        .ok_or_else(|| SMBError::buffer_overrun(offset, SMB2_HEADER_SIZE))?;
    bytes_at(body, relative, length)
}

/// Every request the client can put on the wire. Carried (with its typed
/// fields, not its bytes) by the outstanding-request table so a rebuild
/// after reconnect re-marshals against fresh session/tree/file ids.
#[derive(Serialize, Deserialize, PartialEq, Eq, Debug, Clone)]
pub enum SMBRequestBody {
    Negotiate(SMBNegotiateRequest),
    LegacyNegotiate(LegacySMBNegotiateRequest),
    SessionSetup(SMBSessionSetupRequest),
    LogOff(SMBLogoffRequest),
    TreeConnect(SMBTreeConnectRequest),
    TreeDisconnect(SMBTreeDisconnectRequest),
    Create(SMBCreateRequest),
    Close(SMBCloseRequest),
    Flush(SMBFlushRequest),
    Read(SMBReadRequest),
    Write(SMBWriteRequest),
    Lock(SMBLockRequest),
    IOCTL(SMBIoctlRequest),
    Cancel(SMBCancelRequest),
    Echo(SMBEchoRequest),
    QueryDirectory(SMBQueryDirectoryRequest),
    ChangeNotify(SMBChangeNotifyRequest),
    QueryInfo(SMBQueryInfoRequest),
    SetInfo(SMBSetInfoRequest),
    LeaseBreakAck(SMBLeaseBreakAck),
}

impl SMBRequestBody {
    pub fn command_code(&self) -> SMBCommandCode {
        match self {
            Self::Negotiate(_) | Self::LegacyNegotiate(_) => SMBCommandCode::Negotiate,
            Self::SessionSetup(_) => SMBCommandCode::SessionSetup,
            Self::LogOff(_) => SMBCommandCode::LogOff,
            Self::TreeConnect(_) => SMBCommandCode::TreeConnect,
            Self::TreeDisconnect(_) => SMBCommandCode::TreeDisconnect,
            Self::Create(_) => SMBCommandCode::Create,
            Self::Close(_) => SMBCommandCode::Close,
            Self::Flush(_) => SMBCommandCode::Flush,
            Self::Read(_) => SMBCommandCode::Read,
            Self::Write(_) => SMBCommandCode::Write,
            Self::Lock(_) => SMBCommandCode::Lock,
            Self::IOCTL(_) => SMBCommandCode::IOCTL,
            Self::Cancel(_) => SMBCommandCode::Cancel,
            Self::Echo(_) => SMBCommandCode::Echo,
            Self::QueryDirectory(_) => SMBCommandCode::QueryDirectory,
            Self::ChangeNotify(_) => SMBCommandCode::ChangeNotify,
            Self::QueryInfo(_) => SMBCommandCode::QueryInfo,
            Self::SetInfo(_) => SMBCommandCode::SetInfo,
            Self::LeaseBreakAck(_) => SMBCommandCode::OplockBreak,
        }
    }

    /// Credit charge under the large-MTU rules: one credit per started
    /// 64 KiB of the largest transfer leg. Cancel is free by definition.
    pub fn credit_charge(&self, multi_credit: bool) -> u16 {
        if matches!(self, Self::Cancel(_)) {
            return 0;
        }
        if !multi_credit {
            return 1;
        }
        let payload = match self {
            Self::Read(read) => read.length,
            Self::Write(write) => write.data.len() as u32,
            Self::IOCTL(ioctl) => (ioctl.input.len() as u32).max(ioctl.max_output_response),
            Self::QueryDirectory(query) => query.output_buffer_length,
            Self::ChangeNotify(notify) => notify.output_buffer_length,
            Self::QueryInfo(query) => query.output_buffer_length,
            _ => 0,
        };
        payload.div_ceil(CREDIT_GRANULE).max(1) as u16
    }
}

impl SMBByteSize for SMBRequestBody {
    fn smb_byte_size(&self) -> usize {
        match self {
            Self::Negotiate(x) => x.smb_byte_size(),
            Self::LegacyNegotiate(x) => x.smb_byte_size(),
            Self::SessionSetup(x) => x.smb_byte_size(),
            Self::LogOff(x) => x.smb_byte_size(),
            Self::TreeConnect(x) => x.smb_byte_size(),
            Self::TreeDisconnect(x) => x.smb_byte_size(),
            Self::Create(x) => x.smb_byte_size(),
            Self::Close(x) => x.smb_byte_size(),
            Self::Flush(x) => x.smb_byte_size(),
            Self::Read(x) => x.smb_byte_size(),
            Self::Write(x) => x.smb_byte_size(),
            Self::Lock(x) => x.smb_byte_size(),
            Self::IOCTL(x) => x.smb_byte_size(),
            Self::Cancel(x) => x.smb_byte_size(),
            Self::Echo(x) => x.smb_byte_size(),
            Self::QueryDirectory(x) => x.smb_byte_size(),
            Self::ChangeNotify(x) => x.smb_byte_size(),
            Self::QueryInfo(x) => x.smb_byte_size(),
            Self::SetInfo(x) => x.smb_byte_size(),
            Self::LeaseBreakAck(x) => x.smb_byte_size(),
        }
    }
}

impl SMBToBytes for SMBRequestBody {
    fn smb_to_bytes(&self) -> Vec<u8> {
        match self {
            Self::Negotiate(x) => x.smb_to_bytes(),
            Self::LegacyNegotiate(x) => x.smb_to_bytes(),
            Self::SessionSetup(x) => x.smb_to_bytes(),
            Self::LogOff(x) => x.smb_to_bytes(),
            Self::TreeConnect(x) => x.smb_to_bytes(),
            Self::TreeDisconnect(x) => x.smb_to_bytes(),
            Self::Create(x) => x.smb_to_bytes(),
            Self::Close(x) => x.smb_to_bytes(),
            Self::Flush(x) => x.smb_to_bytes(),
            Self::Read(x) => x.smb_to_bytes(),
            Self::Write(x) => x.smb_to_bytes(),
            Self::Lock(x) => x.smb_to_bytes(),
            Self::IOCTL(x) => x.smb_to_bytes(),
            Self::Cancel(x) => x.smb_to_bytes(),
            Self::Echo(x) => x.smb_to_bytes(),
            Self::QueryDirectory(x) => x.smb_to_bytes(),
            Self::ChangeNotify(x) => x.smb_to_bytes(),
            Self::QueryInfo(x) => x.smb_to_bytes(),
            Self::SetInfo(x) => x.smb_to_bytes(),
            Self::LeaseBreakAck(x) => x.smb_to_bytes(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::body::file_id::SMBFileId;
    use crate::protocol::body::read::SMBReadFlags;

    fn read_request(length: u32) -> SMBRequestBody {
        SMBRequestBody::Read(SMBReadRequest {
            flags: SMBReadFlags::empty(),
            length,
            offset: 0,
            file_id: SMBFileId::default(),
            minimum_count: 0,
            remaining_bytes: 0,
        })
    }

    #[test]
    fn credit_charge_scales_with_length() {
        assert_eq!(read_request(100).credit_charge(true), 1);
        assert_eq!(read_request(65536).credit_charge(true), 1);
        assert_eq!(read_request(65537).credit_charge(true), 2);
        assert_eq!(read_request(262144).credit_charge(true), 4);
    }

    #[test]
    fn single_credit_without_large_mtu() {
        assert_eq!(read_request(262144).credit_charge(false), 1);
    }

    #[test]
    fn cancel_is_free() {
        let cancel = SMBRequestBody::Cancel(SMBCancelRequest);
        assert_eq!(cancel.credit_charge(true), 0);
    }
}
