use bitflags::bitflags;
use num_enum::TryFromPrimitive;
use serde::{Deserialize, Serialize};

use smb_core::{SMBByteSize, SMBFromBytes, SMBParseResult, SMBToBytes, parse_utf16_le};
use smb_core::error::SMBError;

use crate::byte_helper::{bytes_at, u16_to_bytes, u32_at, u32_to_bytes};
use crate::protocol::body::{expect_structure_size, slice_from_header_offset};
use crate::protocol::body::file_id::SMBFileId;

pub const CHANGE_NOTIFY_REQUEST_SIZE: u16 = 32;
pub const CHANGE_NOTIFY_RESPONSE_SIZE: u16 = 9;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
    pub struct SMBChangeNotifyFlags: u16 {
        const WATCH_TREE = 0x01;
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
    pub struct SMBCompletionFilter: u32 {
        const FILE_NAME    = 0x001;
        const DIR_NAME     = 0x002;
        const ATTRIBUTES   = 0x004;
        const SIZE         = 0x008;
        const LAST_WRITE   = 0x010;
        const LAST_ACCESS  = 0x020;
        const CREATION     = 0x040;
        const EA           = 0x080;
        const SECURITY     = 0x100;
        const STREAM_NAME  = 0x200;
        const STREAM_SIZE  = 0x400;
        const STREAM_WRITE = 0x800;
    }
}

#[repr(u32)]
#[derive(Debug, Eq, PartialEq, TryFromPrimitive, Serialize, Deserialize, Copy, Clone)]
pub enum SMBNotifyAction {
    Added = 0x01,
    Removed = 0x02,
    Modified = 0x03,
    RenamedOldName = 0x04,
    RenamedNewName = 0x05,
}

/// Long-poll watch on a directory handle. The reply arrives whenever a
/// matching change happens, possibly much later, through the async
/// interim path.
#[derive(Serialize, Deserialize, PartialEq, Eq, Debug, Clone)]
pub struct SMBChangeNotifyRequest {
    pub flags: SMBChangeNotifyFlags,
    pub output_buffer_length: u32,
    pub file_id: SMBFileId,
    pub completion_filter: SMBCompletionFilter,
}

impl SMBByteSize for SMBChangeNotifyRequest {
    fn smb_byte_size(&self) -> usize {
        CHANGE_NOTIFY_REQUEST_SIZE as usize
    }
}

impl SMBToBytes for SMBChangeNotifyRequest {
    fn smb_to_bytes(&self) -> Vec<u8> {
        [
            &u16_to_bytes(CHANGE_NOTIFY_REQUEST_SIZE)[..],
            &u16_to_bytes(self.flags.bits()),
            &u32_to_bytes(self.output_buffer_length),
            &self.file_id.smb_to_bytes(),
            &u32_to_bytes(self.completion_filter.bits()),
            &u32_to_bytes(0), // reserved
        ]
        .concat()
    }
}

#[derive(Serialize, Deserialize, PartialEq, Eq, Debug, Clone)]
pub struct SMBChangeNotifyEvent {
    pub action: SMBNotifyAction,
    pub file_name: String,
}

#[derive(Serialize, Deserialize, PartialEq, Eq, Debug, Clone, Default)]
pub struct SMBChangeNotifyResponse {
    pub events: Vec<SMBChangeNotifyEvent>,
}

impl SMBByteSize for SMBChangeNotifyResponse {
    fn smb_byte_size(&self) -> usize {
        CHANGE_NOTIFY_RESPONSE_SIZE as usize
    }
}

impl SMBFromBytes for SMBChangeNotifyResponse {
    fn smb_from_bytes(input: &[u8]) -> SMBParseResult<&[u8], Self> {
        expect_structure_size(input, CHANGE_NOTIFY_RESPONSE_SIZE, "change_notify")?;
        let (_, offset) = u16::smb_from_bytes(&input[2..])?;
        let (_, length) = u32::smb_from_bytes(&input[4..])?;
        let buffer = slice_from_header_offset(input, offset as usize, length as usize)?;
        let events = parse_notify_buffer(buffer)?;
        Ok((&input[input.len()..], Self { events }))
    }
}

/// `FILE_NOTIFY_INFORMATION` chain: same next-entry-offset discipline as
/// directory listings.
fn parse_notify_buffer(buffer: &[u8]) -> Result<Vec<SMBChangeNotifyEvent>, SMBError> {
    let mut events = Vec::new();
    if buffer.is_empty() {
        return Ok(events);
    }
    let mut cursor = 0usize;
    loop {
        let next = u32_at(buffer, cursor)? as usize;
        let raw_action = u32_at(buffer, cursor + 4)?;
        let action = SMBNotifyAction::try_from_primitive(raw_action)
            .map_err(|_e| SMBError::malformed_reply(format!("unknown notify action {}", raw_action)))?;
        let name_length = u32_at(buffer, cursor + 8)? as usize;
        let name_bytes = bytes_at(buffer, cursor + 12, name_length)?;
        events.push(SMBChangeNotifyEvent {
            action,
            file_name: parse_utf16_le(name_bytes)?,
        });
        if next == 0 {
            return Ok(events);
        }
        let advanced = cursor
            .checked_add(next)
            .ok_or_else(|| SMBError::buffer_overrun(usize::MAX, buffer.len()))?;
        if advanced <= cursor || advanced >= buffer.len() {
            return Err(SMBError::buffer_overrun(advanced, buffer.len()));
        }
        cursor = advanced;
    }
}
