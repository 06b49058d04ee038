use num_enum::TryFromPrimitive;
use serde::{Deserialize, Serialize};

use smb_core::{SMBByteSize, SMBFromBytes, SMBParseResult, SMBToBytes, utf16_le_bytes};
use smb_core::error::SMBError;

use crate::byte_helper::{u16_to_bytes, u32_to_bytes, u64_to_bytes};
use crate::protocol::body::{expect_structure_size, slice_from_header_offset};
use crate::protocol::body::create::context::{
    SMBCreateRequestContext, SMBCreateResponseContext, encode_contexts, parse_contexts,
};
use crate::protocol::body::create::options::{
    SMBCreateAction, SMBCreateDisposition, SMBCreateOptions, SMBFileAttributes,
    SMBImpersonationLevel, SMBShareAccess,
};
use crate::protocol::body::create::oplock::SMBOplockLevel;
use crate::protocol::body::file_id::SMBFileId;
use crate::protocol::body::filetime::FileTime;
use crate::protocol::body::tree_connect::SMBAccessMask;
use crate::protocol::header::SMB2_HEADER_SIZE;

pub const CREATE_REQUEST_SIZE: u16 = 57;
pub const CREATE_RESPONSE_SIZE: u16 = 89;

#[derive(Serialize, Deserialize, PartialEq, Eq, Debug, Clone)]
pub struct SMBCreateRequest {
    pub oplock_level: SMBOplockLevel,
    pub impersonation_level: SMBImpersonationLevel,
    pub desired_access: SMBAccessMask,
    pub file_attributes: SMBFileAttributes,
    pub share_access: SMBShareAccess,
    pub create_disposition: SMBCreateDisposition,
    pub create_options: SMBCreateOptions,
    /// Share-relative path in wire separators; empty opens the share root.
    pub name: String,
    pub create_contexts: Vec<SMBCreateRequestContext>,
}

impl SMBByteSize for SMBCreateRequest {
    fn smb_byte_size(&self) -> usize {
        self.smb_to_bytes().len()
    }
}

impl SMBToBytes for SMBCreateRequest {
    fn smb_to_bytes(&self) -> Vec<u8> {
        let name = utf16_le_bytes(&self.name);
        let name_offset = SMB2_HEADER_SIZE + 56;
        let contexts = encode_contexts(&self.create_contexts);
        // context chain is 8-aligned relative to the header start
        let mut buffer = name.clone();
        let context_offset = if contexts.is_empty() {
            0usize
        } else {
            let mut end = name_offset + buffer.len();
            while end % 8 != 0 {
                buffer.push(0);
                end += 1;
            }
            end
        };
        buffer.extend_from_slice(&contexts);
        if buffer.is_empty() {
            // the wire always carries at least one buffer byte
            buffer.push(0);
        }
        [
            &u16_to_bytes(CREATE_REQUEST_SIZE)[..],
            &[0u8], // security flags
            &self.oplock_level.smb_to_bytes(),
            &u32_to_bytes(self.impersonation_level as u32),
            &u64_to_bytes(0), // create flags
            &u64_to_bytes(0), // reserved
            &self.desired_access.smb_to_bytes(),
            &self.file_attributes.smb_to_bytes(),
            &u32_to_bytes(self.share_access.bits()),
            &u32_to_bytes(self.create_disposition as u32),
            &u32_to_bytes(self.create_options.bits()),
            &u16_to_bytes(name_offset as u16),
            &u16_to_bytes(name.len() as u16),
            &u32_to_bytes(context_offset as u32),
            &u32_to_bytes(contexts.len() as u32),
            &buffer,
        ]
        .concat()
    }
}

#[derive(Serialize, Deserialize, PartialEq, Eq, Debug, Clone)]
pub struct SMBCreateResponse {
    pub oplock_level: SMBOplockLevel,
    pub flags: u8,
    pub create_action: SMBCreateAction,
    pub creation_time: FileTime,
    pub last_access_time: FileTime,
    pub last_write_time: FileTime,
    pub change_time: FileTime,
    pub allocation_size: u64,
    pub end_of_file: u64,
    pub file_attributes: SMBFileAttributes,
    pub file_id: SMBFileId,
    pub contexts: Vec<SMBCreateResponseContext>,
}

impl SMBCreateResponse {
    /// `tolerate_unknown` admits vendor context names the caller asked
    /// for; anything unknown otherwise fails the parse.
    pub fn parse(input: &[u8], tolerate_unknown: bool) -> SMBParseResult<&[u8], Self> {
        expect_structure_size(input, CREATE_RESPONSE_SIZE, "create")?;
        let (_, oplock_level) = SMBOplockLevel::smb_from_bytes(&input[2..])?;
        let (_, flags) = u8::smb_from_bytes(&input[3..])?;
        let (_, raw_action) = u32::smb_from_bytes(&input[4..])?;
        let create_action = SMBCreateAction::try_from_primitive(raw_action)
            .map_err(|_e| SMBError::malformed_reply(format!("unknown create action {}", raw_action)))?;
        let (_, creation_time) = FileTime::smb_from_bytes(&input[8..])?;
        let (_, last_access_time) = FileTime::smb_from_bytes(&input[16..])?;
        let (_, last_write_time) = FileTime::smb_from_bytes(&input[24..])?;
        let (_, change_time) = FileTime::smb_from_bytes(&input[32..])?;
        let (_, allocation_size) = u64::smb_from_bytes(&input[40..])?;
        let (_, end_of_file) = u64::smb_from_bytes(&input[48..])?;
        let (_, file_attributes) = SMBFileAttributes::smb_from_bytes(&input[56..])?;
        let (_, file_id) = SMBFileId::smb_from_bytes(&input[64..])?;
        let (_, context_offset) = u32::smb_from_bytes(&input[80..])?;
        let (_, context_length) = u32::smb_from_bytes(&input[84..])?;
        let context_bytes =
            slice_from_header_offset(input, context_offset as usize, context_length as usize)?;
        let contexts = parse_contexts(context_bytes, tolerate_unknown)?;
        Ok((
            &input[input.len()..],
            Self {
                oplock_level,
                flags,
                create_action,
                creation_time,
                last_access_time,
                last_write_time,
                change_time,
                allocation_size,
                end_of_file,
                file_attributes,
                file_id,
                contexts,
            },
        ))
    }
}

impl SMBByteSize for SMBCreateResponse {
    fn smb_byte_size(&self) -> usize {
        CREATE_RESPONSE_SIZE as usize
    }
}

impl SMBFromBytes for SMBCreateResponse {
    fn smb_from_bytes(input: &[u8]) -> SMBParseResult<&[u8], Self> {
        Self::parse(input, false)
    }
}
