use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use smb_core::{SMBByteSize, SMBFromBytes, SMBParseResult, SMBToBytes};

use crate::byte_helper::{u16_to_bytes, u32_to_bytes};
use crate::protocol::body::create::SMBFileAttributes;
use crate::protocol::body::expect_structure_size;
use crate::protocol::body::file_id::SMBFileId;
use crate::protocol::body::filetime::FileTime;

pub const CLOSE_REQUEST_SIZE: u16 = 24;
pub const CLOSE_RESPONSE_SIZE: u16 = 60;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
    pub struct SMBCloseFlags: u16 {
        const POSTQUERY_ATTRIB = 0x01;
    }
}

#[derive(Serialize, Deserialize, PartialEq, Eq, Debug, Clone)]
pub struct SMBCloseRequest {
    pub flags: SMBCloseFlags,
    pub file_id: SMBFileId,
}

impl SMBByteSize for SMBCloseRequest {
    fn smb_byte_size(&self) -> usize {
        CLOSE_REQUEST_SIZE as usize
    }
}

impl SMBToBytes for SMBCloseRequest {
    fn smb_to_bytes(&self) -> Vec<u8> {
        [
            &u16_to_bytes(CLOSE_REQUEST_SIZE)[..],
            &u16_to_bytes(self.flags.bits()),
            &u32_to_bytes(0), // reserved
            &self.file_id.smb_to_bytes(),
        ]
        .concat()
    }
}

#[derive(Serialize, Deserialize, PartialEq, Eq, Debug, Clone)]
pub struct SMBCloseResponse {
    pub flags: SMBCloseFlags,
    pub creation_time: FileTime,
    pub last_access_time: FileTime,
    pub last_write_time: FileTime,
    pub change_time: FileTime,
    pub allocation_size: u64,
    pub end_of_file: u64,
    pub file_attributes: SMBFileAttributes,
}

impl SMBByteSize for SMBCloseResponse {
    fn smb_byte_size(&self) -> usize {
        CLOSE_RESPONSE_SIZE as usize
    }
}

impl SMBFromBytes for SMBCloseResponse {
    fn smb_from_bytes(input: &[u8]) -> SMBParseResult<&[u8], Self> {
        expect_structure_size(input, CLOSE_RESPONSE_SIZE, "close")?;
        let (_, raw_flags) = u16::smb_from_bytes(&input[2..])?;
        let (_, creation_time) = FileTime::smb_from_bytes(&input[8..])?;
        let (_, last_access_time) = FileTime::smb_from_bytes(&input[16..])?;
        let (_, last_write_time) = FileTime::smb_from_bytes(&input[24..])?;
        let (_, change_time) = FileTime::smb_from_bytes(&input[32..])?;
        let (_, allocation_size) = u64::smb_from_bytes(&input[40..])?;
        let (_, end_of_file) = u64::smb_from_bytes(&input[48..])?;
        let (_, file_attributes) = SMBFileAttributes::smb_from_bytes(&input[56..])?;
        Ok((
            &input[CLOSE_RESPONSE_SIZE as usize..],
            Self {
                flags: SMBCloseFlags::from_bits_truncate(raw_flags),
                creation_time,
                last_access_time,
                last_write_time,
                change_time,
                allocation_size,
                end_of_file,
                file_attributes,
            },
        ))
    }
}
