use num_enum::{IntoPrimitive, TryFromPrimitive};
use serde::{Deserialize, Serialize};

use smb_core::{SMBByteSize, SMBFromBytes, SMBParseResult, SMBToBytes};

use crate::byte_helper::{u16_to_bytes, u32_to_bytes};
use crate::protocol::body::{expect_structure_size, slice_from_header_offset};
use crate::protocol::body::create::SMBFileAttributes;
use crate::protocol::body::file_id::SMBFileId;
use crate::protocol::body::filetime::FileTime;

pub const QUERY_INFO_REQUEST_SIZE: u16 = 41;
pub const QUERY_INFO_RESPONSE_SIZE: u16 = 9;

#[repr(u8)]
#[derive(Debug, Eq, PartialEq, TryFromPrimitive, IntoPrimitive, Serialize, Deserialize, Copy, Clone)]
pub enum SMBInfoType {
    File = 0x01,
    FileSystem = 0x02,
    Security = 0x03,
    Quota = 0x04,
}

#[repr(u8)]
#[derive(Debug, Eq, PartialEq, TryFromPrimitive, IntoPrimitive, Serialize, Deserialize, Copy, Clone)]
pub enum SMBFileInfoClass {
    FileBasicInformation = 0x04,
    FileStandardInformation = 0x05,
    FileInternalInformation = 0x06,
    FileRenameInformation = 0x0A,
    FileDispositionInformation = 0x0D,
    FileAllInformation = 0x12,
    FileEndOfFileInformation = 0x14,
}

#[derive(Serialize, Deserialize, PartialEq, Eq, Debug, Clone)]
pub struct SMBQueryInfoRequest {
    pub info_type: SMBInfoType,
    pub file_info_class: SMBFileInfoClass,
    pub output_buffer_length: u32,
    pub additional_information: u32,
    pub file_id: SMBFileId,
}

impl SMBByteSize for SMBQueryInfoRequest {
    fn smb_byte_size(&self) -> usize {
        QUERY_INFO_REQUEST_SIZE as usize
    }
}

impl SMBToBytes for SMBQueryInfoRequest {
    fn smb_to_bytes(&self) -> Vec<u8> {
        [
            &u16_to_bytes(QUERY_INFO_REQUEST_SIZE)[..],
            &[self.info_type.into()],
            &[self.file_info_class.into()],
            &u32_to_bytes(self.output_buffer_length),
            &u16_to_bytes(0), // input buffer offset
            &u16_to_bytes(0), // reserved
            &u32_to_bytes(0), // input buffer length
            &u32_to_bytes(self.additional_information),
            &u32_to_bytes(0), // flags
            &self.file_id.smb_to_bytes(),
            &[0u8], // buffer placeholder
        ]
        .concat()
    }
}

#[derive(Serialize, Deserialize, PartialEq, Eq, Debug, Clone)]
pub struct SMBQueryInfoResponse {
    pub buffer: Vec<u8>,
}

impl SMBByteSize for SMBQueryInfoResponse {
    fn smb_byte_size(&self) -> usize {
        QUERY_INFO_RESPONSE_SIZE as usize - 1 + self.buffer.len()
    }
}

impl SMBFromBytes for SMBQueryInfoResponse {
    fn smb_from_bytes(input: &[u8]) -> SMBParseResult<&[u8], Self> {
        expect_structure_size(input, QUERY_INFO_RESPONSE_SIZE, "query_info")?;
        let (_, offset) = u16::smb_from_bytes(&input[2..])?;
        let (_, length) = u32::smb_from_bytes(&input[4..])?;
        let buffer = slice_from_header_offset(input, offset as usize, length as usize)?.to_vec();
        Ok((&input[input.len()..], Self { buffer }))
    }
}

/// `FileBasicInformation` payload.
#[derive(Serialize, Deserialize, PartialEq, Eq, Debug, Clone)]
pub struct SMBFileBasicInformation {
    pub creation_time: FileTime,
    pub last_access_time: FileTime,
    pub last_write_time: FileTime,
    pub change_time: FileTime,
    pub file_attributes: SMBFileAttributes,
}

impl SMBByteSize for SMBFileBasicInformation {
    fn smb_byte_size(&self) -> usize {
        40
    }
}

impl SMBFromBytes for SMBFileBasicInformation {
    fn smb_from_bytes(input: &[u8]) -> SMBParseResult<&[u8], Self> {
        let (input_after, creation_time) = FileTime::smb_from_bytes(input)?;
        let (input_after, last_access_time) = FileTime::smb_from_bytes(input_after)?;
        let (input_after, last_write_time) = FileTime::smb_from_bytes(input_after)?;
        let (input_after, change_time) = FileTime::smb_from_bytes(input_after)?;
        let (input_after, file_attributes) = SMBFileAttributes::smb_from_bytes(input_after)?;
        let (remaining, _reserved) = u32::smb_from_bytes(input_after)?;
        Ok((
            remaining,
            Self {
                creation_time,
                last_access_time,
                last_write_time,
                change_time,
                file_attributes,
            },
        ))
    }
}

/// `FileStandardInformation` payload.
#[derive(Serialize, Deserialize, PartialEq, Eq, Debug, Clone)]
pub struct SMBFileStandardInformation {
    pub allocation_size: u64,
    pub end_of_file: u64,
    pub number_of_links: u32,
    pub delete_pending: bool,
    pub directory: bool,
}

impl SMBByteSize for SMBFileStandardInformation {
    fn smb_byte_size(&self) -> usize {
        24
    }
}

impl SMBFromBytes for SMBFileStandardInformation {
    fn smb_from_bytes(input: &[u8]) -> SMBParseResult<&[u8], Self> {
        let (input_after, allocation_size) = u64::smb_from_bytes(input)?;
        let (input_after, end_of_file) = u64::smb_from_bytes(input_after)?;
        let (input_after, number_of_links) = u32::smb_from_bytes(input_after)?;
        let (input_after, delete_pending) = u8::smb_from_bytes(input_after)?;
        let (input_after, directory) = u8::smb_from_bytes(input_after)?;
        let (remaining, _reserved) = u16::smb_from_bytes(input_after)?;
        Ok((
            remaining,
            Self {
                allocation_size,
                end_of_file,
                number_of_links,
                delete_pending: delete_pending != 0,
                directory: directory != 0,
            },
        ))
    }
}

/// `FileInternalInformation`: the volume-stable file identity, the low
/// half of lease keys for files opened without a `QFid` context.
#[derive(Serialize, Deserialize, PartialEq, Eq, Debug, Clone, Copy)]
pub struct SMBFileInternalInformation {
    pub index_number: u64,
}

impl SMBByteSize for SMBFileInternalInformation {
    fn smb_byte_size(&self) -> usize {
        8
    }
}

impl SMBFromBytes for SMBFileInternalInformation {
    fn smb_from_bytes(input: &[u8]) -> SMBParseResult<&[u8], Self> {
        let (remaining, index_number) = u64::smb_from_bytes(input)?;
        Ok((remaining, Self { index_number }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_layout() {
        let request = SMBQueryInfoRequest {
            info_type: SMBInfoType::File,
            file_info_class: SMBFileInfoClass::FileStandardInformation,
            output_buffer_length: 24,
            additional_information: 0,
            file_id: SMBFileId::default(),
        };
        let bytes = request.smb_to_bytes();
        assert_eq!(&bytes[0..2], &41u16.to_le_bytes());
        assert_eq!(bytes[2], 0x01);
        assert_eq!(bytes[3], 0x05);
    }

    #[test]
    fn standard_information_parse() {
        let mut payload = Vec::new();
        payload.extend_from_slice(&8192u64.to_le_bytes());
        payload.extend_from_slice(&5120u64.to_le_bytes());
        payload.extend_from_slice(&1u32.to_le_bytes());
        payload.push(0);
        payload.push(1);
        payload.extend_from_slice(&0u16.to_le_bytes());
        let (_, info) = SMBFileStandardInformation::smb_from_bytes(&payload).unwrap();
        assert_eq!(info.end_of_file, 5120);
        assert!(info.directory);
        assert!(!info.delete_pending);
    }
}
