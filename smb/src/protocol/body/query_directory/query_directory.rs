use bitflags::bitflags;
use num_enum::{IntoPrimitive, TryFromPrimitive};
use serde::{Deserialize, Serialize};

use smb_core::{SMBByteSize, SMBFromBytes, SMBParseResult, SMBToBytes, parse_utf16_le};
use smb_core::error::SMBError;

use crate::byte_helper::{bytes_at, u16_to_bytes, u32_at, u32_to_bytes};
use crate::protocol::body::{expect_structure_size, slice_from_header_offset};
use crate::protocol::body::create::SMBFileAttributes;
use crate::protocol::body::file_id::SMBFileId;
use crate::protocol::body::filetime::FileTime;
use crate::protocol::header::SMB2_HEADER_SIZE;

pub const QUERY_DIRECTORY_REQUEST_SIZE: u16 = 33;
pub const QUERY_DIRECTORY_RESPONSE_SIZE: u16 = 9;

const DIRECTORY_ENTRY_FIXED_SIZE: usize = 64;

#[repr(u8)]
#[derive(Debug, Eq, PartialEq, TryFromPrimitive, IntoPrimitive, Serialize, Deserialize, Copy, Clone, Default)]
pub enum SMBDirectoryInformationClass {
    #[default]
    FileDirectoryInformation = 0x01,
    FileFullDirectoryInformation = 0x02,
    FileBothDirectoryInformation = 0x03,
    FileNamesInformation = 0x0C,
    FileIdBothDirectoryInformation = 0x25,
    FileIdFullDirectoryInformation = 0x26,
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
    pub struct SMBQueryDirectoryFlags: u8 {
        const RESTART_SCANS       = 0x01;
        const RETURN_SINGLE_ENTRY = 0x02;
        const INDEX_SPECIFIED     = 0x04;
        const REOPEN              = 0x10;
    }
}

#[derive(Serialize, Deserialize, PartialEq, Eq, Debug, Clone)]
pub struct SMBQueryDirectoryRequest {
    pub information_class: SMBDirectoryInformationClass,
    pub flags: SMBQueryDirectoryFlags,
    pub file_id: SMBFileId,
    /// Search pattern, usually `*`.
    pub pattern: String,
    pub output_buffer_length: u32,
}

impl SMBByteSize for SMBQueryDirectoryRequest {
    fn smb_byte_size(&self) -> usize {
        QUERY_DIRECTORY_REQUEST_SIZE as usize - 1 + self.pattern.encode_utf16().count() * 2
    }
}

impl SMBToBytes for SMBQueryDirectoryRequest {
    fn smb_to_bytes(&self) -> Vec<u8> {
        let pattern = smb_core::utf16_le_bytes(&self.pattern);
        [
            &u16_to_bytes(QUERY_DIRECTORY_REQUEST_SIZE)[..],
            &[self.information_class.into()],
            &[self.flags.bits()],
            &u32_to_bytes(0), // file index
            &self.file_id.smb_to_bytes(),
            &u16_to_bytes((SMB2_HEADER_SIZE + 32) as u16),
            &u16_to_bytes(pattern.len() as u16),
            &u32_to_bytes(self.output_buffer_length),
            &pattern,
        ]
        .concat()
    }
}

#[derive(Serialize, Deserialize, PartialEq, Eq, Debug, Clone)]
pub struct SMBQueryDirectoryResponse {
    pub buffer: Vec<u8>,
}

impl SMBByteSize for SMBQueryDirectoryResponse {
    fn smb_byte_size(&self) -> usize {
        QUERY_DIRECTORY_RESPONSE_SIZE as usize - 1 + self.buffer.len()
    }
}

impl SMBFromBytes for SMBQueryDirectoryResponse {
    fn smb_from_bytes(input: &[u8]) -> SMBParseResult<&[u8], Self> {
        expect_structure_size(input, QUERY_DIRECTORY_RESPONSE_SIZE, "query_directory")?;
        let (_, offset) = u16::smb_from_bytes(&input[2..])?;
        let (_, length) = u32::smb_from_bytes(&input[4..])?;
        let buffer = slice_from_header_offset(input, offset as usize, length as usize)?.to_vec();
        Ok((&input[input.len()..], Self { buffer }))
    }
}

/// One `FileDirectoryInformation` record.
#[derive(Serialize, Deserialize, PartialEq, Eq, Debug, Clone)]
pub struct SMBDirectoryEntry {
    pub file_index: u32,
    pub creation_time: FileTime,
    pub last_access_time: FileTime,
    pub last_write_time: FileTime,
    pub change_time: FileTime,
    pub end_of_file: u64,
    pub allocation_size: u64,
    pub file_attributes: SMBFileAttributes,
    pub file_name: String,
}

/// Entry-list walk result. On a malformed chain the walk stops at the
/// last good record and reports why, without ever reading out of bounds.
#[derive(Debug, Default)]
pub struct SMBDirectoryEntryList {
    pub entries: Vec<SMBDirectoryEntry>,
    pub error: Option<SMBError>,
}

impl SMBDirectoryEntryList {
    pub fn parse(buffer: &[u8]) -> Self {
        let mut list = SMBDirectoryEntryList::default();
        if buffer.is_empty() {
            return list;
        }
        let mut cursor = 0usize;
        loop {
            let next = match u32_at(buffer, cursor) {
                Ok(next) => next as usize,
                Err(error) => {
                    list.error = Some(error);
                    return list;
                }
            };
            match parse_entry(&buffer[cursor..]) {
                Ok(entry) => list.entries.push(entry),
                Err(error) => {
                    list.error = Some(error);
                    return list;
                }
            }
            if next == 0 {
                return list;
            }
            let advanced = match cursor.checked_add(next) {
                Some(advanced) => advanced,
                None => {
                    list.error = Some(SMBError::buffer_overrun(usize::MAX, buffer.len()));
                    return list;
                }
            };
            // a cursor that moves backward or past the buffer is hostile
            if advanced <= cursor || advanced >= buffer.len() {
                list.error = Some(SMBError::buffer_overrun(advanced, buffer.len()));
                return list;
            }
            cursor = advanced;
        }
    }
}

fn parse_entry(record: &[u8]) -> Result<SMBDirectoryEntry, SMBError> {
    bytes_at(record, 0, DIRECTORY_ENTRY_FIXED_SIZE)?;
    let (_, file_index) = u32::smb_from_bytes(&record[4..])?;
    let (_, creation_time) = FileTime::smb_from_bytes(&record[8..])?;
    let (_, last_access_time) = FileTime::smb_from_bytes(&record[16..])?;
    let (_, last_write_time) = FileTime::smb_from_bytes(&record[24..])?;
    let (_, change_time) = FileTime::smb_from_bytes(&record[32..])?;
    let (_, end_of_file) = u64::smb_from_bytes(&record[40..])?;
    let (_, allocation_size) = u64::smb_from_bytes(&record[48..])?;
    let (_, file_attributes) = SMBFileAttributes::smb_from_bytes(&record[56..])?;
    let name_length = u32_at(record, 60)? as usize;
    let name_bytes = bytes_at(record, DIRECTORY_ENTRY_FIXED_SIZE, name_length)?;
    Ok(SMBDirectoryEntry {
        file_index,
        creation_time,
        last_access_time,
        last_write_time,
        change_time,
        end_of_file,
        allocation_size,
        file_attributes,
        file_name: parse_utf16_le(name_bytes)?,
    })
}

/// Serialize entries back into the wire record chain. Exists for the
/// loopback test server; real clients only parse.
pub fn encode_entries(entries: &[(SMBDirectoryEntry, bool)]) -> Vec<u8> {
    let mut out = Vec::new();
    for (entry, last) in entries {
        let name = smb_core::utf16_le_bytes(&entry.file_name);
        let unpadded = DIRECTORY_ENTRY_FIXED_SIZE + name.len();
        let padded = unpadded.div_ceil(8) * 8;
        let next = if *last { 0u32 } else { padded as u32 };
        let start = out.len();
        out.extend_from_slice(&u32_to_bytes(next));
        out.extend_from_slice(&u32_to_bytes(entry.file_index));
        out.extend_from_slice(&entry.creation_time.smb_to_bytes());
        out.extend_from_slice(&entry.last_access_time.smb_to_bytes());
        out.extend_from_slice(&entry.last_write_time.smb_to_bytes());
        out.extend_from_slice(&entry.change_time.smb_to_bytes());
        out.extend_from_slice(&entry.end_of_file.smb_to_bytes());
        out.extend_from_slice(&entry.allocation_size.smb_to_bytes());
        out.extend_from_slice(&entry.file_attributes.smb_to_bytes());
        out.extend_from_slice(&u32_to_bytes(name.len() as u32));
        out.extend_from_slice(&name);
        if !*last {
            while out.len() - start < padded {
                out.push(0);
            }
        }
    }
    out
}
