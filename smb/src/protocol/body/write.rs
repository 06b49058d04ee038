use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use smb_core::{SMBByteSize, SMBFromBytes, SMBParseResult, SMBToBytes};

use crate::byte_helper::{u16_to_bytes, u32_to_bytes, u64_to_bytes};
use crate::protocol::body::expect_structure_size;
use crate::protocol::body::file_id::SMBFileId;
use crate::protocol::header::SMB2_HEADER_SIZE;

pub const WRITE_REQUEST_SIZE: u16 = 49;
pub const WRITE_RESPONSE_SIZE: u16 = 17;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
    pub struct SMBWriteFlags: u32 {
        const WRITE_THROUGH    = 0x01;
        const WRITE_UNBUFFERED = 0x02;
    }
}

#[derive(Serialize, Deserialize, PartialEq, Eq, Debug, Clone)]
pub struct SMBWriteRequest {
    pub offset: u64,
    pub file_id: SMBFileId,
    pub flags: SMBWriteFlags,
    /// Bytes the client still has queued beyond this request.
    pub remaining_bytes: u32,
    pub data: Vec<u8>,
}

impl SMBByteSize for SMBWriteRequest {
    fn smb_byte_size(&self) -> usize {
        WRITE_REQUEST_SIZE as usize - 1 + self.data.len()
    }
}

impl SMBToBytes for SMBWriteRequest {
    fn smb_to_bytes(&self) -> Vec<u8> {
        let data_offset = (SMB2_HEADER_SIZE + 48) as u16;
        [
            &u16_to_bytes(WRITE_REQUEST_SIZE)[..],
            &u16_to_bytes(data_offset),
            &u32_to_bytes(self.data.len() as u32),
            &u64_to_bytes(self.offset),
            &self.file_id.smb_to_bytes(),
            &u32_to_bytes(0), // channel
            &u32_to_bytes(self.remaining_bytes),
            &u16_to_bytes(0), // write channel info offset
            &u16_to_bytes(0), // write channel info length
            &u32_to_bytes(self.flags.bits()),
            &self.data,
        ]
        .concat()
    }
}

#[derive(Serialize, Deserialize, PartialEq, Eq, Debug, Clone)]
pub struct SMBWriteResponse {
    /// Bytes the server actually accepted; short counts are legal on
    /// pipe and printer endpoints.
    pub count: u32,
    pub remaining: u32,
}

impl SMBByteSize for SMBWriteResponse {
    fn smb_byte_size(&self) -> usize {
        WRITE_RESPONSE_SIZE as usize
    }
}

impl SMBFromBytes for SMBWriteResponse {
    fn smb_from_bytes(input: &[u8]) -> SMBParseResult<&[u8], Self> {
        expect_structure_size(input, WRITE_RESPONSE_SIZE, "write")?;
        let (_, count) = u32::smb_from_bytes(&input[4..])?;
        let (_, remaining) = u32::smb_from_bytes(&input[8..])?;
        Ok((&input[input.len().min(16)..], Self { count, remaining }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_places_data_after_fixed_part() {
        let request = SMBWriteRequest {
            offset: 512,
            file_id: SMBFileId::default(),
            flags: SMBWriteFlags::WRITE_THROUGH,
            remaining_bytes: 0,
            data: b"payload".to_vec(),
        };
        let bytes = request.smb_to_bytes();
        assert_eq!(&bytes[2..4], &112u16.to_le_bytes());
        assert_eq!(&bytes[4..8], &7u32.to_le_bytes());
        assert_eq!(&bytes[48..], b"payload");
    }

    #[test]
    fn response_count() {
        let mut body = vec![0u8; 16];
        body[0..2].copy_from_slice(&17u16.to_le_bytes());
        body[4..8].copy_from_slice(&7u32.to_le_bytes());
        let (_, response) = SMBWriteResponse::smb_from_bytes(&body).unwrap();
        assert_eq!(response.count, 7);
    }
}
