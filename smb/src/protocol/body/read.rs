use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use smb_core::{SMBByteSize, SMBFromBytes, SMBParseResult, SMBToBytes};

use crate::byte_helper::{u16_to_bytes, u32_to_bytes, u64_to_bytes, u8_at};
use crate::protocol::body::{expect_structure_size, slice_from_header_offset};
use crate::protocol::body::file_id::SMBFileId;

pub const READ_REQUEST_SIZE: u16 = 49;
pub const READ_RESPONSE_SIZE: u16 = 17;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
    pub struct SMBReadFlags: u8 {
        const READ_UNBUFFERED = 0x01;
    }
}

#[derive(Serialize, Deserialize, PartialEq, Eq, Debug, Clone)]
pub struct SMBReadRequest {
    pub flags: SMBReadFlags,
    pub length: u32,
    pub offset: u64,
    pub file_id: SMBFileId,
    pub minimum_count: u32,
    /// Bytes the client intends to read after this request; lets the
    /// server read ahead across a pipelined window.
    pub remaining_bytes: u32,
}

impl SMBByteSize for SMBReadRequest {
    fn smb_byte_size(&self) -> usize {
        READ_REQUEST_SIZE as usize
    }
}

impl SMBToBytes for SMBReadRequest {
    fn smb_to_bytes(&self) -> Vec<u8> {
        [
            &u16_to_bytes(READ_REQUEST_SIZE)[..],
            &[0x50u8], // response data packing hint
            &[self.flags.bits()],
            &u32_to_bytes(self.length),
            &u64_to_bytes(self.offset),
            &self.file_id.smb_to_bytes(),
            &u32_to_bytes(self.minimum_count),
            &u32_to_bytes(0), // channel
            &u32_to_bytes(self.remaining_bytes),
            &u16_to_bytes(0), // read channel info offset
            &u16_to_bytes(0), // read channel info length
            &[0u8],           // buffer placeholder
        ]
        .concat()
    }
}

#[derive(Serialize, Deserialize, PartialEq, Eq, Debug, Clone)]
pub struct SMBReadResponse {
    pub data_remaining: u32,
    pub data: Vec<u8>,
}

impl SMBByteSize for SMBReadResponse {
    fn smb_byte_size(&self) -> usize {
        READ_RESPONSE_SIZE as usize - 1 + self.data.len()
    }
}

impl SMBFromBytes for SMBReadResponse {
    fn smb_from_bytes(input: &[u8]) -> SMBParseResult<&[u8], Self> {
        expect_structure_size(input, READ_RESPONSE_SIZE, "read")?;
        let data_offset = u8_at(input, 2)?;
        let (_, data_length) = u32::smb_from_bytes(&input[4..])?;
        let (_, data_remaining) = u32::smb_from_bytes(&input[8..])?;
        let data =
            slice_from_header_offset(input, data_offset as usize, data_length as usize)?.to_vec();
        Ok((
            &input[input.len()..],
            Self {
                data_remaining,
                data,
            },
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use smb_core::error::SMBError;

    #[test]
    fn request_layout() {
        let request = SMBReadRequest {
            flags: SMBReadFlags::empty(),
            length: 65536,
            offset: 0x1000,
            file_id: SMBFileId {
                persistent: 1,
                volatile: 2,
            },
            minimum_count: 1,
            remaining_bytes: 131072,
        };
        let bytes = request.smb_to_bytes();
        assert_eq!(bytes.len(), 49);
        assert_eq!(&bytes[4..8], &65536u32.to_le_bytes());
        assert_eq!(&bytes[8..16], &0x1000u64.to_le_bytes());
        assert_eq!(&bytes[40..44], &131072u32.to_le_bytes());
    }

    #[test]
    fn response_reads_data_at_stated_offset() {
        // data deliberately not contiguous with the fixed part
        let mut body = vec![0u8; 16];
        body[0..2].copy_from_slice(&17u16.to_le_bytes());
        body[2] = 84; // from header start: 64 + 20
        body[4..8].copy_from_slice(&3u32.to_le_bytes());
        body.extend_from_slice(&[0; 4]); // padding the offset skips
        body.extend_from_slice(b"abc");
        let (_, response) = SMBReadResponse::smb_from_bytes(&body).unwrap();
        assert_eq!(response.data, b"abc");
    }

    #[test]
    fn data_past_end_is_overrun() {
        let mut body = vec![0u8; 16];
        body[0..2].copy_from_slice(&17u16.to_le_bytes());
        body[2] = 80;
        body[4..8].copy_from_slice(&100u32.to_le_bytes());
        assert!(matches!(
            SMBReadResponse::smb_from_bytes(&body),
            Err(SMBError::BufferOverrun(_))
        ));
    }
}
