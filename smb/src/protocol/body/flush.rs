use serde::{Deserialize, Serialize};

use smb_core::{SMBByteSize, SMBFromBytes, SMBParseResult, SMBToBytes};

use crate::byte_helper::{u16_to_bytes, u32_to_bytes};
use crate::protocol::body::expect_structure_size;
use crate::protocol::body::file_id::SMBFileId;

pub const FLUSH_REQUEST_SIZE: u16 = 24;
pub const FLUSH_RESPONSE_SIZE: u16 = 4;

#[derive(Serialize, Deserialize, PartialEq, Eq, Debug, Clone)]
pub struct SMBFlushRequest {
    pub file_id: SMBFileId,
}

impl SMBByteSize for SMBFlushRequest {
    fn smb_byte_size(&self) -> usize {
        FLUSH_REQUEST_SIZE as usize
    }
}

impl SMBToBytes for SMBFlushRequest {
    fn smb_to_bytes(&self) -> Vec<u8> {
        [
            &u16_to_bytes(FLUSH_REQUEST_SIZE)[..],
            &u16_to_bytes(0),
            &u32_to_bytes(0),
            &self.file_id.smb_to_bytes(),
        ]
        .concat()
    }
}

#[derive(Serialize, Deserialize, PartialEq, Eq, Debug, Clone, Default)]
pub struct SMBFlushResponse;

impl SMBByteSize for SMBFlushResponse {
    fn smb_byte_size(&self) -> usize {
        FLUSH_RESPONSE_SIZE as usize
    }
}

impl SMBFromBytes for SMBFlushResponse {
    fn smb_from_bytes(input: &[u8]) -> SMBParseResult<&[u8], Self> {
        expect_structure_size(input, FLUSH_RESPONSE_SIZE, "flush")?;
        Ok((&input[FLUSH_RESPONSE_SIZE as usize..], Self))
    }
}
