use serde::{Deserialize, Serialize};

use smb_core::{SMBByteSize, SMBFromBytes, SMBParseResult, SMBToBytes};

use crate::byte_helper::u16_to_bytes;
use crate::protocol::body::expect_structure_size;

pub const LOGOFF_SIZE: u16 = 4;

#[derive(Serialize, Deserialize, PartialEq, Eq, Debug, Clone, Default)]
pub struct SMBLogoffRequest;

impl SMBByteSize for SMBLogoffRequest {
    fn smb_byte_size(&self) -> usize {
        LOGOFF_SIZE as usize
    }
}

impl SMBToBytes for SMBLogoffRequest {
    fn smb_to_bytes(&self) -> Vec<u8> {
        [&u16_to_bytes(LOGOFF_SIZE)[..], &u16_to_bytes(0)].concat()
    }
}

#[derive(Serialize, Deserialize, PartialEq, Eq, Debug, Clone, Default)]
pub struct SMBLogoffResponse;

impl SMBByteSize for SMBLogoffResponse {
    fn smb_byte_size(&self) -> usize {
        LOGOFF_SIZE as usize
    }
}

impl SMBFromBytes for SMBLogoffResponse {
    fn smb_from_bytes(input: &[u8]) -> SMBParseResult<&[u8], Self> {
        expect_structure_size(input, LOGOFF_SIZE, "logoff")?;
        Ok((&input[LOGOFF_SIZE as usize..], Self))
    }
}
