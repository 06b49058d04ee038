use serde::{Deserialize, Serialize};

use smb_core::{SMBByteSize, SMBFromBytes, SMBParseResult, SMBToBytes};

use crate::byte_helper::u16_to_bytes;
use crate::protocol::body::expect_structure_size;

pub const ECHO_SIZE: u16 = 4;

/// Liveness probe; request and reply are the four-byte empty body.
#[derive(Serialize, Deserialize, PartialEq, Eq, Debug, Clone, Default)]
pub struct SMBEchoRequest;

impl SMBByteSize for SMBEchoRequest {
    fn smb_byte_size(&self) -> usize {
        ECHO_SIZE as usize
    }
}

impl SMBToBytes for SMBEchoRequest {
    fn smb_to_bytes(&self) -> Vec<u8> {
        [&u16_to_bytes(ECHO_SIZE)[..], &u16_to_bytes(0)].concat()
    }
}

#[derive(Serialize, Deserialize, PartialEq, Eq, Debug, Clone, Default)]
pub struct SMBEchoResponse;

impl SMBByteSize for SMBEchoResponse {
    fn smb_byte_size(&self) -> usize {
        ECHO_SIZE as usize
    }
}

impl SMBFromBytes for SMBEchoResponse {
    fn smb_from_bytes(input: &[u8]) -> SMBParseResult<&[u8], Self> {
        expect_structure_size(input, ECHO_SIZE, "echo")?;
        Ok((&input[ECHO_SIZE as usize..], Self))
    }
}
