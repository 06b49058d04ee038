use serde::{Deserialize, Serialize};

use smb_core::{SMBByteSize, SMBFromBytes, SMBParseResult, SMBToBytes};

use crate::byte_helper::{u16_to_bytes, u32_to_bytes};
use crate::protocol::body::expect_structure_size;

pub const ERROR_RESPONSE_SIZE: u16 = 9;

/// Generic failure body attached to any reply whose header status is an
/// error. The engine translates the status; the data is kept opaque.
#[derive(Serialize, Deserialize, PartialEq, Eq, Debug, Clone, Default)]
pub struct SMBErrorResponse {
    pub error_context_count: u8,
    pub error_data: Vec<u8>,
}

impl SMBByteSize for SMBErrorResponse {
    fn smb_byte_size(&self) -> usize {
        ERROR_RESPONSE_SIZE as usize - 1 + self.error_data.len()
    }
}

impl SMBFromBytes for SMBErrorResponse {
    fn smb_from_bytes(input: &[u8]) -> SMBParseResult<&[u8], Self> {
        expect_structure_size(input, ERROR_RESPONSE_SIZE, "error")?;
        let (_, error_context_count) = u8::smb_from_bytes(&input[2..])?;
        let (_, byte_count) = u32::smb_from_bytes(&input[4..])?;
        let available = input.len().saturating_sub(8);
        let taken = (byte_count as usize).min(available);
        let error_data = input[8..8 + taken].to_vec();
        Ok((
            &input[input.len()..],
            Self {
                error_context_count,
                error_data,
            },
        ))
    }
}

impl SMBToBytes for SMBErrorResponse {
    fn smb_to_bytes(&self) -> Vec<u8> {
        [
            &u16_to_bytes(ERROR_RESPONSE_SIZE)[..],
            &[self.error_context_count, 0],
            &u32_to_bytes(self.error_data.len() as u32),
            &self.error_data,
        ]
        .concat()
    }
}
