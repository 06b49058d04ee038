use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use smb_core::{SMBByteSize, SMBFromBytes, SMBParseResult, SMBToBytes};

use crate::byte_helper::{u16_to_bytes, u32_to_bytes, u64_to_bytes};
use crate::protocol::body::{expect_structure_size, slice_from_header_offset};
use crate::protocol::body::capabilities::Capabilities;
use crate::protocol::header::SMB2_HEADER_SIZE;

pub const SESSION_SETUP_REQUEST_SIZE: u16 = 25;
pub const SESSION_SETUP_RESPONSE_SIZE: u16 = 9;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
    pub struct SMBSessionFlags: u16 {
        const IS_GUEST     = 0x01;
        const IS_NULL      = 0x02;
        const ENCRYPT_DATA = 0x04;
    }
}

/// One leg of the multi-leg handshake. The token is opaque: produced and
/// consumed by the auth collaborator, never interpreted here.
#[derive(Serialize, Deserialize, PartialEq, Eq, Debug, Clone)]
pub struct SMBSessionSetupRequest {
    pub security_mode: u8,
    pub capabilities: Capabilities,
    pub previous_session_id: u64,
    pub security_token: Vec<u8>,
}

impl SMBByteSize for SMBSessionSetupRequest {
    fn smb_byte_size(&self) -> usize {
        SESSION_SETUP_REQUEST_SIZE as usize - 1 + self.security_token.len()
    }
}

impl SMBToBytes for SMBSessionSetupRequest {
    fn smb_to_bytes(&self) -> Vec<u8> {
        let token_offset = (SMB2_HEADER_SIZE + 24) as u16;
        [
            &u16_to_bytes(SESSION_SETUP_REQUEST_SIZE)[..],
            &[0u8], // flags: no binding
            &[self.security_mode],
            &self.capabilities.smb_to_bytes(),
            &u32_to_bytes(0), // channel
            &u16_to_bytes(token_offset),
            &u16_to_bytes(self.security_token.len() as u16),
            &u64_to_bytes(self.previous_session_id),
            &self.security_token,
        ]
        .concat()
    }
}

#[derive(Serialize, Deserialize, PartialEq, Eq, Debug, Clone)]
pub struct SMBSessionSetupResponse {
    pub session_flags: SMBSessionFlags,
    pub security_token: Vec<u8>,
}

impl SMBByteSize for SMBSessionSetupResponse {
    fn smb_byte_size(&self) -> usize {
        SESSION_SETUP_RESPONSE_SIZE as usize - 1 + self.security_token.len()
    }
}

impl SMBFromBytes for SMBSessionSetupResponse {
    fn smb_from_bytes(input: &[u8]) -> SMBParseResult<&[u8], Self> {
        expect_structure_size(input, SESSION_SETUP_RESPONSE_SIZE, "session_setup")?;
        let (_, raw_flags) = u16::smb_from_bytes(&input[2..])?;
        let (_, token_offset) = u16::smb_from_bytes(&input[4..])?;
        let (_, token_length) = u16::smb_from_bytes(&input[6..])?;
        let security_token =
            slice_from_header_offset(input, token_offset as usize, token_length as usize)?.to_vec();
        Ok((
            &input[input.len()..],
            Self {
                session_flags: SMBSessionFlags::from_bits_truncate(raw_flags),
                security_token,
            },
        ))
    }
}
