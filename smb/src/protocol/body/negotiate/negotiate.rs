use serde::{Deserialize, Serialize};
use uuid::Uuid;

use smb_core::{SMBByteSize, SMBFromBytes, SMBParseResult, SMBToBytes};
use smb_core::error::SMBError;

use crate::byte_helper::{u16_to_bytes, u64_to_bytes};
use crate::protocol::body::{expect_structure_size, slice_from_header_offset};
use crate::protocol::body::capabilities::Capabilities;
use crate::protocol::body::dialect::SMBDialect;
use crate::protocol::body::filetime::FileTime;
use crate::protocol::body::security_mode::NegotiateSecurityMode;

pub const NEGOTIATE_REQUEST_SIZE: u16 = 36;
pub const NEGOTIATE_RESPONSE_SIZE: u16 = 65;

#[derive(Serialize, Deserialize, PartialEq, Eq, Debug, Clone)]
pub struct SMBNegotiateRequest {
    pub security_mode: NegotiateSecurityMode,
    pub capabilities: Capabilities,
    pub client_guid: Uuid,
    pub dialects: Vec<SMBDialect>,
}

impl SMBByteSize for SMBNegotiateRequest {
    fn smb_byte_size(&self) -> usize {
        NEGOTIATE_REQUEST_SIZE as usize + self.dialects.len() * 2
    }
}

impl SMBToBytes for SMBNegotiateRequest {
    fn smb_to_bytes(&self) -> Vec<u8> {
        let dialect_bytes: Vec<u8> = self
            .dialects
            .iter()
            .flat_map(|dialect| dialect.smb_to_bytes())
            .collect();
        [
            &u16_to_bytes(NEGOTIATE_REQUEST_SIZE)[..],
            &u16_to_bytes(self.dialects.len() as u16),
            &self.security_mode.smb_to_bytes(),
            &u16_to_bytes(0), // reserved
            &self.capabilities.smb_to_bytes(),
            &self.client_guid.smb_to_bytes(),
            &u64_to_bytes(0), // client start time
            &dialect_bytes,
        ]
        .concat()
    }
}

#[derive(Serialize, Deserialize, PartialEq, Eq, Debug, Clone)]
pub struct SMBNegotiateResponse {
    pub security_mode: NegotiateSecurityMode,
    pub dialect: SMBDialect,
    pub server_guid: Uuid,
    pub capabilities: Capabilities,
    pub max_transact_size: u32,
    pub max_read_size: u32,
    pub max_write_size: u32,
    pub system_time: FileTime,
    pub server_start_time: FileTime,
    /// Opaque token handed to the auth collaborator for session setup.
    pub security_blob: Vec<u8>,
}

impl SMBByteSize for SMBNegotiateResponse {
    fn smb_byte_size(&self) -> usize {
        NEGOTIATE_RESPONSE_SIZE as usize - 1 + self.security_blob.len()
    }
}

impl SMBFromBytes for SMBNegotiateResponse {
    fn smb_from_bytes(input: &[u8]) -> SMBParseResult<&[u8], Self> {
        expect_structure_size(input, NEGOTIATE_RESPONSE_SIZE, "negotiate")?;
        let (_, security_mode) = NegotiateSecurityMode::smb_from_bytes(&input[2..])?;
        let (_, dialect) = SMBDialect::smb_from_bytes(&input[4..])?;
        let (_, server_guid) = Uuid::smb_from_bytes(&input[8..])?;
        let (_, capabilities) = Capabilities::smb_from_bytes(&input[24..])?;
        let (_, max_transact_size) = u32::smb_from_bytes(&input[28..])?;
        let (_, max_read_size) = u32::smb_from_bytes(&input[32..])?;
        let (_, max_write_size) = u32::smb_from_bytes(&input[36..])?;
        let (_, system_time) = FileTime::smb_from_bytes(&input[40..])?;
        let (_, server_start_time) = FileTime::smb_from_bytes(&input[48..])?;
        let (_, blob_offset) = u16::smb_from_bytes(&input[56..])?;
        let (_, blob_length) = u16::smb_from_bytes(&input[58..])?;
        let security_blob =
            slice_from_header_offset(input, blob_offset as usize, blob_length as usize)?.to_vec();
        Ok((
            &input[input.len()..],
            Self {
                security_mode,
                dialect,
                server_guid,
                capabilities,
                max_transact_size,
                max_read_size,
                max_write_size,
                system_time,
                server_start_time,
                security_blob,
            },
        ))
    }
}

/// SMB1 negotiate probe body. Offering only the `SMB 2.???` wildcard tells
/// a modern server to answer with an SMB2 negotiate response carrying the
/// wildcard dialect, after which the real multi-dialect negotiate runs.
#[derive(Serialize, Deserialize, PartialEq, Eq, Debug, Clone)]
pub struct LegacySMBNegotiateRequest {
    pub dialect_strings: Vec<String>,
}

impl LegacySMBNegotiateRequest {
    pub fn smb2_probe() -> Self {
        Self {
            dialect_strings: vec!["SMB 2.002".into(), "SMB 2.???".into()],
        }
    }
}

impl SMBByteSize for LegacySMBNegotiateRequest {
    fn smb_byte_size(&self) -> usize {
        // word count + byte count + per-dialect (format byte + string + NUL)
        3 + self
            .dialect_strings
            .iter()
            .map(|d| d.len() + 2)
            .sum::<usize>()
    }
}

impl SMBToBytes for LegacySMBNegotiateRequest {
    fn smb_to_bytes(&self) -> Vec<u8> {
        let mut dialects = Vec::new();
        for dialect in &self.dialect_strings {
            dialects.push(0x02); // buffer-format: dialect string
            dialects.extend_from_slice(dialect.as_bytes());
            dialects.push(0x00);
        }
        [
            &[0u8][..], // word count
            &u16_to_bytes(dialects.len() as u16),
            &dialects,
        ]
        .concat()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response_bytes(blob: &[u8]) -> Vec<u8> {
        let mut body = vec![0u8; 64];
        body[0..2].copy_from_slice(&65u16.to_le_bytes());
        body[2..4].copy_from_slice(&1u16.to_le_bytes()); // signing enabled
        body[4..6].copy_from_slice(&0x0210u16.to_le_bytes());
        body[8..24].copy_from_slice(Uuid::nil().as_bytes());
        body[24..28].copy_from_slice(&2u32.to_le_bytes()); // leasing
        body[28..32].copy_from_slice(&1048576u32.to_le_bytes());
        body[32..36].copy_from_slice(&8388608u32.to_le_bytes());
        body[36..40].copy_from_slice(&8388608u32.to_le_bytes());
        body[56..58].copy_from_slice(&128u16.to_le_bytes()); // from header start
        body[58..60].copy_from_slice(&(blob.len() as u16).to_le_bytes());
        body.extend_from_slice(blob);
        body
    }

    #[test]
    fn request_layout() {
        let request = SMBNegotiateRequest {
            security_mode: NegotiateSecurityMode::SIGNING_ENABLED,
            capabilities: Capabilities::LEASING,
            client_guid: Uuid::nil(),
            dialects: vec![SMBDialect::V2_0_2, SMBDialect::V2_1_0],
        };
        let bytes = request.smb_to_bytes();
        assert_eq!(bytes.len(), 40);
        assert_eq!(&bytes[0..2], &36u16.to_le_bytes());
        assert_eq!(&bytes[2..4], &2u16.to_le_bytes());
        assert_eq!(&bytes[36..40], &[0x02, 0x02, 0x10, 0x02]);
    }

    #[test]
    fn response_parses_blob_at_stated_offset() {
        let body = response_bytes(b"spnego");
        let (_, response) = SMBNegotiateResponse::smb_from_bytes(&body).unwrap();
        assert_eq!(response.dialect, SMBDialect::V2_1_0);
        assert_eq!(response.max_read_size, 8388608);
        assert_eq!(response.security_blob, b"spnego");
    }

    #[test]
    fn response_size_mismatch_is_malformed() {
        let mut body = response_bytes(&[]);
        body[0] = 64;
        assert!(matches!(
            SMBNegotiateResponse::smb_from_bytes(&body),
            Err(SMBError::MalformedReply(_))
        ));
    }

    #[test]
    fn blob_past_buffer_is_overrun() {
        let mut body = response_bytes(b"spnego");
        body[58..60].copy_from_slice(&512u16.to_le_bytes());
        assert!(matches!(
            SMBNegotiateResponse::smb_from_bytes(&body),
            Err(SMBError::BufferOverrun(_))
        ));
    }

    #[test]
    fn legacy_probe_body() {
        let bytes = LegacySMBNegotiateRequest::smb2_probe().smb_to_bytes();
        assert_eq!(bytes[0], 0);
        let byte_count = u16::from_le_bytes([bytes[1], bytes[2]]) as usize;
        assert_eq!(byte_count, bytes.len() - 3);
        assert_eq!(bytes[3], 0x02);
    }
}
