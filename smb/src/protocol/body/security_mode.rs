use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use smb_core::{SMBByteSize, SMBFromBytes, SMBParseResult, SMBToBytes};

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
    pub struct NegotiateSecurityMode: u16 {
        const SIGNING_ENABLED  = 0x01;
        const SIGNING_REQUIRED = 0x02;
    }
}

impl SMBByteSize for NegotiateSecurityMode {
    fn smb_byte_size(&self) -> usize {
        std::mem::size_of::<u16>()
    }
}

impl SMBFromBytes for NegotiateSecurityMode {
    fn smb_from_bytes(input: &[u8]) -> SMBParseResult<&[u8], Self> {
        let (remaining, raw) = u16::smb_from_bytes(input)?;
        Ok((remaining, NegotiateSecurityMode::from_bits_truncate(raw)))
    }
}

impl SMBToBytes for NegotiateSecurityMode {
    fn smb_to_bytes(&self) -> Vec<u8> {
        self.bits().smb_to_bytes()
    }
}
