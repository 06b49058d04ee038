use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use smb_core::{SMBByteSize, SMBFromBytes, SMBParseResult, SMBToBytes};

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
    pub struct Capabilities: u32 {
        const DFS                = 0x01;
        const LEASING            = 0x02;
        const LARGE_MTU          = 0x04;
        const MULTI_CHANNEL      = 0x08;
        const PERSISTENT_HANDLES = 0x10;
        const DIRECTORY_LEASING  = 0x20;
        const ENCRYPTION         = 0x40;
    }
}

impl SMBByteSize for Capabilities {
    fn smb_byte_size(&self) -> usize {
        std::mem::size_of::<u32>()
    }
}

impl SMBFromBytes for Capabilities {
    fn smb_from_bytes(input: &[u8]) -> SMBParseResult<&[u8], Self> {
        let (remaining, raw) = u32::smb_from_bytes(input)?;
        Ok((remaining, Capabilities::from_bits_truncate(raw)))
    }
}

impl SMBToBytes for Capabilities {
    fn smb_to_bytes(&self) -> Vec<u8> {
        self.bits().smb_to_bytes()
    }
}
