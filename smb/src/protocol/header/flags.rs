use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use smb_core::{SMBByteSize, SMBFromBytes, SMBParseResult, SMBToBytes};

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
    pub struct SMBFlags: u32 {
        const SERVER_TO_REDIR    = 0x00000001;
        const ASYNC_COMMAND      = 0x00000002;
        const RELATED_OPERATIONS = 0x00000004;
        const SIGNED             = 0x00000008;
        const PRIORITY_MASK      = 0x00000070;
        const DFS_OPERATIONS     = 0x10000000;
        const REPLAY_OPERATION   = 0x20000000;
    }
}

impl SMBByteSize for SMBFlags {
    fn smb_byte_size(&self) -> usize {
        std::mem::size_of::<u32>()
    }
}

impl SMBFromBytes for SMBFlags {
    fn smb_from_bytes(input: &[u8]) -> SMBParseResult<&[u8], Self> {
        let (remaining, raw) = u32::smb_from_bytes(input)?;
        Ok((remaining, SMBFlags::from_bits_truncate(raw)))
    }
}

impl SMBToBytes for SMBFlags {
    fn smb_to_bytes(&self) -> Vec<u8> {
        self.bits().smb_to_bytes()
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
    pub struct LegacySMBFlags: u8 {
        const CASE_INSENSITIVE    = 0x08;
        const CANONICALIZED_PATHS = 0x10;
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
    pub struct LegacySMBFlags2: u16 {
        const LONG_NAMES        = 0x0001;
        const EXTENDED_SECURITY = 0x0800;
        const NT_STATUS         = 0x4000;
        const UNICODE           = 0x8000;
    }
}
