use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use smb_core::{SMBByteSize, SMBFromBytes, SMBParseResult, SMBToBytes};

bitflags! {
    /// File/pipe/printer access mask. Directory-specific rights share the
    /// same bit positions and are not distinguished at this layer.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
    pub struct SMBAccessMask: u32 {
        const FILE_READ_DATA         = 0x00000001;
        const FILE_WRITE_DATA        = 0x00000002;
        const FILE_APPEND_DATA       = 0x00000004;
        const FILE_READ_EA           = 0x00000008;
        const FILE_WRITE_EA          = 0x00000010;
        const FILE_EXECUTE           = 0x00000020;
        const FILE_DELETE_CHILD      = 0x00000040;
        const FILE_READ_ATTRIBUTES   = 0x00000080;
        const FILE_WRITE_ATTRIBUTES  = 0x00000100;
        const DELETE                 = 0x00010000;
        const READ_CONTROL           = 0x00020000;
        const WRITE_DAC              = 0x00040000;
        const WRITE_OWNER            = 0x00080000;
        const SYNCHRONIZE            = 0x00100000;
        const ACCESS_SYSTEM_SECURITY = 0x01000000;
        const MAXIMUM_ALLOWED        = 0x02000000;
        const GENERIC_ALL            = 0x10000000;
        const GENERIC_EXECUTE        = 0x20000000;
        const GENERIC_WRITE          = 0x40000000;
        const GENERIC_READ           = 0x80000000;
    }
}

impl SMBAccessMask {
    pub fn read_only() -> Self {
        Self::FILE_READ_DATA | Self::FILE_READ_ATTRIBUTES | Self::READ_CONTROL | Self::SYNCHRONIZE
    }

    pub fn read_write() -> Self {
        Self::read_only() | Self::FILE_WRITE_DATA | Self::FILE_APPEND_DATA | Self::FILE_WRITE_ATTRIBUTES
    }
}

impl SMBByteSize for SMBAccessMask {
    fn smb_byte_size(&self) -> usize {
        std::mem::size_of::<u32>()
    }
}

impl SMBFromBytes for SMBAccessMask {
    fn smb_from_bytes(input: &[u8]) -> SMBParseResult<&[u8], Self> {
        let (remaining, raw) = u32::smb_from_bytes(input)?;
        Ok((remaining, SMBAccessMask::from_bits_truncate(raw)))
    }
}

impl SMBToBytes for SMBAccessMask {
    fn smb_to_bytes(&self) -> Vec<u8> {
        self.bits().smb_to_bytes()
    }
}
