use bitflags::bitflags;
use num_enum::TryFromPrimitive;
use serde::{Deserialize, Serialize};

use smb_core::{SMBByteSize, SMBFromBytes, SMBParseResult, SMBToBytes};
use smb_core::error::SMBError;

#[repr(u8)]
#[derive(Debug, Eq, PartialEq, TryFromPrimitive, Serialize, Deserialize, Copy, Clone, Default)]
pub enum SMBOplockLevel {
    #[default]
    None = 0x00,
    II = 0x01,
    Exclusive = 0x08,
    Batch = 0x09,
    Lease = 0xFF,
}

impl SMBByteSize for SMBOplockLevel {
    fn smb_byte_size(&self) -> usize {
        1
    }
}

impl SMBFromBytes for SMBOplockLevel {
    fn smb_from_bytes(input: &[u8]) -> SMBParseResult<&[u8], Self> {
        let (remaining, raw) = u8::smb_from_bytes(input)?;
        let level = Self::try_from_primitive(raw)
            .map_err(|_e| SMBError::malformed_reply(format!("unknown oplock level {:#04x}", raw)))?;
        Ok((remaining, level))
    }
}

impl SMBToBytes for SMBOplockLevel {
    fn smb_to_bytes(&self) -> Vec<u8> {
        vec![*self as u8]
    }
}

bitflags! {
    /// Cache-coherency grant bits. A break moves the granted set downward;
    /// the engine never requests more than read+handle+write.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
    pub struct SMBLeaseState: u32 {
        const READ_CACHING   = 0x01;
        const HANDLE_CACHING = 0x02;
        const WRITE_CACHING  = 0x04;
    }
}

impl SMBByteSize for SMBLeaseState {
    fn smb_byte_size(&self) -> usize {
        std::mem::size_of::<u32>()
    }
}

impl SMBFromBytes for SMBLeaseState {
    fn smb_from_bytes(input: &[u8]) -> SMBParseResult<&[u8], Self> {
        let (remaining, raw) = u32::smb_from_bytes(input)?;
        Ok((remaining, SMBLeaseState::from_bits_truncate(raw)))
    }
}

impl SMBToBytes for SMBLeaseState {
    fn smb_to_bytes(&self) -> Vec<u8> {
        self.bits().smb_to_bytes()
    }
}
