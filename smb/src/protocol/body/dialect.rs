use num_enum::TryFromPrimitive;
use serde::{Deserialize, Serialize};

use smb_core::{SMBByteSize, SMBFromBytes, SMBParseResult, SMBToBytes};
use smb_core::error::SMBError;

#[repr(u16)]
#[derive(
    Debug, Eq, PartialEq, TryFromPrimitive, Serialize, Deserialize, Copy, Clone, Ord, PartialOrd, Default,
)]
#[allow(non_camel_case_types)]
pub enum SMBDialect {
    V2_0_2 = 0x202,
    V2_1_0 = 0x210,
    V3_0_0 = 0x300,
    V3_0_2 = 0x302,
    V3_1_1 = 0x311,
    /// Wildcard the server answers the legacy probe with, meaning "speak a
    /// real multi-dialect negotiate to find out".
    #[default]
    V2_X_X = 0x2FF,
}

impl SMBDialect {
    pub fn is_smb3(&self) -> bool {
        *self as u16 >= 0x300
    }

    pub fn is_wildcard(&self) -> bool {
        *self == SMBDialect::V2_X_X
    }

    /// Multi-credit read/write windows require 2.1 or later.
    pub fn supports_multi_credit(&self) -> bool {
        *self as u16 >= 0x210 && !self.is_wildcard()
    }
}

impl SMBByteSize for SMBDialect {
    fn smb_byte_size(&self) -> usize {
        std::mem::size_of::<u16>()
    }
}

impl SMBFromBytes for SMBDialect {
    fn smb_from_bytes(input: &[u8]) -> SMBParseResult<&[u8], Self> {
        let (remaining, raw) = u16::smb_from_bytes(input)?;
        let dialect = Self::try_from_primitive(raw)
            .map_err(|_e| SMBError::malformed_reply(format!("unknown dialect {:#06x}", raw)))?;
        Ok((remaining, dialect))
    }
}

impl SMBToBytes for SMBDialect {
    fn smb_to_bytes(&self) -> Vec<u8> {
        (*self as u16).smb_to_bytes()
    }
}
