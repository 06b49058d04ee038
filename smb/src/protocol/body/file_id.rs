use serde::{Deserialize, Serialize};

use smb_core::{SMBByteSize, SMBFromBytes, SMBParseResult, SMBToBytes};

/// Wire-level persistent+volatile pair naming an open. Exactly one local
/// handle owns a pair at a time; durable reconnect swaps the pair under
/// the same local handle.
#[derive(Serialize, Deserialize, PartialEq, Eq, Hash, Debug, Copy, Clone, Default)]
pub struct SMBFileId {
    pub persistent: u64,
    pub volatile: u64,
}

impl SMBFileId {
    /// All-ones id used by later members of a related compound chain to
    /// mean "the file opened earlier in this chain".
    pub const CHAINED: SMBFileId = SMBFileId {
        persistent: u64::MAX,
        volatile: u64::MAX,
    };
}

impl SMBByteSize for SMBFileId {
    fn smb_byte_size(&self) -> usize {
        16
    }
}

impl SMBFromBytes for SMBFileId {
    fn smb_from_bytes(input: &[u8]) -> SMBParseResult<&[u8], Self> {
        let (remaining, persistent) = u64::smb_from_bytes(input)?;
        let (remaining, volatile) = u64::smb_from_bytes(remaining)?;
        Ok((
            remaining,
            Self {
                persistent,
                volatile,
            },
        ))
    }
}

impl SMBToBytes for SMBFileId {
    fn smb_to_bytes(&self) -> Vec<u8> {
        [self.persistent.smb_to_bytes(), self.volatile.smb_to_bytes()].concat()
    }
}
