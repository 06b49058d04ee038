use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use smb_core::{SMBByteSize, SMBFromBytes, SMBParseResult, SMBToBytes};

use crate::byte_helper::{u16_to_bytes, u32_to_bytes, u64_to_bytes};
use crate::protocol::body::expect_structure_size;
use crate::protocol::body::file_id::SMBFileId;

pub const LOCK_REQUEST_SIZE: u16 = 48;
pub const LOCK_RESPONSE_SIZE: u16 = 4;
pub const LOCK_ELEMENT_SIZE: usize = 24;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
    pub struct SMBLockFlags: u32 {
        const SHARED_LOCK      = 0x01;
        const EXCLUSIVE_LOCK   = 0x02;
        const UNLOCK           = 0x04;
        const FAIL_IMMEDIATELY = 0x10;
    }
}

#[derive(Serialize, Deserialize, PartialEq, Eq, Debug, Clone, Copy)]
pub struct SMBLockElement {
    pub offset: u64,
    pub length: u64,
    pub flags: SMBLockFlags,
}

impl SMBByteSize for SMBLockElement {
    fn smb_byte_size(&self) -> usize {
        LOCK_ELEMENT_SIZE
    }
}

impl SMBToBytes for SMBLockElement {
    fn smb_to_bytes(&self) -> Vec<u8> {
        [
            &u64_to_bytes(self.offset)[..],
            &u64_to_bytes(self.length),
            &u32_to_bytes(self.flags.bits()),
            &u32_to_bytes(0), // reserved
        ]
        .concat()
    }
}

#[derive(Serialize, Deserialize, PartialEq, Eq, Debug, Clone)]
pub struct SMBLockRequest {
    /// Bucketed sequence number the server uses to detect replayed lock
    /// requests after a reconnect.
    pub lock_sequence: u32,
    pub file_id: SMBFileId,
    pub locks: Vec<SMBLockElement>,
}

impl SMBByteSize for SMBLockRequest {
    fn smb_byte_size(&self) -> usize {
        LOCK_REQUEST_SIZE as usize - LOCK_ELEMENT_SIZE + self.locks.len() * LOCK_ELEMENT_SIZE
    }
}

impl SMBToBytes for SMBLockRequest {
    fn smb_to_bytes(&self) -> Vec<u8> {
        let elements: Vec<u8> = self
            .locks
            .iter()
            .flat_map(|element| element.smb_to_bytes())
            .collect();
        [
            &u16_to_bytes(LOCK_REQUEST_SIZE)[..],
            &u16_to_bytes(self.locks.len() as u16),
            &u32_to_bytes(self.lock_sequence),
            &self.file_id.smb_to_bytes(),
            &elements,
        ]
        .concat()
    }
}

#[derive(Serialize, Deserialize, PartialEq, Eq, Debug, Clone, Default)]
pub struct SMBLockResponse;

impl SMBByteSize for SMBLockResponse {
    fn smb_byte_size(&self) -> usize {
        LOCK_RESPONSE_SIZE as usize
    }
}

impl SMBFromBytes for SMBLockResponse {
    fn smb_from_bytes(input: &[u8]) -> SMBParseResult<&[u8], Self> {
        expect_structure_size(input, LOCK_RESPONSE_SIZE, "lock")?;
        Ok((&input[LOCK_RESPONSE_SIZE as usize..], Self))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_with_two_elements() {
        let request = SMBLockRequest {
            lock_sequence: 3,
            file_id: SMBFileId::default(),
            locks: vec![
                SMBLockElement {
                    offset: 0,
                    length: 100,
                    flags: SMBLockFlags::EXCLUSIVE_LOCK | SMBLockFlags::FAIL_IMMEDIATELY,
                },
                SMBLockElement {
                    offset: 200,
                    length: 50,
                    flags: SMBLockFlags::UNLOCK,
                },
            ],
        };
        let bytes = request.smb_to_bytes();
        assert_eq!(bytes.len(), 24 + 2 * LOCK_ELEMENT_SIZE);
        assert_eq!(&bytes[2..4], &2u16.to_le_bytes());
        assert_eq!(&bytes[24..32], &0u64.to_le_bytes());
        assert_eq!(&bytes[48..56], &200u64.to_le_bytes());
    }
}
