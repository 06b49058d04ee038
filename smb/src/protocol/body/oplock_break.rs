use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use smb_core::{SMBByteSize, SMBFromBytes, SMBParseResult, SMBToBytes};
use smb_core::error::SMBError;

use crate::byte_helper::{u16_at, u16_to_bytes, u32_to_bytes, u64_to_bytes};
use crate::protocol::body::create::{SMBLeaseKey, SMBLeaseState, SMBOplockLevel};
use crate::protocol::body::file_id::SMBFileId;

pub const OPLOCK_BREAK_NOTIFICATION_SIZE: u16 = 24;
pub const LEASE_BREAK_NOTIFICATION_SIZE: u16 = 44;
pub const LEASE_BREAK_ACK_SIZE: u16 = 36;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
    pub struct SMBLeaseBreakFlags: u32 {
        const ACK_REQUIRED = 0x01;
    }
}

/// Server-pushed break. Both shapes arrive under the oplock-break command
/// with the unsolicited message id; the structure size tells them apart.
#[derive(Serialize, Deserialize, PartialEq, Eq, Debug, Clone)]
pub enum SMBBreakNotification {
    Oplock {
        oplock_level: SMBOplockLevel,
        file_id: SMBFileId,
    },
    Lease(SMBLeaseBreakNotification),
}

impl SMBBreakNotification {
    pub fn parse(input: &[u8]) -> SMBParseResult<&[u8], Self> {
        let declared = u16_at(input, 0)?;
        match declared {
            OPLOCK_BREAK_NOTIFICATION_SIZE => {
                let (_, oplock_level) = SMBOplockLevel::smb_from_bytes(&input[2..])?;
                let (_, file_id) = SMBFileId::smb_from_bytes(&input[8..])?;
                Ok((
                    &input[OPLOCK_BREAK_NOTIFICATION_SIZE as usize..],
                    Self::Oplock {
                        oplock_level,
                        file_id,
                    },
                ))
            }
            LEASE_BREAK_NOTIFICATION_SIZE => {
                let (remaining, notification) = SMBLeaseBreakNotification::smb_from_bytes(input)?;
                Ok((remaining, Self::Lease(notification)))
            }
            other => Err(SMBError::malformed_reply(format!(
                "break notification structure size {}",
                other
            ))),
        }
    }
}

#[derive(Serialize, Deserialize, PartialEq, Eq, Debug, Clone)]
pub struct SMBLeaseBreakNotification {
    pub new_epoch: u16,
    pub flags: SMBLeaseBreakFlags,
    pub lease_key: SMBLeaseKey,
    pub current_lease_state: SMBLeaseState,
    pub new_lease_state: SMBLeaseState,
}

impl SMBLeaseBreakNotification {
    pub fn ack_required(&self) -> bool {
        self.flags.contains(SMBLeaseBreakFlags::ACK_REQUIRED)
    }
}

impl SMBByteSize for SMBLeaseBreakNotification {
    fn smb_byte_size(&self) -> usize {
        LEASE_BREAK_NOTIFICATION_SIZE as usize
    }
}

impl SMBFromBytes for SMBLeaseBreakNotification {
    fn smb_from_bytes(input: &[u8]) -> SMBParseResult<&[u8], Self> {
        let declared = u16_at(input, 0)?;
        if declared != LEASE_BREAK_NOTIFICATION_SIZE {
            return Err(SMBError::malformed_reply(format!(
                "lease break structure size {} != {}",
                declared, LEASE_BREAK_NOTIFICATION_SIZE
            )));
        }
        let (_, new_epoch) = u16::smb_from_bytes(&input[2..])?;
        let (_, raw_flags) = u32::smb_from_bytes(&input[4..])?;
        let (_, key_bytes) = <[u8; 16]>::smb_from_bytes(&input[8..])?;
        let (_, current_lease_state) = SMBLeaseState::smb_from_bytes(&input[24..])?;
        let (_, new_lease_state) = SMBLeaseState::smb_from_bytes(&input[28..])?;
        Ok((
            &input[LEASE_BREAK_NOTIFICATION_SIZE as usize..],
            Self {
                new_epoch,
                flags: SMBLeaseBreakFlags::from_bits_truncate(raw_flags),
                lease_key: SMBLeaseKey::from_bytes(key_bytes),
                current_lease_state,
                new_lease_state,
            },
        ))
    }
}

impl SMBToBytes for SMBLeaseBreakNotification {
    fn smb_to_bytes(&self) -> Vec<u8> {
        [
            &u16_to_bytes(LEASE_BREAK_NOTIFICATION_SIZE)[..],
            &u16_to_bytes(self.new_epoch),
            &u32_to_bytes(self.flags.bits()),
            &self.lease_key.bytes(),
            &self.current_lease_state.smb_to_bytes(),
            &self.new_lease_state.smb_to_bytes(),
            &u32_to_bytes(0), // break reason
            &u32_to_bytes(0), // access mask hint
            &u32_to_bytes(0), // share mask hint
        ]
        .concat()
    }
}

/// Client acknowledgement carrying the echoed key and accepted state.
#[derive(Serialize, Deserialize, PartialEq, Eq, Debug, Clone)]
pub struct SMBLeaseBreakAck {
    pub lease_key: SMBLeaseKey,
    pub lease_state: SMBLeaseState,
}

impl SMBByteSize for SMBLeaseBreakAck {
    fn smb_byte_size(&self) -> usize {
        LEASE_BREAK_ACK_SIZE as usize
    }
}

impl SMBToBytes for SMBLeaseBreakAck {
    fn smb_to_bytes(&self) -> Vec<u8> {
        [
            &u16_to_bytes(LEASE_BREAK_ACK_SIZE)[..],
            &u16_to_bytes(0), // reserved
            &u32_to_bytes(0), // flags
            &self.lease_key.bytes(),
            &self.lease_state.smb_to_bytes(),
            &u64_to_bytes(0), // lease duration
        ]
        .concat()
    }
}

/// Server response to the ack; must echo the key it acknowledges.
#[derive(Serialize, Deserialize, PartialEq, Eq, Debug, Clone)]
pub struct SMBLeaseBreakResponse {
    pub lease_key: SMBLeaseKey,
    pub lease_state: SMBLeaseState,
}

impl SMBByteSize for SMBLeaseBreakResponse {
    fn smb_byte_size(&self) -> usize {
        LEASE_BREAK_ACK_SIZE as usize
    }
}

impl SMBFromBytes for SMBLeaseBreakResponse {
    fn smb_from_bytes(input: &[u8]) -> SMBParseResult<&[u8], Self> {
        let declared = u16_at(input, 0)?;
        if declared != LEASE_BREAK_ACK_SIZE {
            return Err(SMBError::malformed_reply(format!(
                "lease break response structure size {} != {}",
                declared, LEASE_BREAK_ACK_SIZE
            )));
        }
        let (_, key_bytes) = <[u8; 16]>::smb_from_bytes(&input[8..])?;
        let (_, lease_state) = SMBLeaseState::smb_from_bytes(&input[24..])?;
        Ok((
            &input[LEASE_BREAK_ACK_SIZE as usize..],
            Self {
                lease_key: SMBLeaseKey::from_bytes(key_bytes),
                lease_state,
            },
        ))
    }
}
