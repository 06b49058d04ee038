use serde::{Deserialize, Serialize};

use smb_core::{SMBByteSize, SMBFromBytes, SMBParseResult, SMBToBytes};
use smb_core::error::SMBError;

use crate::byte_helper::{u16_to_bytes, u32_to_bytes, u64_to_bytes};
use crate::protocol::header::{LegacySMBCommandCode, LegacySMBFlags, LegacySMBFlags2, SMBCommandCode, SMBFlags};

pub const SMB2_HEADER_SIZE: usize = 64;
pub const SMB2_PROTOCOL_ID: [u8; 4] = [0xFE, b'S', b'M', b'B'];
pub const LEGACY_PROTOCOL_ID: [u8; 4] = [0xFF, b'S', b'M', b'B'];

/// Message id carried by server-initiated messages (lease/oplock breaks).
pub const UNSOLICITED_MESSAGE_ID: u64 = u64::MAX;

/// 64-byte SMB2 header. `status` doubles as the channel sequence on
/// requests, which the client always sends as zero.
#[derive(Serialize, Deserialize, PartialEq, Eq, Debug, Clone)]
pub struct SMBSyncHeader {
    pub credit_charge: u16,
    pub status: u32,
    pub command: SMBCommandCode,
    pub credits: u16,
    pub flags: SMBFlags,
    pub next_command: u32,
    pub message_id: u64,
    pub process_id: u32,
    pub tree_id: u32,
    pub session_id: u64,
    pub signature: [u8; 16],
}

impl SMBSyncHeader {
    pub fn new(
        command: SMBCommandCode,
        credit_charge: u16,
        credits: u16,
        message_id: u64,
        tree_id: u32,
        session_id: u64,
    ) -> Self {
        Self {
            credit_charge,
            status: 0,
            command,
            credits,
            flags: SMBFlags::empty(),
            next_command: 0,
            message_id,
            process_id: 0xFEFF,
            tree_id,
            session_id,
            signature: [0; 16],
        }
    }

    /// Interim and break messages from the server carry a 64-bit async id
    /// where process id and tree id normally sit.
    pub fn async_id(&self) -> Option<u64> {
        self.flags
            .contains(SMBFlags::ASYNC_COMMAND)
            .then(|| (self.process_id as u64) | ((self.tree_id as u64) << 32))
    }

    pub fn is_server_to_client(&self) -> bool {
        self.flags.contains(SMBFlags::SERVER_TO_REDIR)
    }
}

impl SMBByteSize for SMBSyncHeader {
    fn smb_byte_size(&self) -> usize {
        SMB2_HEADER_SIZE
    }
}

impl SMBFromBytes for SMBSyncHeader {
    fn smb_from_bytes(input: &[u8]) -> SMBParseResult<&[u8], Self> {
        if input.len() < SMB2_HEADER_SIZE {
            return Err(SMBError::payload_too_small(SMB2_HEADER_SIZE, input.len()));
        }
        if input[0..4] == LEGACY_PROTOCOL_ID {
            return Err(SMBError::malformed_reply("legacy SMB1 reply to an SMB2 exchange"));
        }
        if input[0..4] != SMB2_PROTOCOL_ID {
            return Err(SMBError::malformed_reply("bad protocol magic"));
        }
        let (_, structure_size) = u16::smb_from_bytes(&input[4..])?;
        if structure_size as usize != SMB2_HEADER_SIZE {
            return Err(SMBError::malformed_reply(format!(
                "header structure size {} != {}",
                structure_size, SMB2_HEADER_SIZE
            )));
        }
        let (_, credit_charge) = u16::smb_from_bytes(&input[6..])?;
        let (_, status) = u32::smb_from_bytes(&input[8..])?;
        let (_, command) = SMBCommandCode::smb_from_bytes(&input[12..])?;
        let (_, credits) = u16::smb_from_bytes(&input[14..])?;
        let (_, flags) = SMBFlags::smb_from_bytes(&input[16..])?;
        let (_, next_command) = u32::smb_from_bytes(&input[20..])?;
        let (_, message_id) = u64::smb_from_bytes(&input[24..])?;
        let (_, process_id) = u32::smb_from_bytes(&input[32..])?;
        let (_, tree_id) = u32::smb_from_bytes(&input[36..])?;
        let (_, session_id) = u64::smb_from_bytes(&input[40..])?;
        let (_, signature) = <[u8; 16]>::smb_from_bytes(&input[48..])?;
        Ok((
            &input[SMB2_HEADER_SIZE..],
            Self {
                credit_charge,
                status,
                command,
                credits,
                flags,
                next_command,
                message_id,
                process_id,
                tree_id,
                session_id,
                signature,
            },
        ))
    }
}

impl SMBToBytes for SMBSyncHeader {
    fn smb_to_bytes(&self) -> Vec<u8> {
        [
            &SMB2_PROTOCOL_ID[..],
            &u16_to_bytes(SMB2_HEADER_SIZE as u16),
            &u16_to_bytes(self.credit_charge),
            &u32_to_bytes(self.status),
            &u16_to_bytes(self.command as u16),
            &u16_to_bytes(self.credits),
            &u32_to_bytes(self.flags.bits()),
            &u32_to_bytes(self.next_command),
            &u64_to_bytes(self.message_id),
            &u32_to_bytes(self.process_id),
            &u32_to_bytes(self.tree_id),
            &u64_to_bytes(self.session_id),
            &self.signature,
        ]
        .concat()
    }
}

/// SMB1 header, emitted only for the legacy negotiate probe. The client
/// never parses one: a legacy reply magic is rejected at the header seam.
#[derive(Serialize, Deserialize, PartialEq, Eq, Debug, Clone)]
pub struct LegacySMBHeader {
    pub command: LegacySMBCommandCode,
    pub flags: LegacySMBFlags,
    pub flags2: LegacySMBFlags2,
    pub mid: u16,
}

impl LegacySMBHeader {
    pub fn negotiate_probe() -> Self {
        Self {
            command: LegacySMBCommandCode::Negotiate,
            flags: LegacySMBFlags::CASE_INSENSITIVE | LegacySMBFlags::CANONICALIZED_PATHS,
            flags2: LegacySMBFlags2::LONG_NAMES
                | LegacySMBFlags2::EXTENDED_SECURITY
                | LegacySMBFlags2::NT_STATUS
                | LegacySMBFlags2::UNICODE,
            mid: 0,
        }
    }
}

impl SMBByteSize for LegacySMBHeader {
    fn smb_byte_size(&self) -> usize {
        32
    }
}

impl SMBToBytes for LegacySMBHeader {
    fn smb_to_bytes(&self) -> Vec<u8> {
        [
            &LEGACY_PROTOCOL_ID[..],
            &[self.command as u8],
            &u32_to_bytes(0), // status
            &[self.flags.bits()],
            &u16_to_bytes(self.flags2.bits()),
            &u16_to_bytes(0),  // pid high
            &[0u8; 8],         // security features
            &u16_to_bytes(0),  // reserved
            &u16_to_bytes(0),  // tid
            &u16_to_bytes(0),  // pid low
            &u16_to_bytes(0),  // uid
            &u16_to_bytes(self.mid),
        ]
        .concat()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sync_header_round_trip() {
        let mut header = SMBSyncHeader::new(SMBCommandCode::Read, 2, 16, 42, 7, 0x1122334455667788);
        header.flags = SMBFlags::SIGNED;
        let bytes = header.smb_to_bytes();
        assert_eq!(bytes.len(), SMB2_HEADER_SIZE);
        let (remaining, parsed) = SMBSyncHeader::smb_from_bytes(&bytes).unwrap();
        assert!(remaining.is_empty());
        assert_eq!(parsed, header);
    }

    #[test]
    fn bad_structure_size_is_malformed() {
        let header = SMBSyncHeader::new(SMBCommandCode::Echo, 0, 1, 0, 0, 0);
        let mut bytes = header.smb_to_bytes();
        bytes[4] = 65;
        assert!(matches!(
            SMBSyncHeader::smb_from_bytes(&bytes),
            Err(SMBError::MalformedReply(_))
        ));
    }

    #[test]
    fn legacy_magic_is_rejected() {
        let probe = LegacySMBHeader::negotiate_probe();
        let bytes = [probe.smb_to_bytes(), vec![0; 32]].concat();
        assert!(matches!(
            SMBSyncHeader::smb_from_bytes(&bytes),
            Err(SMBError::MalformedReply(_))
        ));
    }

    #[test]
    fn async_id_only_with_flag() {
        let mut header = SMBSyncHeader::new(SMBCommandCode::OplockBreak, 0, 0, u64::MAX, 0, 0);
        assert_eq!(header.async_id(), None);
        header.flags = SMBFlags::ASYNC_COMMAND;
        header.process_id = 0x1;
        header.tree_id = 0x2;
        assert_eq!(header.async_id(), Some(0x0000_0002_0000_0001));
    }
}
