use bitflags::bitflags;
use num_enum::TryFromPrimitive;
use serde::{Deserialize, Serialize};

use smb_core::{SMBByteSize, SMBFromBytes, SMBParseResult, SMBToBytes, utf16_le_bytes};
use smb_core::error::SMBError;

use crate::byte_helper::u16_to_bytes;
use crate::protocol::body::expect_structure_size;
use crate::protocol::body::tree_connect::SMBAccessMask;
use crate::protocol::header::SMB2_HEADER_SIZE;

pub const TREE_CONNECT_REQUEST_SIZE: u16 = 9;
pub const TREE_CONNECT_RESPONSE_SIZE: u16 = 16;
pub const TREE_DISCONNECT_SIZE: u16 = 4;

#[repr(u8)]
#[derive(Debug, Eq, PartialEq, TryFromPrimitive, Serialize, Deserialize, Copy, Clone)]
pub enum SMBShareType {
    Disk = 0x01,
    Pipe = 0x02,
    Print = 0x03,
}

impl SMBShareType {
    /// Pipe and printer endpoints may legally complete reads/writes short.
    pub fn allows_partial_transfer(&self) -> bool {
        !matches!(self, SMBShareType::Disk)
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
    pub struct SMBShareFlags: u32 {
        const DFS                     = 0x00000001;
        const DFS_ROOT                = 0x00000002;
        const AUTO_CACHING            = 0x00000010;
        const VDO_CACHING             = 0x00000020;
        const NO_CACHING              = 0x00000030;
        const RESTRICT_EXCLUSIVE_OPENS = 0x00000100;
        const FORCE_SHARED_DELETE     = 0x00000200;
        const ALLOW_NAMESPACE_CACHING = 0x00000400;
        const ACCESS_BASED_DIRECTORY_ENUM = 0x00000800;
        const FORCE_LEVEL_II_OPLOCK   = 0x00001000;
        const ENABLE_HASH_V1          = 0x00002000;
        const ENABLE_HASH_V2          = 0x00004000;
        const ENCRYPT_DATA            = 0x00008000;
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
    pub struct SMBTreeConnectCapabilities: u32 {
        const DFS                     = 0x00000008;
        const CONTINUOUS_AVAILABILITY = 0x00000010;
        const SCALEOUT                = 0x00000020;
        const CLUSTER                 = 0x00000040;
        const ASYMMETRIC              = 0x00000080;
    }
}

#[derive(Serialize, Deserialize, PartialEq, Eq, Debug, Clone)]
pub struct SMBTreeConnectRequest {
    /// UNC path, `\\server\share`, already in wire separators.
    pub path: String,
}

impl SMBByteSize for SMBTreeConnectRequest {
    fn smb_byte_size(&self) -> usize {
        TREE_CONNECT_REQUEST_SIZE as usize - 1 + self.path.encode_utf16().count() * 2
    }
}

impl SMBToBytes for SMBTreeConnectRequest {
    fn smb_to_bytes(&self) -> Vec<u8> {
        let path = utf16_le_bytes(&self.path);
        [
            &u16_to_bytes(TREE_CONNECT_REQUEST_SIZE)[..],
            &u16_to_bytes(0), // reserved
            &u16_to_bytes((SMB2_HEADER_SIZE + 8) as u16),
            &u16_to_bytes(path.len() as u16),
            &path,
        ]
        .concat()
    }
}

#[derive(Serialize, Deserialize, PartialEq, Eq, Debug, Clone)]
pub struct SMBTreeConnectResponse {
    pub share_type: SMBShareType,
    pub share_flags: SMBShareFlags,
    pub capabilities: SMBTreeConnectCapabilities,
    pub maximal_access: SMBAccessMask,
}

impl SMBByteSize for SMBTreeConnectResponse {
    fn smb_byte_size(&self) -> usize {
        TREE_CONNECT_RESPONSE_SIZE as usize
    }
}

impl SMBFromBytes for SMBTreeConnectResponse {
    fn smb_from_bytes(input: &[u8]) -> SMBParseResult<&[u8], Self> {
        expect_structure_size(input, TREE_CONNECT_RESPONSE_SIZE, "tree_connect")?;
        let (_, raw_type) = u8::smb_from_bytes(&input[2..])?;
        let share_type = SMBShareType::try_from_primitive(raw_type)
            .map_err(|_e| SMBError::malformed_reply(format!("unknown share type {:#04x}", raw_type)))?;
        let (_, raw_flags) = u32::smb_from_bytes(&input[4..])?;
        let (_, raw_caps) = u32::smb_from_bytes(&input[8..])?;
        let (_, maximal_access) = SMBAccessMask::smb_from_bytes(&input[12..])?;
        Ok((
            &input[TREE_CONNECT_RESPONSE_SIZE as usize..],
            Self {
                share_type,
                share_flags: SMBShareFlags::from_bits_truncate(raw_flags),
                capabilities: SMBTreeConnectCapabilities::from_bits_truncate(raw_caps),
                maximal_access,
            },
        ))
    }
}

/// Tree disconnect and its response are both the four-byte empty body.
#[derive(Serialize, Deserialize, PartialEq, Eq, Debug, Clone, Default)]
pub struct SMBTreeDisconnectRequest;

impl SMBByteSize for SMBTreeDisconnectRequest {
    fn smb_byte_size(&self) -> usize {
        TREE_DISCONNECT_SIZE as usize
    }
}

impl SMBToBytes for SMBTreeDisconnectRequest {
    fn smb_to_bytes(&self) -> Vec<u8> {
        [
            &u16_to_bytes(TREE_DISCONNECT_SIZE)[..],
            &u16_to_bytes(0),
        ]
        .concat()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_encodes_unc_path() {
        let request = SMBTreeConnectRequest {
            path: "\\\\host\\share".into(),
        };
        let bytes = request.smb_to_bytes();
        assert_eq!(&bytes[4..6], &72u16.to_le_bytes());
        assert_eq!(&bytes[6..8], &24u16.to_le_bytes());
        assert_eq!(bytes.len(), 8 + 24);
    }

    #[test]
    fn response_parse() {
        let mut body = vec![0u8; 16];
        body[0..2].copy_from_slice(&16u16.to_le_bytes());
        body[2] = 0x02; // pipe
        body[4..8].copy_from_slice(&0x0030u32.to_le_bytes());
        body[12..16].copy_from_slice(&0x001F01FFu32.to_le_bytes());
        let (_, response) = SMBTreeConnectResponse::smb_from_bytes(&body).unwrap();
        assert_eq!(response.share_type, SMBShareType::Pipe);
        assert!(response.share_type.allows_partial_transfer());
        assert!(response.maximal_access.contains(SMBAccessMask::FILE_READ_DATA));
    }

    #[test]
    fn unknown_share_type_is_malformed() {
        let mut body = vec![0u8; 16];
        body[0..2].copy_from_slice(&16u16.to_le_bytes());
        body[2] = 0x09;
        assert!(matches!(
            SMBTreeConnectResponse::smb_from_bytes(&body),
            Err(SMBError::MalformedReply(_))
        ));
    }
}
