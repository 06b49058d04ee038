use serde::{Deserialize, Serialize};

use smb_core::{SMBByteSize, SMBFromBytes, SMBParseResult, SMBToBytes, utf16_le_bytes};

use crate::byte_helper::{u16_to_bytes, u32_to_bytes, u64_to_bytes};
use crate::protocol::body::expect_structure_size;
use crate::protocol::body::file_id::SMBFileId;
use crate::protocol::body::query_info::{SMBFileInfoClass, SMBInfoType};
use crate::protocol::header::SMB2_HEADER_SIZE;

pub const SET_INFO_REQUEST_SIZE: u16 = 33;
pub const SET_INFO_RESPONSE_SIZE: u16 = 2;

/// Typed set-info payloads the engine can build.
#[derive(Serialize, Deserialize, PartialEq, Eq, Debug, Clone)]
pub enum SMBSetInfoPayload {
    /// Truncate or extend to the given size.
    EndOfFile(u64),
    /// Mark (or unmark) delete-on-close.
    Disposition { delete_pending: bool },
    /// Rename within the share.
    Rename {
        replace_if_exists: bool,
        new_name: String,
    },
}

impl SMBSetInfoPayload {
    pub fn file_info_class(&self) -> SMBFileInfoClass {
        match self {
            Self::EndOfFile(_) => SMBFileInfoClass::FileEndOfFileInformation,
            Self::Disposition { .. } => SMBFileInfoClass::FileDispositionInformation,
            Self::Rename { .. } => SMBFileInfoClass::FileRenameInformation,
        }
    }

    fn encode(&self) -> Vec<u8> {
        match self {
            Self::EndOfFile(size) => size.to_le_bytes().to_vec(),
            Self::Disposition { delete_pending } => vec![*delete_pending as u8],
            Self::Rename {
                replace_if_exists,
                new_name,
            } => {
                let name = utf16_le_bytes(new_name);
                [
                    &[*replace_if_exists as u8][..],
                    &[0u8; 7], // reserved
                    &u64_to_bytes(0), // root directory: same share
                    &u32_to_bytes(name.len() as u32),
                    &name,
                ]
                .concat()
            }
        }
    }
}

#[derive(Serialize, Deserialize, PartialEq, Eq, Debug, Clone)]
pub struct SMBSetInfoRequest {
    pub file_id: SMBFileId,
    pub payload: SMBSetInfoPayload,
}

impl SMBByteSize for SMBSetInfoRequest {
    fn smb_byte_size(&self) -> usize {
        SET_INFO_REQUEST_SIZE as usize - 1 + self.payload.encode().len()
    }
}

impl SMBToBytes for SMBSetInfoRequest {
    fn smb_to_bytes(&self) -> Vec<u8> {
        let payload = self.payload.encode();
        [
            &u16_to_bytes(SET_INFO_REQUEST_SIZE)[..],
            &[SMBInfoType::File.into()],
            &[self.payload.file_info_class().into()],
            &u32_to_bytes(payload.len() as u32),
            &u16_to_bytes((SMB2_HEADER_SIZE + 32) as u16),
            &u16_to_bytes(0), // reserved
            &u32_to_bytes(0), // additional information
            &self.file_id.smb_to_bytes(),
            &payload,
        ]
        .concat()
    }
}

#[derive(Serialize, Deserialize, PartialEq, Eq, Debug, Clone, Default)]
pub struct SMBSetInfoResponse;

impl SMBByteSize for SMBSetInfoResponse {
    fn smb_byte_size(&self) -> usize {
        SET_INFO_RESPONSE_SIZE as usize
    }
}

impl SMBFromBytes for SMBSetInfoResponse {
    fn smb_from_bytes(input: &[u8]) -> SMBParseResult<&[u8], Self> {
        expect_structure_size(input, SET_INFO_RESPONSE_SIZE, "set_info")?;
        Ok((&input[SET_INFO_RESPONSE_SIZE as usize..], Self))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn end_of_file_payload() {
        let request = SMBSetInfoRequest {
            file_id: SMBFileId::default(),
            payload: SMBSetInfoPayload::EndOfFile(4096),
        };
        let bytes = request.smb_to_bytes();
        assert_eq!(bytes[3], 0x14);
        assert_eq!(&bytes[4..8], &8u32.to_le_bytes());
        assert_eq!(&bytes[32..40], &4096u64.to_le_bytes());
    }

    #[test]
    fn rename_payload_layout() {
        let payload = SMBSetInfoPayload::Rename {
            replace_if_exists: true,
            new_name: "b.txt".into(),
        };
        let encoded = payload.encode();
        assert_eq!(encoded[0], 1);
        assert_eq!(&encoded[16..20], &10u32.to_le_bytes());
        assert_eq!(encoded.len(), 20 + 10);
    }
}
