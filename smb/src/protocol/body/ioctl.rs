use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use smb_core::{SMBByteSize, SMBFromBytes, SMBParseResult, SMBToBytes};

use crate::byte_helper::{u16_to_bytes, u32_to_bytes};
use crate::protocol::body::{expect_structure_size, slice_from_header_offset};
use crate::protocol::body::file_id::SMBFileId;
use crate::protocol::header::SMB2_HEADER_SIZE;

pub const IOCTL_REQUEST_SIZE: u16 = 57;
pub const IOCTL_RESPONSE_SIZE: u16 = 49;

pub const FSCTL_PIPE_TRANSCEIVE: u32 = 0x0011C017;
pub const FSCTL_GET_REPARSE_POINT: u32 = 0x000900A8;
pub const FSCTL_VALIDATE_NEGOTIATE_INFO: u32 = 0x00140204;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
    pub struct SMBIoctlFlags: u32 {
        const IS_FSCTL = 0x01;
    }
}

#[derive(Serialize, Deserialize, PartialEq, Eq, Debug, Clone)]
pub struct SMBIoctlRequest {
    pub ctl_code: u32,
    pub file_id: SMBFileId,
    pub input: Vec<u8>,
    pub max_output_response: u32,
    pub flags: SMBIoctlFlags,
}

impl SMBByteSize for SMBIoctlRequest {
    fn smb_byte_size(&self) -> usize {
        IOCTL_REQUEST_SIZE as usize - 1 + self.input.len()
    }
}

impl SMBToBytes for SMBIoctlRequest {
    fn smb_to_bytes(&self) -> Vec<u8> {
        let input_offset = if self.input.is_empty() {
            0u32
        } else {
            (SMB2_HEADER_SIZE + 56) as u32
        };
        [
            &u16_to_bytes(IOCTL_REQUEST_SIZE)[..],
            &u16_to_bytes(0), // reserved
            &u32_to_bytes(self.ctl_code),
            &self.file_id.smb_to_bytes(),
            &u32_to_bytes(input_offset),
            &u32_to_bytes(self.input.len() as u32),
            &u32_to_bytes(0), // max input response
            &u32_to_bytes(0), // output offset
            &u32_to_bytes(0), // output count
            &u32_to_bytes(self.max_output_response),
            &u32_to_bytes(self.flags.bits()),
            &u32_to_bytes(0), // reserved2
            &self.input,
        ]
        .concat()
    }
}

#[derive(Serialize, Deserialize, PartialEq, Eq, Debug, Clone)]
pub struct SMBIoctlResponse {
    pub ctl_code: u32,
    pub file_id: SMBFileId,
    pub input: Vec<u8>,
    pub output: Vec<u8>,
}

impl SMBByteSize for SMBIoctlResponse {
    fn smb_byte_size(&self) -> usize {
        IOCTL_RESPONSE_SIZE as usize - 1 + self.input.len() + self.output.len()
    }
}

impl SMBFromBytes for SMBIoctlResponse {
    fn smb_from_bytes(input: &[u8]) -> SMBParseResult<&[u8], Self> {
        expect_structure_size(input, IOCTL_RESPONSE_SIZE, "ioctl")?;
        let (_, ctl_code) = u32::smb_from_bytes(&input[4..])?;
        let (_, file_id) = SMBFileId::smb_from_bytes(&input[8..])?;
        let (_, input_offset) = u32::smb_from_bytes(&input[24..])?;
        let (_, input_count) = u32::smb_from_bytes(&input[28..])?;
        let (_, output_offset) = u32::smb_from_bytes(&input[32..])?;
        let (_, output_count) = u32::smb_from_bytes(&input[36..])?;
        let input_data =
            slice_from_header_offset(input, input_offset as usize, input_count as usize)?.to_vec();
        let output_data =
            slice_from_header_offset(input, output_offset as usize, output_count as usize)?.to_vec();
        Ok((
            &input[input.len()..],
            Self {
                ctl_code,
                file_id,
                input: input_data,
                output: output_data,
            },
        ))
    }
}
