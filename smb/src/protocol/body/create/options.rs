use bitflags::bitflags;
use num_enum::TryFromPrimitive;
use serde::{Deserialize, Serialize};

use smb_core::{SMBByteSize, SMBFromBytes, SMBParseResult, SMBToBytes};

#[repr(u32)]
#[derive(Debug, Eq, PartialEq, TryFromPrimitive, Serialize, Deserialize, Copy, Clone, Default)]
pub enum SMBCreateDisposition {
    Supersede = 0x00,
    #[default]
    Open = 0x01,
    Create = 0x02,
    OpenIf = 0x03,
    Overwrite = 0x04,
    OverwriteIf = 0x05,
}

#[repr(u32)]
#[derive(Debug, Eq, PartialEq, TryFromPrimitive, Serialize, Deserialize, Copy, Clone, Default)]
pub enum SMBImpersonationLevel {
    Anonymous = 0x00,
    Identification = 0x01,
    #[default]
    Impersonation = 0x02,
    Delegate = 0x03,
}

#[repr(u32)]
#[derive(Debug, Eq, PartialEq, TryFromPrimitive, Serialize, Deserialize, Copy, Clone)]
pub enum SMBCreateAction {
    Superseded = 0x00,
    Opened = 0x01,
    Created = 0x02,
    Overwritten = 0x03,
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
    pub struct SMBShareAccess: u32 {
        const READ   = 0x01;
        const WRITE  = 0x02;
        const DELETE = 0x04;
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
    pub struct SMBCreateOptions: u32 {
        const DIRECTORY_FILE            = 0x00000001;
        const WRITE_THROUGH             = 0x00000002;
        const SEQUENTIAL_ONLY           = 0x00000004;
        const NO_INTERMEDIATE_BUFFERING = 0x00000008;
        const SYNCHRONOUS_IO_ALERT      = 0x00000010;
        const SYNCHRONOUS_IO_NONALERT   = 0x00000020;
        const NON_DIRECTORY_FILE        = 0x00000040;
        const NO_EA_KNOWLEDGE           = 0x00000200;
        const RANDOM_ACCESS             = 0x00000800;
        const DELETE_ON_CLOSE           = 0x00001000;
        const OPEN_BY_FILE_ID           = 0x00002000;
        const OPEN_FOR_BACKUP_INTENT    = 0x00004000;
        const NO_COMPRESSION            = 0x00008000;
        const OPEN_REPARSE_POINT        = 0x00200000;
        const OPEN_NO_RECALL            = 0x00400000;
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
    pub struct SMBFileAttributes: u32 {
        const READONLY            = 0x00000001;
        const HIDDEN              = 0x00000002;
        const SYSTEM              = 0x00000004;
        const DIRECTORY           = 0x00000010;
        const ARCHIVE             = 0x00000020;
        const NORMAL              = 0x00000080;
        const TEMPORARY           = 0x00000100;
        const SPARSE_FILE         = 0x00000200;
        const REPARSE_POINT       = 0x00000400;
        const COMPRESSED          = 0x00000800;
        const OFFLINE             = 0x00001000;
        const NOT_CONTENT_INDEXED = 0x00002000;
        const ENCRYPTED           = 0x00004000;
    }
}

impl SMBByteSize for SMBFileAttributes {
    fn smb_byte_size(&self) -> usize {
        std::mem::size_of::<u32>()
    }
}

impl SMBFromBytes for SMBFileAttributes {
    fn smb_from_bytes(input: &[u8]) -> SMBParseResult<&[u8], Self> {
        let (remaining, raw) = u32::smb_from_bytes(input)?;
        Ok((remaining, SMBFileAttributes::from_bits_truncate(raw)))
    }
}

impl SMBToBytes for SMBFileAttributes {
    fn smb_to_bytes(&self) -> Vec<u8> {
        self.bits().smb_to_bytes()
    }
}
