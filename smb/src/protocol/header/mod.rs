mod command_code;
mod flags;
mod header;

pub type SMBCommandCode = command_code::SMBCommandCode;
pub type SMBSyncHeader = header::SMBSyncHeader;
pub type SMBFlags = flags::SMBFlags;

pub type LegacySMBCommandCode = command_code::LegacySMBCommandCode;
pub type LegacySMBHeader = header::LegacySMBHeader;
pub type LegacySMBFlags = flags::LegacySMBFlags;
pub type LegacySMBFlags2 = flags::LegacySMBFlags2;

pub use header::{LEGACY_PROTOCOL_ID, SMB2_HEADER_SIZE, SMB2_PROTOCOL_ID, UNSOLICITED_MESSAGE_ID};
