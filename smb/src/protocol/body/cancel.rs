use serde::{Deserialize, Serialize};

use smb_core::{SMBByteSize, SMBToBytes};

use crate::byte_helper::u16_to_bytes;

pub const CANCEL_REQUEST_SIZE: u16 = 4;

/// Sent with the header message id of the request being cancelled. The
/// cancel itself is never answered; the target completes with a
/// cancelled status that the dispatcher discards.
#[derive(Serialize, Deserialize, PartialEq, Eq, Debug, Clone, Default)]
pub struct SMBCancelRequest;

impl SMBByteSize for SMBCancelRequest {
    fn smb_byte_size(&self) -> usize {
        CANCEL_REQUEST_SIZE as usize
    }
}

impl SMBToBytes for SMBCancelRequest {
    fn smb_to_bytes(&self) -> Vec<u8> {
        [&u16_to_bytes(CANCEL_REQUEST_SIZE)[..], &u16_to_bytes(0)].concat()
    }
}
