use bytes::Bytes;
use serde::{Deserialize, Serialize};

use smb_core::{SMBFromBytes, SMBResult, SMBToBytes};
use smb_core::error::SMBError;

use crate::protocol::body::SMBRequestBody;
use crate::protocol::body::negotiate::LegacySMBNegotiateRequest;
use crate::protocol::header::{LegacySMBHeader, SMB2_HEADER_SIZE, SMBSyncHeader};

/// A request ready for the wire: typed header plus typed body. Bytes are
/// produced at the moment of transmission and never reused, so stale
/// session/tree/file ids cannot leak into a resend.
#[derive(Serialize, Deserialize, PartialEq, Eq, Debug, Clone)]
pub struct SMBMessage {
    pub header: SMBSyncHeader,
    pub body: SMBRequestBody,
}

impl SMBMessage {
    pub fn new(header: SMBSyncHeader, body: SMBRequestBody) -> Self {
        SMBMessage { header, body }
    }

    pub fn as_bytes(&self) -> Vec<u8> {
        [self.header.smb_to_bytes(), self.body.smb_to_bytes()].concat()
    }
}

/// SMB1 envelope for the legacy negotiate probe.
#[derive(Serialize, Deserialize, PartialEq, Eq, Debug, Clone)]
pub struct LegacySMBMessage {
    pub header: LegacySMBHeader,
    pub body: LegacySMBNegotiateRequest,
}

impl LegacySMBMessage {
    pub fn negotiate_probe() -> Self {
        Self {
            header: LegacySMBHeader::negotiate_probe(),
            body: LegacySMBNegotiateRequest::smb2_probe(),
        }
    }

    pub fn as_bytes(&self) -> Vec<u8> {
        [self.header.smb_to_bytes(), self.body.smb_to_bytes()].concat()
    }
}

/// Concatenate independent commands into one wire transmission. Each
/// member's `next_command` is patched to the 8-aligned distance to its
/// successor; the last member carries zero.
pub fn encode_compound(messages: &mut [SMBMessage]) -> Vec<u8> {
    let count = messages.len();
    let mut out = Vec::new();
    for (index, message) in messages.iter_mut().enumerate() {
        let body = message.body.smb_to_bytes();
        let unpadded = SMB2_HEADER_SIZE + body.len();
        let padded = unpadded.div_ceil(8) * 8;
        message.header.next_command = if index + 1 == count { 0 } else { padded as u32 };
        out.extend_from_slice(&message.header.smb_to_bytes());
        out.extend_from_slice(&body);
        if index + 1 != count {
            out.resize(out.len() + (padded - unpadded), 0);
        }
    }
    out
}

/// Split a received frame into its chained replies, in wire order. The
/// server processes compound members in append order and answers in the
/// same order, so position in this list matches position in the chain.
pub fn split_reply_frame(frame: &Bytes) -> SMBResult<Vec<(SMBSyncHeader, Bytes)>> {
    let mut replies = Vec::new();
    let mut cursor = 0usize;
    loop {
        if frame.len() < cursor + SMB2_HEADER_SIZE {
            return Err(SMBError::payload_too_small(
                cursor + SMB2_HEADER_SIZE,
                frame.len(),
            ));
        }
        let (_, header) = SMBSyncHeader::smb_from_bytes(&frame[cursor..])?;
        let next = header.next_command as usize;
        if next == 0 {
            replies.push((header, frame.slice(cursor + SMB2_HEADER_SIZE..)));
            return Ok(replies);
        }
        if next < SMB2_HEADER_SIZE || cursor + next > frame.len() {
            return Err(SMBError::buffer_overrun(cursor + next, frame.len()));
        }
        replies.push((header, frame.slice(cursor + SMB2_HEADER_SIZE..cursor + next)));
        cursor += next;
    }
}
