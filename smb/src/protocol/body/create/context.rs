use serde::{Deserialize, Serialize};

use smb_core::{SMBByteSize, SMBFromBytes, SMBResult, SMBToBytes};
use smb_core::error::SMBError;

use crate::byte_helper::{bytes_at, u16_at, u16_to_bytes, u32_at, u32_to_bytes, u64_at, u64_to_bytes};
use crate::protocol::body::create::SMBLeaseState;
use crate::protocol::body::file_id::SMBFileId;
use crate::protocol::body::tree_connect::SMBAccessMask;

pub const CONTEXT_DURABLE_REQUEST: [u8; 4] = *b"DHnQ";
pub const CONTEXT_DURABLE_RECONNECT: [u8; 4] = *b"DHnC";
pub const CONTEXT_LEASE: [u8; 4] = *b"RqLs";
pub const CONTEXT_MAXIMAL_ACCESS: [u8; 4] = *b"MxAc";
pub const CONTEXT_QUERY_FILE_ID: [u8; 4] = *b"QFid";
pub const CONTEXT_VENDOR_QUERY: [u8; 4] = *b"AAPL";

/// 16-byte lease key: low half is the file-identity hash, high half the
/// per-tree allocation counter. Stable for a file node across reconnects.
#[derive(Serialize, Deserialize, PartialEq, Eq, Hash, Debug, Copy, Clone, Default)]
pub struct SMBLeaseKey([u8; 16]);

impl SMBLeaseKey {
    pub fn from_halves(identity_low: u64, counter_high: u64) -> Self {
        let mut raw = [0u8; 16];
        raw[0..8].copy_from_slice(&identity_low.to_le_bytes());
        raw[8..16].copy_from_slice(&counter_high.to_le_bytes());
        Self(raw)
    }

    pub fn from_bytes(raw: [u8; 16]) -> Self {
        Self(raw)
    }

    pub fn bytes(&self) -> [u8; 16] {
        self.0
    }
}

#[derive(Serialize, Deserialize, PartialEq, Eq, Debug, Clone)]
pub enum SMBCreateRequestContext {
    /// `DHnQ`: ask for a handle that survives transport loss.
    DurableRequest,
    /// `DHnC`: reclaim a durable handle after reconnect, by its old id.
    DurableReconnect(SMBFileId),
    /// `RqLs`: request a caching lease.
    LeaseRequest {
        key: SMBLeaseKey,
        state: SMBLeaseState,
    },
    /// `MxAc`: ask the server to report effective maximal access.
    MaximalAccessQuery,
    /// `QFid`: ask for the on-disk file identity.
    FileIdQuery,
    /// Vendor extension query, opaque payload.
    VendorQuery(Vec<u8>),
}

impl SMBCreateRequestContext {
    pub fn name(&self) -> [u8; 4] {
        match self {
            Self::DurableRequest => CONTEXT_DURABLE_REQUEST,
            Self::DurableReconnect(_) => CONTEXT_DURABLE_RECONNECT,
            Self::LeaseRequest { .. } => CONTEXT_LEASE,
            Self::MaximalAccessQuery => CONTEXT_MAXIMAL_ACCESS,
            Self::FileIdQuery => CONTEXT_QUERY_FILE_ID,
            Self::VendorQuery(_) => CONTEXT_VENDOR_QUERY,
        }
    }

    fn data(&self) -> Vec<u8> {
        match self {
            Self::DurableRequest => vec![0; 16],
            Self::DurableReconnect(file_id) => file_id.smb_to_bytes(),
            Self::LeaseRequest { key, state } => [
                &key.bytes()[..],
                &state.smb_to_bytes(),
                &u32_to_bytes(0), // lease flags
                &u64_to_bytes(0), // lease duration
            ]
            .concat(),
            Self::MaximalAccessQuery => Vec::new(),
            Self::FileIdQuery => Vec::new(),
            Self::VendorQuery(data) => data.clone(),
        }
    }
}

/// Serialize an ordered context list as the chained blocks the create
/// request carries. Blocks are 8-aligned; the last block's next is zero.
pub fn encode_contexts(contexts: &[SMBCreateRequestContext]) -> Vec<u8> {
    let mut out = Vec::new();
    for (index, context) in contexts.iter().enumerate() {
        let data = context.data();
        // fixed part 16, name 4, pad to 8 before data
        let data_offset = if data.is_empty() { 0u16 } else { 24u16 };
        let unpadded = 16 + 4 + if data.is_empty() { 0 } else { 4 + data.len() };
        let padded = unpadded.div_ceil(8) * 8;
        let next = if index + 1 == contexts.len() {
            0u32
        } else {
            padded as u32
        };
        out.extend_from_slice(&u32_to_bytes(next));
        out.extend_from_slice(&u16_to_bytes(16)); // name offset
        out.extend_from_slice(&u16_to_bytes(4)); // name length
        out.extend_from_slice(&u16_to_bytes(0)); // reserved
        out.extend_from_slice(&u16_to_bytes(data_offset));
        out.extend_from_slice(&u32_to_bytes(data.len() as u32));
        out.extend_from_slice(&context.name());
        if !data.is_empty() {
            out.extend_from_slice(&[0u8; 4]);
            out.extend_from_slice(&data);
        }
        while out.len() % 8 != 0 {
            out.push(0);
        }
    }
    out
}

#[derive(Serialize, Deserialize, PartialEq, Eq, Debug, Clone)]
pub enum SMBCreateResponseContext {
    DurableGranted,
    LeaseGranted {
        key: SMBLeaseKey,
        state: SMBLeaseState,
        flags: u32,
    },
    MaximalAccess {
        query_status: u32,
        access: SMBAccessMask,
    },
    FileId {
        disk_file_id: u64,
        volume_id: u64,
    },
    Vendor {
        name: [u8; 4],
        data: Vec<u8>,
    },
}

/// Walk the response context chain. Unknown names are a hard error unless
/// the caller explicitly tolerates them (vendor queries), in which case
/// they surface opaquely.
pub fn parse_contexts(
    buffer: &[u8],
    tolerate_unknown: bool,
) -> SMBResult<Vec<SMBCreateResponseContext>> {
    let mut contexts = Vec::new();
    if buffer.is_empty() {
        return Ok(contexts);
    }
    let mut cursor = 0usize;
    loop {
        let next = u32_at(buffer, cursor)? as usize;
        let name_offset = u16_at(buffer, cursor + 4)? as usize;
        let name_length = u16_at(buffer, cursor + 6)? as usize;
        let data_offset = u16_at(buffer, cursor + 10)? as usize;
        let data_length = u32_at(buffer, cursor + 12)? as usize;
        let name = bytes_at(buffer, cursor + name_offset, name_length)?;
        let data = if data_length == 0 {
            &buffer[0..0]
        } else {
            bytes_at(buffer, cursor + data_offset, data_length)?
        };
        contexts.push(decode_context(name, data, tolerate_unknown)?);
        if next == 0 {
            break;
        }
        let advanced = cursor
            .checked_add(next)
            .ok_or_else(|| SMBError::buffer_overrun(usize::MAX, buffer.len()))?;
        if advanced <= cursor || advanced >= buffer.len() {
            return Err(SMBError::buffer_overrun(advanced, buffer.len()));
        }
        cursor = advanced;
    }
    Ok(contexts)
}

fn decode_context(
    name: &[u8],
    data: &[u8],
    tolerate_unknown: bool,
) -> SMBResult<SMBCreateResponseContext> {
    if name.len() != 4 {
        return Err(SMBError::malformed_reply(format!(
            "create context name length {}",
            name.len()
        )));
    }
    let mut tag = [0u8; 4];
    tag.copy_from_slice(name);
    match tag {
        CONTEXT_DURABLE_REQUEST | CONTEXT_DURABLE_RECONNECT => {
            Ok(SMBCreateResponseContext::DurableGranted)
        }
        CONTEXT_LEASE => {
            let key_bytes = bytes_at(data, 0, 16)?;
            let mut key = [0u8; 16];
            key.copy_from_slice(key_bytes);
            let state = u32_at(data, 16)?;
            let flags = u32_at(data, 20)?;
            Ok(SMBCreateResponseContext::LeaseGranted {
                key: SMBLeaseKey::from_bytes(key),
                state: SMBLeaseState::from_bits_truncate(state),
                flags,
            })
        }
        CONTEXT_MAXIMAL_ACCESS => Ok(SMBCreateResponseContext::MaximalAccess {
            query_status: u32_at(data, 0)?,
            access: SMBAccessMask::from_bits_truncate(u32_at(data, 4)?),
        }),
        CONTEXT_QUERY_FILE_ID => Ok(SMBCreateResponseContext::FileId {
            disk_file_id: u64_at(data, 0)?,
            volume_id: u64_at(data, 8)?,
        }),
        _ if tolerate_unknown => Ok(SMBCreateResponseContext::Vendor {
            name: tag,
            data: data.to_vec(),
        }),
        _ => Err(SMBError::malformed_reply(format!(
            "unknown create context {:?}",
            String::from_utf8_lossy(&tag)
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_then_parse_round_trip() {
        let key = SMBLeaseKey::from_halves(0xAABB, 7);
        let encoded = encode_contexts(&[
            SMBCreateRequestContext::DurableRequest,
            SMBCreateRequestContext::LeaseRequest {
                key,
                state: SMBLeaseState::READ_CACHING | SMBLeaseState::HANDLE_CACHING,
            },
        ]);
        assert_eq!(encoded.len() % 8, 0);
        // first block: empty data, next points at second
        let next = u32::from_le_bytes([encoded[0], encoded[1], encoded[2], encoded[3]]);
        assert_eq!(next as usize % 8, 0);
        let parsed = parse_contexts(&encoded, false).unwrap();
        assert_eq!(parsed.len(), 2);
        match &parsed[1] {
            SMBCreateResponseContext::LeaseGranted { key: parsed_key, state, .. } => {
                assert_eq!(*parsed_key, key);
                assert!(state.contains(SMBLeaseState::READ_CACHING));
            }
            other => panic!("unexpected context {:?}", other),
        }
    }

    #[test]
    fn unknown_context_is_hard_error() {
        let mut block = vec![0u8; 24];
        block[4..6].copy_from_slice(&16u16.to_le_bytes());
        block[6..8].copy_from_slice(&4u16.to_le_bytes());
        block[16..20].copy_from_slice(b"Zzzz");
        assert!(parse_contexts(&block, false).is_err());
        let tolerated = parse_contexts(&block, true).unwrap();
        assert!(matches!(
            tolerated[0],
            SMBCreateResponseContext::Vendor { name: [b'Z', b'z', b'z', b'z'], .. }
        ));
    }

    #[test]
    fn backward_next_offset_is_overrun() {
        let encoded = encode_contexts(&[
            SMBCreateRequestContext::DurableRequest,
            SMBCreateRequestContext::DurableRequest,
        ]);
        let mut bad = encoded.clone();
        bad[0..4].copy_from_slice(&u32::MAX.to_le_bytes());
        assert!(matches!(
            parse_contexts(&bad, false),
            Err(SMBError::BufferOverrun(_))
        ));
    }
}
