//! Scripted-server helpers for loopback integration tests: parse the
//! frames the client sends, shape replies byte-for-byte.

#![allow(dead_code)]

use smb_core::{SMBFromBytes, SMBToBytes};

use smb_client::client::{SMBClientConfig, SMBClientConfigBuilder};
use smb_client::protocol::body::dialect::SMBDialect;
use smb_client::protocol::header::{SMB2_HEADER_SIZE, SMBCommandCode, SMBFlags, SMBSyncHeader};
use smb_client::transport::LoopbackPeer;

pub const SESSION_ID: u64 = 0x0000_1100_0000_0077;
pub const TREE_ID: u32 = 0x0000_0501;

/// `RUST_LOG`-driven tracing for test runs; later calls are no-ops.
pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn test_config() -> SMBClientConfig {
    init_logging();
    SMBClientConfigBuilder::default()
        .legacy_negotiate_probe(false)
        .build()
        .unwrap()
}

pub fn parse_request(frame: &[u8]) -> (SMBSyncHeader, Vec<u8>) {
    let (body, header) = SMBSyncHeader::smb_from_bytes(frame).unwrap();
    (header, body.to_vec())
}

pub fn reply_frame(request: &SMBSyncHeader, status: u32, body: Vec<u8>) -> Vec<u8> {
    reply_frame_session(request, status, request.session_id, body)
}

pub fn reply_frame_session(
    request: &SMBSyncHeader,
    status: u32,
    session_id: u64,
    body: Vec<u8>,
) -> Vec<u8> {
    let mut header = SMBSyncHeader::new(
        request.command,
        request.credit_charge,
        32,
        request.message_id,
        request.tree_id,
        session_id,
    );
    header.status = status;
    header.flags = SMBFlags::SERVER_TO_REDIR;
    [header.smb_to_bytes(), body].concat()
}

pub fn negotiate_response_body(dialect: u16, max_size: u32, blob: &[u8]) -> Vec<u8> {
    let mut body = vec![0u8; 64];
    body[0..2].copy_from_slice(&65u16.to_le_bytes());
    body[2..4].copy_from_slice(&1u16.to_le_bytes()); // signing enabled
    body[4..6].copy_from_slice(&dialect.to_le_bytes());
    // server guid @8..24 left zero
    body[24..28].copy_from_slice(&0x06u32.to_le_bytes()); // leasing + large mtu
    body[28..32].copy_from_slice(&max_size.to_le_bytes());
    body[32..36].copy_from_slice(&max_size.to_le_bytes());
    body[36..40].copy_from_slice(&max_size.to_le_bytes());
    body[56..58].copy_from_slice(&128u16.to_le_bytes());
    body[58..60].copy_from_slice(&(blob.len() as u16).to_le_bytes());
    body.extend_from_slice(blob);
    body
}

pub fn session_setup_response_body(flags: u16, token: &[u8]) -> Vec<u8> {
    let mut body = vec![0u8; 8];
    body[0..2].copy_from_slice(&9u16.to_le_bytes());
    body[2..4].copy_from_slice(&flags.to_le_bytes());
    body[4..6].copy_from_slice(&72u16.to_le_bytes());
    body[6..8].copy_from_slice(&(token.len() as u16).to_le_bytes());
    body.extend_from_slice(token);
    body
}

pub fn tree_connect_response_body(share_type: u8) -> Vec<u8> {
    let mut body = vec![0u8; 16];
    body[0..2].copy_from_slice(&16u16.to_le_bytes());
    body[2] = share_type;
    body[12..16].copy_from_slice(&0x001F_01FFu32.to_le_bytes());
    body
}

pub fn create_response_body(
    oplock_level: u8,
    persistent: u64,
    volatile: u64,
    contexts: &[u8],
) -> Vec<u8> {
    let mut body = vec![0u8; 88];
    body[0..2].copy_from_slice(&89u16.to_le_bytes());
    body[2] = oplock_level;
    body[4..8].copy_from_slice(&1u32.to_le_bytes()); // opened
    body[48..56].copy_from_slice(&0u64.to_le_bytes());
    body[56..60].copy_from_slice(&0x80u32.to_le_bytes());
    body[64..72].copy_from_slice(&persistent.to_le_bytes());
    body[72..80].copy_from_slice(&volatile.to_le_bytes());
    if !contexts.is_empty() {
        // chain starts right after the fixed part: 64 + 88 = 152, 8-aligned
        body[80..84].copy_from_slice(&152u32.to_le_bytes());
        body[84..88].copy_from_slice(&(contexts.len() as u32).to_le_bytes());
        body.extend_from_slice(contexts);
    }
    body
}

/// One response create-context block (as the last in its chain).
pub fn response_context_block(name: &[u8; 4], data: &[u8]) -> Vec<u8> {
    let mut block = vec![0u8; 16];
    block[4..6].copy_from_slice(&16u16.to_le_bytes()); // name offset
    block[6..8].copy_from_slice(&4u16.to_le_bytes()); // name length
    if !data.is_empty() {
        block[10..12].copy_from_slice(&24u16.to_le_bytes());
        block[12..16].copy_from_slice(&(data.len() as u32).to_le_bytes());
    }
    block.extend_from_slice(name);
    if !data.is_empty() {
        block.extend_from_slice(&[0u8; 4]);
        block.extend_from_slice(data);
    }
    while block.len() % 8 != 0 {
        block.push(0);
    }
    block
}

pub fn lease_context_data(key: [u8; 16], state: u32) -> Vec<u8> {
    let mut data = Vec::new();
    data.extend_from_slice(&key);
    data.extend_from_slice(&state.to_le_bytes());
    data.extend_from_slice(&0u32.to_le_bytes());
    data.extend_from_slice(&0u64.to_le_bytes());
    data
}

pub fn read_response_body(data: &[u8]) -> Vec<u8> {
    let mut body = vec![0u8; 16];
    body[0..2].copy_from_slice(&17u16.to_le_bytes());
    body[2] = 80; // 64 + 16
    body[4..8].copy_from_slice(&(data.len() as u32).to_le_bytes());
    body.extend_from_slice(data);
    body
}

pub fn write_response_body(count: u32) -> Vec<u8> {
    let mut body = vec![0u8; 16];
    body[0..2].copy_from_slice(&17u16.to_le_bytes());
    body[4..8].copy_from_slice(&count.to_le_bytes());
    body
}

pub fn close_response_body() -> Vec<u8> {
    let mut body = vec![0u8; 60];
    body[0..2].copy_from_slice(&60u16.to_le_bytes());
    body
}

pub fn empty_body(structure_size: u16) -> Vec<u8> {
    let mut body = vec![0u8; 4];
    body[0..2].copy_from_slice(&structure_size.to_le_bytes());
    body
}

pub fn lease_break_ack_response_body(key: [u8; 16], state: u32) -> Vec<u8> {
    let mut body = vec![0u8; 36];
    body[0..2].copy_from_slice(&36u16.to_le_bytes());
    body[8..24].copy_from_slice(&key);
    body[24..28].copy_from_slice(&state.to_le_bytes());
    body
}

/// Contexts attached to a client create request, as (name, data) pairs.
pub fn create_request_contexts(body: &[u8]) -> Vec<(String, Vec<u8>)> {
    let offset = u32::from_le_bytes([body[48], body[49], body[50], body[51]]) as usize;
    let length = u32::from_le_bytes([body[52], body[53], body[54], body[55]]) as usize;
    let mut contexts = Vec::new();
    if length == 0 {
        return contexts;
    }
    let chain = &body[offset - SMB2_HEADER_SIZE..offset - SMB2_HEADER_SIZE + length];
    let mut cursor = 0usize;
    loop {
        let next =
            u32::from_le_bytes([chain[cursor], chain[cursor + 1], chain[cursor + 2], chain[cursor + 3]])
                as usize;
        let name_offset =
            u16::from_le_bytes([chain[cursor + 4], chain[cursor + 5]]) as usize;
        let name_length =
            u16::from_le_bytes([chain[cursor + 6], chain[cursor + 7]]) as usize;
        let data_offset =
            u16::from_le_bytes([chain[cursor + 10], chain[cursor + 11]]) as usize;
        let data_length = u32::from_le_bytes([
            chain[cursor + 12],
            chain[cursor + 13],
            chain[cursor + 14],
            chain[cursor + 15],
        ]) as usize;
        let name = String::from_utf8_lossy(
            &chain[cursor + name_offset..cursor + name_offset + name_length],
        )
        .to_string();
        let data = if data_length == 0 {
            Vec::new()
        } else {
            chain[cursor + data_offset..cursor + data_offset + data_length].to_vec()
        };
        contexts.push((name, data));
        if next == 0 {
            return contexts;
        }
        cursor += next;
    }
}

/// Serve the standard attach sequence: negotiate, one-leg anonymous
/// session setup, and a tree connect for a disk share.
pub async fn serve_attach(peer: &mut LoopbackPeer, max_size: u32) {
    serve_establishment(peer, max_size).await;
    serve_tree_connect(peer, 0x01).await;
}

/// Negotiate (2.1) plus one anonymous session-setup leg.
pub async fn serve_establishment(peer: &mut LoopbackPeer, max_size: u32) {
    let frame = peer.recv_frame().await.unwrap();
    let (header, _body) = parse_request(&frame);
    assert_eq!(header.command, SMBCommandCode::Negotiate);
    peer.send_reply(reply_frame(
        &header,
        0,
        negotiate_response_body(SMBDialect::V2_1_0 as u16, max_size, &[]),
    ));
    let frame = peer.recv_frame().await.unwrap();
    let (header, _body) = parse_request(&frame);
    assert_eq!(header.command, SMBCommandCode::SessionSetup);
    peer.send_reply(reply_frame_session(
        &header,
        0,
        SESSION_ID,
        session_setup_response_body(0, &[]),
    ));
}

pub async fn serve_tree_connect(peer: &mut LoopbackPeer, share_type: u8) {
    let frame = peer.recv_frame().await.unwrap();
    let (mut header, _body) = parse_request(&frame);
    assert_eq!(header.command, SMBCommandCode::TreeConnect);
    header.tree_id = TREE_ID;
    peer.send_reply(reply_frame(
        &header,
        0,
        tree_connect_response_body(share_type),
    ));
}

/// Answer one read request with the matching slice of `source`.
pub fn read_reply_for(frame: &[u8], source: &[u8]) -> Vec<u8> {
    let (header, body) = parse_request(frame);
    assert_eq!(header.command, SMBCommandCode::Read);
    let length = u32::from_le_bytes([body[4], body[5], body[6], body[7]]) as usize;
    let offset = u64::from_le_bytes(body[8..16].try_into().unwrap()) as usize;
    let end = (offset + length).min(source.len());
    reply_frame(&header, 0, read_response_body(&source[offset..end]))
}

pub fn read_request_offset(frame: &[u8]) -> u64 {
    let (_header, body) = parse_request(frame);
    u64::from_le_bytes(body[8..16].try_into().unwrap())
}

/// Answer one write request in full, returning (offset, data).
pub fn serve_write(frame: &[u8], peer: &LoopbackPeer) -> (u64, Vec<u8>) {
    let (header, body) = parse_request(frame);
    assert_eq!(header.command, SMBCommandCode::Write);
    let length = u32::from_le_bytes([body[4], body[5], body[6], body[7]]) as usize;
    let offset = u64::from_le_bytes(body[8..16].try_into().unwrap());
    let data = body[48..48 + length].to_vec();
    peer.send_reply(reply_frame(&header, 0, write_response_body(length as u32)));
    (offset, data)
}

pub async fn serve_echo(peer: &mut LoopbackPeer) {
    let frame = peer.recv_frame().await.unwrap();
    let (header, _body) = parse_request(&frame);
    assert_eq!(header.command, SMBCommandCode::Echo);
    peer.send_reply(reply_frame(&header, 0, empty_body(4)));
}

pub async fn serve_create(peer: &mut LoopbackPeer, persistent: u64, volatile: u64) -> Vec<u8> {
    let frame = peer.recv_frame().await.unwrap();
    let (header, body) = parse_request(&frame);
    assert_eq!(header.command, SMBCommandCode::Create);
    peer.send_reply(reply_frame(
        &header,
        0,
        create_response_body(0, persistent, volatile, &[]),
    ));
    body
}
