mod common;

use std::sync::Arc;

use smb_core::error::SMBError;
use smb_core::nt_status::NTStatus;

use smb_client::client::{SMBConnection, SMBOpenArgs, SMBRequestOutcome};
use smb_client::protocol::body::SMBRequestBody;
use smb_client::protocol::body::echo::SMBEchoRequest;
use smb_client::protocol::body::flush::SMBFlushRequest;
use smb_client::protocol::body::file_id::SMBFileId;
use smb_client::protocol::body::query_directory::{SMBDirectoryEntry, encode_entries};
use smb_client::protocol::body::create::SMBFileAttributes;
use smb_client::protocol::body::filetime::FileTime;
use smb_client::protocol::header::{SMB2_HEADER_SIZE, SMBCommandCode};
use smb_client::transport::loopback_pair;
use smb_client::util::auth::AnonymousAuth;

use common::*;

#[tokio::test]
async fn multi_leg_session_setup_then_tree_connect() {
    let (factory, mut server) = loopback_pair();
    let server_task = tokio::spawn(async move {
        let mut peer = server.accept().await.unwrap();
        let frame = peer.recv_frame().await.unwrap();
        let (header, _body) = parse_request(&frame);
        peer.send_reply(reply_frame(
            &header,
            0,
            negotiate_response_body(0x0210, 1 << 16, b"leg0"),
        ));
        // first leg: more processing required, hand back a token
        let frame = peer.recv_frame().await.unwrap();
        let (header, _body) = parse_request(&frame);
        assert_eq!(header.command, SMBCommandCode::SessionSetup);
        peer.send_reply(reply_frame_session(
            &header,
            NTStatus::MoreProcessingRequired as u32,
            SESSION_ID,
            session_setup_response_body(0, b"leg1"),
        ));
        // second leg: done
        let frame = peer.recv_frame().await.unwrap();
        let (header, _body) = parse_request(&frame);
        assert_eq!(header.command, SMBCommandCode::SessionSetup);
        assert_eq!(header.session_id, SESSION_ID);
        peer.send_reply(reply_frame_session(
            &header,
            0,
            SESSION_ID,
            session_setup_response_body(0x01, &[]),
        ));
        serve_tree_connect(&mut peer, 0x01).await;
        peer
    });
    let connection = SMBConnection::connect(factory, test_config()).await.unwrap();
    let flags = connection
        .session_setup(Arc::new(AnonymousAuth))
        .await
        .unwrap();
    assert_eq!(flags.bits(), 0x01);
    let tree = connection.tree_connect("server", "share").await.unwrap();
    assert!(
        tree.maximal_access()
            .await
            .unwrap()
            .bits()
            & 0x1
            != 0
    );
    server_task.await.unwrap();
}

#[tokio::test]
async fn rejected_logon_maps_to_auth_rejected() {
    let (factory, mut server) = loopback_pair();
    let server_task = tokio::spawn(async move {
        let mut peer = server.accept().await.unwrap();
        let frame = peer.recv_frame().await.unwrap();
        let (header, _body) = parse_request(&frame);
        peer.send_reply(reply_frame(
            &header,
            0,
            negotiate_response_body(0x0210, 1 << 16, &[]),
        ));
        let frame = peer.recv_frame().await.unwrap();
        let (header, _body) = parse_request(&frame);
        peer.send_reply(reply_frame(
            &header,
            NTStatus::StatusLogonFailure as u32,
            [9u16.to_le_bytes().to_vec(), vec![0; 6]].concat(),
        ));
        peer
    });
    let connection = SMBConnection::connect(factory, test_config()).await.unwrap();
    let error = connection
        .session_setup(Arc::new(AnonymousAuth))
        .await
        .unwrap_err();
    assert!(matches!(error, SMBError::AuthRejected(_)));
    server_task.await.unwrap();
}

#[tokio::test]
async fn bad_share_maps_to_share_unavailable() {
    let (factory, mut server) = loopback_pair();
    let server_task = tokio::spawn(async move {
        let mut peer = server.accept().await.unwrap();
        serve_establishment(&mut peer, 1 << 16).await;
        let frame = peer.recv_frame().await.unwrap();
        let (header, _body) = parse_request(&frame);
        assert_eq!(header.command, SMBCommandCode::TreeConnect);
        peer.send_reply(reply_frame(
            &header,
            NTStatus::BadNetworkName as u32,
            [9u16.to_le_bytes().to_vec(), vec![0; 6]].concat(),
        ));
        peer
    });
    let connection = SMBConnection::connect(factory, test_config()).await.unwrap();
    connection
        .session_setup(Arc::new(AnonymousAuth))
        .await
        .unwrap();
    let error = connection
        .tree_connect("server", "missing")
        .await
        .unwrap_err();
    assert!(matches!(error, SMBError::ShareUnavailable(_)));
    server_task.await.unwrap();
}

#[tokio::test]
async fn end_to_end_file_round_trip() {
    let (factory, mut server) = loopback_pair();
    let payload = b"engine payload".to_vec();
    let server_payload = payload.clone();
    let server_task = tokio::spawn(async move {
        let mut peer = server.accept().await.unwrap();
        serve_attach(&mut peer, 1 << 16).await;
        let create_body = serve_create(&mut peer, 0xAA, 0xBB).await;
        let name_length =
            u16::from_le_bytes([create_body[46], create_body[47]]) as usize;
        assert_eq!(name_length, "file.txt".len() * 2);
        // write
        let frame = peer.recv_frame().await.unwrap();
        let (header, body) = parse_request(&frame);
        assert_eq!(header.command, SMBCommandCode::Write);
        assert_eq!(header.tree_id, TREE_ID);
        let length = u32::from_le_bytes([body[4], body[5], body[6], body[7]]) as usize;
        assert_eq!(&body[48..48 + length], &server_payload[..]);
        peer.send_reply(reply_frame(&header, 0, write_response_body(length as u32)));
        // read
        let frame = peer.recv_frame().await.unwrap();
        let (header, body) = parse_request(&frame);
        assert_eq!(header.command, SMBCommandCode::Read);
        let persistent = u64::from_le_bytes(body[16..24].try_into().unwrap());
        assert_eq!(persistent, 0xAA);
        peer.send_reply(reply_frame(&header, 0, read_response_body(&server_payload)));
        // flush
        let frame = peer.recv_frame().await.unwrap();
        let (header, _body) = parse_request(&frame);
        assert_eq!(header.command, SMBCommandCode::Flush);
        peer.send_reply(reply_frame(&header, 0, empty_body(4)));
        // close
        let frame = peer.recv_frame().await.unwrap();
        let (header, _body) = parse_request(&frame);
        assert_eq!(header.command, SMBCommandCode::Close);
        peer.send_reply(reply_frame(&header, 0, close_response_body()));
        // echo
        let frame = peer.recv_frame().await.unwrap();
        let (header, _body) = parse_request(&frame);
        assert_eq!(header.command, SMBCommandCode::Echo);
        peer.send_reply(reply_frame(&header, 0, empty_body(4)));
        // logoff
        let frame = peer.recv_frame().await.unwrap();
        let (header, _body) = parse_request(&frame);
        assert_eq!(header.command, SMBCommandCode::LogOff);
        peer.send_reply(reply_frame(&header, 0, empty_body(4)));
        peer
    });
    let connection = SMBConnection::connect(factory, test_config()).await.unwrap();
    connection
        .session_setup(Arc::new(AnonymousAuth))
        .await
        .unwrap();
    let tree = connection.tree_connect("server", "share").await.unwrap();
    let file = tree
        .create("file.txt", SMBOpenArgs::read_write())
        .await
        .unwrap();
    let written = file.write(0, &payload).await.unwrap();
    assert_eq!(written, payload.len());
    let mut buffer = vec![0u8; payload.len()];
    let read = file.read(0, &mut buffer).await.unwrap();
    assert_eq!(read, payload.len());
    assert_eq!(buffer, payload);
    file.flush().await.unwrap();
    file.close().await.unwrap();
    connection.echo().await.unwrap();
    connection.logoff().await.unwrap();
    server_task.await.unwrap();
}

#[tokio::test]
async fn directory_listing_stops_at_zero_offset() {
    let (factory, mut server) = loopback_pair();
    let entry = |name: &str| SMBDirectoryEntry {
        file_index: 0,
        creation_time: FileTime::default(),
        last_access_time: FileTime::default(),
        last_write_time: FileTime::default(),
        change_time: FileTime::default(),
        end_of_file: 1,
        allocation_size: 4096,
        file_attributes: SMBFileAttributes::NORMAL,
        file_name: name.to_string(),
    };
    let entries = encode_entries(&[(entry("a.txt"), false), (entry("b.txt"), true)]);
    let server_task = tokio::spawn(async move {
        let mut peer = server.accept().await.unwrap();
        serve_attach(&mut peer, 1 << 16).await;
        serve_create(&mut peer, 1, 2).await;
        let frame = peer.recv_frame().await.unwrap();
        let (header, _body) = parse_request(&frame);
        assert_eq!(header.command, SMBCommandCode::QueryDirectory);
        let mut body = vec![0u8; 8];
        body[0..2].copy_from_slice(&9u16.to_le_bytes());
        body[2..4].copy_from_slice(&((SMB2_HEADER_SIZE + 8) as u16).to_le_bytes());
        body[4..8].copy_from_slice(&(entries.len() as u32).to_le_bytes());
        body.extend_from_slice(&entries);
        peer.send_reply(reply_frame(&header, 0, body));
        peer
    });
    let connection = SMBConnection::connect(factory, test_config()).await.unwrap();
    connection
        .session_setup(Arc::new(AnonymousAuth))
        .await
        .unwrap();
    let tree = connection.tree_connect("server", "share").await.unwrap();
    let directory = tree.create("", SMBOpenArgs::directory()).await.unwrap();
    let listing = directory.query_directory("*", true).await.unwrap();
    assert!(listing.error.is_none());
    assert_eq!(listing.entries.len(), 2);
    assert_eq!(listing.entries[0].file_name, "a.txt");
    server_task.await.unwrap();
}

#[tokio::test]
async fn directory_offset_past_buffer_is_overrun() {
    let (factory, mut server) = loopback_pair();
    let entry = SMBDirectoryEntry {
        file_index: 0,
        creation_time: FileTime::default(),
        last_access_time: FileTime::default(),
        last_write_time: FileTime::default(),
        change_time: FileTime::default(),
        end_of_file: 1,
        allocation_size: 4096,
        file_attributes: SMBFileAttributes::NORMAL,
        file_name: "a.txt".to_string(),
    };
    let mut entries = encode_entries(&[(entry.clone(), false), (entry, true)]);
    // first record points far past the reply buffer
    entries[0..4].copy_from_slice(&0xFFFF_0000u32.to_le_bytes());
    let server_task = tokio::spawn(async move {
        let mut peer = server.accept().await.unwrap();
        serve_attach(&mut peer, 1 << 16).await;
        serve_create(&mut peer, 1, 2).await;
        let frame = peer.recv_frame().await.unwrap();
        let (header, _body) = parse_request(&frame);
        let mut body = vec![0u8; 8];
        body[0..2].copy_from_slice(&9u16.to_le_bytes());
        body[2..4].copy_from_slice(&((SMB2_HEADER_SIZE + 8) as u16).to_le_bytes());
        body[4..8].copy_from_slice(&(entries.len() as u32).to_le_bytes());
        body.extend_from_slice(&entries);
        peer.send_reply(reply_frame(&header, 0, body));
        peer
    });
    let connection = SMBConnection::connect(factory, test_config()).await.unwrap();
    connection
        .session_setup(Arc::new(AnonymousAuth))
        .await
        .unwrap();
    let tree = connection.tree_connect("server", "share").await.unwrap();
    let directory = tree.create("", SMBOpenArgs::directory()).await.unwrap();
    let listing = directory.query_directory("*", true).await.unwrap();
    assert_eq!(listing.entries.len(), 1);
    assert!(matches!(listing.error, Some(SMBError::BufferOverrun(_))));
    server_task.await.unwrap();
}

#[tokio::test]
async fn compound_replies_parse_in_append_order() {
    let (factory, mut server) = loopback_pair();
    let server_task = tokio::spawn(async move {
        let mut peer = server.accept().await.unwrap();
        serve_establishment(&mut peer, 1 << 16).await;
        // one frame carrying two chained requests
        let frame = peer.recv_frame().await.unwrap();
        let (first, _) = parse_request(&frame);
        assert_eq!(first.command, SMBCommandCode::Echo);
        let next = first.next_command as usize;
        assert!(next > 0);
        let (second, _) = parse_request(&frame[next..]);
        assert_eq!(second.command, SMBCommandCode::Flush);
        // answer both in one chained frame, same order
        let mut first_reply = reply_frame(&first, 0, empty_body(4));
        let padded = (first_reply.len() + 7) / 8 * 8;
        let next_offset = padded as u32;
        first_reply[20..24].copy_from_slice(&next_offset.to_le_bytes());
        first_reply.resize(padded, 0);
        first_reply.extend_from_slice(&reply_frame(&second, 0, empty_body(4)));
        peer.send_reply(first_reply);
        peer
    });
    let connection = SMBConnection::connect(factory, test_config()).await.unwrap();
    connection
        .session_setup(Arc::new(AnonymousAuth))
        .await
        .unwrap();
    let outcomes = connection
        .compound()
        .add(0, SMBRequestBody::Echo(SMBEchoRequest))
        .add(
            0,
            SMBRequestBody::Flush(SMBFlushRequest {
                file_id: SMBFileId {
                    persistent: 7,
                    volatile: 8,
                },
            }),
        )
        .send()
        .await
        .unwrap();
    assert_eq!(outcomes.len(), 2);
    let SMBRequestOutcome::Completed { header, .. } = &outcomes[0] else {
        panic!("first compound member did not complete");
    };
    assert_eq!(header.command, SMBCommandCode::Echo);
    let SMBRequestOutcome::Completed { header, .. } = &outcomes[1] else {
        panic!("second compound member did not complete");
    };
    assert_eq!(header.command, SMBCommandCode::Flush);
    server_task.await.unwrap();
}
