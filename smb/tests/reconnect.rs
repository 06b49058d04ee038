mod common;

use std::sync::Arc;

use smb_core::error::SMBError;

use smb_client::client::{SMBClientConfigBuilder, SMBConnection, SMBOpenArgs};
use smb_client::protocol::header::SMBCommandCode;
use smb_client::transport::loopback_pair;
use smb_client::util::auth::AnonymousAuth;

use common::*;

/// A reset between send and reply resends exactly once, transparently.
#[tokio::test]
async fn reset_in_flight_resends_once() {
    let (factory, mut server) = loopback_pair();
    let server_task = tokio::spawn(async move {
        let mut peer = server.accept().await.unwrap();
        serve_establishment(&mut peer, 1 << 16).await;
        // the echo goes out, then the transport dies under it
        let frame = peer.recv_frame().await.unwrap();
        let (header, _body) = parse_request(&frame);
        assert_eq!(header.command, SMBCommandCode::Echo);
        peer.reset();
        // reconnection: full negotiate + session setup, then the resend
        let mut peer = server.accept().await.unwrap();
        serve_establishment(&mut peer, 1 << 16).await;
        let frame = peer.recv_frame().await.unwrap();
        let (header, _body) = parse_request(&frame);
        assert_eq!(header.command, SMBCommandCode::Echo);
        peer.send_reply(reply_frame(&header, 0, empty_body(4)));
        peer
    });
    let connection = SMBConnection::connect(factory, test_config()).await.unwrap();
    connection
        .session_setup(Arc::new(AnonymousAuth))
        .await
        .unwrap();
    connection.echo().await.unwrap();
    server_task.await.unwrap();
}

/// A second reset within the same operation surfaces `Disconnected`,
/// never a silent partial result.
#[tokio::test]
async fn second_reset_surfaces_disconnected() {
    let (factory, mut server) = loopback_pair();
    let server_task = tokio::spawn(async move {
        let mut peer = server.accept().await.unwrap();
        serve_establishment(&mut peer, 1 << 16).await;
        let _frame = peer.recv_frame().await.unwrap();
        peer.reset();
        let mut peer = server.accept().await.unwrap();
        serve_establishment(&mut peer, 1 << 16).await;
        let _frame = peer.recv_frame().await.unwrap();
        peer.reset();
    });
    let connection = SMBConnection::connect(factory, test_config()).await.unwrap();
    connection
        .session_setup(Arc::new(AnonymousAuth))
        .await
        .unwrap();
    let error = connection.echo().await.unwrap_err();
    assert!(matches!(error, SMBError::Disconnected(_)));
    server_task.await.unwrap();
}

/// Durable handles survive the reset: the reconnect create carries the
/// old id, and the fresh FID pair is swapped in under the same local
/// handle.
#[tokio::test]
async fn durable_handle_reclaim_swaps_file_id() {
    let (factory, mut server) = loopback_pair();
    let server_task = tokio::spawn(async move {
        let mut peer = server.accept().await.unwrap();
        serve_attach(&mut peer, 1 << 16).await;
        // durable create
        let frame = peer.recv_frame().await.unwrap();
        let (header, body) = parse_request(&frame);
        assert_eq!(header.command, SMBCommandCode::Create);
        let contexts = create_request_contexts(&body);
        assert!(contexts.iter().any(|(name, _)| name == "DHnQ"));
        peer.send_reply(reply_frame(
            &header,
            0,
            create_response_body(0, 0xAA, 0xBB, &response_context_block(b"DHnQ", &[0u8; 8])),
        ));
        // flush goes out, transport dies
        let frame = peer.recv_frame().await.unwrap();
        let (header, body) = parse_request(&frame);
        assert_eq!(header.command, SMBCommandCode::Flush);
        assert_eq!(&body[8..16], &0xAAu64.to_le_bytes());
        peer.reset();
        // reconnect: negotiate, session, tree, then the reclaim create
        let mut peer = server.accept().await.unwrap();
        serve_attach(&mut peer, 1 << 16).await;
        let frame = peer.recv_frame().await.unwrap();
        let (header, body) = parse_request(&frame);
        assert_eq!(header.command, SMBCommandCode::Create);
        let contexts = create_request_contexts(&body);
        let reconnect = contexts
            .iter()
            .find(|(name, _)| name == "DHnC")
            .expect("durable reconnect context");
        assert_eq!(&reconnect.1[0..8], &0xAAu64.to_le_bytes());
        assert_eq!(&reconnect.1[8..16], &0xBBu64.to_le_bytes());
        peer.send_reply(reply_frame(
            &header,
            0,
            create_response_body(0, 0xCC, 0xDD, &[]),
        ));
        // the flush resend must carry the fresh FID pair
        let frame = peer.recv_frame().await.unwrap();
        let (header, body) = parse_request(&frame);
        assert_eq!(header.command, SMBCommandCode::Flush);
        assert_eq!(&body[8..16], &0xCCu64.to_le_bytes());
        assert_eq!(&body[16..24], &0xDDu64.to_le_bytes());
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
        .create(
            "durable.txt",
            SMBOpenArgs {
                request_durable: true,
                ..SMBOpenArgs::read_write()
            },
        )
        .await
        .unwrap();
    assert!(file.is_durable().await.unwrap());
    file.flush().await.unwrap();
    server_task.await.unwrap();
}

/// Non-durable handles die with the transport; the next use reports the
/// disconnect instead of quietly reopening.
#[tokio::test]
async fn plain_handle_is_invalidated_by_reset() {
    let (factory, mut server) = loopback_pair();
    let server_task = tokio::spawn(async move {
        let mut peer = server.accept().await.unwrap();
        serve_attach(&mut peer, 1 << 16).await;
        serve_create(&mut peer, 0xAA, 0xBB).await;
        let _frame = peer.recv_frame().await.unwrap();
        peer.reset();
        // reconnection re-establishes session and tree only
        let mut peer = server.accept().await.unwrap();
        serve_attach(&mut peer, 1 << 16).await;
    });
    let connection = SMBConnection::connect(factory, test_config()).await.unwrap();
    connection
        .session_setup(Arc::new(AnonymousAuth))
        .await
        .unwrap();
    let tree = connection.tree_connect("server", "share").await.unwrap();
    let file = tree
        .create("plain.txt", SMBOpenArgs::read_only())
        .await
        .unwrap();
    let error = file.flush().await.unwrap_err();
    assert!(matches!(error, SMBError::Disconnected(_)));
    server_task.await.unwrap();
}

/// Mid-window reset on a durable pipelined read: applied ranges stay
/// applied, only the un-acknowledged remainder is resent.
#[tokio::test]
async fn pipelined_read_restores_window_after_reset() {
    let (factory, mut server) = loopback_pair();
    let source: Vec<u8> = (0u8..12).collect();
    let server_source = source.clone();
    let config = SMBClientConfigBuilder::default()
        .legacy_negotiate_probe(false)
        .read_window(2)
        .build()
        .unwrap();
    let server_task = tokio::spawn(async move {
        let mut peer = server.accept().await.unwrap();
        serve_attach(&mut peer, 4).await;
        let frame = peer.recv_frame().await.unwrap();
        let (header, _body) = parse_request(&frame);
        peer.send_reply(reply_frame(
            &header,
            0,
            create_response_body(0, 0xAA, 0xBB, &response_context_block(b"DHnQ", &[0u8; 8])),
        ));
        // two chunks in flight; answer the first, then kill the link
        let first = peer.recv_frame().await.unwrap();
        assert_eq!(read_request_offset(&first), 0);
        peer.send_reply(read_reply_for(&first, &server_source));
        let _second = peer.recv_frame().await.unwrap();
        peer.reset();
        // reconnect + reclaim
        let mut peer = server.accept().await.unwrap();
        serve_attach(&mut peer, 4).await;
        let frame = peer.recv_frame().await.unwrap();
        let (header, body) = parse_request(&frame);
        assert_eq!(header.command, SMBCommandCode::Create);
        assert!(
            create_request_contexts(&body)
                .iter()
                .any(|(name, _)| name == "DHnC")
        );
        peer.send_reply(reply_frame(
            &header,
            0,
            create_response_body(0, 0xCC, 0xDD, &[]),
        ));
        // only the two un-applied ranges come back, never offset zero
        let mut offsets = Vec::new();
        for _ in 0..2 {
            let frame = peer.recv_frame().await.unwrap();
            let offset = read_request_offset(&frame);
            assert_ne!(offset, 0, "applied range must not be re-read");
            offsets.push(offset);
            peer.send_reply(read_reply_for(&frame, &server_source));
        }
        offsets.sort_unstable();
        assert_eq!(offsets, vec![4, 8]);
        peer
    });
    let connection = SMBConnection::connect(factory, config).await.unwrap();
    connection
        .session_setup(Arc::new(AnonymousAuth))
        .await
        .unwrap();
    let tree = connection.tree_connect("server", "share").await.unwrap();
    let file = tree
        .create(
            "durable.bin",
            SMBOpenArgs {
                request_durable: true,
                ..SMBOpenArgs::read_only()
            },
        )
        .await
        .unwrap();
    let mut buffer = vec![0u8; 12];
    let read = file.read(0, &mut buffer).await.unwrap();
    assert_eq!(read, 12);
    assert_eq!(buffer, source);
    server_task.await.unwrap();
}
