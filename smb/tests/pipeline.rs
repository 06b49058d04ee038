mod common;

use std::sync::Arc;

use smb_client::client::{SMBClientConfigBuilder, SMBConnection, SMBOpenArgs};
use smb_client::transport::loopback_pair;
use smb_client::util::auth::AnonymousAuth;

use common::*;

fn windowed_config(read_window: usize, write_window: usize) -> smb_client::client::SMBClientConfig {
    init_logging();
    SMBClientConfigBuilder::default()
        .legacy_negotiate_probe(false)
        .read_window(read_window)
        .write_window(write_window)
        .build()
        .unwrap()
}

/// A 5-chunk read over a 2-slot window completing in order
/// [2, 1, 4, 3, 5] must assemble the same bytes a sequential read would.
#[tokio::test]
async fn five_chunk_read_completing_out_of_order() {
    let (factory, mut server) = loopback_pair();
    let source: Vec<u8> = (0u8..20).collect();
    let server_source = source.clone();
    let server_task = tokio::spawn(async move {
        let mut peer = server.accept().await.unwrap();
        // chunk size 4: the negotiate caps reads at four bytes
        serve_attach(&mut peer, 4).await;
        serve_create(&mut peer, 1, 2).await;
        let first = peer.recv_frame().await.unwrap();
        let second = peer.recv_frame().await.unwrap();
        peer.send_reply(read_reply_for(&second, &server_source));
        let third = peer.recv_frame().await.unwrap();
        peer.send_reply(read_reply_for(&first, &server_source));
        let fourth = peer.recv_frame().await.unwrap();
        peer.send_reply(read_reply_for(&fourth, &server_source));
        let fifth = peer.recv_frame().await.unwrap();
        peer.send_reply(read_reply_for(&third, &server_source));
        peer.send_reply(read_reply_for(&fifth, &server_source));
        // window never exceeded two outstanding requests
        let offsets: Vec<u64> = [&first, &second, &third, &fourth, &fifth]
            .iter()
            .map(|frame| read_request_offset(frame))
            .collect();
        assert_eq!(offsets, vec![0, 4, 8, 12, 16]);
        peer
    });
    let connection = SMBConnection::connect(factory, windowed_config(2, 2))
        .await
        .unwrap();
    connection
        .session_setup(Arc::new(AnonymousAuth))
        .await
        .unwrap();
    let tree = connection.tree_connect("server", "share").await.unwrap();
    let file = tree.create("big.bin", SMBOpenArgs::read_only()).await.unwrap();
    let mut buffer = vec![0u8; 20];
    let read = file.read(0, &mut buffer).await.unwrap();
    assert_eq!(read, 20);
    assert_eq!(buffer, source);
    server_task.await.unwrap();
}

#[tokio::test]
async fn pipelined_write_completing_out_of_order() {
    let (factory, mut server) = loopback_pair();
    let source: Vec<u8> = (0u8..12).collect();
    let expected = source.clone();
    let server_task = tokio::spawn(async move {
        let mut peer = server.accept().await.unwrap();
        serve_attach(&mut peer, 4).await;
        serve_create(&mut peer, 1, 2).await;
        let first = peer.recv_frame().await.unwrap();
        let second = peer.recv_frame().await.unwrap();
        let (second_offset, second_data) = serve_write(&second, &peer);
        let third = peer.recv_frame().await.unwrap();
        let (first_offset, first_data) = serve_write(&first, &peer);
        let (third_offset, third_data) = serve_write(&third, &peer);
        let mut assembled = vec![0u8; 12];
        for (offset, data) in [
            (first_offset, first_data),
            (second_offset, second_data),
            (third_offset, third_data),
        ] {
            assembled[offset as usize..offset as usize + data.len()].copy_from_slice(&data);
        }
        assert_eq!(assembled, expected);
        peer
    });
    let connection = SMBConnection::connect(factory, windowed_config(4, 2))
        .await
        .unwrap();
    connection
        .session_setup(Arc::new(AnonymousAuth))
        .await
        .unwrap();
    let tree = connection.tree_connect("server", "share").await.unwrap();
    let file = tree
        .create("big.bin", SMBOpenArgs::read_write())
        .await
        .unwrap();
    let written = file.write(0, &source).await.unwrap();
    assert_eq!(written, 12);
    server_task.await.unwrap();
}

/// Short transfers are legal on pipe endpoints: the actual count comes
/// back, not an error.
#[tokio::test]
async fn pipe_read_may_complete_short() {
    let (factory, mut server) = loopback_pair();
    let server_task = tokio::spawn(async move {
        let mut peer = server.accept().await.unwrap();
        serve_establishment(&mut peer, 1 << 16).await;
        serve_tree_connect(&mut peer, 0x02).await; // pipe share
        serve_create(&mut peer, 1, 2).await;
        let frame = peer.recv_frame().await.unwrap();
        peer.send_reply(read_reply_for(&frame, b"abc"));
        peer
    });
    let connection = SMBConnection::connect(factory, test_config()).await.unwrap();
    connection
        .session_setup(Arc::new(AnonymousAuth))
        .await
        .unwrap();
    let tree = connection.tree_connect("server", "pipe").await.unwrap();
    let pipe = tree.create("svc", SMBOpenArgs::read_write()).await.unwrap();
    let mut buffer = vec![0u8; 64];
    let read = pipe.read(0, &mut buffer).await.unwrap();
    assert_eq!(read, 3);
    assert_eq!(&buffer[..3], b"abc");
    server_task.await.unwrap();
}

#[tokio::test]
async fn zero_byte_completion_ends_transfer() {
    let (factory, mut server) = loopback_pair();
    let server_task = tokio::spawn(async move {
        let mut peer = server.accept().await.unwrap();
        serve_establishment(&mut peer, 1 << 16).await;
        serve_tree_connect(&mut peer, 0x02).await;
        serve_create(&mut peer, 1, 2).await;
        let frame = peer.recv_frame().await.unwrap();
        peer.send_reply(read_reply_for(&frame, &[]));
        peer
    });
    let connection = SMBConnection::connect(factory, test_config()).await.unwrap();
    connection
        .session_setup(Arc::new(AnonymousAuth))
        .await
        .unwrap();
    let tree = connection.tree_connect("server", "pipe").await.unwrap();
    let pipe = tree.create("svc", SMBOpenArgs::read_only()).await.unwrap();
    let mut buffer = vec![0u8; 16];
    let read = pipe.read(0, &mut buffer).await.unwrap();
    assert_eq!(read, 0);
    server_task.await.unwrap();
}
