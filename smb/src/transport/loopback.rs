use std::io;

use tokio::sync::mpsc;

use smb_core::SMBResult;
use smb_core::error::SMBError;

use crate::transport::{
    SMBTransportEvent, SMBTransportFactory, SMBTransportReader, SMBTransportWriter,
};

/// In-memory transport pair. The client side behaves like any other
/// factory; the server side scripts replies byte-for-byte and can drop a
/// connection to simulate a transport reset. Each `connect` call hands
/// the server a fresh peer, so reconnection is observable.
pub fn loopback_pair() -> (LoopbackFactory, LoopbackServer) {
    let (accept_tx, accept_rx) = mpsc::unbounded_channel();
    (
        LoopbackFactory { accept_tx },
        LoopbackServer { accept_rx },
    )
}

pub struct LoopbackFactory {
    accept_tx: mpsc::UnboundedSender<LoopbackPeer>,
}

pub struct LoopbackServer {
    accept_rx: mpsc::UnboundedReceiver<LoopbackPeer>,
}

impl LoopbackServer {
    /// Next (re)connection made by the client under test.
    pub async fn accept(&mut self) -> Option<LoopbackPeer> {
        self.accept_rx.recv().await
    }
}

/// Server-side endpoint of one loopback connection.
pub struct LoopbackPeer {
    frames_rx: mpsc::UnboundedReceiver<Vec<u8>>,
    events_tx: mpsc::UnboundedSender<SMBTransportEvent>,
}

impl LoopbackPeer {
    /// Receive the next frame the client sent, without its length prefix.
    pub async fn recv_frame(&mut self) -> Option<Vec<u8>> {
        self.frames_rx.recv().await
    }

    pub fn send_reply(&self, frame: Vec<u8>) {
        let _ = self.events_tx.send(SMBTransportEvent::Reply(frame.into()));
    }

    /// Signal a transport reset to the client and kill this connection.
    pub fn reset(self) {
        let _ = self.events_tx.send(SMBTransportEvent::Reset);
    }
}

pub struct LoopbackReader {
    events_rx: mpsc::UnboundedReceiver<SMBTransportEvent>,
}

pub struct LoopbackWriter {
    frames_tx: mpsc::UnboundedSender<Vec<u8>>,
}

impl SMBTransportFactory for LoopbackFactory {
    type Reader = LoopbackReader;
    type Writer = LoopbackWriter;

    async fn connect(&mut self) -> SMBResult<(Self::Reader, Self::Writer)> {
        let (frames_tx, frames_rx) = mpsc::unbounded_channel();
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        self.accept_tx
            .send(LoopbackPeer {
                frames_rx,
                events_tx,
            })
            .map_err(|_e| {
                SMBError::io_error(io::Error::new(
                    io::ErrorKind::ConnectionRefused,
                    "loopback server gone",
                ))
            })?;
        Ok((LoopbackReader { events_rx }, LoopbackWriter { frames_tx }))
    }
}

impl SMBTransportReader for LoopbackReader {
    async fn next_event(&mut self) -> SMBTransportEvent {
        match self.events_rx.recv().await {
            Some(event) => event,
            None => SMBTransportEvent::Reset,
        }
    }
}

impl SMBTransportWriter for LoopbackWriter {
    async fn write_frame(&mut self, frame: &[u8]) -> SMBResult<usize> {
        self.frames_tx.send(frame.to_vec()).map_err(|_e| {
            SMBError::io_error(io::Error::new(io::ErrorKind::BrokenPipe, "peer dropped"))
        })?;
        Ok(frame.len())
    }
}
