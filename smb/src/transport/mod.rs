use std::future::Future;

use bytes::Bytes;

use smb_core::SMBResult;

mod loopback;
mod netbios;
mod tcp;

pub type LoopbackFactory = loopback::LoopbackFactory;
pub type LoopbackServer = loopback::LoopbackServer;
pub type LoopbackPeer = loopback::LoopbackPeer;
pub type SMBTcpFactory = tcp::SMBTcpFactory;

pub use loopback::{LoopbackReader, LoopbackWriter, loopback_pair};
pub use netbios::NetBiosCodec;
pub use tcp::{SMBTcpReader, SMBTcpWriter};

/// What the transport hands back: one whole framed message, or the reset
/// signal when the byte stream died underneath it.
#[derive(Debug)]
pub enum SMBTransportEvent {
    Reply(Bytes),
    Reset,
}

/// Read half of the transport seam. Framing (NetBIOS session service or
/// direct TCP) is this layer's concern; the engine only sees messages.
pub trait SMBTransportReader: Send + 'static {
    fn next_event(&mut self) -> impl Future<Output = SMBTransportEvent> + Send;
}

/// Write half. A failed write is a reset signal as far as callers care.
pub trait SMBTransportWriter: Send + 'static {
    fn write_frame(&mut self, frame: &[u8]) -> impl Future<Output = SMBResult<usize>> + Send;
}

/// Supplies fresh halves on (re)connect; the reconnection policy calls
/// this again after a reset.
pub trait SMBTransportFactory: Send + Sync + 'static {
    type Reader: SMBTransportReader;
    type Writer: SMBTransportWriter;

    fn connect(&mut self) -> impl Future<Output = SMBResult<(Self::Reader, Self::Writer)>> + Send;
}
