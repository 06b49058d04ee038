use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio_stream::StreamExt;
use tokio_util::codec::FramedRead;

use smb_core::SMBResult;
use smb_core::error::SMBError;

use crate::transport::{
    NetBiosCodec, SMBTransportEvent, SMBTransportFactory, SMBTransportReader, SMBTransportWriter,
};

/// Direct-TCP transport (port 445 framing).
#[derive(Debug, Clone)]
pub struct SMBTcpFactory {
    address: String,
}

impl SMBTcpFactory {
    pub fn new<T: Into<String>>(address: T) -> Self {
        Self {
            address: address.into(),
        }
    }
}

pub struct SMBTcpReader {
    framed: FramedRead<OwnedReadHalf, NetBiosCodec>,
}

pub struct SMBTcpWriter {
    stream: OwnedWriteHalf,
}

impl SMBTransportFactory for SMBTcpFactory {
    type Reader = SMBTcpReader;
    type Writer = SMBTcpWriter;

    async fn connect(&mut self) -> SMBResult<(Self::Reader, Self::Writer)> {
        let stream = TcpStream::connect(&self.address)
            .await
            .map_err(SMBError::io_error)?;
        stream.set_nodelay(true).map_err(SMBError::io_error)?;
        let (read_half, write_half) = stream.into_split();
        Ok((
            SMBTcpReader {
                framed: FramedRead::new(read_half, NetBiosCodec),
            },
            SMBTcpWriter { stream: write_half },
        ))
    }
}

impl SMBTransportReader for SMBTcpReader {
    async fn next_event(&mut self) -> SMBTransportEvent {
        match self.framed.next().await {
            Some(Ok(frame)) => SMBTransportEvent::Reply(frame),
            Some(Err(_)) | None => SMBTransportEvent::Reset,
        }
    }
}

impl SMBTransportWriter for SMBTcpWriter {
    async fn write_frame(&mut self, frame: &[u8]) -> SMBResult<usize> {
        let prefix = [
            0u8,
            (frame.len() >> 16) as u8,
            (frame.len() >> 8) as u8,
            frame.len() as u8,
        ];
        self.stream
            .write_all(&prefix)
            .await
            .map_err(SMBError::io_error)?;
        self.stream
            .write_all(frame)
            .await
            .map_err(SMBError::io_error)?;
        Ok(frame.len() + prefix.len())
    }
}
