use std::io;

use bytes::{Buf, Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

/// NetBIOS session-service framing: a zero type byte and a 24-bit
/// big-endian length in front of every SMB message.
const HEADER_LEN: usize = 4;
const MAX_FRAME: usize = 0x00FF_FFFF;

#[derive(Debug, Default)]
pub struct NetBiosCodec;

impl Decoder for NetBiosCodec {
    type Item = Bytes;
    type Error = io::Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Bytes>, io::Error> {
        if src.len() < HEADER_LEN {
            return Ok(None);
        }
        if src[0] != 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "unexpected NetBIOS message type",
            ));
        }
        let length = ((src[1] as usize) << 16) | ((src[2] as usize) << 8) | src[3] as usize;
        if src.len() < HEADER_LEN + length {
            src.reserve(HEADER_LEN + length - src.len());
            return Ok(None);
        }
        src.advance(HEADER_LEN);
        Ok(Some(src.split_to(length).freeze()))
    }
}

impl Encoder<&[u8]> for NetBiosCodec {
    type Error = io::Error;

    fn encode(&mut self, frame: &[u8], dst: &mut BytesMut) -> Result<(), io::Error> {
        if frame.len() > MAX_FRAME {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "frame exceeds NetBIOS length field",
            ));
        }
        dst.reserve(HEADER_LEN + frame.len());
        dst.extend_from_slice(&[
            0,
            (frame.len() >> 16) as u8,
            (frame.len() >> 8) as u8,
            frame.len() as u8,
        ]);
        dst.extend_from_slice(frame);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_decode_round_trip() {
        let mut codec = NetBiosCodec;
        let mut buffer = BytesMut::new();
        codec.encode(b"hello smb", &mut buffer).unwrap();
        assert_eq!(&buffer[..4], &[0, 0, 0, 9]);
        let frame = codec.decode(&mut buffer).unwrap().unwrap();
        assert_eq!(&frame[..], b"hello smb");
        assert!(buffer.is_empty());
    }

    #[test]
    fn partial_frame_waits_for_more() {
        let mut codec = NetBiosCodec;
        let mut buffer = BytesMut::from(&[0u8, 0, 0, 10, 1, 2, 3][..]);
        assert!(codec.decode(&mut buffer).unwrap().is_none());
    }

    #[test]
    fn bad_type_byte_errors() {
        let mut codec = NetBiosCodec;
        let mut buffer = BytesMut::from(&[0x85u8, 0, 0, 0][..]);
        assert!(codec.decode(&mut buffer).is_err());
    }
}
