use uuid::Uuid;

use error::SMBError;

pub mod error;
pub mod nt_status;

pub type SMBResult<T> = Result<T, SMBError>;
pub type SMBParseResult<I, O> = Result<(I, O), SMBError>;

pub trait SMBByteSize {
    fn smb_byte_size(&self) -> usize;
}

/// Deserialize boundary: consume from the front of `input`, return the
/// remainder. Implementations never read past the slice they are given.
pub trait SMBFromBytes: SMBByteSize {
    fn smb_from_bytes(input: &[u8]) -> SMBParseResult<&[u8], Self>
    where
        Self: Sized;
}

/// Serialize boundary: host-order values go in, little-endian wire bytes
/// come out. Wire structs are never mutated in place for transmission.
pub trait SMBToBytes: SMBByteSize {
    fn smb_to_bytes(&self) -> Vec<u8>;
}

macro_rules! impl_codec_for_int {
    ($($t:ty),*) => {$(
        impl SMBByteSize for $t {
            fn smb_byte_size(&self) -> usize {
                std::mem::size_of::<$t>()
            }
        }

        impl SMBFromBytes for $t {
            fn smb_from_bytes(input: &[u8]) -> SMBParseResult<&[u8], Self> {
                const LEN: usize = std::mem::size_of::<$t>();
                if input.len() < LEN {
                    return Err(SMBError::payload_too_small(LEN, input.len()));
                }
                let mut raw = [0u8; LEN];
                raw.copy_from_slice(&input[..LEN]);
                Ok((&input[LEN..], <$t>::from_le_bytes(raw)))
            }
        }

        impl SMBToBytes for $t {
            fn smb_to_bytes(&self) -> Vec<u8> {
                self.to_le_bytes().to_vec()
            }
        }
    )*};
}

impl_codec_for_int!(u8, u16, u32, u64, u128);

impl<const N: usize> SMBByteSize for [u8; N] {
    fn smb_byte_size(&self) -> usize {
        N
    }
}

impl<const N: usize> SMBFromBytes for [u8; N] {
    fn smb_from_bytes(input: &[u8]) -> SMBParseResult<&[u8], Self> {
        if input.len() < N {
            return Err(SMBError::payload_too_small(N, input.len()));
        }
        let mut raw = [0u8; N];
        raw.copy_from_slice(&input[..N]);
        Ok((&input[N..], raw))
    }
}

impl<const N: usize> SMBToBytes for [u8; N] {
    fn smb_to_bytes(&self) -> Vec<u8> {
        self.to_vec()
    }
}

impl SMBByteSize for Uuid {
    fn smb_byte_size(&self) -> usize {
        self.as_bytes().len()
    }
}

impl SMBFromBytes for Uuid {
    fn smb_from_bytes(input: &[u8]) -> SMBParseResult<&[u8], Self> {
        if input.len() < 16 {
            return Err(SMBError::payload_too_small(16usize, input.len()));
        }
        let uuid = Uuid::from_slice(&input[0..16])
            .map_err(|_e| SMBError::malformed_reply("invalid GUID bytes"))?;
        Ok((&input[16..], uuid))
    }
}

impl SMBToBytes for Uuid {
    fn smb_to_bytes(&self) -> Vec<u8> {
        self.as_bytes().to_vec()
    }
}

/// Encode a wire path as UTF-16LE. Separator translation to the local
/// path encoding happens outside the engine.
pub fn utf16_le_bytes(value: &str) -> Vec<u8> {
    value
        .encode_utf16()
        .flat_map(|unit| unit.to_le_bytes())
        .collect()
}

/// Decode a UTF-16LE wire string. `input` must cover exactly the string.
pub fn parse_utf16_le(input: &[u8]) -> SMBResult<String> {
    if input.len() % 2 != 0 {
        return Err(SMBError::malformed_reply("odd UTF-16 byte length"));
    }
    let units: Vec<u16> = input
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
        .collect();
    String::from_utf16(&units).map_err(|_e| SMBError::malformed_reply("invalid UTF-16 string"))
}
