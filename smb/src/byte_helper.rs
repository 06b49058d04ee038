use smb_core::SMBResult;
use smb_core::error::SMBError;

/// Bounds-checked little-endian field access for offset-directed reply
/// parsing. Parsers skip to stated offsets instead of assuming contiguous
/// layout, so every read goes through these.

pub(crate) fn u8_at(buffer: &[u8], offset: usize) -> SMBResult<u8> {
    bytes_at(buffer, offset, 1).map(|b| b[0])
}

pub(crate) fn u16_at(buffer: &[u8], offset: usize) -> SMBResult<u16> {
    bytes_at(buffer, offset, 2).map(|b| u16::from_le_bytes([b[0], b[1]]))
}

pub(crate) fn u32_at(buffer: &[u8], offset: usize) -> SMBResult<u32> {
    bytes_at(buffer, offset, 4).map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
}

pub(crate) fn u64_at(buffer: &[u8], offset: usize) -> SMBResult<u64> {
    bytes_at(buffer, offset, 8).map(|b| {
        u64::from_le_bytes([b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]])
    })
}

pub(crate) fn bytes_at(buffer: &[u8], offset: usize, length: usize) -> SMBResult<&[u8]> {
    let end = offset
        .checked_add(length)
        .ok_or_else(|| SMBError::buffer_overrun(usize::MAX, buffer.len()))?;
    if end > buffer.len() {
        return Err(SMBError::buffer_overrun(end, buffer.len()));
    }
    Ok(&buffer[offset..end])
}

pub(crate) fn u16_to_bytes(num: u16) -> [u8; 2] {
    num.to_le_bytes()
}

pub(crate) fn u32_to_bytes(num: u32) -> [u8; 4] {
    num.to_le_bytes()
}

pub(crate) fn u64_to_bytes(num: u64) -> [u8; 8] {
    num.to_le_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_are_little_endian() {
        let buffer = [0x78, 0x56, 0x34, 0x12, 0xAA];
        assert_eq!(u16_at(&buffer, 0).unwrap(), 0x5678);
        assert_eq!(u32_at(&buffer, 0).unwrap(), 0x12345678);
        assert_eq!(u8_at(&buffer, 4).unwrap(), 0xAA);
    }

    #[test]
    fn out_of_bounds_is_overrun() {
        let buffer = [0u8; 4];
        assert!(matches!(
            u32_at(&buffer, 1),
            Err(SMBError::BufferOverrun(_))
        ));
        assert!(matches!(
            u64_at(&buffer, usize::MAX - 2),
            Err(SMBError::BufferOverrun(_))
        ));
    }
}
