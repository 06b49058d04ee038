use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use smb_core::{SMBByteSize, SMBFromBytes, SMBParseResult, SMBToBytes};

/// Windows FILETIME: 100ns intervals since 1601-01-01.
const EPOCH_DELTA_SECS: u64 = 11_644_473_600;
const INTERVALS_PER_SEC: u64 = 10_000_000;

#[derive(Serialize, Deserialize, PartialEq, Eq, Debug, Copy, Clone, Default, PartialOrd, Ord)]
pub struct FileTime(u64);

impl FileTime {
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub fn raw(&self) -> u64 {
        self.0
    }

    pub fn is_unset(&self) -> bool {
        self.0 == 0
    }

    pub fn to_system_time(&self) -> Option<SystemTime> {
        let secs = self.0 / INTERVALS_PER_SEC;
        let nanos = (self.0 % INTERVALS_PER_SEC) * 100;
        let unix_secs = secs.checked_sub(EPOCH_DELTA_SECS)?;
        UNIX_EPOCH.checked_add(Duration::new(unix_secs, nanos as u32))
    }
}

impl SMBByteSize for FileTime {
    fn smb_byte_size(&self) -> usize {
        std::mem::size_of::<u64>()
    }
}

impl SMBFromBytes for FileTime {
    fn smb_from_bytes(input: &[u8]) -> SMBParseResult<&[u8], Self> {
        let (remaining, raw) = u64::smb_from_bytes(input)?;
        Ok((remaining, Self(raw)))
    }
}

impl SMBToBytes for FileTime {
    fn smb_to_bytes(&self) -> Vec<u8> {
        self.0.smb_to_bytes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unix_epoch_conversion() {
        let epoch = FileTime::from_raw(EPOCH_DELTA_SECS * INTERVALS_PER_SEC);
        assert_eq!(epoch.to_system_time(), Some(UNIX_EPOCH));
        assert!(FileTime::from_raw(1).to_system_time().is_none());
    }
}
