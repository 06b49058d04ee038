use std::collections::HashMap;

use crate::protocol::body::create::{SMBLeaseKey, SMBLeaseState};

/// Lease lifecycle per file node:
/// `NoLease → Requested → Granted → BreakPending → (Acked → Granted | Released)`.
/// Absence from the table is the `NoLease` state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SMBLeaseLifecycle {
    Requested,
    Granted,
    BreakPending,
    Released,
}

#[derive(Debug, Clone)]
pub struct SMBLeaseEntry {
    pub key: SMBLeaseKey,
    pub lifecycle: SMBLeaseLifecycle,
    pub granted: SMBLeaseState,
    /// State the server is breaking us down to, held until the ack
    /// round-trip validates.
    pub pending_break: Option<SMBLeaseState>,
}

/// Out-of-band lease activity surfaced to the consumer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SMBLeaseEvent {
    BreakApplied {
        key: SMBLeaseKey,
        new_state: SMBLeaseState,
    },
    /// A break notification named a key this client never issued.
    UnknownKey { key: SMBLeaseKey },
    /// The break-ack reply echoed a different key; lease state was left
    /// untouched.
    MalformedAck { key: SMBLeaseKey },
}

/// Per-connection lease table. Keys are unique per (tree, file identity)
/// and stable across reconnects: the allocation counter and tree id form
/// the high half, the file-identity hash the low half.
#[derive(Debug)]
pub(crate) struct SMBLeaseTable {
    counter: u64,
    identity_salt: u64,
    by_key: HashMap<SMBLeaseKey, SMBLeaseEntry>,
    by_identity: HashMap<(u32, u64), SMBLeaseKey>,
}

impl SMBLeaseTable {
    pub(crate) fn new(identity_salt: u64) -> Self {
        Self {
            counter: 0,
            identity_salt,
            by_key: HashMap::new(),
            by_identity: HashMap::new(),
        }
    }

    /// Hash a file node to the identity half of its lease key. Uses the
    /// on-disk id when the server reported one, else the path.
    pub(crate) fn identity_of(&self, tree_local: u32, disk_file_id: Option<u64>, path: &str) -> u64 {
        match disk_file_id {
            Some(id) => id,
            None => fnv1a(self.identity_salt, tree_local, path.as_bytes()),
        }
    }

    /// Get-or-allocate the key for a file node. Reuse keeps the key
    /// stable across reopens and reconnects.
    pub(crate) fn key_for(&mut self, tree_local: u32, identity: u64) -> SMBLeaseKey {
        if let Some(key) = self.by_identity.get(&(tree_local, identity)) {
            return *key;
        }
        self.counter += 1;
        let high = (self.counter << 32) | tree_local as u64;
        let key = SMBLeaseKey::from_halves(identity, high);
        self.by_identity.insert((tree_local, identity), key);
        self.by_key.insert(
            key,
            SMBLeaseEntry {
                key,
                lifecycle: SMBLeaseLifecycle::Requested,
                granted: SMBLeaseState::empty(),
                pending_break: None,
            },
        );
        key
    }

    pub(crate) fn get(&self, key: &SMBLeaseKey) -> Option<&SMBLeaseEntry> {
        self.by_key.get(key)
    }

    pub(crate) fn mark_granted(&mut self, key: SMBLeaseKey, state: SMBLeaseState) {
        if let Some(entry) = self.by_key.get_mut(&key) {
            entry.lifecycle = SMBLeaseLifecycle::Granted;
            entry.granted = state;
            entry.pending_break = None;
        }
    }

    /// Record an incoming break. Returns false when the key is unknown,
    /// in which case nothing changed.
    pub(crate) fn begin_break(&mut self, key: SMBLeaseKey, new_state: SMBLeaseState) -> bool {
        match self.by_key.get_mut(&key) {
            Some(entry) => {
                entry.lifecycle = SMBLeaseLifecycle::BreakPending;
                entry.pending_break = Some(new_state);
                true
            }
            None => false,
        }
    }

    /// Ack round-trip validated: commit the broken-down state.
    pub(crate) fn commit_break(&mut self, key: SMBLeaseKey) -> Option<SMBLeaseState> {
        let entry = self.by_key.get_mut(&key)?;
        let new_state = entry.pending_break.take()?;
        entry.granted = new_state;
        entry.lifecycle = if new_state.is_empty() {
            SMBLeaseLifecycle::Released
        } else {
            SMBLeaseLifecycle::Granted
        };
        Some(new_state)
    }

    pub(crate) fn release(&mut self, key: SMBLeaseKey) {
        if let Some(entry) = self.by_key.get_mut(&key) {
            entry.lifecycle = SMBLeaseLifecycle::Released;
            entry.granted = SMBLeaseState::empty();
            entry.pending_break = None;
        }
    }
}

fn fnv1a(salt: u64, tree_local: u32, bytes: &[u8]) -> u64 {
    const OFFSET: u64 = 0xcbf29ce484222325;
    const PRIME: u64 = 0x100000001b3;
    let mut hash = OFFSET ^ salt;
    for byte in tree_local.to_le_bytes().iter().chain(bytes) {
        hash ^= *byte as u64;
        hash = hash.wrapping_mul(PRIME);
    }
    hash
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_is_stable_per_identity() {
        let mut table = SMBLeaseTable::new(1);
        let identity = table.identity_of(3, None, "a\\b.txt");
        let first = table.key_for(3, identity);
        let second = table.key_for(3, identity);
        assert_eq!(first, second);
        let other = table.key_for(4, identity);
        assert_ne!(first, other);
    }

    #[test]
    fn disk_file_id_beats_path_hash() {
        let table = SMBLeaseTable::new(7);
        assert_eq!(table.identity_of(1, Some(99), "x"), 99);
        assert_ne!(table.identity_of(1, None, "x"), 99);
    }

    #[test]
    fn break_then_commit() {
        let mut table = SMBLeaseTable::new(0);
        let key = table.key_for(1, 42);
        table.mark_granted(
            key,
            SMBLeaseState::READ_CACHING | SMBLeaseState::HANDLE_CACHING,
        );
        assert!(table.begin_break(key, SMBLeaseState::READ_CACHING));
        assert_eq!(
            table.get(&key).unwrap().lifecycle,
            SMBLeaseLifecycle::BreakPending
        );
        let committed = table.commit_break(key).unwrap();
        assert_eq!(committed, SMBLeaseState::READ_CACHING);
        assert_eq!(table.get(&key).unwrap().lifecycle, SMBLeaseLifecycle::Granted);
    }

    #[test]
    fn break_to_nothing_releases() {
        let mut table = SMBLeaseTable::new(0);
        let key = table.key_for(1, 42);
        table.mark_granted(key, SMBLeaseState::READ_CACHING);
        table.begin_break(key, SMBLeaseState::empty());
        table.commit_break(key);
        assert_eq!(
            table.get(&key).unwrap().lifecycle,
            SMBLeaseLifecycle::Released
        );
    }

    #[test]
    fn unknown_key_changes_nothing() {
        let mut table = SMBLeaseTable::new(0);
        let known = table.key_for(1, 42);
        table.mark_granted(known, SMBLeaseState::READ_CACHING);
        let bogus = SMBLeaseKey::from_halves(0xDEAD, 0xBEEF);
        assert!(!table.begin_break(bogus, SMBLeaseState::empty()));
        assert_eq!(
            table.get(&known).unwrap().granted,
            SMBLeaseState::READ_CACHING
        );
    }
}
