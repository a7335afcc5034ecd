//! Values and lock handles returned by the coordination store.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A key and the bytes stored under it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct KvPair {
    /// Full key, e.g. `cluster/pair/c2`.
    pub key: String,
    /// Raw stored bytes.
    pub value: Vec<u8>,
    /// Store-wide revision at which this value was last written.
    pub modified_index: u64,
}

impl KvPair {
    /// Interpret the stored bytes as UTF-8, replacing invalid sequences.
    pub fn value_string(&self) -> String {
        String::from_utf8_lossy(&self.value).into_owned()
    }
}

/// Handle for a held named lock.
///
/// The handle is consumed by [`Kvdb::unlock`](crate::Kvdb::unlock); a
/// handle whose lock was already released or taken over is rejected with
/// [`KvdbError::LockNotHeld`](crate::KvdbError::LockNotHeld).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KvLock {
    /// Lock name.
    pub key: String,
    /// Owner identity supplied to `lock_with_id` (empty for anonymous locks).
    pub owner: String,
    /// Store-assigned handle id, unique per acquisition.
    pub id: u64,
}

impl fmt::Display for KvLock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.owner.is_empty() {
            write!(f, "{}#{}", self.key, self.id)
        } else {
            write!(f, "{}#{}@{}", self.key, self.id, self.owner)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lock_display() {
        let lock = KvLock {
            key: "cluster/lock".into(),
            owner: "node-1".into(),
            id: 7,
        };
        assert_eq!(lock.to_string(), "cluster/lock#7@node-1");

        let anon = KvLock {
            owner: String::new(),
            ..lock
        };
        assert_eq!(anon.to_string(), "cluster/lock#7");
    }

    #[test]
    fn value_string_is_lossy() {
        let kv = KvPair {
            key: "k".into(),
            value: b"c1".to_vec(),
            modified_index: 1,
        };
        assert_eq!(kv.value_string(), "c1");
    }
}
